//! Graph traversal planning and execution core for a distributed
//! multi-model query engine: index accessor synthesis, a Lookup Info
//! Registry with per-depth overrides, an Edge Cursor rearming protocol,
//! pluggable DFS/BFS/WEIGHTED/k-paths enumeration, and the Graph Plan
//! Node that ties all of it to a planner's variable/condition rewrite
//! passes.
//!
//! The storage engine, the wider optimizer rule pipeline, and the query
//! surface (parser, AQL-equivalent grammar) are out of scope; this crate
//! consumes a storage layer only through [`idx::IndexCatalog`],
//! [`idx::EdgeIteratorFactory`], and [`kvs::VertexSource`].

pub mod cnf;
pub mod err;
pub mod expr;
pub mod idx;
pub mod kvs;
pub mod optimizer;
pub mod plan;
pub mod telemetry;
pub mod traversal;

pub use err::{Error, ErrorCode};
