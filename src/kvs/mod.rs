//! The storage-layer contract boundary (spec.md §1: "the storage engine
//! ... we specify only the iterator contract the planner consumes").
//!
//! [`crate::idx::accessor::IndexCatalog`] and
//! [`crate::idx::cursor::EdgeIteratorFactory`] cover index selection and
//! edge scanning; the one remaining capability the enumerators need from
//! storage is fetching a vertex document by id, which lives here rather
//! than being bundled into the edge-scan trait, mirroring how the teacher
//! keeps its `kvs::Transaction` trait as the single narrow seam between
//! the query engine and the storage engine.

use crate::err::Error;
use crate::expr::value::Value;

/// Fetches a vertex document by its `_id` string. Implemented by the
/// storage layer; out of scope for this crate beyond the trait boundary.
pub trait VertexSource: Send + Sync {
	fn fetch_vertex(&self, vertex_id: &str) -> Result<Value, Error>;
}
