//! The planner-facing surface (spec.md §4.9): the Graph Plan Node that
//! holds a Traverser Options, supports clone/serialize for cluster
//! dispatch, and exposes the variable/attribute-rewrite hooks the wider
//! optimizer drives.

pub mod graph_node;

pub use graph_node::{DeploymentMode, GraphPlanNode, PlanWire, StartVertex, WalkKind};
