//! Index accessor synthesis, the lookup-info registry, and the edge
//! cursor that rides on top of them (spec.md §4.2-§4.4).

pub mod accessor;
pub mod cursor;
pub mod registry;

pub use accessor::{build_lookup_info, Direction, IndexCatalog, IndexChoice, IndexHint, LookupInfo};
pub use cursor::{EdgeCursor, EdgeIterator, EdgeIteratorEntry, EdgeIteratorFactory};
pub use registry::LookupInfoRegistry;
