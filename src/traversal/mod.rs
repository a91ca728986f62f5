//! Traverser Options, the Path Validator, Path, and the enumerators built
//! on top of them (spec.md §4.5-§4.8).

pub mod kpaths;
pub mod options;
pub mod path;
pub mod validator;
pub mod walk;

pub use kpaths::KPathsEnumerator;
pub use options::{BoundExpression, EdgeUniqueness, OptionsSpec, Order, PreparedAccessors, TraverserOptions, VertexUniqueness};
pub use path::Path;
pub use validator::{PathValidator, VertexDecision};
pub use walk::{BfsEnumerator, DfsEnumerator, WalkConfig, WeightedEnumerator};
