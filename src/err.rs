//! The single closed error type for the planning and execution core.
//!
//! Every fallible operation in this crate returns `Result<T, Error>`.
//! Structural errors ([`Error::BadPlan`], [`Error::InvalidDepth`],
//! [`Error::BadOption`], [`Error::NoIndex`]) are fatal to the plan and
//! surface immediately. Runtime errors ([`Error::NegativeWeight`],
//! [`Error::TypeMismatch`], [`Error::QueryKilled`],
//! [`Error::ResourceExceeded`]) abort an in-flight enumeration and unwind
//! through `?`, releasing cursors via `Drop` on the way out. Per-edge and
//! per-vertex filter failures are never represented as `Error` variants:
//! they are local `bool` outcomes handled by the [`crate::traversal::validator::PathValidator`].

use thiserror::Error;

/// The numeric code carried in the `{code, message}` wire format from
/// spec.md §6. Stable across revisions; never renumber an existing kind.
pub type ErrorCode = u16;

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
	/// The start-vertex expression is neither a reference nor a string
	/// literal.
	#[error("invalid start vertex expression: {0}")]
	ParseError(String),

	/// A deserialized plan slice is missing a required field or has a
	/// type-incompatible value.
	#[error("malformed plan: {0}")]
	BadPlan(String),

	/// Depth bounds are non-integer, negative, or `minDepth > maxDepth`.
	#[error("invalid depth bounds: min={min}, max={max}")]
	InvalidDepth {
		min: i64,
		max: i64,
	},

	/// Unknown or contradictory traverser options.
	#[error("invalid traverser option: {0}")]
	BadOption(String),

	/// No edge index usable for a required (collection, direction)
	/// combination.
	#[error("no usable index for collection `{collection}` in direction {direction}")]
	NoIndex {
		collection: String,
		direction: String,
	},

	/// An edge's weight was negative at runtime.
	#[error("negative edge weight {weight} on edge `{edge}`")]
	NegativeWeight {
		edge: String,
		weight: f64,
	},

	/// A referenced collection does not exist.
	#[error("collection not found: `{0}`")]
	CollectionNotFound(String),

	/// Cooperative cancellation fired.
	#[error("query killed")]
	QueryKilled,

	/// A memory or row-count monitor tripped.
	#[error("resource exceeded: {0}")]
	ResourceExceeded(String),

	/// Expression evaluation hit an incompatible type.
	#[error("type mismatch: {0}")]
	TypeMismatch(String),

	/// Division by zero during constant or per-row expression evaluation.
	#[error("division by zero")]
	DivisionByZero,

	/// A reference node targeted a variable with no binding in the
	/// expression context.
	#[error("undefined variable: `{0}`")]
	UndefinedVariable(String),

	/// The underlying edge iterator reported an error.
	#[error("iterator error: {0}")]
	Iterator(String),
}

impl Error {
	/// The numeric code used in the wire error format (spec.md §6).
	/// `VertexCollectionDisallowed` has no code: spec.md §7 is explicit
	/// that it is not an error, merely a silent prune, so it is never
	/// constructed as an `Error` variant at all.
	pub fn code(&self) -> ErrorCode {
		match self {
			Error::ParseError(_) => 1000,
			Error::BadPlan(_) => 1001,
			Error::InvalidDepth {
				..
			} => 1002,
			Error::BadOption(_) => 1003,
			Error::NoIndex {
				..
			} => 1004,
			Error::NegativeWeight {
				..
			} => 1005,
			Error::CollectionNotFound(_) => 1006,
			Error::QueryKilled => 1007,
			Error::ResourceExceeded(_) => 1008,
			Error::TypeMismatch(_) => 1009,
			Error::DivisionByZero => 1010,
			Error::UndefinedVariable(_) => 1011,
			Error::Iterator(_) => 1012,
		}
	}

	/// Renders this error in the `{code, message}` wire format from
	/// spec.md §6.
	pub fn to_wire(&self) -> serde_json::Value {
		serde_json::json!({
			"code": self.code(),
			"message": self.to_string(),
		})
	}
}
