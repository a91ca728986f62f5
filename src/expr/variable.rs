//! Variable bindings: a small integer id plus a display name, created
//! while lowering AST and destroyed with the owning plan (spec.md §3).

use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

#[revisioned(revision = 1)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub enum VariableKind {
	UserDefined,
	Temporary,
}

/// An identity: a small integer id plus a name. Two variables are equal
/// iff their ids are equal — the name is informational only and is never
/// consulted by a rewrite.
#[revisioned(revision = 1)]
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub struct Variable {
	pub id: u32,
	pub name: String,
	pub kind: VariableKind,
}

impl Variable {
	pub fn new(id: u32, name: impl Into<String>, kind: VariableKind) -> Self {
		Self {
			id,
			name: name.into(),
			kind,
		}
	}

	/// Allocates a fresh temporary variable id from a plan-local counter.
	pub fn next_temporary(counter: &AtomicU32, name: impl Into<String>) -> Self {
		let id = counter.fetch_add(1, Ordering::Relaxed);
		Self::new(id, name, VariableKind::Temporary)
	}
}

impl PartialEq for Variable {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl std::hash::Hash for Variable {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Display for Variable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name)
	}
}
