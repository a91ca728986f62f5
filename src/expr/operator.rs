//! Binary operators supported by [`crate::expr::node::Node::Binary`] and
//! [`crate::expr::node::Node::NAry`]. Grounded on `sql::operator::Operator`
//! in the teacher, trimmed to the set spec.md §3 names.

use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[revisioned(revision = 1)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub enum Operator {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	And,
	Or,
	In,
}

impl Operator {
	/// Whether this operator is valid as the combinator of an
	/// [`crate::expr::node::Node::NAry`] node — only `And`/`Or` flatten.
	pub fn is_nary_combinator(self) -> bool {
		matches!(self, Operator::And | Operator::Or)
	}

	/// Whether this is one of the range-comparison operators the index
	/// accessor builder and the LIKE-prefix rewrite reason about.
	pub fn is_range_comparison(self) -> bool {
		matches!(self, Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge)
	}
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Operator::Eq => "==",
			Operator::Ne => "!=",
			Operator::Lt => "<",
			Operator::Le => "<=",
			Operator::Gt => ">",
			Operator::Ge => ">=",
			Operator::And => "&&",
			Operator::Or => "||",
			Operator::In => "IN",
		};
		write!(f, "{s}")
	}
}
