//! The literal value type produced by constant folding and carried as the
//! result of expression evaluation.
//!
//! Grounded on `sql::value::Value` in the teacher crate, trimmed to the
//! primitive kinds spec.md §3 names (string/int/double/bool/null) plus the
//! `Array`/`Object` composites needed to evaluate `IN` against a literal
//! array and attribute access into a literal object (see SPEC_FULL.md §3).

use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[revisioned(revision = 1)]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Double(f64),
	String(String),
	Array(Vec<Value>),
	Object(BTreeMap<String, Value>),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Truthiness used by short-circuiting boolean operators.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Int(i) => *i != 0,
			Value::Double(d) => *d != 0.0,
			Value::String(s) => !s.is_empty(),
			Value::Array(a) => !a.is_empty(),
			Value::Object(o) => !o.is_empty(),
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s.as_str()),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Int(i) => Some(*i as f64),
			Value::Double(d) => Some(*d),
			_ => None,
		}
	}

	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Double(_) => "double",
			Value::String(_) => "string",
			Value::Array(_) => "array",
			Value::Object(_) => "object",
		}
	}

	/// The "high sentinel" successor string used by the LIKE prefix
	/// rewrite (spec.md §4.10): the smallest string that is greater than
	/// every string beginning with `self`.
	pub fn string_prefix_upper_bound(prefix: &str) -> Value {
		let mut bytes = prefix.as_bytes().to_vec();
		while let Some(&last) = bytes.last() {
			if last == 0xff {
				bytes.pop();
			} else {
				let new_last = last + 1;
				bytes.pop();
				bytes.push(new_last);
				return Value::String(String::from_utf8_lossy(&bytes).into_owned());
			}
		}
		// Every byte was 0xff (pathological); no finite upper bound in the
		// same byte length, fall back to appending a sentinel byte.
		let mut s = prefix.to_string();
		s.push('\u{10FFFF}');
		Value::String(s)
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "NULL"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Int(i) => write!(f, "{i}"),
			Value::Double(d) => write!(f, "{d}"),
			Value::String(s) => write!(f, "{s:?}"),
			Value::Array(a) => {
				write!(f, "[")?;
				for (i, v) in a.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{v}")?;
				}
				write!(f, "]")
			}
			Value::Object(o) => {
				write!(f, "{{")?;
				for (i, (k, v)) in o.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{k}: {v}")?;
				}
				write!(f, "}}")
			}
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Double(a), Value::Double(b)) => a == b,
			(Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
				(*a as f64) == *b
			}
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Array(a), Value::Array(b)) => a == b,
			(Value::Object(a), Value::Object(b)) => a == b,
			_ => false,
		}
	}
}

impl PartialOrd for Value {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		match (self, other) {
			(Value::Null, Value::Null) => Some(Ordering::Equal),
			(Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
			(Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
			(Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
			(Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
			(Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
			(Value::String(a), Value::String(b)) => a.partial_cmp(b),
			_ => None,
		}
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<f64> for Value {
	fn from(d: f64) -> Self {
		Value::Double(d)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}
