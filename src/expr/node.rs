//! The AST node tree (spec.md §3, §4.1). Nodes own their children
//! directly (`Box`/`Vec`), never through a raw pointer or shared arena
//! index — sharing is always explicit, through `Clone` (Design Notes §9,
//! "Cyclic references in AST"). Once a node is frozen by being shared
//! across threads or dispatched to a shard, further mutation requires an
//! explicit `clone()` first; this is a documented convention here rather
//! than a type-level lock, matching how the teacher treats its own AST
//! (`sql::value::Value` et al. are freely `Clone`, and callers that need
//! to mutate in place always clone before rewriting).

use crate::err::Error;
use crate::expr::context::ExpressionContext;
use crate::expr::operator::Operator;
use crate::expr::value::Value;
use crate::expr::variable::Variable;
use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[revisioned(revision = 1)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub enum Node {
	/// A reference to a named binding.
	Reference(Variable),
	/// A typed literal.
	Value(Value),
	/// `parent.name`.
	Attribute {
		parent: Box<Node>,
		name: String,
	},
	/// `parent[index]`.
	Indexed {
		parent: Box<Node>,
		index: Box<Node>,
	},
	/// A two-operand operator application.
	Binary {
		op: Operator,
		left: Box<Node>,
		right: Box<Node>,
	},
	/// A flattened chain of the same `And`/`Or` combinator over more than
	/// two members — the shape the index accessor builder scans for
	/// direct AND operands (spec.md §4.2 step 3).
	NAry {
		op: Operator,
		members: Vec<Node>,
	},
	/// `name(args...)`.
	Call {
		name: String,
		args: Vec<Node>,
	},
	Array(Vec<Node>),
	Object(Vec<Node>),
	/// `key: value` — only ever a child of `Object`.
	ObjectElement {
		key: String,
		value: Box<Node>,
	},
	/// An opaque nested query; this crate does not interpret its body
	/// beyond holding it for clone/serialize round-tripping.
	Subquery(Box<Node>),
	Collection(String),
	View(String),
	Nop,
}

impl Default for Node {
	fn default() -> Self {
		Node::Nop
	}
}

impl Node {
	pub fn and(members: Vec<Node>) -> Node {
		Node::NAry {
			op: Operator::And,
			members,
		}
	}

	pub fn or(members: Vec<Node>) -> Node {
		Node::NAry {
			op: Operator::Or,
			members,
		}
	}

	pub fn binary(op: Operator, left: Node, right: Node) -> Node {
		Node::Binary {
			op,
			left: Box::new(left),
			right: Box::new(right),
		}
	}

	pub fn attribute(parent: Node, name: impl Into<String>) -> Node {
		Node::Attribute {
			parent: Box::new(parent),
			name: name.into(),
		}
	}

	/// If this node is a binary equality `parent.name == String(v)`, and
	/// `parent` is a reference to `var`, returns `(name, v)`. Used
	/// pervasively by the index accessor builder to recognize
	/// `vertexVar._from == "..."`-shaped predicates.
	pub fn as_attribute_equality_on<'a>(&'a self, var: &Variable) -> Option<(&'a str, &'a str)> {
		let Node::Binary {
			op: Operator::Eq,
			left,
			right,
		} = self
		else {
			return None;
		};
		let Node::Attribute {
			parent,
			name,
		} = left.as_ref()
		else {
			return None;
		};
		let Node::Reference(v) = parent.as_ref() else {
			return None;
		};
		if v.id != var.id {
			return None;
		}
		let Node::Value(Value::String(s)) = right.as_ref() else {
			return None;
		};
		Some((name.as_str(), s.as_str()))
	}

	/// The direct children of an n-ary node, or a single-element slice
	/// wrapping `self` for any other node — lets callers uniformly
	/// "scan the AND operands" whether or not the condition happened to
	/// collapse to a single predicate.
	pub fn and_operands(&self) -> Vec<&Node> {
		match self {
			Node::NAry {
				op: Operator::And,
				members,
			} => members.iter().collect(),
			other => vec![other],
		}
	}

	/// True iff this subtree contains no [`Node::Reference`] — constant
	/// subexpressions are pre-evaluated at plan time; everything else is
	/// re-evaluated per input row (spec.md §4.1).
	pub fn is_constant(&self) -> bool {
		match self {
			Node::Reference(_) => false,
			Node::Value(_) | Node::Collection(_) | Node::View(_) | Node::Nop => true,
			Node::Attribute {
				parent,
				..
			} => parent.is_constant(),
			Node::Indexed {
				parent,
				index,
			} => parent.is_constant() && index.is_constant(),
			Node::Binary {
				left,
				right,
				..
			} => left.is_constant() && right.is_constant(),
			Node::NAry {
				members,
				..
			} => members.iter().all(Node::is_constant),
			Node::Call {
				args,
				..
			} => args.iter().all(Node::is_constant),
			Node::Array(items) => items.iter().all(Node::is_constant),
			Node::Object(items) => items.iter().all(Node::is_constant),
			Node::ObjectElement {
				value,
				..
			} => value.is_constant(),
			Node::Subquery(_) => false,
		}
	}

	/// Substitutes every [`Node::Reference`] whose target id is a key of
	/// `mapping` with the mapped [`Variable`] (spec.md §4.1, "Replace
	/// variable").
	pub fn replace_variable(&mut self, mapping: &HashMap<u32, Variable>) {
		match self {
			Node::Reference(v) => {
				if let Some(replacement) = mapping.get(&v.id) {
					*v = replacement.clone();
				}
			}
			Node::Value(_) | Node::Collection(_) | Node::View(_) | Node::Nop => {}
			Node::Attribute {
				parent,
				..
			} => parent.replace_variable(mapping),
			Node::Indexed {
				parent,
				index,
			} => {
				parent.replace_variable(mapping);
				index.replace_variable(mapping);
			}
			Node::Binary {
				left,
				right,
				..
			} => {
				left.replace_variable(mapping);
				right.replace_variable(mapping);
			}
			Node::NAry {
				members,
				..
			} => {
				for m in members {
					m.replace_variable(mapping);
				}
			}
			Node::Call {
				args,
				..
			} => {
				for a in args {
					a.replace_variable(mapping);
				}
			}
			Node::Array(items) | Node::Object(items) => {
				for i in items {
					i.replace_variable(mapping);
				}
			}
			Node::ObjectElement {
				value,
				..
			} => value.replace_variable(mapping),
			Node::Subquery(inner) => inner.replace_variable(mapping),
		}
	}

	/// Rewrites every access chain `v.a.b.c` where `(v, [a,b,c])` matches
	/// `(search_var, path)` into a direct reference to `replacement`.
	/// Partial matches (e.g. just `v.a.b`) are left unchanged (spec.md
	/// §4.1, "Replace attribute access"). Returns the number of chains
	/// rewritten.
	pub fn replace_attribute_access(
		&mut self,
		search_var: &Variable,
		path: &[String],
		replacement: &Variable,
	) -> usize {
		if path.is_empty() {
			return 0;
		}
		if let Some(names) = full_chain_names(self) {
			if names.len() == path.len() && names == path && chain_root_is(self, search_var) {
				*self = Node::Reference(replacement.clone());
				return 1;
			}
		}
		let mut count = 0;
		match self {
			Node::Reference(_)
			| Node::Value(_)
			| Node::Collection(_)
			| Node::View(_)
			| Node::Nop => {}
			Node::Attribute {
				parent,
				..
			} => count += parent.replace_attribute_access(search_var, path, replacement),
			Node::Indexed {
				parent,
				index,
			} => {
				count += parent.replace_attribute_access(search_var, path, replacement);
				count += index.replace_attribute_access(search_var, path, replacement);
			}
			Node::Binary {
				left,
				right,
				..
			} => {
				count += left.replace_attribute_access(search_var, path, replacement);
				count += right.replace_attribute_access(search_var, path, replacement);
			}
			Node::NAry {
				members,
				..
			} => {
				for m in members {
					count += m.replace_attribute_access(search_var, path, replacement);
				}
			}
			Node::Call {
				args,
				..
			} => {
				for a in args {
					count += a.replace_attribute_access(search_var, path, replacement);
				}
			}
			Node::Array(items) | Node::Object(items) => {
				for i in items {
					count += i.replace_attribute_access(search_var, path, replacement);
				}
			}
			Node::ObjectElement {
				value,
				..
			} => count += value.replace_attribute_access(search_var, path, replacement),
			Node::Subquery(inner) => {
				count += inner.replace_attribute_access(search_var, path, replacement)
			}
		}
		count
	}

	/// Synchronous evaluation against an [`ExpressionContext`] (spec.md
	/// §5: "All user-visible expression evaluation is synchronous and
	/// in-process").
	pub fn evaluate(&self, ctx: &dyn ExpressionContext) -> Result<Value, Error> {
		match self {
			Node::Value(v) => Ok(v.clone()),
			Node::Reference(v) => ctx.lookup(v),
			Node::Attribute {
				parent,
				name,
			} => {
				let p = parent.evaluate(ctx)?;
				match p {
					Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
					Value::Null => Ok(Value::Null),
					other => Err(Error::TypeMismatch(format!(
						"cannot access attribute `{name}` on {}",
						other.type_name()
					))),
				}
			}
			Node::Indexed {
				parent,
				index,
			} => {
				let p = parent.evaluate(ctx)?;
				let i = index.evaluate(ctx)?;
				match (p, i) {
					(Value::Array(a), Value::Int(idx)) => {
						let idx = usize::try_from(idx)
							.map_err(|_| Error::TypeMismatch("negative index".into()))?;
						Ok(a.get(idx).cloned().unwrap_or(Value::Null))
					}
					(Value::Null, _) => Ok(Value::Null),
					(other, _) => Err(Error::TypeMismatch(format!(
						"cannot index into {}",
						other.type_name()
					))),
				}
			}
			Node::Binary {
				op,
				left,
				right,
			} => eval_binary(*op, left.evaluate(ctx)?, || right.evaluate(ctx)),
			Node::NAry {
				op,
				members,
			} => eval_nary(*op, members, ctx),
			Node::Array(items) => {
				let mut out = Vec::with_capacity(items.len());
				for i in items {
					out.push(i.evaluate(ctx)?);
				}
				Ok(Value::Array(out))
			}
			Node::Object(items) => {
				let mut out = std::collections::BTreeMap::new();
				for i in items {
					if let Node::ObjectElement {
						key,
						value,
					} = i
					{
						out.insert(key.clone(), value.evaluate(ctx)?);
					} else {
						return Err(Error::TypeMismatch(
							"object child is not an object element".into(),
						));
					}
				}
				Ok(Value::Object(out))
			}
			Node::ObjectElement {
				value,
				..
			} => value.evaluate(ctx),
			Node::Call {
				name,
				args,
			} => eval_call(name, args, ctx),
			Node::Collection(_) | Node::View(_) | Node::Subquery(_) | Node::Nop => {
				Err(Error::TypeMismatch("node has no scalar value".into()))
			}
		}
	}
}

fn eval_nary(op: Operator, members: &[Node], ctx: &dyn ExpressionContext) -> Result<Value, Error> {
	match op {
		Operator::And => {
			let mut last = Value::Bool(true);
			for m in members {
				last = m.evaluate(ctx)?;
				if !last.is_truthy() {
					return Ok(Value::Bool(false));
				}
			}
			Ok(Value::Bool(last.is_truthy()))
		}
		Operator::Or => {
			for m in members {
				let v = m.evaluate(ctx)?;
				if v.is_truthy() {
					return Ok(Value::Bool(true));
				}
			}
			Ok(Value::Bool(false))
		}
		_ => Err(Error::TypeMismatch(format!("{op} is not a valid n-ary combinator"))),
	}
}

fn eval_binary(
	op: Operator,
	left: Value,
	right: impl FnOnce() -> Result<Value, Error>,
) -> Result<Value, Error> {
	match op {
		Operator::And => {
			if !left.is_truthy() {
				return Ok(Value::Bool(false));
			}
			Ok(Value::Bool(right()?.is_truthy()))
		}
		Operator::Or => {
			if left.is_truthy() {
				return Ok(Value::Bool(true));
			}
			Ok(Value::Bool(right()?.is_truthy()))
		}
		Operator::Eq => Ok(Value::Bool(left == right()?)),
		Operator::Ne => Ok(Value::Bool(left != right()?)),
		Operator::Lt => compare(op, left, right()?),
		Operator::Le => compare(op, left, right()?),
		Operator::Gt => compare(op, left, right()?),
		Operator::Ge => compare(op, left, right()?),
		Operator::In => {
			let right = right()?;
			match right {
				Value::Array(items) => Ok(Value::Bool(items.contains(&left))),
				other => Err(Error::TypeMismatch(format!(
					"right-hand side of IN must be an array, got {}",
					other.type_name()
				))),
			}
		}
	}
}

/// Built-in functions available to `Call` evaluation. Arithmetic lives
/// here rather than as `Binary`/`NAry` operators because spec.md §3's
/// binary-operator list is exhaustively eq/ne/lt/le/gt/ge/and/or/in; the
/// engine still exposes arithmetic (and its failure modes — type
/// mismatch, division by zero) through function calls, the same way a
/// query surface layers `math::*` helpers over a minimal core operator
/// set.
fn eval_call(name: &str, args: &[Node], ctx: &dyn ExpressionContext) -> Result<Value, Error> {
	match name {
		"math::add" | "math::sub" | "math::mul" | "math::div" => {
			let [a, b] = args else {
				return Err(Error::TypeMismatch(format!("{name} takes exactly two arguments")));
			};
			let a = a.evaluate(ctx)?.as_f64().ok_or_else(|| {
				Error::TypeMismatch(format!("{name} requires numeric operands"))
			})?;
			let b = b.evaluate(ctx)?.as_f64().ok_or_else(|| {
				Error::TypeMismatch(format!("{name} requires numeric operands"))
			})?;
			let result = match name {
				"math::add" => a + b,
				"math::sub" => a - b,
				"math::mul" => a * b,
				"math::div" => {
					if b == 0.0 {
						return Err(Error::DivisionByZero);
					}
					a / b
				}
				_ => unreachable!(),
			};
			Ok(Value::Double(result))
		}
		other => Err(Error::TypeMismatch(format!("unsupported function call `{other}`"))),
	}
}

fn compare(op: Operator, left: Value, right: Value) -> Result<Value, Error> {
	let ordering = left.partial_cmp(&right).ok_or_else(|| {
		Error::TypeMismatch(format!(
			"cannot compare {} and {} with {op}",
			left.type_name(),
			right.type_name()
		))
	})?;
	let result = match op {
		Operator::Lt => ordering.is_lt(),
		Operator::Le => ordering.is_le(),
		Operator::Gt => ordering.is_gt(),
		Operator::Ge => ordering.is_ge(),
		_ => unreachable!("compare() only called for range comparisons"),
	};
	Ok(Value::Bool(result))
}

/// If `node` is a (possibly zero-length) `Attribute` chain rooted at a
/// `Reference`, returns the ordered attribute names. Returns `None` for
/// any other shape (e.g. a chain rooted at something other than a bare
/// reference).
fn full_chain_names(node: &Node) -> Option<Vec<String>> {
	let mut names = Vec::new();
	let mut cur = node;
	loop {
		match cur {
			Node::Attribute {
				parent,
				name,
			} => {
				names.push(name.clone());
				cur = parent;
			}
			Node::Reference(_) => {
				names.reverse();
				return Some(names);
			}
			_ => return None,
		}
	}
}

fn chain_root_is(node: &Node, var: &Variable) -> bool {
	let mut cur = node;
	loop {
		match cur {
			Node::Attribute {
				parent,
				..
			} => cur = parent,
			Node::Reference(v) => return v.id == var.id,
			_ => return false,
		}
	}
}

impl fmt::Display for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Node::Reference(v) => write!(f, "{v}"),
			Node::Value(v) => write!(f, "{v}"),
			Node::Attribute {
				parent,
				name,
			} => write!(f, "{parent}.{name}"),
			Node::Indexed {
				parent,
				index,
			} => write!(f, "{parent}[{index}]"),
			Node::Binary {
				op,
				left,
				right,
			} => write!(f, "({left} {op} {right})"),
			Node::NAry {
				op,
				members,
			} => {
				write!(f, "(")?;
				for (i, m) in members.iter().enumerate() {
					if i > 0 {
						write!(f, " {op} ")?;
					}
					write!(f, "{m}")?;
				}
				write!(f, ")")
			}
			Node::Call {
				name,
				args,
			} => {
				write!(f, "{name}(")?;
				for (i, a) in args.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{a}")?;
				}
				write!(f, ")")
			}
			Node::Array(items) => {
				write!(f, "[")?;
				for (i, a) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{a}")?;
				}
				write!(f, "]")
			}
			Node::Object(items) => {
				write!(f, "{{")?;
				for (i, a) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{a}")?;
				}
				write!(f, "}}")
			}
			Node::ObjectElement {
				key,
				value,
			} => write!(f, "{key}: {value}"),
			Node::Subquery(inner) => write!(f, "({inner})"),
			Node::Collection(name) => write!(f, "{name}"),
			Node::View(name) => write!(f, "{name}"),
			Node::Nop => write!(f, "NOP"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::context::NoBindings;
	use crate::expr::variable::VariableKind;

	fn var(id: u32, name: &str) -> Variable {
		Variable::new(id, name, VariableKind::UserDefined)
	}

	#[test]
	fn clone_does_not_share_mutable_state() {
		let v = var(1, "x");
		let mut original = Node::attribute(Node::Reference(v.clone()), "a");
		let mut clone = original.clone();
		let mut mapping = HashMap::new();
		mapping.insert(1, var(2, "y"));
		clone.replace_variable(&mapping);
		// original untouched
		assert!(matches!(&original, Node::Attribute{ parent, .. } if matches!(parent.as_ref(), Node::Reference(rv) if rv.id == 1)));
		assert!(matches!(&clone, Node::Attribute{ parent, .. } if matches!(parent.as_ref(), Node::Reference(rv) if rv.id == 2)));
		original.replace_variable(&mapping); // no-op below, just ensures no panic
	}

	#[test]
	fn replace_variable_identity_is_noop_semantically() {
		let v = var(1, "x");
		let mut node = Node::binary(
			Operator::Eq,
			Node::Reference(v.clone()),
			Node::Value(Value::Int(1)),
		);
		let before = node.clone();
		let mut mapping = HashMap::new();
		mapping.insert(1, v.clone());
		node.replace_variable(&mapping);
		assert_eq!(node, before);
	}

	#[test]
	fn replace_attribute_access_full_chain() {
		let v = var(1, "doc");
		let repl = var(2, "tmp");
		let mut node = Node::attribute(Node::attribute(Node::Reference(v.clone()), "a"), "b");
		let path = vec!["a".to_string(), "b".to_string()];
		let n = node.replace_attribute_access(&v, &path, &repl);
		assert_eq!(n, 1);
		assert_eq!(node, Node::Reference(repl));
	}

	#[test]
	fn replace_attribute_access_partial_match_untouched() {
		let v = var(1, "doc");
		let repl = var(2, "tmp");
		let mut node = Node::attribute(Node::Reference(v.clone()), "a");
		let path = vec!["a".to_string(), "b".to_string()];
		let n = node.replace_attribute_access(&v, &path, &repl);
		assert_eq!(n, 0);
		assert_eq!(node, Node::attribute(Node::Reference(v), "a"));
	}

	#[test]
	fn is_constant_detects_reference() {
		let v = var(1, "x");
		assert!(Node::Value(Value::Int(1)).is_constant());
		assert!(!Node::Reference(v.clone()).is_constant());
		assert!(!Node::attribute(Node::Reference(v), "a").is_constant());
	}

	#[test]
	fn evaluate_constant_arithmetic_comparison() {
		let node = Node::binary(Operator::Lt, Node::Value(Value::Int(1)), Node::Value(Value::Int(2)));
		let v = node.evaluate(&NoBindings).unwrap();
		assert_eq!(v, Value::Bool(true));
	}

	#[test]
	fn evaluate_in_operator() {
		let node = Node::binary(
			Operator::In,
			Node::Value(Value::String("b".into())),
			Node::Array(vec![
				Node::Value(Value::String("a".into())),
				Node::Value(Value::String("b".into())),
			]),
		);
		assert_eq!(node.evaluate(&NoBindings).unwrap(), Value::Bool(true));
	}

	#[test]
	fn evaluate_division_type_mismatch_reports_distinct_kind() {
		let node = Node::attribute(Node::Value(Value::Int(1)), "x");
		let err = node.evaluate(&NoBindings).unwrap_err();
		assert!(matches!(err, Error::TypeMismatch(_)));
	}

	#[test]
	fn evaluate_division_by_zero() {
		let node = Node::Call {
			name: "math::div".into(),
			args: vec![Node::Value(Value::Int(1)), Node::Value(Value::Int(0))],
		};
		let err = node.evaluate(&NoBindings).unwrap_err();
		assert_eq!(err, Error::DivisionByZero);
	}

	#[test]
	fn evaluate_undefined_variable() {
		let v = var(9, "missing");
		let err = Node::Reference(v).evaluate(&NoBindings).unwrap_err();
		assert!(matches!(err, Error::UndefinedVariable(_)));
	}
}
