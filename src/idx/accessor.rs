//! Index accessor synthesis (spec.md §4.2): for one edge collection,
//! direction, and candidate condition, pick one index, split the
//! condition into index-covered vs. residual parts, and remember which
//! subexpression must be patched with the current vertex id at each
//! expansion step.
//!
//! Grounded on `idx::planner::plan::PlanBuilder`/`IndexOption` in the
//! teacher crate — the same "pick a winner among candidate indexes, keep
//! the covered members, wrap the rest as a residual expression" shape,
//! generalized from "the whole WHERE clause" to "one edge collection's
//! adjacency condition at one depth".

use crate::cnf::NOMINAL_INDEX_CARDINALITY_ESTIMATE;
use crate::err::Error;
use crate::expr::node::Node;
use crate::expr::operator::Operator;
use crate::expr::value::Value;
use crate::expr::variable::Variable;
use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[revisioned(revision = 1)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Direction {
	Inbound,
	Outbound,
}

impl Direction {
	/// The attribute name this direction's equality test targets on an
	/// edge document: `_to` for inbound traversal (we arrived following
	/// an edge pointing at us), `_from` for outbound.
	pub fn endpoint_field(self) -> &'static str {
		match self {
			Direction::Inbound => "_to",
			Direction::Outbound => "_from",
		}
	}

	/// The opposite direction: what a walk configured for `self` must scan
	/// to find predecessors instead of successors — used to give a
	/// bidirectional enumerator's target-side ball its own accessor set
	/// (spec.md §4.7).
	pub fn reverse(self) -> Direction {
		match self {
			Direction::Inbound => Direction::Outbound,
			Direction::Outbound => Direction::Inbound,
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Direction::Inbound => write!(f, "inbound"),
			Direction::Outbound => write!(f, "outbound"),
		}
	}
}

/// `{indexHint: {type, forced, waitForSync, indexLookahead, hint}}`
/// (spec.md §6). Only the `Simple` shape is modeled here; `Nested` would
/// carry per-collection/per-direction/per-depth candidate lists, which
/// this crate does not need beyond round-tripping the flag that disables
/// hinting outright.
#[revisioned(revision = 1)]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum IndexHint {
	/// A list of candidate index-id strings, in preference order.
	Simple(Vec<String>),
	/// Hinting disabled entirely for this accessor.
	Disabled,
}

/// What the storage layer ("transaction layer" in spec.md §4.2) reports
/// back for a candidate index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexChoice {
	pub id: String,
	/// Whether this index's key fields cover both endpoints, enabling
	/// the cursor's covering scan fast path. Per the Open Question
	/// resolution in SPEC_FULL.md, the opposite-endpoint position is
	/// always addressed positionally through a single field index,
	/// unifying the single-field and two-field cases the source handled
	/// with separate code paths.
	pub covered_endpoint_field: Option<usize>,
	pub estimated_cost: u64,
}

/// The "transaction layer" collaborator: given a collection, direction,
/// condition, and optional hint, picks the best index. Out of scope per
/// spec.md §1 beyond this trait boundary.
pub trait IndexCatalog {
	fn candidate_indexes(
		&self,
		collection: &str,
		direction: Direction,
	) -> Result<Vec<IndexChoice>, Error>;
}

/// Applies the ordering/tie-break rule from spec.md §4.2: hinted index
/// wins; otherwise lowest estimated cost; ties broken by declared index
/// id for determinism.
fn choose_index(
	mut candidates: Vec<IndexChoice>,
	hint: Option<&IndexHint>,
) -> Result<IndexChoice, Error> {
	if candidates.is_empty() {
		return Err(Error::NoIndex {
			collection: String::new(),
			direction: String::new(),
		});
	}
	if let Some(IndexHint::Simple(ids)) = hint {
		for id in ids {
			if let Some(pos) = candidates.iter().position(|c| &c.id == id) {
				return Ok(candidates.remove(pos));
			}
		}
	}
	candidates.sort_by(|a, b| a.estimated_cost.cmp(&b.estimated_cost).then_with(|| a.id.cmp(&b.id)));
	Ok(candidates.into_iter().next().expect("checked non-empty above"))
}

/// A non-constant subexpression of the index condition, annotated with
/// the positional path (the index into [`LookupInfo::condition`]) at
/// which its evaluated value must be substituted before each scan.
#[revisioned(revision = 1)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct NonConstSubexpr {
	pub position: usize,
	pub expression: Node,
}

/// A Lookup Info: how to scan one edge collection in one direction,
/// optionally for a specific depth (spec.md §3).
#[revisioned(revision = 1)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LookupInfo {
	pub direction: Direction,
	/// One index handle per shard after cluster expansion; exactly one
	/// in single-node (spec.md §3).
	pub index_ids: Vec<String>,
	/// The index search condition, as the direct AND operands of the
	/// (possibly single-predicate) condition tree — kept flat so a
	/// patch position is a plain `usize` rather than a tree path.
	pub condition: Vec<Node>,
	/// The residual expression, or `None` when the index fully covers
	/// the filter.
	pub residual: Option<Node>,
	pub condition_need_update: bool,
	pub condition_member_to_update: Option<usize>,
	pub non_const: Vec<NonConstSubexpr>,
	pub covered_endpoint_field: Option<usize>,
}

impl LookupInfo {
	/// Invariant check from spec.md §3: if `condition_need_update` is
	/// true, the pointed-to member must be a binary equality whose
	/// right operand is a string value.
	pub fn check_invariants(&self) -> Result<(), Error> {
		if self.condition_need_update {
			let pos = self.condition_member_to_update.ok_or_else(|| {
				Error::BadPlan("condition_need_update set without a member to update".into())
			})?;
			let member = self.condition.get(pos).ok_or_else(|| {
				Error::BadPlan(format!("condition member {pos} out of range"))
			})?;
			let ok = matches!(
				member,
				Node::Binary {
					op: Operator::Eq,
					right,
					..
				} if matches!(right.as_ref(), Node::Value(Value::String(_)))
			);
			if !ok {
				return Err(Error::BadPlan(
					"patched member must be a binary equality against a string value".into(),
				));
			}
		}
		Ok(())
	}
}

/// Implements the five-step algorithm from spec.md §4.2.
pub fn build_lookup_info(
	collection: &str,
	direction: Direction,
	vertex_var: &Variable,
	condition: &Node,
	hint: Option<&IndexHint>,
	catalog: &dyn IndexCatalog,
) -> Result<LookupInfo, Error> {
	// Step 1: clone into a fresh subtree that may be rewritten; the
	// original stays untouched as the remainder base.
	let index_condition: Vec<Node> = condition.and_operands().into_iter().cloned().collect();
	let remainder_base = index_condition.clone();

	// Step 2: ask the transaction layer for the best index.
	let candidates = catalog.candidate_indexes(collection, direction)?;
	let chosen = choose_index(candidates, hint).map_err(|_| Error::NoIndex {
		collection: collection.to_string(),
		direction: direction.to_string(),
	})?;
	let _ = NOMINAL_INDEX_CARDINALITY_ESTIMATE; // the nominal estimate the catalog is expected to use internally

	// Step 3: find the member patched per-vertex.
	let mut condition_member_to_update = None;
	let mut condition_need_update = false;
	for (pos, member) in index_condition.iter().enumerate() {
		if let Some((field, _)) = member.as_attribute_equality_on(vertex_var) {
			if field == direction.endpoint_field() {
				condition_member_to_update = Some(pos);
				condition_need_update = true;
				break;
			}
		}
	}

	// Step 4: compute the residual — members of the remainder not
	// covered by the index condition, i.e. everything but the
	// endpoint-field equality the index was actually built on (found
	// in step 3).
	let remaining: Vec<Node> = remainder_base
		.into_iter()
		.enumerate()
		.filter(|(pos, _)| Some(*pos) != condition_member_to_update)
		.map(|(_, member)| member)
		.collect();
	let residual = match remaining.len() {
		0 => None,
		1 => Some(remaining.into_iter().next().expect("len checked")),
		_ => Some(Node::and(remaining)),
	};

	// Step 5: extract non-constant subexpressions, annotated with their
	// position in the flat condition list.
	let non_const = index_condition
		.iter()
		.enumerate()
		.filter(|(_, m)| !m.is_constant())
		.map(|(position, expression)| NonConstSubexpr {
			position,
			expression: expression.clone(),
		})
		.collect();

	let info = LookupInfo {
		direction,
		index_ids: vec![chosen.id],
		condition: index_condition,
		residual,
		condition_need_update,
		condition_member_to_update,
		non_const,
		covered_endpoint_field: chosen.covered_endpoint_field,
	};
	info.check_invariants()?;
	Ok(info)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::variable::VariableKind;

	struct FakeCatalog {
		choices: Vec<IndexChoice>,
	}

	impl IndexCatalog for FakeCatalog {
		fn candidate_indexes(
			&self,
			_collection: &str,
			_direction: Direction,
		) -> Result<Vec<IndexChoice>, Error> {
			Ok(self.choices.clone())
		}
	}

	fn vertex_var() -> Variable {
		Variable::new(0, "v", VariableKind::Temporary)
	}

	#[test]
	fn splits_covered_equality_from_residual() {
		let v = vertex_var();
		let condition = Node::and(vec![
			Node::binary(
				Operator::Eq,
				Node::attribute(Node::Reference(v.clone()), "_from"),
				Node::Value(Value::String("v/1".into())),
			),
			Node::binary(
				Operator::Gt,
				Node::attribute(Node::Reference(v.clone()), "weight"),
				Node::Value(Value::Int(0)),
			),
		]);
		let catalog = FakeCatalog {
			choices: vec![IndexChoice {
				id: "edge-from-idx".into(),
				covered_endpoint_field: Some(0),
				estimated_cost: 10,
			}],
		};
		let info = build_lookup_info(
			"knows",
			Direction::Outbound,
			&v,
			&condition,
			None,
			&catalog,
		)
		.unwrap();
		assert!(info.condition_need_update);
		assert_eq!(info.condition_member_to_update, Some(0));
		assert!(info.residual.is_some());
		assert_eq!(info.index_ids, vec!["edge-from-idx".to_string()]);
	}

	#[test]
	fn fully_covered_condition_has_no_residual() {
		let v = vertex_var();
		let condition = Node::binary(
			Operator::Eq,
			Node::attribute(Node::Reference(v.clone()), "_from"),
			Node::Value(Value::String("v/1".into())),
		);
		let catalog = FakeCatalog {
			choices: vec![IndexChoice {
				id: "edge-from-idx".into(),
				covered_endpoint_field: Some(0),
				estimated_cost: 5,
			}],
		};
		let info =
			build_lookup_info("knows", Direction::Outbound, &v, &condition, None, &catalog)
				.unwrap();
		assert!(info.residual.is_none());
	}

	#[test]
	fn no_candidate_index_is_fatal() {
		let v = vertex_var();
		let condition = Node::Value(Value::Bool(true));
		let catalog = FakeCatalog {
			choices: vec![],
		};
		let err =
			build_lookup_info("knows", Direction::Outbound, &v, &condition, None, &catalog)
				.unwrap_err();
		assert!(matches!(err, Error::NoIndex { .. }));
	}

	#[test]
	fn hint_overrides_cost_ordering() {
		let v = vertex_var();
		let condition = Node::Value(Value::Bool(true));
		let catalog = FakeCatalog {
			choices: vec![
				IndexChoice {
					id: "cheap".into(),
					covered_endpoint_field: None,
					estimated_cost: 1,
				},
				IndexChoice {
					id: "hinted".into(),
					covered_endpoint_field: None,
					estimated_cost: 100,
				},
			],
		};
		let hint = IndexHint::Simple(vec!["hinted".to_string()]);
		let info = build_lookup_info(
			"knows",
			Direction::Outbound,
			&v,
			&condition,
			Some(&hint),
			&catalog,
		)
		.unwrap();
		assert_eq!(info.index_ids, vec!["hinted".to_string()]);
	}

	#[test]
	fn direction_reverse_is_involutive() {
		assert_eq!(Direction::Outbound.reverse(), Direction::Inbound);
		assert_eq!(Direction::Inbound.reverse(), Direction::Outbound);
		assert_eq!(Direction::Outbound.reverse().reverse(), Direction::Outbound);
	}

	#[test]
	fn ties_broken_by_index_id() {
		let v = vertex_var();
		let condition = Node::Value(Value::Bool(true));
		let catalog = FakeCatalog {
			choices: vec![
				IndexChoice {
					id: "b".into(),
					covered_endpoint_field: None,
					estimated_cost: 5,
				},
				IndexChoice {
					id: "a".into(),
					covered_endpoint_field: None,
					estimated_cost: 5,
				},
			],
		};
		let info =
			build_lookup_info("knows", Direction::Outbound, &v, &condition, None, &catalog)
				.unwrap();
		assert_eq!(info.index_ids, vec!["a".to_string()]);
	}
}
