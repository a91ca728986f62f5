//! Traverser Options (spec.md §4.5): the aggregate configuration consulted
//! by the Path Validator and both enumerators.
//!
//! Modeled per Design Notes §9 ("Option clone after preparation") as a
//! typed sum rather than a single struct with a boolean flag: a plain
//! `OptionsSpec` before indexes are resolved, and `OptionsSpec` plus the
//! resolved [`LookupInfoRegistry`]/vertex expressions afterward. The
//! `optionsBuilt` flag from spec.md §3 becomes this enum's discriminant,
//! so "operate on an unprepared options set" is a compile error rather
//! than a runtime check — the same shift the teacher makes wherever it
//! replaces a stringly-typed mode flag with an enum carrying payload
//! (e.g. `sql::statements::DefineIndexStatement`'s per-kind fields).

use crate::cnf::DEFAULT_EDGE_WEIGHT;
use crate::err::Error;
use crate::expr::context::{ExpressionContext, SingleBinding};
use crate::expr::node::Node;
use crate::expr::value::Value;
use crate::expr::variable::Variable;
use crate::idx::cursor::EdgeCursor;
use crate::idx::registry::LookupInfoRegistry;
use crate::idx::{EdgeIteratorFactory, LookupInfo};
use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[revisioned(revision = 1)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Order {
	Dfs,
	Bfs,
	Weighted,
}

#[revisioned(revision = 1)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum VertexUniqueness {
	None,
	Path,
	Global,
}

#[revisioned(revision = 1)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EdgeUniqueness {
	None,
	Path,
}

/// An expression bound for evaluation against prune/post-filter sites:
/// the expression itself, the ordered list of variables it may reference,
/// and which of those are fed the current vertex/edge/path (spec.md §3).
#[revisioned(revision = 1)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct BoundExpression {
	pub expression: Node,
	pub variables: Vec<Variable>,
	pub vertex_binding: Option<usize>,
	pub edge_binding: Option<usize>,
	pub path_binding: Option<usize>,
}

impl BoundExpression {
	/// Constructs a [`BoundExpression`] from its fields. Needed because the
	/// struct is `#[non_exhaustive]`, which blocks struct-literal
	/// construction from outside this crate (e.g. integration tests).
	pub fn new(
		expression: Node,
		variables: Vec<Variable>,
		vertex_binding: Option<usize>,
		edge_binding: Option<usize>,
		path_binding: Option<usize>,
	) -> Self {
		Self {
			expression,
			variables,
			vertex_binding,
			edge_binding,
			path_binding,
		}
	}
}

/// Everything about a traversal that is fixed before preparation and
/// carried unchanged afterward.
#[revisioned(revision = 1)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct OptionsSpec {
	pub min_depth: u32,
	pub max_depth: u32,
	pub mode: Order,
	pub vertex_uniqueness: VertexUniqueness,
	pub edge_uniqueness: EdgeUniqueness,
	pub weight_attribute: String,
	pub default_weight: f64,
	pub vertex_collections: Vec<String>,
	pub edge_collections: Vec<String>,
	pub parallelism: u32,
	pub tmp_var: Variable,
	pub prune: Option<BoundExpression>,
	pub post_filter: Option<BoundExpression>,
}

impl OptionsSpec {
	pub fn new(min_depth: u32, max_depth: u32, mode: Order, tmp_var: Variable) -> Result<Self, Error> {
		let spec = Self {
			min_depth,
			max_depth,
			mode,
			vertex_uniqueness: VertexUniqueness::None,
			edge_uniqueness: EdgeUniqueness::None,
			weight_attribute: String::new(),
			default_weight: DEFAULT_EDGE_WEIGHT,
			vertex_collections: Vec::new(),
			edge_collections: Vec::new(),
			parallelism: 1,
			tmp_var,
			prune: None,
			post_filter: None,
		};
		spec.check_invariants()?;
		Ok(spec)
	}

	pub fn check_invariants(&self) -> Result<(), Error> {
		if self.min_depth > self.max_depth {
			return Err(Error::InvalidDepth {
				min: self.min_depth as i64,
				max: self.max_depth as i64,
			});
		}
		if self.vertex_uniqueness == VertexUniqueness::Global && self.mode == Order::Dfs {
			return Err(Error::BadOption(
				"uniqueVertices=GLOBAL is legal only when mode != DFS".into(),
			));
		}
		if self.default_weight < 0.0 {
			return Err(Error::BadOption("defaultWeight must be non-negative".into()));
		}
		Ok(())
	}

	pub fn with_vertex_uniqueness(mut self, u: VertexUniqueness) -> Result<Self, Error> {
		self.vertex_uniqueness = u;
		self.check_invariants()?;
		Ok(self)
	}

	/// `uniqueEdges = GLOBAL` has no representation in [`EdgeUniqueness`]
	/// at all: the Open Question in spec.md §9 is resolved in favor of
	/// rejecting it unconditionally rather than modeling then validating
	/// it, so there is no variant to construct this spec with in the
	/// first place.
	pub fn with_edge_uniqueness(mut self, u: EdgeUniqueness) -> Self {
		self.edge_uniqueness = u;
		self
	}

	pub fn with_weight(mut self, attribute: impl Into<String>, default_weight: f64) -> Result<Self, Error> {
		self.weight_attribute = attribute.into();
		self.default_weight = default_weight;
		self.check_invariants()?;
		Ok(self)
	}

	/// spec.md §9 Open Question 3: eligibility is a single local check,
	/// always true here since prune/post-filter are pure evaluations with
	/// no cross-sub-enumeration side effects in this crate.
	pub fn parallelism_eligible(&self) -> bool {
		true
	}
}

/// The resolved state attached once `prepare()` has run: an accessor
/// registry plus per-depth and base vertex filter expressions.
#[derive(Clone, Debug, Default)]
pub struct PreparedAccessors {
	pub registry: LookupInfoRegistry,
	/// The same edge collections, resolved with each direction flipped.
	/// Unused by the single-sided enumerators (`traversal::walk`'s
	/// DFS/BFS/WEIGHTED only ever walk forward), and built regardless —
	/// the bidirectional k-paths enumerator's target-side ball needs it to
	/// discover predecessors instead of successors (spec.md §4.7).
	pub reverse_registry: LookupInfoRegistry,
	pub vertex_expressions: BTreeMap<u32, Node>,
	pub base_vertex_expression: Option<Node>,
}

/// The typed sum from Design Notes §9. `Unprepared` before
/// `prepareOptions()`; `Prepared` afterward, read-only for the rest of
/// the query (spec.md §5 "Shared-resource policy").
#[derive(Clone, Debug)]
pub enum TraverserOptions {
	Unprepared(OptionsSpec),
	Prepared(OptionsSpec, PreparedAccessors),
}

impl TraverserOptions {
	pub fn spec(&self) -> &OptionsSpec {
		match self {
			TraverserOptions::Unprepared(s) | TraverserOptions::Prepared(s, _) => s,
		}
	}

	pub fn is_prepared(&self) -> bool {
		matches!(self, TraverserOptions::Prepared(..))
	}

	/// Transitions `Unprepared -> Prepared`. Called by
	/// [`crate::plan::graph_node::GraphPlanNode::prepare_options`] once it
	/// has built the accessor registry.
	pub fn prepare(self, accessors: PreparedAccessors) -> Self {
		match self {
			TraverserOptions::Unprepared(spec) | TraverserOptions::Prepared(spec, _) => {
				TraverserOptions::Prepared(spec, accessors)
			}
		}
	}

	/// Deep-clones, following Design Notes §9: a prepared source clones
	/// prepared (spec + accessors); an unprepared source clones
	/// unprepared (spec only) even if accessors happened to be built —
	/// callers that need `clone_unprepared()` semantics should match on
	/// the enum and reconstruct explicitly.
	pub fn clone_deep(&self) -> Self {
		self.clone()
	}

	fn prepared(&self) -> Result<(&OptionsSpec, &PreparedAccessors), Error> {
		match self {
			TraverserOptions::Prepared(s, a) => Ok((s, a)),
			TraverserOptions::Unprepared(_) => {
				Err(Error::BadOption("traverser options have not been prepared".into()))
			}
		}
	}

	/// spec.md §4.5 `buildCursor(depth)`.
	pub fn build_cursor(
		&self,
		depth: u32,
		accessor_index: usize,
		factory: Arc<dyn EdgeIteratorFactory>,
	) -> Result<EdgeCursor, Error> {
		let (_, accessors) = self.prepared()?;
		let list = accessors.registry.accessors_at(depth);
		let lookup = list.get(accessor_index).ok_or_else(|| {
			Error::BadPlan(format!("no accessor at index {accessor_index} for depth {depth}"))
		})?;
		Ok(EdgeCursor::new(Arc::new(lookup.clone()), factory))
	}

	pub fn accessors_at(&self, depth: u32) -> Result<&[LookupInfo], Error> {
		let (_, accessors) = self.prepared()?;
		Ok(accessors.registry.accessors_at(depth))
	}

	/// The reverse-direction counterpart of [`Self::build_cursor`], used by
	/// `traversal::kpaths`'s target-side ball (spec.md §4.7).
	pub fn build_cursor_reverse(
		&self,
		depth: u32,
		accessor_index: usize,
		factory: Arc<dyn EdgeIteratorFactory>,
	) -> Result<EdgeCursor, Error> {
		let (_, accessors) = self.prepared()?;
		let list = accessors.reverse_registry.accessors_at(depth);
		let lookup = list.get(accessor_index).ok_or_else(|| {
			Error::BadPlan(format!("no reverse accessor at index {accessor_index} for depth {depth}"))
		})?;
		Ok(EdgeCursor::new(Arc::new(lookup.clone()), factory))
	}

	/// The reverse-direction counterpart of [`Self::accessors_at`].
	pub fn accessors_at_reverse(&self, depth: u32) -> Result<&[LookupInfo], Error> {
		let (_, accessors) = self.prepared()?;
		Ok(accessors.reverse_registry.accessors_at(depth))
	}

	/// spec.md §4.5 `evaluateEdgeExpression`.
	pub fn evaluate_edge_expression(
		&self,
		edge: &Value,
		depth: u32,
		cursor_index: usize,
	) -> Result<bool, Error> {
		let (spec, accessors) = self.prepared()?;
		let list = accessors.registry.accessors_at(depth);
		let lookup = list.get(cursor_index).ok_or_else(|| {
			Error::BadPlan(format!("no accessor at index {cursor_index} for depth {depth}"))
		})?;
		match &lookup.residual {
			None => Ok(true),
			Some(residual) => {
				let ctx = SingleBinding {
					variable: &spec.tmp_var,
					value: edge.clone(),
				};
				Ok(residual.evaluate(&ctx)?.is_truthy())
			}
		}
	}

	/// The reverse-direction counterpart of [`Self::evaluate_edge_expression`],
	/// evaluated against the reverse registry's residual for `cursor_index`.
	pub fn evaluate_edge_expression_reverse(
		&self,
		edge: &Value,
		depth: u32,
		cursor_index: usize,
	) -> Result<bool, Error> {
		let (spec, accessors) = self.prepared()?;
		let list = accessors.reverse_registry.accessors_at(depth);
		let lookup = list.get(cursor_index).ok_or_else(|| {
			Error::BadPlan(format!("no reverse accessor at index {cursor_index} for depth {depth}"))
		})?;
		match &lookup.residual {
			None => Ok(true),
			Some(residual) => {
				let ctx = SingleBinding {
					variable: &spec.tmp_var,
					value: edge.clone(),
				};
				Ok(residual.evaluate(&ctx)?.is_truthy())
			}
		}
	}

	/// spec.md §4.5 `evaluateVertexExpression`.
	pub fn evaluate_vertex_expression(&self, vertex: &Value, depth: u32) -> Result<bool, Error> {
		let (spec, accessors) = self.prepared()?;
		let expr = accessors
			.vertex_expressions
			.get(&depth)
			.or(accessors.base_vertex_expression.as_ref());
		match expr {
			None => Ok(true),
			Some(e) => {
				let ctx = SingleBinding {
					variable: &spec.tmp_var,
					value: vertex.clone(),
				};
				Ok(e.evaluate(&ctx)?.is_truthy())
			}
		}
	}

	/// spec.md §4.5 `destinationCollectionAllowed`. The opposite endpoint
	/// is expected to be a `collection/key`-shaped id string.
	pub fn destination_collection_allowed(&self, opposite_vertex_id: &str) -> bool {
		let spec = self.spec();
		if spec.vertex_collections.is_empty() {
			return true;
		}
		let collection = opposite_vertex_id.split('/').next().unwrap_or(opposite_vertex_id);
		spec.vertex_collections.iter().any(|c| c == collection)
	}

	/// spec.md §4.5 `weightEdge`.
	pub fn weight_edge(&self, edge: &Value) -> Result<f64, Error> {
		let spec = self.spec();
		if spec.weight_attribute.is_empty() {
			return Ok(spec.default_weight);
		}
		let attr = match edge {
			Value::Object(map) => map.get(&spec.weight_attribute),
			_ => None,
		};
		let weight = match attr.and_then(Value::as_f64) {
			Some(w) => w,
			None => return Ok(spec.default_weight),
		};
		if weight < 0.0 {
			return Err(Error::NegativeWeight {
				edge: edge.to_string(),
				weight,
			});
		}
		Ok(weight)
	}

	/// Evaluates a [`BoundExpression`], binding vertex/edge/path slots
	/// from the supplied values where the expression declared a binding
	/// position for them.
	fn evaluate_bound(
		bound: &BoundExpression,
		vertex: Option<&Value>,
		edge: Option<&Value>,
		path: Option<&Value>,
	) -> Result<Value, Error> {
		use crate::expr::context::MapBindings;
		let mut ctx = MapBindings::new();
		if let (Some(idx), Some(v)) = (bound.vertex_binding, vertex) {
			if let Some(var) = bound.variables.get(idx) {
				ctx.set(var, v.clone());
			}
		}
		if let (Some(idx), Some(e)) = (bound.edge_binding, edge) {
			if let Some(var) = bound.variables.get(idx) {
				ctx.set(var, e.clone());
			}
		}
		if let (Some(idx), Some(p)) = (bound.path_binding, path) {
			if let Some(var) = bound.variables.get(idx) {
				ctx.set(var, p.clone());
			}
		}
		bound.expression.evaluate(&ctx)
	}

	/// Evaluates the prune expression at a candidate vertex; `Ok(true)`
	/// means stop expanding past it (spec.md §4.6, §9 glossary "Prune").
	pub fn evaluate_prune(&self, vertex: &Value) -> Result<bool, Error> {
		match &self.spec().prune {
			None => Ok(false),
			Some(bound) => Ok(Self::evaluate_bound(bound, Some(vertex), None, None)?.is_truthy()),
		}
	}

	/// Evaluates the post-filter at a potential emission site; `Ok(false)`
	/// drops the path without affecting expansion (spec.md §4.6).
	pub fn evaluate_post_filter(&self, vertex: &Value, edge: Option<&Value>) -> Result<bool, Error> {
		match &self.spec().post_filter {
			None => Ok(true),
			Some(bound) => Ok(Self::evaluate_bound(bound, Some(vertex), edge, None)?.is_truthy()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::operator::Operator;
	use crate::expr::variable::VariableKind;

	fn tmp() -> Variable {
		Variable::new(0, "v", VariableKind::Temporary)
	}

	#[test]
	fn global_uniqueness_rejected_under_dfs() {
		let err = OptionsSpec::new(1, 3, Order::Dfs, tmp())
			.unwrap()
			.with_vertex_uniqueness(VertexUniqueness::Global)
			.unwrap_err();
		assert!(matches!(err, Error::BadOption(_)));
	}

	#[test]
	fn global_uniqueness_allowed_under_bfs() {
		let spec = OptionsSpec::new(1, 3, Order::Bfs, tmp())
			.unwrap()
			.with_vertex_uniqueness(VertexUniqueness::Global)
			.unwrap();
		assert_eq!(spec.vertex_uniqueness, VertexUniqueness::Global);
	}

	#[test]
	fn inverted_depth_bounds_rejected() {
		let err = OptionsSpec::new(5, 2, Order::Dfs, tmp()).unwrap_err();
		assert!(matches!(err, Error::InvalidDepth { .. }));
	}

	#[test]
	fn negative_default_weight_rejected() {
		let err = OptionsSpec::new(0, 1, Order::Weighted, tmp())
			.unwrap()
			.with_weight("w", -1.0)
			.unwrap_err();
		assert!(matches!(err, Error::BadOption(_)));
	}

	#[test]
	fn unprepared_operations_fail_closed() {
		let opts = TraverserOptions::Unprepared(OptionsSpec::new(0, 1, Order::Dfs, tmp()).unwrap());
		let err = opts
			.evaluate_vertex_expression(&Value::Null, 0)
			.unwrap_err();
		assert!(matches!(err, Error::BadOption(_)));
	}

	#[test]
	fn destination_collection_restriction() {
		let mut spec = OptionsSpec::new(0, 1, Order::Dfs, tmp()).unwrap();
		spec.vertex_collections = vec!["people".into()];
		let opts = TraverserOptions::Prepared(spec, PreparedAccessors::default());
		assert!(opts.destination_collection_allowed("people/42"));
		assert!(!opts.destination_collection_allowed("things/42"));
	}

	#[test]
	fn weight_edge_uses_default_when_missing_or_non_numeric() {
		let spec = OptionsSpec::new(0, 1, Order::Weighted, tmp())
			.unwrap()
			.with_weight("w", 7.0)
			.unwrap();
		let opts = TraverserOptions::Prepared(spec, PreparedAccessors::default());
		assert_eq!(opts.weight_edge(&Value::Object(Default::default())).unwrap(), 7.0);
		let mut map = std::collections::BTreeMap::new();
		map.insert("w".to_string(), Value::String("nope".into()));
		assert_eq!(opts.weight_edge(&Value::Object(map)).unwrap(), 7.0);
	}

	#[test]
	fn negative_edge_weight_is_fatal() {
		let spec = OptionsSpec::new(0, 1, Order::Weighted, tmp())
			.unwrap()
			.with_weight("w", 1.0)
			.unwrap();
		let opts = TraverserOptions::Prepared(spec, PreparedAccessors::default());
		let mut map = std::collections::BTreeMap::new();
		map.insert("w".to_string(), Value::Double(-3.0));
		let err = opts.weight_edge(&Value::Object(map)).unwrap_err();
		assert!(matches!(err, Error::NegativeWeight { .. }));
	}

	#[test]
	fn prune_expression_evaluates_against_vertex_binding() {
		let v = tmp();
		let expr = Node::binary(
			Operator::Eq,
			Node::attribute(Node::Reference(v.clone()), "_key"),
			Node::Value(Value::String("3".into())),
		);
		let mut spec = OptionsSpec::new(1, 3, Order::Dfs, v.clone()).unwrap();
		spec.prune = Some(BoundExpression {
			expression: expr,
			variables: vec![v],
			vertex_binding: Some(0),
			edge_binding: None,
			path_binding: None,
		});
		let opts = TraverserOptions::Prepared(spec, PreparedAccessors::default());
		let mut doc = std::collections::BTreeMap::new();
		doc.insert("_key".to_string(), Value::String("3".into()));
		assert!(opts.evaluate_prune(&Value::Object(doc)).unwrap());
	}
}
