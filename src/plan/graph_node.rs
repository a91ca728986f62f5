//! The Graph Plan Node (spec.md §4.9): the planner-facing object that
//! accumulates start-vertex binding, collection/direction lists, output
//! variables, and per-depth conditions, then turns all of that into a
//! prepared [`TraverserOptions`] exactly once.
//!
//! Grounded on the teacher's `plan::Explanation`-producing executor nodes
//! (`dbs::executor`), which hold their configuration as plain fields set
//! by builder-style methods during planning and only resolve storage
//! handles (index/table lookups) in a single preparation step before
//! execution — the same shape `prepare_options` gives this node relative
//! to `set_*`/`register_*`.

use crate::err::Error;
use crate::expr::node::Node;
use crate::expr::value::Value;
use crate::expr::variable::Variable;
use crate::idx::accessor::{build_lookup_info, Direction, IndexCatalog, IndexHint};
use crate::idx::registry::LookupInfoRegistry;
use crate::traversal::options::{BoundExpression, OptionsSpec, PreparedAccessors, TraverserOptions};
use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which path-enumeration state machine this node drives (SPEC_FULL.md
/// supplement: the original distinguishes these as separate executor
/// node kinds sharing one options/accessor model).
#[revisioned(revision = 1)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WalkKind {
	/// DFS/BFS/WEIGHTED single-sided enumeration (`traversal::walk`).
	Traversal,
	/// Bidirectional k-paths (`traversal::kpaths`).
	KPaths,
	/// k-paths restricted to the cheapest `k` by accumulated weight.
	KShortestPaths,
	/// The single cheapest path between source and target.
	ShortestPath,
}

/// Where this node's options will be evaluated (SPEC_FULL.md supplement):
/// a coordinator in a cluster deployment holds no local shard data, so a
/// post-filter condition that cannot be proven shard-executable must be
/// rejected there rather than silently shipped to a shard that can't run
/// it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentMode {
	Coordinator,
	SingleServer,
}

/// The start-vertex specification: either an input row's binding or a
/// literal `collection/key` string (spec.md §4.9).
#[revisioned(revision = 1)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StartVertex {
	Bound(Node),
	Literal(String),
}

impl StartVertex {
	fn as_node(&self) -> Node {
		match self {
			StartVertex::Bound(n) => n.clone(),
			StartVertex::Literal(s) => Node::Value(Value::String(s.clone())),
		}
	}
}

/// The wire shape for `serialize`/`deserialize` (spec.md §6): flat and
/// independent of whatever in-memory layout `GraphPlanNode` happens to
/// use, so a cluster coordinator and a shard on a different crate
/// revision can still exchange a plan slice.
#[revisioned(revision = 1)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct PlanWire {
	pub walk_kind: WalkKind,
	pub start_vertex: StartVertex,
	pub target_vertex: Option<StartVertex>,
	pub directions: Vec<Direction>,
	pub edge_collections: Vec<String>,
	pub vertex_collections: Vec<String>,
	pub result_variable: Option<Variable>,
	pub vertex_output: Option<Variable>,
	pub edge_output: Option<Variable>,
	pub path_output: Option<Variable>,
	pub global_vertex_conditions: Vec<Node>,
	pub global_edge_conditions: Vec<Node>,
	pub depth_edge_conditions: BTreeMap<u32, Vec<Node>>,
	pub depth_vertex_conditions: BTreeMap<u32, Node>,
	pub spec: OptionsSpec,
	pub options_built: bool,
}

/// The Graph Plan Node itself (spec.md §4.9).
#[derive(Clone, Debug)]
pub struct GraphPlanNode {
	pub walk_kind: WalkKind,
	pub start_vertex: StartVertex,
	pub target_vertex: Option<StartVertex>,
	pub directions: Vec<Direction>,
	pub edge_collections: Vec<String>,
	pub vertex_collections: Vec<String>,
	pub result_variable: Option<Variable>,
	pub vertex_output: Option<Variable>,
	pub edge_output: Option<Variable>,
	pub path_output: Option<Variable>,
	pub global_vertex_conditions: Vec<Node>,
	pub global_edge_conditions: Vec<Node>,
	pub depth_edge_conditions: BTreeMap<u32, Vec<Node>>,
	pub depth_vertex_conditions: BTreeMap<u32, Node>,
	pub options: TraverserOptions,
}

impl GraphPlanNode {
	pub fn new(walk_kind: WalkKind, start_vertex: StartVertex, spec: OptionsSpec) -> Self {
		Self {
			walk_kind,
			start_vertex,
			target_vertex: None,
			directions: Vec::new(),
			edge_collections: Vec::new(),
			vertex_collections: spec.vertex_collections.clone(),
			result_variable: None,
			vertex_output: None,
			edge_output: None,
			path_output: None,
			global_vertex_conditions: Vec::new(),
			global_edge_conditions: Vec::new(),
			depth_edge_conditions: BTreeMap::new(),
			depth_vertex_conditions: BTreeMap::new(),
			options: TraverserOptions::Unprepared(spec),
		}
	}

	pub fn add_edge_collection(&mut self, collection: impl Into<String>, direction: Direction) {
		self.edge_collections.push(collection.into());
		self.directions.push(direction);
	}

	pub fn set_variable(&mut self, var: Variable) {
		self.result_variable = Some(var);
	}

	pub fn set_vertex_output(&mut self, var: Variable) {
		self.vertex_output = Some(var);
	}

	pub fn set_edge_output(&mut self, var: Variable) {
		self.edge_output = Some(var);
	}

	pub fn set_path_output(&mut self, var: Variable) {
		self.path_output = Some(var);
	}

	/// Installs a per-depth condition (spec.md §4.9). `is_edge = false`
	/// collapses vertex conditions at the same depth with AND, matching
	/// how `global_vertex_conditions` accumulate.
	pub fn register_condition(&mut self, is_edge: bool, depth: u32, condition: Node) -> Result<(), Error> {
		self.fail_if_built()?;
		if is_edge {
			self.depth_edge_conditions.entry(depth).or_default().push(condition);
		} else {
			let entry = self.depth_vertex_conditions.entry(depth).or_insert(Node::Value(Value::Bool(true)));
			*entry = Node::and(vec![std::mem::take(entry), condition]);
		}
		Ok(())
	}

	pub fn register_global_condition(&mut self, is_edge: bool, condition: Node) -> Result<(), Error> {
		self.fail_if_built()?;
		if is_edge {
			self.global_edge_conditions.push(condition);
		} else {
			self.global_vertex_conditions.push(condition);
		}
		Ok(())
	}

	/// Installs the post-filter expression, first checking it can run
	/// wherever this node ends up executing. A coordinator has no local
	/// shard to evaluate against, so any opaque [`Node::Subquery`] —
	/// which this crate cannot prove side-effect-free or shard-local —
	/// makes the condition unrunnable there (spec.md §9 glossary
	/// "Post-filter"; the shard-executability rule itself is this
	/// crate's reading of the dropped AQL `CalculationNode` placement
	/// rules in `original_source/arangod/Aql/Optimizer2`).
	pub fn register_post_filter_condition(
		&mut self,
		bound: BoundExpression,
		mode: DeploymentMode,
	) -> Result<(), Error> {
		self.fail_if_built()?;
		if mode == DeploymentMode::Coordinator && contains_subquery(&bound.expression) {
			return Err(Error::BadOption(
				"post-filter condition containing a subquery cannot run on a coordinator".into(),
			));
		}
		match &mut self.options {
			TraverserOptions::Unprepared(spec) => spec.post_filter = Some(bound),
			TraverserOptions::Prepared(spec, _) => spec.post_filter = Some(bound),
		}
		Ok(())
	}

	pub fn set_prune_condition(&mut self, bound: BoundExpression) -> Result<(), Error> {
		self.fail_if_built()?;
		match &mut self.options {
			TraverserOptions::Unprepared(spec) => spec.prune = Some(bound),
			TraverserOptions::Prepared(spec, _) => spec.prune = Some(bound),
		}
		Ok(())
	}

	fn fail_if_built(&self) -> Result<(), Error> {
		if self.options.is_prepared() {
			return Err(Error::BadOption(
				"cannot mutate a graph plan node after prepare_options() has run".into(),
			));
		}
		Ok(())
	}

	/// spec.md §4.1 "Replace variable", applied to every expression this
	/// node owns. Fails if options are already built, since a rewrite
	/// after preparation would leave the resolved accessors referencing
	/// stale variable ids.
	pub fn replace_variables(&mut self, mapping: &std::collections::HashMap<u32, Variable>) -> Result<(), Error> {
		self.fail_if_built()?;
		if let StartVertex::Bound(n) = &mut self.start_vertex {
			n.replace_variable(mapping);
		}
		if let Some(StartVertex::Bound(n)) = &mut self.target_vertex {
			n.replace_variable(mapping);
		}
		for n in self.global_vertex_conditions.iter_mut().chain(self.global_edge_conditions.iter_mut()) {
			n.replace_variable(mapping);
		}
		for members in self.depth_edge_conditions.values_mut() {
			for n in members {
				n.replace_variable(mapping);
			}
		}
		for n in self.depth_vertex_conditions.values_mut() {
			n.replace_variable(mapping);
		}
		if let TraverserOptions::Unprepared(spec) = &mut self.options {
			if let Some(bound) = &mut spec.prune {
				bound.expression.replace_variable(mapping);
			}
			if let Some(bound) = &mut spec.post_filter {
				bound.expression.replace_variable(mapping);
			}
		}
		Ok(())
	}

	/// spec.md §4.1 "Replace attribute access", applied to every
	/// expression this node owns; returns the total number of chains
	/// rewritten.
	pub fn replace_attribute_access(
		&mut self,
		search_var: &Variable,
		path: &[String],
		replacement: &Variable,
	) -> Result<usize, Error> {
		self.fail_if_built()?;
		let mut count = 0;
		if let StartVertex::Bound(n) = &mut self.start_vertex {
			count += n.replace_attribute_access(search_var, path, replacement);
		}
		if let Some(StartVertex::Bound(n)) = &mut self.target_vertex {
			count += n.replace_attribute_access(search_var, path, replacement);
		}
		for n in self.global_vertex_conditions.iter_mut().chain(self.global_edge_conditions.iter_mut()) {
			count += n.replace_attribute_access(search_var, path, replacement);
		}
		for members in self.depth_edge_conditions.values_mut() {
			for n in members {
				count += n.replace_attribute_access(search_var, path, replacement);
			}
		}
		for n in self.depth_vertex_conditions.values_mut() {
			count += n.replace_attribute_access(search_var, path, replacement);
		}
		if let TraverserOptions::Unprepared(spec) = &mut self.options {
			if let Some(bound) = &mut spec.prune {
				count += bound.expression.replace_attribute_access(search_var, path, replacement);
			}
			if let Some(bound) = &mut spec.post_filter {
				count += bound.expression.replace_attribute_access(search_var, path, replacement);
			}
		}
		Ok(count)
	}

	/// spec.md §4.9 `prepareOptions`: resolves every (edge collection,
	/// direction) pair into a base [`crate::idx::LookupInfo`], resolves
	/// per-depth overrides the same way, and transitions
	/// `self.options` from `Unprepared` to `Prepared`. Idempotent:
	/// calling it again simply rebuilds from the currently-registered
	/// conditions.
	pub fn prepare_options(&mut self, catalog: &dyn IndexCatalog, hint: Option<&IndexHint>) -> Result<(), Error> {
		let start_node = self.start_vertex.as_node();
		if !matches!(start_node, Node::Reference(_) | Node::Value(Value::String(_))) {
			return Err(Error::ParseError(
				"start-vertex expression is neither a reference nor a string literal".into(),
			));
		}

		let spec = match &self.options {
			TraverserOptions::Unprepared(s) | TraverserOptions::Prepared(s, _) => s.clone(),
		};
		let tmp_var = spec.tmp_var.clone();
		let global_edge = combine(&self.global_edge_conditions);

		let mut base = Vec::new();
		let mut reverse_base = Vec::new();
		for (collection, &direction) in self.edge_collections.iter().zip(&self.directions) {
			base.push(build_lookup_info(collection, direction, &tmp_var, &global_edge, hint, catalog)?);
			reverse_base.push(build_lookup_info(
				collection,
				direction.reverse(),
				&tmp_var,
				&global_edge,
				hint,
				catalog,
			)?);
		}

		let mut registry = LookupInfoRegistry::new(base);
		let mut reverse_registry = LookupInfoRegistry::new(reverse_base);
		for (&depth, extra) in &self.depth_edge_conditions {
			let mut level = Vec::new();
			let mut reverse_level = Vec::new();
			let combined_extra = combine(extra);
			for (collection, &direction) in self.edge_collections.iter().zip(&self.directions) {
				let condition = Node::and(vec![global_edge.clone(), combined_extra.clone()]);
				level.push(build_lookup_info(collection, direction, &tmp_var, &condition, hint, catalog)?);
				reverse_level.push(build_lookup_info(
					collection,
					direction.reverse(),
					&tmp_var,
					&condition,
					hint,
					catalog,
				)?);
			}
			registry.set_level(depth, level);
			reverse_registry.set_level(depth, reverse_level);
		}

		let base_vertex_expression = if self.global_vertex_conditions.is_empty() {
			None
		} else {
			Some(combine(&self.global_vertex_conditions))
		};
		let vertex_expressions: BTreeMap<u32, Node> = self
			.depth_vertex_conditions
			.iter()
			.map(|(&depth, cond)| {
				let combined = match &base_vertex_expression {
					Some(base) => Node::and(vec![base.clone(), cond.clone()]),
					None => cond.clone(),
				};
				(depth, combined)
			})
			.collect();

		let accessors = PreparedAccessors {
			registry,
			reverse_registry,
			vertex_expressions,
			base_vertex_expression,
		};
		self.options = TraverserOptions::Unprepared(spec).prepare(accessors);
		Ok(())
	}

	/// spec.md §4.9 `clone(withDependencies)`. A structural deep-copy;
	/// when the source is already prepared, the clone is rebuilt against
	/// `catalog` rather than sharing the source's resolved
	/// [`crate::idx::LookupInfoRegistry`] — a different plan context may
	/// dispatch to a different shard set, so re-resolving through the
	/// same `catalog` entry point is the only way the clone's accessors
	/// stay consistent with whatever cluster topology it actually runs
	/// against.
	pub fn clone_node(&self, catalog: Option<&dyn IndexCatalog>, hint: Option<&IndexHint>) -> Result<Self, Error> {
		let mut cloned = self.clone();
		if self.options.is_prepared() {
			let catalog = catalog.ok_or_else(|| {
				Error::BadOption("cannot rebuild a prepared graph plan node's clone without an index catalog".into())
			})?;
			cloned.options = TraverserOptions::Unprepared(cloned.options.spec().clone());
			cloned.prepare_options(catalog, hint)?;
		}
		Ok(cloned)
	}

	/// spec.md §6 wire serialization.
	pub fn serialize(&self) -> PlanWire {
		let spec = self.options.spec().clone();
		PlanWire {
			walk_kind: self.walk_kind,
			start_vertex: self.start_vertex.clone(),
			target_vertex: self.target_vertex.clone(),
			directions: self.directions.clone(),
			edge_collections: self.edge_collections.clone(),
			vertex_collections: self.vertex_collections.clone(),
			result_variable: self.result_variable.clone(),
			vertex_output: self.vertex_output.clone(),
			edge_output: self.edge_output.clone(),
			path_output: self.path_output.clone(),
			global_vertex_conditions: self.global_vertex_conditions.clone(),
			global_edge_conditions: self.global_edge_conditions.clone(),
			depth_edge_conditions: self.depth_edge_conditions.clone(),
			depth_vertex_conditions: self.depth_vertex_conditions.clone(),
			spec,
			options_built: self.options.is_prepared(),
		}
	}

	/// The inverse of [`GraphPlanNode::serialize`]. The wire form never
	/// carries a resolved accessor registry (spec.md §6 lists only the
	/// spec-level fields), so a deserialized node always comes back
	/// `Unprepared` and must go through `prepare_options` again on
	/// whichever shard receives it.
	pub fn deserialize(wire: PlanWire) -> Self {
		let spec = wire.spec;
		Self {
			walk_kind: wire.walk_kind,
			start_vertex: wire.start_vertex,
			target_vertex: wire.target_vertex,
			directions: wire.directions,
			edge_collections: wire.edge_collections,
			vertex_collections: wire.vertex_collections,
			result_variable: wire.result_variable,
			vertex_output: wire.vertex_output,
			edge_output: wire.edge_output,
			path_output: wire.path_output,
			global_vertex_conditions: wire.global_vertex_conditions,
			global_edge_conditions: wire.global_edge_conditions,
			depth_edge_conditions: wire.depth_edge_conditions,
			depth_vertex_conditions: wire.depth_vertex_conditions,
			options: TraverserOptions::Unprepared(spec),
		}
	}
}

fn combine(conditions: &[Node]) -> Node {
	match conditions.len() {
		0 => Node::Value(Value::Bool(true)),
		1 => conditions[0].clone(),
		_ => Node::and(conditions.to_vec()),
	}
}

fn contains_subquery(node: &Node) -> bool {
	match node {
		Node::Subquery(_) => true,
		Node::Attribute {
			parent,
			..
		} => contains_subquery(parent),
		Node::Indexed {
			parent,
			index,
		} => contains_subquery(parent) || contains_subquery(index),
		Node::Binary {
			left,
			right,
			..
		} => contains_subquery(left) || contains_subquery(right),
		Node::NAry {
			members,
			..
		} => members.iter().any(contains_subquery),
		Node::Call {
			args,
			..
		} => args.iter().any(contains_subquery),
		Node::Array(items) | Node::Object(items) => items.iter().any(contains_subquery),
		Node::ObjectElement {
			value,
			..
		} => contains_subquery(value),
		Node::Reference(_) | Node::Value(_) | Node::Collection(_) | Node::View(_) | Node::Nop => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::expr::operator::Operator;
	use crate::expr::variable::VariableKind;
	use crate::idx::accessor::IndexChoice;
	use crate::traversal::options::Order;

	struct FakeCatalog;
	impl IndexCatalog for FakeCatalog {
		fn candidate_indexes(&self, _collection: &str, _direction: Direction) -> Result<Vec<IndexChoice>, Error> {
			Ok(vec![IndexChoice {
				id: "edge-idx".into(),
				covered_endpoint_field: Some(0),
				estimated_cost: 1,
			}])
		}
	}

	fn tmp() -> Variable {
		Variable::new(0, "v", VariableKind::Temporary)
	}

	fn node_builder() -> GraphPlanNode {
		let spec = OptionsSpec::new(1, 2, Order::Dfs, tmp()).unwrap();
		let mut node = GraphPlanNode::new(WalkKind::Traversal, StartVertex::Literal("people/1".into()), spec);
		node.add_edge_collection("knows", Direction::Outbound);
		node
	}

	#[test_log::test]
	fn prepare_options_transitions_to_prepared() {
		let mut node = node_builder();
		assert!(!node.options.is_prepared());
		node.prepare_options(&FakeCatalog, None).unwrap();
		assert!(node.options.is_prepared());
		assert_eq!(node.options.accessors_at(0).unwrap().len(), 1);
	}

	#[test]
	fn mutation_after_prepare_is_rejected() {
		let mut node = node_builder();
		node.prepare_options(&FakeCatalog, None).unwrap();
		let err = node.register_global_condition(false, Node::Value(Value::Bool(true))).unwrap_err();
		assert!(matches!(err, Error::BadOption(_)));
	}

	#[test]
	fn bound_start_vertex_rejects_non_reference_non_literal() {
		let spec = OptionsSpec::new(0, 1, Order::Dfs, tmp()).unwrap();
		let mut node = GraphPlanNode::new(
			WalkKind::Traversal,
			StartVertex::Bound(Node::Value(Value::Int(1))),
			spec,
		);
		node.add_edge_collection("knows", Direction::Outbound);
		let err = node.prepare_options(&FakeCatalog, None).unwrap_err();
		assert!(matches!(err, Error::ParseError(_)));
	}

	#[test]
	fn coordinator_rejects_post_filter_with_subquery() {
		let mut node = node_builder();
		let bound = BoundExpression {
			expression: Node::Subquery(Box::new(Node::Value(Value::Bool(true)))),
			variables: vec![],
			vertex_binding: None,
			edge_binding: None,
			path_binding: None,
		};
		let err = node.register_post_filter_condition(bound, DeploymentMode::Coordinator).unwrap_err();
		assert!(matches!(err, Error::BadOption(_)));
	}

	#[test]
	fn replace_variables_rewrites_global_conditions() {
		let mut node = node_builder();
		let v = tmp();
		node.register_global_condition(
			false,
			Node::binary(Operator::Eq, Node::Reference(v.clone()), Node::Value(Value::Int(1))),
		)
		.unwrap();
		let mut mapping = std::collections::HashMap::new();
		mapping.insert(v.id, Variable::new(9, "w", VariableKind::Temporary));
		node.replace_variables(&mapping).unwrap();
		assert!(matches!(
			&node.global_vertex_conditions[0],
			Node::Binary { left, .. } if matches!(left.as_ref(), Node::Reference(rv) if rv.id == 9)
		));
	}

	#[test]
	fn serialize_then_deserialize_round_trips_unprepared() {
		let mut node = node_builder();
		node.prepare_options(&FakeCatalog, None).unwrap();
		let wire = node.serialize();
		assert!(wire.options_built);
		let restored = GraphPlanNode::deserialize(wire);
		assert!(!restored.options.is_prepared());
		assert_eq!(restored.edge_collections, vec!["knows".to_string()]);
	}

	#[test]
	fn clone_without_catalog_fails_when_prepared() {
		let mut node = node_builder();
		node.prepare_options(&FakeCatalog, None).unwrap();
		let err = node.clone_node(None, None).unwrap_err();
		assert!(matches!(err, Error::BadOption(_)));
	}

	#[test]
	fn clone_with_catalog_rebuilds_prepared_state() {
		let mut node = node_builder();
		node.prepare_options(&FakeCatalog, None).unwrap();
		let cloned = node.clone_node(Some(&FakeCatalog), None).unwrap();
		assert!(cloned.options.is_prepared());
	}
}
