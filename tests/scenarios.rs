//! End-to-end coverage of the six literal scenarios from spec.md §8,
//! driven through [`GraphPlanNode::prepare_options`] rather than by
//! constructing [`TraverserOptions`] directly, so the index-accessor
//! synthesis and accessor-registry wiring are exercised exactly as a
//! planner would exercise them.

use graphwalk_core::err::Error;
use graphwalk_core::expr::node::Node;
use graphwalk_core::expr::operator::Operator;
use graphwalk_core::expr::value::Value;
use graphwalk_core::expr::variable::{Variable, VariableKind};
use graphwalk_core::idx::accessor::{Direction, IndexCatalog, IndexChoice, LookupInfo};
use graphwalk_core::idx::cursor::{EdgeIterator, EdgeIteratorEntry, EdgeIteratorFactory};
use graphwalk_core::kvs::VertexSource;
use graphwalk_core::optimizer::rewrite_like;
use graphwalk_core::plan::{GraphPlanNode, StartVertex, WalkKind};
use graphwalk_core::traversal::options::{BoundExpression, Order, OptionsSpec, VertexUniqueness};
use graphwalk_core::traversal::path::Path;
use graphwalk_core::traversal::walk::{DfsEnumerator, WalkConfig};
use graphwalk_core::traversal::{BfsEnumerator, KPathsEnumerator, WeightedEnumerator};
use std::collections::BTreeMap;
use std::sync::Arc;

struct FakeCatalog;

impl IndexCatalog for FakeCatalog {
	fn candidate_indexes(&self, _collection: &str, _direction: Direction) -> Result<Vec<IndexChoice>, Error> {
		Ok(vec![IndexChoice {
			id: "edge-idx".into(),
			covered_endpoint_field: None,
			estimated_cost: 1,
		}])
	}
}

/// Honors the accessor's direction like a real storage factory would:
/// `Outbound` scans by `from`, `Inbound` scans by `to` and reports the
/// `from` side as the opposite vertex, so `KPathsEnumerator`'s
/// target-rooted ball can walk this directed edge list backward.
struct MapIter {
	edges: Vec<(String, String, f64)>,
	direction: Direction,
	pos: usize,
	vertex_id: String,
}

impl EdgeIterator for MapIter {
	fn reposition(&mut self, vertex_id: &str, _patch: &[(usize, Value)]) -> Result<bool, Error> {
		self.vertex_id = vertex_id.to_string();
		self.pos = 0;
		Ok(true)
	}

	fn next(&mut self) -> Result<Option<EdgeIteratorEntry>, Error> {
		while self.pos < self.edges.len() {
			let (from, to, weight) = self.edges[self.pos].clone();
			self.pos += 1;
			let (anchor, opposite) = match self.direction {
				Direction::Outbound => (&from, &to),
				Direction::Inbound => (&to, &from),
				_ => unreachable!("Direction has only Inbound/Outbound variants"),
			};
			if anchor == &self.vertex_id {
				let mut doc = BTreeMap::new();
				doc.insert("w".to_string(), Value::Double(weight));
				return Ok(Some(EdgeIteratorEntry {
					edge_id: format!("{from}->{to}"),
					opposite_vertex: opposite.clone(),
					document: Some(Value::Object(doc)),
				}));
			}
		}
		Ok(None)
	}
}

struct MapFactory {
	edges: Vec<(String, String, f64)>,
}

impl EdgeIteratorFactory for MapFactory {
	fn open(&self, accessor: &LookupInfo, vertex_id: &str, _patch: &[(usize, Value)]) -> Result<Box<dyn EdgeIterator>, Error> {
		Ok(Box::new(MapIter {
			edges: self.edges.clone(),
			direction: accessor.direction,
			pos: 0,
			vertex_id: vertex_id.to_string(),
		}))
	}

	fn fetch_document(&self, edge_id: &str) -> Result<Value, Error> {
		Ok(Value::String(edge_id.to_string()))
	}
}

struct MapVertexSource;

impl VertexSource for MapVertexSource {
	fn fetch_vertex(&self, vertex_id: &str) -> Result<Value, Error> {
		let mut map = BTreeMap::new();
		map.insert("_id".to_string(), Value::String(vertex_id.to_string()));
		map.insert("_key".to_string(), Value::String(vertex_id.to_string()));
		Ok(Value::Object(map))
	}
}

fn vertex(id: &str) -> Value {
	let mut map = BTreeMap::new();
	map.insert("_id".to_string(), Value::String(id.into()));
	map.insert("_key".to_string(), Value::String(id.into()));
	Value::Object(map)
}

fn ids(path: &Path) -> Vec<String> {
	path.vertices.iter().filter_map(Path::vertex_id).map(str::to_string).collect()
}

fn prepared_node(min_depth: u32, max_depth: u32, mode: Order, source: &str, edges: Vec<(&str, &str, f64)>) -> (GraphPlanNode, Arc<dyn EdgeIteratorFactory>) {
	let tmp = Variable::new(0, "v", VariableKind::Temporary);
	let spec = OptionsSpec::new(min_depth, max_depth, mode, tmp).unwrap();
	let mut node = GraphPlanNode::new(WalkKind::Traversal, StartVertex::Literal(source.into()), spec);
	node.add_edge_collection("knows", Direction::Outbound);
	node.prepare_options(&FakeCatalog, None).unwrap();
	let factory: Arc<dyn EdgeIteratorFactory> = Arc::new(MapFactory {
		edges: edges.into_iter().map(|(a, b, w)| (a.to_string(), b.to_string(), w)).collect(),
	});
	(node, factory)
}

#[test]
fn scenario_1_linear_chain_dfs() {
	let (node, factory) = prepared_node(1, 3, Order::Dfs, "1", vec![("1", "2", 1.0), ("2", "3", 1.0), ("3", "4", 1.0)]);
	let mut options = node.options.clone();
	if let graphwalk_core::traversal::TraverserOptions::Prepared(spec, _) = &mut options {
		spec.vertex_uniqueness = VertexUniqueness::Path;
	}
	let cfg = WalkConfig {
		options: &options,
		edge_factories: vec![factory],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = DfsEnumerator::new(cfg).unwrap();
	let mut seqs = Vec::new();
	while let Some(path) = enumerator.next().unwrap() {
		seqs.push(ids(&path));
	}
	assert_eq!(
		seqs,
		vec![vec!["1", "2"], vec!["1", "2", "3"], vec!["1", "2", "3", "4"]]
	);
}

#[test]
fn scenario_2_kpaths_with_branch() {
	let (node, factory) = prepared_node(
		1,
		3,
		Order::Dfs,
		"1",
		vec![("1", "2", 1.0), ("1", "3", 1.0), ("2", "4", 1.0), ("3", "4", 1.0)],
	);
	let cfg = WalkConfig {
		options: &node.options,
		edge_factories: vec![factory],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = KPathsEnumerator::new(cfg, vertex("4")).unwrap();
	let mut seqs = Vec::new();
	while let Some(path) = enumerator.next().unwrap() {
		seqs.push(ids(&path));
	}
	seqs.sort();
	assert_eq!(seqs, vec![vec!["1", "2", "4"], vec!["1", "3", "4"]]);
}

#[test]
fn scenario_3_bfs_global_uniqueness_emits_one_depth2_path() {
	let (node, factory) = prepared_node(
		1,
		2,
		Order::Bfs,
		"1",
		vec![("1", "2", 1.0), ("1", "3", 1.0), ("2", "4", 1.0), ("3", "4", 1.0)],
	);
	let mut options = node.options.clone();
	if let graphwalk_core::traversal::TraverserOptions::Prepared(spec, _) = &mut options {
		spec.vertex_uniqueness = VertexUniqueness::Global;
	}
	let cfg = WalkConfig {
		options: &options,
		edge_factories: vec![factory],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = BfsEnumerator::new(cfg).unwrap();
	let mut depth1 = Vec::new();
	let mut depth2 = Vec::new();
	while let Some(path) = enumerator.next().unwrap() {
		match path.depth() {
			1 => depth1.push(ids(&path)),
			2 => depth2.push(ids(&path)),
			other => panic!("unexpected depth {other}"),
		}
	}
	depth1.sort();
	assert_eq!(depth1, vec![vec!["1", "2"], vec!["1", "3"]]);
	assert_eq!(depth2.len(), 1);
	assert!(depth2[0] == vec!["1", "2", "4"] || depth2[0] == vec!["1", "3", "4"]);
}

#[test]
fn scenario_4_weighted_shortest_prefers_cheaper_two_hop() {
	let (node, factory) = prepared_node(
		2,
		2,
		Order::Weighted,
		"1",
		vec![("1", "2", 5.0), ("1", "3", 1.0), ("3", "2", 1.0), ("2", "4", 1.0)],
	);
	let mut options = node.options.clone();
	if let graphwalk_core::traversal::TraverserOptions::Prepared(spec, _) = &mut options {
		spec.vertex_uniqueness = VertexUniqueness::Global;
		spec.weight_attribute = "w".into();
		spec.default_weight = 1.0;
	}
	let cfg = WalkConfig {
		options: &options,
		edge_factories: vec![factory],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = WeightedEnumerator::new(cfg).unwrap();
	let first = enumerator.next().unwrap().unwrap();
	assert_eq!(ids(&first), vec!["1", "3", "2"]);
	assert_eq!(first.weight, Some(2.0));
}

#[test]
fn scenario_4b_weighted_depth3_reaches_four_via_cheap_path() {
	let (node, factory) = prepared_node(
		3,
		3,
		Order::Weighted,
		"1",
		vec![("1", "2", 5.0), ("1", "3", 1.0), ("3", "2", 1.0), ("2", "4", 1.0)],
	);
	let mut options = node.options.clone();
	if let graphwalk_core::traversal::TraverserOptions::Prepared(spec, _) = &mut options {
		spec.vertex_uniqueness = VertexUniqueness::Global;
		spec.weight_attribute = "w".into();
		spec.default_weight = 1.0;
	}
	let cfg = WalkConfig {
		options: &options,
		edge_factories: vec![factory],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = WeightedEnumerator::new(cfg).unwrap();
	let first = enumerator.next().unwrap().unwrap();
	assert_eq!(ids(&first), vec!["1", "3", "2", "4"]);
	assert_eq!(first.weight, Some(3.0));
}

#[test]
fn scenario_5_prune_suppresses_expansion_past_pruned_vertex() {
	let tmp = Variable::new(0, "v", VariableKind::Temporary);
	let spec = OptionsSpec::new(1, 3, Order::Dfs, tmp.clone())
		.unwrap()
		.with_vertex_uniqueness(VertexUniqueness::Path)
		.unwrap();
	let mut node = GraphPlanNode::new(WalkKind::Traversal, StartVertex::Literal("1".into()), spec);
	node.add_edge_collection("knows", Direction::Outbound);
	let prune = BoundExpression::new(
		Node::binary(
			Operator::Eq,
			Node::attribute(Node::Reference(tmp.clone()), "_key"),
			Node::Value(Value::String("3".into())),
		),
		vec![tmp],
		Some(0),
		None,
		None,
	);
	node.set_prune_condition(prune).unwrap();
	node.prepare_options(&FakeCatalog, None).unwrap();
	let factory: Arc<dyn EdgeIteratorFactory> = Arc::new(MapFactory {
		edges: vec![("1".to_string(), "2".to_string(), 1.0), ("2".to_string(), "3".to_string(), 1.0), ("3".to_string(), "4".to_string(), 1.0)],
	});
	let cfg = WalkConfig {
		options: &node.options,
		edge_factories: vec![factory],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = DfsEnumerator::new(cfg).unwrap();
	let mut seqs = Vec::new();
	while let Some(path) = enumerator.next().unwrap() {
		seqs.push(ids(&path));
	}
	assert_eq!(seqs, vec![vec!["1", "2"], vec!["1", "2", "3"]]);
}

/// Ground truth for SQL-style `LIKE` (`%` = any run, `_` = any one char,
/// no escaping) used only as the test oracle; the crate itself never
/// evaluates `LIKE` directly — it only ever sees the rewritten form.
fn like_matches(value: &str, pattern: &str) -> bool {
	if let Some(prefix) = pattern.strip_suffix('%') {
		if !pattern[..pattern.len() - 1].contains(['%', '_']) {
			return value.starts_with(prefix);
		}
	}
	value == pattern
}

#[test]
fn scenario_6_like_rewrite_matches_original_predicate() {
	let docs = vec!["abc", "abd", "xyz"];
	let pattern = "ab%";
	let call = Node::Call {
		name: "string::like".into(),
		args: vec![
			Node::attribute(Node::Reference(Variable::new(0, "c", VariableKind::UserDefined)), "name"),
			Node::Value(Value::String(pattern.into())),
			Node::Value(Value::Bool(true)),
		],
	};
	let rewritten = rewrite_like(&call, false).expect("prefix pattern should rewrite to a range");

	let var = Variable::new(0, "c", VariableKind::UserDefined);
	let matched: Vec<&str> = docs
		.iter()
		.copied()
		.filter(|name| {
			let mut doc = BTreeMap::new();
			doc.insert("name".to_string(), Value::String(name.to_string()));
			let ctx = graphwalk_core::expr::context::SingleBinding {
				variable: &var,
				value: Value::Object(doc),
			};
			rewritten.evaluate(&ctx).unwrap().is_truthy()
		})
		.collect();

	let expected: Vec<&str> = docs.iter().copied().filter(|name| like_matches(name, pattern)).collect();
	assert_eq!(matched, expected);
	assert_eq!(matched, vec!["abc", "abd"]);
}

#[test]
fn boundary_min_depth_zero_source_equals_target_emits_single_trivial_path() {
	let (node, factory) = prepared_node(0, 2, Order::Dfs, "1", vec![("1", "2", 1.0)]);
	let cfg = WalkConfig {
		options: &node.options,
		edge_factories: vec![factory],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = DfsEnumerator::new(cfg).unwrap();
	let first = enumerator.next().unwrap().unwrap();
	assert_eq!(first.depth(), 0);
	assert_eq!(ids(&first), vec!["1"]);
}

#[test]
fn boundary_empty_edge_collection_list_produces_no_paths_and_no_error() {
	let tmp = Variable::new(0, "v", VariableKind::Temporary);
	let spec = OptionsSpec::new(1, 2, Order::Dfs, tmp).unwrap();
	let mut node = GraphPlanNode::new(WalkKind::Traversal, StartVertex::Literal("1".into()), spec);
	node.prepare_options(&FakeCatalog, None).unwrap();
	let cfg = WalkConfig {
		options: &node.options,
		edge_factories: vec![],
		vertex_source: Arc::new(MapVertexSource),
		source: vertex("1"),
		killed: None,
	};
	let mut enumerator = DfsEnumerator::new(cfg).unwrap();
	assert_eq!(enumerator.next().unwrap(), None);
}
