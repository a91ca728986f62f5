//! The Path Validator (spec.md §4.6): the per-step state machine that
//! decides whether a candidate vertex/edge continues the walk and whether
//! the current path is emittable. Owned by a single enumerator instance —
//! the GLOBAL-uniqueness visited set it carries is not shared across
//! concurrent sub-enumerations, matching spec.md §5's "each
//! sub-enumeration gets its own cursor pool".

use crate::err::Error;
use crate::expr::value::Value;
use crate::traversal::options::{TraverserOptions, VertexUniqueness};
use crate::traversal::path::Path;
use ahash::AHashSet as HashSet;

/// Outcome of presenting a candidate vertex to the validator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexDecision {
	/// Whether the walk may continue past this vertex.
	pub expand: bool,
	/// Whether the prune expression fired here (spec.md §9 glossary
	/// "Prune": stop expanding but still possibly emit).
	pub pruned: bool,
}

pub struct PathValidator<'a> {
	options: &'a TraverserOptions,
	global_vertices_seen: HashSet<String>,
}

impl<'a> PathValidator<'a> {
	pub fn new(options: &'a TraverserOptions) -> Self {
		Self {
			options,
			global_vertices_seen: HashSet::new(),
		}
	}

	/// `start` row of spec.md §4.6: whether the trivial zero-length path
	/// should be emitted before any expansion happens.
	pub fn start_emits_trivial(&self, source: &str, target: &str) -> bool {
		self.options.spec().min_depth == 0 && source == target
	}

	/// `expand` row, vertex half: accept `v` at depth `d` iff uniqueness
	/// allows, the vertex-collection restriction allows, and the vertex
	/// expression evaluates truthy. A separate prune check governs
	/// `expand` independent of acceptance, per spec.md §4.6's note that a
	/// pruned vertex may still be accepted and emitted, just not expanded
	/// further.
	///
	/// This only *checks* GLOBAL uniqueness against what has already been
	/// committed; it never commits `v` itself. A caller that accepts `v`
	/// must call [`Self::commit_global`] once it has actually decided to
	/// keep it — immediately for DFS/BFS, where discovery order is
	/// already the accepted order, but only once a candidate is confirmed
	/// as the cheapest way to reach `v` for WEIGHTED, where a cheaper
	/// route may still be sitting in the frontier (spec.md §8 Scenario 4).
	pub fn on_vertex(
		&mut self,
		vertex: &Value,
		depth: u32,
		path_vertex_ids: &HashSet<String>,
	) -> Result<VertexDecision, Error> {
		let id = Path::vertex_id(vertex).unwrap_or_default().to_string();
		let unique_ok = match self.options.spec().vertex_uniqueness {
			VertexUniqueness::None => true,
			VertexUniqueness::Path => !path_vertex_ids.contains(&id),
			VertexUniqueness::Global => !self.global_vertices_seen.contains(&id),
		};
		if !unique_ok {
			return Ok(VertexDecision::default());
		}
		if !self.options.destination_collection_allowed(&id) {
			return Ok(VertexDecision::default());
		}
		if !self.options.evaluate_vertex_expression(vertex, depth)? {
			return Ok(VertexDecision::default());
		}
		let pruned = self.options.evaluate_prune(vertex)?;
		Ok(VertexDecision {
			expand: !pruned,
			pruned,
		})
	}

	/// Whether `vertex_id` has already been committed under GLOBAL
	/// uniqueness. Lets a caller recognize a now-stale frontier entry
	/// (e.g. a WEIGHTED heap entry for a vertex a cheaper route already
	/// finalized) before re-expanding it.
	pub fn is_globally_seen(&self, vertex_id: &str) -> bool {
		self.global_vertices_seen.contains(vertex_id)
	}

	/// Commits `vertex_id` as visited under GLOBAL uniqueness. A no-op
	/// under any other uniqueness mode.
	pub fn commit_global(&mut self, vertex_id: &str) {
		if self.options.spec().vertex_uniqueness == VertexUniqueness::Global {
			self.global_vertices_seen.insert(vertex_id.to_string());
		}
	}

	/// `expand` row, edge half: accept `e` from `u` at depth `d` under
	/// cursor `cursor_index` iff the edge expression evaluates truthy and
	/// (for PATH edge-uniqueness) the edge has not already appeared on
	/// this path.
	pub fn on_edge(
		&mut self,
		edge: &Value,
		depth: u32,
		cursor_index: usize,
		edge_id: &str,
		path_edge_ids: &HashSet<String>,
	) -> Result<bool, Error> {
		use crate::traversal::options::EdgeUniqueness;
		if self.options.spec().edge_uniqueness == EdgeUniqueness::Path
			&& path_edge_ids.contains(edge_id)
		{
			return Ok(false);
		}
		self.options.evaluate_edge_expression(edge, depth, cursor_index)
	}

	/// `emit` row: whether the current path (ending at `vertex`, depth
	/// `depth`, reached via `edge` when `depth > 0`) should be yielded.
	/// Post-filter only ever *drops* an otherwise-emittable path; it
	/// never influences `on_vertex`/`on_edge` (spec.md §8 quantified
	/// invariant "post-filter never affects which paths are expanded").
	pub fn should_emit(&self, depth: u32, vertex: &Value, edge: Option<&Value>) -> Result<bool, Error> {
		let spec = self.options.spec();
		if depth < spec.min_depth || depth > spec.max_depth {
			return Ok(false);
		}
		self.options.evaluate_post_filter(vertex, edge)
	}
}
