//! Single-sided enumerators (spec.md §4.8): DFS (stack), BFS (FIFO,
//! GLOBAL-uniqueness visited set), WEIGHTED (min-heap keyed by
//! accumulated weight). All three share one candidate-expansion helper so
//! that accessor selection, cursor rearming, and the Path Validator's
//! accept/reject calls live in exactly one place; only the frontier data
//! structure and pop order differ between modes, the same shape the
//! teacher's `idx::planner::iterators` gives its handful of `ThingIterator`
//! variants (one shared `next_batch` helper, different internal cursors).

use crate::err::Error;
use crate::expr::value::Value;
use crate::idx::cursor::EdgeCursor;
use crate::idx::EdgeIteratorFactory;
use crate::kvs::VertexSource;
use crate::traversal::options::TraverserOptions;
use crate::traversal::path::Path;
use crate::traversal::validator::PathValidator;
use ahash::AHashSet as HashSet;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

/// Common output of expanding one vertex: the candidate edges/vertices
/// that survived both the edge and vertex halves of the Path Validator's
/// `expand` row, in the Edge Cursor's emission order.
struct Candidate {
	edge: Value,
	opposite_id: String,
	opposite_vertex: Value,
	cursor_index: usize,
	pruned: bool,
}

/// Builds one Edge Cursor per accessor at `depth`, rearms each against
/// `vertex_id`, and drains them in accessor order, keeping only
/// candidates the validator accepts on both halves.
///
/// `commit_immediately` controls when an accepted candidate is recorded
/// into the validator's GLOBAL-uniqueness set: `true` for DFS/BFS, where
/// discovery order is already the accepted order, and `false` for
/// WEIGHTED, which must defer commitment until a candidate is popped off
/// the priority queue as the confirmed minimum-cost entry — see
/// `WeightedEnumerator::next`.
fn expand(
	options: &TraverserOptions,
	edge_factories: &[Arc<dyn EdgeIteratorFactory>],
	vertex_source: &dyn VertexSource,
	validator: &mut PathValidator<'_>,
	vertex_id: &str,
	depth: u32,
	path_vertex_ids: &HashSet<String>,
	path_edge_ids: &HashSet<String>,
	commit_immediately: bool,
) -> Result<Vec<Candidate>, Error> {
	let accessor_count = options.accessors_at(depth)?.len();
	let mut out = Vec::new();
	for cursor_index in 0..accessor_count {
		let factory = edge_factories.get(cursor_index).ok_or_else(|| {
			Error::BadPlan(format!("no edge iterator factory for accessor {cursor_index}"))
		})?;
		let mut cursor = options.build_cursor(depth, cursor_index, factory.clone())?;
		cursor.rearm(vertex_id, depth, &crate::expr::context::NoBindings)?;
		while let Some(entry) = cursor.next()? {
			let edge_value = match entry.document {
				Some(v) => v,
				None => cursor.fetch_document(&entry.edge_id)?,
			};
			if !validator.on_edge(&edge_value, depth, cursor_index, &entry.edge_id, path_edge_ids)? {
				continue;
			}
			let opposite_vertex = vertex_source.fetch_vertex(&entry.opposite_vertex)?;
			let decision = validator.on_vertex(&opposite_vertex, depth + 1, path_vertex_ids)?;
			if !decision.expand && !decision.pruned {
				continue;
			}
			if commit_immediately {
				validator.commit_global(&entry.opposite_vertex);
			}
			out.push(Candidate {
				edge: edge_value,
				opposite_id: entry.opposite_vertex,
				opposite_vertex,
				cursor_index,
				pruned: decision.pruned,
			});
		}
	}
	Ok(out)
}

/// A candidate edge/vertex for the bidirectional k-paths ball expansion
/// (`traversal::kpaths`): unlike [`Candidate`], there is no path-local or
/// global uniqueness check here — a ball's own `interior` map is the
/// dedup mechanism — so this carries no `pruned`/`cursor_index` bookkeeping.
pub(crate) struct BallCandidate {
	pub edge: Value,
	pub opposite_id: String,
	pub opposite_vertex: Value,
}

/// The k-paths analogue of [`expand`]: applies the edge/vertex
/// expressions and the vertex-collection restriction, but none of the
/// Path Validator's uniqueness bookkeeping, which the two-ball algorithm
/// replaces with its own interior/shell dedup (spec.md §4.7).
///
/// `reverse` selects the accessor set a ball expands through: `false` for
/// the source-rooted ball, which walks the configured direction exactly
/// like the single-sided enumerators; `true` for the target-rooted ball,
/// which must discover predecessors rather than successors and so scans
/// each edge collection's opposite direction instead (spec.md §4.7).
pub(crate) fn expand_for_ball(
	options: &TraverserOptions,
	edge_factories: &[Arc<dyn EdgeIteratorFactory>],
	vertex_source: &dyn VertexSource,
	vertex_id: &str,
	depth: u32,
	reverse: bool,
) -> Result<Vec<BallCandidate>, Error> {
	let accessor_count = if reverse {
		options.accessors_at_reverse(depth)?
	} else {
		options.accessors_at(depth)?
	}
	.len();
	let mut out = Vec::new();
	for cursor_index in 0..accessor_count {
		let factory = edge_factories.get(cursor_index).ok_or_else(|| {
			Error::BadPlan(format!("no edge iterator factory for accessor {cursor_index}"))
		})?;
		let mut cursor = if reverse {
			options.build_cursor_reverse(depth, cursor_index, factory.clone())?
		} else {
			options.build_cursor(depth, cursor_index, factory.clone())?
		};
		cursor.rearm(vertex_id, depth, &crate::expr::context::NoBindings)?;
		while let Some(entry) = cursor.next()? {
			let edge_value = match entry.document {
				Some(v) => v,
				None => cursor.fetch_document(&entry.edge_id)?,
			};
			let edge_ok = if reverse {
				options.evaluate_edge_expression_reverse(&edge_value, depth, cursor_index)?
			} else {
				options.evaluate_edge_expression(&edge_value, depth, cursor_index)?
			};
			if !edge_ok {
				continue;
			}
			if !options.destination_collection_allowed(&entry.opposite_vertex) {
				continue;
			}
			let opposite_vertex = vertex_source.fetch_vertex(&entry.opposite_vertex)?;
			if !options.evaluate_vertex_expression(&opposite_vertex, depth + 1)? {
				continue;
			}
			out.push(BallCandidate {
				edge: edge_value,
				opposite_id: entry.opposite_vertex,
				opposite_vertex,
			});
		}
	}
	Ok(out)
}

/// Shared construction inputs for all three single-sided enumerators.
pub struct WalkConfig<'a> {
	pub options: &'a TraverserOptions,
	pub edge_factories: Vec<Arc<dyn EdgeIteratorFactory>>,
	pub vertex_source: Arc<dyn VertexSource>,
	pub source: Value,
	pub killed: Option<&'a (dyn Fn() -> bool + 'a)>,
}

fn check_killed(killed: Option<&(dyn Fn() -> bool)>) -> Result<(), Error> {
	if killed.map(|f| f()).unwrap_or(false) {
		return Err(Error::QueryKilled);
	}
	Ok(())
}

struct DfsFrame {
	vertex_id: String,
	depth: u32,
	candidates: Vec<Candidate>,
	next: usize,
}

/// DFS mode: a stack of (vertex, depth, iterator-state) (spec.md §4.8).
pub struct DfsEnumerator<'a> {
	options: &'a TraverserOptions,
	edge_factories: Vec<Arc<dyn EdgeIteratorFactory>>,
	vertex_source: Arc<dyn VertexSource>,
	validator: PathValidator<'a>,
	killed: Option<&'a (dyn Fn() -> bool + 'a)>,
	stack: Vec<DfsFrame>,
	path_vertices: Vec<Value>,
	path_edges: Vec<Value>,
	path_vertex_ids: HashSet<String>,
	path_edge_ids: HashSet<String>,
	emitted_trivial: bool,
}

impl<'a> DfsEnumerator<'a> {
	pub fn new(cfg: WalkConfig<'a>) -> Result<Self, Error> {
		let _span = crate::telemetry::enumerator_span("dfs").entered();
		tracing::debug!("starting traversal enumerator");
		let mut path_vertex_ids = HashSet::new();
		if let Some(id) = Path::vertex_id(&cfg.source) {
			path_vertex_ids.insert(id.to_string());
		}
		Ok(Self {
			options: cfg.options,
			edge_factories: cfg.edge_factories,
			vertex_source: cfg.vertex_source,
			validator: PathValidator::new(cfg.options),
			killed: cfg.killed,
			stack: vec![DfsFrame {
				vertex_id: Path::vertex_id(&cfg.source).unwrap_or_default().to_string(),
				depth: 0,
				candidates: Vec::new(),
				next: 0,
			}],
			path_vertices: vec![cfg.source],
			path_edges: Vec::new(),
			path_vertex_ids,
			path_edge_ids: HashSet::new(),
			emitted_trivial: false,
		})
	}

	fn current_path(&self) -> Path {
		Path {
			vertices: self.path_vertices.clone(),
			edges: self.path_edges.clone(),
			weight: None,
		}
	}

	pub fn next(&mut self) -> Result<Option<Path>, Error> {
		check_killed(self.killed)?;
		if !self.emitted_trivial {
			self.emitted_trivial = true;
			let source = &self.path_vertices[0];
			if self.validator.should_emit(0, source, None)?
				&& self.options.spec().min_depth == 0
			{
				return Ok(Some(self.current_path()));
			}
		}
		loop {
			let Some(frame) = self.stack.last_mut() else {
				return Ok(None);
			};
			if frame.next == 0 && frame.candidates.is_empty() {
				frame.candidates = expand(
					self.options,
					&self.edge_factories,
					self.vertex_source.as_ref(),
					&mut self.validator,
					&frame.vertex_id,
					frame.depth,
					&self.path_vertex_ids,
					&self.path_edge_ids,
					true,
				)?;
			}
			if frame.next >= frame.candidates.len() {
				// exhausted: backtrack
				self.path_vertices.pop();
				self.path_edges.pop();
				if let Some(popped) = self.stack.pop() {
					self.path_vertex_ids.remove(&popped.vertex_id);
				}
				continue;
			}
			let candidate_idx = frame.next;
			frame.next += 1;
			let candidate = &frame.candidates[candidate_idx];
			if self.path_vertex_ids.contains(&candidate.opposite_id) {
				continue;
			}
			let depth = frame.depth + 1;
			let vertex_id = candidate.opposite_id.clone();
			let vertex = candidate.opposite_vertex.clone();
			let edge = candidate.edge.clone();
			let pruned = candidate.pruned;
			self.path_vertices.push(vertex.clone());
			self.path_edges.push(edge.clone());
			self.path_vertex_ids.insert(vertex_id.clone());
			let emittable = depth <= self.options.spec().max_depth
				&& self.validator.should_emit(depth, &vertex, Some(&edge))?;
			// Snapshot before deciding whether to push a child frame or pop:
			// either way the decision must leave `self.path_*` consistent for
			// the *next* call, so the emitted copy is taken first.
			let emitted = if emittable {
				Some(self.current_path())
			} else {
				None
			};
			if depth < self.options.spec().max_depth && !pruned {
				self.stack.push(DfsFrame {
					vertex_id,
					depth,
					candidates: Vec::new(),
					next: 0,
				});
			} else {
				self.path_vertices.pop();
				self.path_edges.pop();
				self.path_vertex_ids.remove(&vertex_id);
			}
			if let Some(path) = emitted {
				return Ok(Some(path));
			}
		}
	}
}

struct BfsEntry {
	vertex_id: String,
	depth: u32,
	path: Path,
}

/// BFS mode: a FIFO of (vertex, depth, predecessor); one layer processed
/// at a time (spec.md §4.8).
pub struct BfsEnumerator<'a> {
	options: &'a TraverserOptions,
	edge_factories: Vec<Arc<dyn EdgeIteratorFactory>>,
	vertex_source: Arc<dyn VertexSource>,
	validator: PathValidator<'a>,
	killed: Option<&'a (dyn Fn() -> bool + 'a)>,
	queue: VecDeque<BfsEntry>,
	emitted_trivial: bool,
	source: Value,
}

impl<'a> BfsEnumerator<'a> {
	pub fn new(cfg: WalkConfig<'a>) -> Result<Self, Error> {
		let _span = crate::telemetry::enumerator_span("bfs").entered();
		tracing::debug!("starting traversal enumerator");
		let source_id = Path::vertex_id(&cfg.source).unwrap_or_default().to_string();
		let mut queue = VecDeque::new();
		queue.push_back(BfsEntry {
			vertex_id: source_id,
			depth: 0,
			path: Path::trivial(cfg.source.clone()),
		});
		Ok(Self {
			options: cfg.options,
			edge_factories: cfg.edge_factories,
			vertex_source: cfg.vertex_source,
			validator: PathValidator::new(cfg.options),
			killed: cfg.killed,
			queue,
			emitted_trivial: false,
			source: cfg.source,
		})
	}

	pub fn next(&mut self) -> Result<Option<Path>, Error> {
		check_killed(self.killed)?;
		if !self.emitted_trivial {
			self.emitted_trivial = true;
			if self.validator.should_emit(0, &self.source, None)? && self.options.spec().min_depth == 0 {
				return Ok(Some(Path::trivial(self.source.clone())));
			}
		}
		while let Some(entry) = self.queue.pop_front() {
			if entry.depth >= self.options.spec().max_depth {
				continue;
			}
			let path_vertex_ids: HashSet<String> =
				entry.path.vertices.iter().filter_map(Path::vertex_id).map(str::to_string).collect();
			let path_edge_ids: HashSet<String> =
				entry.path.edges.iter().filter_map(Path::vertex_id).map(str::to_string).collect();
			let candidates = expand(
				self.options,
				&self.edge_factories,
				self.vertex_source.as_ref(),
				&mut self.validator,
				&entry.vertex_id,
				entry.depth,
				&path_vertex_ids,
				&path_edge_ids,
				true,
			)?;
			let mut emit_now = None;
			for c in candidates {
				let mut path = entry.path.clone();
				path.push(c.edge.clone(), c.opposite_vertex.clone());
				let depth = entry.depth + 1;
				let should_emit = self.validator.should_emit(depth, &c.opposite_vertex, Some(&c.edge))?;
				if !c.pruned {
					self.queue.push_back(BfsEntry {
						vertex_id: c.opposite_id.clone(),
						depth,
						path: path.clone(),
					});
				}
				if should_emit && emit_now.is_none() {
					emit_now = Some(path);
				}
			}
			if let Some(path) = emit_now {
				return Ok(Some(path));
			}
		}
		Ok(None)
	}
}

#[derive(Clone)]
struct WeightedEntry {
	weight: f64,
	seq: u64,
	vertex_id: String,
	depth: u32,
	path: Path,
}

impl PartialEq for WeightedEntry {
	fn eq(&self, other: &Self) -> bool {
		self.weight == other.weight && self.seq == other.seq
	}
}
impl Eq for WeightedEntry {}
impl PartialOrd for WeightedEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for WeightedEntry {
	fn cmp(&self, other: &Self) -> Ordering {
		// Reversed so `BinaryHeap` (a max-heap) pops the smallest weight
		// first; ties broken by insertion order (spec.md §5 ordering
		// guarantee for WEIGHTED mode).
		other
			.weight
			.partial_cmp(&self.weight)
			.unwrap_or(Ordering::Equal)
			.then_with(|| other.seq.cmp(&self.seq))
	}
}

/// WEIGHTED mode: a min-heap keyed by accumulated weight; the heap key is
/// monotonically non-decreasing across pops so the first emission at any
/// vertex under GLOBAL uniqueness is along its shortest path (spec.md
/// §4.8, §8).
pub struct WeightedEnumerator<'a> {
	options: &'a TraverserOptions,
	edge_factories: Vec<Arc<dyn EdgeIteratorFactory>>,
	vertex_source: Arc<dyn VertexSource>,
	validator: PathValidator<'a>,
	killed: Option<&'a (dyn Fn() -> bool + 'a)>,
	heap: BinaryHeap<WeightedEntry>,
	next_seq: u64,
	emitted_trivial: bool,
	source: Value,
}

impl<'a> WeightedEnumerator<'a> {
	pub fn new(cfg: WalkConfig<'a>) -> Result<Self, Error> {
		let _span = crate::telemetry::enumerator_span("weighted").entered();
		tracing::debug!("starting traversal enumerator");
		let source_id = Path::vertex_id(&cfg.source).unwrap_or_default().to_string();
		let mut heap = BinaryHeap::new();
		heap.push(WeightedEntry {
			weight: 0.0,
			seq: 0,
			vertex_id: source_id,
			depth: 0,
			path: Path {
				vertices: vec![cfg.source.clone()],
				edges: Vec::new(),
				weight: Some(0.0),
			},
		});
		Ok(Self {
			options: cfg.options,
			edge_factories: cfg.edge_factories,
			vertex_source: cfg.vertex_source,
			validator: PathValidator::new(cfg.options),
			killed: cfg.killed,
			heap,
			next_seq: 1,
			emitted_trivial: false,
			source: cfg.source,
		})
	}

	pub fn next(&mut self) -> Result<Option<Path>, Error> {
		check_killed(self.killed)?;
		if !self.emitted_trivial {
			self.emitted_trivial = true;
			if self.validator.should_emit(0, &self.source, None)? && self.options.spec().min_depth == 0 {
				return Ok(Some(Path::trivial(self.source.clone())));
			}
		}
		while let Some(entry) = self.heap.pop() {
			if entry.depth >= self.options.spec().max_depth {
				continue;
			}
			// The heap can carry several stale entries for the same vertex
			// at different accumulated weights (each neighbor that proposed
			// it pushed its own entry); under GLOBAL uniqueness only the
			// first pop — necessarily the cheapest, since the heap pops in
			// non-decreasing weight order — is the confirmed minimum-cost
			// route. Commit it now, and discard every later pop for the
			// same vertex instead of re-expanding from it.
			if self.validator.is_globally_seen(&entry.vertex_id) {
				continue;
			}
			self.validator.commit_global(&entry.vertex_id);
			let path_vertex_ids: HashSet<String> =
				entry.path.vertices.iter().filter_map(Path::vertex_id).map(str::to_string).collect();
			let path_edge_ids: HashSet<String> =
				entry.path.edges.iter().filter_map(Path::vertex_id).map(str::to_string).collect();
			let candidates = expand(
				self.options,
				&self.edge_factories,
				self.vertex_source.as_ref(),
				&mut self.validator,
				&entry.vertex_id,
				entry.depth,
				&path_vertex_ids,
				&path_edge_ids,
				false,
			)?;
			let mut emit_now = None;
			for c in candidates {
				let edge_weight = self.options.weight_edge(&c.edge)?;
				let weight = entry.weight + edge_weight;
				let mut path = entry.path.clone();
				path.push(c.edge.clone(), c.opposite_vertex.clone());
				path.weight = Some(weight);
				let depth = entry.depth + 1;
				let should_emit = self.validator.should_emit(depth, &c.opposite_vertex, Some(&c.edge))?;
				if !c.pruned {
					let seq = self.next_seq;
					self.next_seq += 1;
					self.heap.push(WeightedEntry {
						weight,
						seq,
						vertex_id: c.opposite_id.clone(),
						depth,
						path: path.clone(),
					});
				}
				if should_emit && emit_now.is_none() {
					emit_now = Some(path);
				}
			}
			if let Some(path) = emit_now {
				return Ok(Some(path));
			}
		}
		Ok(None)
	}
}
