//! The bidirectional k-paths enumerator (spec.md §4.7): two balls grow
//! alternately from source and target; each holds a shell (current
//! frontier) and an interior (everything promoted from earlier shells);
//! meeting points are found by scanning a fresh shell against the other
//! ball's interior.
//!
//! Grounded on the same expansion primitive as `traversal::walk`
//! (`expand()`), reused here for one ball's one-depth step; the
//! bidirectional bookkeeping (predecessor maps, interior/shell split,
//! signature de-duplication) is new and specific to this enumerator.

use crate::cnf::DEFAULT_KPATHS_EMIT_CAP;
use crate::err::Error;
use crate::expr::value::Value;
use crate::idx::EdgeIteratorFactory;
use crate::kvs::VertexSource;
use crate::traversal::options::TraverserOptions;
use crate::traversal::path::Path;
use crate::traversal::walk::{expand_for_ball, WalkConfig};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use std::collections::VecDeque;
use std::sync::Arc;

/// One discovered vertex's provenance within a ball: the edge and
/// predecessor vertex id that reached it, so a meeting point can be
/// walked back to its root.
#[derive(Clone)]
struct Predecessor {
	edge: Value,
	from: String,
}

struct Ball {
	source: Value,
	/// All vertices ever promoted into the interior, keyed by id.
	interior: HashMap<String, Value>,
	predecessors: HashMap<String, Predecessor>,
	/// The current frontier: ids discovered by the most recent expansion.
	shell: Vec<String>,
	depth: u32,
}

impl Ball {
	fn new(source: Value, source_id: String) -> Self {
		let mut interior = HashMap::new();
		interior.insert(source_id.clone(), source.clone());
		Self {
			source,
			interior,
			predecessors: HashMap::new(),
			shell: vec![source_id],
			depth: 0,
		}
	}

	fn exhausted(&self) -> bool {
		self.shell.is_empty()
	}

	/// Walks predecessors from `vertex_id` back to this ball's root,
	/// returning a path that starts at the root and ends at `vertex_id`.
	fn path_to_root(&self, vertex_id: &str) -> Path {
		let mut vertices = vec![self.interior[vertex_id].clone()];
		let mut edges = Vec::new();
		let mut cur = vertex_id.to_string();
		while let Some(pred) = self.predecessors.get(&cur) {
			edges.push(pred.edge.clone());
			vertices.push(self.interior[&pred.from].clone());
			cur = pred.from.clone();
		}
		vertices.reverse();
		edges.reverse();
		Path {
			vertices,
			edges,
			weight: None,
		}
	}
}

/// Bidirectional k-paths enumeration (spec.md §4.7): every distinct
/// vertex-sequence path within depth bounds is emitted exactly once.
pub struct KPathsEnumerator<'a> {
	options: &'a TraverserOptions,
	edge_factories: Vec<Arc<dyn EdgeIteratorFactory>>,
	vertex_source: Arc<dyn VertexSource>,
	killed: Option<&'a (dyn Fn() -> bool + 'a)>,
	left: Ball,
	right: Ball,
	pending: VecDeque<Path>,
	seen_signatures: HashSet<String>,
	emit_cap: usize,
	emitted: usize,
	started: bool,
}

impl<'a> KPathsEnumerator<'a> {
	pub fn new(cfg: WalkConfig<'a>, target: Value) -> Result<Self, Error> {
		let _span = crate::telemetry::enumerator_span("kpaths").entered();
		tracing::debug!("starting traversal enumerator");
		let source_id = Path::vertex_id(&cfg.source).unwrap_or_default().to_string();
		let target_id = Path::vertex_id(&target).unwrap_or_default().to_string();
		Ok(Self {
			options: cfg.options,
			edge_factories: cfg.edge_factories,
			vertex_source: cfg.vertex_source,
			killed: cfg.killed,
			left: Ball::new(cfg.source, source_id),
			right: Ball::new(target, target_id),
			pending: VecDeque::new(),
			seen_signatures: HashSet::new(),
			emit_cap: DEFAULT_KPATHS_EMIT_CAP,
			emitted: 0,
			started: false,
		})
	}

	fn signature(path: &Path) -> String {
		path.vertices.iter().filter_map(Path::vertex_id).collect::<Vec<_>>().join(">")
	}

	fn try_emit(&mut self, path: Path) -> bool {
		if self.emitted >= self.emit_cap {
			return false;
		}
		let sig = Self::signature(&path);
		if !self.seen_signatures.insert(sig) {
			return false;
		}
		self.emitted += 1;
		self.pending.push_back(path);
		true
	}

	/// Expands the smaller ball's shell by one depth, scans the fresh
	/// shell against the other ball's interior, and enqueues any
	/// stitched meeting-point paths (spec.md §4.7 loop body).
	///
	/// The left (source-rooted) ball walks forward, exactly like the
	/// single-sided enumerators; the right (target-rooted) ball must
	/// instead discover predecessors, so it expands through the reverse
	/// accessor set.
	fn expand_round(&mut self) -> Result<(), Error> {
		let left_is_smaller = self.left.shell.len() <= self.right.shell.len();
		let (active, other) = if left_is_smaller {
			(&mut self.left, &self.right)
		} else {
			(&mut self.right, &self.left)
		};
		let reverse = !left_is_smaller;
		let prior_shell = std::mem::take(&mut active.shell);
		let mut new_shell = Vec::new();
		for vertex_id in &prior_shell {
			let candidates: Vec<_> = expand_for_ball(
				self.options,
				&self.edge_factories,
				self.vertex_source.as_ref(),
				vertex_id,
				active.depth,
				reverse,
			)?;
			for c in candidates {
				if active.interior.contains_key(&c.opposite_id) {
					continue;
				}
				active.interior.insert(c.opposite_id.clone(), c.opposite_vertex.clone());
				active.predecessors.insert(
					c.opposite_id.clone(),
					Predecessor {
						edge: c.edge,
						from: vertex_id.clone(),
					},
				);
				new_shell.push(c.opposite_id);
			}
		}
		active.depth += 1;
		active.shell = new_shell;

		let meetings: Vec<String> =
			active.shell.iter().filter(|id| other.interior.contains_key(*id)).cloned().collect();
		for m in meetings {
			let stitched = Path::stitch(self.left.path_to_root(&m), self.right.path_to_root(&m));
			let depth = stitched.depth() as u32;
			if depth >= self.options.spec().min_depth && depth <= self.options.spec().max_depth {
				self.try_emit(stitched);
			}
		}
		Ok(())
	}

	pub fn next(&mut self) -> Result<Option<Path>, Error> {
		if let Some(killed) = self.killed {
			if killed() {
				return Err(Error::QueryKilled);
			}
		}
		if !self.started {
			self.started = true;
			let source_id = self.left.shell[0].clone();
			let target_id = self.right.shell[0].clone();
			if source_id == target_id && self.options.spec().min_depth == 0 {
				self.try_emit(Path::trivial(self.left.source.clone()));
			}
		}
		loop {
			if let Some(path) = self.pending.pop_front() {
				return Ok(Some(path));
			}
			if self.emitted >= self.emit_cap {
				return Ok(None);
			}
			if self.left.exhausted() || self.right.exhausted() {
				return Ok(None);
			}
			if self.left.depth + self.right.depth >= self.options.spec().max_depth {
				return Ok(None);
			}
			self.expand_round()?;
		}
	}
}
