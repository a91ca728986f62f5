//! The Edge Cursor (spec.md §4.4): an iterator over edges adjacent to a
//! vertex under a given accessor, rearmable per vertex rather than
//! reallocated.
//!
//! Grounded on `idx::planner::iterators::ThingIterator` in the teacher: a
//! small enum/trait of concrete scan strategies polled in batches against
//! a `kvs::Transaction`. The patch-on-rearm behavior follows the
//! side-table strategy from Design Notes §9 ("In-place mutation of AST
//! for per-vertex patching") instead of literally mutating the AST: the
//! condition tree stays immutable and shareable, and only a small
//! `position -> value` table changes between vertices.

use crate::err::Error;
use crate::expr::context::ExpressionContext;
use crate::expr::value::Value;
use crate::idx::accessor::LookupInfo;
use std::sync::Arc;

/// One adjacency edge returned by the underlying storage iterator.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeIteratorEntry {
	pub edge_id: String,
	pub opposite_vertex: String,
	/// `Some` in document-scan mode, or once a covering-mode edge has
	/// been fetched on demand; `None` for an unfetched covering-mode
	/// result.
	pub document: Option<Value>,
}

/// The per-vertex scan state for one [`LookupInfo`]. Implementations are
/// provided by the storage layer; this crate only specifies the contract
/// it drives.
pub trait EdgeIterator: Send {
	/// Attempt to reposition this iterator onto a new vertex in place.
	/// Returns `Ok(true)` if repositioning succeeded, `Ok(false)` if this
	/// iterator type cannot reposition and must be discarded in favor of
	/// a freshly opened one.
	fn reposition(&mut self, vertex_id: &str, patch: &[(usize, Value)]) -> Result<bool, Error>;

	fn next(&mut self) -> Result<Option<EdgeIteratorEntry>, Error>;
}

/// Opens fresh iterators and performs the on-demand document fetch that
/// the covering scan mode defers.
pub trait EdgeIteratorFactory: Send + Sync {
	fn open(
		&self,
		accessor: &LookupInfo,
		vertex_id: &str,
		patch: &[(usize, Value)],
	) -> Result<Box<dyn EdgeIterator>, Error>;

	fn fetch_document(&self, edge_id: &str) -> Result<Value, Error>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorCounters {
	pub cache_hits: u64,
	pub cache_misses: u64,
	pub documents_fetched: u64,
	pub filtered: u64,
	pub rearm_repositioned: u64,
	pub rearm_recreated: u64,
}

/// Rearmable scan over one edge collection's adjacency for a sequence of
/// vertices. Created per expansion step and rearmed, never reallocated,
/// across the vertices visited at that step (spec.md §4.4).
pub struct EdgeCursor {
	accessor: Arc<LookupInfo>,
	factory: Arc<dyn EdgeIteratorFactory>,
	iterator: Option<Box<dyn EdgeIterator>>,
	pub counters: CursorCounters,
}

impl EdgeCursor {
	pub fn new(accessor: Arc<LookupInfo>, factory: Arc<dyn EdgeIteratorFactory>) -> Self {
		Self {
			accessor,
			factory,
			iterator: None,
			counters: CursorCounters::default(),
		}
	}

	pub fn accessor(&self) -> &LookupInfo {
		&self.accessor
	}

	/// Patches the condition's target member with `vertex_id`,
	/// re-evaluates the non-constant subexpressions against `ctx`, and
	/// repositions or recreates the underlying iterator (spec.md §4.4).
	pub fn rearm(
		&mut self,
		vertex_id: &str,
		_depth: u32,
		ctx: &dyn ExpressionContext,
	) -> Result<(), Error> {
		let mut patch = Vec::with_capacity(self.accessor.non_const.len());
		for nc in &self.accessor.non_const {
			let value = nc.expression.evaluate(ctx)?;
			patch.push((nc.position, value));
		}
		if let Some(it) = self.iterator.as_mut() {
			if it.reposition(vertex_id, &patch)? {
				self.counters.rearm_repositioned += 1;
				return Ok(());
			}
		}
		self.iterator = Some(self.factory.open(&self.accessor, vertex_id, &patch)?);
		self.counters.rearm_recreated += 1;
		Ok(())
	}

	/// Pulls the next adjacency edge, fetching its document when this
	/// accessor does not cover both endpoints.
	pub fn next(&mut self) -> Result<Option<EdgeIteratorEntry>, Error> {
		let it = self
			.iterator
			.as_mut()
			.ok_or_else(|| Error::BadPlan("cursor polled before rearm()".into()))?;
		match it.next()? {
			None => Ok(None),
			Some(mut entry) => {
				if self.accessor.covered_endpoint_field.is_none() && entry.document.is_none() {
					entry.document = Some(self.factory.fetch_document(&entry.edge_id)?);
					self.counters.documents_fetched += 1;
				}
				Ok(Some(entry))
			}
		}
	}

	/// Fetches the full document for an edge returned under the covering
	/// fast path, on demand (e.g. when the edge is returned to the
	/// caller and its full body is needed).
	pub fn fetch_document(&mut self, edge_id: &str) -> Result<Value, Error> {
		self.counters.documents_fetched += 1;
		self.factory.fetch_document(edge_id)
	}
}
