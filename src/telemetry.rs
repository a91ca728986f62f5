//! Per-run identifiers and structured log spans, grounded on the
//! teacher's own convention of stamping each query with a `ulid`-based id
//! that every `tracing` event inside its lifetime carries (`dbs::Session`
//! tags every statement log line with its query id the same way).

use std::fmt;
use ulid::Ulid;

/// Identifies one enumerator run end to end, so logs from a long-lived
/// traversal (depths, rearm failures, cancellation) can be correlated
/// without threading an explicit id through every call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueryId(pub Ulid);

impl QueryId {
	pub fn new() -> Self {
		Self(Ulid::new())
	}
}

impl Default for QueryId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for QueryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Opens a `tracing` span for one enumerator run, tagged with a fresh
/// [`QueryId`] and the enumeration mode.
pub fn enumerator_span(mode: &'static str) -> tracing::Span {
	let id = QueryId::new();
	tracing::debug_span!("traversal", query_id = %id, mode)
}
