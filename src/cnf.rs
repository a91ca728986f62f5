//! Tunable constants read directly at call sites, rather than threaded
//! through every signature. Mirrors the `cnf` module convention used
//! throughout the rest of this codebase's ancestry.

/// Nominal cardinality estimate handed to the index catalog when choosing
/// an accessor. The exact value does not matter for correctness, only for
/// tie-breaking between otherwise-equal candidate indexes.
pub const NOMINAL_INDEX_CARDINALITY_ESTIMATE: u64 = 1000;

/// Default number of edges an [`crate::idx::cursor::EdgeCursor`] pulls per
/// underlying storage round trip.
pub const DEFAULT_EDGE_BATCH_SIZE: u32 = 100;

/// Default cap on the number of paths a k-paths enumeration will emit
/// before stopping, absent an explicit caller-supplied limit.
pub const DEFAULT_KPATHS_EMIT_CAP: usize = 1_000;

/// Default weight assigned to an edge when no weight attribute is
/// configured, or the configured attribute is absent/non-numeric.
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;
