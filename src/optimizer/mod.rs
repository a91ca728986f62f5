//! Optimizer rewrite rules that apply to the expressions a Graph Plan
//! Node carries (spec.md §4.10). The wider optimizer's rule pipeline —
//! rule ordering, fixpoint iteration, cost-based plan selection — is out
//! of scope; this module is the one rewrite the spec names explicitly.

pub mod rewrite;

pub use rewrite::{lower_geo_or_fulltext, rewrite_like};
