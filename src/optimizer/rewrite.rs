//! The LIKE-prefix rewrite and the geo/fulltext subquery lowering
//! (spec.md §4.10; the geo/fulltext half is a SPEC_FULL.md supplement
//! grounded on `original_source/arangod/Aql/Optimizer2/OptimizerRules`'s
//! `replaceNearWithinFulltextRule`, which the distilled spec dropped).
//!
//! Grounded on the teacher's `idx::planner::plan`'s range-folding of
//! `String::starts_with` filters into index range scans — the same
//! "recognize a constant prefix, split into an exact match or a
//! `[prefix, upper_bound)` range" shape, applied here to `LIKE` instead
//! of `starts_with`.

use crate::expr::node::Node;
use crate::expr::operator::Operator;
use crate::expr::value::Value;

/// `LIKE(attribute, pattern, caseSensitive)` → an index-friendly
/// rewrite, when `pattern` is a constant string whose only wildcard (if
/// any) is a single trailing `%`:
///
/// - no wildcard at all: `attribute == pattern`
/// - trailing `%` only: `attribute >= prefix AND attribute < upperBound`
///   where `upperBound` is [`Value::string_prefix_upper_bound`].
///
/// Returns `None` (leaving the original call in place) when the pattern
/// has a leading/embedded wildcard, is non-constant, is case-insensitive
/// (a case-folded comparison cannot be expressed as a plain range
/// without also folding the index), or when `inverted_index_available`
/// is true — an inverted index already handles `LIKE` natively and this
/// rewrite would only narrow the condition without being cheaper than
/// what it already does (spec.md §4.10's abort condition).
pub fn rewrite_like(call: &Node, inverted_index_available: bool) -> Option<Node> {
	if inverted_index_available {
		return None;
	}
	let Node::Call {
		name,
		args,
	} = call
	else {
		return None;
	};
	if name != "string::like" {
		return None;
	}
	let [attribute, pattern, rest @ ..] = args.as_slice() else {
		return None;
	};
	if let Some(case_sensitive) = rest.first() {
		if !matches!(case_sensitive, Node::Value(Value::Bool(true))) {
			return None;
		}
	}
	let Node::Value(Value::String(pattern)) = pattern else {
		return None;
	};
	let wildcard_count = pattern.matches('%').count();
	if pattern.contains('_') {
		return None;
	}
	if wildcard_count == 0 {
		return Some(Node::binary(Operator::Eq, attribute.clone(), Node::Value(Value::String(pattern.clone()))));
	}
	if wildcard_count == 1 && pattern.ends_with('%') {
		let prefix = pattern.trim_end_matches('%').to_string();
		if prefix.is_empty() {
			// LIKE("%") matches everything; not worth rewriting into a range.
			return None;
		}
		let upper = Value::string_prefix_upper_bound(&prefix);
		let lower_bound = Node::binary(Operator::Ge, attribute.clone(), Node::Value(Value::String(prefix)));
		let upper_bound = Node::binary(Operator::Lt, attribute.clone(), Node::Value(upper));
		return Some(Node::and(vec![lower_bound, upper_bound]));
	}
	None
}

/// `NEAR`/`WITHIN`/`WITHIN_RECTANGLE`/`FULLTEXT` calls are lowered to an
/// opaque subquery node: this crate has no geo or fulltext index model
/// (spec.md §1 scopes index selection to the adjacency/edge condition
/// kind `build_lookup_info` covers), so the call is wrapped rather than
/// expanded — the wrapping is what the rest of the plan (and a
/// downstream optimizer stage with a real geo/fulltext index catalog)
/// can recognize and further rewrite, matching how `original_source`
/// turns these calls into a `SubqueryNode` wrapping an index-backed
/// `EnumerateCollectionNode` before any cost-based index selection runs.
pub fn lower_geo_or_fulltext(call: &Node) -> Option<Node> {
	let Node::Call {
		name,
		..
	} = call
	else {
		return None;
	};
	match name.as_str() {
		"geo::near" | "geo::within" | "geo::within_rectangle" | "search::fulltext" => {
			Some(Node::Subquery(Box::new(call.clone())))
		}
		_ => None,
	}
}
