//! The Lookup Info Registry (spec.md §4.3): an ordered collection of
//! accessors, a base set plus per-depth overrides, serializable for
//! shard dispatch.
//!
//! Grounded on `idx::planner::mod::QueryPlanner`'s per-table executor map
//! in the teacher: one base structure, looked up by a key (there: table
//! name; here: depth), with a fallback when no override exists.

use crate::idx::accessor::LookupInfo;
use revision::revisioned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[revisioned(revision = 1)]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LookupInfoRegistry {
	/// Indexed by edge-collection position.
	pub base: Vec<LookupInfo>,
	/// Per-depth override lists, each the same length as `base`.
	/// A `BTreeMap` keeps iteration (and therefore serialization) order
	/// deterministic across repeated plans, the way the teacher prefers
	/// ordered maps for anything that crosses the wire.
	pub levels: BTreeMap<u32, Vec<LookupInfo>>,
}

impl LookupInfoRegistry {
	pub fn new(base: Vec<LookupInfo>) -> Self {
		Self {
			base,
			levels: BTreeMap::new(),
		}
	}

	pub fn set_level(&mut self, depth: u32, accessors: Vec<LookupInfo>) {
		debug_assert_eq!(
			accessors.len(),
			self.base.len(),
			"per-depth override must have one accessor per edge collection"
		);
		self.levels.insert(depth, accessors);
	}

	/// Returns the accessors to use at `depth`: the per-depth override
	/// if present, else the base list (spec.md §4.3).
	pub fn accessors_at(&self, depth: u32) -> &[LookupInfo] {
		self.levels.get(&depth).map(Vec::as_slice).unwrap_or(&self.base)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::idx::accessor::Direction;

	fn dummy(id: &str) -> LookupInfo {
		LookupInfo {
			direction: Direction::Outbound,
			index_ids: vec![id.to_string()],
			condition: vec![],
			residual: None,
			condition_need_update: false,
			condition_member_to_update: None,
			non_const: vec![],
			covered_endpoint_field: None,
		}
	}

	#[test]
	fn falls_back_to_base_when_no_override() {
		let reg = LookupInfoRegistry::new(vec![dummy("base")]);
		assert_eq!(reg.accessors_at(3)[0].index_ids, vec!["base".to_string()]);
	}

	#[test]
	fn per_depth_override_wins() {
		let mut reg = LookupInfoRegistry::new(vec![dummy("base")]);
		reg.set_level(2, vec![dummy("depth2")]);
		assert_eq!(reg.accessors_at(2)[0].index_ids, vec!["depth2".to_string()]);
		assert_eq!(reg.accessors_at(3)[0].index_ids, vec!["base".to_string()]);
	}

	#[test]
	fn round_trip_serialization() {
		let mut reg = LookupInfoRegistry::new(vec![dummy("base")]);
		reg.set_level(1, vec![dummy("d1")]);
		let json = serde_json::to_value(&reg).unwrap();
		let back: LookupInfoRegistry = serde_json::from_value(json).unwrap();
		assert_eq!(reg, back);
	}
}
