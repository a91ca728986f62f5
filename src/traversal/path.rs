//! A materialized traversal result (spec.md §3 "Path (enumerator
//! output)"): a sequence of vertices and the edges between consecutive
//! pairs, optionally carrying an accumulated weight.

use crate::expr::value::Value;
use revision::revisioned;
use serde::{Deserialize, Serialize};

/// `{vertices: [...], edges: [...], weight?: number}` (spec.md §6).
#[revisioned(revision = 1)]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Path {
	pub vertices: Vec<Value>,
	pub edges: Vec<Value>,
	pub weight: Option<f64>,
}

impl Path {
	/// The zero-length path containing only the source vertex (spec.md §8
	/// boundary behavior: `minDepth=0, source==target`).
	pub fn trivial(source: Value) -> Self {
		Self {
			vertices: vec![source],
			edges: Vec::new(),
			weight: None,
		}
	}

	pub fn depth(&self) -> usize {
		self.edges.len()
	}

	pub fn push(&mut self, edge: Value, vertex: Value) {
		self.edges.push(edge);
		self.vertices.push(vertex);
	}

	/// Vertex id extraction assumes each vertex document carries an `_id`
	/// string field, the convention every other component in this crate
	/// uses for identity.
	pub fn vertex_id(vertex: &Value) -> Option<&str> {
		match vertex {
			Value::Object(map) => map.get("_id").and_then(Value::as_str),
			Value::String(s) => Some(s.as_str()),
			_ => None,
		}
	}

	/// Stitches a left half `[source .. meeting]` and a right half
	/// `[target .. meeting]` (both ending at the shared meeting vertex)
	/// into one path `source .. meeting .. target` (spec.md §4.7).
	pub fn stitch(mut left: Path, mut right: Path) -> Path {
		right.vertices.pop();
		right.vertices.reverse();
		right.edges.reverse();
		left.vertices.extend(right.vertices);
		left.edges.extend(right.edges);
		let weight = match (left.weight, right.weight) {
			(Some(a), Some(b)) => Some(a + b),
			_ => None,
		};
		left.weight = weight;
		left
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trivial_path_has_no_edges() {
		let p = Path::trivial(Value::String("v/1".into()));
		assert_eq!(p.depth(), 0);
		assert_eq!(p.vertices.len(), 1);
	}

	#[test]
	fn stitch_joins_halves_at_meeting_vertex() {
		let mut left = Path::trivial(Value::String("1".into()));
		left.push(Value::String("e12".into()), Value::String("2".into()));
		let mut right = Path::trivial(Value::String("4".into()));
		right.push(Value::String("e34".into()), Value::String("3".into()));
		right.push(Value::String("e23".into()), Value::String("2".into()));
		let stitched = Path::stitch(left, right);
		assert_eq!(
			stitched.vertices,
			vec![
				Value::String("1".into()),
				Value::String("2".into()),
				Value::String("3".into()),
				Value::String("4".into()),
			]
		);
		assert_eq!(
			stitched.edges,
			vec![
				Value::String("e12".into()),
				Value::String("e23".into()),
				Value::String("e34".into()),
			]
		);
	}
}
