//! A single trait replacing the source's FixedVar/SingleVar/NoVar class
//! hierarchy (Design Notes §9, SPEC_FULL.md §9): one method, no
//! inheritance, a small set of concrete implementations.

use crate::err::Error;
use crate::expr::value::Value;
use crate::expr::variable::Variable;
use std::collections::HashMap;

/// A mapping from variable to value, consulted during expression
/// evaluation. Implementors decide how undefined lookups behave (most
/// return [`Error::UndefinedVariable`], but a permissive context used
/// during constant folding may instead signal "not constant" by refusing
/// a lookup it cannot statically satisfy).
pub trait ExpressionContext {
	fn lookup(&self, variable: &Variable) -> Result<Value, Error>;
}

/// The empty context: every lookup fails. Used to evaluate expressions
/// that are expected to be fully constant.
#[derive(Default)]
pub struct NoBindings;

impl ExpressionContext for NoBindings {
	fn lookup(&self, variable: &Variable) -> Result<Value, Error> {
		Err(Error::UndefinedVariable(variable.name.clone()))
	}
}

/// A single-variable context: exactly one binding, e.g. the traversal's
/// private temporary vertex variable bound to the candidate edge/vertex
/// under test.
pub struct SingleBinding<'a> {
	pub variable: &'a Variable,
	pub value: Value,
}

impl ExpressionContext for SingleBinding<'_> {
	fn lookup(&self, variable: &Variable) -> Result<Value, Error> {
		if variable.id == self.variable.id {
			Ok(self.value.clone())
		} else {
			Err(Error::UndefinedVariable(variable.name.clone()))
		}
	}
}

/// A general map-backed context for the common case of several bound
/// variables (e.g. vertex + edge + path slots for prune/post-filter
/// evaluators).
#[derive(Default)]
pub struct MapBindings(pub HashMap<u32, Value>);

impl MapBindings {
	pub fn new() -> Self {
		Self(HashMap::new())
	}

	pub fn bind(mut self, variable: &Variable, value: Value) -> Self {
		self.0.insert(variable.id, value);
		self
	}

	pub fn set(&mut self, variable: &Variable, value: Value) {
		self.0.insert(variable.id, value);
	}
}

impl ExpressionContext for MapBindings {
	fn lookup(&self, variable: &Variable) -> Result<Value, Error> {
		self.0
			.get(&variable.id)
			.cloned()
			.ok_or_else(|| Error::UndefinedVariable(variable.name.clone()))
	}
}
