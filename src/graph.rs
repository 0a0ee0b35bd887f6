use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::error::{EvalError, EvalResult};
use crate::parser::Node;

/// Which expression produces each state binding, and which bindings it
/// watches. Holds no evaluation logic; the environment drives it.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    expressions: BTreeMap<String, Rc<Node>>,
    depends_on: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites any earlier expression. Edges are left alone.
    pub fn record_expression(&mut self, name: &str, expr: Rc<Node>) {
        self.expressions.insert(name.to_string(), expr);
    }

    pub fn expression_of(&self, name: &str) -> EvalResult<Rc<Node>> {
        self.expressions
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::MissingExpression(name.to_string()))
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.expressions.contains_key(name)
    }

    pub fn add_edge(&mut self, dependent: &str, dependency: &str) {
        self.depends_on
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
    }

    pub fn clear_edges_of(&mut self, dependent: &str) {
        self.depends_on.remove(dependent);
    }

    /// Names whose watch list contains `name`.
    pub fn dependants_of(&self, name: &str) -> BTreeSet<String> {
        self.depends_on
            .iter()
            .filter(|(_, deps)| deps.contains(name))
            .map(|(dependent, _)| dependent.clone())
            .collect()
    }

    pub fn dependencies_of(&self, name: &str) -> BTreeSet<String> {
        self.depends_on.get(name).cloned().unwrap_or_default()
    }
}
