//! Execution core for weave, a small reactive language that evaluates to
//! draw trees.
//!
//! Constants are write-once and visible to every inner scope. State lives at
//! the root, and a state that watches other state is recomputed whenever one
//! of them is re-declared. The value a program evaluates to is a draw tree
//! handed to whatever render callbacks the host registered.

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod graph;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod value;

use std::rc::Rc;

use anyhow::{bail, Result};
use tracing::debug;

pub use env::Env;
pub use error::{EvalError, EvalResult};
pub use parser::Node;
pub use value::Value;

pub fn parse_source(src: &str) -> Result<Node> {
    let tokens = lexer::lex(src)?;
    parser::parse(tokens)
}

/// Parse source that must hold exactly one form.
pub fn parse_expression(src: &str) -> Result<Node> {
    match parse_source(src)? {
        Node::Program { mut values } if values.len() == 1 => Ok(values.remove(0)),
        Node::Program { values } => bail!("expected exactly one expression, found {}", values.len()),
        other => Ok(other),
    }
}

/// A root environment with builtins installed, plus the host-side entry
/// points for running code and pushing draw trees out.
pub struct Interpreter {
    env: Env,
}

impl Interpreter {
    pub fn new() -> EvalResult<Self> {
        let env = Env::root();
        builtins::seed(&env)?;
        Ok(Self { env })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn run_tree(&self, node: &Node) -> EvalResult<Value> {
        debug!(kind = node.kind_name(), "evaluating");
        eval::evaluate(node, &self.env)
    }

    pub fn run_source(&self, src: &str) -> Result<Value> {
        let program = parse_source(src)?;
        Ok(self.run_tree(&program)?)
    }

    /// Run a syntax tree serialized as JSON by some other front end.
    pub fn run_json(&self, json: &str) -> Result<Value> {
        let program: Node = serde_json::from_str(json)?;
        Ok(self.run_tree(&program)?)
    }

    /// Re-declare root state `name` from the given source, recalculating
    /// everything that watches it.
    pub fn redeclare_state(&self, name: &str, src: &str) -> Result<Value> {
        let expr = parse_expression(src)?;
        Ok(self.env.declare_or_update_state(name, Rc::new(expr))?)
    }

    pub fn lookup(&self, name: &str) -> EvalResult<Value> {
        self.env.lookup(name)
    }

    pub fn state(&self, name: &str) -> Option<Value> {
        self.env.state_value(name)
    }

    pub fn on_render<F: Fn(&Value) + 'static>(&self, callback: F) {
        self.env.register_render_callback(Box::new(callback));
    }

    pub fn publish(&self, value: &Value) {
        self.env.publish(value);
    }

    pub fn run_and_publish(&self, src: &str) -> Result<Value> {
        let value = self.run_source(src)?;
        self.publish(&value);
        Ok(value)
    }
}
