use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{EvalError, EvalResult};
use crate::eval;
use crate::graph::DependencyGraph;
use crate::parser::Node;
use crate::render::{RenderBridge, RenderCallback};
use crate::value::Value;

// Shared by every scope descending from one root.
#[derive(Default)]
struct Reactor {
    graph: RefCell<DependencyGraph>,
    dirty: RefCell<BTreeSet<String>>,
    recalculating: Cell<bool>,
    render: RefCell<RenderBridge>,
}

struct Scope {
    constants: RefCell<BTreeMap<String, Value>>,
    // Only ever populated on the root scope.
    state: RefCell<BTreeMap<String, Value>>,
    parent: Option<Env>,
    reactor: Rc<Reactor>,
}

/// Handle to one lexical scope. Cloning shares the scope, which is how
/// closures keep a live view of the environment they were defined in.
#[derive(Clone)]
pub struct Env(Rc<Scope>);

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("depth", &self.depth())
            .field("constants", &self.0.constants.borrow().len())
            .field("state", &self.0.state.borrow().len())
            .finish()
    }
}

// Clears the re-entrancy flag however the pass ends.
struct PassGuard<'a>(&'a Cell<bool>);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Env {
    pub fn root() -> Env {
        Env(Rc::new(Scope {
            constants: RefCell::new(BTreeMap::new()),
            state: RefCell::new(BTreeMap::new()),
            parent: None,
            reactor: Rc::new(Reactor::default()),
        }))
    }

    pub fn child(&self) -> Env {
        Env(Rc::new(Scope {
            constants: RefCell::new(BTreeMap::new()),
            state: RefCell::new(BTreeMap::new()),
            parent: Some(self.clone()),
            reactor: self.0.reactor.clone(),
        }))
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.0.parent.as_ref();
        while let Some(env) = scope {
            depth += 1;
            scope = env.0.parent.as_ref();
        }
        depth
    }

    pub fn root_env(&self) -> Env {
        let mut env = self.clone();
        while let Some(parent) = env.0.parent.clone() {
            env = parent;
        }
        env
    }

    pub fn same_scope(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn find(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(v) = env.0.constants.borrow().get(name) {
                return Some(v.clone());
            }
            if let Some(v) = env.0.state.borrow().get(name) {
                return Some(v.clone());
            }
            scope = env.0.parent.as_ref();
        }
        None
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Constants then state, walking outward through the parents.
    pub fn lookup(&self, name: &str) -> EvalResult<Value> {
        self.find(name)
            .ok_or_else(|| EvalError::UndefinedName(name.to_string()))
    }

    /// Write-once constant. A name visible anywhere up the chain cannot be
    /// bound again here, so inner scopes never shadow outer definitions.
    pub fn define(&self, name: &str, value: Value) -> EvalResult<()> {
        if self.is_bound(name) {
            return Err(EvalError::DuplicateBinding(name.to_string()));
        }
        self.0.constants.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    /// Positional argument binding for a call frame. Unlike `define` this
    /// does not consult enclosing scopes.
    pub fn bind_parameter(&self, name: &str, value: Value) {
        self.0.constants.borrow_mut().insert(name.to_string(), value);
    }

    /// Evaluate `body` in a fresh child scope and commit the result as root
    /// state `name`. Re-declaring an existing name marks its dependants dirty
    /// and, unless a pass is already draining the worklist, recalculates.
    pub fn declare_or_update_state(&self, name: &str, body: Rc<Node>) -> EvalResult<Value> {
        if !self.is_root() {
            return Err(EvalError::RootOnly(name.to_string()));
        }
        if self.0.constants.borrow().contains_key(name) {
            return Err(EvalError::DuplicateBinding(name.to_string()));
        }
        let value = eval::evaluate(&body, &self.child())?;
        let existed = self
            .0
            .state
            .borrow_mut()
            .insert(name.to_string(), value.clone())
            .is_some();
        let reactor = &self.0.reactor;
        reactor.graph.borrow_mut().record_expression(name, body);
        if !existed {
            debug!(state = name, value = %value, "state declared");
            return Ok(value);
        }
        let dependants = reactor.graph.borrow().dependants_of(name);
        debug!(state = name, value = %value, dependants = dependants.len(), "state updated");
        reactor.dirty.borrow_mut().extend(dependants);
        if !reactor.recalculating.get() {
            self.recalculate()?;
        }
        Ok(value)
    }

    /// Replace the watch list of state `name`.
    pub fn watch(&self, name: &str, dependencies: &[String]) -> EvalResult<()> {
        let mut graph = self.0.reactor.graph.borrow_mut();
        if !graph.has_node(name) {
            return Err(EvalError::UnknownWatcher(name.to_string()));
        }
        graph.clear_edges_of(name);
        for dep in dependencies {
            graph.add_edge(name, dep);
        }
        debug!(state = name, watches = ?dependencies, "watch edges replaced");
        Ok(())
    }

    /// Drain the dirty set in snapshot rounds until nothing is left. Names
    /// dirtied during a round are picked up by the next one. A cyclic watch
    /// graph never drains.
    pub fn recalculate(&self) -> EvalResult<()> {
        if !self.is_root() {
            return Err(EvalError::RootOnly("recalculate".to_string()));
        }
        let reactor = &self.0.reactor;
        if reactor.recalculating.get() {
            return Ok(());
        }
        reactor.recalculating.set(true);
        let _guard = PassGuard(&reactor.recalculating);
        debug!("recalculation pass started");
        let mut round = 0usize;
        loop {
            let batch = std::mem::take(&mut *reactor.dirty.borrow_mut());
            if batch.is_empty() {
                break;
            }
            round += 1;
            trace!(round, pending = batch.len(), "recalculation round");
            let mut pending = batch.into_iter();
            while let Some(name) = pending.next() {
                trace!(state = %name, "recomputing");
                let expr = reactor.graph.borrow().expression_of(&name);
                let result = expr.and_then(|expr| self.declare_or_update_state(&name, expr));
                if let Err(e) = result {
                    // Leave the failed name and the rest of the round pending.
                    let mut dirty = reactor.dirty.borrow_mut();
                    dirty.insert(name);
                    dirty.extend(pending);
                    return Err(e);
                }
            }
        }
        debug!(rounds = round, "recalculation pass finished");
        Ok(())
    }

    pub fn is_recalculating(&self) -> bool {
        self.0.reactor.recalculating.get()
    }

    pub fn dirty_names(&self) -> Vec<String> {
        self.0.reactor.dirty.borrow().iter().cloned().collect()
    }

    pub fn state_value(&self, name: &str) -> Option<Value> {
        self.root_env().0.state.borrow().get(name).cloned()
    }

    pub fn state_names(&self) -> Vec<String> {
        self.root_env().0.state.borrow().keys().cloned().collect()
    }

    pub fn dependants_of(&self, name: &str) -> BTreeSet<String> {
        self.0.reactor.graph.borrow().dependants_of(name)
    }

    pub fn dependencies_of(&self, name: &str) -> BTreeSet<String> {
        self.0.reactor.graph.borrow().dependencies_of(name)
    }

    pub fn register_render_callback(&self, callback: RenderCallback) {
        self.0.reactor.render.borrow_mut().register(callback);
    }

    pub fn render_callback_count(&self) -> usize {
        self.0.reactor.render.borrow().len()
    }

    /// Callbacks added while publishing first see the next publish.
    pub fn publish(&self, value: &Value) {
        let callbacks = self.0.reactor.render.borrow().snapshot();
        for cb in callbacks {
            cb(value);
        }
    }
}
