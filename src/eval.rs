use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::trace;

use crate::env::Env;
use crate::error::{EvalError, EvalResult};
use crate::parser::Node;
use crate::value::{Closure, Function, Value};

pub fn evaluate(node: &Node, env: &Env) -> EvalResult<Value> {
    match node {
        Node::Program { values } => {
            let mut last = Value::Nil;
            for form in values {
                last = evaluate(form, env)?;
            }
            Ok(last)
        }
        Node::Number { value } => Ok(Value::Number(*value)),
        Node::String { value } => Ok(Value::Str(value.clone())),
        Node::Color { value } => Ok(Value::Color(*value)),
        Node::Symbol { value } => Ok(Value::Str(strip_sigil(value).to_string())),
        Node::Variable { value } => env.lookup(value),
        Node::List { values } => Ok(Value::List(evaluate_all(values, env)?)),
        Node::Vector { values } => {
            if values.len() != 2 {
                return Err(EvalError::Arity {
                    expected: 2,
                    found: values.len(),
                });
            }
            let x = evaluate(&values[0], env)?;
            let y = evaluate(&values[1], env)?;
            Ok(Value::Vector(Box::new(x), Box::new(y)))
        }
        Node::Map { values } => {
            let mut map = BTreeMap::new();
            for pair in values.chunks(2) {
                let key = evaluate(&pair[0], env)?.to_key();
                let value = match pair.get(1) {
                    Some(v) => evaluate(v, env)?,
                    None => Value::Nil,
                };
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
        Node::Function { params, body } => Ok(closure(None, params, body, env)),
        Node::NamedFunction { name, params, body } => {
            let f = closure(Some(name.clone()), params, body, env);
            env.define(name, f.clone())?;
            Ok(f)
        }
        Node::Condition {
            guard,
            then,
            otherwise,
        } => {
            if evaluate(guard, env)?.is_truthy() {
                evaluate(then, env)
            } else if let Some(branch) = otherwise {
                evaluate(branch, env)
            } else {
                Ok(Value::Nil)
            }
        }
        Node::ConstAssignment { name, value } => {
            let v = evaluate(value, env)?;
            env.define(name, v.clone())?;
            Ok(v)
        }
        Node::StateAssignment { name, params } => evaluate_state(name, params, env),
        Node::CallExpression { name, values } => {
            let func = match env.lookup(name)? {
                Value::Function(f) => f,
                _ => return Err(EvalError::NotCallable(name.clone())),
            };
            let args = evaluate_all(values, env)?;
            apply(&func, &args)
        }
        Node::ExposedParameter { value } => evaluate(value, env),
        Node::Unknown => Ok(Value::Nil),
    }
}

fn evaluate_all(nodes: &[Node], env: &Env) -> EvalResult<Vec<Value>> {
    nodes.iter().map(|n| evaluate(n, env)).collect()
}

fn closure(name: Option<String>, params: &[String], body: &Rc<Node>, env: &Env) -> Value {
    Value::Function(Function::Closure(Rc::new(Closure {
        name,
        params: params.to_vec(),
        body: body.clone(),
        env: env.clone(),
    })))
}

fn strip_sigil(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.as_str()
}

// `($ name body)` or the observing form `($ name [deps ...] body)`.
// The watch list is checked before anything is declared.
fn evaluate_state(name: &str, params: &[Rc<Node>], env: &Env) -> EvalResult<Value> {
    let body = params
        .last()
        .ok_or_else(|| EvalError::MissingStateBody(name.to_string()))?;
    let watched = match params {
        [deps, _] => match deps.as_ref() {
            Node::List { values } => Some(watched_names(name, values)?),
            _ => None,
        },
        _ => None,
    };
    let value = env.declare_or_update_state(name, body.clone())?;
    if let Some(deps) = watched {
        env.watch(name, &deps)?;
    }
    Ok(value)
}

fn watched_names(state: &str, nodes: &[Node]) -> EvalResult<Vec<String>> {
    nodes
        .iter()
        .map(|n| match n {
            Node::Variable { value } | Node::String { value } => Ok(value.clone()),
            Node::Symbol { value } => Ok(strip_sigil(value).to_string()),
            other => Err(EvalError::InvalidWatch {
                state: state.to_string(),
                found: other.kind_name().to_string(),
            }),
        })
        .collect()
}

/// Call a function value. Closures run in a new child of their captured
/// scope; missing trailing arguments are `Nil`, extra ones are dropped.
pub fn apply(func: &Function, args: &[Value]) -> EvalResult<Value> {
    trace!(function = func.name(), args = args.len(), "apply");
    match func {
        Function::Builtin { func, .. } => func(args),
        Function::Closure(c) => {
            let frame = c.env.child();
            for (i, param) in c.params.iter().enumerate() {
                frame.bind_parameter(param, args.get(i).cloned().unwrap_or(Value::Nil));
            }
            evaluate(&c.body, &frame)
        }
    }
}
