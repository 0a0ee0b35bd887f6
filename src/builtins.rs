use crate::env::Env;
use crate::error::{EvalError, EvalResult};
use crate::value::{BuiltinFn, Function, Value};

// Seeded in this order; keep names unique, collisions fail like any `define`.
pub fn builtins() -> Vec<(&'static str, BuiltinFn)> {
    vec![
        ("add", add as BuiltinFn),
        ("sub", sub as BuiltinFn),
        ("mul", mul as BuiltinFn),
        ("div", div as BuiltinFn),
        ("mod", modulo as BuiltinFn),
        ("pow", pow as BuiltinFn),
        ("eq", eq as BuiltinFn),
        ("lt", lt as BuiltinFn),
        ("gt", gt as BuiltinFn),
        ("not", not as BuiltinFn),
        ("len", len as BuiltinFn),
        ("nth", nth as BuiltinFn),
        ("get", get as BuiltinFn),
        ("range", range as BuiltinFn),
        ("println", println as BuiltinFn),
    ]
}

pub fn seed(env: &Env) -> EvalResult<()> {
    for (name, func) in builtins() {
        env.define(name, Value::Function(Function::Builtin { name, func }))?;
    }
    Ok(())
}

fn numbers(name: &str, args: &[Value]) -> EvalResult<Vec<f64>> {
    args.iter()
        .map(|v| {
            v.as_number()
                .ok_or_else(|| EvalError::builtin(name, format!("expected number, got {}", v.type_name())))
        })
        .collect()
}

fn exactly<'a>(name: &str, args: &'a [Value], n: usize) -> EvalResult<&'a [Value]> {
    if args.len() != n {
        return Err(EvalError::builtin(
            name,
            format!("expects {} argument(s), got {}", n, args.len()),
        ));
    }
    Ok(args)
}

fn binary(name: &str, args: &[Value]) -> EvalResult<(f64, f64)> {
    let nums = numbers(name, exactly(name, args, 2)?)?;
    Ok((nums[0], nums[1]))
}

fn add(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(numbers("add", args)?.iter().sum()))
}

fn sub(args: &[Value]) -> EvalResult<Value> {
    let nums = numbers("sub", args)?;
    match nums.split_first() {
        None => Ok(Value::Number(0.0)),
        Some((first, [])) => Ok(Value::Number(-first)),
        Some((first, rest)) => Ok(Value::Number(rest.iter().fold(*first, |acc, n| acc - n))),
    }
}

fn mul(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(numbers("mul", args)?.iter().product()))
}

fn div(args: &[Value]) -> EvalResult<Value> {
    let (a, b) = binary("div", args)?;
    Ok(Value::Number(a / b))
}

fn modulo(args: &[Value]) -> EvalResult<Value> {
    let (a, b) = binary("mod", args)?;
    Ok(Value::Number(a % b))
}

fn pow(args: &[Value]) -> EvalResult<Value> {
    let (a, b) = binary("pow", args)?;
    Ok(Value::Number(a.powf(b)))
}

fn eq(args: &[Value]) -> EvalResult<Value> {
    let args = exactly("eq", args, 2)?;
    Ok(Value::bool(args[0] == args[1]))
}

fn lt(args: &[Value]) -> EvalResult<Value> {
    let (a, b) = binary("lt", args)?;
    Ok(Value::bool(a < b))
}

fn gt(args: &[Value]) -> EvalResult<Value> {
    let (a, b) = binary("gt", args)?;
    Ok(Value::bool(a > b))
}

fn not(args: &[Value]) -> EvalResult<Value> {
    let args = exactly("not", args, 1)?;
    Ok(Value::bool(!args[0].is_truthy()))
}

fn len(args: &[Value]) -> EvalResult<Value> {
    let n = match exactly("len", args, 1)?[0] {
        Value::List(ref items) => items.len(),
        Value::Map(ref map) => map.len(),
        Value::Str(ref s) => s.chars().count(),
        ref other => {
            return Err(EvalError::builtin("len", format!("no length for {}", other.type_name())))
        }
    };
    Ok(Value::Number(n as f64))
}

fn nth(args: &[Value]) -> EvalResult<Value> {
    let args = exactly("nth", args, 2)?;
    let items = match &args[0] {
        Value::List(items) => items,
        other => return Err(EvalError::builtin("nth", format!("expected list, got {}", other.type_name()))),
    };
    let idx = numbers("nth", &args[1..])?[0];
    if idx < 0.0 || idx.fract() != 0.0 {
        return Ok(Value::Nil);
    }
    Ok(items.get(idx as usize).cloned().unwrap_or(Value::Nil))
}

fn get(args: &[Value]) -> EvalResult<Value> {
    let args = exactly("get", args, 2)?;
    match &args[0] {
        Value::Map(map) => Ok(map.get(&args[1].to_key()).cloned().unwrap_or(Value::Nil)),
        other => Err(EvalError::builtin("get", format!("expected map, got {}", other.type_name()))),
    }
}

// Longest list `range` will build.
pub const RANGE_LIMIT: usize = 1_000_000;

// Bounds are whole numbers; stepping by 1.0 stalls past 2^53.
fn range_bound(v: f64) -> EvalResult<i64> {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if !v.is_finite() || v.fract() != 0.0 || v.abs() >= EXACT {
        return Err(EvalError::builtin(
            "range",
            format!("bounds must be whole numbers below 2^53, got {}", v),
        ));
    }
    Ok(v as i64)
}

fn range(args: &[Value]) -> EvalResult<Value> {
    let nums = numbers("range", args)?;
    let (start, end) = match nums.as_slice() {
        [end] => (0, range_bound(*end)?),
        [start, end] => (range_bound(*start)?, range_bound(*end)?),
        _ => return Err(EvalError::builtin("range", "expects 1 or 2 arguments")),
    };
    let count = end.saturating_sub(start).max(0) as u64;
    if count > RANGE_LIMIT as u64 {
        return Err(EvalError::builtin(
            "range",
            format!("{} items exceeds the limit of {}", count, RANGE_LIMIT),
        ));
    }
    Ok(Value::List((start..end).map(|i| Value::Number(i as f64)).collect()))
}

fn println(args: &[Value]) -> EvalResult<Value> {
    let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    println!("{}", parts.join(" "));
    Ok(Value::Nil)
}
