//! 表达式函数注册表
//!
//! 进程级共享, 以默认函数初始化。同名注册会覆盖已有函数, 因此也可以替换
//! 默认函数。并行执行期间应视为只读。

use super::value::{as_num, compare, display, num_to_value, type_name, Num};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

pub type ExpressionFunction =
    Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

static FUNCTIONS: Lazy<RwLock<HashMap<String, ExpressionFunction>>> =
    Lazy::new(|| RwLock::new(default_functions()));

/// Register `function` under `name`, replacing any previous function
pub fn register_function<F>(name: impl Into<String>, function: F)
where
    F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
{
    let name = name.into();
    tracing::debug!(function = %name, "Registering expression function");
    FUNCTIONS.write().insert(name, Arc::new(function));
}

pub fn unregister_function(name: &str) -> bool {
    FUNCTIONS.write().remove(name).is_some()
}

/// Drop every custom function and restore the defaults
pub fn reset_functions() {
    *FUNCTIONS.write() = default_functions();
}

pub fn registered_functions() -> Vec<String> {
    let mut names: Vec<String> = FUNCTIONS.read().keys().cloned().collect();
    names.sort();
    names
}

// 取出后立即释放读锁, 调用期间不持锁
pub(crate) fn lookup(name: &str) -> Option<ExpressionFunction> {
    FUNCTIONS.read().get(name).cloned()
}

fn default_functions() -> HashMap<String, ExpressionFunction> {
    let mut functions: HashMap<String, ExpressionFunction> = HashMap::new();
    functions.insert("int".into(), Arc::new(to_int));
    functions.insert("float".into(), Arc::new(to_float));
    functions.insert("str".into(), Arc::new(to_str));
    functions.insert("len".into(), Arc::new(length));
    functions.insert("abs".into(), Arc::new(absolute));
    functions.insert("lower".into(), Arc::new(|args: &[Value]| {
        Ok(Value::String(single_str("lower", args)?.to_lowercase()))
    }));
    functions.insert("upper".into(), Arc::new(|args: &[Value]| {
        Ok(Value::String(single_str("upper", args)?.to_uppercase()))
    }));
    functions.insert("min".into(), Arc::new(|args: &[Value]| {
        extreme("min", args, Ordering::Less)
    }));
    functions.insert("max".into(), Arc::new(|args: &[Value]| {
        extreme("max", args, Ordering::Greater)
    }));
    functions.insert("round".into(), Arc::new(round));
    functions
}

fn single<'a>(function: &str, args: &'a [Value]) -> Result<&'a Value, String> {
    match args {
        [value] => Ok(value),
        _ => Err(format!(
            "{}() takes exactly one argument ({} given)",
            function,
            args.len()
        )),
    }
}

fn single_str<'a>(function: &str, args: &'a [Value]) -> Result<&'a str, String> {
    match single(function, args)? {
        Value::String(text) => Ok(text),
        other => Err(format!(
            "{}() expects a string, got {}",
            function,
            type_name(other)
        )),
    }
}

fn to_int(args: &[Value]) -> Result<Value, String> {
    match single("int", args)? {
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid literal for int(): '{}'", text)),
        other => match as_num(other) {
            Some(Num::Int(value)) => Ok(Value::from(value)),
            Some(Num::Float(value)) if value.is_finite() => {
                Ok(Value::from(value.trunc() as i64))
            }
            _ => Err(format!("int() argument cannot be {}", type_name(other))),
        },
    }
}

fn to_float(args: &[Value]) -> Result<Value, String> {
    let value = match single("float", args)? {
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("could not convert string to float: '{}'", text))?,
        other => as_num(other)
            .map(Num::as_f64)
            .ok_or_else(|| format!("float() argument cannot be {}", type_name(other)))?,
    };
    num_to_value(Num::Float(value))
}

fn to_str(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(display(single("str", args)?)))
}

fn length(args: &[Value]) -> Result<Value, String> {
    let len = match single("len", args)? {
        Value::String(text) => text.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => return Err(format!("object of type {} has no len()", type_name(other))),
    };
    Ok(Value::from(len))
}

fn absolute(args: &[Value]) -> Result<Value, String> {
    let value = single("abs", args)?;
    match as_num(value) {
        Some(Num::Int(int)) => int
            .checked_abs()
            .map(Value::from)
            .ok_or_else(|| "integer overflow in abs()".to_string()),
        Some(Num::Float(float)) => num_to_value(Num::Float(float.abs())),
        None => Err(format!("bad operand type for abs(): {}", type_name(value))),
    }
}

fn extreme(function: &str, args: &[Value], wanted: Ordering) -> Result<Value, String> {
    let candidates = match args {
        [Value::Array(items)] => items.as_slice(),
        [] => return Err(format!("{}() expects at least one argument", function)),
        items => items,
    };
    let mut iter = candidates.iter();
    let mut best = iter
        .next()
        .ok_or_else(|| format!("{}() arg is an empty sequence", function))?;
    for candidate in iter {
        match compare(candidate, best) {
            Some(ordering) if ordering == wanted => best = candidate,
            Some(_) => {}
            None => {
                return Err(format!(
                    "'{}' not supported between {} and {}",
                    function,
                    type_name(candidate),
                    type_name(best)
                ))
            }
        }
    }
    Ok(best.clone())
}

// 银行家舍入, 与 Python round 行为一致
fn round_half_even(value: f64) -> f64 {
    let rounded = value.round();
    if (value - value.trunc()).abs() == 0.5 {
        2.0 * (value / 2.0).round()
    } else {
        rounded
    }
}

fn round(args: &[Value]) -> Result<Value, String> {
    let (value, digits) = match args {
        [value] => (value, None),
        [value, digits] => (value, Some(digits)),
        _ => return Err("round() takes one or two arguments".to_string()),
    };
    let number = as_num(value)
        .ok_or_else(|| format!("type {} doesn't define round()", type_name(value)))?;

    match digits {
        None => match number {
            Num::Int(int) => Ok(Value::from(int)),
            Num::Float(float) => {
                let rounded = round_half_even(float);
                if rounded.is_finite() {
                    Ok(Value::from(rounded as i64))
                } else {
                    Err("cannot round a non finite number".to_string())
                }
            }
        },
        Some(digits) => {
            let Some(Num::Int(digits)) = as_num(digits) else {
                return Err("round() digits must be an integer".to_string());
            };
            let factor = 10f64.powi(digits as i32);
            num_to_value(Num::Float(round_half_even(number.as_f64() * factor) / factor))
        }
    }
}
