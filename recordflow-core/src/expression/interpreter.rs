use super::functions;
use super::parser::{BinaryOp, CompareOp, Expr, UnaryOp};
use super::value::{
    as_num, compare, is_truthy, num_to_value, type_name, values_equal, Num,
};
use super::EvaluationError;
use crate::error::ExpressionError;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// 表达式中唯一可用的名称
pub(crate) const RECORD_NAME: &str = "record";

/// 字符串重复结果的上限 (字节)
const MAX_REPEAT_BYTES: usize = 16 * 1024 * 1024;

type Eval<'a> = Result<Cow<'a, Value>, EvaluationError>;

fn not_met<T>(message: impl Into<String>) -> Result<T, EvaluationError> {
    Err(EvaluationError::NotMet(message.into()))
}

/// 被下标或 `in` 访问的容器, 直接借用记录避免整条复制
enum Container<'a> {
    Record(&'a Map<String, Value>),
    Value(Cow<'a, Value>),
}

pub(crate) struct Interpreter<'a> {
    record: &'a Map<String, Value>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(record: &'a Map<String, Value>) -> Self {
        Self { record }
    }

    pub(crate) fn eval(&self, expr: &'a Expr) -> Eval<'a> {
        match expr {
            Expr::Literal(value) => Ok(Cow::Borrowed(value)),
            Expr::Name(name) if name == RECORD_NAME => {
                Ok(Cow::Owned(Value::Object(self.record.clone())))
            }
            Expr::Name(name) => {
                Err(ExpressionError::UnknownName(name.clone()).into())
            }
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Cow::Owned(Value::Array(values)))
            }
            Expr::Subscript(base, key) => {
                let container = self.container(base)?;
                let key = self.eval(key)?;
                match container {
                    Container::Record(map) => {
                        lookup_key(map, &key).map(Cow::Borrowed)
                    }
                    Container::Value(Cow::Borrowed(value)) => index(value, &key),
                    Container::Value(Cow::Owned(value)) => {
                        index(&value, &key).map(|item| Cow::Owned(item.into_owned()))
                    }
                }
            }
            Expr::Call(name, args) => {
                let function = functions::lookup(name)
                    .ok_or_else(|| ExpressionError::UnknownFunction(name.clone()))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg).map(Cow::into_owned))
                    .collect::<Result<Vec<_>, _>>()?;
                match function(&args) {
                    Ok(value) => Ok(Cow::Owned(value)),
                    Err(message) => not_met(format!("{}(): {}", name, message)),
                }
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                unary(*op, &value).map(Cow::Owned)
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right).map(Cow::Owned)
            }
            Expr::Compare(first, chain) => {
                let mut left = self.eval(first)?;
                for (op, right) in chain {
                    let result = match op {
                        CompareOp::In | CompareOp::NotIn => {
                            let container = self.container(right)?;
                            let found = contains(&container, &left)?;
                            if *op == CompareOp::In {
                                found
                            } else {
                                !found
                            }
                        }
                        _ => {
                            let right = self.eval(right)?;
                            let result = compare_values(*op, &left, &right)?;
                            left = right;
                            result
                        }
                    };
                    if !result {
                        return Ok(Cow::Owned(Value::Bool(false)));
                    }
                }
                Ok(Cow::Owned(Value::Bool(true)))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if is_truthy(&left) {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if is_truthy(&left) {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
        }
    }

    fn container(&self, expr: &'a Expr) -> Result<Container<'a>, EvaluationError> {
        match expr {
            Expr::Name(name) if name == RECORD_NAME => Ok(Container::Record(self.record)),
            _ => self.eval(expr).map(Container::Value),
        }
    }
}

fn lookup_key<'v>(map: &'v Map<String, Value>, key: &Value) -> Result<&'v Value, EvaluationError> {
    match key {
        Value::String(name) => match map.get(name) {
            Some(value) => Ok(value),
            None => not_met(format!("key '{}' not found", name)),
        },
        other => not_met(format!("key {} not found", other)),
    }
}

fn index<'v>(container: &'v Value, key: &Value) -> Result<Cow<'v, Value>, EvaluationError> {
    match container {
        Value::Object(map) => lookup_key(map, key).map(Cow::Borrowed),
        Value::Array(items) => {
            let position = sequence_index(items.len(), key)?;
            Ok(Cow::Borrowed(&items[position]))
        }
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            let position = sequence_index(chars.len(), key)?;
            Ok(Cow::Owned(Value::String(chars[position].to_string())))
        }
        other => not_met(format!("'{}' object is not subscriptable", type_name(other))),
    }
}

// 支持负下标
fn sequence_index(len: usize, key: &Value) -> Result<usize, EvaluationError> {
    let Some(raw) = key.as_i64() else {
        return not_met(format!("indices must be integers, not {}", type_name(key)));
    };
    let position = if raw < 0 { len as i64 + raw } else { raw };
    if position < 0 || position >= len as i64 {
        return not_met(format!("index {} out of range", raw));
    }
    Ok(position as usize)
}

fn contains(container: &Container<'_>, item: &Value) -> Result<bool, EvaluationError> {
    let value = match container {
        Container::Record(map) => {
            return Ok(item.as_str().is_some_and(|key| map.contains_key(key)))
        }
        Container::Value(value) => &**value,
    };
    match value {
        Value::Object(map) => Ok(item.as_str().is_some_and(|key| map.contains_key(key))),
        Value::Array(items) => Ok(items.iter().any(|candidate| values_equal(candidate, item))),
        Value::String(text) => match item {
            Value::String(needle) => Ok(text.contains(needle.as_str())),
            other => not_met(format!(
                "'in <string>' requires string as left operand, not {}",
                type_name(other)
            )),
        },
        other => not_met(format!("argument of type '{}' is not iterable", type_name(other))),
    }
}

fn compare_values(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvaluationError> {
    let ordering = match op {
        CompareOp::Eq => return Ok(values_equal(left, right)),
        CompareOp::Ne => return Ok(!values_equal(left, right)),
        _ => match compare(left, right) {
            Some(ordering) => ordering,
            None => {
                return not_met(format!(
                    "comparison not supported between {} and {}",
                    type_name(left),
                    type_name(right)
                ))
            }
        },
    };
    Ok(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvaluationError> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!is_truthy(value)));
    }
    let Some(num) = as_num(value) else {
        return not_met(format!("bad operand type for unary operator: {}", type_name(value)));
    };
    let result = match (op, num) {
        (UnaryOp::Neg, Num::Int(int)) => int
            .checked_neg()
            .map(Num::Int)
            .unwrap_or(Num::Float(-(int as f64))),
        (UnaryOp::Neg, Num::Float(float)) => Num::Float(-float),
        (_, num) => num,
    };
    num_to_value(result).map_err(EvaluationError::NotMet)
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvaluationError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => {
            return Ok(Value::String(format!("{}{}", a, b)))
        }
        (BinaryOp::Add, Value::Array(a), Value::Array(b)) => {
            return Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::String(text), count) | (BinaryOp::Mul, count, Value::String(text))
            if count.is_i64() =>
        {
            let times = usize::try_from(count.as_i64().unwrap_or(0).max(0)).unwrap_or(usize::MAX);
            return match text.len().checked_mul(times) {
                Some(bytes) if bytes <= MAX_REPEAT_BYTES => Ok(Value::String(text.repeat(times))),
                _ => not_met(format!("string repetition exceeds {} bytes", MAX_REPEAT_BYTES)),
            };
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (as_num(left), as_num(right)) else {
        return not_met(format!(
            "unsupported operand types for {:?}: {} and {}",
            op,
            type_name(left),
            type_name(right)
        ));
    };
    let result = arithmetic(op, a, b)?;
    num_to_value(result).map_err(EvaluationError::NotMet)
}

fn arithmetic(op: BinaryOp, a: Num, b: Num) -> Result<Num, EvaluationError> {
    if matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) && b.as_f64() == 0.0 {
        return not_met("division by zero");
    }

    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            // 溢出 (i64::MIN / -1) 时走浮点路径
            BinaryOp::FloorDiv => x.checked_div(y).zip(x.checked_rem(y)).map(|(quotient, rest)| {
                if rest != 0 && ((rest < 0) != (y < 0)) {
                    quotient - 1
                } else {
                    quotient
                }
            }),
            BinaryOp::Mod => x.checked_rem(y).map(|rest| {
                if rest != 0 && ((rest < 0) != (y < 0)) {
                    rest + y
                } else {
                    rest
                }
            }),
            BinaryOp::Pow if y >= 0 => u32::try_from(y).ok().and_then(|exp| x.checked_pow(exp)),
            _ => None,
        };
        if let Some(value) = exact {
            return Ok(Num::Int(value));
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    Ok(Num::Float(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::FloorDiv => (x / y).floor(),
        BinaryOp::Mod => x - y * (x / y).floor(),
        BinaryOp::Pow => x.powf(y),
    }))
}
