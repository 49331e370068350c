//! # RecordFlow Expression
//!
//! 条件表达式的解析与求值。语法接近 Python 表达式:
//!
//! - 字面量: `1`, `1.5`, `'a'`, `"b"`, `True`/`False`/`None`, `[1, 2]`
//! - 记录访问: `record['a']['b']`, `record['items'][0]`
//! - 运算: `+ - * / // % **`, `== != < <= > >=`, `in`, `not in`,
//!   `and`/`&&`, `or`/`||`, `not`/`!`
//! - 函数调用: 见 [`register_function`]
//!
//! 求值中的查找失败和类型错误归为 [`EvaluationError::NotMet`], 语法错误、
//! 未知名称和未注册函数归为致命的 [`ExpressionError`]。

mod functions;
mod interpreter;
mod lexer;
mod parser;
mod value;

use crate::error::ExpressionError;
use interpreter::Interpreter;
use parser::Expr;
use serde_json::{Map, Value};
use thiserror::Error;

pub use functions::{
    register_function, registered_functions, reset_functions,
    unregister_function, ExpressionFunction,
};
pub use value::{is_truthy, type_name};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// Lookup or type failure, the expression does not hold for this record
    #[error("{0}")]
    NotMet(String),

    #[error(transparent)]
    Fatal(#[from] ExpressionError),
}

/// 已解析的表达式
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let syntax_error = |message: String| ExpressionError::Syntax {
            expression: source.to_string(),
            message,
        };
        let tokens = lexer::tokenize(source).map_err(syntax_error)?;
        let ast = parser::parse(tokens).map_err(syntax_error)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the record bound to the name `record`
    pub fn evaluate(&self, record: &Map<String, Value>) -> Result<Value, EvaluationError> {
        Interpreter::new(record)
            .eval(&self.ast)
            .map(|value| value.into_owned())
    }

    pub fn evaluate_bool(&self, record: &Map<String, Value>) -> Result<bool, EvaluationError> {
        let value = Interpreter::new(record).eval(&self.ast)?;
        Ok(is_truthy(&value))
    }
}
