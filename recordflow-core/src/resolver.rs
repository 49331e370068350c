//! 引用解析
//!
//! - `@a/b` 重写为 `record['a']['b']` (分隔符取自配置)
//! - `!:name` 替换为流程变量的字面量

use crate::error::ExpressionError;
use recordflow_context::FlowVariables;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Resolver {
    separator: char,
    field_pattern: Regex,
    variable_pattern: Regex,
    variables: Arc<FlowVariables>,
}

impl Resolver {
    pub fn new(
        separator: char,
        variables: Arc<FlowVariables>,
    ) -> Result<Self, ExpressionError> {
        let field = format!(r"@[\w{}]+", regex::escape(&separator.to_string()));
        let field_pattern = Regex::new(&field)
            .map_err(|e| ExpressionError::Pattern(e.to_string()))?;
        let variable_pattern = Regex::new(r"!:(\w+)")
            .map_err(|e| ExpressionError::Pattern(e.to_string()))?;

        Ok(Self {
            separator,
            field_pattern,
            variable_pattern,
            variables,
        })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn variables(&self) -> &FlowVariables {
        &self.variables
    }

    /// Rewrite field references, then substitute flow variables
    pub fn resolve(&self, expression: &str) -> Result<String, ExpressionError> {
        let resolved = self.resolve_fields(expression);
        let resolved = self.resolve_variables(&resolved)?;
        tracing::debug!(
            expression = %expression,
            resolved = %resolved,
            "Resolved expression"
        );
        Ok(resolved)
    }

    pub fn resolve_fields(&self, expression: &str) -> String {
        self.field_pattern
            .replace_all(expression, |caps: &regex::Captures<'_>| {
                let path = &caps[0][1..];
                path.split(self.separator)
                    .fold(String::from("record"), |mut access, segment| {
                        access.push_str("['");
                        access.push_str(segment);
                        access.push_str("']");
                        access
                    })
            })
            .into_owned()
    }

    pub fn resolve_variables(&self, expression: &str) -> Result<String, ExpressionError> {
        let mut resolved = String::with_capacity(expression.len());
        let mut last = 0;

        for caps in self.variable_pattern.captures_iter(expression) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value = self.variables.get(name.as_str())?;
            resolved.push_str(&expression[last..whole.start()]);
            resolved.push_str(&literal(name.as_str(), value)?);
            last = whole.end();
        }
        resolved.push_str(&expression[last..]);
        Ok(resolved)
    }
}

/// 变量值对应的表达式字面量, 映射类型无法表示
fn literal(name: &str, value: &Value) -> Result<String, ExpressionError> {
    match value {
        Value::String(text) => Ok(quote(text)),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Null => Ok("None".to_string()),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| literal(name, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", items.join(", ")))
        }
        Value::Object(_) => Err(ExpressionError::UnsupportedVariable(name.to_string())),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}
