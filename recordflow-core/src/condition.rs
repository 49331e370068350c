use crate::error::{ConditionError, ExpressionError};
use crate::expression::{EvaluationError, Expression};
use crate::resolver::Resolver;
use recordflow_context::Record;

/// 已解析的条件, 可对多条记录重复求值
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expression: Expression,
}

impl Condition {
    /// Resolve references in `source` and parse the result
    pub fn new(source: &str, resolver: &Resolver) -> Result<Self, ExpressionError> {
        let resolved = resolver.resolve(source)?;
        Ok(Self {
            source: source.to_string(),
            expression: Expression::parse(&resolved)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn resolved(&self) -> &str {
        self.expression.source()
    }

    /// `Ok(())` when the condition holds for `record`.
    ///
    /// Missing fields and type mismatches mean the condition is not met,
    /// only unusable expressions are errors.
    pub fn check(&self, record: &Record) -> Result<(), ConditionError> {
        tracing::debug!(condition = %self.source, "Checking condition");
        match self.expression.evaluate_bool(record.data()) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ConditionError::NotMet(self.source.clone())),
            Err(EvaluationError::NotMet(reason)) => {
                tracing::debug!(
                    condition = %self.source,
                    reason = %reason,
                    "Condition could not be evaluated against the record"
                );
                Err(ConditionError::NotMet(self.source.clone()))
            }
            Err(EvaluationError::Fatal(error)) => Err(error.into()),
        }
    }
}

/// Resolve, parse and check `condition` in one go
pub fn check(
    condition: &str,
    record: &Record,
    resolver: &Resolver,
) -> Result<(), ConditionError> {
    Condition::new(condition, resolver)?.check(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordflow_context::FlowVariables;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn resolver() -> Resolver {
        let mut variables = FlowVariables::new();
        variables.set("a", json!("B")).unwrap();
        Resolver::new('/', Arc::new(variables)).unwrap()
    }

    #[test]
    fn test_variable_substitution() {
        let r = resolver();
        assert!(check("@c/d == !:a", &record(json!({"c": {"d": "B"}})), &r).is_ok());
        assert_eq!(
            check("@c/d == !:a", &record(json!({})), &r),
            Err(ConditionError::NotMet("@c/d == !:a".into()))
        );
    }

    #[test]
    fn test_falsy_result_is_not_met() {
        let r = resolver();
        assert!(matches!(
            check("@x == 2", &record(json!({"x": 1})), &r),
            Err(ConditionError::NotMet(_))
        ));
        assert!(check("'c' not in record", &record(json!({"a": 1})), &r).is_ok());
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let r = resolver();
        assert!(matches!(
            check("315131 =~ 'D'", &record(json!({})), &r),
            Err(ConditionError::Expression(ExpressionError::Syntax { .. }))
        ));
    }

    #[test]
    fn test_reuse_parsed_condition() {
        let condition = Condition::new("@n > 10", &resolver()).unwrap();
        assert_eq!(condition.resolved(), "record['n'] > 10");
        assert!(condition.check(&record(json!({"n": 11}))).is_ok());
        assert!(condition.check(&record(json!({"n": 9}))).is_err());
    }
}
