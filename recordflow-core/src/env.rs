use crate::condition::Condition;
use crate::error::{ConditionError, ExpressionError};
use crate::resolver::Resolver;
use parking_lot::RwLock;
use recordflow_context::{FlowVariables, Record, RecordflowConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// 管道执行环境
///
/// 配置与流程变量在一次运行中只读, 已解析的条件按原文缓存。克隆共享同一份
/// 缓存, 可以交给多个并行批次。
#[derive(Debug, Clone)]
pub struct ExecutionEnv {
    config: Arc<RecordflowConfig>,
    resolver: Arc<Resolver>,
    conditions: Arc<RwLock<HashMap<String, Arc<Condition>>>>,
}

impl ExecutionEnv {
    pub fn new(
        config: Arc<RecordflowConfig>,
        variables: Arc<FlowVariables>,
    ) -> Result<Self, ExpressionError> {
        let resolver = Resolver::new(config.path_separator, variables)?;
        Ok(Self {
            config,
            resolver: Arc::new(resolver),
            conditions: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Environment with the default configuration and no variables
    pub fn with_defaults() -> Result<Self, ExpressionError> {
        Self::new(Arc::default(), Arc::default())
    }

    /// Same settings and resolver with an empty condition cache of its own
    pub fn fork(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            resolver: Arc::clone(&self.resolver),
            conditions: Arc::default(),
        }
    }

    /// Number of parsed conditions held by this environment's cache
    pub fn cached_conditions(&self) -> usize {
        self.conditions.read().len()
    }

    pub fn config(&self) -> &RecordflowConfig {
        &self.config
    }

    pub fn variables(&self) -> &FlowVariables {
        self.resolver.variables()
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn default_dataset(&self) -> &str {
        &self.config.default_dataset_name
    }

    pub fn condition(&self, source: &str) -> Result<Arc<Condition>, ExpressionError> {
        if let Some(condition) = self.conditions.read().get(source) {
            return Ok(Arc::clone(condition));
        }
        let condition = Arc::new(Condition::new(source, &self.resolver)?);
        self.conditions
            .write()
            .insert(source.to_string(), Arc::clone(&condition));
        Ok(condition)
    }

    pub fn check_condition(
        &self,
        source: &str,
        record: &Record,
    ) -> Result<(), ConditionError> {
        self.condition(source)?.check(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_cache() {
        let env = ExecutionEnv::with_defaults().unwrap();
        let first = env.condition("@a == 1").unwrap();
        let second = env.condition("@a == 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let record = Record::try_from(json!({"a": 1})).unwrap();
        assert!(env.check_condition("@a == 1", &record).is_ok());
        assert!(env.check_condition("@a == 2", &record).is_err());
    }

    #[test]
    fn test_fork_has_own_cache() {
        let env = ExecutionEnv::with_defaults().unwrap();
        let cached = env.condition("@a == 1").unwrap();

        let fork = env.fork();
        assert!(Arc::ptr_eq(&env.resolver, &fork.resolver));
        assert_eq!(fork.cached_conditions(), 0);

        let forked = fork.condition("@a == 1").unwrap();
        assert!(!Arc::ptr_eq(&cached, &forked));
        assert_eq!(env.cached_conditions(), 1);
        assert_eq!(fork.cached_conditions(), 1);
    }

    #[test]
    fn test_separator_from_config() {
        let config = RecordflowConfig::new().with_path_separator('.');
        let env = ExecutionEnv::new(Arc::new(config), Arc::default()).unwrap();
        let record = Record::try_from(json!({"a": {"b": 1}})).unwrap();
        assert!(env.check_condition("@a.b == 1", &record).is_ok());
    }
}
