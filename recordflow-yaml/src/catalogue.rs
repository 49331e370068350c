use crate::builtin;
use crate::error::ConfigurationError;
use recordflow_context::RecordflowConfig;
use recordflow_core::Transformation;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a step from its configuration object
pub type TransformationFactory = Arc<
    dyn Fn(&Value, &RecordflowConfig) -> Result<Arc<dyn Transformation>, ConfigurationError>
        + Send
        + Sync,
>;

/// 步骤名称到构造函数的映射
///
/// `new` 预置全部内置步骤, 自定义步骤通过 `register` 加入。
#[derive(Clone)]
pub struct TransformationCatalogue {
    factories: HashMap<String, TransformationFactory>,
}

impl TransformationCatalogue {
    /// Catalogue seeded with the built-in transformations
    pub fn new() -> Self {
        let mut catalogue = Self::empty();
        for (name, factory) in builtin::BUILTINS {
            let factory: TransformationFactory = Arc::new(*factory);
            catalogue.factories.insert(name.to_string(), factory);
        }
        catalogue
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a custom transformation, refusing to replace an existing
    /// name unless `overwrite`
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
        overwrite: bool,
    ) -> Result<(), ConfigurationError>
    where
        F: Fn(&Value, &RecordflowConfig) -> Result<Arc<dyn Transformation>, ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if !overwrite && self.factories.contains_key(&name) {
            return Err(ConfigurationError::TransformationAlreadyRegistered(name));
        }
        tracing::debug!(transformation = %name, overwrite = overwrite, "Registering transformation");
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&TransformationFactory, ConfigurationError> {
        self.factories
            .get(name)
            .ok_or_else(|| ConfigurationError::TransformationDoesNotExist(name.to_string()))
    }

    /// Resolve `name` and build the step from `config`
    pub fn build(
        &self,
        name: &str,
        config: &Value,
        settings: &RecordflowConfig,
    ) -> Result<Arc<dyn Transformation>, ConfigurationError> {
        tracing::debug!(transformation = %name, "Resolving transformation");
        let factory = self.get(name)?;
        factory(config, settings)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TransformationCatalogue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransformationCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationCatalogue")
            .field("transformations", &self.names())
            .finish()
    }
}
