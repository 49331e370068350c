use crate::{ConfigError, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub const DEFAULT_PATH_SEPARATOR: char = '/';
pub const DEFAULT_DATASET_NAME: &str = "default";
pub const DEFAULT_FLOWS_PATH: &str = "flows";

const ENV_PATH_SEPARATOR: &str = "RECORDFLOW_PATH_SEPARATOR";
const ENV_DEFAULT_DATASET: &str = "RECORDFLOW_DEFAULT_DATASET";
const ENV_FLOWS_PATH: &str = "RECORDFLOW_FLOWS_PATH";

/// 运行期共享配置
///
/// 构造一次后以 `Arc` 传给需要路径分隔符或默认数据集名的组件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordflowConfig {
    /// 记录路径分隔符
    pub path_separator: char,
    /// 未被任何步骤认领的记录所在的数据集
    pub default_dataset_name: String,
    /// 按名称查找流程文件的目录
    pub flows_path: PathBuf,
}

impl Default for RecordflowConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordflowConfig {
    pub fn new() -> Self {
        Self {
            path_separator: DEFAULT_PATH_SEPARATOR,
            default_dataset_name: DEFAULT_DATASET_NAME.to_string(),
            flows_path: PathBuf::from(DEFAULT_FLOWS_PATH),
        }
    }

    /// Build the configuration from defaults overridden by environment
    /// variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Ok(separator) = std::env::var(ENV_PATH_SEPARATOR) {
            config.path_separator = parse_separator(&separator)?;
        }
        if let Ok(dataset) = std::env::var(ENV_DEFAULT_DATASET) {
            config.default_dataset_name = dataset;
        }
        if let Ok(path) = std::env::var(ENV_FLOWS_PATH) {
            config.flows_path = PathBuf::from(path);
        }

        config.validate()?;
        tracing::debug!(
            path_separator = %config.path_separator,
            default_dataset = %config.default_dataset_name,
            flows_path = %config.flows_path.display(),
            "Loaded recordflow configuration"
        );
        Ok(config)
    }

    /// Set path separator
    pub fn with_path_separator(mut self, separator: char) -> Self {
        self.path_separator = separator;
        self
    }

    /// Set default dataset name
    pub fn with_default_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.default_dataset_name = name.into();
        self
    }

    /// Set flows directory
    pub fn with_flows_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.flows_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_separator(self.path_separator)?;
        if self.default_dataset_name.is_empty() {
            return Err(ConfigError::EmptyDefaultDataset);
        }
        Ok(())
    }

    /// 用当前分隔符包装记录数据
    pub fn record(&self, data: Map<String, Value>) -> Record {
        Record::with_separator(data, self.path_separator)
    }
}

/// Parse a path separator given as a string, it has to be exactly one
/// character
pub fn parse_separator(raw: &str) -> Result<char, ConfigError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(separator), None) => {
            validate_separator(separator)?;
            Ok(separator)
        }
        _ => Err(ConfigError::InvalidPathSeparator(raw.to_string())),
    }
}

// 字段引用按 `@[\w<sep>]+` 解析, 分隔符不能是单词字符或空白
fn validate_separator(separator: char) -> Result<(), ConfigError> {
    if separator.is_alphanumeric() || separator == '_' || separator.is_whitespace()
    {
        return Err(ConfigError::InvalidPathSeparator(separator.to_string()));
    }
    Ok(())
}
