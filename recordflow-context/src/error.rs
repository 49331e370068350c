use thiserror::Error;

/// 记录读写错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Failed to add element to a record, path: {path}, value: {value}")]
    Add { path: String, value: String },

    #[error("Element at path '{path}' is not contained in the record")]
    PathNotFound { path: String },

    #[error("Record data has to be a mapping, got: {0}")]
    NotAMapping(String),
}

/// 流程变量错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    #[error("Flow variable '{0}' already exists")]
    AlreadyExists(String),

    #[error("Flow variable '{0}' doesn't exist")]
    DoesNotExist(String),
}

/// 全局配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Path separator has to be a single non-word character, got '{0}'")]
    InvalidPathSeparator(String),

    #[error("Default dataset name cannot be empty")]
    EmptyDefaultDataset,
}
