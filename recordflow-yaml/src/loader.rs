use crate::error::ConfigurationError;
use crate::schema::FlowSchema;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// 内联配置 (字符串或值) 的流程名
pub const INLINE_FLOW: &str = "<inline>";

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// 流程配置加载器, 支持 YAML/JSON 字符串、文件与按名称查找
pub struct FlowConfigurationLoader;

impl FlowConfigurationLoader {
    /// 从 YAML 字符串加载
    pub fn from_yaml_str(content: &str) -> Result<FlowSchema, ConfigurationError> {
        Self::parse_yaml(INLINE_FLOW, content)
    }

    /// 从 JSON 字符串加载
    pub fn from_json_str(content: &str) -> Result<FlowSchema, ConfigurationError> {
        let schema = serde_json::from_str(content).map_err(|e| not_defined(INLINE_FLOW, e))?;
        Self::validated(INLINE_FLOW, schema)
    }

    /// 从已解析的配置值加载
    pub fn from_value(config: &Value) -> Result<FlowSchema, ConfigurationError> {
        tracing::info!("Loading flow configuration from config object");
        let schema =
            FlowSchema::deserialize(config).map_err(|e| not_defined(INLINE_FLOW, e))?;
        Self::validated(INLINE_FLOW, schema)
    }

    /// 从文件加载, `.json` 按 JSON 解析, 其余按 YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FlowSchema, ConfigurationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if path.extension().is_some_and(|ext| ext == "json") {
            let schema = serde_json::from_str(&content).map_err(|e| not_defined(&name, e))?;
            Self::validated(&name, schema)
        } else {
            Self::parse_yaml(&name, &content)
        }
    }

    /// 按流程名在 `flows_path` 下查找 `<name>.yml` 或 `<name>.yaml` 并加载
    pub fn load<P: AsRef<Path>>(name: &str, flows_path: P) -> Result<FlowSchema, ConfigurationError> {
        tracing::info!(flow = %name, "Loading flow configuration from yaml file");
        let path = Self::find(name, flows_path)?;
        let content = fs::read_to_string(&path).map_err(|source| ConfigurationError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse_yaml(name, &content)
    }

    /// 查找流程文件
    pub fn find<P: AsRef<Path>>(name: &str, flows_path: P) -> Result<PathBuf, ConfigurationError> {
        let flows_path = flows_path.as_ref();
        EXTENSIONS
            .iter()
            .map(|extension| flows_path.join(format!("{}.{}", name, extension)))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                tracing::error!(flow = %name, flows_path = %flows_path.display(), "Configuration yaml file not found");
                ConfigurationError::FlowConfigurationFileNotFound(name.to_string())
            })
    }

    /// 保存为 YAML 文件
    pub fn save_to_yaml<P: AsRef<Path>>(
        schema: &FlowSchema,
        path: P,
    ) -> Result<(), ConfigurationError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(schema).map_err(|e| not_defined(INLINE_FLOW, e))?;
        fs::write(path, content).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse_yaml(name: &str, content: &str) -> Result<FlowSchema, ConfigurationError> {
        let schema = serde_yaml::from_str(content).map_err(|e| not_defined(name, e))?;
        Self::validated(name, schema)
    }

    fn validated(name: &str, schema: FlowSchema) -> Result<FlowSchema, ConfigurationError> {
        schema.validate().map_err(|e| not_defined(name, e))?;
        Ok(schema)
    }
}

fn not_defined(name: &str, reason: impl ToString) -> ConfigurationError {
    ConfigurationError::FlowSchemaNotProperlyDefined {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
