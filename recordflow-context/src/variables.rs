use crate::VariableError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 流程级变量
///
/// 条件表达式通过 `!:name` 引用。重复 `set` 同名变量是错误, 修改已有
/// 变量需要显式 `update`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowVariables {
    variables: HashMap<String, Value>,
}

impl FlowVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), VariableError> {
        let name = name.into();
        if self.variables.contains_key(&name) {
            return Err(VariableError::AlreadyExists(name));
        }
        tracing::debug!(variable = %name, value = %value, "Setting flow variable");
        self.variables.insert(name, value);
        Ok(())
    }

    pub fn update(&mut self, name: &str, value: Value) -> Result<(), VariableError> {
        match self.variables.get_mut(name) {
            Some(slot) => {
                tracing::debug!(variable = %name, value = %value, "Updating flow variable");
                *slot = value;
                Ok(())
            }
            None => Err(VariableError::DoesNotExist(name.to_string())),
        }
    }

    pub fn delete(&mut self, name: &str) -> Result<Value, VariableError> {
        self.variables
            .remove(name)
            .ok_or_else(|| VariableError::DoesNotExist(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<&Value, VariableError> {
        self.variables
            .get(name)
            .ok_or_else(|| VariableError::DoesNotExist(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl From<Map<String, Value>> for FlowVariables {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            variables: map.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, Value>> for FlowVariables {
    fn from(variables: HashMap<String, Value>) -> Self {
        Self { variables }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut vars = FlowVariables::new();
        vars.set("a", json!("B")).unwrap();
        assert_eq!(vars.get("a").unwrap(), &json!("B"));
        assert!(vars.contains("a"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_set_twice_fails() {
        let mut vars = FlowVariables::new();
        vars.set("a", json!(1)).unwrap();
        let err = vars.set("a", json!(2)).unwrap_err();
        assert_eq!(err.to_string(), "Flow variable 'a' already exists");
        assert_eq!(vars.get("a").unwrap(), &json!(1));
    }

    #[test]
    fn test_update_and_delete() {
        let mut vars = FlowVariables::new();
        assert_eq!(
            vars.update("a", json!(1)).unwrap_err().to_string(),
            "Flow variable 'a' doesn't exist"
        );

        vars.set("a", json!(1)).unwrap();
        vars.update("a", json!(2)).unwrap();
        assert_eq!(vars.get("a").unwrap(), &json!(2));

        assert_eq!(vars.delete("a").unwrap(), json!(2));
        assert!(vars.get("a").is_err());
        assert!(vars.delete("a").is_err());
        assert!(vars.is_empty());
    }

    #[test]
    fn test_from_map() {
        let map = json!({"x": 1, "y": "z"}).as_object().cloned().unwrap();
        let vars = FlowVariables::from(map);
        let mut names: Vec<&str> = vars.names().collect();
        names.sort();
        assert_eq!(names, vec!["x", "y"]);
    }
}
