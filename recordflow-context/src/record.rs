use crate::{RecordError, DEFAULT_PATH_SEPARATOR};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{map, Map, Value};
use std::fmt;

/// 流经管道的一条记录
///
/// 记录是一棵键值树, 通过 `a/b/c` 形式的路径访问嵌套字段, 分隔符可配置。
/// 相等性只比较数据, 不比较分隔符。
#[derive(Clone)]
pub struct Record {
    data: Map<String, Value>,
    separator: char,
}

impl Default for Record {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self::with_separator(data, DEFAULT_PATH_SEPARATOR)
    }

    pub fn with_separator(data: Map<String, Value>, separator: char) -> Self {
        Self { data, separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn set_separator(&mut self, separator: char) {
        self.separator = separator;
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }

    /// Value stored at `path`, descending through nested mappings only
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(self.separator);
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split(self.separator);
        let first = segments.next()?;
        let mut current = self.data.get_mut(first)?;
        for segment in segments {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Write `value` at `path`, creating the intermediate mappings on demand.
    /// Writing through a non-mapping value fails and leaves the record as is.
    pub fn add(&mut self, path: &str, value: Value) -> Result<(), RecordError> {
        tracing::debug!(path = %path, value = %value, "Adding element to record");

        let segments: Vec<&str> = path.split(self.separator).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(RecordError::Add {
                path: path.to_string(),
                value: value.to_string(),
            });
        };

        if !self.is_writable(parents) {
            tracing::error!(path = %path, "Failed to add element to a record");
            return Err(RecordError::Add {
                path: path.to_string(),
                value: value.to_string(),
            });
        }

        let mut element = &mut self.data;
        for key in parents {
            let entry = element
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            element = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(RecordError::Add {
                        path: path.to_string(),
                        value: value.to_string(),
                    })
                }
            };
        }
        element.insert(last.to_string(), value);
        Ok(())
    }

    // 中间段要么不存在, 要么是映射
    fn is_writable(&self, parents: &[&str]) -> bool {
        let mut element = &self.data;
        for key in parents {
            match element.get(*key) {
                None => return true,
                Some(Value::Object(map)) => element = map,
                Some(_) => return false,
            }
        }
        true
    }

    /// Remove the element at `path` and return it.
    ///
    /// An absent path is an error when `required`, otherwise only a warning.
    pub fn remove(
        &mut self,
        path: &str,
        required: bool,
    ) -> Result<Option<Value>, RecordError> {
        if !self.contains(path) {
            if required {
                tracing::error!(path = %path, "Element is not contained in the record");
                return Err(RecordError::PathNotFound {
                    path: path.to_string(),
                });
            }
            tracing::warn!(path = %path, "Element is not contained in the record");
            return Ok(None);
        }

        let (parent, last) = match path.rsplit_once(self.separator) {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };
        let container = match parent {
            Some(parent) => self.get_mut(parent).and_then(Value::as_object_mut),
            None => Some(&mut self.data),
        };
        Ok(container.and_then(|map| map.remove(last)))
    }

    /// 顶层直接赋值, key 不按路径解析
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn fields(&self) -> map::Keys<'_> {
        self.data.keys()
    }

    pub fn values(&self) -> map::Values<'_> {
        self.data.values()
    }

    pub fn iter(&self) -> map::Iter<'_> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

impl TryFrom<Value> for Record {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(data) => Ok(Self::new(data)),
            other => Err(RecordError::NotAMapping(other.to_string())),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl PartialEq<Value> for Record {
    fn eq(&self, other: &Value) -> bool {
        matches!(other, Value::Object(map) if map == &self.data)
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.data).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Record::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn test_get_nested() {
        let r = record(json!({"a": {"b": {"c": 1}}, "d": [1, 2]}));
        assert_eq!(r.get("a/b/c"), Some(&json!(1)));
        assert_eq!(r.get("a/b"), Some(&json!({"c": 1})));
        assert_eq!(r.get("a/x"), None);
        assert_eq!(r.get("d/0"), None);
        assert!(r.contains("d"));
        assert!(!r.contains("a/b/c/d"));
    }

    #[test]
    fn test_custom_separator() {
        let mut r = Record::with_separator(Map::new(), '.');
        r.add("a.b", json!("c")).unwrap();
        assert_eq!(r, json!({"a": {"b": "c"}}));
        assert!(r.contains("a.b"));
        assert!(!r.contains("a/b"));
    }

    #[test]
    fn test_add_creates_intermediate() {
        let mut r = Record::default();
        r.add("a/b/c", json!(1)).unwrap();
        r.add("a/d", json!(2)).unwrap();
        assert_eq!(r, json!({"a": {"b": {"c": 1}, "d": 2}}));
    }

    #[test]
    fn test_add_through_scalar_fails() {
        let mut r = record(json!({"a": "b"}));
        let err = r.add("a/b", json!(1)).unwrap_err();
        assert!(matches!(err, RecordError::Add { .. }));
        assert_eq!(r, json!({"a": "b"}));

        let mut r = record(json!({"a": [1, 2]}));
        assert!(r.add("a/b/c", json!(1)).is_err());
        assert_eq!(r, json!({"a": [1, 2]}));
    }

    #[test]
    fn test_remove() {
        let mut r = record(json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(r.remove("a/b", true).unwrap(), Some(json!(1)));
        assert_eq!(r, json!({"a": {"c": 2}}));

        assert_eq!(r.remove("x", false).unwrap(), None);
        assert_eq!(
            r.remove("x", true).unwrap_err(),
            RecordError::PathNotFound {
                path: "x".to_string()
            }
        );

        assert_eq!(r.remove("a", true).unwrap(), Some(json!({"c": 2})));
        assert!(r.is_empty());
    }

    #[test]
    fn test_equality_ignores_separator() {
        let a = Record::with_separator(Map::new(), '.');
        let b = Record::default();
        assert_eq!(a, b);
        assert_ne!(record(json!({"a": 1})), json!([1]));
    }

    #[test]
    fn test_display_and_serde() {
        let r = record(json!({"a": 1}));
        assert_eq!(r.to_string(), r#"{"a":1}"#);
        assert_eq!(format!("{:?}", r), r#"{"a":1}"#);

        let back: Record = serde_json::from_str(&r.to_string()).unwrap();
        assert_eq!(back, r);
        assert!(Record::try_from(json!("x")).is_err());
    }

    #[test]
    fn test_iteration() {
        let r = record(json!({"a": 1, "b": 2}));
        let fields: Vec<&String> = r.fields().collect();
        assert_eq!(fields, vec!["a", "b"]);
        assert_eq!(r.values().count(), 2);
        assert_eq!((&r).into_iter().count(), r.len());
    }
}
