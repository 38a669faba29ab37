//! Tagged value tree stored under each channel.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Ordered mapping used for every object node.
pub type ConfigMap = IndexMap<String, ConfigValue>;

/// A JSON-shaped value with insertion-ordered objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ConfigValue>),
    Object(ConfigMap),
}

impl ConfigValue {
    pub fn object() -> Self {
        Self::Object(ConfigMap::new())
    }

    pub fn as_object(&self) -> Option<&ConfigMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ConfigMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Field lookup on an object node; `None` for every other shape.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Short name of the node's shape, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ConfigValue> for serde_json::Value {
    fn from(value: ConfigValue) -> Self {
        match value {
            ConfigValue::Null => Self::Null,
            ConfigValue::Bool(b) => Self::Bool(b),
            ConfigValue::Number(n) => Self::Number(n),
            ConfigValue::String(s) => Self::String(s),
            ConfigValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            ConfigValue::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_conversion_keeps_order() {
        let json = serde_json::json!({"z": 1, "a": [true, null, "x"], "m": {"k": 2.5}});
        let value = ConfigValue::from(json.clone());
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(serde_json::Value::from(value), json);
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(ConfigValue::from(None::<String>), ConfigValue::Null);
        assert_eq!(
            ConfigValue::from(Some("red")),
            ConfigValue::String("red".into())
        );
    }

    #[test]
    fn serializes_untagged() {
        let mut map = ConfigMap::new();
        map.insert("on".into(), true.into());
        map.insert("n".into(), 3i64.into());
        map.insert("none".into(), ConfigValue::Null);
        let text = serde_json::to_string(&ConfigValue::Object(map)).unwrap();
        assert_eq!(text, r#"{"on":true,"n":3,"none":null}"#);
    }
}
