//! Canonical value model handed to the engagement SDK.
//!
//! Host payloads arrive as JSON objects; the converter in the bridge crate
//! rewrites them into [`AttributeValue`] trees so no host representation
//! leaks past the SDK boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Canonical mapping from attribute name to value.
pub type Attributes = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<AttributeValue>),
    Map(Attributes),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Number(n) => serde_json::Value::Number(n.clone()),
            AttributeValue::String(s) => serde_json::Value::String(s.clone()),
            AttributeValue::List(items) => {
                serde_json::Value::Array(items.iter().map(Into::into).collect())
            }
            AttributeValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_plain_json() {
        let mut inner = Attributes::new();
        inner.insert("plan".into(), "pro".into());
        let mut attrs = Attributes::new();
        attrs.insert("qty".into(), 2i64.into());
        attrs.insert("vip".into(), true.into());
        attrs.insert("account".into(), AttributeValue::Map(inner));
        attrs.insert(
            "tags".into(),
            AttributeValue::List(vec!["a".into(), AttributeValue::Null]),
        );

        let json = serde_json::to_value(AttributeValue::Map(attrs.clone())).unwrap();
        assert_eq!(
            json,
            json!({"qty": 2, "vip": true, "account": {"plan": "pro"}, "tags": ["a", null]})
        );
        assert_eq!(serde_json::Value::from(&AttributeValue::Map(attrs)), json);
    }

    #[test]
    fn test_accessors() {
        let v = AttributeValue::from("book");
        assert_eq!(v.as_str(), Some("book"));
        assert!(v.as_map().is_none());
        assert!(AttributeValue::Null.as_str().is_none());
        assert_eq!(AttributeValue::List(vec![]).as_list().map(|l| l.len()), Some(0));
    }
}
