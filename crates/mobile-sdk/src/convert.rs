//! Attribute conversion — rewrites host JSON payloads into canonical
//! [`AttributeValue`] trees for the SDK boundary.
//!
//! Nested objects become [`Attributes`] recursively and lists keep their
//! element order. Payloads are assumed acyclic; the optional depth limit
//! bounds how far the recursion may go.

use std::collections::HashMap;

use engage_core::{AttributeValue, Attributes, BridgeError, BridgeResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub struct ValueConverter {
    max_depth: Option<usize>,
}

impl Default for ValueConverter {
    fn default() -> Self {
        Self::new(Some(64))
    }
}

impl ValueConverter {
    /// `max_depth` counts nested containers; the top-level object is depth 1.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self { max_depth }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn convert(&self, value: &Value) -> BridgeResult<AttributeValue> {
        self.convert_at(value, 0)
    }

    pub fn convert_object(&self, object: &Map<String, Value>) -> BridgeResult<Attributes> {
        self.convert_map(object, 1)
    }

    fn convert_at(&self, value: &Value, depth: usize) -> BridgeResult<AttributeValue> {
        Ok(match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => AttributeValue::Number(n.clone()),
            Value::String(s) => AttributeValue::String(s.clone()),
            Value::Array(items) => {
                let depth = self.enter(depth)?;
                AttributeValue::List(
                    items
                        .iter()
                        .map(|item| self.convert_at(item, depth))
                        .collect::<BridgeResult<_>>()?,
                )
            }
            Value::Object(object) => {
                AttributeValue::Map(self.convert_map(object, self.enter(depth)?)?)
            }
        })
    }

    fn convert_map(&self, object: &Map<String, Value>, depth: usize) -> BridgeResult<Attributes> {
        self.check(depth)?;
        object
            .iter()
            .map(|(key, value)| Ok((key.clone(), self.convert_at(value, depth)?)))
            .collect()
    }

    fn enter(&self, depth: usize) -> BridgeResult<usize> {
        let depth = depth + 1;
        self.check(depth)?;
        Ok(depth)
    }

    fn check(&self, depth: usize) -> BridgeResult<()> {
        match self.max_depth {
            Some(max) if depth > max => Err(BridgeError::Conversion(format!(
                "payload nested deeper than {max} levels"
            ))),
            _ => Ok(()),
        }
    }
}

/// Flatten a push payload into string values. The payload is contractually
/// flat: numbers and booleans are rendered as text, anything else fails.
pub fn flatten_strings(object: &Map<String, Value>) -> BridgeResult<HashMap<String, String>> {
    object
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(BridgeError::Conversion(format!(
                        "push data field '{key}' must be a string"
                    )))
                }
            };
            Ok((key.clone(), text))
        })
        .collect()
}
