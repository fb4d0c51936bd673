//! Pending-call contract between the host shell and the dispatcher.
//!
//! A call carries the operation name and its JSON parameter bag, and ends in
//! exactly one terminal action: `resolve` or `reject`.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

pub trait PluginCall: Send {
    fn call_id(&self) -> Uuid;

    /// Operation name, e.g. `"track"`.
    fn method(&self) -> &str;

    fn data(&self) -> &Map<String, Value>;

    fn resolve(&mut self, result: Option<Value>);

    fn reject(&mut self, message: String);

    fn get_string(&self, field: &str) -> Option<&str> {
        self.data().get(field).and_then(Value::as_str)
    }

    fn get_string_or<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.get_string(field).unwrap_or(default)
    }

    fn get_bool(&self, field: &str, default: bool) -> bool {
        self.data()
            .get(field)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    fn get_int(&self, field: &str, default: i64) -> i64 {
        self.data()
            .get(field)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    fn get_object(&self, field: &str) -> Option<&Map<String, Value>> {
        self.data().get(field).and_then(Value::as_object)
    }
}

/// Terminal state of a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallResolution {
    Resolved { result: Option<Value> },
    Rejected { message: String },
}

/// In-memory call over a JSON object, recording how it was resolved.
#[derive(Debug, Clone)]
pub struct JsonCall {
    id: Uuid,
    method: String,
    data: Map<String, Value>,
    resolution: Option<CallResolution>,
}

impl JsonCall {
    pub fn new(method: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into(),
            data,
            resolution: None,
        }
    }

    /// Build a call from any JSON value; non-object values yield an empty bag.
    pub fn from_value(method: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(method, data)
    }

    pub fn resolution(&self) -> Option<&CallResolution> {
        self.resolution.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.resolution.is_some()
    }

    /// Rejection message, if the call was rejected.
    pub fn rejection(&self) -> Option<&str> {
        match &self.resolution {
            Some(CallResolution::Rejected { message }) => Some(message),
            _ => None,
        }
    }

    /// Resolved result; `None` when unresolved, rejected or resolved empty.
    pub fn result(&self) -> Option<&Value> {
        match &self.resolution {
            Some(CallResolution::Resolved { result }) => result.as_ref(),
            _ => None,
        }
    }

    fn settle(&mut self, resolution: CallResolution) {
        if let Some(existing) = &self.resolution {
            warn!(
                call_id = %self.id,
                method = %self.method,
                existing = ?existing,
                "call already settled, ignoring terminal action"
            );
            return;
        }
        self.resolution = Some(resolution);
    }
}

impl PluginCall for JsonCall {
    fn call_id(&self) -> Uuid {
        self.id
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    fn resolve(&mut self, result: Option<Value>) {
        self.settle(CallResolution::Resolved { result });
    }

    fn reject(&mut self, message: String) {
        self.settle(CallResolution::Rejected { message });
    }
}
