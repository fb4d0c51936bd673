//! Per-operation field contracts and the call validator.
//!
//! Each operation declares its required fields (checked in declared order)
//! and its optional fields with defaults. Validation is a pure function of
//! the schema and the raw parameter bag.

use std::fmt;
use std::str::FromStr;

use engage_core::{BridgeError, BridgeResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Initialize,
    Identify,
    ClearIdentify,
    Track,
    Screen,
    SetDeviceAttributes,
    SetProfileAttributes,
    RegisterDeviceToken,
    TrackPushEvent,
    HandlePushNotification,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Initialize,
        Operation::Identify,
        Operation::ClearIdentify,
        Operation::Track,
        Operation::Screen,
        Operation::SetDeviceAttributes,
        Operation::SetProfileAttributes,
        Operation::RegisterDeviceToken,
        Operation::TrackPushEvent,
        Operation::HandlePushNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Identify => "identify",
            Self::ClearIdentify => "clearIdentify",
            Self::Track => "track",
            Self::Screen => "screen",
            Self::SetDeviceAttributes => "setDeviceAttributes",
            Self::SetProfileAttributes => "setProfileAttributes",
            Self::RegisterDeviceToken => "registerDeviceToken",
            Self::TrackPushEvent => "trackPushEvent",
            Self::HandlePushNotification => "handlePushNotification",
        }
    }

    pub fn schema(&self) -> &'static OperationSchema {
        match self {
            Self::Initialize => &INITIALIZE,
            Self::Identify => &IDENTIFY,
            Self::ClearIdentify => &CLEAR_IDENTIFY,
            Self::Track => &TRACK,
            Self::Screen => &SCREEN,
            Self::SetDeviceAttributes => &SET_DEVICE_ATTRIBUTES,
            Self::SetProfileAttributes => &SET_PROFILE_ATTRIBUTES,
            Self::RegisterDeviceToken => &REGISTER_DEVICE_TOKEN,
            Self::TrackPushEvent => &TRACK_PUSH_EVENT,
            Self::HandlePushNotification => &HANDLE_PUSH_NOTIFICATION,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| BridgeError::UnknownOperation(s.to_string()))
    }
}

/// Default applied to an absent optional field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    /// Stays absent; the operation picks its no-payload variant.
    None,
    Str(&'static str),
    Bool(bool),
    Int(i64),
}

impl FieldDefault {
    fn to_value(self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Str(s) => Some(Value::String(s.to_string())),
            Self::Bool(b) => Some(Value::Bool(b)),
            Self::Int(n) => Some(Value::from(n)),
        }
    }
}

#[derive(Debug)]
pub struct OperationSchema {
    pub required: &'static [&'static str],
    pub optional: &'static [(&'static str, FieldDefault)],
    /// `(canonical, legacy)` names; the legacy value is used when the
    /// canonical field is absent.
    pub aliases: &'static [(&'static str, &'static str)],
}

static INITIALIZE: OperationSchema = OperationSchema {
    required: &["siteId", "apiKey"],
    optional: &[
        ("region", FieldDefault::Str("US")),
        ("autoTrackScreens", FieldDefault::Bool(false)),
        ("autoTrackPushEvents", FieldDefault::Bool(true)),
        ("backgroundQueueMinTasks", FieldDefault::Int(10)),
        ("backgroundQueueDelaySeconds", FieldDefault::Int(30)),
    ],
    aliases: &[
        ("backgroundQueueMinTasks", "backgroundQueueMinNumberOfTasks"),
        ("backgroundQueueDelaySeconds", "backgroundQueueSecondsDelay"),
    ],
};

static IDENTIFY: OperationSchema = OperationSchema {
    required: &["userId"],
    optional: &[("attributes", FieldDefault::None)],
    aliases: &[],
};

static CLEAR_IDENTIFY: OperationSchema = OperationSchema {
    required: &[],
    optional: &[],
    aliases: &[],
};

static TRACK: OperationSchema = OperationSchema {
    required: &["name"],
    optional: &[("properties", FieldDefault::None)],
    aliases: &[],
};

static SCREEN: OperationSchema = OperationSchema {
    required: &["name"],
    optional: &[("properties", FieldDefault::None)],
    aliases: &[],
};

static SET_DEVICE_ATTRIBUTES: OperationSchema = OperationSchema {
    required: &["attributes"],
    optional: &[],
    aliases: &[],
};

static SET_PROFILE_ATTRIBUTES: OperationSchema = OperationSchema {
    required: &["attributes"],
    optional: &[],
    aliases: &[],
};

static REGISTER_DEVICE_TOKEN: OperationSchema = OperationSchema {
    required: &["token"],
    optional: &[],
    aliases: &[],
};

static TRACK_PUSH_EVENT: OperationSchema = OperationSchema {
    required: &["event", "deliveryId", "deviceToken"],
    optional: &[],
    aliases: &[],
};

static HANDLE_PUSH_NOTIFICATION: OperationSchema = OperationSchema {
    required: &["data"],
    optional: &[],
    aliases: &[],
};

fn is_present(params: &Map<String, Value>, field: &str) -> bool {
    params.get(field).is_some_and(|v| !v.is_null())
}

/// Check required fields and fill optional defaults.
///
/// Missing required fields are reported together, in schema order.
pub fn validate(
    operation: Operation,
    raw: Option<&Map<String, Value>>,
) -> BridgeResult<ValidatedParams> {
    let schema = operation.schema();
    let mut fields = raw.cloned().unwrap_or_default();

    for (canonical, legacy) in schema.aliases {
        if !is_present(&fields, canonical) {
            if let Some(value) = fields.get(*legacy).filter(|v| !v.is_null()).cloned() {
                fields.insert((*canonical).to_string(), value);
            }
        }
    }

    let missing: Vec<&str> = schema
        .required
        .iter()
        .copied()
        .filter(|field| !is_present(&fields, field))
        .collect();
    if !missing.is_empty() {
        return Err(BridgeError::missing(missing));
    }

    for (field, default) in schema.optional {
        if !is_present(&fields, field) {
            match default.to_value() {
                Some(value) => {
                    fields.insert((*field).to_string(), value);
                }
                None => {
                    fields.remove(*field);
                }
            }
        }
    }

    Ok(ValidatedParams { operation, fields })
}

/// Parameters that passed validation, with defaults applied.
#[derive(Debug, Clone)]
pub struct ValidatedParams {
    operation: Operation,
    fields: Map<String, Value>,
}

impl ValidatedParams {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    pub fn string(&self, field: &str) -> BridgeResult<&str> {
        match self.get(field) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(invalid(field, "a string")),
            None => Err(BridgeError::missing([field])),
        }
    }

    pub fn bool(&self, field: &str) -> BridgeResult<bool> {
        match self.get(field) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(invalid(field, "a boolean")),
            None => Err(BridgeError::missing([field])),
        }
    }

    pub fn u32(&self, field: &str) -> BridgeResult<u32> {
        let value = self.get(field).ok_or_else(|| BridgeError::missing([field]))?;
        value
            .as_u64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid(field, "a non-negative integer"))
    }

    /// Optional object field; absent or null yields `None`.
    pub fn object(&self, field: &str) -> BridgeResult<Option<&Map<String, Value>>> {
        match self.get(field) {
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(invalid(field, "an object")),
            None => Ok(None),
        }
    }

    pub fn required_object(&self, field: &str) -> BridgeResult<&Map<String, Value>> {
        self.object(field)?
            .ok_or_else(|| BridgeError::missing([field]))
    }
}

fn invalid(field: &str, expected: &'static str) -> BridgeError {
    BridgeError::InvalidField {
        field: field.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        let err = "flush".parse::<Operation>().unwrap_err();
        assert!(matches!(err, BridgeError::UnknownOperation(ref name) if name == "flush"));
    }

    #[test]
    fn test_initialize_defaults() {
        let p = validate(
            Operation::Initialize,
            Some(&params(json!({"siteId": "abc", "apiKey": "xyz"}))),
        )
        .unwrap();
        assert_eq!(p.string("region").unwrap(), "US");
        assert!(!p.bool("autoTrackScreens").unwrap());
        assert!(p.bool("autoTrackPushEvents").unwrap());
        assert_eq!(p.u32("backgroundQueueMinTasks").unwrap(), 10);
        assert_eq!(p.u32("backgroundQueueDelaySeconds").unwrap(), 30);
    }

    #[test]
    fn test_caller_values_pass_through() {
        let p = validate(
            Operation::Initialize,
            Some(&params(json!({
                "siteId": "abc",
                "apiKey": "xyz",
                "region": "EU",
                "autoTrackPushEvents": false,
                "backgroundQueueMinTasks": 3.0
            }))),
        )
        .unwrap();
        assert_eq!(p.string("region").unwrap(), "EU");
        assert!(!p.bool("autoTrackPushEvents").unwrap());
        assert_eq!(p.u32("backgroundQueueMinTasks").unwrap(), 3);
    }

    #[test]
    fn test_legacy_field_names() {
        let p = validate(
            Operation::Initialize,
            Some(&params(json!({
                "siteId": "abc",
                "apiKey": "xyz",
                "backgroundQueueMinNumberOfTasks": 4,
                "backgroundQueueSecondsDelay": 12
            }))),
        )
        .unwrap();
        assert_eq!(p.u32("backgroundQueueMinTasks").unwrap(), 4);
        assert_eq!(p.u32("backgroundQueueDelaySeconds").unwrap(), 12);
    }

    #[test]
    fn test_missing_required_fields_in_schema_order() {
        let err = validate(
            Operation::TrackPushEvent,
            Some(&params(json!({"event": "delivered"}))),
        )
        .unwrap_err();
        assert_eq!(err.missing_fields(), ["deliveryId", "deviceToken"]);

        let err = validate(Operation::Identify, None).unwrap_err();
        assert_eq!(err.missing_fields(), ["userId"]);
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = validate(
            Operation::Track,
            Some(&params(json!({"name": null}))),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn test_optional_without_default_stays_absent() {
        let p = validate(
            Operation::Track,
            Some(&params(json!({"name": "Purchased", "properties": null}))),
        )
        .unwrap();
        assert!(p.get("properties").is_none());
        assert!(p.object("properties").unwrap().is_none());
    }

    #[test]
    fn test_type_mismatch() {
        let p = validate(Operation::Identify, Some(&params(json!({"userId": 5})))).unwrap();
        let err = p.string("userId").unwrap_err();
        assert_eq!(err.to_string(), "userId must be a string");

        let p = validate(
            Operation::SetDeviceAttributes,
            Some(&params(json!({"attributes": [1, 2]}))),
        )
        .unwrap();
        assert!(matches!(
            p.required_object("attributes"),
            Err(BridgeError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_every_operation_has_schema() {
        for op in Operation::ALL {
            let schema = op.schema();
            for field in schema.required {
                assert!(!schema.optional.iter().any(|(name, _)| name == field));
            }
        }
        assert!(Operation::ClearIdentify.schema().required.is_empty());
    }
}
