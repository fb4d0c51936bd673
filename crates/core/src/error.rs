use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("{}", required_message(.0))]
    MissingRequiredField(Vec<String>),

    #[error("{field} must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("SDK not initialized")]
    NotInitialized,

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Sdk(#[from] anyhow::Error),
}

impl BridgeError {
    pub fn missing(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::MissingRequiredField(fields.into_iter().map(Into::into).collect())
    }

    /// Missing field names, in schema order. Empty for every other variant.
    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::MissingRequiredField(fields) => fields,
            _ => &[],
        }
    }
}

impl From<config::ConfigError> for BridgeError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Host wording: "a is required", "a and b are required",
/// "a, b, and c are required".
fn required_message(fields: &[String]) -> String {
    match fields {
        [] => "required field missing".to_string(),
        [one] => format!("{one} is required"),
        [a, b] => format!("{a} and {b} are required"),
        [init @ .., last] => format!("{}, and {last} are required", init.join(", ")),
    }
}
