pub mod config;
pub mod error;
pub mod value;

pub use config::{BackendKind, BridgeConfig};
pub use error::{BridgeError, BridgeResult};
pub use value::{AttributeValue, Attributes};
