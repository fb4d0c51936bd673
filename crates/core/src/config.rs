use serde::Deserialize;

use crate::error::BridgeResult;

/// Process configuration for the bridge. Loaded from environment variables
/// with the prefix `ENGAGE_BRIDGE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Maximum nesting depth accepted by the attribute converter.
    /// `0` disables the guard.
    #[serde(default = "default_max_conversion_depth")]
    pub max_conversion_depth: usize,
    #[serde(default)]
    pub backend: BackendKind,
    /// Value the log backend reports for `handlePushNotification`.
    #[serde(default)]
    pub push_handled_default: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Log,
    Unavailable,
}

fn default_max_conversion_depth() -> usize {
    64
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_conversion_depth: default_max_conversion_depth(),
            backend: BackendKind::default(),
            push_handled_default: false,
        }
    }
}

impl BridgeConfig {
    pub fn load() -> BridgeResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("ENGAGE_BRIDGE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Depth limit in the form the converter expects.
    pub fn depth_limit(&self) -> Option<usize> {
        (self.max_conversion_depth > 0).then_some(self.max_conversion_depth)
    }
}
