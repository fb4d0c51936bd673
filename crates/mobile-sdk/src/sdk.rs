//! Capability contract of the native engagement SDK.
//!
//! The bridge only talks to the SDK through these traits: the core client
//! (identity, events, attributes), push messaging and in-app messaging.
//! [`EngagementSdk`] is the factory that produces a configured client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use engage_core::Attributes;
use parking_lot::Mutex;
use tracing::info;

use crate::config::SdkConfig;

pub trait EngagementSdk: Send + Sync {
    /// Build a configured client. Called once per successful `initialize`.
    fn configure(&self, config: &SdkConfig) -> Result<Arc<dyn EngagementClient>>;

    fn push(&self) -> Arc<dyn PushMessaging>;

    fn in_app(&self) -> Arc<dyn InAppMessaging>;
}

pub trait EngagementClient: Send + Sync {
    fn identify(&self, user_id: &str) -> Result<()>;

    fn identify_with_attributes(&self, user_id: &str, attributes: &Attributes) -> Result<()>;

    fn clear_identify(&self) -> Result<()>;

    fn track(&self, name: &str) -> Result<()>;

    fn track_with_properties(&self, name: &str, properties: &Attributes) -> Result<()>;

    fn screen(&self, name: &str) -> Result<()>;

    fn screen_with_properties(&self, name: &str, properties: &Attributes) -> Result<()>;

    fn set_device_attributes(&self, attributes: &Attributes) -> Result<()>;

    fn set_profile_attributes(&self, attributes: &Attributes) -> Result<()>;
}

pub trait PushMessaging: Send + Sync {
    fn initialize(&self, auto_track: bool) -> Result<()>;

    fn register_device_token(&self, token: &str) -> Result<()>;

    fn track_metric(&self, delivery_id: &str, event: &str, device_token: &str) -> Result<()>;

    /// Returns whether the SDK recognised and handled the notification.
    fn handle_notification_trigger(&self, data: &HashMap<String, String>) -> Result<bool>;
}

pub trait InAppMessaging: Send + Sync {
    fn initialize(&self) -> Result<()>;
}

/// One capability invocation, as seen by [`RecordingSdk`].
#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    Configure(SdkConfig),
    Identify {
        user_id: String,
        attributes: Option<Attributes>,
    },
    ClearIdentify,
    Track {
        name: String,
        properties: Option<Attributes>,
    },
    Screen {
        name: String,
        properties: Option<Attributes>,
    },
    SetDeviceAttributes(Attributes),
    SetProfileAttributes(Attributes),
    InitializePush {
        auto_track: bool,
    },
    InitializeInApp,
    RegisterDeviceToken(String),
    TrackMetric {
        delivery_id: String,
        event: String,
        device_token: String,
    },
    HandleNotificationTrigger(HashMap<String, String>),
}

impl SdkCall {
    /// Capability method name, used as the failure-injection key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::Identify { .. } => "identify",
            Self::ClearIdentify => "clear_identify",
            Self::Track { .. } => "track",
            Self::Screen { .. } => "screen",
            Self::SetDeviceAttributes(_) => "set_device_attributes",
            Self::SetProfileAttributes(_) => "set_profile_attributes",
            Self::InitializePush { .. } => "initialize_push",
            Self::InitializeInApp => "initialize_in_app",
            Self::RegisterDeviceToken(_) => "register_device_token",
            Self::TrackMetric { .. } => "track_metric",
            Self::HandleNotificationTrigger(_) => "handle_notification_trigger",
        }
    }
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<SdkCall>>,
    failures: Mutex<HashMap<&'static str, String>>,
    handled: AtomicBool,
}

impl Recorder {
    fn record(&self, call: SdkCall) -> Result<()> {
        let name = call.name();
        self.calls.lock().push(call);
        match self.failures.lock().get(name) {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

/// In-memory SDK that captures every capability call. Used by tests.
#[derive(Clone, Default)]
pub struct RecordingSdk {
    inner: Arc<Recorder>,
}

impl RecordingSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named capability method fail with `message`.
    pub fn fail_on(&self, method: &'static str, message: impl Into<String>) {
        self.inner.failures.lock().insert(method, message.into());
    }

    /// Value returned by `handle_notification_trigger`.
    pub fn set_handled(&self, handled: bool) {
        self.inner.handled.store(handled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SdkCall> {
        self.inner.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.inner.calls.lock().len()
    }

    pub fn count_named(&self, method: &str) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|c| c.name() == method)
            .count()
    }

    pub fn last(&self) -> Option<SdkCall> {
        self.inner.calls.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.inner.calls.lock().clear();
    }
}

impl EngagementSdk for RecordingSdk {
    fn configure(&self, config: &SdkConfig) -> Result<Arc<dyn EngagementClient>> {
        self.inner.record(SdkCall::Configure(config.clone()))?;
        Ok(self.inner.clone())
    }

    fn push(&self) -> Arc<dyn PushMessaging> {
        self.inner.clone()
    }

    fn in_app(&self) -> Arc<dyn InAppMessaging> {
        self.inner.clone()
    }
}

impl EngagementClient for Recorder {
    fn identify(&self, user_id: &str) -> Result<()> {
        self.record(SdkCall::Identify {
            user_id: user_id.to_string(),
            attributes: None,
        })
    }

    fn identify_with_attributes(&self, user_id: &str, attributes: &Attributes) -> Result<()> {
        self.record(SdkCall::Identify {
            user_id: user_id.to_string(),
            attributes: Some(attributes.clone()),
        })
    }

    fn clear_identify(&self) -> Result<()> {
        self.record(SdkCall::ClearIdentify)
    }

    fn track(&self, name: &str) -> Result<()> {
        self.record(SdkCall::Track {
            name: name.to_string(),
            properties: None,
        })
    }

    fn track_with_properties(&self, name: &str, properties: &Attributes) -> Result<()> {
        self.record(SdkCall::Track {
            name: name.to_string(),
            properties: Some(properties.clone()),
        })
    }

    fn screen(&self, name: &str) -> Result<()> {
        self.record(SdkCall::Screen {
            name: name.to_string(),
            properties: None,
        })
    }

    fn screen_with_properties(&self, name: &str, properties: &Attributes) -> Result<()> {
        self.record(SdkCall::Screen {
            name: name.to_string(),
            properties: Some(properties.clone()),
        })
    }

    fn set_device_attributes(&self, attributes: &Attributes) -> Result<()> {
        self.record(SdkCall::SetDeviceAttributes(attributes.clone()))
    }

    fn set_profile_attributes(&self, attributes: &Attributes) -> Result<()> {
        self.record(SdkCall::SetProfileAttributes(attributes.clone()))
    }
}

impl PushMessaging for Recorder {
    fn initialize(&self, auto_track: bool) -> Result<()> {
        self.record(SdkCall::InitializePush { auto_track })
    }

    fn register_device_token(&self, token: &str) -> Result<()> {
        self.record(SdkCall::RegisterDeviceToken(token.to_string()))
    }

    fn track_metric(&self, delivery_id: &str, event: &str, device_token: &str) -> Result<()> {
        self.record(SdkCall::TrackMetric {
            delivery_id: delivery_id.to_string(),
            event: event.to_string(),
            device_token: device_token.to_string(),
        })
    }

    fn handle_notification_trigger(&self, data: &HashMap<String, String>) -> Result<bool> {
        self.record(SdkCall::HandleNotificationTrigger(data.clone()))?;
        Ok(self.handled.load(Ordering::SeqCst))
    }
}

impl InAppMessaging for Recorder {
    fn initialize(&self) -> Result<()> {
        self.record(SdkCall::InitializeInApp)
    }
}

/// SDK that accepts every call and logs it. Default backend of the
/// `engage-bridge` host driver.
#[derive(Clone, Default)]
pub struct LogSdk {
    inner: Arc<LogClient>,
}

#[derive(Default)]
struct LogClient {
    handled: bool,
}

impl LogSdk {
    pub fn new(handled: bool) -> Self {
        Self {
            inner: Arc::new(LogClient { handled }),
        }
    }
}

impl EngagementSdk for LogSdk {
    fn configure(&self, config: &SdkConfig) -> Result<Arc<dyn EngagementClient>> {
        info!(
            site_id = %config.site_id,
            region = config.region.as_str(),
            auto_track_screen_views = config.auto_track_screen_views,
            background_queue_min_tasks = config.background_queue_min_tasks,
            background_queue_delay_seconds = config.background_queue_delay_seconds,
            "sdk configured"
        );
        Ok(self.inner.clone())
    }

    fn push(&self) -> Arc<dyn PushMessaging> {
        self.inner.clone()
    }

    fn in_app(&self) -> Arc<dyn InAppMessaging> {
        self.inner.clone()
    }
}

impl EngagementClient for LogClient {
    fn identify(&self, user_id: &str) -> Result<()> {
        info!(user_id, "identify");
        Ok(())
    }

    fn identify_with_attributes(&self, user_id: &str, attributes: &Attributes) -> Result<()> {
        info!(user_id, attributes = attributes.len(), "identify");
        Ok(())
    }

    fn clear_identify(&self) -> Result<()> {
        info!("clear identify");
        Ok(())
    }

    fn track(&self, name: &str) -> Result<()> {
        info!(name, "track");
        Ok(())
    }

    fn track_with_properties(&self, name: &str, properties: &Attributes) -> Result<()> {
        info!(name, properties = properties.len(), "track");
        Ok(())
    }

    fn screen(&self, name: &str) -> Result<()> {
        info!(name, "screen");
        Ok(())
    }

    fn screen_with_properties(&self, name: &str, properties: &Attributes) -> Result<()> {
        info!(name, properties = properties.len(), "screen");
        Ok(())
    }

    fn set_device_attributes(&self, attributes: &Attributes) -> Result<()> {
        info!(attributes = attributes.len(), "set device attributes");
        Ok(())
    }

    fn set_profile_attributes(&self, attributes: &Attributes) -> Result<()> {
        info!(attributes = attributes.len(), "set profile attributes");
        Ok(())
    }
}

impl PushMessaging for LogClient {
    fn initialize(&self, auto_track: bool) -> Result<()> {
        info!(auto_track, "push messaging initialized");
        Ok(())
    }

    fn register_device_token(&self, token: &str) -> Result<()> {
        info!(token_len = token.len(), "device token registered");
        Ok(())
    }

    fn track_metric(&self, delivery_id: &str, event: &str, _device_token: &str) -> Result<()> {
        info!(delivery_id, event, "push metric");
        Ok(())
    }

    fn handle_notification_trigger(&self, data: &HashMap<String, String>) -> Result<bool> {
        info!(fields = data.len(), handled = self.handled, "push notification");
        Ok(self.handled)
    }
}

impl InAppMessaging for LogClient {
    fn initialize(&self) -> Result<()> {
        info!("in-app messaging initialized");
        Ok(())
    }
}

const UNAVAILABLE: &str = "engagement SDK not available on this platform";

/// SDK for platforms without a native implementation; every call fails.
#[derive(Clone, Copy, Default)]
pub struct UnavailableSdk;

impl EngagementSdk for UnavailableSdk {
    fn configure(&self, _config: &SdkConfig) -> Result<Arc<dyn EngagementClient>> {
        Err(anyhow!(UNAVAILABLE))
    }

    fn push(&self) -> Arc<dyn PushMessaging> {
        Arc::new(UnavailableSdk)
    }

    fn in_app(&self) -> Arc<dyn InAppMessaging> {
        Arc::new(UnavailableSdk)
    }
}

impl PushMessaging for UnavailableSdk {
    fn initialize(&self, _auto_track: bool) -> Result<()> {
        Err(anyhow!(UNAVAILABLE))
    }

    fn register_device_token(&self, _token: &str) -> Result<()> {
        Err(anyhow!(UNAVAILABLE))
    }

    fn track_metric(&self, _delivery_id: &str, _event: &str, _device_token: &str) -> Result<()> {
        Err(anyhow!(UNAVAILABLE))
    }

    fn handle_notification_trigger(&self, _data: &HashMap<String, String>) -> Result<bool> {
        Err(anyhow!(UNAVAILABLE))
    }
}

impl InAppMessaging for UnavailableSdk {
    fn initialize(&self) -> Result<()> {
        Err(anyhow!(UNAVAILABLE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sdk_captures_calls() {
        let sdk = RecordingSdk::new();
        let client = sdk.configure(&SdkConfig::new("site", "key")).unwrap();
        client.track("Opened").unwrap();
        sdk.push().register_device_token("tok").unwrap();

        assert_eq!(sdk.count(), 3);
        assert_eq!(sdk.count_named("track"), 1);
        assert_eq!(
            sdk.last(),
            Some(SdkCall::RegisterDeviceToken("tok".into()))
        );
        sdk.clear();
        assert_eq!(sdk.count(), 0);
    }

    #[test]
    fn test_failure_injection() {
        let sdk = RecordingSdk::new();
        sdk.fail_on("track_metric", "metric rejected");
        let err = sdk.push().track_metric("d-1", "opened", "tok").unwrap_err();
        assert_eq!(err.to_string(), "metric rejected");
        // The attempt is still recorded.
        assert_eq!(sdk.count_named("track_metric"), 1);
    }

    #[test]
    fn test_handled_flag() {
        let sdk = RecordingSdk::new();
        let data = HashMap::from([("title".to_string(), "Hi".to_string())]);
        assert!(!sdk.push().handle_notification_trigger(&data).unwrap());
        sdk.set_handled(true);
        assert!(sdk.push().handle_notification_trigger(&data).unwrap());
    }

    #[test]
    fn test_log_sdk_succeeds() {
        let sdk = LogSdk::new(true);
        let client = sdk.configure(&SdkConfig::new("site", "key")).unwrap();
        client.clear_identify().unwrap();
        sdk.in_app().initialize().unwrap();
        assert!(sdk
            .push()
            .handle_notification_trigger(&HashMap::new())
            .unwrap());
    }

    #[test]
    fn test_unavailable_sdk_rejects() {
        let sdk = UnavailableSdk;
        let err = sdk.configure(&SdkConfig::new("site", "key")).err().unwrap();
        assert_eq!(err.to_string(), UNAVAILABLE);
        assert!(sdk.push().register_device_token("tok").is_err());
        assert!(sdk.in_app().initialize().is_err());
    }
}
