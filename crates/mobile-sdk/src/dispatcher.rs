//! Operation dispatcher — single entry point for every host call.
//!
//! Each call is validated against its schema, gated on initialization
//! (except `initialize` itself), has its attribute payloads converted and is
//! then forwarded to the SDK. Any failure along the way becomes exactly one
//! rejection of the form `"Failed to <operation>: <message>"`.

use std::sync::Arc;

use engage_core::{BridgeConfig, BridgeError, BridgeResult};
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::call::PluginCall;
use crate::config::{Region, SdkConfig};
use crate::convert::{flatten_strings, ValueConverter};
use crate::lifecycle::{LifecycleGate, LifecycleState, SdkHandle};
use crate::schema::{self, Operation, ValidatedParams};
use crate::sdk::EngagementSdk;

/// Success value of an operation: empty, or a small result record.
pub type CallOutcome = BridgeResult<Option<Value>>;

/// Handler for an operation that runs behind the lifecycle gate.
type Handler = fn(&OperationDispatcher, &ValidatedParams, &SdkHandle) -> CallOutcome;

pub struct OperationDispatcher {
    sdk: Arc<dyn EngagementSdk>,
    gate: LifecycleGate,
    converter: ValueConverter,
}

impl OperationDispatcher {
    pub fn new(sdk: Arc<dyn EngagementSdk>) -> Self {
        Self {
            sdk,
            gate: LifecycleGate::new(),
            converter: ValueConverter::default(),
        }
    }

    pub fn from_config(sdk: Arc<dyn EngagementSdk>, config: &BridgeConfig) -> Self {
        Self::new(sdk).with_converter(ValueConverter::new(config.depth_limit()))
    }

    pub fn with_converter(mut self, converter: ValueConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.gate.state()
    }

    /// Handle a host call and settle it exactly once.
    pub fn handle(&self, call: &mut dyn PluginCall) {
        let call_id = call.call_id();
        let method = call.method().to_string();
        debug!(%call_id, operation = %method, "dispatching call");

        match self.dispatch(&method, Some(call.data())) {
            Ok(result) => call.resolve(result),
            Err(e) => {
                warn!(%call_id, operation = %method, error = %e, "call rejected");
                call.reject(format!("Failed to {method}: {e}"));
            }
        }
    }

    /// Run a named operation against a raw parameter bag.
    pub fn dispatch(&self, operation: &str, params: Option<&Map<String, Value>>) -> CallOutcome {
        let operation: Operation = operation.parse()?;
        let params = schema::validate(operation, params)?;

        let gated = |handler: Handler| {
            self.gate.require_ready(|sdk| {
                handler(self, &params, sdk).inspect_err(|e| {
                    if let BridgeError::Sdk(cause) = e {
                        error!(operation = %operation, error = %cause, "sdk call failed");
                    }
                })
            })
        };

        match operation {
            Operation::Initialize => self.initialize(&params),
            Operation::Identify => gated(Self::identify),
            Operation::ClearIdentify => gated(Self::clear_identify),
            Operation::Track => gated(Self::track),
            Operation::Screen => gated(Self::screen),
            Operation::SetDeviceAttributes => gated(Self::set_device_attributes),
            Operation::SetProfileAttributes => gated(Self::set_profile_attributes),
            Operation::RegisterDeviceToken => gated(Self::register_device_token),
            Operation::TrackPushEvent => gated(Self::track_push_event),
            Operation::HandlePushNotification => gated(Self::handle_push_notification),
        }
    }

    fn initialize(&self, params: &ValidatedParams) -> CallOutcome {
        let config = SdkConfig {
            site_id: params.string("siteId")?.to_string(),
            api_key: params.string("apiKey")?.to_string(),
            region: Region::parse(params.string("region")?),
            auto_track_screen_views: params.bool("autoTrackScreens")?,
            auto_track_push_events: params.bool("autoTrackPushEvents")?,
            background_queue_min_tasks: params.u32("backgroundQueueMinTasks")?,
            background_queue_delay_seconds: params.u32("backgroundQueueDelaySeconds")?,
        };

        self.gate.initialize_with(|| {
            let client = self.sdk.configure(&config)?;
            let push = self.sdk.push();
            if config.auto_track_push_events {
                push.initialize(true)?;
            }
            let in_app = self.sdk.in_app();
            in_app.initialize()?;
            Ok(SdkHandle {
                config,
                client,
                push,
                in_app,
            })
        })?;
        Ok(None)
    }

    fn identify(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        let user_id = params.string("userId")?;
        match self.attributes(params, "attributes")? {
            Some(attributes) => sdk.client.identify_with_attributes(user_id, &attributes)?,
            None => sdk.client.identify(user_id)?,
        }
        Ok(None)
    }

    fn clear_identify(&self, _params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        sdk.client.clear_identify()?;
        Ok(None)
    }

    fn track(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        let name = params.string("name")?;
        match self.attributes(params, "properties")? {
            Some(properties) => sdk.client.track_with_properties(name, &properties)?,
            None => sdk.client.track(name)?,
        }
        Ok(None)
    }

    fn screen(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        let name = params.string("name")?;
        match self.attributes(params, "properties")? {
            Some(properties) => sdk.client.screen_with_properties(name, &properties)?,
            None => sdk.client.screen(name)?,
        }
        Ok(None)
    }

    fn set_device_attributes(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        let attributes = self
            .converter
            .convert_object(params.required_object("attributes")?)?;
        sdk.client.set_device_attributes(&attributes)?;
        Ok(None)
    }

    fn set_profile_attributes(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        let attributes = self
            .converter
            .convert_object(params.required_object("attributes")?)?;
        sdk.client.set_profile_attributes(&attributes)?;
        Ok(None)
    }

    fn register_device_token(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        sdk.push.register_device_token(params.string("token")?)?;
        Ok(None)
    }

    fn track_push_event(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        sdk.push.track_metric(
            params.string("deliveryId")?,
            params.string("event")?,
            params.string("deviceToken")?,
        )?;
        Ok(None)
    }

    fn handle_push_notification(&self, params: &ValidatedParams, sdk: &SdkHandle) -> CallOutcome {
        let data = flatten_strings(params.required_object("data")?)?;
        let handled = sdk.push.handle_notification_trigger(&data)?;
        Ok(Some(json!({ "handled": handled })))
    }

    fn attributes(
        &self,
        params: &ValidatedParams,
        field: &str,
    ) -> BridgeResult<Option<engage_core::Attributes>> {
        params
            .object(field)?
            .map(|object| self.converter.convert_object(object))
            .transpose()
    }
}
