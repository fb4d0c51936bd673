//! Lifecycle gate — holds the SDK handle produced by `initialize` and
//! refuses every other operation until it exists.

use std::sync::Arc;

use engage_core::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::SdkConfig;
use crate::sdk::{EngagementClient, InAppMessaging, PushMessaging};

/// The initialized SDK: configured client plus its messaging capabilities.
#[derive(Clone)]
pub struct SdkHandle {
    pub config: SdkConfig,
    pub client: Arc<dyn EngagementClient>,
    pub push: Arc<dyn PushMessaging>,
    pub in_app: Arc<dyn InAppMessaging>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
}

/// `Uninitialized -> Ready` on the first successful initialize; there is
/// no way back. The lock is held for the whole check-then-use sequence.
#[derive(Default)]
pub struct LifecycleGate {
    handle: Mutex<Option<SdkHandle>>,
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        if self.handle.lock().is_some() {
            LifecycleState::Ready
        } else {
            LifecycleState::Uninitialized
        }
    }

    /// Run `f` against the handle while holding the gate. Fails with
    /// `NotInitialized` without calling `f` when no handle exists.
    pub fn require_ready<T>(
        &self,
        f: impl FnOnce(&SdkHandle) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let guard = self.handle.lock();
        let handle = guard.as_ref().ok_or(BridgeError::NotInitialized)?;
        f(handle)
    }

    /// Build a handle with `build` and install it on success. A failed build
    /// leaves the current state untouched; a successful one replaces any
    /// previous handle.
    pub fn initialize_with(
        &self,
        build: impl FnOnce() -> BridgeResult<SdkHandle>,
    ) -> BridgeResult<()> {
        let mut guard = self.handle.lock();
        let handle = build()?;
        info!(
            site_id = %handle.config.site_id,
            region = handle.config.region.as_str(),
            "engagement sdk ready"
        );
        if guard.replace(handle).is_some() {
            warn!("sdk re-initialized, previous handle replaced");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{EngagementSdk, RecordingSdk};

    fn handle(sdk: &RecordingSdk, site_id: &str) -> BridgeResult<SdkHandle> {
        let config = SdkConfig::new(site_id, "key");
        Ok(SdkHandle {
            client: sdk.configure(&config)?,
            push: sdk.push(),
            in_app: sdk.in_app(),
            config,
        })
    }

    #[test]
    fn test_starts_uninitialized() {
        let gate = LifecycleGate::new();
        assert_eq!(gate.state(), LifecycleState::Uninitialized);

        let mut touched = false;
        let result = gate.require_ready(|_| {
            touched = true;
            Ok(())
        });
        assert!(matches!(result, Err(BridgeError::NotInitialized)));
        assert!(!touched);
    }

    #[test]
    fn test_successful_initialize_transitions_to_ready() {
        let sdk = RecordingSdk::new();
        let gate = LifecycleGate::new();
        gate.initialize_with(|| handle(&sdk, "site-a")).unwrap();
        assert_eq!(gate.state(), LifecycleState::Ready);
        let site = gate.require_ready(|h| Ok(h.config.site_id.clone())).unwrap();
        assert_eq!(site, "site-a");
    }

    #[test]
    fn test_failed_initialize_keeps_state() {
        let sdk = RecordingSdk::new();
        let gate = LifecycleGate::new();
        sdk.fail_on("configure", "bad credentials");
        assert!(gate.initialize_with(|| handle(&sdk, "site-a")).is_err());
        assert_eq!(gate.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_reinitialize_replaces_handle() {
        let sdk = RecordingSdk::new();
        let gate = LifecycleGate::new();
        gate.initialize_with(|| handle(&sdk, "site-a")).unwrap();
        gate.initialize_with(|| handle(&sdk, "site-b")).unwrap();
        let site = gate.require_ready(|h| Ok(h.config.site_id.clone())).unwrap();
        assert_eq!(site, "site-b");
    }
}
