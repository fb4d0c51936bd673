//! Native bridge for customer-engagement calls coming from a cross-platform
//! application shell — validates each call's parameter bag, gates it on SDK
//! initialization, converts attribute payloads and forwards it to the
//! engagement SDK, settling the host call exactly once.

pub mod call;
pub mod config;
pub mod convert;
pub mod dispatcher;
pub mod lifecycle;
pub mod schema;
pub mod sdk;

pub use call::{CallResolution, JsonCall, PluginCall};
pub use config::{Region, SdkConfig};
pub use convert::ValueConverter;
pub use dispatcher::{CallOutcome, OperationDispatcher};
pub use lifecycle::{LifecycleGate, LifecycleState, SdkHandle};
pub use schema::Operation;
pub use sdk::{EngagementSdk, LogSdk, RecordingSdk, UnavailableSdk};
