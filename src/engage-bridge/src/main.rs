//! Engage Bridge — host-shell driver for the engagement call bridge.
//!
//! Reads one JSON call per line from stdin (`{"method": "...", "data": {...}}`),
//! settles it through the dispatcher and writes one JSON resolution per line
//! to stdout. Logs go to stderr.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use engage_core::{BackendKind, BridgeConfig};
use engage_mobile_sdk::{
    CallResolution, EngagementSdk, JsonCall, LogSdk, OperationDispatcher, PluginCall,
    UnavailableSdk,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "engage-bridge")]
#[command(about = "Dispatch customer-engagement calls from a host shell to the engagement SDK")]
#[command(version)]
struct Cli {
    /// Maximum attribute nesting depth, 0 disables the guard (overrides config)
    #[arg(long, env = "ENGAGE_BRIDGE__MAX_CONVERSION_DEPTH")]
    max_depth: Option<usize>,

    /// SDK backend (overrides config)
    #[arg(long, value_enum)]
    backend: Option<Backend>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Log,
    Unavailable,
}

impl From<Backend> for BackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Log => BackendKind::Log,
            Backend::Unavailable => BackendKind::Unavailable,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallEnvelope {
    method: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Serialize)]
struct ResolutionLine<'a> {
    call_id: String,
    method: &'a str,
    #[serde(flatten)]
    resolution: &'a CallResolution,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engage_bridge=info,engage_mobile_sdk=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = BridgeConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        BridgeConfig::default()
    });
    if let Some(depth) = cli.max_depth {
        config.max_conversion_depth = depth;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }

    info!(
        backend = ?config.backend,
        max_conversion_depth = config.max_conversion_depth,
        "Configuration loaded"
    );

    let sdk: Arc<dyn EngagementSdk> = match config.backend {
        BackendKind::Log => Arc::new(LogSdk::new(config.push_handled_default)),
        BackendKind::Unavailable => Arc::new(UnavailableSdk),
    };
    let dispatcher = OperationDispatcher::from_config(sdk, &config);

    let mut lines = BufReader::new(tokio::io::stdin()).split(b'\n');
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_segment().await? {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let mut call = parse_call(&line);
        if !call.is_settled() {
            dispatcher.handle(&mut call);
        }

        if let Some(resolution) = call.resolution() {
            let out = ResolutionLine {
                call_id: call.call_id().to_string(),
                method: call.method(),
                resolution,
            };
            let mut text = serde_json::to_string(&out)?;
            text.push('\n');
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    info!("input closed, shutting down");
    Ok(())
}

/// Decode one input line into a call. Lines that are not UTF-8 or not a
/// call envelope come back already rejected.
fn parse_call(line: &[u8]) -> JsonCall {
    let envelope = std::str::from_utf8(line)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str::<CallEnvelope>(text).map_err(|e| e.to_string()));

    match envelope {
        Ok(envelope) => JsonCall::from_value(envelope.method, envelope.data),
        Err(e) => {
            warn!(error = %e, "malformed call envelope");
            let mut call = JsonCall::from_value("unknown", Value::Null);
            call.reject(format!("Failed to parse call: {e}"));
            call
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_mobile_sdk::RecordingSdk;

    #[test]
    fn test_parse_valid_envelope() {
        let call = parse_call(br#"{"method":"track","data":{"name":"Opened"}}"#);
        assert!(!call.is_settled());
        assert_eq!(call.method(), "track");
        assert_eq!(call.get_string("name"), Some("Opened"));
    }

    #[test]
    fn test_invalid_utf8_line_is_rejected() {
        let call = parse_call(b"{\"method\":\"track\",\"data\":{\"name\":\"\xff\xfe\"}}");
        let message = call.rejection().unwrap();
        assert!(message.starts_with("Failed to parse call:"));
        assert!(message.contains("utf-8"));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let call = parse_call(b"{not json");
        assert!(call.rejection().unwrap().starts_with("Failed to parse call:"));
    }

    #[test]
    fn test_bad_line_does_not_block_later_calls() {
        let sdk = RecordingSdk::new();
        let dispatcher = OperationDispatcher::new(Arc::new(sdk.clone()));
        let input: &[&[u8]] = &[
            b"{\"method\":\"track\",\"data\":{\"name\":\"\xff\"}}",
            br#"{"method":"initialize","data":{"siteId":"a","apiKey":"b"}}"#,
        ];

        let calls: Vec<JsonCall> = input
            .iter()
            .map(|line| {
                let mut call = parse_call(line);
                if !call.is_settled() {
                    dispatcher.handle(&mut call);
                }
                call
            })
            .collect();

        assert!(calls[0].rejection().is_some());
        assert_eq!(
            calls[1].resolution(),
            Some(&CallResolution::Resolved { result: None })
        );
        assert_eq!(sdk.count_named("configure"), 1);
    }
}
