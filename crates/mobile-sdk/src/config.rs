//! SDK configuration built by the `initialize` operation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[default]
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EU")]
    Eu,
}

impl Region {
    /// Exactly `"EU"` selects the EU data center; everything else is US.
    pub fn parse(raw: &str) -> Self {
        if raw == "EU" {
            Self::Eu
        } else {
            Self::Us
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Eu => "EU",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    pub site_id: String,
    pub api_key: String,
    pub region: Region,
    pub auto_track_screen_views: bool,
    pub auto_track_push_events: bool,
    pub background_queue_min_tasks: u32,
    pub background_queue_delay_seconds: u32,
}

impl SdkConfig {
    pub fn new(site_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            api_key: api_key.into(),
            region: Region::Us,
            auto_track_screen_views: false,
            auto_track_push_events: true,
            background_queue_min_tasks: 10,
            background_queue_delay_seconds: 30,
        }
    }
}
