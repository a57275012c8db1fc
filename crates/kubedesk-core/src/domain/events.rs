//! Events published on the side-effect bus.
//!
//! Every event has a `category:action` name and a JSON payload.  Hosts
//! subscribe to these to drive telemetry and the "what's new" banner; the
//! store itself only publishes.

use serde_json::{json, Value};

/// An event emitted by the preferences store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The user opted in to telemetry.
    TelemetryEnabled,
    /// The user opted out of telemetry.
    TelemetryDisabled,
    /// The user acknowledged the release notes for `version`.
    WhatsNewSeen { version: String },
}

impl AppEvent {
    /// Returns the telemetry event matching the new flag value.
    pub fn telemetry(enabled: bool) -> Self {
        if enabled {
            Self::TelemetryEnabled
        } else {
            Self::TelemetryDisabled
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::TelemetryEnabled | Self::TelemetryDisabled => "telemetry",
            Self::WhatsNewSeen { .. } => "app",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::TelemetryEnabled => "enabled",
            Self::TelemetryDisabled => "disabled",
            Self::WhatsNewSeen { .. } => "whats-new-seen",
        }
    }

    /// Event name in `category:action` form, e.g. `telemetry:enabled`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.category(), self.action())
    }

    /// Structured payload delivered alongside the name.
    pub fn payload(&self) -> Value {
        let params = match self {
            Self::WhatsNewSeen { version } => json!({ "version": version }),
            _ => json!({}),
        };
        json!({
            "category": self.category(),
            "action": self.action(),
            "params": params,
        })
    }
}
