//! Proxy event records.
//!
//! # Responsibilities
//! - Describe notable requests (non-200 upstream responses, pipeline errors)
//! - Hand them to a pluggable sink
//!
//! # Design Decisions
//! - Sinks are fallible, but the engine only logs their failures; a broken
//!   sink never fails a request
//! - Field names match the JSON shape downstream log tooling expects
//!   (`clientIP`, `userAgent`, `statusText`)

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// One notable request, recorded after the outcome is known.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    pub timestamp: DateTime<Utc>,
    /// Upstream URL, or the inbound URI when no target could be resolved.
    pub url: String,
    #[serde(flatten)]
    pub outcome: EventOutcome,
    pub method: String,
    #[serde(rename = "clientIP")]
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// What happened to the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventOutcome {
    /// The target answered with a non-200 status.
    #[serde(rename_all = "camelCase")]
    Status { status: u16, status_text: String },
    /// The pipeline failed before a response was produced.
    Error { error: String },
}

/// Failure inside an event sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("event sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for [`ProxyEvent`]s.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &ProxyEvent) -> Result<(), SinkError>;
}

/// Writes events as single-line JSON into the tracing log stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &ProxyEvent) -> Result<(), SinkError> {
        let json = serde_json::to_string(event)?;
        match event.outcome {
            EventOutcome::Error { .. } => tracing::error!(event = %json, "Proxy error"),
            EventOutcome::Status { .. } => tracing::info!(event = %json, "Non-200 upstream response"),
        }
        Ok(())
    }
}
