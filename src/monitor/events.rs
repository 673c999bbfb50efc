//! Activity event types and their wire form
//!
//! Every unit of reported activity is an [`ActivityEvent`]: who (group),
//! what kind (coarse `type` plus fine-grained `subtype`), and a
//! human-readable summary, stamped with a display timestamp at creation.
//! Events are serialized to a single JSON line before they reach the replay
//! buffer, so replaying history to a late observer is a byte-identical
//! retransmission of what live observers saw.

use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Coarse event category: who produced the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Activity from an agent working a conversation group
    Agent,
    /// Activity from the host process itself
    Server,
}

/// One unit of reported activity.
///
/// `subtype` is an open set (thinking, text, tool_use, tool_result, error,
/// spawn, output, done, processing, ...) — the monitor transports it without
/// interpreting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Wall-clock time formatted for display (`HH:MM:SS`, local)
    pub time: String,
    /// Conversation/channel identifier; empty for system-level events
    pub group: String,
    /// Coarse category
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Fine-grained kind
    pub subtype: String,
    /// Human-readable, possibly-truncated body
    pub summary: String,
}

/// Serialized control frame marking the end of backfill for a new observer.
pub const CONNECTED_FRAME: &str = r#"{"type":"connected"}"#;

impl ActivityEvent {
    /// Create an event stamped with the current local time.
    pub fn new(
        group: impl Into<String>,
        kind: EventKind,
        subtype: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            time: Local::now().format("%H:%M:%S").to_string(),
            group: group.into(),
            kind,
            subtype: subtype.into(),
            summary: summary.into(),
        }
    }

    /// Create an agent-activity event.
    pub fn agent(
        group: impl Into<String>,
        subtype: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self::new(group, EventKind::Agent, subtype, summary)
    }

    /// Create a host-process event.
    pub fn server(
        group: impl Into<String>,
        subtype: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self::new(group, EventKind::Server, subtype, summary)
    }

    /// Serialize to the one-line wire form stored in the replay buffer.
    ///
    /// Serialization of this plain struct cannot realistically fail; if it
    /// ever does, the event degrades to an empty object rather than
    /// surfacing an error to the producer.
    pub fn to_line(&self) -> Arc<str> {
        Arc::from(serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string()))
    }
}

/// The synthetic `connected` control frame, in wire form.
pub fn connected_frame() -> Arc<str> {
    Arc::from(CONNECTED_FRAME)
}
