//! Argus - Real-Time Activity Monitor
//!
//! A process-wide broadcaster for agent activity: workers report what they
//! are doing (one stream per conversation group), and any number of
//! dashboard connections watch it live over Server-Sent Events, with recent
//! history replayed on connect.
//!
//! # Architecture
//!
//! The system is organized into a small core plus collaborator modules:
//! - **Monitor**: event bus, bounded replay buffer, subscriber fan-out,
//!   SSE endpoint, process lifecycle
//! - **Alert**: cooldown-gated email notifications
//! - **Transcription / Tts**: speech-to-text and text-to-speech calls
//!   made on behalf of the host agent
//!
//! # Example
//!
//! ```ignore
//! use argus_core::monitor::{EventKind, Monitor, MonitorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut monitor = Monitor::new(MonitorConfig::default());
//!     monitor.start().await?;
//!
//!     // hand the bus to producers
//!     let bus = monitor.bus();
//!     bus.emit("family-chat", EventKind::Agent, "text", "drafting a reply");
//!
//!     // ... on shutdown
//!     monitor.stop().await;
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod config;
pub mod error;
pub mod monitor;
pub mod transcription;
pub mod tts;

// Re-export commonly used types
pub use alert::AlertSender;
pub use error::{ArgusError, Result};
pub use monitor::{ActivityEvent, EventBus, EventKind, Monitor, MonitorConfig, Subscription};
pub use transcription::Transcriber;
pub use tts::Synthesizer;
