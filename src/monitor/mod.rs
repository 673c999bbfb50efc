//! Real-time activity monitor
//!
//! Provides:
//! - An in-process event bus with a bounded replay buffer
//! - Multi-subscriber fan-out with per-connection channels
//! - A Server-Sent Events endpoint (backfill, live events, keep-alives)
//! - Process lifecycle: bind on start, coordinated teardown on stop

pub mod buffer;
pub mod bus;
pub mod events;
pub mod registry;
pub mod server;

pub use buffer::ReplayBuffer;
pub use bus::{EventBus, Subscription};
pub use events::{connected_frame, ActivityEvent, EventKind, CONNECTED_FRAME};
pub use registry::{SubscriberId, SubscriberRegistry};
pub use server::{Monitor, MonitorConfig};
