//! HTTP server: SSE streaming endpoint and process lifecycle
//!
//! Three routes: `/` answers once with the embedded dashboard page,
//! `/events` is the persistent SSE stream (backfill, `connected` marker,
//! live events, `: keepalive` comments), `/health` reports status.
//!
//! [`Monitor`] owns the event bus and the listener. `start` binds — a bind
//! failure is the one fatal error and is returned to the caller — and
//! `stop` tears down every open observer connection before releasing the
//! listener. Both are safe to call from a signal handler path; `stop` twice
//! is a no-op.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::State,
    response::{
        sse::{Event as SseEvent, KeepAlive},
        Html, Sse,
    },
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use super::bus::EventBus;

/// Embedded dashboard page, served to plain (non-streaming) requests.
const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// How long `stop` waits for connections to drain before aborting the
/// serve task outright.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(2);

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Listen address
    pub addr: SocketAddr,
    /// Replay buffer capacity (events)
    pub buffer_capacity: usize,
    /// Keep-alive comment period for idle SSE connections
    pub keepalive: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 3000).into(),
            buffer_capacity: 500,
            keepalive: Duration::from_secs(15),
        }
    }
}

/// Shared state for the router
#[derive(Clone)]
struct AppState {
    bus: EventBus,
    keepalive: Duration,
}

/// The activity monitor: one event bus, one listener, many observers.
pub struct Monitor {
    config: MonitorConfig,
    bus: EventBus,
    shutdown_tx: broadcast::Sender<()>,
    serve_handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl Monitor {
    /// Create a monitor. Nothing is bound until [`start`](Self::start).
    pub fn new(config: MonitorConfig) -> Self {
        let bus = EventBus::new(config.buffer_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            bus,
            shutdown_tx,
            serve_handle: None,
            local_addr: None,
        }
    }

    /// Handle to the owned event bus, for injection into producers.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(dashboard_handler))
            .route("/events", get(events_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and start accepting observer connections.
    ///
    /// Returns the bound address (useful with port 0). A bind failure —
    /// port in use, permission denied — is returned to the caller; nothing
    /// else this subsystem does is fatal.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let (Some(addr), Some(_)) = (self.local_addr, self.serve_handle.as_ref()) {
            return Ok(addr);
        }

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        let addr = listener.local_addr()?;

        let state = AppState {
            bus: self.bus.clone(),
            keepalive: self.config.keepalive,
        };
        let router = Self::build_router(state);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            });
            if let Err(e) = serve.await {
                error!("monitor server error: {e}");
            }
        });

        info!("monitor listening on http://{addr}");
        self.serve_handle = Some(handle);
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Detach every observer, release the listener, and wait for the serve
    /// task to finish. Calling `stop` when already stopped is a no-op.
    pub async fn stop(&mut self) {
        let Some(mut handle) = self.serve_handle.take() else {
            return;
        };
        // stop accepting, then end every open stream (which also ends each
        // connection's keep-alive)
        let _ = self.shutdown_tx.send(());
        self.bus.close();

        match tokio::time::timeout(SHUTDOWN_DRAIN, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("monitor serve task failed during shutdown: {e}"),
            Err(_) => {
                warn!("monitor connections did not drain in time, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
        self.local_addr = None;
        info!("monitor stopped");
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(handle) = self.serve_handle.take() {
            let _ = self.shutdown_tx.send(());
            self.bus.close();
            handle.abort();
            debug!("monitor dropped while running, serve task aborted");
        }
    }
}

/// Plain page fetch: answered once, never enters the streaming path.
async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// SSE streaming endpoint.
///
/// The subscription is created atomically with respect to publish, yields
/// the buffered history, the `connected` marker, then live events; when the
/// client goes away the stream is dropped and the subscription deregisters
/// itself.
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    debug!(
        backfill = state.bus.buffered(),
        "observer connected, replaying history"
    );
    let stream = state
        .bus
        .subscribe()
        .map(|line| Ok(SseEvent::default().data(line.as_ref())));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.keepalive)
            .text("keepalive"),
    )
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    subscribers: usize,
    buffered: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscribers: state.bus.subscriber_count(),
        buffered: state.bus.buffered(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::events::EventKind;

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            addr: ([127, 0, 0, 1], 0).into(),
            buffer_capacity: 8,
            keepalive: Duration::from_secs(15),
        }
    }

    #[tokio::test]
    async fn test_start_binds_ephemeral_port() {
        let mut monitor = Monitor::new(test_config());
        let addr = monitor.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(monitor.local_addr(), Some(addr));
        monitor.stop().await;
        assert_eq!(monitor.local_addr(), None);
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal_and_surfaced() {
        let mut first = Monitor::new(test_config());
        let addr = first.start().await.unwrap();

        let mut second = Monitor::new(MonitorConfig {
            addr,
            ..test_config()
        });
        assert!(second.start().await.is_err());

        first.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut monitor = Monitor::new(test_config());
        monitor.start().await.unwrap();
        monitor.stop().await;
        monitor.stop().await;
        assert_eq!(monitor.bus().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_noop() {
        let mut monitor = Monitor::new(test_config());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_bus_survives_for_producers_after_stop() {
        let mut monitor = Monitor::new(test_config());
        let bus = monitor.bus();
        monitor.start().await.unwrap();
        monitor.stop().await;
        // emit after stop must stay total
        bus.emit("g", EventKind::Server, "done", "late event");
        assert_eq!(bus.buffered(), 1);
    }
}
