//! Argus - Real-Time Activity Monitor
//!
//! Binary entry point: binds the monitor endpoint and serves the dashboard
//! until interrupted. Producers elsewhere in the host process publish
//! through the bus handle; this process emits its own lifecycle events so
//! an empty deployment still shows signs of life.

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use argus_core::monitor::{EventKind, Monitor, MonitorConfig};

#[derive(Parser, Debug)]
#[command(name = "argus", version, about = "Real-time activity monitor")]
struct Cli {
    /// Port for the dashboard and event stream
    #[arg(long, env = "MONITOR_PORT", default_value_t = 3000)]
    port: u16,

    /// Replay buffer capacity (events)
    #[arg(long, env = "MONITOR_BUFFER_CAPACITY", default_value_t = 500)]
    buffer_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::new(format!("argus={level},tower_http=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // logs to stderr, not stdout
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    argus_core::config::load_dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    debug!("argus v{} starting", env!("CARGO_PKG_VERSION"));

    let mut monitor = Monitor::new(MonitorConfig {
        addr: ([127, 0, 0, 1], cli.port).into(),
        buffer_capacity: cli.buffer_capacity,
        ..MonitorConfig::default()
    });
    let addr = monitor.start().await?;
    info!("dashboard available at http://{addr}");

    let bus = monitor.bus();
    bus.emit("", EventKind::Server, "processing", "monitor online");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    bus.emit("", EventKind::Server, "done", "monitor shutting down");
    monitor.stop().await;

    Ok(())
}
