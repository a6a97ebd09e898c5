//! rcpdiag agent: serves the diagnostic endpoint for a simulated RCP.
//!
//! Listens on a Unix socket standing in for the multiplexed link and keeps
//! the endpoint open across host sessions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rcpdiag_agent::{Agent, DeviceProfile, Dispatcher, SimulatedDevice, SocketTransport};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line options.
#[derive(Parser, Debug)]
#[command(name = "rcpdiag-agent", version, about = "Diagnostic endpoint for a simulated RCP")]
struct Args {
    /// Socket path hosts connect to.
    #[arg(short, long, default_value = "/tmp/rcpdiag.sock")]
    socket: PathBuf,

    /// JSON device profile (firmware version, tone channel, ...).
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Lifecycle poll interval in milliseconds.
    #[arg(long, default_value_t = 10)]
    poll_ms: u64,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let profile = match &args.profile {
        Some(path) => DeviceProfile::load(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        None => DeviceProfile::default(),
    };
    info!(
        socket = %args.socket.display(),
        firmware_version = format_args!("0x{:08x}", profile.firmware_version),
        "starting agent"
    );

    let dispatcher = Dispatcher::new(SimulatedDevice::new(&profile), &profile);
    let mut agent = Agent::new(SocketTransport::new(&args.socket), dispatcher);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    rcpdiag_agent::serve(&mut agent, Duration::from_millis(args.poll_ms), shutdown)
        .await
        .context("agent stopped")
}
