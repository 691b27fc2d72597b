//! stporchd entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use stp_sai::{SaiObjectId, StpApi};
use stporchd::daemon::{StpDaemon, StpDaemonConfig};
use stporchd::ports::PortRegistry;

/// SONiC STP hardware-state reconciliation daemon
#[derive(Parser, Debug)]
#[command(name = "stporchd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Heartbeat interval in milliseconds
    #[arg(long, default_value = "1000")]
    heartbeat_interval: u64,

    /// Switch object id to scope hardware calls to
    #[arg(long, default_value = "0")]
    switch_id: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.as_str()),
    )
    .init();

    info!("starting stporchd");
    info!("heartbeat interval: {}ms", args.heartbeat_interval);

    let hw = Arc::new(StpApi::new(SaiObjectId::from_raw_unchecked(args.switch_id)));
    let config = StpDaemonConfig {
        heartbeat_interval_ms: args.heartbeat_interval,
    };

    let (mut daemon, handles) = StpDaemon::new(config, hw, PortRegistry::new());

    // The switch-level queries are the point of no return: without the
    // default instance handle and the instance ceiling nothing can be
    // reconciled.
    if let Err(e) = daemon.init() {
        error!("STP initialization failed: {}", e);
        return ExitCode::FAILURE;
    }
    info!("STP initialization complete");

    let shutdown_handles = handles.clone();
    let shutdown_task = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("received SIGINT, shutting down");
                shutdown_handles.shutdown();
            }
            Err(e) => error!("failed to listen for ctrl-c: {}", e),
        }
    });

    daemon.run().await;
    shutdown_task.abort();

    info!("stporchd shutdown complete");
    ExitCode::SUCCESS
}
