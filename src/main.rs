//! Main entry point for the netmirror binary.
//!
//! Wires the capture/reassembly pipeline to the replay dispatcher:
//! - opens a live (or recorded) capture on the configured device and port
//! - pulls finished messages out of the listener
//! - fans each one out to the replay worker pool
//!
//! Startup failures (unknown device, capture open or filter errors, an
//! unreachable replay endpoint under fail-fast) terminate the process with
//! a diagnostic naming the failing resource.

use crate::error::AppError;
use clap::Parser;
use log::info;
use netmirror_core::config::{CaptureConfig, ReplayConfig};
use netmirror_listener::listen::Listener;
use netmirror_replay::dispatch::ReplayDispatch;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod error;

#[derive(Debug, Parser, Default)]
struct PreCli {
    /// Optional `.env` file path for loading environment variables.
    #[clap(short, long, value_name = "ENV_FILE")]
    env_file: Option<String>,
}

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Device to capture from, e.g. eth0. Must match an enumerated device
    /// exactly.
    #[clap(short, long, value_name = "DEVICE", env = "NETMIRROR_DEVICE")]
    device: String,

    /// TCP port the mirrored service listens on.
    #[clap(short, long, value_name = "PORT", env = "NETMIRROR_PORT")]
    port: u16,

    /// Replay a recorded capture file instead of a live device.
    #[clap(short = 'i', long, value_name = "INPUT_FILE", env = "NETMIRROR_INPUT_FILE")]
    input_file: Option<String>,

    /// Maximum captured frame size in bytes.
    #[clap(
        long,
        value_name = "SNAPLEN",
        env = "NETMIRROR_SNAPLEN",
        default_value = "4026"
    )]
    snaplen: i32,

    /// Inactivity window in milliseconds before an unfinished message
    /// expires.
    #[clap(
        long,
        value_name = "EXPIRY_MS",
        env = "NETMIRROR_EXPIRY_MS",
        default_value = "2000"
    )]
    expiry_ms: u64,

    /// Size threshold in bytes completing a message without a boundary
    /// packet.
    #[clap(
        long,
        value_name = "MAX_MESSAGE_SIZE",
        env = "NETMIRROR_MAX_MESSAGE_SIZE",
        default_value = "1048576"
    )]
    max_message_size: usize,

    /// Capacity of the internal packet and delivery queues.
    #[clap(
        long,
        value_name = "QUEUE_CAPACITY",
        env = "NETMIRROR_QUEUE_CAPACITY",
        default_value = "100"
    )]
    queue_capacity: usize,

    /// Replay worker socket path prefix; the pool index is appended.
    #[clap(
        short = 's',
        long,
        value_name = "SOCKET_PREFIX",
        env = "NETMIRROR_SOCKET_PREFIX",
        default_value = "/tmp/netmirror-replay.sock"
    )]
    socket_prefix: PathBuf,

    /// Number of replay workers in the pool.
    #[clap(
        short = 'w',
        long,
        value_name = "POOL_SIZE",
        env = "NETMIRROR_POOL_SIZE",
        default_value = "1"
    )]
    pool_size: usize,

    /// Copies of each message to forward.
    #[clap(
        short = 'm',
        long,
        value_name = "MULTIPLIER",
        env = "NETMIRROR_MULTIPLIER",
        default_value = "1"
    )]
    multiplier: u64,

    /// Total forwards allowed over the process lifetime.
    #[clap(
        long,
        value_name = "CEILING",
        env = "NETMIRROR_CEILING",
        default_value = "18446744073709551615"
    )]
    ceiling: u64,

    /// Accept backlog each replay worker listens with.
    #[clap(
        long,
        value_name = "BACKLOG",
        env = "NETMIRROR_BACKLOG",
        default_value = "100"
    )]
    backlog: u32,

    /// Thread budget each replay worker runs with.
    #[clap(
        long,
        value_name = "THREADS",
        env = "NETMIRROR_THREADS",
        default_value = "1"
    )]
    threads: usize,

    /// Send timeout towards replay workers, in milliseconds.
    #[clap(
        long,
        value_name = "SEND_TIMEOUT_MS",
        env = "NETMIRROR_SEND_TIMEOUT_MS",
        default_value = "5000"
    )]
    send_timeout_ms: u64,

    /// Terminate the whole pipeline when a replay endpoint is unreachable.
    #[clap(
        long,
        env = "NETMIRROR_FAIL_FAST",
        action = clap::ArgAction::SetTrue,
    )]
    fail_fast: bool,

    /// Forward expired (partial) messages instead of dropping them.
    #[clap(
        long,
        env = "NETMIRROR_FORWARD_EXPIRED",
        action = clap::ArgAction::SetTrue,
    )]
    forward_expired: bool,

    /// Optional `.env` file path for loading environment variables.
    #[clap(short, long, value_name = "ENV_FILE")]
    env_file: Option<String>,

    /// Optional log level.
    #[clap(
        short = 'l',
        long,
        value_name = "LOG_LEVEL",
        env = "NETMIRROR_LOG_LEVEL",
        default_value = "info"
    )]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let pre = PreCli::try_parse().unwrap_or_default();

    if let Some(env_file) = pre.env_file {
        dotenvy::from_filename(env_file).expect("failed to load .env file");
    } else {
        dotenvy::dotenv().ok();
    }

    let cli = Cli::parse();

    let env = EnvFilter::new(format!(
        "netmirror={0},netmirror_core={0},netmirror_listener={0},netmirror_replay={0},info",
        cli.log_level
    ));
    let timer = tracing_subscriber::fmt::time::LocalTime::rfc_3339();
    tracing_subscriber::fmt()
        .with_timer(timer)
        .with_target(true)
        .with_env_filter(env)
        .init();

    let capture_config = CaptureConfig {
        device: cli.device.clone(),
        port: cli.port,
        snaplen: cli.snaplen,
        expiry: Duration::from_millis(cli.expiry_ms),
        max_message_size: cli.max_message_size,
        queue_capacity: cli.queue_capacity,
    };

    let replay_config = ReplayConfig {
        socket_prefix: cli.socket_prefix.clone(),
        pool_size: cli.pool_size,
        multiplier: cli.multiplier,
        ceiling: cli.ceiling,
        backlog: cli.backlog,
        threads: cli.threads,
        send_timeout: Duration::from_millis(cli.send_timeout_ms),
        fail_fast: cli.fail_fast,
        forward_expired: cli.forward_expired,
    };

    let mut listener = match &cli.input_file {
        Some(path) => {
            info!("Replaying recorded capture {path}");
            Listener::from_file(path, &capture_config)?
        }
        None => Listener::start(&capture_config)?,
    };
    let mut replay = ReplayDispatch::new(&replay_config)?;

    info!("Mirroring TCP port {} on {}", cli.port, cli.device);
    info!(
        "Replay pool: {} endpoint(s) at {}<index>, backlog {}, {} thread(s) each",
        cli.pool_size,
        cli.socket_prefix.display(),
        cli.backlog,
        cli.threads
    );
    info!("Multiplier {}, packet ceiling {}", cli.multiplier, cli.ceiling);

    while let Some(message) = listener.receive().await {
        replay.forward(&message).await?;
    }

    info!(
        "Capture drained, {} message copies forwarded",
        replay.sent()
    );
    Ok(())
}
