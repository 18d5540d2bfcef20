use altitude_telemetry::receiver::receiver_config::DEFAULT_PORT;
use altitude_telemetry::streamer::run_streamer;
use altitude_telemetry::streamer::streamer_config::{StreamerConfig, DEFAULT_DURATION_SECS, DEFAULT_HOST};
use clap::Parser;
use clap_derive::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tracing::{info, warn, Level};

/// Streams synthetic altitude samples to a receiver, one per second.
#[derive(Parser)]
struct Args {
    #[clap(default_value = DEFAULT_HOST)]
    host: String,

    #[clap(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// number of samples (seconds of flight) to send, 0 for the default
    #[clap(default_value_t = DEFAULT_DURATION_SECS)]
    duration: u32,

    /// CSV file for sent samples, '-' for none
    #[clap(default_value = "-")]
    csv_file: String,

    /// 1-based sample at which a +150 ft spike is injected
    inject_second: Option<u32>,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init()
        .ok();

    let mut config = StreamerConfig::new(format!("{}:{}", args.host, args.port));
    if args.duration > 0 {
        config.duration_secs = args.duration;
    }
    if args.csv_file != "-" {
        config.sink_path = Some(PathBuf::from(args.csv_file));
    }
    config.inject_at = args.inject_second;

    select! {
        result = run_streamer(Arc::new(config)) => {
            let report = result?;
            if report.stopped_early() {
                warn!("connection failed after {} of {} samples", report.sent, report.intended);
            }
        }
        r = tokio::signal::ctrl_c() => {
            r?;
            info!("interrupted, stopping");
        }
    }
    Ok(())
}
