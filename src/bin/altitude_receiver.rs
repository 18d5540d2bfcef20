use altitude_telemetry::receiver::receiver_config::{ReceiverConfig, DEFAULT_PORT};
use altitude_telemetry::receiver::telemetry_receiver::TelemetryReceiver;
use clap::Parser;
use clap_derive::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};

/// Accepts a single altitude stream, reports jumps between consecutive samples and optionally
///  logs the received samples to a CSV file.
#[derive(Parser)]
struct Args {
    #[clap(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// CSV file for received samples, '-' for none
    #[clap(default_value = "-")]
    csv_file: String,

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

    let mut config = ReceiverConfig::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port)));
    if args.csv_file != "-" {
        config.sink_path = Some(PathBuf::from(args.csv_file));
    }

    let receiver = TelemetryReceiver::bind(Arc::new(config)).await?;

    let (cancel_sender, cancel) = broadcast::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("received shutdown signal");
        cancel_sender.send(()).ok();
    });

    receiver.run(cancel).await?;
    Ok(())
}

/// completes on SIGINT, or SIGTERM where available
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!("cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for Ctrl-C, running until the stream ends: {}", e);
        std::future::pending::<()>().await;
    }
}
