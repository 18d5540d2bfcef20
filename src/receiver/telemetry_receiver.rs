use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::broadcast;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::receiver::anomaly_detector::{EndReason, StreamState, StreamSummary};
use crate::receiver::receiver_config::ReceiverConfig;
use crate::sink::{open_csv_sink, SampleSink};
use crate::telemetry::line_framer::{LineFramer, Record};
use crate::telemetry::parser::parse_altitude;
use crate::telemetry::sample::Sample;

/// Receiving end of the altitude stream: listens on a port, accepts exactly one connection and
///  processes it to completion.
pub struct TelemetryReceiver {
    config: Arc<ReceiverConfig>,
    listener: TcpListener,
}

impl TelemetryReceiver {
    pub async fn bind(config: Arc<ReceiverConfig>) -> anyhow::Result<TelemetryReceiver> {
        let listener = TcpListener::bind(config.listen_addr).await
            .with_context(|| format!("binding listener on {}", config.listen_addr))?;

        Ok(TelemetryReceiver {
            config,
            listener,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for a single client and processes its stream until the client closes the connection,
    ///  a read fails, or `cancel` fires. Socket and sink are released when this returns.
    pub async fn run(self, mut cancel: broadcast::Receiver<()>) -> anyhow::Result<StreamSummary> {
        info!("waiting for client connection on {}", self.local_addr()?);

        let (stream, peer_addr) = select! {
            r = self.listener.accept() => r.context("accepting connection")?,
            _ = cancel.recv() => {
                info!("shutdown requested while waiting for a client");
                return Ok(StreamState::new(self.config.anomaly_threshold_ft).summary(EndReason::ShutdownRequested));
            }
        };
        info!("client connected from {}", peer_addr);

        let sink = match &self.config.sink_path {
            None => None,
            Some(path) => match open_csv_sink(path).await {
                Ok(sink) => Some(Box::new(sink) as Box<dyn SampleSink>),
                Err(e) => {
                    warn!("continuing without sample log: {:#}", e);
                    None
                }
            },
        };

        let summary = receive_loop(stream, &self.config, sink, &mut cancel)
            .instrument(info_span!("connection", peer = %peer_addr))
            .await;

        info!("=== summary === {}", summary);
        Ok(summary)
    }
}

/// Reads records from a byte stream and runs them through parser, anomaly detection and sink.
///
/// Nothing that goes wrong with an individual record ends the loop: malformed records are logged
///  and skipped, and a failing sink is disabled for the rest of the stream. The loop ends on end of
///  stream, on a read error or when `cancel` fires (or its sender goes away), and an unterminated
///  record at that point is dropped.
pub async fn receive_loop<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &ReceiverConfig,
    mut sink: Option<Box<dyn SampleSink>>,
    cancel: &mut broadcast::Receiver<()>,
) -> StreamSummary {
    let mut state = StreamState::new(config.anomaly_threshold_ft);
    let mut framer = LineFramer::new(config.max_line_len);
    let mut buf = vec![0u8; config.read_buf_size];
    let mut num_rejected: u64 = 0;

    let end_reason = loop {
        let n = select! {
            r = reader.read(&mut buf) => {
                match r {
                    Ok(0) => {
                        info!("client disconnected (EOF)");
                        break EndReason::PeerClosed;
                    }
                    Ok(n) => n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        error!(error = ?e, "error reading from connection");
                        break EndReason::ReadError;
                    }
                }
            }
            _ = cancel.recv() => {
                info!("shutdown requested");
                break EndReason::ShutdownRequested;
            }
        };

        for record in framer.push_bytes(&buf[..n]) {
            if on_record(&record, &mut state, &mut sink).await == RecordOutcome::Rejected {
                num_rejected += 1;
            }
        }
    };

    let discarded = framer.discard_partial();
    if discarded > 0 {
        debug!("dropping {} bytes of an unterminated record", discarded);
    }
    if num_rejected > 0 {
        warn!("skipped {} malformed records", num_rejected);
    }

    state.summary(end_reason)
}

/// Whether a record made it into the stream state. Nothing else about a record's fate leaves
///  [on_record].
#[derive(Debug, Clone, Copy, PartialEq)]
enum RecordOutcome {
    Accepted(Sample),
    Rejected,
}

async fn on_record(record: &Record, state: &mut StreamState, sink: &mut Option<Box<dyn SampleSink>>) -> RecordOutcome {
    if record.forced {
        warn!("line exceeded the maximum length without a newline - treating it as a complete record");
    }

    let altitude = match parse_altitude(&record.line) {
        Ok(altitude) => altitude,
        Err(e) => {
            warn!("could not parse altitude from {:?}: {}", record.line, e);
            return RecordOutcome::Rejected;
        }
    };

    let (index, anomaly) = state.on_altitude(altitude);
    if let Some(anomaly) = anomaly {
        warn!("[ANOMALY] sample {}: jump {:.3} ft (prev={:.3} -> cur={:.3})",
            anomaly.index, anomaly.delta_ft, anomaly.previous_ft, anomaly.current_ft);
    }

    let sample = Sample::new(index, altitude);
    let sink_error = match sink.as_mut() {
        Some(s) => s.on_sample(sample).await.err(),
        None => None,
    };
    if let Some(e) = sink_error {
        warn!("error writing to sample log, continuing without it: {:#}", e);
        *sink = None;
    }

    info!("received sample {:3}: {:.3} ft", index, altitude);
    RecordOutcome::Accepted(sample)
}
