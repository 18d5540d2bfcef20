//! Sending end of the altitude stream: generates samples and writes them to a single TCP
//!  connection, one record per line, paced at a fixed interval.

pub mod streamer_config;
pub mod generator;

use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::sink::{open_csv_sink, SampleSink};
use crate::streamer::generator::AltitudeGenerator;
use crate::streamer::streamer_config::StreamerConfig;
use crate::util::random::{Random, RngRandom};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    pub intended: u32,
    pub sent: u32,
}

impl StreamReport {
    pub fn stopped_early(&self) -> bool {
        self.sent < self.intended
    }
}

/// Connects to the receiver and sends the configured number of samples.
///
/// Failure to resolve or connect is an error. A failing write after that is not: streaming stops,
///  and the report shows how many samples made it out.
pub async fn run_streamer(config: Arc<StreamerConfig>) -> anyhow::Result<StreamReport> {
    let mut stream = TcpStream::connect(config.target_addr.as_str()).await
        .with_context(|| format!("connecting to {}", config.target_addr))?;
    info!("connected to {}", stream.peer_addr()?);

    let sink = match &config.sink_path {
        None => None,
        Some(path) => match open_csv_sink(path).await {
            Ok(sink) => Some(Box::new(sink) as Box<dyn SampleSink>),
            Err(e) => {
                warn!("continuing without sample log: {:#}", e);
                None
            }
        },
    };

    let generator = AltitudeGenerator::<RngRandom>::new(&config);
    let report = stream_samples(&mut stream, generator, config.send_interval, sink).await;

    info!("done sending {} of {} samples, closing connection", report.sent, report.intended);
    if let Err(e) = stream.shutdown().await {
        debug!("error shutting down connection: {}", e);
    }
    Ok(report)
}

/// Writes each generated sample as a complete record before moving on to the next one, pausing
///  `send_interval` between samples (but not after the last). A sample is passed to the sink only
///  after it was written successfully.
pub async fn stream_samples<W: AsyncWrite + Unpin, R: Random>(
    writer: &mut W,
    generator: AltitudeGenerator<R>,
    send_interval: Duration,
    mut sink: Option<Box<dyn SampleSink>>,
) -> StreamReport {
    let mut report = StreamReport {
        intended: generator.num_samples(),
        sent: 0,
    };

    for sample in generator {
        let record = sample.to_record();
        if let Err(e) = write_record(writer, record.as_bytes()).await {
            error!(error = ?e, "error sending sample {}, stopping", sample.index);
            break;
        }
        report.sent += 1;

        let sink_error = match sink.as_mut() {
            Some(s) => s.on_sample(sample).await.err(),
            None => None,
        };
        if let Some(e) = sink_error {
            warn!("error writing to sample log, continuing without it: {:#}", e);
            sink = None;
        }

        info!("sent sample {:2}: {:.3} ft", sample.index, sample.altitude_ft);

        if report.sent < report.intended {
            sleep(send_interval).await;
        }
    }

    report
}

async fn write_record<W: AsyncWrite + Unpin>(writer: &mut W, record: &[u8]) -> std::io::Result<()> {
    writer.write_all(record).await?;
    writer.flush().await
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::anomaly_detector::EndReason;
    use crate::receiver::receiver_config::ReceiverConfig;
    use crate::receiver::telemetry_receiver::TelemetryReceiver;
    use crate::sink::MockSampleSink;
    use crate::telemetry::parser::parse_altitude;
    use crate::telemetry::sample::Sample;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::sync::broadcast;
    use tokio::time::Instant;

    fn config(duration_secs: u32, inject_at: Option<u32>) -> StreamerConfig {
        let mut config = StreamerConfig::new("127.0.0.1:0");
        config.duration_secs = duration_secs;
        config.inject_at = inject_at;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_are_paced() {
        let generator = AltitudeGenerator::<RngRandom>::new(&config(5, Some(3)));
        let mut out = Vec::new();

        let start = Instant::now();
        let report = stream_samples(&mut out, generator, Duration::from_secs(1), None).await;

        // no pause after the last sample
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_millis(4100), "{:?}", elapsed);
        assert_eq!(report, StreamReport { intended: 5, sent: 5 });
        assert!(!report.stopped_early());

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(text.ends_with('\n'));

        let altitudes: Vec<f64> = lines.iter()
            .map(|l| parse_altitude(l).unwrap())
            .collect();
        for (i, line) in lines.iter().enumerate() {
            assert!(line.starts_with(&format!("{},", i + 1)));
            let (_, altitude) = line.split_once(',').unwrap();
            assert_eq!(altitude.split_once('.').unwrap().1.len(), 3);
        }
        assert!((altitudes[2] - altitudes[1] - 150.0).abs() < 0.0015);
    }

    /// accepts a fixed number of writes, then reports that nothing more can be written
    struct ClosingWriter {
        remaining_writes: usize,
        written: Vec<u8>,
    }
    impl AsyncWrite for ClosingWriter {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
            if self.remaining_writes == 0 {
                return Poll::Ready(Ok(0));
            }
            self.remaining_writes -= 1;
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_stops_early() {
        let generator = AltitudeGenerator::<RngRandom>::new(&config(10, None));
        let mut writer = ClosingWriter { remaining_writes: 3, written: Vec::new() };

        let mut sink = MockSampleSink::new();
        sink.expect_on_sample()
            .times(3)
            .returning(|_| Ok(()));

        let report = stream_samples(&mut writer, generator, Duration::from_secs(1), Some(Box::new(sink))).await;

        assert_eq!(report, StreamReport { intended: 10, sent: 3 });
        assert!(report.stopped_early());
        assert_eq!(String::from_utf8(writer.written).unwrap().lines().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_sees_sent_samples() {
        let mut sink = MockSampleSink::new();
        for index in 1..=3u64 {
            sink.expect_on_sample()
                .withf(move |s: &Sample| s.index == index)
                .times(1)
                .returning(|_| Ok(()));
        }

        let generator = AltitudeGenerator::<RngRandom>::new(&config(3, None));
        let mut out = Vec::new();
        let report = stream_samples(&mut out, generator, Duration::from_secs(1), Some(Box::new(sink))).await;
        assert_eq!(report.sent, 3);
    }

    #[tokio::test]
    async fn test_connect_failure_names_target() {
        // bind and drop a listener to get a port that is very likely closed
        let addr = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

        let mut config = config(1, None);
        config.target_addr = addr.to_string();

        let err = run_streamer(Arc::new(config)).await.err().unwrap();
        assert!(format!("{:#}", err).contains(&format!("connecting to {}", addr)));
    }

    #[tokio::test]
    async fn test_streams_to_receiver() {
        let receiver = TelemetryReceiver::bind(Arc::new(ReceiverConfig::new("127.0.0.1:0".parse().unwrap()))).await.unwrap();
        let addr = receiver.local_addr().unwrap();
        let (_cancel_sender, cancel) = broadcast::channel(1);
        let receiver = tokio::spawn(receiver.run(cancel));

        let mut config = config(4, Some(2));
        config.target_addr = addr.to_string();
        config.send_interval = Duration::from_millis(5);

        let report = run_streamer(Arc::new(config)).await.unwrap();
        assert_eq!(report, StreamReport { intended: 4, sent: 4 });

        let summary = receiver.await.unwrap().unwrap();
        assert_eq!(summary.total_parsed, 4);
        assert_eq!(summary.anomaly_count, 1);
        assert_eq!(summary.end_reason, EndReason::PeerClosed);
    }
}
