//! Append-only persistence of samples. Sinks are optional on both sides - nothing in framing,
//!  parsing or anomaly detection depends on whether a sink is present.

use std::path::Path;
use anyhow::Context;
use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::telemetry::sample::Sample;

pub const CSV_HEADER: &str = "index,altitude\n";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SampleSink: Send {
    /// Persists a sample. When this returns successfully, the sample is handed off to the OS.
    async fn on_sample(&mut self, sample: Sample) -> anyhow::Result<()>;
}

/// Writes samples as CSV lines (`<index>,<altitude>`), flushing after every line.
pub struct CsvSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> CsvSink<W> {
    pub async fn new(mut writer: W) -> anyhow::Result<CsvSink<W>> {
        writer.write_all(CSV_HEADER.as_bytes()).await?;
        writer.flush().await?;
        Ok(CsvSink { writer })
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SampleSink for CsvSink<W> {
    async fn on_sample(&mut self, sample: Sample) -> anyhow::Result<()> {
        self.writer.write_all(format!("{}\n", sample).as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Creates (or truncates) a CSV file and writes the header
pub async fn open_csv_sink(path: &Path) -> anyhow::Result<CsvSink<File>> {
    let file = File::create(path).await
        .with_context(|| format!("creating CSV file {}", path.display()))?;
    debug!("writing samples to {}", path.display());
    CsvSink::new(file).await
        .with_context(|| format!("writing CSV header to {}", path.display()))
}
