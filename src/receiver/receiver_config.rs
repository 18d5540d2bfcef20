use std::net::SocketAddr;
use std::path::PathBuf;

use crate::receiver::anomaly_detector::DEFAULT_ANOMALY_THRESHOLD_FT;
use crate::telemetry::line_framer::DEFAULT_MAX_LINE_LEN;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub listen_addr: SocketAddr,
    /// CSV log of accepted samples, `None` to run without persistence
    pub sink_path: Option<PathBuf>,

    /// size of the buffer for a single read from the connection
    pub read_buf_size: usize,
    /// longest line that is buffered before a record boundary is forced
    pub max_line_len: usize,

    /// jumps between consecutive samples larger than this are reported as anomalies
    pub anomaly_threshold_ft: f64,
}

impl ReceiverConfig {
    pub fn new(listen_addr: SocketAddr) -> ReceiverConfig {
        ReceiverConfig {
            listen_addr,
            sink_path: None,
            read_buf_size: 1024,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            anomaly_threshold_ft: DEFAULT_ANOMALY_THRESHOLD_FT,
        }
    }
}
