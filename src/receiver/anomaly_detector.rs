use std::fmt::{Display, Formatter};

pub const DEFAULT_ANOMALY_THRESHOLD_FT: f64 = 100.0;

/// A jump between two consecutively accepted samples that exceeded the threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anomaly {
    /// receipt index of the sample that caused the jump
    pub index: u64,
    pub delta_ft: f64,
    pub previous_ft: f64,
    pub current_ft: f64,
}

/// Running aggregate of a single connection. It compares each accepted altitude against the
///  previous one only - there is no smoothing, and an anomalous value becomes the baseline for
///  the next comparison (a spike is treated as a sustained step).
#[derive(Debug)]
pub struct StreamState {
    threshold_ft: f64,
    previous_altitude: Option<f64>,
    total_parsed: u64,
    anomaly_count: u64,
}

impl StreamState {
    pub fn new(threshold_ft: f64) -> StreamState {
        StreamState {
            threshold_ft,
            previous_altitude: None,
            total_parsed: 0,
            anomaly_count: 0,
        }
    }

    /// Registers a successfully parsed altitude, returning the sample's receipt index and an
    ///  anomaly if the jump from the previous altitude exceeds the threshold.
    pub fn on_altitude(&mut self, altitude_ft: f64) -> (u64, Option<Anomaly>) {
        self.total_parsed += 1;

        let anomaly = match self.previous_altitude {
            None => None,
            Some(previous_ft) => {
                let delta_ft = (altitude_ft - previous_ft).abs();
                if delta_ft > self.threshold_ft {
                    self.anomaly_count += 1;
                    Some(Anomaly {
                        index: self.total_parsed,
                        delta_ft,
                        previous_ft,
                        current_ft: altitude_ft,
                    })
                }
                else {
                    None
                }
            }
        };

        self.previous_altitude = Some(altitude_ft);
        (self.total_parsed, anomaly)
    }

    #[cfg(test)]
    pub(crate) fn previous_altitude(&self) -> Option<f64> {
        self.previous_altitude
    }

    pub fn summary(&self, end_reason: EndReason) -> StreamSummary {
        StreamSummary {
            total_parsed: self.total_parsed,
            anomaly_count: self.anomaly_count,
            end_reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    PeerClosed,
    ReadError,
    ShutdownRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub total_parsed: u64,
    pub anomaly_count: u64,
    pub end_reason: EndReason,
}

impl Display for StreamSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "total samples received: {}, anomalies detected: {}, end of stream: {:?}",
               self.total_parsed, self.anomaly_count, self.end_reason)
    }
}
