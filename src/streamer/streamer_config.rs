use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_DURATION_SECS: u32 = 60;

#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// `host:port` of the receiver, resolved when connecting
    pub target_addr: String,
    /// number of samples to send - one per second of simulated flight
    pub duration_secs: u32,
    /// 1-based step at which a deterministic spike replaces the random walk
    pub inject_at: Option<u32>,
    /// CSV log of the samples that were sent, `None` to run without persistence
    pub sink_path: Option<PathBuf>,

    /// pause between two samples. This is pacing to simulate real time, not flow control
    pub send_interval: Duration,

    pub start_altitude_ft: f64,
    /// steady climb added in every regular step
    pub climb_per_step_ft: f64,
    /// regular steps add a turbulence value drawn uniformly from `[-turbulence_ft, turbulence_ft]`
    pub turbulence_ft: f64,
    pub spike_ft: f64,
}

impl StreamerConfig {
    pub fn new(target_addr: impl Into<String>) -> StreamerConfig {
        StreamerConfig {
            target_addr: target_addr.into(),
            duration_secs: DEFAULT_DURATION_SECS,
            inject_at: None,
            sink_path: None,
            send_interval: Duration::from_secs(1),
            start_altitude_ft: 1000.0,
            climb_per_step_ft: 2.0,
            turbulence_ft: 10.0,
            spike_ft: 150.0,
        }
    }
}
