pub mod receiver_config;
pub mod anomaly_detector;
pub mod telemetry_receiver;
