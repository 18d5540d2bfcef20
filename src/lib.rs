pub mod telemetry;
pub mod streamer;
pub mod receiver;
pub mod sink;
pub mod util;
