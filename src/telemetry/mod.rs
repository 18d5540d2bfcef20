//! The line-oriented wire format shared by streamer and receiver: one sample per line,
//!  `<index>,<altitude>` or just `<altitude>`, terminated by `\n`.

pub mod sample;
pub mod line_framer;
pub mod parser;
