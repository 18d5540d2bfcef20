use std::fmt::{Display, Formatter};

/// A single altitude reading. The index is 1-based and assigned by whoever produces the sample:
///  the generator numbers what it sends, the receiver numbers what it accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub index: u64,
    pub altitude_ft: f64,
}

impl Sample {
    pub fn new(index: u64, altitude_ft: f64) -> Sample {
        Sample { index, altitude_ft }
    }

    /// The wire representation, including the terminating newline
    pub fn to_record(&self) -> String {
        format!("{}\n", self)
    }
}

/// `<index>,<altitude with 3 decimals>` - the format used both on the wire and in CSV logs
impl Display for Sample {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{:.3}", self.index, self.altitude_ft)
    }
}
