use bytes::BytesMut;
use tracing::{debug, trace};

/// Default upper bound for a single line, excluding the terminating newline
pub const DEFAULT_MAX_LINE_LEN: usize = 8191;

/// One newline-delimited text unit as it was received, without the newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line: String,
    /// true if the record was cut off because it reached the maximum line length rather than
    ///  being terminated by a newline
    pub forced: bool,
}

/// Reassembles an arbitrarily chunked byte stream into [Record]s.
///
/// Bytes are accumulated until a newline arrives. The buffer never holds more than
///  `max_line_len` bytes: if another byte other than a newline arrives while it is full, the
///  buffered content is emitted as a 'forced' record and that byte starts a new one. A newline
///  arriving at a full buffer ends the record normally. There is no flush at end of stream -
///  an unterminated tail is simply dropped by the owner via [LineFramer::discard_partial].
pub struct LineFramer {
    buf: BytesMut,
    max_line_len: usize,
}

impl LineFramer {
    pub fn new(max_line_len: usize) -> LineFramer {
        assert!(max_line_len > 0, "maximum line length must be positive");

        LineFramer {
            buf: BytesMut::with_capacity(max_line_len.min(1024)),
            max_line_len,
        }
    }

    /// Feeds a chunk of raw bytes, returning all records completed by it in arrival order.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<Record> {
        let mut records = Vec::new();
        let mut rest = chunk;

        while !rest.is_empty() {
            if self.buf.len() == self.max_line_len {
                if rest[0] == b'\n' {
                    records.push(self.take_record(false));
                    rest = &rest[1..];
                    continue;
                }
                debug!("line exceeds maximum length of {} bytes without a newline - forcing a record boundary", self.max_line_len);
                records.push(self.take_record(true));
            }

            let room = self.max_line_len - self.buf.len();
            let window = &rest[..rest.len().min(room)];

            match window.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.buf.extend_from_slice(&window[..pos]);
                    records.push(self.take_record(false));
                    rest = &rest[pos + 1..];
                }
                None => {
                    self.buf.extend_from_slice(window);
                    rest = &rest[window.len()..];
                }
            }
        }

        trace!(num_records = records.len(), pending = self.buf.len(), "processed chunk of {} bytes", chunk.len());
        records
    }

    /// number of bytes of an unterminated record that are currently buffered
    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drops a buffered partial record, returning the number of discarded bytes
    pub fn discard_partial(&mut self) -> usize {
        let len = self.buf.len();
        self.buf.clear();
        len
    }

    fn take_record(&mut self, forced: bool) -> Record {
        let bytes = self.buf.split();
        Record {
            line: String::from_utf8_lossy(&bytes).into_owned(),
            forced,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lines(records: &[Record]) -> Vec<&str> {
        records.iter()
            .map(|r| r.line.as_str())
            .collect()
    }

    #[test]
    fn test_split_mid_line() {
        let mut framer = LineFramer::new(DEFAULT_MAX_LINE_LEN);

        let first = framer.push_bytes(b"12,300.0\n13,30");
        assert_eq!(lines(&first), vec!["12,300.0"]);
        assert_eq!(framer.pending_len(), 5);

        let second = framer.push_bytes(b"0.5\n");
        assert_eq!(lines(&second), vec!["13,300.5"]);
        assert_eq!(framer.pending_len(), 0);

        assert!(first.iter().chain(second.iter()).all(|r| !r.forced));
    }

    #[rstest]
    #[case::single_chunk(vec!["1,1.0\n2,2.0\n3,3.0\n"])]
    #[case::byte_by_byte("1,1.0\n2,2.0\n3,3.0\n".split("").filter(|s| !s.is_empty()).collect())]
    #[case::coalesced_and_split(vec!["1,1.", "0\n2,2.0\n3", ",3.0\n"])]
    #[case::newline_alone(vec!["1,1.0", "\n2,2.0", "\n", "3,3.0\n"])]
    fn test_chunking_does_not_matter(#[case] chunks: Vec<&str>) {
        let mut framer = LineFramer::new(DEFAULT_MAX_LINE_LEN);

        let records: Vec<Record> = chunks.iter()
            .flat_map(|c| framer.push_bytes(c.as_bytes()))
            .collect();

        assert_eq!(lines(&records), vec!["1,1.0", "2,2.0", "3,3.0"]);
    }

    #[test]
    fn test_forced_flush_at_max_line_len() {
        let mut framer = LineFramer::new(8);

        let records = framer.push_bytes(b"0123456789abcdefXY\n");
        assert_eq!(lines(&records), vec!["01234567", "89abcdef", "XY"]);
        assert_eq!(records.iter().map(|r| r.forced).collect::<Vec<_>>(), vec![true, true, false]);
    }

    #[test]
    fn test_line_of_exactly_max_len_is_not_forced() {
        let mut framer = LineFramer::new(8);

        let records = framer.push_bytes(b"1234.500\n");
        assert_eq!(records, vec![Record { line: "1234.500".to_string(), forced: false }]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_newline_after_full_buffer_in_next_chunk() {
        let mut framer = LineFramer::new(8);

        assert!(framer.push_bytes(b"1234.500").is_empty());
        assert_eq!(framer.pending_len(), 8);
        assert_eq!(framer.push_bytes(b"\n1,2.0\n"), vec![
            Record { line: "1234.500".to_string(), forced: false },
            Record { line: "1,2.0".to_string(), forced: false },
        ]);
    }

    #[test]
    fn test_unterminated_garbage_is_bounded() {
        let mut framer = LineFramer::new(DEFAULT_MAX_LINE_LEN);

        let chunk = [b'x'; 1000];
        let mut num_forced = 0;
        for _ in 0..100 {
            num_forced += framer.push_bytes(&chunk).len();
            assert!(framer.pending_len() <= DEFAULT_MAX_LINE_LEN);
        }
        assert_eq!(num_forced, 100_000 / DEFAULT_MAX_LINE_LEN);
    }

    #[test]
    fn test_unterminated_tail_is_not_emitted() {
        let mut framer = LineFramer::new(DEFAULT_MAX_LINE_LEN);

        let records = framer.push_bytes(b"1,1000.0\n2,1001.5");
        assert_eq!(lines(&records), vec!["1,1000.0"]);
        assert_eq!(framer.discard_partial(), 8);
        assert_eq!(framer.pending_len(), 0);
        assert!(framer.push_bytes(b"").is_empty());
    }

    #[test]
    fn test_empty_lines_are_records() {
        let mut framer = LineFramer::new(DEFAULT_MAX_LINE_LEN);
        assert_eq!(lines(&framer.push_bytes(b"\n\n")), vec!["", ""]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut framer = LineFramer::new(DEFAULT_MAX_LINE_LEN);
        let records = framer.push_bytes(b"1,\xff12.5\n");
        assert_eq!(records[0].line, "1,\u{fffd}12.5");
    }
}
