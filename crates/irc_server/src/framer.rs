//! Splits a session's raw byte stream into CRLF-terminated lines (spec §4.A).
//!
//! A fresh chunk of bytes read off the socket rarely lines up with message
//! boundaries, so each session keeps the trailing partial line between
//! reads.

use crate::errors::FramerError;

#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        LineFramer::default()
    }

    /// Appends `chunk` to the buffered remainder and returns every complete
    /// line extracted so far, decoded as UTF-8. Empty segments (e.g. a bare
    /// "\r\n\r\n") are discarded silently. A decode failure drops the whole
    /// chunk's-worth of buffered data and returns `FramerError::Utf8`; the
    /// caller (dispatcher) is expected to reply 451 and close the session.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, FramerError> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        loop {
            let Some(pos) = find_crlf(&self.pending) else {
                break;
            };
            let line_bytes: Vec<u8> = self.pending.drain(..pos + 2).collect();
            let line = std::str::from_utf8(&line_bytes[..line_bytes.len() - 2])?;
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        Ok(lines)
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"NICK alice\r\nUSER alice 0 * :Alice A\r\n").unwrap();
        assert_eq!(lines, vec!["NICK alice", "USER alice 0 * :Alice A"]);
    }

    #[test]
    fn buffers_a_partial_line_across_reads() {
        let mut framer = LineFramer::new();
        let first = framer.feed(b"NICK al").unwrap();
        assert!(first.is_empty());
        let second = framer.feed(b"ice\r\n").unwrap();
        assert_eq!(second, vec!["NICK alice"]);
    }

    #[test]
    fn discards_empty_segments() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"\r\n\r\nPING x\r\n").unwrap();
        assert_eq!(lines, vec!["PING x"]);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut framer = LineFramer::new();
        let mut chunk = b"PING ".to_vec();
        chunk.push(0xff);
        chunk.extend_from_slice(b"\r\n");
        assert!(framer.feed(&chunk).is_err());
    }
}
