//! Line splitting for chunked process output.

/// Splits a chunked byte stream into non-empty lines.
///
/// `\n`, `\r` and `\r\n` all terminate a line, including a `\r\n` pair that
/// arrives split across two chunks. Empty lines are dropped, so the pair
/// never produces a phantom blank entry.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Create an empty splitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                self.take_pending(&mut lines);
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        let mut lines = Vec::with_capacity(1);
        self.take_pending(&mut lines);
        lines.pop()
    }

    /// Whether bytes are buffered waiting for a terminator.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn take_pending(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        lines.push(String::from_utf8_lossy(&self.pending).into_owned());
        self.pending.clear();
    }
}

/// Split complete text into non-empty lines using the same rules as
/// [`LineSplitter`].
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    let mut splitter = LineSplitter::new();
    let mut lines = splitter.push(text.as_bytes());
    lines.extend(splitter.finish());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_terminators() {
        let lines = split_lines("a.c\nb.c\r\nc.c\rd.c");
        assert_eq!(lines, vec!["a.c", "b.c", "c.c", "d.c"]);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let lines = split_lines("\n\r\n\nfoo\n\n\r\nbar\n");
        assert_eq!(lines, vec!["foo", "bar"]);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"first\r"), vec!["first"]);
        assert!(splitter.push(b"\nsecond").is_empty());
        assert!(splitter.has_pending());
        assert_eq!(splitter.finish().as_deref(), Some("second"));
        assert!(splitter.finish().is_none());
    }

    #[test]
    fn test_line_spanning_chunks() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"/vobs/src/ma").is_empty());
        assert_eq!(splitter.push(b"in.c\n/vobs/x"), vec!["/vobs/src/main.c"]);
        assert_eq!(splitter.finish().as_deref(), Some("/vobs/x"));
    }

    #[test]
    fn test_whitespace_lines_are_kept() {
        assert_eq!(split_lines("  \n"), vec!["  "]);
    }

    #[test]
    fn test_multibyte_utf8_survives_chunking() {
        let text = "r\u{e9}sum\u{e9}.txt\n";
        let bytes = text.as_bytes();
        let mut splitter = LineSplitter::new();
        let mut lines = splitter.push(&bytes[..2]);
        lines.extend(splitter.push(&bytes[2..]));
        assert_eq!(lines, vec!["r\u{e9}sum\u{e9}.txt"]);
    }
}
