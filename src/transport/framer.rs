//! Line re-assembly across chunk boundaries.

/// Splits decoded text into logical lines.
///
/// Text is appended to a carry-over buffer; every complete `\n`-terminated
/// line is emitted and removed from it, and the unterminated tail waits for
/// the next chunk. Lines that are blank after trimming are dropped.
#[derive(Debug, Default)]
pub struct LineFramer {
    carry: String,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text and return the lines it completed, in order.
    ///
    /// Returned lines exclude the `\n` terminator and a `\r` right before it.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.carry.push_str(text);

        let mut lines = Vec::new();
        while let Some(pos) = self.carry.find('\n') {
            let line: String = self.carry.drain(..=pos).collect();
            let line = line.strip_suffix('\n').unwrap_or(&line);
            let line = line.strip_suffix('\r').unwrap_or(line);
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Take the unterminated remainder at end of stream.
    ///
    /// The remainder is returned as-is, like any other line. Returns `None`
    /// when it is blank.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.carry);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// The text currently waiting for a newline.
    pub fn carry(&self) -> &str {
        &self.carry
    }
}
