//! Incremental UTF-8 decoding.

/// Decodes a byte stream into text one chunk at a time.
///
/// A multi-byte character split across two chunks is held back until the
/// rest of it arrives, so the concatenated output never depends on where
/// the transport cut the stream. Invalid sequences decode to U+FFFD and a
/// byte-order mark at the very start of the stream is dropped.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Trailing bytes of an incomplete character (at most 3).
    pending: Vec<u8>,
    /// Set once the first character has been decoded.
    started: bool,
}

impl Utf8Decoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        // A split BOM is held in `pending` like any other character, so it
        // always reaches this point whole.
        if !self.started && !out.is_empty() {
            self.started = true;
            if out.starts_with('\u{FEFF}') {
                out.drain(..'\u{FEFF}'.len_utf8());
            }
        }

        out
    }

    /// Flush at end of stream.
    ///
    /// An incomplete trailing sequence can no longer be completed and
    /// decodes to a single U+FFFD.
    pub fn finish(&mut self) -> String {
        self.started = true;
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Number of bytes held back for the next chunk.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
