//! Per-line normalization results.

use serde_json::Value;

use super::usage::UsageStats;

/// Where a line's payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    /// The payload followed a `data: ` (or doubled `data: data: `) prefix.
    EventStream,
    /// The whole line was the payload.
    Raw,
}

/// A piece of generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDelta {
    /// The line exactly as received, without its line terminator.
    pub raw: String,
    /// The extracted content. Equal to `raw` for plain-text lines.
    pub text: String,
    /// Wire sub-format of the line.
    pub source: LineSource,
}

/// An `error` object reported by the provider inside the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    /// The line exactly as received.
    pub raw: String,
    /// The value of the `error` field.
    pub payload: Value,
}

impl ProviderError {
    /// Human-readable message.
    ///
    /// Uses the payload itself when it is a string, `payload.message` when it
    /// is an object carrying one, and the JSON text otherwise.
    pub fn message(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }
}

/// Why a line produced no consumer-visible event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// Payload was empty after trimming.
    Blank,
    /// Payload was a bare `YYYY-MM-DD HH:MM:SS` timestamp.
    Timestamp,
    /// `done: true` without statistics.
    EndOfTurn,
    /// Valid JSON without any recognized field.
    UnrecognizedShape,
    /// Statistics arrived after the session already captured some.
    DuplicateStats,
}

/// The single semantic outcome of one logical line.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    /// Content to forward to the consumer.
    ContentDelta(ContentDelta),
    /// The `[DONE]` sentinel on an event-stream line.
    Done,
    /// Terminal usage statistics.
    Stats(UsageStats),
    /// Nothing actionable.
    Filtered(FilterReason),
    /// The provider reported an error; the stream continues.
    ParseError(ProviderError),
}

impl NormalizedEvent {
    /// Get the content text if this is a content delta.
    pub fn text(&self) -> Option<&str> {
        match self {
            NormalizedEvent::ContentDelta(delta) => Some(&delta.text),
            _ => None,
        }
    }

    /// Check if this event is visible to the consumer as a message or error.
    pub fn is_forwarded(&self) -> bool {
        matches!(
            self,
            NormalizedEvent::ContentDelta(_) | NormalizedEvent::ParseError(_)
        )
    }
}
