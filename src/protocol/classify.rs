//! Line classification and normalization.
//!
//! Each logical line of a response body is mapped to exactly one
//! [`NormalizedEvent`]. Three wire sub-formats are recognized:
//!
//! ```text
//! data: data: {"choices":[{"delta":{"content":"Hi"}}]}   doubled event-stream prefix
//! data: {"response":"Hi"}                                 event-stream prefix
//! {"message":{"content":"Hi"},"done":false}               raw JSON (NDJSON)
//! Hi                                                      plain text
//! ```
//!
//! JSON payloads are inspected in a fixed order: terminal statistics, then
//! content (`choices[0].delta.content`, `message.content`, `response`), then
//! an `error` field, then a bare `done: true`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::events::{ContentDelta, FilterReason, LineSource, NormalizedEvent, ProviderError};
use super::usage::UsageStats;

/// Doubled event-stream prefix produced by proxies that re-wrap SSE lines.
pub const DOUBLE_DATA_PREFIX: &str = "data: data: ";

/// Standard event-stream prefix.
pub const DATA_PREFIX: &str = "data: ";

/// End-of-stream sentinel used by OpenAI-compatible backends.
pub const DONE_SENTINEL: &str = "[DONE]";

static BARE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("timestamp pattern is valid")
});

/// Classify one logical line.
///
/// `line` is the line as received, without its terminator. Surrounding
/// whitespace is ignored for matching but preserved in
/// [`ContentDelta::raw`].
pub fn classify_line(line: &str) -> NormalizedEvent {
    let (payload, source) = split_prefix(line);

    if source == LineSource::EventStream && payload == DONE_SENTINEL {
        return NormalizedEvent::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => classify_json(line, &value, source),
        Err(_) => classify_text(line, payload, source),
    }
}

/// Strip the event-stream prefix, if any.
///
/// The doubled prefix is checked first so that `data: data: x` yields `x`
/// rather than `data: x`. The returned payload has trailing whitespace
/// removed.
pub fn split_prefix(line: &str) -> (&str, LineSource) {
    let line = line.trim_start();

    if let Some(rest) = line.strip_prefix(DOUBLE_DATA_PREFIX) {
        return (rest.trim_end(), LineSource::EventStream);
    }
    if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
        return (rest.trim_end(), LineSource::EventStream);
    }
    // "data: " with its trailing space already stripped by the sender
    if line.trim_end() == "data:" {
        return ("", LineSource::EventStream);
    }

    (line.trim_end(), LineSource::Raw)
}

/// Check if text is a bare `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn is_bare_timestamp(text: &str) -> bool {
    BARE_TIMESTAMP.is_match(text)
}

fn classify_text(line: &str, payload: &str, source: LineSource) -> NormalizedEvent {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return NormalizedEvent::Filtered(FilterReason::Blank);
    }
    if is_bare_timestamp(trimmed) {
        return NormalizedEvent::Filtered(FilterReason::Timestamp);
    }

    NormalizedEvent::ContentDelta(ContentDelta {
        raw: line.to_string(),
        text: line.to_string(),
        source,
    })
}

fn classify_json(line: &str, value: &Value, source: LineSource) -> NormalizedEvent {
    if let Some(stats) = UsageStats::from_terminal(value) {
        return NormalizedEvent::Stats(stats);
    }

    if let Some(text) = content_field(value) {
        return NormalizedEvent::ContentDelta(ContentDelta {
            raw: line.to_string(),
            text: text.to_string(),
            source,
        });
    }

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        return NormalizedEvent::ParseError(ProviderError {
            raw: line.to_string(),
            payload: error.clone(),
        });
    }

    if value.get("done").and_then(Value::as_bool) == Some(true) {
        return NormalizedEvent::Filtered(FilterReason::EndOfTurn);
    }

    NormalizedEvent::Filtered(FilterReason::UnrecognizedShape)
}

/// First present, non-empty content field in priority order.
fn content_field(value: &Value) -> Option<&str> {
    [
        value.pointer("/choices/0/delta/content"),
        value.pointer("/message/content"),
        value.get("response"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .find(|text| !text.is_empty())
}
