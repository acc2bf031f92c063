//! Wire protocol: request descriptors and per-line response normalization.
//!
//! This module defines the JSON request sent to a streaming chat backend and
//! the types produced when each line of the response is classified.
//!
//! # Recognized line shapes
//!
//! | Shape | Result |
//! |-------|--------|
//! | `data: [DONE]` | [`NormalizedEvent::Done`] |
//! | `{"choices":[{"delta":{"content":..}}]}` | [`NormalizedEvent::ContentDelta`] |
//! | `{"message":{"content":..}}` | [`NormalizedEvent::ContentDelta`] |
//! | `{"response":..}` | [`NormalizedEvent::ContentDelta`] |
//! | `{"done":true,"prompt_eval_count":..,"eval_count":..}` | [`NormalizedEvent::Stats`] |
//! | `{"error":..}` | [`NormalizedEvent::ParseError`] |
//! | non-JSON text | [`NormalizedEvent::ContentDelta`] (verbatim) |
//!
//! Both raw lines and lines carrying a `data: ` or `data: data: ` prefix are
//! accepted.
//!
//! # Example
//!
//! ```
//! use chatstream::protocol::{classify_line, NormalizedEvent};
//!
//! let event = classify_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#);
//! assert_eq!(event.text(), Some("Hi"));
//! assert_eq!(classify_line("data: [DONE]"), NormalizedEvent::Done);
//! ```

mod classify;
mod events;
mod request;
mod usage;

pub use classify::{
    classify_line, is_bare_timestamp, split_prefix, DATA_PREFIX, DONE_SENTINEL,
    DOUBLE_DATA_PREFIX,
};
pub use events::{ContentDelta, FilterReason, LineSource, NormalizedEvent, ProviderError};
pub use request::{ChatMessage, ChatRequest, Role};
pub use usage::UsageStats;
