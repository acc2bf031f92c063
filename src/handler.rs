//! Consumer callbacks for a streaming session.

use crate::protocol::{ContentDelta, ProviderError, UsageStats};
use crate::Error;

/// Receives the normalized events of one session.
///
/// Callbacks arrive in the order their source lines appeared in the stream.
/// [`on_finish`](Self::on_finish) is called exactly once per session,
/// whichever way it ended.
///
/// # Implementation Notes
///
/// - Callbacks run synchronously inside the read loop; a slow callback
///   delays that session's processing (and only that session's). Defer
///   heavy work.
/// - Methods have default empty implementations for selective observation.
///
/// # Example
///
/// ```ignore
/// use chatstream::{StreamHandler, UsageStats};
/// use chatstream::protocol::ContentDelta;
///
/// struct Printer;
///
/// impl StreamHandler for Printer {
///     fn on_message(&self, delta: &ContentDelta) {
///         print!("{}", delta.text);
///     }
///
///     fn on_finish(&self, stats: Option<&UsageStats>) {
///         if let Some(stats) = stats {
///             println!("\n[{} tokens]", stats.total_tokens);
///         }
///     }
/// }
/// ```
pub trait StreamHandler: Send + Sync {
    /// Called for every content delta.
    fn on_message(&self, delta: &ContentDelta) {
        let _ = delta;
    }

    /// Called when the provider reports an error inside the stream.
    ///
    /// The session keeps running.
    fn on_parse_error(&self, error: &ProviderError) {
        let _ = error;
    }

    /// Called when an event-stream `[DONE]` sentinel is seen.
    fn on_done(&self) {}

    /// Called when the transport fails. The session ends right after.
    fn on_fatal_error(&self, error: &Error) {
        let _ = error;
    }

    /// Called exactly once when the session ends, with the terminal
    /// statistics if the stream carried any.
    fn on_finish(&self, stats: Option<&UsageStats>) {
        let _ = stats;
    }
}

impl<H: StreamHandler + ?Sized> StreamHandler for std::sync::Arc<H> {
    fn on_message(&self, delta: &ContentDelta) {
        (**self).on_message(delta)
    }

    fn on_parse_error(&self, error: &ProviderError) {
        (**self).on_parse_error(error)
    }

    fn on_done(&self) {
        (**self).on_done()
    }

    fn on_fatal_error(&self, error: &Error) {
        (**self).on_fatal_error(error)
    }

    fn on_finish(&self, stats: Option<&UsageStats>) {
        (**self).on_finish(stats)
    }
}

/// Handler that logs every callback using tracing.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use chatstream::{LoggingHandler, LogLevel};
///
/// let handle = client.open_stream(&request, token, Arc::new(LoggingHandler::with_level(LogLevel::Info)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggingHandler {
    level: LogLevel,
}

/// Log level for LoggingHandler.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at trace level.
    Trace,
    /// Log at debug level (default).
    #[default]
    Debug,
    /// Log at info level.
    Info,
}

impl LoggingHandler {
    /// Create a new logging handler with debug level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging handler with a specific level.
    pub fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
        }
    };
}

impl StreamHandler for LoggingHandler {
    fn on_message(&self, delta: &ContentDelta) {
        let text = truncate_for_log(&delta.text);
        log_at!(self.level, source = ?delta.source, text = %text, "content");
    }

    fn on_parse_error(&self, error: &ProviderError) {
        tracing::warn!(message = %error.message(), "provider error in stream");
    }

    fn on_done(&self) {
        log_at!(self.level, "done sentinel");
    }

    fn on_fatal_error(&self, error: &Error) {
        tracing::warn!(%error, "stream failed");
    }

    fn on_finish(&self, stats: Option<&UsageStats>) {
        match stats {
            Some(stats) => log_at!(
                self.level,
                prompt_tokens = stats.prompt_tokens,
                completion_tokens = stats.completion_tokens,
                total_tokens = stats.total_tokens,
                "finished"
            ),
            None => log_at!(self.level, "finished without statistics"),
        }
    }
}

fn truncate_for_log(text: &str) -> String {
    if text.len() <= 200 {
        return text.to_string();
    }
    let mut end = 200;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &text[..end], text.len())
}
