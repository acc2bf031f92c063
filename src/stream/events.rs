//! Events yielded by a [`ResponseStream`](super::ResponseStream).

use crate::protocol::{ContentDelta, ProviderError};
use crate::session::SessionSummary;

/// A consumer-visible event of a streaming response.
///
/// # Event Order
///
/// 1. `Content`, `ProviderError` and `Done` in the order their lines arrived
/// 2. On a transport failure, one `Err` item
/// 3. `Finished` - always last, exactly once
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use chatstream::StreamEvent;
///
/// let mut stream = client.send(&request).await?;
/// while let Some(event) = stream.next().await {
///     match event? {
///         StreamEvent::Content(delta) => print!("{}", delta.text),
///         StreamEvent::Finished(summary) => {
///             if let Some(stats) = summary.stats {
///                 println!("\n{} tokens", stats.total_tokens);
///             }
///         }
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug)]
pub enum StreamEvent {
    /// A piece of generated content.
    Content(ContentDelta),
    /// The provider reported an error; more events may follow.
    ProviderError(ProviderError),
    /// An event-stream `[DONE]` sentinel was seen.
    Done,
    /// The session reached a terminal state.
    ///
    /// For a failed session the error was already yielded as the preceding
    /// `Err` item, so `summary.error` is `None` here.
    Finished(SessionSummary),
}

impl StreamEvent {
    /// Get the content text if this is a content event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Content(delta) => Some(&delta.text),
            _ => None,
        }
    }

    /// Check if this is the final event.
    pub fn is_finished(&self) -> bool {
        matches!(self, StreamEvent::Finished(_))
    }
}
