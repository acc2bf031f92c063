//! Response stream implementation.
//!
//! This module provides [`ResponseStream`], which implements [`futures::Stream`]
//! to yield [`StreamEvent`]s from a session running on a background task.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::StreamEvent;
use crate::config::RequestId;
use crate::handler::StreamHandler;
use crate::protocol::{ContentDelta, ProviderError, UsageStats};
use crate::session::{SessionState, StreamSession};
use crate::transport::ChunkReader;
use crate::Result;

/// Forwards session callbacks into the stream's channel.
struct ChannelHandler {
    tx: mpsc::UnboundedSender<Result<StreamEvent>>,
}

impl StreamHandler for ChannelHandler {
    fn on_message(&self, delta: &ContentDelta) {
        let _ = self.tx.send(Ok(StreamEvent::Content(delta.clone())));
    }

    fn on_parse_error(&self, error: &ProviderError) {
        let _ = self.tx.send(Ok(StreamEvent::ProviderError(error.clone())));
    }

    fn on_done(&self) {
        let _ = self.tx.send(Ok(StreamEvent::Done));
    }
}

/// A stream of events from one streaming response.
///
/// The session runs on a spawned task; this type receives its events over
/// an unbounded channel, so a slow consumer never stalls the read loop.
///
/// # Cancellation
///
/// [`cancel`](Self::cancel) ends the session early; the stream still yields
/// the final `Finished` event. Dropping a `ResponseStream` will:
/// 1. Cancel the session's token
/// 2. Abort the background task
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
///
/// let mut stream = client.send(&request).await?;
/// while let Some(event) = stream.next().await {
///     match event? {
///         StreamEvent::Content(delta) => print!("{}", delta.text),
///         StreamEvent::Finished(_) => break,
///         _ => {}
///     }
/// }
/// ```
pub struct ResponseStream {
    rx: mpsc::UnboundedReceiver<Result<StreamEvent>>,
    cancel: CancellationToken,
    task_handle: Option<tokio::task::JoinHandle<()>>,
    request_id: Option<RequestId>,
    stats: Option<UsageStats>,
    state: Option<SessionState>,
}

impl ResponseStream {
    /// Stream the events of a session over `reader`.
    ///
    /// Must be called within a tokio runtime.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: ChunkReader + 'static,
    {
        Self::from_reader_with_cancel(reader, CancellationToken::new())
    }

    /// Like [`from_reader`](Self::from_reader), stopped by an external token.
    pub fn from_reader_with_cancel<R>(reader: R, cancel: CancellationToken) -> Self
    where
        R: ChunkReader + 'static,
    {
        Self::spawn(StreamSession::new(reader, cancel), None)
    }

    pub(crate) fn spawn<R>(session: StreamSession<R>, request_id: Option<RequestId>) -> Self
    where
        R: ChunkReader + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = session.cancel_token();
        let session = match request_id.clone() {
            Some(id) => session.with_request_id(id),
            None => session,
        };

        let task_handle = tokio::spawn(async move {
            let handler = ChannelHandler { tx };
            let mut summary = session.run(&handler).await;
            if let Some(err) = summary.error.take() {
                let _ = handler.tx.send(Err(err));
            }
            let _ = handler.tx.send(Ok(StreamEvent::Finished(summary)));
        });

        Self {
            rx,
            cancel,
            task_handle: Some(task_handle),
            request_id,
            stats: None,
            state: None,
        }
    }

    /// Request cancellation. Events already read are still delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Get the request ID, if the stream was opened by a client.
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Statistics of the session, once the `Finished` event was yielded.
    pub fn stats(&self) -> Option<&UsageStats> {
        self.stats.as_ref()
    }

    /// Terminal state, once the `Finished` event was yielded.
    pub fn state(&self) -> Option<SessionState> {
        self.state
    }

    /// Collect all content text from the stream, ignoring other events.
    ///
    /// Returns the transport error if the session failed.
    pub async fn collect_text(mut self) -> Result<String> {
        use futures::StreamExt;

        let mut text = String::new();

        while let Some(event) = self.next().await {
            if let StreamEvent::Content(delta) = event? {
                text.push_str(&delta.text);
            }
        }

        Ok(text)
    }

    /// Collect all events from the stream.
    ///
    /// Returns the transport error if the session failed.
    pub async fn collect_all(mut self) -> Result<CollectedResponse> {
        use futures::StreamExt;

        let mut response = CollectedResponse::default();

        while let Some(event) = self.next().await {
            let event = event?;
            match &event {
                StreamEvent::Content(delta) => {
                    response.text.push_str(&delta.text);
                }
                StreamEvent::ProviderError(error) => {
                    response.provider_errors.push(error.clone());
                }
                StreamEvent::Finished(summary) => {
                    response.stats = summary.stats.clone();
                    response.state = Some(summary.state);
                }
                StreamEvent::Done => {}
            }
            response.events.push(event);
        }

        Ok(response)
    }
}

impl Stream for ResponseStream {
    type Item = Result<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(Ok(event))) => {
                if let StreamEvent::Finished(ref summary) = event {
                    this.stats = summary.stats.clone();
                    this.state = Some(summary.state);
                }
                Poll::Ready(Some(Ok(event)))
            }
            other => other,
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("request_id", &self.request_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// A collected response from a completed stream.
#[derive(Debug, Default)]
pub struct CollectedResponse {
    /// All content text concatenated.
    pub text: String,
    /// All events in order, `Finished` included.
    pub events: Vec<StreamEvent>,
    /// Errors the provider reported inside the stream.
    pub provider_errors: Vec<ProviderError>,
    /// Terminal statistics, if the stream carried any.
    pub stats: Option<UsageStats>,
    /// Terminal state of the session.
    pub state: Option<SessionState>,
}

impl CollectedResponse {
    /// Check if the session ended normally without provider errors.
    pub fn is_success(&self) -> bool {
        self.state == Some(SessionState::Finished) && self.provider_errors.is_empty()
    }
}
