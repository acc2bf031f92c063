//! The per-request session controller.
//!
//! A [`StreamSession`] owns everything one streaming response needs: the
//! chunk reader, the decoder and framer buffers, the captured statistics,
//! and the cancellation token. [`StreamSession::run`] drives it to a
//! terminal state and reports every event to a [`StreamHandler`].
//!
//! ```text
//!            end of stream             flushed
//! Running ─────────────────▶ Finishing ────────▶ Finished
//!    │
//!    ├── cancel requested ──────────────────────▶ Cancelled
//!    └── transport error ───────────────────────▶ Failed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use chatstream::{BodyReader, LoggingHandler, StreamSession};
//! use tokio_util::sync::CancellationToken;
//!
//! let reader = BodyReader::from_response(response, config.timeout());
//! let summary = StreamSession::new(reader, CancellationToken::new())
//!     .run(&LoggingHandler::new())
//!     .await;
//! println!("{:?} after {} lines", summary.state, summary.lines);
//! ```

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::RequestId;
use crate::handler::StreamHandler;
use crate::protocol::{classify_line, FilterReason, NormalizedEvent, UsageStats};
use crate::transport::{ChunkReader, LineFramer, Utf8Decoder};
use crate::Error;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Reading and classifying chunks.
    Running,
    /// End of stream reached; flushing buffered text.
    Finishing,
    /// Ended normally.
    Finished,
    /// Ended because cancellation was requested.
    Cancelled,
    /// Ended by a transport error.
    Failed,
}

impl SessionState {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Finished | SessionState::Cancelled | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Running => "running",
            SessionState::Finishing => "finishing",
            SessionState::Finished => "finished",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed session.
#[derive(Debug)]
pub struct SessionSummary {
    /// Request ID the session ran under, if one was attached.
    pub request_id: Option<RequestId>,
    /// Terminal state.
    pub state: SessionState,
    /// The first terminal statistics seen in the stream.
    pub stats: Option<UsageStats>,
    /// Number of chunks read from the transport.
    pub chunks: u64,
    /// Number of non-blank logical lines classified.
    pub lines: u64,
    /// The transport error that ended a `Failed` session.
    pub error: Option<Error>,
}

impl SessionSummary {
    pub(crate) fn empty(request_id: Option<RequestId>, state: SessionState) -> Self {
        Self {
            request_id,
            state,
            stats: None,
            chunks: 0,
            lines: 0,
            error: None,
        }
    }

    /// Check if the session ended normally.
    pub fn is_success(&self) -> bool {
        self.state == SessionState::Finished
    }

    /// Check if the session was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state == SessionState::Cancelled
    }

    /// Turn a failed summary into its error.
    pub fn into_result(mut self) -> crate::Result<Self> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// One streaming response, from first chunk to terminal state.
///
/// Buffers are owned by the session, so concurrent sessions never share
/// state. Reads and line processing happen strictly one at a time.
pub struct StreamSession<R> {
    reader: R,
    decoder: Utf8Decoder,
    framer: LineFramer,
    cancel: CancellationToken,
    request_id: Option<RequestId>,
    state: SessionState,
    stats: Option<UsageStats>,
    chunks: u64,
    lines: u64,
}

impl<R: ChunkReader> StreamSession<R> {
    /// Create a session reading from `reader`, stopped by `cancel`.
    pub fn new(reader: R, cancel: CancellationToken) -> Self {
        Self {
            reader,
            decoder: Utf8Decoder::new(),
            framer: LineFramer::new(),
            cancel,
            request_id: None,
            state: SessionState::Running,
            stats: None,
            chunks: 0,
            lines: 0,
        }
    }

    /// Attach a request ID for log correlation.
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// A clone of the token that cancels this session.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive the session to a terminal state.
    ///
    /// Content and provider errors reach `handler` in the order their lines
    /// appeared. `on_finish` is called exactly once before this returns.
    pub async fn run<H>(self, handler: &H) -> SessionSummary
    where
        H: StreamHandler + ?Sized,
    {
        let span = tracing::debug_span!(
            "stream_session",
            request_id = %self
                .request_id
                .as_ref()
                .map(RequestId::as_str)
                .unwrap_or("-")
        );
        self.drive(handler).instrument(span).await
    }

    async fn drive<H>(mut self, handler: &H) -> SessionSummary
    where
        H: StreamHandler + ?Sized,
    {
        tracing::debug!("session started");

        loop {
            if self.cancel.is_cancelled() {
                return self.end_cancelled(handler);
            }

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.reader.read_chunk() => Some(result),
            };

            match read {
                None => return self.end_cancelled(handler),
                Some(Ok(Some(chunk))) => {
                    self.chunks += 1;
                    tracing::trace!(bytes = chunk.len(), "chunk received");
                    let text = self.decoder.decode(&chunk);
                    for line in self.framer.push(&text) {
                        self.process_line(&line, handler);
                    }
                }
                Some(Ok(None)) => return self.end_natural(handler),
                Some(Err(err)) => {
                    // A read aborted by cancellation is not a failure
                    if self.cancel.is_cancelled() {
                        return self.end_cancelled(handler);
                    }
                    return self.end_failed(err, handler);
                }
            }
        }
    }

    fn process_line<H>(&mut self, line: &str, handler: &H)
    where
        H: StreamHandler + ?Sized,
    {
        self.lines += 1;

        match classify_line(line) {
            NormalizedEvent::ContentDelta(delta) => handler.on_message(&delta),
            NormalizedEvent::ParseError(error) => {
                tracing::warn!(message = %error.message(), "provider reported an error");
                handler.on_parse_error(&error);
            }
            NormalizedEvent::Done => {
                tracing::debug!("done sentinel received");
                handler.on_done();
            }
            NormalizedEvent::Stats(stats) => {
                if self.stats.is_none() {
                    tracing::debug!(
                        prompt_tokens = stats.prompt_tokens,
                        completion_tokens = stats.completion_tokens,
                        "statistics captured"
                    );
                    self.stats = Some(stats);
                } else {
                    tracing::trace!(reason = ?FilterReason::DuplicateStats, "line filtered");
                }
            }
            NormalizedEvent::Filtered(reason) => {
                tracing::trace!(?reason, line, "line filtered");
            }
        }
    }

    fn end_natural<H>(mut self, handler: &H) -> SessionSummary
    where
        H: StreamHandler + ?Sized,
    {
        self.state = SessionState::Finishing;
        tracing::debug!("end of stream");

        let tail = self.decoder.finish();
        let mut rest = self.framer.push(&tail);
        rest.extend(self.framer.finish());
        for line in rest {
            self.process_line(&line, handler);
        }

        self.finish(SessionState::Finished, None, handler)
    }

    fn end_cancelled<H>(mut self, handler: &H) -> SessionSummary
    where
        H: StreamHandler + ?Sized,
    {
        tracing::debug!("cancellation requested");

        // Bytes of an unfinished character are dropped with the read
        if let Some(line) = self.framer.finish() {
            self.process_line(&line, handler);
        }

        self.finish(SessionState::Cancelled, None, handler)
    }

    fn end_failed<H>(self, err: Error, handler: &H) -> SessionSummary
    where
        H: StreamHandler + ?Sized,
    {
        tracing::warn!(error = %err, carried = self.framer.carry().len(), "transport failed");
        handler.on_fatal_error(&err);
        self.finish(SessionState::Failed, Some(err), handler)
    }

    fn finish<H>(mut self, state: SessionState, error: Option<Error>, handler: &H) -> SessionSummary
    where
        H: StreamHandler + ?Sized,
    {
        self.state = state;
        handler.on_finish(self.stats.as_ref());

        tracing::info!(
            %state,
            chunks = self.chunks,
            lines = self.lines,
            has_stats = self.stats.is_some(),
            "session ended"
        );

        SessionSummary {
            request_id: self.request_id,
            state,
            stats: self.stats,
            chunks: self.chunks,
            lines: self.lines,
            error,
        }
    }
}

impl<R> fmt::Debug for StreamSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("request_id", &self.request_id)
            .field("state", &self.state)
            .field("chunks", &self.chunks)
            .field("lines", &self.lines)
            .field("has_stats", &self.stats.is_some())
            .finish_non_exhaustive()
    }
}
