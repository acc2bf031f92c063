//! Transport layer: reading a response body and turning it into lines.
//!
//! ```text
//! HTTP body ──▶ ChunkReader ──bytes──▶ Utf8Decoder ──text──▶ LineFramer ──lines──▶ classifier
//! ```
//!
//! [`ChunkReader`] is the only I/O seam. The HTTP implementation is
//! [`BodyReader`]; tests and callers holding a body from elsewhere can wrap
//! any `Stream` of byte chunks with [`BodyReader::from_stream`].

mod decode;
mod framer;
pub(crate) mod http;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::{Error, Result};

pub use decode::Utf8Decoder;
pub use framer::LineFramer;

/// Source of raw body chunks.
///
/// `Ok(Some(bytes))` carries data, `Ok(None)` marks end of stream. A pending
/// read must tolerate being dropped: the session abandons it when the
/// request is cancelled. Implementations never retry.
pub trait ChunkReader: Send {
    /// Read the next chunk.
    fn read_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;
}

/// Reads chunks from a streaming HTTP response body.
pub struct BodyReader {
    inner: BoxStream<'static, Result<Bytes>>,
}

impl BodyReader {
    /// Wrap a `reqwest` response whose status was already checked.
    ///
    /// `timeout` is the client's overall timeout; a body read cut short by it
    /// fails with [`Error::Timeout`].
    pub fn from_response(response: reqwest::Response, timeout: Duration) -> Self {
        Self::from_stream(
            response
                .bytes_stream()
                .map(move |item| item.map_err(|e| http::map_reqwest_error(e, timeout))),
        )
    }

    /// Wrap any stream of byte chunks.
    pub fn from_stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: Into<Bytes>,
        E: Into<Error>,
    {
        Self {
            inner: stream.map(|item| item.map(Into::into).map_err(Into::into)).boxed(),
        }
    }
}

impl ChunkReader for BodyReader {
    async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        self.inner.next().await.transpose()
    }
}

impl std::fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyReader").finish_non_exhaustive()
    }
}
