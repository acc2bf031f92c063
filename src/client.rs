//! HTTP client for streaming chat completions.
//!
//! This module provides [`StreamClient`], the main entry point: it sends a
//! [`ChatRequest`] and runs a [`StreamSession`] over the response body.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatstream::{ChatRequest, LoggingHandler, Result, StreamClient};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = StreamClient::builder()
//!         .base_url("http://localhost:11434")
//!         .api_style("ollama")
//!         .build()?;
//!     let request = ChatRequest::new("llama3").user("Hello!");
//!
//!     // Pull style
//!     let text = client.send_and_collect(&request).await?;
//!     println!("{}", text);
//!
//!     // Push style, cancellable
//!     let handle = client.open_stream(&request, CancellationToken::new(), Arc::new(LoggingHandler::new()));
//!     let summary = handle.join().await?;
//!     println!("{:?}", summary.stats);
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::{ApiStyle, ClientConfig, ClientConfigBuilder, RequestId};
use crate::handler::StreamHandler;
use crate::protocol::ChatRequest;
use crate::session::{SessionState, SessionSummary, StreamSession};
use crate::stream::ResponseStream;
use crate::transport::{http, BodyReader};
use crate::{Error, Result};

/// A client for streaming chat completions from one backend.
///
/// # Thread Safety
///
/// `StreamClient` is `Send + Sync` and cheap to clone. Every request runs
/// its own session with its own buffers, so concurrent requests are
/// independent.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl StreamClient {
    /// Create a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a configured header cannot be
    /// sent, or [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = http::build_client(&config)?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Create a builder for configuring a new client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Begin a streaming session on a spawned task.
    ///
    /// Events go to `handler`. Whatever happens (an invalid request, a
    /// rejected HTTP request, a broken body, cancellation), the handler's
    /// `on_finish` is called exactly once.
    ///
    /// Must be called within a tokio runtime. Dropping the returned handle
    /// does not stop the session; use [`StreamHandle::cancel`] or the token.
    pub fn open_stream(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
        handler: Arc<dyn StreamHandler>,
    ) -> StreamHandle {
        let request_id = RequestId::generate();
        let span = tracing::debug_span!("stream_request", request_id = %request_id);

        let task = tokio::spawn(
            run_request(
                self.http.clone(),
                Arc::clone(&self.config),
                request.clone(),
                cancel.clone(),
                handler,
                request_id.clone(),
            )
            .instrument(span),
        );

        StreamHandle {
            request_id,
            cancel,
            task,
        }
    }

    /// Send a request and return a stream of response events.
    ///
    /// Request validation and HTTP failures are returned here; failures of
    /// the body afterwards arrive through the stream.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned [`ResponseStream`] cancels the session.
    pub async fn send(&self, request: &ChatRequest) -> Result<ResponseStream> {
        request.validate()?;
        let request_id = RequestId::generate();

        let response = http::send(&self.http, &self.config, request)
            .instrument(tracing::debug_span!("stream_request", request_id = %request_id))
            .await?;

        let session = StreamSession::new(
            BodyReader::from_response(response, self.config.timeout()),
            CancellationToken::new(),
        );
        Ok(ResponseStream::spawn(session, Some(request_id)))
    }

    /// Send a request and collect the full text response.
    pub async fn send_and_collect(&self, request: &ChatRequest) -> Result<String> {
        self.send(request).await?.collect_text().await
    }

    /// Get a reference to the client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

async fn run_request(
    client: reqwest::Client,
    config: Arc<ClientConfig>,
    request: ChatRequest,
    cancel: CancellationToken,
    handler: Arc<dyn StreamHandler>,
    request_id: RequestId,
) -> SessionSummary {
    if let Err(err) = request.validate() {
        return fail_before_stream(err, &*handler, request_id);
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("cancelled before the response arrived");
            handler.on_finish(None);
            return SessionSummary::empty(Some(request_id), SessionState::Cancelled);
        }
        result = http::send(&client, &config, &request) => result,
    };

    match response {
        Ok(response) => {
            let reader = BodyReader::from_response(response, config.timeout());
            StreamSession::new(reader, cancel)
                .with_request_id(request_id)
                .run(&*handler)
                .await
        }
        Err(err) => fail_before_stream(err, &*handler, request_id),
    }
}

fn fail_before_stream(
    err: Error,
    handler: &dyn StreamHandler,
    request_id: RequestId,
) -> SessionSummary {
    tracing::warn!(error = %err, "request failed before streaming");
    handler.on_fatal_error(&err);
    handler.on_finish(None);

    let mut summary = SessionSummary::empty(Some(request_id), SessionState::Failed);
    summary.error = Some(err);
    summary
}

/// Handle to a session started with [`StreamClient::open_stream`].
#[derive(Debug)]
pub struct StreamHandle {
    request_id: RequestId,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<SessionSummary>,
}

impl StreamHandle {
    /// ID of this request, as recorded in its tracing spans.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check if the session reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    ///
    /// A cancelled session is a successful result. A failed session
    /// returns its error; the handler already saw it in `on_fatal_error`.
    pub async fn join(self) -> Result<SessionSummary> {
        match self.task.await {
            Ok(summary) => summary.into_result(),
            Err(err) => {
                tracing::warn!(error = %err, "session task did not complete");
                Err(Error::StreamClosed)
            }
        }
    }
}

/// Builder for [`StreamClient`].
///
/// This wraps [`ClientConfigBuilder`] and builds directly into a [`StreamClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    inner: ClientConfigBuilder,
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self {
            inner: ClientConfigBuilder::default(),
        }
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<StreamClient> {
        StreamClient::new(self.inner.build()?)
    }

    // -------------------------------------------------------------------------
    // Endpoint (delegated to ClientConfigBuilder)
    // -------------------------------------------------------------------------

    /// Base URL of the backend.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.inner = self.inner.base_url(url);
        self
    }

    /// Backend API family.
    pub fn api_style(mut self, style: impl Into<ApiStyle>) -> Self {
        self.inner = self.inner.api_style(style);
        self
    }

    /// Override the request path.
    pub fn endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.inner = self.inner.endpoint_path(path);
        self
    }

    // -------------------------------------------------------------------------
    // Credentials and headers
    // -------------------------------------------------------------------------

    /// Use an API key directly.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.inner = self.inner.api_key(key);
        self
    }

    /// Read the API key from an environment variable.
    pub fn api_key_from_env(mut self, var: impl Into<String>) -> Self {
        self.inner = self.inner.api_key_from_env(var);
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.inner = self.inner.connect_timeout(duration);
        self
    }

    /// Set the overall request timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.inner = self.inner.timeout(duration);
        self
    }
}
