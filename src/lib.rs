//! # chatstream
//!
//! Streaming response normalization for LLM chat backends.
//!
//! Backends stream their answers in several shapes: OpenAI-style
//! server-sent events (`data: {...}`), Ollama-style newline-delimited JSON,
//! doubled `data: data:` prefixes from proxies, bare timestamps, plain text.
//! This library turns any of them into one ordered sequence of events:
//! - Content deltas, delivered as soon as their line is complete
//! - Provider errors reported inside the stream, without ending it
//! - Terminal token statistics, captured once per session
//! - Exactly one finish notification per session, however it ended
//!
//! ## Quick Start
//!
//! ```ignore
//! use chatstream::{ChatRequest, Result, StreamClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = StreamClient::builder()
//!         .base_url("http://localhost:11434")
//!         .api_style("ollama")
//!         .build()?;
//!     let request = ChatRequest::new("llama3").user("What is 2+2?");
//!     println!("{}", client.send_and_collect(&request).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Callbacks and cancellation
//!
//! ```ignore
//! use std::sync::Arc;
//! use chatstream::{LoggingHandler, StreamClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let handle = client.open_stream(&request, token.clone(), Arc::new(LoggingHandler::new()));
//! // ... later, e.g. when the user presses stop
//! token.cancel();
//! let summary = handle.join().await?;
//! assert!(summary.is_cancelled());
//! ```
//!
//! ## Bring your own body
//!
//! Any source of byte chunks can be driven through a session:
//!
//! ```ignore
//! use chatstream::{BodyReader, StreamSession};
//!
//! let reader = BodyReader::from_stream(my_byte_stream);
//! let summary = StreamSession::new(reader, token).run(&my_handler).await;
//! ```

mod client;
pub mod config;
mod error;
mod handler;
pub mod protocol;
mod session;
pub mod stream;
pub mod transport;

pub use error::{Error, Result};

// Re-export the main client types at crate root
pub use client::{ClientBuilder, StreamClient, StreamHandle};
pub use handler::{LogLevel, LoggingHandler, StreamHandler};
pub use session::{SessionState, SessionSummary, StreamSession};

// Re-export commonly used config types at crate root
pub use config::{ApiStyle, ClientConfig, ClientConfigBuilder, RequestId};

// Re-export commonly used protocol types at crate root
pub use protocol::{
    ChatMessage, ChatRequest, ContentDelta, NormalizedEvent, ProviderError, Role, UsageStats,
};

// Re-export commonly used transport types at crate root
pub use transport::{BodyReader, ChunkReader};

// Re-export commonly used stream types at crate root
pub use stream::{CollectedResponse, ResponseStream, StreamEvent};

pub use tokio_util::sync::CancellationToken;
