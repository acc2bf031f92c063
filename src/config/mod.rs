//! Configuration for the streaming client.
//!
//! This module provides:
//!
//! - [`ClientConfig`] and [`ClientConfigBuilder`] for configuring the client
//! - [`ApiStyle`] selecting the backend family (OpenAI-compatible or Ollama)
//! - [`RequestId`] for correlating the log lines of one session
//!
//! # Example
//!
//! ```ignore
//! use chatstream::config::{ApiStyle, ClientConfig};
//!
//! let config = ClientConfig::builder()
//!     .base_url("https://api.groq.com/openai")
//!     .api_key_from_env("GROQ_API_KEY")
//!     .build()?;
//!
//! let local = ClientConfig::builder()
//!     .base_url("http://localhost:11434")
//!     .api_style(ApiStyle::Ollama)
//!     .build()?;
//! ```

pub mod builder;
pub mod options;

pub use builder::{ClientConfig, ClientConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
pub use options::{ApiStyle, RequestId};
