//! Type-safe configuration options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend API family, selecting the endpoint path and request body layout.
///
/// The response side is format-agnostic: every family's stream goes through
/// the same classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    /// OpenAI-compatible `/v1/chat/completions` with SSE responses.
    #[default]
    OpenAi,
    /// Ollama `/api/chat` with newline-delimited JSON responses.
    Ollama,
}

impl ApiStyle {
    /// Default request path for this family.
    pub fn default_path(&self) -> &'static str {
        match self {
            ApiStyle::OpenAi => "/v1/chat/completions",
            ApiStyle::Ollama => "/api/chat",
        }
    }
}

impl fmt::Display for ApiStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiStyle::OpenAi => write!(f, "openai"),
            ApiStyle::Ollama => write!(f, "ollama"),
        }
    }
}

impl From<&str> for ApiStyle {
    /// Unknown names fall back to the OpenAI-compatible family, which most
    /// hosted providers implement.
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ollama" => ApiStyle::Ollama,
            _ => ApiStyle::OpenAi,
        }
    }
}

/// Newtype for request IDs, used to correlate log lines of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    /// Create a RequestId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        RequestId(id.into())
    }

    /// Generate a fresh random ID.
    pub fn generate() -> Self {
        RequestId(uuid::Uuid::new_v4().to_string())
    }

    /// Get the request ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId(s)
    }
}
