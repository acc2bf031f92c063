//! Streaming chat request descriptor.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::ApiStyle;
use crate::{Error, Result};

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The human side of the conversation.
    User,
    /// Previous model output.
    Assistant,
}

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Everything needed to issue one streaming chat request.
///
/// # Example
///
/// ```
/// use chatstream::protocol::ChatRequest;
///
/// let request = ChatRequest::new("llama3.2")
///     .system("Answer briefly.")
///     .user("Why is the sky blue?")
///     .temperature(0.2);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier as understood by the backend.
    pub model: String,
    /// Conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling threshold, `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ChatRequest {
    /// Create an empty request for a model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Append a message.
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Append a system message.
    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::system(content))
    }

    /// Append a user message.
    pub fn user(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::user(content))
    }

    /// Append an assistant message.
    pub fn assistant(self, content: impl Into<String>) -> Self {
        self.message(ChatMessage::assistant(content))
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generated token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the nucleus sampling threshold.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the stop sequences.
    pub fn stop(mut self, stop: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    /// Check the request before it is sent.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::InvalidRequest("model must not be empty".into()));
        }
        if self.messages.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one message is required".into(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=1.0).contains(&t) {
                return Err(Error::InvalidRequest(format!(
                    "temperature must be within 0.0..=1.0, got {t}"
                )));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidRequest(format!(
                    "top_p must be within 0.0..=1.0, got {p}"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(Error::InvalidRequest("max_tokens must be positive".into()));
        }
        Ok(())
    }

    /// Render the JSON request body for a backend family.
    ///
    /// Streaming is always requested. Ollama takes sampling parameters in an
    /// `options` object and calls the token limit `num_predict`.
    pub fn to_body(&self, style: ApiStyle) -> Value {
        let mut body = json!({
            "model": self.model.trim(),
            "messages": self.messages,
            "stream": true,
        });

        let mut params = Map::new();
        if let Some(t) = self.temperature {
            params.insert("temperature".into(), json!(t));
        }
        if let Some(n) = self.max_tokens {
            let key = match style {
                ApiStyle::OpenAi => "max_tokens",
                ApiStyle::Ollama => "num_predict",
            };
            params.insert(key.into(), json!(n));
        }
        if let Some(p) = self.top_p {
            params.insert("top_p".into(), json!(p));
        }
        if let Some(ref stop) = self.stop {
            params.insert("stop".into(), json!(stop));
        }

        match style {
            ApiStyle::OpenAi => {
                if let Value::Object(ref mut obj) = body {
                    obj.extend(params);
                }
            }
            ApiStyle::Ollama => {
                if !params.is_empty() {
                    body["options"] = Value::Object(params);
                }
            }
        }

        body
    }
}
