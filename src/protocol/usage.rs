//! Terminal usage statistics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token and timing statistics reported once at the end of a generation.
///
/// Built from the provider's terminal object (`done: true` together with
/// `prompt_eval_count` and `eval_count`). `total_tokens` is always the sum of
/// the prompt and completion counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Tokens consumed by the prompt (`prompt_eval_count`).
    pub prompt_tokens: u64,
    /// Tokens generated (`eval_count`).
    pub completion_tokens: u64,
    /// `prompt_tokens + completion_tokens`.
    pub total_tokens: u64,
    /// Wall time for the whole request, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ns: Option<u64>,
    /// Time spent loading the model, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration_ns: Option<u64>,
    /// Time spent evaluating the prompt, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration_ns: Option<u64>,
    /// Time spent generating, in nanoseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration_ns: Option<u64>,
}

impl UsageStats {
    /// Create stats from token counts, with no timing information.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            ..Default::default()
        }
    }

    /// Extract statistics from a parsed provider object.
    ///
    /// Returns `None` unless `done` is `true` and both `prompt_eval_count`
    /// and `eval_count` are non-negative whole numbers (`5` or `5.0`).
    /// Duration fields that are missing or not whole numbers are left unset.
    pub fn from_terminal(value: &Value) -> Option<Self> {
        if value.get("done").and_then(Value::as_bool) != Some(true) {
            return None;
        }
        let prompt = value.get("prompt_eval_count").and_then(as_count)?;
        let completion = value.get("eval_count").and_then(as_count)?;

        let duration = |key: &str| value.get(key).and_then(as_count);

        Some(Self {
            total_duration_ns: duration("total_duration"),
            load_duration_ns: duration("load_duration"),
            prompt_eval_duration_ns: duration("prompt_eval_duration"),
            eval_duration_ns: duration("eval_duration"),
            ..Self::new(prompt, completion)
        })
    }

    /// Generation speed in tokens per second, when `eval_duration` is known.
    pub fn tokens_per_second(&self) -> Option<f64> {
        match self.eval_duration_ns {
            Some(ns) if ns > 0 => Some(self.completion_tokens as f64 / (ns as f64 / 1e9)),
            _ => None,
        }
    }
}

/// Read a non-negative whole number, accepting integral floats.
fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}
