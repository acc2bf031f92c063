//! Test utilities for chatstream integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde_json::json;
use tokio::sync::Notify;

use chatstream::protocol::{ContentDelta, ProviderError, UsageStats};
use chatstream::{ChunkReader, Error, Result, StreamHandler};

/// A mock chunk reader that returns pre-defined chunks.
///
/// Chunks are returned in order, then either `Ok(None)` signals EOF or,
/// for [`MockReader::pending_after`], the read never completes.
pub struct MockReader {
    chunks: VecDeque<Result<Bytes>>,
    hang_at_end: bool,
    reads: Arc<AtomicUsize>,
}

impl MockReader {
    /// Create a new mock reader with the given chunks.
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect(),
            hang_at_end: false,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A single-chunk reader over `body`.
    pub fn whole(body: impl Into<Vec<u8>>) -> Self {
        Self::new(vec![body.into()])
    }

    /// Create a mock reader that returns an error after its chunks.
    pub fn with_error(chunks: Vec<Vec<u8>>, error: Error) -> Self {
        let mut reader = Self::new(chunks);
        reader.chunks.push_back(Err(error));
        reader
    }

    /// Create a mock reader whose read after the last chunk never completes.
    pub fn pending_after(chunks: Vec<Vec<u8>>) -> Self {
        let mut reader = Self::new(chunks);
        reader.hang_at_end = true;
        reader
    }

    /// Shared counter of `read_chunk` calls.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl ChunkReader for MockReader {
    async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.chunks.pop_front() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(e),
            None if self.hang_at_end => futures::future::pending().await,
            None => Ok(None),
        }
    }
}

/// One recorded handler callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Message(String),
    ParseError(String),
    Done,
    Fatal(String),
    Finish(Option<UsageStats>),
}

/// Handler that records every callback in order.
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<Recorded>>,
    message_seen: Notify,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// All callbacks, in order.
    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    /// Text of every `on_message` call.
    pub fn messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Recorded::Message(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn finish_count(&self) -> usize {
        self.count(|c| matches!(c, Recorded::Finish(_)))
    }

    pub fn fatal_count(&self) -> usize {
        self.count(|c| matches!(c, Recorded::Fatal(_)))
    }

    pub fn done_count(&self) -> usize {
        self.count(|c| matches!(c, Recorded::Done))
    }

    /// Stats passed to `on_finish`, if it was called.
    pub fn finish_stats(&self) -> Option<Option<UsageStats>> {
        self.calls().into_iter().find_map(|c| match c {
            Recorded::Finish(stats) => Some(stats),
            _ => None,
        })
    }

    /// Wait until at least one message was delivered.
    pub async fn wait_for_message(&self) {
        self.message_seen.notified().await;
    }

    fn push(&self, call: Recorded) {
        self.calls.lock().unwrap().push(call);
    }
}

impl StreamHandler for RecordingHandler {
    fn on_message(&self, delta: &ContentDelta) {
        self.push(Recorded::Message(delta.text.clone()));
        self.message_seen.notify_one();
    }

    fn on_parse_error(&self, error: &ProviderError) {
        self.push(Recorded::ParseError(error.message()));
    }

    fn on_done(&self) {
        self.push(Recorded::Done);
    }

    fn on_fatal_error(&self, error: &Error) {
        self.push(Recorded::Fatal(error.to_string()));
    }

    fn on_finish(&self, stats: Option<&UsageStats>) {
        self.push(Recorded::Finish(stats.cloned()));
    }
}

/// Builder for realistic response bodies.
pub struct ScenarioBuilder {
    lines: Vec<String>,
    line_ending: &'static str,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioBuilder {
    /// Create a new scenario builder.
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            line_ending: "\n",
        }
    }

    /// Terminate lines with `\r\n`.
    pub fn crlf(mut self) -> Self {
        self.line_ending = "\r\n";
        self
    }

    /// An OpenAI-style event-stream delta.
    pub fn sse_content(mut self, text: &str) -> Self {
        let payload = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
        });
        self.lines.push(format!("data: {payload}"));
        self
    }

    /// The role-only first delta OpenAI-style backends send.
    pub fn sse_role(mut self) -> Self {
        let payload = json!({"choices": [{"index": 0, "delta": {"role": "assistant"}}]});
        self.lines.push(format!("data: {payload}"));
        self
    }

    /// An event-stream line re-wrapped by a proxy.
    pub fn double_prefixed(mut self, text: &str) -> Self {
        self.lines
            .push(format!("data: data: {}", json!({ "response": text })));
        self
    }

    /// An Ollama chat NDJSON line.
    pub fn ndjson_content(mut self, text: &str) -> Self {
        let payload = json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": text},
            "done": false
        });
        self.lines.push(payload.to_string());
        self
    }

    /// Ollama terminal statistics.
    pub fn stats(mut self, prompt_eval_count: u64, eval_count: u64) -> Self {
        let payload = json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": ""},
            "done": true,
            "done_reason": "stop",
            "total_duration": 5_000_000_000u64,
            "load_duration": 1_000_000u64,
            "prompt_eval_count": prompt_eval_count,
            "prompt_eval_duration": 300_000_000u64,
            "eval_count": eval_count,
            "eval_duration": 4_000_000_000u64
        });
        self.lines.push(payload.to_string());
        self
    }

    /// An in-stream provider error.
    pub fn error(mut self, message: &str) -> Self {
        self.lines.push(json!({ "error": message }).to_string());
        self
    }

    pub fn done_sentinel(mut self) -> Self {
        self.lines.push("data: [DONE]".to_string());
        self
    }

    pub fn timestamp(mut self) -> Self {
        self.lines.push("2024-05-01 12:30:45".to_string());
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(String::new());
        self
    }

    /// A line written exactly as given.
    pub fn raw(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    /// Render the body, every line terminated.
    pub fn build(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("{l}{}", self.line_ending))
            .collect()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.build().into_bytes()
    }
}

/// Split `body` at the given byte offsets.
pub fn split_at(body: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        chunks.push(body[start..cut].to_vec());
        start = cut;
    }
    chunks.push(body[start..].to_vec());
    chunks
}

/// Split `body` into chunks of at most `size` bytes.
pub fn chunked(body: &[u8], size: usize) -> Vec<Vec<u8>> {
    body.chunks(size).map(<[u8]>::to_vec).collect()
}
