//! Issuing the streaming HTTP request.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::config::ClientConfig;
use crate::protocol::ChatRequest;
use crate::{Error, Result};

/// Longest error body kept in [`Error::HttpStatus`].
const MAX_ERROR_BODY: usize = 512;

/// Build the shared `reqwest` client for a configuration.
pub(crate) fn build_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/event-stream, application/x-ndjson, application/json"),
    );

    if let Some(key) = config.api_key() {
        let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| Error::InvalidConfig("API key contains invalid header characters".into()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in config.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidConfig(format!("invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidConfig(format!("invalid value for header {name}")))?;
        headers.insert(name, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(config.connect_timeout())
        .timeout(config.timeout())
        .build()
        .map_err(Error::Http)
}

/// POST the request and return the response once its status is known good.
///
/// A non-2xx status is read (truncated) into [`Error::HttpStatus`]; a
/// timeout is reported as [`Error::Timeout`].
pub(crate) async fn send(
    client: &reqwest::Client,
    config: &ClientConfig,
    request: &ChatRequest,
) -> Result<reqwest::Response> {
    let url = config.endpoint_url();
    let body = request.to_body(config.api_style());

    tracing::debug!(%url, model = %request.model, "sending streaming request");

    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| map_reqwest_error(e, config.timeout()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "backend rejected streaming request");
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            body: truncate(&text, MAX_ERROR_BODY),
        });
    }

    Ok(response)
}

/// Report a `reqwest` timeout as [`Error::Timeout`] with the configured limit.
///
/// `is_timeout` walks the source chain, so a timeout surfacing as a body
/// decode error is caught too.
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout(timeout)
    } else {
        Error::Http(err)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
