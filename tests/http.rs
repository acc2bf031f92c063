//! HTTP-level tests against a wiremock server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chatstream::{
    ApiStyle, CancellationToken, ChatRequest, Error, SessionState, StreamClient,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{RecordingHandler, ScenarioBuilder};

fn request() -> ChatRequest {
    ChatRequest::new("llama3").user("Why is the sky blue?")
}

fn openai_client(server: &MockServer) -> StreamClient {
    StreamClient::builder()
        .base_url(server.uri())
        .api_key("test-key")
        .build()
        .unwrap()
}

/// Serve a single chunked response that sends `first_line` and then stalls.
async fn stalling_server(first_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = "HTTP/1.1 200 OK\r\n\
                    content-type: text/event-stream\r\n\
                    transfer-encoding: chunked\r\n\r\n";
        socket.write_all(head.as_bytes()).await.unwrap();
        let chunk = format!("{:x}\r\n{first_line}\r\n", first_line.len());
        socket.write_all(chunk.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn openai_event_stream_end_to_end() {
    let server = MockServer::start().await;
    let body = ScenarioBuilder::new()
        .sse_role()
        .sse_content("Rayleigh")
        .sse_content(" scattering")
        .done_sentinel()
        .build();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "llama3", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let text = openai_client(&server)
        .send_and_collect(&request())
        .await
        .unwrap();
    assert_eq!(text, "Rayleigh scattering");
}

#[tokio::test]
async fn ollama_ndjson_with_stats() {
    let server = MockServer::start().await;
    let body = ScenarioBuilder::new()
        .ndjson_content("Short")
        .ndjson_content(" answer.")
        .stats(12, 3)
        .build();

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "stream": true,
            "options": {"num_predict": 64}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = StreamClient::builder()
        .base_url(server.uri())
        .api_style(ApiStyle::Ollama)
        .build()
        .unwrap();

    let handler = Arc::new(RecordingHandler::new());
    let handle = client.open_stream(
        &request().max_tokens(64),
        CancellationToken::new(),
        handler.clone(),
    );
    let summary = handle.join().await.unwrap();

    assert_eq!(summary.state, SessionState::Finished);
    assert_eq!(handler.messages(), vec!["Short", " answer."]);
    assert_eq!(summary.stats.as_ref().map(|s| s.total_tokens), Some(15));
    assert_eq!(handler.finish_count(), 1);
}

#[tokio::test]
async fn non_success_status_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let handler = Arc::new(RecordingHandler::new());
    let handle = openai_client(&server).open_stream(
        &request(),
        CancellationToken::new(),
        handler.clone(),
    );

    let err = handle.join().await.unwrap_err();
    match &err {
        Error::HttpStatus { status, body } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(handler.fatal_count(), 1);
    assert_eq!(handler.finish_count(), 1);
    assert!(handler.messages().is_empty());
}

#[tokio::test]
async fn send_returns_status_error_directly() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "invalid api key"}
        })))
        .mount(&server)
        .await;

    let result = openai_client(&server).send(&request()).await;
    match result {
        Err(Error::HttpStatus { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid api key"));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_while_waiting_for_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"response\":\"late\"}\n", "text/event-stream")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let handler = Arc::new(RecordingHandler::new());
    let token = CancellationToken::new();
    let handle = openai_client(&server).open_stream(&request(), token.clone(), handler.clone());

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("session ends promptly after cancel")
        .unwrap();

    assert_eq!(summary.state, SessionState::Cancelled);
    assert_eq!(handler.fatal_count(), 0);
    assert_eq!(handler.finish_count(), 1);
    assert!(handler.messages().is_empty());
}

#[tokio::test]
async fn custom_endpoint_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/proxy/chat/stream"))
        .and(header("x-client", "chatstream-tests"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: data: {\"response\":\"proxied\"}\n", "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = StreamClient::builder()
        .base_url(format!("{}/proxy", server.uri()))
        .endpoint_path("chat/stream")
        .header("x-client", "chatstream-tests")
        .build()
        .unwrap();

    let response = client.send(&request()).await.unwrap();
    assert!(response.request_id().is_some());
    let collected = response.collect_all().await.unwrap();
    assert_eq!(collected.text, "proxied");
    assert!(collected.is_success());
}

#[tokio::test]
async fn request_ids_differ_per_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("data: [DONE]\n", "text/event-stream"))
        .mount(&server)
        .await;

    let client = openai_client(&server);
    let a = client.open_stream(&request(), CancellationToken::new(), Arc::new(RecordingHandler::new()));
    let b = client.open_stream(&request(), CancellationToken::new(), Arc::new(RecordingHandler::new()));
    assert_ne!(a.request_id(), b.request_id());

    let (a, b) = tokio::join!(a.join(), b.join());
    assert!(a.unwrap().is_success());
    assert!(b.unwrap().is_success());
}

#[tokio::test]
async fn body_stall_reports_timeout() {
    let base = stalling_server("data: {\"response\":\"a\"}\n").await;
    let client = StreamClient::builder()
        .base_url(base)
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let handler = Arc::new(RecordingHandler::new());
    let handle = client.open_stream(&request(), CancellationToken::new(), handler.clone());
    let err = tokio::time::timeout(Duration::from_secs(10), handle.join())
        .await
        .expect("client timeout fires")
        .unwrap_err();

    assert!(
        matches!(err, Error::Timeout(limit) if limit == Duration::from_secs(1)),
        "expected Timeout, got {err:?}"
    );
    assert!(err.is_retryable());
    assert_eq!(handler.messages(), vec!["a"]);
    assert_eq!(handler.fatal_count(), 1);
    assert_eq!(handler.finish_count(), 1);
}

#[tokio::test]
async fn body_stall_reports_timeout_on_pull_stream() {
    let base = stalling_server("data: {\"response\":\"a\"}\n").await;
    let client = StreamClient::builder()
        .base_url(base)
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let stream = client.send(&request()).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(10), stream.collect_text())
        .await
        .expect("client timeout fires");
    assert!(matches!(result, Err(Error::Timeout(_))), "got {result:?}");
}
