//! End-to-end tests for the chat session over real HTTP.
//!
//! Each test starts throwaway HTTP servers on localhost that play the key
//! server and the completion API, then drives a `ChatSession` against them.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};

use finchat::chat::{ChatConfig, ChatSession};
use finchat::error::{
    MSG_AUTHENTICATION, MSG_CREDENTIAL_UNAVAILABLE, MSG_EMPTY_QUESTION, MSG_GENERIC, MSG_MALFORMED,
};
use finchat::{ChatMessage, KeyServer, KeySource, RecordingRenderer, RetryPolicy};

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Serves canned `(status, body)` responses in order, repeating the last one.
struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    async fn start(responses: Vec<(u16, &str)>) -> Self {
        Self::start_with_headers(responses, &[]).await
    }

    /// Like `start`, with extra headers on every response.
    async fn start_with_headers(responses: Vec<(u16, &str)>, headers: &[(&str, &str)]) -> Self {
        let extra: String = headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();

        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let Some(request) = read_request(&mut stream).await else {
                    continue;
                };
                recorded.lock().unwrap().push(request);
                let (status, body) = responses
                    .get(served)
                    .or_else(|| responses.last())
                    .cloned()
                    .unwrap_or((404, String::new()));
                served += 1;
                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\n{extra}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { addr, requests }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

const KEY_OK: &str = r#"{"apiKey":"sk-mock"}"#;
const REPLY_OK: &str = r#"{"id":"cmpl-1","model":"deepseek-chat","choices":[{"index":0,"message":{"role":"assistant","content":"Откладывайте 15% дохода."},"finish_reason":"stop"}],"usage":{"prompt_tokens":31,"completion_tokens":9,"total_tokens":40}}"#;

fn config_for(key: &MockServer, api: &MockServer, attempts: u32) -> ChatConfig {
    ChatConfig::new()
        .with_key_url(key.url("/get-api-key"))
        .with_api_url(api.url("/v1/chat/completions"))
        .with_key_retry(RetryPolicy::fixed(attempts, Duration::ZERO).unwrap())
        .with_timeout(Duration::from_secs(10))
}

#[tokio::test]
async fn round_trip_over_http() {
    let key = MockServer::start(vec![(200, KEY_OK)]).await;
    let api = MockServer::start(vec![(200, REPLY_OK)]).await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    assert_ok!(
        session
            .get_response("Как накопить на пенсию?", &mut renderer)
            .await
    );

    assert_eq!(
        session.conversation().messages(),
        &[
            ChatMessage::user("Как накопить на пенсию?"),
            ChatMessage::assistant("Откладывайте 15% дохода."),
        ]
    );
    assert!(renderer.error.is_none());

    let key_requests = key.requests();
    assert_eq!(key_requests.len(), 1);
    assert_eq!(key_requests[0].method, "GET");
    assert_eq!(key_requests[0].path, "/get-api-key");
    assert_eq!(key_requests[0].header("accept"), Some("application/json"));

    let api_requests = api.requests();
    assert_eq!(api_requests.len(), 1);
    let request = &api_requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.header("authorization"), Some("Bearer sk-mock"));
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("accept"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["max_tokens"], 512);
    assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "Как накопить на пенсию?");

    let stats = session.stats();
    assert_eq!(stats.total_prompt_tokens, 31);
    assert_eq!(stats.total_completion_tokens, 9);
}

#[tokio::test]
async fn server_error_leaves_question_unanswered() {
    let key = MockServer::start(vec![(200, KEY_OK)]).await;
    let api = MockServer::start(vec![(500, r#"{"error":{"message":"upstream exploded"}}"#)]).await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    let err = assert_err!(
        session
            .get_response("Как накопить на пенсию?", &mut renderer)
            .await
    );
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(
        session.conversation().messages(),
        &[ChatMessage::user("Как накопить на пенсию?")]
    );
    assert_eq!(renderer.error.as_deref(), Some(MSG_GENERIC));
    assert_eq!(renderer.log_lines_containing("HTTP 500"), 1);
    assert_eq!(renderer.log_lines_containing("upstream exploded"), 1);
}

#[tokio::test]
async fn rate_limit_keeps_request_id_in_log() {
    let key = MockServer::start(vec![(200, KEY_OK)]).await;
    let api = MockServer::start_with_headers(
        vec![(
            429,
            r#"{"error":{"message":"slow down","type":"rate_limit_error"}}"#,
        )],
        &[("x-request-id", "req_7"), ("retry-after", "3")],
    )
    .await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    let err = assert_err!(session.get_response("Вопрос", &mut renderer).await);
    assert_eq!(err.status_code(), Some(429));
    assert_eq!(err.request_id(), Some("req_7"));
    assert_eq!(
        err.to_string(),
        "rate_limit_error: slow down (retry after 3 seconds)"
    );
    assert_eq!(renderer.error.as_deref(), Some(MSG_GENERIC));
    assert_eq!(renderer.log_lines_containing("(HTTP 429)"), 1);
    assert_eq!(renderer.log_lines_containing("[request id req_7]"), 1);
}

#[tokio::test]
async fn key_with_trailing_newline_is_never_used() {
    let key = MockServer::start(vec![(200, "{\"apiKey\":\"sk-abc\\n\"}")]).await;
    let api = MockServer::start(vec![(200, REPLY_OK)]).await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    let err = assert_err!(
        session
            .get_response("Как накопить на пенсию?", &mut renderer)
            .await
    );
    assert!(err.is_credential_unavailable(), "{err:?}");
    assert_eq!(renderer.error.as_deref(), Some(MSG_CREDENTIAL_UNAVAILABLE));
    assert_ne!(renderer.error.as_deref(), Some(MSG_EMPTY_QUESTION));
    assert_eq!(key.requests().len(), 3);
    assert!(api.requests().is_empty());
    assert!(!session.has_credential());
}

#[tokio::test]
async fn exhausted_key_server_blocks_completion() {
    let key = MockServer::start(vec![(503, "")]).await;
    let api = MockServer::start(vec![(200, REPLY_OK)]).await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    let err = assert_err!(session.get_response("Вопрос", &mut renderer).await);
    assert!(err.is_credential_unavailable());
    assert_eq!(key.requests().len(), 3);
    assert!(api.requests().is_empty());
    assert_eq!(renderer.error.as_deref(), Some(MSG_CREDENTIAL_UNAVAILABLE));
    assert_eq!(renderer.log_lines_containing("Failed to load API key"), 3);
    assert_eq!(renderer.log_lines_containing("HTTP status 503"), 3);
    assert_eq!(renderer.log_lines_containing("Could not load API key"), 1);
    assert_eq!(
        session.conversation().messages(),
        &[ChatMessage::user("Вопрос")]
    );
}

#[tokio::test]
async fn key_without_field_is_retried() {
    let key = MockServer::start(vec![(200, r#"{"token":"wrong-field"}"#), (200, KEY_OK)]).await;
    let api = MockServer::start(vec![(200, REPLY_OK)]).await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    let policy = session.config().key_retry;
    assert!(session.load_credential(&policy, &mut renderer).await);
    assert!(session.has_credential());
    assert_eq!(key.requests().len(), 2);
    assert_eq!(renderer.log_lines_containing("no usable apiKey"), 1);
}

#[tokio::test]
async fn unreachable_key_server() {
    // Grab a free port, then close it so connections are refused.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let server = KeyServer::with_options(
        Some(&format!("http://{addr}/get-api-key")),
        Some(Duration::from_secs(5)),
    )
    .unwrap();
    let err = assert_err!(server.fetch().await);
    assert!(err.is_network(), "{err:?}");
}

#[tokio::test]
async fn rejected_key_gets_its_own_banner() {
    let key = MockServer::start(vec![(200, KEY_OK)]).await;
    let api = MockServer::start(vec![(
        401,
        r#"{"error":{"message":"Authentication Fails","type":"authentication_error"}}"#,
    )])
    .await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    let err = assert_err!(session.get_response("Вопрос", &mut renderer).await);
    assert!(err.is_authentication());
    assert_eq!(renderer.error.as_deref(), Some(MSG_AUTHENTICATION));
}

#[tokio::test]
async fn garbage_reply_is_malformed() {
    let key = MockServer::start(vec![(200, KEY_OK)]).await;
    let api = MockServer::start(vec![(200, "<html>oops</html>"), (200, r#"{"choices":[]}"#)]).await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    for _ in 0..2 {
        let err = assert_err!(session.get_response("Вопрос", &mut renderer).await);
        assert!(err.is_malformed_response(), "{err:?}");
        assert_eq!(renderer.error.as_deref(), Some(MSG_MALFORMED));
    }
    assert_eq!(session.conversation().len(), 2);
    assert_eq!(key.requests().len(), 1);
}

#[tokio::test]
async fn two_questions_two_pairs() {
    let key = MockServer::start(vec![(200, KEY_OK)]).await;
    let api = MockServer::start(vec![(200, REPLY_OK)]).await;
    let mut session = ChatSession::new(config_for(&key, &api, 3)).unwrap();
    let mut renderer = RecordingRenderer::new();

    for _ in 0..2 {
        assert_ok!(
            session
                .get_response("Как накопить на пенсию?", &mut renderer)
                .await
        );
    }
    let expected = [
        ChatMessage::user("Как накопить на пенсию?"),
        ChatMessage::assistant("Откладывайте 15% дохода."),
        ChatMessage::user("Как накопить на пенсию?"),
        ChatMessage::assistant("Откладывайте 15% дохода."),
    ];
    assert_eq!(session.conversation().messages(), &expected);
    assert_eq!(renderer.transcript, expected);
    assert_eq!(api.requests().len(), 2);
    assert_eq!(key.requests().len(), 1);
}
