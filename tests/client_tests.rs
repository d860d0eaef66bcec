//! Chat client against a mocked endpoint and against a live relay.

mod common;

use common::mocks::MockLLMClient;
use futures::StreamExt;
use relay::client::{APOLOGY, ChatClient, ChatSession};
use relay::types::{AppError, Message};
use relay::{AppState, ChatRelay, RelayConfig, api::routes::create_router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_turn_posts_history_and_collects_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!([
            { "role": "assistant", "content": "Hi!" },
            { "role": "user", "content": "Héllo" }
        ])))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain; charset=utf-8")
                .set_body_string("Bonjour, ça va?"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(reqwest::Client::new(), &server.uri());
    let mut session = ChatSession::new("Hi!");
    let mut seen = String::new();

    let sent = client
        .send_turn(&mut session, "Héllo", |piece| seen.push_str(piece))
        .await
        .unwrap();

    assert!(sent);
    assert_eq!(seen, "Bonjour, ça va?");
    assert_eq!(
        session.messages(),
        &[
            Message::assistant("Hi!"),
            Message::user("Héllo"),
            Message::assistant("Bonjour, ça va?"),
        ]
    );
    assert!(!session.is_in_flight());
}

#[tokio::test]
async fn test_server_error_shows_apology() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({
            "error": "Retrieval failure",
            "kind": "retrieval_failure"
        })))
        .mount(&server)
        .await;

    let client = ChatClient::new(reqwest::Client::new(), &server.uri());
    let mut session = ChatSession::new("Hi!");

    let err = client
        .send_turn(&mut session, "Hello", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Transport(_)));
    assert_eq!(session.messages().len(), 3);
    assert_eq!(session.messages()[2], Message::assistant(APOLOGY));
    assert!(!session.is_in_flight());
}

#[tokio::test]
async fn test_blank_input_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ChatClient::new(reqwest::Client::new(), &server.uri());
    let mut session = ChatSession::new("Hi!");

    let sent = client.send_turn(&mut session, "  ", |_| {}).await.unwrap();

    assert!(!sent);
    assert_eq!(session.messages().len(), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Nothing listens on port 9 (discard) on test hosts.
    let client = ChatClient::new(reqwest::Client::new(), "http://127.0.0.1:9");
    let mut session = ChatSession::new("Hi!");

    let err = client.send_turn(&mut session, "Hello", |_| {}).await.unwrap_err();

    assert!(matches!(err, AppError::Transport(_)));
    assert_eq!(session.messages()[2].content, APOLOGY);
}

#[tokio::test]
async fn test_end_to_end_against_running_relay() {
    let llm = MockLLMClient::new(&["Stocks ", "go ", "up ", "and ", "down. ", "€"]);
    let relay = ChatRelay::new(Arc::new(llm.clone()), "system");
    let app = create_router(AppState::new(RelayConfig::default(), relay));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ChatClient::new(reqwest::Client::new(), &format!("http://{}", addr));
    let mut session = ChatSession::new("Hi!");

    client
        .send_turn(&mut session, "Where are stocks going?", |_| {})
        .await
        .unwrap();
    client
        .send_turn(&mut session, "And then?", |_| {})
        .await
        .unwrap();

    assert_eq!(session.messages().len(), 5);
    assert_eq!(session.messages()[2].content, "Stocks go up and down. €");
    assert_eq!(session.messages()[4].content, "Stocks go up and down. €");

    // The second request carried the whole history, minus the placeholder.
    let prompt = llm.last_prompt().unwrap();
    assert_eq!(prompt.len(), 5);
    assert_eq!(prompt[0], Message::system("system"));
    assert_eq!(prompt[4], Message::user("And then?"));
}

#[tokio::test]
async fn test_dropped_connection_releases_upstream() {
    let fragments: Vec<String> = (0..10).map(|i| format!("frag{} ", i)).collect();
    let refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
    let llm = MockLLMClient::new(&refs).with_delay(Duration::from_millis(200));
    let relay = ChatRelay::new(Arc::new(llm.clone()), "system");
    let app = create_router(AppState::new(RelayConfig::default(), relay));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/chat", addr))
        .json(&json!([{ "role": "user", "content": "Hello" }]))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let mut body = response.bytes_stream();
    let first = body.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"frag0 ");

    drop(body);

    let released = tokio::time::timeout(Duration::from_secs(5), async {
        while !llm.stream_dropped() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    assert!(released.is_ok(), "upstream stream was never dropped");
    assert!(llm.pulled() < fragments.len());
}
