// Conversation loader tests
// These tests run the HTTP loader against a stubbed chat endpoint

mod common;
use common::{mount_page, setup_logging, single_shot_loader, wire_chat, wire_page};

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripchat::chat::{ChatError, ConversationLoader, HttpLoader, LoaderOptions};

fn fast_retry_options(max_retries: u32) -> LoaderOptions {
    LoaderOptions::default()
        .with_max_retries(max_retries)
        .with_backoff_base(Duration::from_millis(1))
}

#[tokio::test]
async fn test_loads_and_decodes_page() {
    setup_logging();
    let server = MockServer::start().await;
    mount_page(
        &server,
        0,
        wire_page("Trip A-B", "A", "B", vec![wire_chat("1", "hi", false), wire_chat("2", "yo", true)]),
    )
    .await;

    let loader = single_shot_loader(&server);
    let page = loader.load_page(0).await.unwrap();

    assert_eq!(page.metadata.display_name, "Trip A-B");
    assert_eq!(page.metadata.origin, "A");
    assert_eq!(page.metadata.destination, "B");
    let ids: Vec<&str> = page.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert!(page.messages[1].sender.is_self);
}

#[tokio::test]
async fn test_page_index_is_sent_as_query_param() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wire_page("t", "A", "B", vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let loader = single_shot_loader(&server);
    let page = loader.load_page(3).await.unwrap();
    assert!(page.messages.is_empty());
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let loader = HttpLoader::with_options(server.uri(), fast_retry_options(3)).unwrap();
    let err = loader.load_page(0).await.unwrap_err();
    assert_eq!(err, ChatError::Status { page: 0, status: 404 });
}

#[tokio::test]
async fn test_server_error_retried_then_reported() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let loader = HttpLoader::with_options(server.uri(), fast_retry_options(2)).unwrap();
    let err = loader.load_page(1).await.unwrap_err();
    assert_eq!(err, ChatError::Status { page: 1, status: 500 });
}

#[tokio::test]
async fn test_retry_recovers_from_transient_failure() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 0, wire_page("Trip", "A", "B", vec![wire_chat("1", "hi", false)])).await;

    let loader = HttpLoader::with_options(server.uri(), fast_retry_options(2)).unwrap();
    let page = loader.load_page(0).await.unwrap();
    assert_eq!(page.messages.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "chats": "not a list" })))
        .expect(1)
        .mount(&server)
        .await;

    let loader = HttpLoader::with_options(server.uri(), fast_retry_options(2)).unwrap();
    match loader.load_page(0).await {
        Err(ChatError::Parse { page, .. }) => assert_eq!(page, 0),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_fetch_error() {
    setup_logging();
    // Nothing listens on port 1
    let options = LoaderOptions::default().with_max_retries(0);
    let loader = HttpLoader::with_options("http://127.0.0.1:1", options).unwrap();
    match loader.load_page(0).await {
        Err(e @ ChatError::Fetch { .. }) => assert!(e.is_retryable()),
        other => panic!("expected a fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_response_times_out() {
    setup_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(wire_page("t", "A", "B", vec![]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let options = LoaderOptions::default()
        .with_timeout(Duration::from_millis(100))
        .with_max_retries(0);
    let loader = HttpLoader::with_options(server.uri(), options).unwrap();

    assert!(matches!(loader.load_page(0).await, Err(ChatError::Fetch { .. })));
}
