// Common test utilities for integration tests
// This module contains shared code for all integration tests

#![allow(dead_code)]

use std::sync::Once;

use log::LevelFilter;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripchat::chat::{HttpLoader, LoaderOptions};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// One chat entry in wire format
pub fn wire_chat(id: &str, body: &str, is_self: bool) -> Value {
    json!({
        "id": id,
        "message": body,
        "sender": {
            "image": "u.png",
            "is_kyc_verified": true,
            "self": is_self,
            "user_id": "u1"
        },
        "time": "2024-01-01T10:00:00Z"
    })
}

/// A full page body in wire format
pub fn wire_page(name: &str, from: &str, to: &str, chats: Vec<Value>) -> Value {
    json!({
        "chats": chats,
        "from": from,
        "to": to,
        "name": name
    })
}

/// Serve `body` for `GET /chat?page=<page>`
pub async fn mount_page(server: &MockServer, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/chat"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Loader pointed at the mock server that never retries
pub fn single_shot_loader(server: &MockServer) -> HttpLoader {
    HttpLoader::with_options(server.uri(), LoaderOptions::default().with_max_retries(0))
        .expect("failed to build loader")
}
