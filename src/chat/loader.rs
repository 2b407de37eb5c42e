// Conversation loader
// Fetches one page of the trip conversation from `GET <base>/chat?page=N`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Client;
use std::time::Duration;

use super::ChatError;
use crate::models::ChatPage;

/// Source of conversation pages.
///
/// The screen only talks to this trait so tests can stand in for the server.
#[async_trait]
pub trait ConversationLoader: Send + Sync {
    /// Load a single page of metadata and messages
    async fn load_page(&self, page: u32) -> std::result::Result<ChatPage, ChatError>;
}

/// Request tuning for [`HttpLoader`]
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub timeout: Duration,
    /// Extra attempts after the first one; 0 means single-shot
    pub max_retries: u32,
    /// Delay before the first retry, doubled for every further one
    pub backoff_base: Duration,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
        }
    }
}

impl LoaderOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Delay to wait before retry number `attempt` (0-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Loader backed by the real HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
    base_url: String,
    options: LoaderOptions,
}

impl HttpLoader {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(base_url, LoaderOptions::default())
    }

    pub fn with_options(base_url: impl Into<String>, options: LoaderOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(HttpLoader {
            client,
            base_url: base_url.into(),
            options,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for the given page index
    pub fn page_url(&self, page: u32) -> String {
        format!("{}/chat?page={}", self.base_url.trim_end_matches('/'), page)
    }

    async fn fetch_once(&self, page: u32) -> std::result::Result<ChatPage, ChatError> {
        let url = self.page_url(page);
        debug!("Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::Fetch { page, reason: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status { page, status: status.as_u16() });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ChatError::Fetch { page, reason: e.to_string() })?;

        serde_json::from_slice::<ChatPage>(&body)
            .map_err(|e| ChatError::Parse { page, reason: e.to_string() })
    }
}

#[async_trait]
impl ConversationLoader for HttpLoader {
    async fn load_page(&self, page: u32) -> std::result::Result<ChatPage, ChatError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(page).await {
                Ok(chat_page) => {
                    info!(
                        "Loaded page {} with {} messages",
                        page,
                        chat_page.messages.len()
                    );
                    return Ok(chat_page);
                }
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    let delay = self.options.backoff_for(attempt);
                    warn!(
                        "Page {} attempt {} failed: {}; retrying in {:?}",
                        page,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Giving up on page {} after {} attempt(s): {}", page, attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }
}
