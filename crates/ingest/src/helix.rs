use std::thread;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

use crate::source::{CredentialSource, LiveSource, StreamPage, StreamRecord};
use crate::types::{IngestError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_AUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
/// Largest page the streams endpoint serves.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct HelixConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base: String,
    pub auth_url: String,
    pub page_size: u32,
    pub timeout: Duration,
    pub retry_max: u32,
    pub retry_backoff: Duration,
}

impl Default for HelixConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout: Duration::from_secs(20),
            retry_max: 3,
            retry_backoff: Duration::from_millis(1_500),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    #[serde(default)]
    data: Vec<StreamRecord>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

fn parse_streams(body: &str) -> Result<StreamPage> {
    let parsed: StreamsResponse = serde_json::from_str(body)?;
    Ok(StreamPage {
        streams: parsed.data,
        cursor: parsed.pagination.cursor.filter(|cursor| !cursor.is_empty()),
    })
}

/// Blocking client for the Helix streams endpoint and the app-token grant.
#[derive(Clone)]
pub struct HelixClient {
    http: Client,
    config: HelixConfig,
}

impl HelixClient {
    pub fn new(config: HelixConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("streamstat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config.retry_backoff * attempt
    }

    fn send_streams_request(&self, token: &str, cursor: Option<&str>) -> Result<Response> {
        let url = format!("{}/streams", self.config.api_base.trim_end_matches('/'));
        let first = self.config.page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut request = self
                .http
                .get(&url)
                .header("Client-ID", &self.config.client_id)
                .bearer_auth(token)
                .query(&[("first", first.as_str())]);
            if let Some(cursor) = cursor {
                request = request.query(&[("after", cursor)]);
            }
            match request.send() {
                Ok(response) if is_retryable(response.status()) && attempt <= self.config.retry_max => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        status = %response.status(),
                        attempt,
                        retry_max = self.config.retry_max,
                        wait_ms = wait.as_millis() as u64,
                        "streams request throttled; retrying"
                    );
                    thread::sleep(wait);
                }
                Ok(response) => return Ok(response),
                Err(err)
                    if (err.is_timeout() || err.is_connect()) && attempt <= self.config.retry_max =>
                {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        error = %err,
                        attempt,
                        retry_max = self.config.retry_max,
                        wait_ms = wait.as_millis() as u64,
                        "streams request failed; retrying"
                    );
                    thread::sleep(wait);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl LiveSource for HelixClient {
    fn fetch_page(&self, token: &str, cursor: Option<&str>) -> Result<StreamPage> {
        let started = Instant::now();
        let response = self.send_streams_request(token, cursor)?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IngestError::Unauthorized);
        }
        if !status.is_success() {
            return Err(IngestError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        let body = response.text()?;
        let page = parse_streams(&body)?;
        tracing::debug!(
            streams = page.streams.len(),
            has_cursor = page.cursor.is_some(),
            api_ms = started.elapsed().as_millis() as u64,
            "fetched streams page"
        );
        Ok(page)
    }
}

impl CredentialSource for HelixClient {
    fn acquire(&self) -> Result<String> {
        if self.config.client_id.trim().is_empty() || self.config.client_secret.trim().is_empty() {
            return Err(IngestError::Credentials(
                "client id and client secret are required".to_string(),
            ));
        }
        let response = self
            .http
            .post(&self.config.auth_url)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Credentials(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }
        let body = response.text()?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        if token.access_token.is_empty() {
            return Err(IngestError::Credentials("empty access token".to_string()));
        }
        tracing::info!("app access token acquired");
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_streams_page_with_cursor() {
        let body = r#"{
            "data": [
                {"user_login": "alpha", "user_id": "1", "viewer_count": 10,
                 "game_id": "509658", "game_name": "Just Chatting", "language": "pl",
                 "started_at": "2025-01-15T10:00:00Z", "type": "live"}
            ],
            "pagination": {"cursor": "eyJiIjpudWxsfQ"}
        }"#;
        let page = parse_streams(body).expect("page");
        assert_eq!(page.streams.len(), 1);
        assert_eq!(page.streams[0].user_login, "alpha");
        assert_eq!(page.cursor.as_deref(), Some("eyJiIjpudWxsfQ"));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page = parse_streams(r#"{"data": [], "pagination": {}}"#).expect("page");
        assert!(page.streams.is_empty());
        assert_eq!(page.cursor, None);

        let page = parse_streams(r#"{"data": [], "pagination": {"cursor": ""}}"#).expect("page");
        assert_eq!(page.cursor, None);
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_streams("<html>").expect_err("decode");
        assert!(matches!(err, IngestError::Decode(_)));
    }

    #[test]
    fn retry_policy_matches_transient_statuses() {
        for code in [429u16, 500, 502, 503, 504] {
            assert!(is_retryable(StatusCode::from_u16(code).expect("status")));
        }
        for code in [200u16, 400, 401, 404, 501] {
            assert!(!is_retryable(StatusCode::from_u16(code).expect("status")));
        }
    }

    #[test]
    fn backoff_grows_linearly() {
        let client = HelixClient::new(HelixConfig::default()).expect("client");
        assert_eq!(client.backoff(1), Duration::from_millis(1_500));
        assert_eq!(client.backoff(3), Duration::from_millis(4_500));
    }

    #[test]
    fn acquire_requires_client_credentials() {
        let client = HelixClient::new(HelixConfig::default()).expect("client");
        let err = client.acquire().expect_err("missing credentials");
        assert!(matches!(err, IngestError::Credentials(_)));
    }
}
