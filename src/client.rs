//! HTTP client for a running Stitchcraft server.
//!
//! Configuration is via environment variables:
//! - `STITCHCRAFT_URL` - Base URL (default: `http://localhost:3000/api/v1`)
//! - `STITCHCRAFT_API_KEY` - API key for authentication (optional for local)

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::{DecreaseRule, ExportFormat};
use crate::models::*;

const DEFAULT_URL: &str = "http://localhost:3000/api/v1";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone)]
pub struct StitchClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl StitchClient {
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("STITCHCRAFT_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var("STITCHCRAFT_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Turn non-success statuses into [`ClientError`]s.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        Self::check(response).await.map(|_| ())
    }

    pub async fn get_pattern(&self, id: Uuid) -> Result<Pattern, ClientError> {
        let response = self
            .request(Method::GET, &format!("/patterns/{}", id))
            .send()
            .await?;
        Self::json(response).await
    }

    pub async fn list_patterns(
        &self,
        owner_id: Option<Uuid>,
    ) -> Result<Vec<PatternSummary>, ClientError> {
        let mut req = self.request(Method::GET, "/patterns");
        if let Some(owner_id) = owner_id {
            req = req.query(&[("owner_id", owner_id.to_string())]);
        }
        Self::json(req.send().await?).await
    }

    pub async fn create_pattern(&self, input: &CreatePatternInput) -> Result<Pattern, ClientError> {
        let response = self
            .request(Method::POST, "/patterns")
            .json(input)
            .send()
            .await?;
        Self::json(response).await
    }

    /// Remove one stitch and return the pattern as saved.
    pub async fn delete_stitch(
        &self,
        pattern_id: Uuid,
        stitch_id: Uuid,
    ) -> Result<Pattern, ClientError> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/patterns/{}/stitches/{}", pattern_id, stitch_id),
            )
            .send()
            .await?;
        Self::json(response).await
    }

    /// Fetch the rendered export of a stored pattern.
    pub async fn export_pattern(
        &self,
        id: Uuid,
        format: ExportFormat,
        rule: Option<DecreaseRule>,
    ) -> Result<String, ClientError> {
        let mut query = vec![("format", format.as_str())];
        if let Some(rule) = rule {
            query.push(("decrease_rule", rule.as_str()));
        }
        let response = self
            .request(Method::GET, &format!("/patterns/{}/export", id))
            .query(&query)
            .send()
            .await?;
        Ok(Self::check(response).await?.text().await?)
    }
}

fn status_error(status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(body),
        StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        _ => ClientError::Server(format!("{}: {}", status, body)),
    }
}
