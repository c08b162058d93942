//! Remote HR API client
//!
//! Token-authenticated client for the attendance and device endpoints. The
//! authentication protocol is treated as opaque: credentials go out as
//! headers on the token endpoint, the response carries the token in `hash`,
//! and subsequent requests attach it as `X-CSRF-TOKEN`. A 401 discards the
//! cached token so the next attempt re-authenticates.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::db::queue::PendingKind;
use crate::{Error, Result};

/// Delivery seam used by the pipeline and the retry loop.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, kind: PendingKind, payload: &Value) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    hash: Option<String>,
}

/// HTTP client for the remote HR API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token_path: String,
    attendance_path: String,
    device_path: String,
    email: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token_path: config.token_path.clone(),
            attendance_path: config.attendance_path.clone(),
            device_path: config.device_path.clone(),
            email: config.email.clone(),
            password: config.password.clone(),
            token: RwLock::new(None),
        })
    }

    async fn ensure_authenticated(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        let token = self.login().await?;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    async fn login(&self) -> Result<String> {
        let url = format!("{}{}", self.base_url, self.token_path);
        debug!(url = %url, "requesting API token");

        let response = self
            .http
            .get(&url)
            .header("email", &self.email)
            .header("password", &self.password)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!("authentication failed with status {status}")));
        }

        let body: TokenResponse = response.json().await?;
        body.hash
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| Error::Api("no token in authentication response".to_string()))
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    fn path_for(&self, kind: PendingKind) -> &str {
        match kind {
            PendingKind::Attendance => &self.attendance_path,
            PendingKind::Device => &self.device_path,
        }
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn send(&self, kind: PendingKind, payload: &Value) -> Result<()> {
        let token = self.ensure_authenticated().await?;
        let url = format!("{}{}", self.base_url, self.path_for(kind));

        let response = self
            .http
            .put(&url)
            .header("X-CSRF-TOKEN", token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!(url = %url, "API rejected token, re-authenticating on next attempt");
            self.invalidate_token().await;
            return Err(Error::Api("token rejected with status 401".to_string()));
        }
        if !status.is_success() {
            return Err(Error::Api(format!("{} returned status {status}", self.path_for(kind))));
        }

        debug!(url = %url, kind = kind.as_str(), "payload accepted");
        Ok(())
    }
}
