//! Main Porkbun API client implementation.

use crate::api::{DnssecApi, DomainApi};
use crate::config::{RateLimit, RetryConfig};
use crate::wire::{Authenticated, Empty, Envelope, PingResponse};
use dssync_core::{Result, SyncError};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// The Porkbun API base URL
const DEFAULT_BASE_URL: &str = "https://api.porkbun.com/api/json/v3";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Porkbun registrar API client
#[derive(Clone)]
pub struct PorkbunClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    api_key: String,
    secret_api_key: String,
    base_url: Url,
    timeout: Duration,
    retry_config: RetryConfig,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl PorkbunClient {
    /// Create a client with default settings
    pub fn new(api_key: impl Into<String>, secret_api_key: impl Into<String>) -> Result<Self> {
        PorkbunClientBuilder::new(api_key, secret_api_key).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(
        api_key: impl Into<String>,
        secret_api_key: impl Into<String>,
    ) -> PorkbunClientBuilder {
        PorkbunClientBuilder::new(api_key, secret_api_key)
    }

    /// Access domain listing and nameserver endpoints
    #[must_use]
    pub fn domains(&self) -> DomainApi<'_> {
        DomainApi::new(self)
    }

    /// Access DNSSEC (DS record) endpoints
    #[must_use]
    pub fn dnssec(&self) -> DnssecApi<'_> {
        DnssecApi::new(self)
    }

    /// Check credentials; returns the caller's public IP as seen by the registrar
    pub async fn ping(&self) -> Result<String> {
        let resp: PingResponse = self.call(&["ping"], &Empty {}).await?;
        Ok(resp.your_ip.unwrap_or_default())
    }

    /// Perform an authenticated call.
    ///
    /// `path` is given as segments so that domain names and record ids are
    /// escaped correctly.
    pub(crate) async fn call<T, B>(&self, path: &[&str], body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = self.build_url(path)?;
        let retry = &self.inner.retry_config;
        let mut attempt = 0;

        loop {
            match self.call_once(&url, body).await {
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let backoff = retry.backoff_for(attempt);
                    warn!(url = %url, error = %e, attempt, ?backoff, "retrying registrar call");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn call_once<T, B>(&self, url: &Url, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        if let Some(limiter) = &self.inner.limiter {
            limiter.until_ready().await;
        }

        debug!(url = %url, "POST request");

        let payload = Authenticated {
            apikey: &self.inner.api_key,
            secretapikey: &self.inner.secret_api_key,
            body,
        };

        let response = self
            .inner
            .http
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        self.handle_response(url, response).await
    }

    /// Build the URL for a call below the base URL
    fn build_url(&self, path: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SyncError::Config(format!("invalid base URL: {}", self.inner.base_url)))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    fn transport_error(&self, e: &reqwest::Error) -> SyncError {
        if e.is_timeout() {
            SyncError::Timeout(self.inner.timeout.as_secs())
        } else {
            SyncError::Transport(e.to_string())
        }
    }

    /// Classify a response: transport failure, registrar rejection, or payload
    async fn handle_response<T: DeserializeOwned>(
        &self,
        url: &Url,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(&e))?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(SyncError::Unauthorized);
        }

        let envelope = match serde_json::from_str::<Envelope>(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(SyncError::Json(e)),
            Err(_) => {
                return Err(SyncError::Registrar {
                    code: status.as_u16(),
                    message: truncate(&body, 200),
                })
            }
        };

        if !envelope.is_success() || !status.is_success() {
            let message = envelope
                .message
                .unwrap_or_else(|| format!("status {}", envelope.status));
            warn!(url = %url, code = status.as_u16(), message = %message, "registrar rejected request");

            if message.to_ascii_lowercase().contains("invalid api key") {
                return Err(SyncError::Unauthorized);
            }
            return Err(SyncError::Registrar {
                code: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(SyncError::Json)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    }
}

/// Builder for configuring a [`PorkbunClient`]
pub struct PorkbunClientBuilder {
    api_key: String,
    secret_api_key: String,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
    rate_limit: Option<RateLimit>,
}

impl PorkbunClientBuilder {
    /// Create a new builder with the given API key pair
    #[must_use]
    pub fn new(api_key: impl Into<String>, secret_api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_api_key: secret_api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("dssync/{}", env!("CARGO_PKG_VERSION")),
            retry_config: RetryConfig::default(),
            rate_limit: None,
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Limit the request rate
    #[must_use]
    pub const fn rate_limit(mut self, limit: Option<RateLimit>) -> Self {
        self.rate_limit = limit;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<PorkbunClient> {
        if self.api_key.is_empty() || self.secret_api_key.is_empty() {
            return Err(SyncError::Config("API key pair must not be empty".into()));
        }

        let base_url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Config(format!("invalid base URL {}: {e}", self.base_url)))?;

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        let limiter = self
            .rate_limit
            .map(|limit| RateLimiter::direct(Quota::per_second(limit.per_second)));

        Ok(PorkbunClient {
            inner: Arc::new(ClientInner {
                http,
                api_key: self.api_key,
                secret_api_key: self.secret_api_key,
                base_url,
                timeout: self.timeout,
                retry_config: self.retry_config,
                limiter,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> PorkbunClient {
        PorkbunClient::builder("pk1", "sk1").base_url(base).build().unwrap()
    }

    #[test]
    fn url_segments_are_escaped() {
        let c = client("https://api.example.test/api/json/v3/");
        let url = c.build_url(&["dns", "deleteDnssecRecord", "example.com", "a b"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.test/api/json/v3/dns/deleteDnssecRecord/example.com/a%20b"
        );
    }

    #[test]
    fn empty_credentials_are_a_config_error() {
        assert!(matches!(
            PorkbunClient::new("", "sk1"),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        assert!(matches!(
            PorkbunClient::builder("pk1", "sk1").base_url("not a url").build(),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
