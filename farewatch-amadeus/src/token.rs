use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use farewatch_core::supplier::SupplierError;

/// Seconds before the stated expiry at which a cached token is refreshed.
const EXPIRY_SLACK_SECS: i64 = 60;

/// Capability seam for obtaining a bearer token for outbound supplier calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, SupplierError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(EXPIRY_SLACK_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

/// OAuth2 client-credentials token source with a process-wide cache.
///
/// The cached token is reused until shortly before expiry. Concurrent
/// refreshes are allowed to race; every fetched token is equally valid, so
/// the last write wins.
pub struct OAuthTokenProvider {
    http: reqwest::Client,
    token_url: String,
    api_key: String,
    api_secret: String,
    cached: RwLock<Option<CachedToken>>,
}

impl OAuthTokenProvider {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/v1/security/oauth2/token", base_url),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            cached: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, SupplierError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(SupplierError::MissingCredentials);
        }

        let now = Utc::now();
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SupplierError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "supplier auth failed");
            return Err(SupplierError::Auth {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SupplierError::Decode(e.to_string()))?;

        Ok(CachedToken {
            token: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn bearer_token(&self) -> Result<String, SupplierError> {
        let now = Utc::now();
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *self.cached.write().await = Some(fresh);
        tracing::debug!("supplier access token refreshed");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_fresh_until_slack_window() {
        let cached = CachedToken {
            token: "t".to_string(),
            expires_at: Utc::now() + Duration::seconds(300),
        };
        assert!(cached.is_fresh(Utc::now()));
    }

    #[test]
    fn test_token_stale_inside_slack_window() {
        let now = Utc::now();
        let cached = CachedToken {
            token: "t".to_string(),
            expires_at: now + Duration::seconds(EXPIRY_SLACK_SECS - 1),
        };
        assert!(!cached.is_fresh(now));
    }

    #[test]
    fn test_expired_token_is_stale() {
        let now = Utc::now();
        let cached = CachedToken {
            token: "t".to_string(),
            expires_at: now - Duration::seconds(10),
        };
        assert!(!cached.is_fresh(now));
    }
}
