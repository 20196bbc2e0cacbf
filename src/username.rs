//! Username-Ownership Oracle Client
//!
//! Best-effort check that a claimed platform username exists and belongs
//! to the user. The verdict is advisory: a negative answer is surfaced to
//! the user but never blocks a submission, and any transport failure
//! counts as "unknown" (treated as valid). Verdicts are cached ~24h.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::UsernameOracleConfig;
use crate::validation::rules::Platform;

#[derive(Debug, Deserialize)]
struct OracleResponse {
    is_valid: bool,
}

#[derive(Debug, Clone, Copy)]
struct CachedVerdict {
    is_valid: bool,
    fetched_at: DateTime<Utc>,
}

pub struct UsernameOracle {
    client: Client,
    config: UsernameOracleConfig,
    cache: RwLock<HashMap<String, CachedVerdict>>,
}

impl UsernameOracle {
    pub fn new(config: UsernameOracleConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("capsule-engine/0.1")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cache_key(platform: Platform, username: &str) -> String {
        format!("{}:{}", platform.as_str(), username.trim().to_lowercase())
    }

    fn is_fresh(&self, verdict: &CachedVerdict) -> bool {
        Utc::now() - verdict.fetched_at < chrono::Duration::hours(self.config.cache_ttl_hours)
    }

    /// Check username ownership. Returns the oracle's verdict, or `true`
    /// when the oracle is disabled or unreachable.
    pub async fn verify(&self, platform: Platform, username: &str) -> bool {
        let key = Self::cache_key(platform, username);

        {
            let cache = self.cache.read().await;
            if let Some(verdict) = cache.get(&key) {
                if self.is_fresh(verdict) {
                    return verdict.is_valid;
                }
            }
        }

        let Some(ref endpoint) = self.config.endpoint else {
            return true;
        };

        let is_valid = match self
            .client
            .get(endpoint)
            .query(&[("platform", platform.as_str()), ("username", username)])
            .send()
            .await
        {
            Ok(response) => match response.json::<OracleResponse>().await {
                Ok(body) => body.is_valid,
                Err(e) => {
                    warn!(error = %e, "Username oracle returned an unreadable body");
                    true
                }
            },
            Err(e) => {
                warn!(error = %e, "Username oracle unreachable");
                true
            }
        };

        debug!(
            platform = platform.as_str(),
            username = %username,
            is_valid,
            "Username ownership checked"
        );

        let mut cache = self.cache.write().await;
        cache.insert(
            key,
            CachedVerdict {
                is_valid,
                fetched_at: Utc::now(),
            },
        );
        is_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_oracle_is_permissive() {
        let oracle = UsernameOracle::new(UsernameOracleConfig::default());
        assert!(oracle.verify(Platform::Instagram, "@alice").await);
    }

    #[tokio::test]
    async fn test_cache_serves_stored_verdict() {
        let oracle = UsernameOracle::new(UsernameOracleConfig::default());
        {
            let mut cache = oracle.cache.write().await;
            cache.insert(
                UsernameOracle::cache_key(Platform::Tiktok, "@bob"),
                CachedVerdict {
                    is_valid: false,
                    fetched_at: Utc::now(),
                },
            );
        }
        assert!(!oracle.verify(Platform::Tiktok, "@Bob ").await);
    }

    #[test]
    fn test_cache_key_normalizes() {
        assert_eq!(
            UsernameOracle::cache_key(Platform::Twitter, " @Alice"),
            UsernameOracle::cache_key(Platform::Twitter, "@alice ")
        );
    }
}
