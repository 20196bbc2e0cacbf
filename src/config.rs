//! Configuration management
//!
//! All policy knobs (tier thresholds, rewards, slashing) live here and
//! are injected into the components that need them; nothing reads
//! ambient global state. In-flight submissions hold their own policy
//! snapshot, so configuration changes never retroactively affect them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use url::Url;

use crate::trust::penalty::PenaltyPolicy;
use crate::trust::tier::{TierConfig, TierTable, TrustTier};
use crate::validation::rules::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    /// Admin API key for moderation/governance endpoints.
    pub admin_api_key: Option<String>,
    pub username_oracle: UsernameOracleConfig,
    pub trust: TrustPolicyConfig,
    pub rewards: RewardTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, the engine runs in-memory only)
    pub postgres_enabled: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/capsule_engine".to_string(),
            postgres_enabled: false,
        }
    }
}

/// Best-effort username-ownership oracle. Its verdict is advisory and
/// never blocks a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameOracleConfig {
    /// Verification endpoint; `None` disables lookups entirely.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub cache_ttl_hours: i64,
}

impl Default for UsernameOracleConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 10,
            cache_ttl_hours: 24,
        }
    }
}

/// Per-tier parameters exposed to configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierParams {
    pub daily_earning_cap: Option<i64>,
    pub pending_duration_hours: f64,
    pub timer_multiplier: f64,
}

/// Trust policy: tier boundaries, per-tier parameters, slashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPolicyConfig {
    pub trusted_min: i32,
    pub normal_min: i32,
    pub restricted_min: i32,

    pub trusted: TierParams,
    pub normal: TierParams,
    pub restricted: TierParams,
    pub suspended: TierParams,

    /// Reversal debit as a multiple of the original credit.
    pub reversal_slash_ratio: f64,
    /// Cooldown imposed on a confirmed abuse report.
    pub abuse_cooldown_hours: f64,
}

impl Default for TrustPolicyConfig {
    fn default() -> Self {
        let defaults = TierTable::default();
        let params = |c: &TierConfig| TierParams {
            daily_earning_cap: c.daily_earning_cap,
            pending_duration_hours: c.pending_duration_hours,
            timer_multiplier: c.timer_multiplier,
        };
        Self {
            trusted_min: defaults.trusted_min,
            normal_min: defaults.normal_min,
            restricted_min: defaults.restricted_min,
            trusted: params(&defaults.trusted),
            normal: params(&defaults.normal),
            restricted: params(&defaults.restricted),
            suspended: params(&defaults.suspended),
            reversal_slash_ratio: 1.5,
            abuse_cooldown_hours: 48.0,
        }
    }
}

impl TrustPolicyConfig {
    /// Convert to the tier table consumed by the resolver.
    pub fn to_tier_table(&self) -> TierTable {
        let config = |tier: TrustTier, p: &TierParams| TierConfig {
            tier,
            daily_earning_cap: p.daily_earning_cap,
            pending_duration_hours: p.pending_duration_hours,
            screenshot_required: true,
            timer_multiplier: p.timer_multiplier,
        };
        TierTable {
            trusted_min: self.trusted_min,
            normal_min: self.normal_min,
            restricted_min: self.restricted_min,
            trusted: config(TrustTier::Trusted, &self.trusted),
            normal: config(TrustTier::Normal, &self.normal),
            restricted: config(TrustTier::Restricted, &self.restricted),
            suspended: config(TrustTier::Suspended, &self.suspended),
        }
    }

    pub fn to_penalty_policy(&self) -> PenaltyPolicy {
        PenaltyPolicy {
            reversal_slash_ratio: self.reversal_slash_ratio,
            abuse_cooldown_hours: self.abuse_cooldown_hours,
        }
    }
}

/// External reward configuration: per-task-type base rewards and plan
/// multipliers. `capsules_earned = floor(base * multiplier)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTable {
    base_rewards: HashMap<TaskType, i64>,
    plan_multipliers: HashMap<String, f64>,
}

impl Default for RewardTable {
    fn default() -> Self {
        let mut base_rewards = HashMap::new();
        base_rewards.insert(TaskType::Like, 5);
        base_rewards.insert(TaskType::Comment, 10);
        base_rewards.insert(TaskType::Follow, 8);
        base_rewards.insert(TaskType::Watch, 12);
        base_rewards.insert(TaskType::Visit, 3);

        let mut plan_multipliers = HashMap::new();
        plan_multipliers.insert("free".to_string(), 1.0);
        plan_multipliers.insert("premium".to_string(), 1.5);

        Self {
            base_rewards,
            plan_multipliers,
        }
    }
}

impl RewardTable {
    pub fn base_reward(&self, task_type: TaskType) -> i64 {
        self.base_rewards.get(&task_type).copied().unwrap_or(5)
    }

    /// Unknown plans fall back to 1.0 rather than failing a task start.
    pub fn plan_multiplier(&self, plan: &str) -> f64 {
        self.plan_multipliers.get(plan).copied().unwrap_or(1.0)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8090,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            database: DatabaseConfig::default(),
            admin_api_key: None,
            username_oracle: UsernameOracleConfig::default(),
            trust: TrustPolicyConfig::default(),
            rewards: RewardTable::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables and validate it.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("CAPSULE_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("CAPSULE_PORT") {
            config.server.port = port.parse().context("Invalid CAPSULE_PORT value")?;
        }
        if let Ok(level) = env::var("CAPSULE_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(url) = env::var("CAPSULE_POSTGRES_URL") {
            config.database.postgres_url = url;
        }
        if let Ok(enabled) = env::var("CAPSULE_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid CAPSULE_POSTGRES_ENABLED value")?;
        }

        if let Ok(key) = env::var("CAPSULE_ADMIN_API_KEY") {
            config.admin_api_key = Some(key);
        }

        if let Ok(endpoint) = env::var("CAPSULE_USERNAME_ORACLE_URL") {
            config.username_oracle.endpoint = Some(endpoint);
        }
        if let Ok(timeout) = env::var("CAPSULE_USERNAME_ORACLE_TIMEOUT_SECS") {
            config.username_oracle.timeout_secs = timeout
                .parse()
                .context("Invalid CAPSULE_USERNAME_ORACLE_TIMEOUT_SECS value")?;
        }

        if let Ok(min) = env::var("CAPSULE_TRUSTED_MIN") {
            config.trust.trusted_min = min.parse().context("Invalid CAPSULE_TRUSTED_MIN value")?;
        }
        if let Ok(min) = env::var("CAPSULE_NORMAL_MIN") {
            config.trust.normal_min = min.parse().context("Invalid CAPSULE_NORMAL_MIN value")?;
        }
        if let Ok(min) = env::var("CAPSULE_RESTRICTED_MIN") {
            config.trust.restricted_min = min
                .parse()
                .context("Invalid CAPSULE_RESTRICTED_MIN value")?;
        }
        if let Ok(ratio) = env::var("CAPSULE_SLASH_RATIO") {
            config.trust.reversal_slash_ratio =
                ratio.parse().context("Invalid CAPSULE_SLASH_RATIO value")?;
        }
        if let Ok(hours) = env::var("CAPSULE_ABUSE_COOLDOWN_HOURS") {
            config.trust.abuse_cooldown_hours = hours
                .parse()
                .context("Invalid CAPSULE_ABUSE_COOLDOWN_HOURS value")?;
        }

        if let Ok(multiplier) = env::var("CAPSULE_PREMIUM_MULTIPLIER") {
            let multiplier: f64 = multiplier
                .parse()
                .context("Invalid CAPSULE_PREMIUM_MULTIPLIER value")?;
            config
                .rewards
                .plan_multipliers
                .insert("premium".to_string(), multiplier);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        let t = &self.trust;
        if !(0 < t.restricted_min && t.restricted_min < t.normal_min && t.normal_min < t.trusted_min)
        {
            return Err(anyhow::anyhow!(
                "Tier thresholds must satisfy 0 < restricted < normal < trusted, got {}/{}/{}",
                t.restricted_min,
                t.normal_min,
                t.trusted_min
            ));
        }
        if t.trusted_min > 100 {
            return Err(anyhow::anyhow!(
                "Trusted threshold {} exceeds the score ceiling of 100",
                t.trusted_min
            ));
        }
        if t.reversal_slash_ratio < 1.0 {
            return Err(anyhow::anyhow!(
                "Reversal slash ratio must be >= 1.0 so reversals are never profitable, got {}",
                t.reversal_slash_ratio
            ));
        }
        for params in [&t.trusted, &t.normal, &t.restricted, &t.suspended] {
            if params.timer_multiplier <= 0.0 {
                return Err(anyhow::anyhow!("Timer multipliers must be positive"));
            }
            if params.pending_duration_hours < 0.0 {
                return Err(anyhow::anyhow!("Pending durations cannot be negative"));
            }
        }

        for (task_type, reward) in &self.rewards.base_rewards {
            if *reward <= 0 {
                return Err(anyhow::anyhow!(
                    "Base reward for {} must be positive",
                    task_type.as_str()
                ));
            }
        }
        for (plan, multiplier) in &self.rewards.plan_multipliers {
            if *multiplier <= 0.0 {
                return Err(anyhow::anyhow!("Multiplier for plan {plan} must be positive"));
            }
        }

        if let Some(ref endpoint) = self.username_oracle.endpoint {
            Url::parse(endpoint).context("Invalid CAPSULE_USERNAME_ORACLE_URL")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let mut config = EngineConfig::default();
        config.trust.normal_min = 85; // above trusted_min
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profitable_slash_ratio_rejected() {
        let mut config = EngineConfig::default();
        config.trust.reversal_slash_ratio = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reward_table_fallbacks() {
        let rewards = RewardTable::default();
        assert_eq!(rewards.base_reward(TaskType::Comment), 10);
        assert_eq!(rewards.plan_multiplier("premium"), 1.5);
        assert_eq!(rewards.plan_multiplier("unknown_plan"), 1.0);
    }

    #[test]
    fn test_tier_table_round_trip() {
        let table = TrustPolicyConfig::default().to_tier_table();
        assert_eq!(table.resolve(65).tier, TrustTier::Normal);
        assert_eq!(table.resolve(30).timer_multiplier, 1.5);
    }
}
