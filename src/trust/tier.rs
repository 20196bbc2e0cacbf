//! Trust Tier Resolution
//!
//! Maps a trust score to the tier configuration governing payout timing,
//! timer scaling and daily earning caps. The tier is always derived from
//! the score at the moment of use and never stored, so score and tier
//! cannot drift apart.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// The four trust tiers, ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Trusted,
    Normal,
    Restricted,
    Suspended,
}

impl TrustTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::Trusted => "trusted",
            TrustTier::Normal => "normal",
            TrustTier::Restricted => "restricted",
            TrustTier::Suspended => "suspended",
        }
    }
}

/// Effective parameters for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub tier: TrustTier,

    /// Maximum capsules a user may earn per calendar day. `None` = uncapped.
    pub daily_earning_cap: Option<i64>,

    /// Hours a verified submission's reward is held before release.
    pub pending_duration_hours: f64,

    /// Always true in current policy; kept explicit so the policy can be
    /// relaxed per tier without touching the state machine.
    pub screenshot_required: bool,

    /// Scales the per-task minimum engagement timer.
    pub timer_multiplier: f64,
}

impl TierConfig {
    /// Suspended users cannot start new tasks at all.
    pub fn can_start_tasks(&self) -> bool {
        self.tier != TrustTier::Suspended
    }

    pub fn pending_duration(&self) -> Duration {
        Duration::seconds((self.pending_duration_hours * 3600.0) as i64)
    }
}

/// Score boundaries and per-tier parameters.
///
/// Injected wherever a tier decision is made so that thresholds live in
/// exactly one place; changing a boundary never touches any other
/// component. Bounds are half-open: suspended [0,20), restricted [20,50),
/// normal [50,80), trusted [80,100].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTable {
    pub trusted_min: i32,
    pub normal_min: i32,
    pub restricted_min: i32,

    pub trusted: TierConfig,
    pub normal: TierConfig,
    pub restricted: TierConfig,
    pub suspended: TierConfig,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            trusted_min: 80,
            normal_min: 50,
            restricted_min: 20,
            trusted: TierConfig {
                tier: TrustTier::Trusted,
                daily_earning_cap: None,
                pending_duration_hours: 0.0,
                screenshot_required: true,
                timer_multiplier: 1.0,
            },
            normal: TierConfig {
                tier: TrustTier::Normal,
                daily_earning_cap: None,
                pending_duration_hours: 0.5,
                screenshot_required: true,
                timer_multiplier: 1.0,
            },
            restricted: TierConfig {
                tier: TrustTier::Restricted,
                daily_earning_cap: Some(40),
                pending_duration_hours: 24.0,
                screenshot_required: true,
                timer_multiplier: 1.5,
            },
            suspended: TierConfig {
                tier: TrustTier::Suspended,
                daily_earning_cap: Some(0),
                pending_duration_hours: 72.0,
                screenshot_required: true,
                timer_multiplier: 2.0,
            },
        }
    }
}

impl TierTable {
    /// Resolve a score to its tier configuration.
    ///
    /// Total over all integers: anything >= `trusted_min` is trusted,
    /// anything below `restricted_min` is suspended. Callers clamp scores
    /// to [0,100] before persisting them; the resolver itself never
    /// rejects input.
    pub fn resolve(&self, score: i32) -> &TierConfig {
        if score >= self.trusted_min {
            &self.trusted
        } else if score >= self.normal_min {
            &self.normal
        } else if score >= self.restricted_min {
            &self.restricted
        } else {
            &self.suspended
        }
    }
}
