//! Trust API Endpoints
//!
//! Monitoring and governance endpoints for the trust system.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::check_admin;
use crate::trust::manager::TrustManager;
use crate::trust::penalty::{PenaltyEngine, TrustSignal};
use crate::trust::tier::TrustTier;

/// API state for trust endpoints
#[derive(Clone)]
pub struct TrustApiState {
    pub trust: Arc<TrustManager>,
    pub penalties: Arc<PenaltyEngine>,
    pub admin_api_key: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct TrustResponse {
    pub user_id: String,
    pub score: i32,
    pub tier: TrustTier,
    pub daily_earning_cap: Option<i64>,
    pub pending_duration_hours: f64,
    pub timer_multiplier: f64,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub total_capsules_earned: i64,
    pub total_capsules_slashed: i64,
    pub total_tasks_completed: u64,
    pub total_tasks_rejected: u64,
    pub last_task_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    pub signal: TrustSignal,
    pub admin_api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub user_id: String,
    pub signal: TrustSignal,
    pub delta: i32,
    pub score: i32,
}

#[derive(Debug, Deserialize)]
pub struct CooldownRequest {
    /// Zero clears an active cooldown.
    pub hours: f64,
    pub admin_api_key: String,
}

#[derive(Debug, Serialize)]
pub struct CooldownResponse {
    pub user_id: String,
    pub cooldown_until: Option<DateTime<Utc>>,
}

// Endpoints

/// GET /{user_id} - score, derived tier, and lifetime stats
pub async fn get_trust(
    State(state): State<TrustApiState>,
    Path(user_id): Path<String>,
) -> Json<TrustResponse> {
    let score = state.trust.get_score(&user_id).await;
    let tier = state.trust.tier_for(&user_id).await;

    Json(TrustResponse {
        user_id,
        score: score.score,
        tier: tier.tier,
        daily_earning_cap: tier.daily_earning_cap,
        pending_duration_hours: tier.pending_duration_hours,
        timer_multiplier: tier.timer_multiplier,
        cooldown_until: score.cooldown_until,
        total_capsules_earned: score.total_capsules_earned,
        total_capsules_slashed: score.total_capsules_slashed,
        total_tasks_completed: score.total_tasks_completed,
        total_tasks_rejected: score.total_tasks_rejected,
        last_task_at: score.last_task_at,
    })
}

/// POST /{user_id}/signal - apply a trust signal (moderation/analytics)
pub async fn apply_signal(
    State(state): State<TrustApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<SignalRequest>,
) -> Result<Json<SignalResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;

    let score = state.penalties.apply_signal(&user_id, payload.signal).await;
    Ok(Json(SignalResponse {
        user_id,
        signal: payload.signal,
        delta: payload.signal.score_delta(),
        score,
    }))
}

/// POST /{user_id}/cooldown - impose or clear a cooldown
pub async fn set_cooldown(
    State(state): State<TrustApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<CooldownRequest>,
) -> Result<Json<CooldownResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;

    state.penalties.impose_cooldown(&user_id, payload.hours).await;
    let score = state.trust.get_score(&user_id).await;
    Ok(Json(CooldownResponse {
        user_id,
        cooldown_until: score.cooldown_until,
    }))
}

/// Create the trust API router
pub fn create_trust_router(state: TrustApiState) -> Router {
    Router::new()
        .route("/{user_id}", get(get_trust))
        .route("/{user_id}/signal", post(apply_signal))
        .route("/{user_id}/cooldown", post(set_cooldown))
        .with_state(state)
}
