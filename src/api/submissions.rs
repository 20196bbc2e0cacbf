//! Submission API Endpoints
//!
//! User-facing endpoints for starting tasks and submitting evidence, and
//! admin endpoints for the moderation transitions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::check_admin;
use crate::ledger::LedgerError;
use crate::submission::machine::{SubmissionEngine, SubmissionError};
use crate::submission::model::{Evidence, TaskSubmission};
use crate::username::UsernameOracle;
use crate::validation::rules::{Platform, TaskType};

/// API state for submission endpoints
#[derive(Clone)]
pub struct SubmissionApiState {
    pub engine: Arc<SubmissionEngine>,
    pub oracle: Arc<UsernameOracle>,
    pub admin_api_key: Option<String>,
}

fn error_response(err: SubmissionError) -> (StatusCode, String) {
    let status = match &err {
        SubmissionError::ValidationIncomplete(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionError::MissingRejectionReason => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SubmissionError::Flagged => StatusCode::CONFLICT,
        SubmissionError::RateOrCapExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        SubmissionError::NotFound(_) => StatusCode::NOT_FOUND,
        SubmissionError::Ledger(LedgerError::AccountHalted) => StatusCode::LOCKED,
        SubmissionError::Ledger(_) => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}

// Request/response types

#[derive(Debug, Deserialize)]
pub struct StartTaskRequest {
    pub user_id: String,
    pub task_id: String,
    pub task_type: TaskType,
    pub platform: Platform,
    /// Subscription plan driving the reward multiplier; defaults to free.
    pub plan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub task_id: String,
    pub user_id: String,
    pub task_type: TaskType,
    pub platform: Platform,
    pub status: String,
    pub flagged: bool,
    pub content_question: String,
    pub required_seconds: u32,
    pub timer_seconds: u32,
    pub capsules_earned: i64,
    pub release_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

impl SubmissionResponse {
    fn from_submission(s: &TaskSubmission) -> Self {
        Self {
            id: s.id,
            task_id: s.task_id.clone(),
            user_id: s.user_id.clone(),
            task_type: s.task_type,
            platform: s.platform,
            status: s.status.as_str().to_string(),
            flagged: s.flagged,
            content_question: s.content_question.clone(),
            required_seconds: s.policy.required_seconds,
            timer_seconds: s.timer_seconds,
            capsules_earned: s.capsules_earned,
            release_at: s.release_at(),
            review_notes: s.review_notes.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimerRequest {
    pub seconds: u32,
}

#[derive(Debug, Serialize)]
pub struct TimerResponse {
    pub timer_seconds: u32,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub platform_username: Option<String>,
    pub comment_text: Option<String>,
    pub content_answer: Option<String>,
    pub screenshot_ref: Option<String>,
    #[serde(default)]
    pub attestation_confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    #[serde(flatten)]
    pub submission: SubmissionResponse,
    /// Advisory ownership verdict; `None` when no username was required.
    pub username_check: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub notes: Option<String>,
    pub admin_api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub notes: String,
    pub admin_api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminActionRequest {
    pub admin_api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    pub reason: String,
    pub admin_api_key: String,
}

// Endpoints

/// POST / - start a task under the caller's current policy
pub async fn start_task(
    State(state): State<SubmissionApiState>,
    Json(payload): Json<StartTaskRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    let plan = payload.plan.as_deref().unwrap_or("free");
    let submission = state
        .engine
        .start_task(
            &payload.user_id,
            &payload.task_id,
            payload.task_type,
            payload.platform,
            plan,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// GET /{id}
pub async fn get_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    let submission = state
        .engine
        .get(id)
        .await
        .ok_or((StatusCode::NOT_FOUND, format!("submission not found: {id}")))?;
    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// GET /user/{user_id}
pub async fn list_user_submissions(
    State(state): State<SubmissionApiState>,
    Path(user_id): Path<String>,
) -> Json<Vec<SubmissionResponse>> {
    let submissions = state.engine.list_for_user(&user_id).await;
    Json(
        submissions
            .iter()
            .map(SubmissionResponse::from_submission)
            .collect(),
    )
}

/// POST /{id}/timer - advance the engagement timer (monotone)
pub async fn record_timer(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TimerRequest>,
) -> Result<Json<TimerResponse>, (StatusCode, String)> {
    let timer_seconds = state
        .engine
        .record_timer(id, payload.seconds)
        .await
        .map_err(error_response)?;
    Ok(Json(TimerResponse { timer_seconds }))
}

/// POST /{id}/advance - the single started -> pending entry point
pub async fn advance_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<AdvanceResponse>, (StatusCode, String)> {
    let evidence = Evidence {
        platform_username: payload.platform_username,
        comment_text: payload.comment_text,
        content_answer: payload.content_answer,
        screenshot_ref: payload.screenshot_ref,
        attestation_confirmed: payload.attestation_confirmed,
    };

    let submission = state
        .engine
        .try_advance(id, evidence)
        .await
        .map_err(error_response)?;

    // Ownership is checked opportunistically after acceptance; a negative
    // verdict is surfaced to the caller but blocks nothing.
    let username_check = match (&submission.platform_username, submission.policy.requires_username)
    {
        (Some(username), true) => Some(state.oracle.verify(submission.platform, username).await),
        _ => None,
    };

    Ok(Json(AdvanceResponse {
        submission: SubmissionResponse::from_submission(&submission),
        username_check,
    }))
}

/// POST /{id}/verify - moderation: pending -> verified
pub async fn verify_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;
    let submission = state
        .engine
        .verify(id, payload.notes)
        .await
        .map_err(error_response)?;
    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// POST /{id}/reject - moderation: pending -> rejected (notes required)
pub async fn reject_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;
    let submission = state
        .engine
        .reject(id, &payload.notes)
        .await
        .map_err(error_response)?;
    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// POST /{id}/release - moderation: verified -> released (ledger credit)
pub async fn release_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminActionRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;
    let submission = state.engine.release(id).await.map_err(error_response)?;
    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// POST /{id}/reverse - moderation: verified|released -> reversed
pub async fn reverse_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminActionRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;
    let submission = state.engine.reverse(id).await.map_err(error_response)?;
    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// POST /{id}/flag - hold a submission for manual review
pub async fn flag_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FlagRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;
    let submission = state
        .engine
        .flag(id, &payload.reason)
        .await
        .map_err(error_response)?;
    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// POST /{id}/unflag - clear a flag after review
pub async fn unflag_submission(
    State(state): State<SubmissionApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminActionRequest>,
) -> Result<Json<SubmissionResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;
    let submission = state.engine.unflag(id).await.map_err(error_response)?;
    Ok(Json(SubmissionResponse::from_submission(&submission)))
}

/// Create the submission API router
pub fn create_submission_router(state: SubmissionApiState) -> Router {
    Router::new()
        .route("/", post(start_task))
        .route("/{id}", get(get_submission))
        .route("/{id}/timer", post(record_timer))
        .route("/{id}/advance", post(advance_submission))
        .route("/{id}/verify", post(verify_submission))
        .route("/{id}/reject", post(reject_submission))
        .route("/{id}/release", post(release_submission))
        .route("/{id}/reverse", post(reverse_submission))
        .route("/{id}/flag", post(flag_submission))
        .route("/{id}/unflag", post(unflag_submission))
        .route("/user/{user_id}", get(list_user_submissions))
        .with_state(state)
}
