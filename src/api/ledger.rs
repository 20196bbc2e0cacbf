//! Ledger API Endpoints
//!
//! Balance and history reads, spend debits, and admin credit/debit. All
//! mutations go through the atomic ledger operations; the admin debit is
//! capped at the current balance.

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
use crate::ledger::{CapsuleLedger, EntryType, LedgerError};

/// API state for ledger endpoints
#[derive(Clone)]
pub struct LedgerApiState {
    pub ledger: Arc<CapsuleLedger>,
    pub admin_api_key: Option<String>,
}

fn error_response(err: LedgerError) -> (StatusCode, String) {
    let status = match &err {
        LedgerError::InsufficientBalance { .. } => StatusCode::CONFLICT,
        LedgerError::NonPositiveAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::AccountHalted => StatusCode::LOCKED,
    };
    (status, err.to_string())
}

// Request/response types

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct EntrySummary {
    pub id: Uuid,
    pub entry_type: EntryType,
    pub amount: i64,
    pub balance_after: i64,
    pub description: String,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub user_id: String,
    pub balance: i64,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    pub amount: i64,
    /// `purchased` for payment-gateway credits, defaults to admin_credit.
    pub entry_type: Option<EntryType>,
    pub description: String,
    pub reference_id: Option<String>,
    pub admin_api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct SpendRequest {
    pub amount: i64,
    pub description: String,
    pub reference_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminDebitRequest {
    pub amount: i64,
    pub description: String,
    pub reference_id: Option<String>,
    pub admin_api_key: String,
}

#[derive(Debug, Serialize)]
pub struct AdminDebitResponse {
    pub user_id: String,
    pub requested: i64,
    pub debited: i64,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    pub admin_api_key: String,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub user_id: String,
    pub valid: bool,
    pub halted: bool,
}

// Endpoints

/// GET /{user_id}/balance
pub async fn get_balance(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
) -> Json<BalanceResponse> {
    let balance = state.ledger.balance(&user_id).await;
    Json(BalanceResponse { user_id, balance })
}

/// GET /{user_id}/entries
pub async fn get_entries(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
) -> Json<EntriesResponse> {
    let entries = state.ledger.entries(&user_id).await;
    let balance = state.ledger.balance(&user_id).await;

    let entries = entries
        .into_iter()
        .map(|e| EntrySummary {
            id: e.id,
            entry_type: e.entry_type,
            amount: e.amount,
            balance_after: e.balance_after,
            description: e.description,
            reference_id: e.reference_id,
            created_at: e.created_at,
        })
        .collect();

    Json(EntriesResponse {
        user_id,
        balance,
        entries,
    })
}

/// POST /{user_id}/credit - admin or purchase credit (no upper bound)
pub async fn credit_capsules(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<CreditRequest>,
) -> Result<Json<BalanceResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;

    let entry_type = payload.entry_type.unwrap_or(EntryType::AdminCredit);
    let balance = state
        .ledger
        .credit(
            &user_id,
            payload.amount,
            entry_type,
            &payload.description,
            payload.reference_id,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(BalanceResponse { user_id, balance }))
}

/// POST /{user_id}/spend - user-initiated debit; fails hard when the
/// amount exceeds the balance
pub async fn spend_capsules(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<SpendRequest>,
) -> Result<Json<BalanceResponse>, (StatusCode, String)> {
    let balance = state
        .ledger
        .debit(
            &user_id,
            payload.amount,
            EntryType::Spent,
            &payload.description,
            payload.reference_id,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(BalanceResponse { user_id, balance }))
}

/// POST /{user_id}/debit - admin debit, capped at the current balance
pub async fn admin_debit_capsules(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<AdminDebitRequest>,
) -> Result<Json<AdminDebitResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;

    let (debited, balance) = state
        .ledger
        .debit_capped(
            &user_id,
            payload.amount,
            EntryType::AdminDebit,
            &payload.description,
            payload.reference_id,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(AdminDebitResponse {
        user_id,
        requested: payload.amount,
        debited,
        balance,
    }))
}

/// POST /{user_id}/audit - re-check the running-sum invariant
pub async fn audit_account(
    State(state): State<LedgerApiState>,
    Path(user_id): Path<String>,
    Json(payload): Json<AuditRequest>,
) -> Result<Json<AuditResponse>, (StatusCode, String)> {
    check_admin(&state.admin_api_key, &payload.admin_api_key)?;

    let valid = state.ledger.verify_audit_trail(&user_id).await;
    let halted = state.ledger.is_halted(&user_id).await;
    Ok(Json(AuditResponse {
        user_id,
        valid,
        halted,
    }))
}

/// Create the ledger API router
pub fn create_ledger_router(state: LedgerApiState) -> Router {
    Router::new()
        .route("/{user_id}/balance", get(get_balance))
        .route("/{user_id}/entries", get(get_entries))
        .route("/{user_id}/credit", post(credit_capsules))
        .route("/{user_id}/spend", post(spend_capsules))
        .route("/{user_id}/debit", post(admin_debit_capsules))
        .route("/{user_id}/audit", post(audit_account))
        .with_state(state)
}
