use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use capsule_engine::{
    create_ledger_router, create_submission_router, create_trust_router, CapsuleLedger,
    DatabasePool, EngineConfig, LedgerApiState, PenaltyEngine, RuleSet, SubmissionApiState,
    SubmissionEngine, TrustApiState, TrustManager, UsernameOracle,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = EngineConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {e}");
        e
    })?;

    init_logging(&config);

    info!("Starting Capsule Task Engine");
    info!(
        "Trust thresholds: restricted>={}, normal>={}, trusted>={}, slash ratio {}x",
        config.trust.restricted_min,
        config.trust.normal_min,
        config.trust.trusted_min,
        config.trust.reversal_slash_ratio
    );

    let db = if config.database.postgres_enabled {
        match DatabasePool::new(&config.database.postgres_url).await {
            Ok(db) => {
                db.init_schema()
                    .await
                    .map_err(|e| anyhow::anyhow!(e))
                    .context("Failed to initialize database schema")?;
                Some(Arc::new(db))
            }
            Err(e) => {
                warn!("PostgreSQL unavailable ({e}); running in-memory only");
                None
            }
        }
    } else {
        info!("PostgreSQL disabled; running in-memory only");
        None
    };

    // Core components. The tier table and penalty policy are snapshots of
    // the validated configuration, injected rather than read globally.
    let mut trust = TrustManager::new(config.trust.to_tier_table());
    if let Some(ref db) = db {
        trust = trust.with_database(db.clone());
    }
    let trust = Arc::new(trust);

    let mut ledger = CapsuleLedger::new();
    if let Some(ref db) = db {
        ledger = ledger.with_database(db.clone());
    }
    let ledger = Arc::new(ledger);

    let penalties = Arc::new(PenaltyEngine::new(
        trust.clone(),
        ledger.clone(),
        config.trust.to_penalty_policy(),
    ));

    let mut engine = SubmissionEngine::new(
        RuleSet::default(),
        config.rewards.clone(),
        trust.clone(),
        ledger.clone(),
        penalties.clone(),
    );
    if let Some(ref db) = db {
        engine = engine.with_database(db.clone());
    }
    let engine = Arc::new(engine);

    let oracle = Arc::new(UsernameOracle::new(config.username_oracle.clone()));
    if config.username_oracle.endpoint.is_some() {
        info!("Username-ownership oracle enabled (advisory)");
    }

    if config.admin_api_key.is_none() {
        warn!("CAPSULE_ADMIN_API_KEY not set; moderation endpoints are disabled");
    }

    let app = Router::new()
        .route("/health", get(health))
        .nest(
            "/submissions",
            create_submission_router(SubmissionApiState {
                engine: engine.clone(),
                oracle,
                admin_api_key: config.admin_api_key.clone(),
            }),
        )
        .nest(
            "/trust",
            create_trust_router(TrustApiState {
                trust: trust.clone(),
                penalties: penalties.clone(),
                admin_api_key: config.admin_api_key.clone(),
            }),
        )
        .nest(
            "/ledger",
            create_ledger_router(LedgerApiState {
                ledger: ledger.clone(),
                admin_api_key: config.admin_api_key.clone(),
            }),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

fn init_logging(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
