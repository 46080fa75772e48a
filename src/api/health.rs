use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use super::extract::Context;
use crate::models::audit::{AuditEntry, AuditStatus, Operation};
use crate::AppState;

/// GET /health: liveness only, no dependency checks.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /health/database: pings the audit store and leaves a best-effort
/// audit row about it.
pub async fn database(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
) -> (StatusCode, Json<Value>) {
    let outcome = state.audit.sink().ping().await;

    let status = if outcome.is_ok() { AuditStatus::Sucesso } else { AuditStatus::Falha };
    let entry = AuditEntry::new(Operation::Consultar, status, json!({ "check": "database" }))
        .for_resource("health", None)
        .with_context(&ctx);
    state.audit.record_detached(entry);

    match outcome {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": "ok",
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            tracing::error!("audit store health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "status": "unhealthy",
                    "error": "Falha ao acessar o banco de auditoria.",
                    "details": e.to_string(),
                })),
            )
        }
    }
}

/// GET /health/uniplus: proves the ERP credentials still yield a token.
pub async fn uniplus(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let tokens = state.uniplus.tokens();
    match tokens.get_token().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": "ok",
                "tokenSource": if tokens.is_static() { "static" } else { "oauth" },
                "expiresIn": tokens.remaining_lifetime().map(|d| d.as_secs()),
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "status": "unhealthy",
                "error": err.message,
                "details": err.details,
            })),
        ),
    }
}
