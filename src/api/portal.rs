use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::AppState;

type ApiResult = Result<Json<Value>, AppError>;

fn ok(data: Value) -> ApiResult {
    Ok(Json(json!({ "success": true, "data": data })))
}

fn require_document(cpfcnpj: &str) -> Result<(), AppError> {
    if cpfcnpj.trim().is_empty() {
        return Err(AppError::validation("CPF/CNPJ obrigatorio."));
    }
    Ok(())
}

/// POST /api/portal/bloquear-contrato/:cpfcnpj
pub async fn bloquear_contrato(State(state): State<Arc<AppState>>, Path(cpfcnpj): Path<String>) -> ApiResult {
    require_document(&cpfcnpj)?;
    tracing::info!("blocking contract");
    ok(state.portal.bloquear_contrato(&cpfcnpj).await?)
}

/// POST /api/portal/desbloquear-contrato/:cpfcnpj
pub async fn desbloquear_contrato(State(state): State<Arc<AppState>>, Path(cpfcnpj): Path<String>) -> ApiResult {
    require_document(&cpfcnpj)?;
    tracing::info!("unblocking contract");
    ok(state.portal.desbloquear_contrato(&cpfcnpj).await?)
}

/// GET /api/portal/contratos
pub async fn listar_contratos(State(state): State<Arc<AppState>>) -> ApiResult {
    ok(state.portal.listar_contratos().await?)
}

/// GET /api/portal/contratos/:status
pub async fn listar_contratos_por_status(State(state): State<Arc<AppState>>, Path(status): Path<String>) -> ApiResult {
    ok(state.portal.listar_contratos_por_status(&status).await?)
}

/// GET /api/portal/contrato/:cpfcnpj
pub async fn obter_contrato(State(state): State<Arc<AppState>>, Path(cpfcnpj): Path<String>) -> ApiResult {
    ok(state.portal.obter_contrato(&cpfcnpj).await?)
}

/// GET /api/portal/contrato/:cpfcnpj/:status
pub async fn obter_contrato_por_status(
    State(state): State<Arc<AppState>>,
    Path((cpfcnpj, status)): Path<(String, String)>,
) -> ApiResult {
    ok(state.portal.obter_contrato_por_status(&cpfcnpj, &status).await?)
}
