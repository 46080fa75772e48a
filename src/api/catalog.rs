//! Handlers for the pass-through ERP families (no audit trail).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::extract::{JsonBody, QueryMap};
use crate::errors::AppError;
use crate::services::catalog;
use crate::AppState;

type ApiResult = Result<(StatusCode, Json<Value>), AppError>;

fn ok(status: StatusCode, data: Value) -> ApiResult {
    Ok((status, Json(json!({ "success": true, "data": data }))))
}

/// GET /api/vendas
pub async fn listar_vendas(State(state): State<Arc<AppState>>, QueryMap(params): QueryMap) -> ApiResult {
    ok(StatusCode::OK, catalog::listar_vendas(&state.uniplus, &params).await?)
}

/// GET /api/vendas/itens
pub async fn listar_vendas_itens(State(state): State<Arc<AppState>>, QueryMap(params): QueryMap) -> ApiResult {
    ok(StatusCode::OK, catalog::listar_vendas_itens(&state.uniplus, &params).await?)
}

/// GET /api/estoque/movimentacoes
pub async fn listar_movimentacoes_estoque(
    State(state): State<Arc<AppState>>,
    QueryMap(params): QueryMap,
) -> ApiResult {
    ok(StatusCode::OK, catalog::listar_movimentacao_estoque(&state.uniplus, &params).await?)
}

/// GET /api/arquivos
pub async fn listar_arquivos(State(state): State<Arc<AppState>>, QueryMap(params): QueryMap) -> ApiResult {
    ok(StatusCode::OK, catalog::listar_arquivos(&state.uniplus, &params).await?)
}

/// GET /api/tipos-documentos-financeiros
pub async fn listar_tipos_documentos_financeiros(
    State(state): State<Arc<AppState>>,
    QueryMap(params): QueryMap,
) -> ApiResult {
    ok(StatusCode::OK, catalog::listar_tipos_documento_financeiro(&state.uniplus, &params).await?)
}

/// GET /api/tipos-documentos-financeiros/:codigo
pub async fn obter_tipo_documento_financeiro(
    State(state): State<Arc<AppState>>,
    Path(codigo): Path<String>,
) -> ApiResult {
    ok(StatusCode::OK, catalog::obter_tipo_documento_financeiro(&state.uniplus, &codigo).await?)
}

/// GET /api/gourmet/contas
pub async fn listar_contas_gourmet(State(state): State<Arc<AppState>>, QueryMap(params): QueryMap) -> ApiResult {
    ok(StatusCode::OK, catalog::listar_contas_gourmet(&state.uniplus, &params).await?)
}

/// POST /api/gourmet/contas
pub async fn criar_conta_gourmet(State(state): State<Arc<AppState>>, JsonBody(body): JsonBody) -> ApiResult {
    ok(StatusCode::CREATED, catalog::criar_conta_gourmet(&state.uniplus, &body).await?)
}
