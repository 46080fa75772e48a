//! Handlers for the audited ERP families.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use super::extract::{Context, JsonBody, QueryMap};
use crate::errors::AppError;
use crate::services::listing::ListQuery;
use crate::services::{entidades, ordens_servico, pedidos, produtos, Audited, ResourceFamily};
use crate::AppState;

/// An audited family with full CRUD behind `/api/<resource>`.
pub trait Family: Send + Sync + 'static {
    const FAMILY: &'static ResourceFamily;

    /// Validates a create (`update == false`) or update body and returns the
    /// upstream body.
    fn prepare(raw: Value, update: bool) -> Result<Value, AppError>;
}

pub struct Pedidos;
pub struct Entidades;
pub struct Produtos;

impl Family for Pedidos {
    const FAMILY: &'static ResourceFamily = &pedidos::PEDIDOS;

    fn prepare(raw: Value, update: bool) -> Result<Value, AppError> {
        pedidos::prepare(raw, update)
    }
}

impl Family for Entidades {
    const FAMILY: &'static ResourceFamily = &entidades::ENTIDADES;

    fn prepare(raw: Value, update: bool) -> Result<Value, AppError> {
        entidades::prepare(raw, update)
    }
}

impl Family for Produtos {
    const FAMILY: &'static ResourceFamily = &produtos::PRODUTOS;

    fn prepare(raw: Value, update: bool) -> Result<Value, AppError> {
        produtos::prepare(raw, update)
    }
}

/// `{success: true, data}` plus `auditError` when the audit write failed.
pub(crate) fn respond(status: StatusCode, result: Audited<Value>) -> Response {
    let mut body = json!({ "success": true, "data": result.data });
    if let Some(audit_error) = result.audit_error {
        tracing::warn!("operation succeeded but audit failed: {}", audit_error);
        body["auditError"] = Value::String(audit_error);
    }
    (status, Json(body)).into_response()
}

/// GET /api/<resource>
pub async fn list<F: Family>(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
    QueryMap(raw): QueryMap,
) -> Result<Response, AppError> {
    let result = state
        .resource(F::FAMILY)
        .list(ListQuery::from_raw(raw), &ctx)
        .await?;
    Ok(respond(StatusCode::OK, result))
}

/// GET /api/<resource>/:codigo
pub async fn get_one<F: Family>(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
    Path(codigo): Path<String>,
) -> Result<Response, AppError> {
    let result = state.resource(F::FAMILY).get(&codigo, &ctx).await?;
    Ok(respond(StatusCode::OK, result))
}

/// POST /api/<resource>
pub async fn create<F: Family>(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
    JsonBody(raw): JsonBody,
) -> Result<Response, AppError> {
    let body = F::prepare(raw, false)?;
    let result = state.resource(F::FAMILY).create(body, &ctx).await?;
    Ok(respond(StatusCode::CREATED, result))
}

/// PUT /api/<resource>
pub async fn update<F: Family>(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
    JsonBody(raw): JsonBody,
) -> Result<Response, AppError> {
    let body = F::prepare(raw, true)?;
    let result = state.resource(F::FAMILY).update(body, &ctx).await?;
    Ok(respond(StatusCode::OK, result))
}

/// DELETE /api/<resource>/:codigo
pub async fn delete<F: Family>(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
    Path(codigo): Path<String>,
) -> Result<Response, AppError> {
    let result = state.resource(F::FAMILY).delete(&codigo, &ctx).await?;
    Ok(respond(StatusCode::OK, result))
}

/// GET /api/ordens-servico
pub async fn listar_ordens_servico(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
    QueryMap(raw): QueryMap,
) -> Result<Response, AppError> {
    let result = state
        .resource(&ordens_servico::ORDENS_SERVICO)
        .list(ListQuery::from_raw(raw), &ctx)
        .await?;
    Ok(respond(StatusCode::OK, result))
}

/// GET /api/ordens-servico/:codigo
pub async fn obter_ordem_servico(
    State(state): State<Arc<AppState>>,
    Context(ctx): Context,
    Path(codigo): Path<String>,
) -> Result<Response, AppError> {
    let service = state.resource(&ordens_servico::ORDENS_SERVICO);
    let result = ordens_servico::get_with_fallback(&service, &codigo, &ctx).await?;
    Ok(respond(StatusCode::OK, result))
}
