//! Extractors that reject with the JSON error envelope instead of axum's
//! plain-text rejections.

use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::audit::RequestContext;
use crate::upstream::QueryParams;

/// Any JSON body. Unparseable or non-JSON bodies are a 400 `Payload invalido.`.
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!("rejected request body: {}", rejection);
                Err(AppError::validation("Payload invalido."))
            }
        }
    }
}

/// Query string as a flat key/value map.
pub struct QueryMap(pub QueryParams);

#[async_trait]
impl<S> FromRequestParts<S> for QueryMap
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<BTreeMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Query(map)| QueryMap(map))
            .map_err(|_| AppError::validation("Parametros de consulta invalidos."))
    }
}

/// Route and method of the current request, for audit rows.
pub struct Context(pub RequestContext);

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Context(RequestContext::new(parts.uri.path(), parts.method.as_str())))
    }
}
