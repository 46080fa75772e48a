use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::AppState;

const REALM: &str = "Basic realm=\"UniPlus API\"";

/// Middleware: HTTP Basic gate over every route.
/// A no-op unless both BASIC_AUTH_USER and BASIC_AUTH_PASS are configured.
pub async fn basic_auth(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let Some((user, pass)) = state.config.basic_auth() else {
        return next.run(req).await;
    };

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match check(header_value, user, pass) {
        Ok(()) => next.run(req).await,
        Err(message) => {
            tracing::warn!(path = %req.uri().path(), "basic auth rejected: {}", message);
            challenge(message)
        }
    }
}

fn check(header_value: &str, user: &str, pass: &str) -> Result<(), &'static str> {
    let token = match header_value.split_once(' ') {
        Some(("Basic", token)) if !token.trim().is_empty() => token.trim(),
        _ => return Err("Autenticacao requerida."),
    };

    let decoded = STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or("Autenticacao invalida.")?;
    let (given_user, given_pass) = decoded.split_once(':').ok_or("Autenticacao invalida.")?;

    let user_ok = given_user.as_bytes().ct_eq(user.as_bytes());
    let pass_ok = given_pass.as_bytes().ct_eq(pass.as_bytes());
    if bool::from(user_ok & pass_ok) {
        Ok(())
    } else {
        Err("Credenciais invalidas.")
    }
}

fn challenge(message: &str) -> Response {
    let mut resp = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response();
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    resp
}
