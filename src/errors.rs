use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure categories surfaced by the middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing secret/URL needed to talk to a dependency.
    Configuration,
    /// The ERP token endpoint could not produce a token.
    Authentication,
    /// Upstream kept answering 401 after a refresh, or answered 403.
    Authorization,
    /// Any other non-2xx upstream answer, or a transport failure.
    Upstream,
    Validation,
    PaginationExhausted,
    Audit,
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::Authorization => "authorization_error",
            ErrorKind::Upstream => "upstream_error",
            ErrorKind::Validation => "validation_error",
            ErrorKind::PaginationExhausted => "pagination_exhausted",
            ErrorKind::Audit => "audit_error",
            ErrorKind::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub status: StatusCode,
    pub message: String,
    /// Upstream body or transport error text.
    pub details: Option<Value>,
    /// Set when the audit write for this operation failed as well.
    pub audit_error: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            details: None,
            audit_error: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, StatusCode::NOT_FOUND, message)
    }

    pub fn pagination_exhausted(max_pages: usize) -> Self {
        Self::new(
            ErrorKind::PaginationExhausted,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Limite de paginas excedido ao listar registros.",
        )
        .with_details(json!({ "maxPages": max_pages }))
    }

    pub fn audit(details: String) -> Self {
        Self::new(
            ErrorKind::Audit,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Falha ao registrar auditoria no banco.",
        )
        .with_details(Value::String(details))
    }

    /// Upstream answered with a non-2xx status. 401/403 are classified as
    /// authorization failures, everything else as a plain upstream error.
    pub fn upstream(status: u16, message: impl Into<String>, details: Value) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Authorization,
            _ => ErrorKind::Upstream,
        };
        Self::new(kind, status, message).with_details(details)
    }

    /// The request never produced an HTTP answer (DNS, connect, timeout).
    pub fn transport(message: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::new(ErrorKind::Upstream, StatusCode::INTERNAL_SERVER_ERROR, message)
            .with_details(Value::String(err.to_string()))
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Re-labels the error for the caller while keeping kind, status and details.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_audit_error(mut self, audit_error: impl Into<String>) -> Self {
        self.audit_error = Some(audit_error.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                kind = self.kind.as_str(),
                status = self.status.as_u16(),
                details = ?self.details,
                audit_error = ?self.audit_error,
                "request failed: {}",
                self.message
            );
        } else {
            tracing::warn!(
                kind = self.kind.as_str(),
                status = self.status.as_u16(),
                "request rejected: {}",
                self.message
            );
        }

        let details = self
            .details
            .clone()
            .or_else(|| self.audit_error.clone().map(Value::String))
            .unwrap_or(Value::Null);

        let mut body = json!({
            "success": false,
            "error": self.message,
            "details": details,
        });
        if let Some(audit_error) = &self.audit_error {
            body["auditError"] = Value::String(audit_error.clone());
        }

        (self.status, Json(body)).into_response()
    }
}
