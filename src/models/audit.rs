use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resource name written to `api_logs` when the caller did not give one.
pub const UNKNOWN_RESOURCE: &str = "desconhecido";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Listar,
    Consultar,
    Criar,
    Atualizar,
    Apagar,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Listar => "LISTAR",
            Operation::Consultar => "CONSULTAR",
            Operation::Criar => "CRIAR",
            Operation::Atualizar => "ATUALIZAR",
            Operation::Apagar => "APAGAR",
        }
    }

    /// Verb used in the "Falha ao <verbo> ..." messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Listar => "listar",
            Operation::Consultar => "obter",
            Operation::Criar => "criar",
            Operation::Atualizar => "atualizar",
            Operation::Apagar => "apagar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Sucesso,
    Falha,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Sucesso => "SUCESSO",
            AuditStatus::Falha => "FALHA",
        }
    }
}

/// Route and method of the inbound request that caused an operation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub route: Option<String>,
    pub method: Option<String>,
}

impl RequestContext {
    pub fn new(route: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            route: Some(route.into()),
            method: Some(method.into()),
        }
    }
}

/// One business operation attempt. Append-only once written.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub resource: Option<String>,
    /// Resource-specific log table, if the resource has one.
    #[serde(skip)]
    pub table: Option<&'static str>,
    pub route: Option<String>,
    pub method: Option<String>,
    pub record_code: Option<String>,
    pub payload: Value,
    pub operation: Operation,
    pub status: AuditStatus,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(operation: Operation, status: AuditStatus, payload: Value) -> Self {
        Self {
            resource: None,
            table: None,
            route: None,
            method: None,
            record_code: None,
            payload,
            operation,
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn for_resource(mut self, resource: &str, table: Option<&'static str>) -> Self {
        self.resource = Some(resource.to_string());
        self.table = table;
        self
    }

    pub fn with_context(mut self, ctx: &RequestContext) -> Self {
        self.route = ctx.route.clone();
        self.method = ctx.method.clone();
        self
    }

    pub fn with_record_code(mut self, code: Option<String>) -> Self {
        self.record_code = code;
        self
    }

    pub fn resource_or_unknown(&self) -> &str {
        self.resource.as_deref().unwrap_or(UNKNOWN_RESOURCE)
    }
}
