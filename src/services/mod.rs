//! Resource façades over the ERP client.
//!
//! The audited families (pedidos, entidades, produtos, ordens-servico) share
//! [`AuditedResource`]: every attempt is recorded once as SUCESSO or FALHA in
//! the family's log table and in `api_logs`. A failed audit write never hides
//! the business outcome; it rides along as `audit_error`.

use std::future::Future;

use serde_json::Value;

use crate::errors::AppError;
use crate::middleware::audit::AuditRecorder;
use crate::models::audit::{AuditEntry, AuditStatus, Operation, RequestContext};
use crate::upstream::client::UniplusClient;
use crate::upstream::paginate::Paginator;
use crate::upstream::{path_segment, QueryParams};

pub mod body;
pub mod catalog;
pub mod entidades;
pub mod listing;
pub mod ordens_servico;
pub mod pedidos;
pub mod produtos;

use listing::{ListMode, ListPolicy, ListQuery};

/// Static description of one audited upstream resource.
#[derive(Debug)]
pub struct ResourceFamily {
    /// Name stored in `api_logs.recurso`.
    pub resource: &'static str,
    pub table: &'static str,
    pub path: &'static str,
    /// Nouns for error messages, e.g. "pedidos" / "pedido".
    pub plural: &'static str,
    pub singular: &'static str,
    /// Object key the ERP expects around create/update bodies.
    pub wrapper: &'static str,
    pub filters: &'static [(&'static str, &'static str)],
    pub list_policy: ListPolicy,
}

impl ResourceFamily {
    fn failure_message(&self, op: Operation) -> String {
        let noun = match op {
            Operation::Listar => self.plural,
            _ => self.singular,
        };
        format!("Falha ao {} {} na UniPlus.", op.verb(), noun)
    }
}

/// A business result plus the audit failure that accompanied it, if any.
#[derive(Debug)]
pub struct Audited<T> {
    pub data: T,
    pub audit_error: Option<String>,
}

impl<T> Audited<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Audited<U> {
        Audited { data: f(self.data), audit_error: self.audit_error }
    }
}

/// Where the audit `codigo` comes from.
enum RecordCode<'a> {
    None,
    Path(&'a str),
    /// Response `codigo`/`id`, else the request body's `codigo`.
    Body(&'a Value),
}

pub struct AuditedResource<'a> {
    family: &'static ResourceFamily,
    uniplus: &'a UniplusClient,
    paginator: Paginator,
    audit: &'a AuditRecorder,
    all_limit: usize,
}

impl<'a> AuditedResource<'a> {
    pub fn new(
        family: &'static ResourceFamily,
        uniplus: &'a UniplusClient,
        paginator: Paginator,
        audit: &'a AuditRecorder,
        all_limit: usize,
    ) -> Self {
        Self { family, uniplus, paginator, audit, all_limit }
    }

    pub fn family(&self) -> &'static ResourceFamily {
        self.family
    }

    pub async fn list(&self, query: ListQuery, ctx: &RequestContext) -> Result<Audited<Value>, AppError> {
        let single = query.single;
        let mode = self.family.list_policy.mode(&query);
        let params = listing::shape_filters(query.params, self.family.filters);
        self.list_params(params, mode, ctx)
            .await
            .map(|res| if single { res.map(listing::first_record) } else { res })
    }

    /// Lists with already-shaped params. The audit payload is the params as sent.
    pub async fn list_params(
        &self,
        params: QueryParams,
        mode: ListMode,
        ctx: &RequestContext,
    ) -> Result<Audited<Value>, AppError> {
        let params = match mode {
            ListMode::OnePage => listing::clamp_page(params),
            ListMode::All => {
                let mut params = params;
                let size = listing::fetch_all_page_size(self.all_limit);
                params.insert("limit".into(), size.to_string());
                params
            }
        };
        let payload = listing::params_to_json(&params);

        tracing::debug!(resource = self.family.resource, ?mode, "listing");
        let call = async {
            match mode {
                ListMode::OnePage => self.uniplus.get(self.family.path, &params).await,
                ListMode::All => {
                    self.paginator
                        .fetch_all_pages(self.uniplus, self.family.path, &params)
                        .await
                }
            }
        };
        self.run(Operation::Listar, payload, RecordCode::None, ctx, call).await
    }

    pub async fn get(&self, codigo: &str, ctx: &RequestContext) -> Result<Audited<Value>, AppError> {
        let path = format!("{}/{}", self.family.path, path_segment(codigo)?);
        let params = QueryParams::new();
        let call = self.uniplus.get(&path, &params);
        self.run(Operation::Consultar, code_payload(codigo), RecordCode::Path(codigo), ctx, call)
            .await
    }

    pub async fn create(&self, body: Value, ctx: &RequestContext) -> Result<Audited<Value>, AppError> {
        let call = self.uniplus.post(self.family.path, &body);
        self.run(Operation::Criar, body.clone(), RecordCode::Body(&body), ctx, call).await
    }

    pub async fn update(&self, body: Value, ctx: &RequestContext) -> Result<Audited<Value>, AppError> {
        let call = self.uniplus.put(self.family.path, &body);
        self.run(Operation::Atualizar, body.clone(), RecordCode::Body(&body), ctx, call).await
    }

    pub async fn delete(&self, codigo: &str, ctx: &RequestContext) -> Result<Audited<Value>, AppError> {
        let path = format!("{}/{}", self.family.path, path_segment(codigo)?);
        let call = self.uniplus.delete(&path);
        self.run(Operation::Apagar, code_payload(codigo), RecordCode::Path(codigo), ctx, call)
            .await
    }

    async fn run<F>(
        &self,
        op: Operation,
        payload: Value,
        code: RecordCode<'_>,
        ctx: &RequestContext,
        call: F,
    ) -> Result<Audited<Value>, AppError>
    where
        F: Future<Output = Result<Value, AppError>>,
    {
        match call.await {
            Ok(data) => {
                let record_code = match code {
                    RecordCode::None => None,
                    RecordCode::Path(c) => Some(c.to_string()),
                    RecordCode::Body(body) => {
                        response_code(&data).or_else(|| body_code(body, self.family.wrapper))
                    }
                };
                let entry = self.entry(op, AuditStatus::Sucesso, payload, record_code, ctx);
                let audit_error = self.audit.record(&entry, false).await.err().map(audit_text);
                Ok(Audited { data, audit_error })
            }
            Err(err) => {
                let record_code = match code {
                    RecordCode::None => None,
                    RecordCode::Path(c) => Some(c.to_string()),
                    RecordCode::Body(body) => body_code(body, self.family.wrapper),
                };
                let err = err.with_message(self.family.failure_message(op));
                let entry = self.entry(op, AuditStatus::Falha, payload, record_code, ctx);
                match self.audit.record(&entry, false).await {
                    Ok(()) => Err(err),
                    Err(audit_err) => Err(err.with_audit_error(audit_text(audit_err))),
                }
            }
        }
    }

    fn entry(
        &self,
        op: Operation,
        status: AuditStatus,
        payload: Value,
        record_code: Option<String>,
        ctx: &RequestContext,
    ) -> AuditEntry {
        AuditEntry::new(op, status, payload)
            .for_resource(self.family.resource, Some(self.family.table))
            .with_context(ctx)
            .with_record_code(record_code)
    }
}

fn code_payload(codigo: &str) -> Value {
    serde_json::json!({ "codigo": codigo })
}

fn audit_text(err: AppError) -> String {
    match err.details {
        Some(Value::String(details)) => details,
        _ => err.message,
    }
}

fn scalar_code(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn response_code(data: &Value) -> Option<String> {
    scalar_code(data.get("codigo")).or_else(|| scalar_code(data.get("id")))
}

fn body_code(body: &Value, wrapper: &str) -> Option<String> {
    scalar_code(body.get("codigo")).or_else(|| scalar_code(body.get(wrapper).and_then(|w| w.get("codigo"))))
}
