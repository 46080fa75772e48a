use serde_json::Value;

use super::listing::{self, ListMode, ListPolicy};
use super::{Audited, AuditedResource, ResourceFamily};
use crate::errors::AppError;
use crate::models::audit::RequestContext;
use crate::upstream::QueryParams;

pub const ORDENS_SERVICO: ResourceFamily = ResourceFamily {
    resource: "ordens-servico",
    table: "ordens_servico_log",
    path: "/v1/ordem-servico",
    plural: "ordens de servico",
    singular: "ordem de servico",
    wrapper: "ordemServico",
    filters: &[],
    list_policy: ListPolicy::OnePageByDefault,
};

/// Direct lookup by code. Some ERP versions reject the path form with 422;
/// those fall back to a `codigo.eq` listing.
pub async fn get_with_fallback(
    service: &AuditedResource<'_>,
    codigo: &str,
    ctx: &RequestContext,
) -> Result<Audited<Value>, AppError> {
    match service.get(codigo, ctx).await {
        Err(err) if err.status.as_u16() == 422 => {
            tracing::info!(codigo, "service order lookup answered 422, falling back to listing");
            let lookup_audit = err.audit_error;
            let mut params = QueryParams::new();
            params.insert("codigo.eq".into(), codigo.to_string());
            let found = match service.list_params(params, ListMode::OnePage, ctx).await {
                Ok(found) => found,
                Err(mut err) => {
                    err.audit_error = join_audit(lookup_audit, err.audit_error.take());
                    return Err(err);
                }
            };

            let audit_error = join_audit(lookup_audit, found.audit_error);
            if matches!(&found.data, Value::Array(records) if records.is_empty()) {
                let err = AppError::not_found("Ordem de servico nao encontrada.");
                return Err(match audit_error {
                    Some(audit_error) => err.with_audit_error(audit_error),
                    None => err,
                });
            }
            Ok(Audited { data: listing::first_record(found.data), audit_error })
        }
        other => other,
    }
}

/// Both audit writes of a fallback lookup can fail; keep both messages.
fn join_audit(first: Option<String>, second: Option<String>) -> Option<String> {
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("{} | {}", a, b)),
        (a, b) => a.or(b),
    }
}
