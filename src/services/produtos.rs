use serde_json::{json, Value};

use super::listing::ListPolicy;
use super::{body, ResourceFamily};
use crate::errors::AppError;

pub const PRODUTOS: ResourceFamily = ResourceFamily {
    resource: "produtos",
    table: "produtos_log",
    path: "/v1/produtos",
    plural: "produtos",
    singular: "produto",
    wrapper: "produto",
    filters: &[("codigo", "eq"), ("nome", "ge")],
    list_policy: ListPolicy::FetchAllByDefault,
};

/// Validates a create/update body; the result is always `{produto: ...}`.
pub fn prepare(raw: Value, require_codigo: bool) -> Result<Value, AppError> {
    let record = body::unwrap_record(&raw, "produto");
    let Value::Object(fields) = record else {
        return Err(AppError::validation("Payload invalido."));
    };

    if require_codigo && !body::is_truthy(fields.get("codigo")) {
        return Err(AppError::validation("Campo \"codigo\" e obrigatorio."));
    }
    let complete = body::is_truthy(fields.get("nome"))
        && body::is_truthy(fields.get("unidadeMedida"))
        && fields.contains_key("preco");
    if !complete {
        return Err(AppError::validation(if require_codigo {
            "Campos obrigatorios: codigo, nome, unidadeMedida, preco."
        } else {
            "Campos obrigatorios: nome, unidadeMedida, preco."
        }));
    }
    if !fields.get("preco").map(body::is_finite_number).unwrap_or(false) {
        return Err(AppError::validation("Campo \"preco\" invalido."));
    }

    if body::is_truthy(raw.get("produto")) {
        Ok(raw)
    } else {
        Ok(json!({ "produto": raw }))
    }
}
