//! Entidades: clients, suppliers and the other ERP parties.

use serde_json::{json, Value};

use super::listing::ListPolicy;
use super::{body, ResourceFamily};
use crate::errors::AppError;

pub const ENTIDADES: ResourceFamily = ResourceFamily {
    resource: "entidades",
    table: "entidades_log",
    path: "/v1/entidades",
    plural: "entidades",
    singular: "entidade",
    wrapper: "entidade",
    filters: &[("codigo", "eq"), ("nome", "ge"), ("cnpjCpf", "eq")],
    list_policy: ListPolicy::FetchAllByDefault,
};

const TIPOS: [&str; 6] = ["1", "2", "3", "4", "5", "6"];

/// Validates a create/update body; the result is always `{entidade: ...}`.
pub fn prepare(raw: Value, require_codigo: bool) -> Result<Value, AppError> {
    let record = body::unwrap_record(&raw, "entidade");
    let Value::Object(fields) = record else {
        return Err(AppError::validation("Payload invalido."));
    };

    if require_codigo && !body::is_truthy(fields.get("codigo")) {
        return Err(AppError::validation("Campo \"codigo\" e obrigatorio."));
    }
    if !body::is_truthy(fields.get("nome")) {
        return Err(AppError::validation("Campo \"nome\" e obrigatorio."));
    }
    let Some(tipo) = fields.get("tipo").filter(|t| body::is_truthy(Some(t))) else {
        return Err(AppError::validation("Campo \"tipo\" e obrigatorio."));
    };
    let tipo = body::as_text(tipo);
    if tipo
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .any(|t| !TIPOS.contains(&t))
    {
        return Err(AppError::validation("Campo \"tipo\" invalido."));
    }

    if let Some(tipo_pessoa) = fields.get("tipoPessoa") {
        match body::as_text(tipo_pessoa).as_str() {
            "0" => {}
            "1" if !body::is_truthy(fields.get("cnpjCpf")) => {
                return Err(AppError::validation(
                    "Campo \"cnpjCpf\" e obrigatorio para pessoa juridica.",
                ));
            }
            "1" => {}
            _ => return Err(AppError::validation("Campo \"tipoPessoa\" invalido.")),
        }
    }

    if let Some(doc) = fields.get("cnpjCpf").filter(|d| body::is_truthy(Some(d))) {
        let digits = body::as_text(doc).chars().filter(char::is_ascii_digit).count();
        if digits != 11 && digits != 14 {
            return Err(AppError::validation("Campo \"cnpjCpf\" invalido."));
        }
    }

    if body::is_truthy(raw.get("entidade")) {
        Ok(raw)
    } else {
        Ok(json!({ "entidade": raw }))
    }
}
