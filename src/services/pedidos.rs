//! Pedidos (ERP DAVs).

use chrono::Utc;
use serde_json::Value;

use super::listing::ListPolicy;
use super::{body, ResourceFamily};
use crate::errors::AppError;

pub const PEDIDOS: ResourceFamily = ResourceFamily {
    resource: "pedidos",
    table: "pedidos_log",
    path: "/v1/davs",
    plural: "pedidos",
    singular: "pedido",
    wrapper: "dav",
    filters: &[("cliente", "eq"), ("codigo", "eq"), ("status", "eq")],
    list_policy: ListPolicy::OnePageByDefault,
};

/// Validates a create/update body and returns what goes upstream.
///
/// The order may come bare or under `dav`; the wrapper is kept when given.
/// `data` defaults to today's UTC date.
pub fn prepare(mut raw: Value, require_codigo: bool) -> Result<Value, AppError> {
    let wrapped = body::is_truthy(raw.get("dav"));
    {
        let order = if wrapped { &mut raw["dav"] } else { &mut raw };
        if let Value::Object(fields) = order {
            if !body::is_truthy(fields.get("data")) {
                let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
                fields.insert("data".into(), Value::String(today));
            }
        }
        validate(order, require_codigo)?;
    }
    Ok(raw)
}

fn validate(order: &Value, require_codigo: bool) -> Result<(), AppError> {
    let Value::Object(fields) = order else {
        return Err(AppError::validation("Payload invalido."));
    };
    if !body::is_truthy(fields.get("cliente")) {
        return Err(AppError::validation("Campo \"cliente\" e obrigatorio."));
    }
    if !body::is_truthy(fields.get("filial")) {
        return Err(AppError::validation("Campo \"filial\" e obrigatorio."));
    }
    match fields.get("itens") {
        Some(Value::Array(itens)) if !itens.is_empty() => {}
        _ => {
            return Err(AppError::validation(
                "Campo \"itens\" deve ser um array com pelo menos 1 item.",
            ))
        }
    }
    if require_codigo && !body::is_truthy(fields.get("codigo")) {
        return Err(AppError::validation("Campo \"codigo\" e obrigatorio."));
    }
    Ok(())
}
