//! Non-audited ERP families: one upstream call each, params forwarded as given.

use serde_json::Value;

use crate::errors::AppError;
use crate::upstream::client::UniplusClient;
use crate::upstream::{path_segment, QueryParams};

const VENDAS_PATH: &str = "/v2/venda";
const VENDAS_ITENS_PATH: &str = "/v2/venda-item";
const MOVIMENTACAO_ESTOQUE_PATH: &str = "/v2/movimentacao-estoque";
const ARQUIVOS_PATH: &str = "/v1/arquivos/buscar";
const TIPO_DOCUMENTO_FINANCEIRO_PATH: &str = "/v1/tipo-documento-financeiro";
const GOURMET_CONTA_PATH: &str = "/v1/gourmet/conta";

pub async fn listar_vendas(uniplus: &UniplusClient, params: &QueryParams) -> Result<Value, AppError> {
    relabel(uniplus.get(VENDAS_PATH, params).await, "Falha ao listar vendas na UniPlus.")
}

pub async fn listar_vendas_itens(uniplus: &UniplusClient, params: &QueryParams) -> Result<Value, AppError> {
    relabel(
        uniplus.get(VENDAS_ITENS_PATH, params).await,
        "Falha ao listar itens de venda na UniPlus.",
    )
}

/// Requires a `data` filter in some form; the ERP refuses unbounded scans.
pub async fn listar_movimentacao_estoque(
    uniplus: &UniplusClient,
    params: &QueryParams,
) -> Result<Value, AppError> {
    if !params.keys().any(|k| k == "data" || k.starts_with("data.")) {
        return Err(AppError::validation(
            "O parametro data (ou data.ge/data.le) e obrigatorio.",
        ));
    }
    relabel(
        uniplus.get(MOVIMENTACAO_ESTOQUE_PATH, params).await,
        "Falha ao listar movimentacao de estoque na UniPlus.",
    )
}

pub async fn listar_arquivos(uniplus: &UniplusClient, params: &QueryParams) -> Result<Value, AppError> {
    if params.get("tipo").map(|t| t.is_empty()).unwrap_or(true) {
        return Err(AppError::validation(
            "Parametro tipo e obrigatorio (ex: DOCUMENTO_FISCAL).",
        ));
    }
    relabel(uniplus.get(ARQUIVOS_PATH, params).await, "Falha ao listar arquivos na UniPlus.")
}

pub async fn listar_tipos_documento_financeiro(
    uniplus: &UniplusClient,
    params: &QueryParams,
) -> Result<Value, AppError> {
    relabel(
        uniplus.get(TIPO_DOCUMENTO_FINANCEIRO_PATH, params).await,
        "Falha ao listar tipos de documentos financeiros na UniPlus.",
    )
}

pub async fn obter_tipo_documento_financeiro(uniplus: &UniplusClient, codigo: &str) -> Result<Value, AppError> {
    let path = format!("{}/{}", TIPO_DOCUMENTO_FINANCEIRO_PATH, path_segment(codigo)?);
    relabel(
        uniplus.get(&path, &QueryParams::new()).await,
        "Falha ao obter tipo de documento financeiro na UniPlus.",
    )
}

pub async fn listar_contas_gourmet(uniplus: &UniplusClient, params: &QueryParams) -> Result<Value, AppError> {
    relabel(
        uniplus.get(GOURMET_CONTA_PATH, params).await,
        "Falha ao listar contas Gourmet na UniPlus.",
    )
}

pub async fn criar_conta_gourmet(uniplus: &UniplusClient, body: &Value) -> Result<Value, AppError> {
    if !body.is_object() {
        return Err(AppError::validation("Payload obrigatorio."));
    }
    relabel(
        uniplus.post(GOURMET_CONTA_PATH, body).await,
        "Falha ao criar conta Gourmet na UniPlus.",
    )
}

fn relabel(result: Result<Value, AppError>, message: &str) -> Result<Value, AppError> {
    result.map_err(|e| e.with_message(message))
}
