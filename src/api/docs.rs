//! `/openapi.json` and a Swagger UI page that renders it.

use std::sync::Arc;

use axum::{extract::State, response::Html, Json};
use serde_json::{json, Map, Value};

use crate::AppState;

struct Operation {
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    summary: &'static str,
    /// Request body schema, when the operation takes one.
    body: Option<&'static str>,
}

impl Operation {
    fn creates(&self) -> bool {
        self.method == "post" && self.body.is_some()
    }
}

const fn op(method: &'static str, path: &'static str, tag: &'static str, summary: &'static str) -> Operation {
    Operation { method, path, tag, summary, body: None }
}

const fn write(
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    summary: &'static str,
    schema: &'static str,
) -> Operation {
    Operation { method, path, tag, summary, body: Some(schema) }
}

const OPERATIONS: &[Operation] = &[
    op("get", "/health", "Health", "Status da API"),
    op("get", "/health/database", "Health", "Status do banco de auditoria"),
    op("get", "/health/uniplus", "Health", "Obtencao de token na UniPlus"),
    op("get", "/api/pedidos", "Pedidos", "Lista pedidos (DAVs)"),
    write("post", "/api/pedidos", "Pedidos", "Cria um pedido", "PedidoWrapper"),
    write("put", "/api/pedidos", "Pedidos", "Atualiza um pedido", "PedidoWrapper"),
    op("get", "/api/pedidos/{codigo}", "Pedidos", "Busca pedido por codigo"),
    op("delete", "/api/pedidos/{codigo}", "Pedidos", "Apaga pedido por codigo"),
    op("get", "/api/entidades", "Entidades", "Lista entidades (clientes/fornecedores)"),
    write("post", "/api/entidades", "Entidades", "Cria uma entidade", "EntidadeWrapper"),
    write("put", "/api/entidades", "Entidades", "Atualiza uma entidade", "EntidadeWrapper"),
    op("get", "/api/entidades/{codigo}", "Entidades", "Busca entidade por codigo"),
    op("delete", "/api/entidades/{codigo}", "Entidades", "Apaga entidade por codigo"),
    op("get", "/api/produtos", "Produtos", "Lista produtos"),
    write("post", "/api/produtos", "Produtos", "Cria um produto", "ProdutoWrapper"),
    write("put", "/api/produtos", "Produtos", "Atualiza um produto", "ProdutoWrapper"),
    op("get", "/api/produtos/{codigo}", "Produtos", "Busca produto por codigo"),
    op("delete", "/api/produtos/{codigo}", "Produtos", "Apaga produto por codigo"),
    op("get", "/api/ordens-servico", "OrdensServico", "Lista ordens de servico"),
    op("get", "/api/ordens-servico/{codigo}", "OrdensServico", "Busca ordem de servico por codigo"),
    op("get", "/api/vendas", "Vendas", "Lista vendas"),
    op("get", "/api/vendas/itens", "Vendas", "Lista itens de venda"),
    op("get", "/api/estoque/movimentacoes", "Estoque", "Lista movimentacoes de estoque (exige filtro data)"),
    op("get", "/api/arquivos", "ArquivosFiscais", "Busca arquivos fiscais (exige tipo)"),
    op("get", "/api/tipos-documentos-financeiros", "TiposDocumentosFinanceiros", "Lista tipos de documentos financeiros"),
    op("get", "/api/tipos-documentos-financeiros/{codigo}", "TiposDocumentosFinanceiros", "Busca tipo de documento financeiro"),
    op("get", "/api/gourmet/contas", "Gourmet", "Lista contas (mesas/comandas)"),
    write("post", "/api/gourmet/contas", "Gourmet", "Abre uma conta", "Objeto"),
    op("post", "/api/portal/bloquear-contrato/{cpfcnpj}", "PortalComercial", "Agenda bloqueio de contrato"),
    op("post", "/api/portal/desbloquear-contrato/{cpfcnpj}", "PortalComercial", "Agenda desbloqueio de contrato"),
    op("get", "/api/portal/contratos", "PortalComercial", "Lista contratos"),
    op("get", "/api/portal/contratos/{status}", "PortalComercial", "Lista contratos por status"),
    op("get", "/api/portal/contrato/{cpfcnpj}", "PortalComercial", "Busca contrato por CPF/CNPJ"),
    op("get", "/api/portal/contrato/{cpfcnpj}/{status}", "PortalComercial", "Busca contrato por CPF/CNPJ e status"),
];

/// Query parameters accepted by the list routes that page through the ERP.
fn list_parameters() -> Value {
    json!([
        { "in": "query", "name": "limit", "schema": { "type": "integer" }, "description": "Limite de registros (max 100)" },
        { "in": "query", "name": "offset", "schema": { "type": "integer" }, "description": "Offset de pagina" },
        { "in": "query", "name": "single", "schema": { "type": "boolean" }, "description": "Retorna apenas o primeiro registro" },
        { "in": "query", "name": "all", "schema": { "type": "boolean" }, "description": "Percorre todas as paginas" }
    ])
}

fn path_parameters(path: &str) -> Vec<Value> {
    path.split('/')
        .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .map(|name| json!({ "in": "path", "name": name, "required": true, "schema": { "type": "string" } }))
        .collect()
}

fn schemas() -> Value {
    json!({
        "Envelope": {
            "type": "object",
            "properties": {
                "success": { "type": "boolean" },
                "data": {},
                "error": { "type": "string" },
                "details": {},
                "auditError": { "type": "string" }
            }
        },
        "PedidoItem": {
            "type": "object",
            "properties": {
                "produto": { "type": "string", "example": "15" },
                "quantidade": { "type": "number", "example": 1 },
                "precoUnitario": { "type": "number", "example": 12.73 }
            }
        },
        "PedidoWrapper": {
            "type": "object",
            "properties": {
                "dav": {
                    "type": "object",
                    "required": ["cliente", "filial", "itens"],
                    "properties": {
                        "codigo": { "type": "string" },
                        "cliente": { "type": "string", "example": "251" },
                        "filial": { "type": "string", "example": "1" },
                        "data": { "type": "string", "example": "2024-09-18" },
                        "itens": { "type": "array", "items": { "$ref": "#/components/schemas/PedidoItem" } }
                    }
                }
            }
        },
        "EntidadeWrapper": {
            "type": "object",
            "properties": {
                "entidade": {
                    "type": "object",
                    "required": ["nome", "tipo"],
                    "properties": {
                        "codigo": { "type": "string", "example": "251" },
                        "nome": { "type": "string", "example": "Cliente Teste" },
                        "tipo": { "type": "string", "example": "1", "description": "1 a 6, separados por virgula" },
                        "tipoPessoa": { "type": "string", "enum": ["0", "1"] },
                        "cnpjCpf": { "type": "string", "example": "12345678901" }
                    }
                }
            }
        },
        "ProdutoWrapper": {
            "type": "object",
            "properties": {
                "produto": {
                    "type": "object",
                    "required": ["nome", "unidadeMedida", "preco"],
                    "properties": {
                        "codigo": { "type": "string" },
                        "nome": { "type": "string", "example": "AGUA MINERAL" },
                        "unidadeMedida": { "type": "string", "example": "UN" },
                        "preco": { "type": "number", "example": 2.5 }
                    }
                }
            }
        },
        "Objeto": { "type": "object" }
    })
}

pub fn openapi_document(public_base_url: &str) -> Value {
    let mut paths = Map::new();
    for operation in OPERATIONS {
        let mut parameters = path_parameters(operation.path);
        if operation.method == "get" && !operation.path.contains('{') && operation.path.starts_with("/api/") {
            if let Value::Array(list) = list_parameters() {
                parameters.extend(list);
            }
        }

        let status = if operation.creates() { "201" } else { "200" };
        let mut spec = json!({
            "tags": [operation.tag],
            "summary": operation.summary,
            "parameters": parameters,
            "responses": {
                status: {
                    "description": "Sucesso",
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Envelope" } } }
                },
                "400": { "description": "Requisicao invalida" },
                "401": { "description": "Autenticacao requerida" }
            }
        });
        if let Some(schema) = operation.body {
            spec["requestBody"] = json!({
                "required": true,
                "content": { "application/json": { "schema": { "$ref": format!("#/components/schemas/{}", schema) } } }
            });
        }

        let entry = paths
            .entry(operation.path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        entry[operation.method] = spec;
    }

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "UniPlus Middleware API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Middleware para UniPlus e Portal Comercial. Auth: Authorization: Basic base64(usuario:senha)."
        },
        "servers": [{ "url": public_base_url, "description": "URL base da API" }],
        "security": [{ "basicAuth": [] }],
        "paths": paths,
        "components": {
            "securitySchemes": { "basicAuth": { "type": "http", "scheme": "basic" } },
            "schemas": schemas()
        }
    })
}

/// GET /openapi.json
pub async fn openapi(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(openapi_document(&state.config.public_base_url))
}

/// GET /docs
pub async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_HTML)
}

const SWAGGER_HTML: &str = r##"<!doctype html>
<html lang="pt-BR">
<head>
  <meta charset="utf-8">
  <title>UniPlus Middleware API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({ url: "/openapi.json", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;
