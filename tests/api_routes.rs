//! End-to-end tests for the HTTP surface.
//!
//! The full router runs in-process via `tower::ServiceExt::oneshot`. The ERP
//! and the Portal Comercial are wiremock servers; the audit store is an
//! in-memory sink, so no Postgres is needed.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use uniplus_middleware::config::Config;
use uniplus_middleware::middleware::audit::AuditSink;
use uniplus_middleware::models::audit::{AuditEntry, AuditStatus, Operation};
use uniplus_middleware::{api, AppState};

// ── Harness ──────────────────────────────────────────────────

#[derive(Default)]
struct MemorySink {
    rows: Mutex<Vec<(String, AuditEntry)>>,
    failing: bool,
}

impl MemorySink {
    fn failing() -> Self {
        Self { rows: Mutex::new(Vec::new()), failing: true }
    }

    fn rows(&self) -> Vec<(String, AuditEntry)> {
        self.rows.lock().unwrap().clone()
    }

    fn push(&self, table: &str, entry: &AuditEntry) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("connection refused");
        }
        self.rows.lock().unwrap().push((table.to_string(), entry.clone()));
        Ok(())
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn insert_resource_log(&self, table: &'static str, entry: &AuditEntry) -> anyhow::Result<()> {
        self.push(table, entry)
    }

    async fn insert_api_log(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        self.push("api_logs", entry)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

fn config(server: &MockServer, extra: &[(&str, &str)]) -> Config {
    let mut vars = vec![
        ("UNIPLUS_BASE_URL".to_string(), format!("{}/public-api", server.uri())),
        ("DATABASE_URL".to_string(), "postgres://unused/audit".to_string()),
        ("UNIPLUS_TOKEN".to_string(), "static-token".to_string()),
        ("PORTAL_BASE_URL".to_string(), format!("{}/portal", server.uri())),
    ];
    for (k, v) in extra {
        vars.retain(|(key, _)| key != k);
        vars.push((k.to_string(), v.to_string()));
    }
    Config::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    })
    .unwrap()
}

fn app(cfg: Config, sink: Arc<MemorySink>) -> Router {
    let state = Arc::new(AppState::new(cfg, sink).unwrap());
    api::router(state)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value, axum::http::HeaderMap) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body, headers)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn records(range: std::ops::Range<usize>) -> Value {
    Value::Array(range.map(|i| json!({ "codigo": i.to_string() })).collect())
}

// ── Listing ──────────────────────────────────────────────────

mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_default_limit_on_produtos_walks_every_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/produtos"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "0"))
            .and(header("authorization", "Bearer static-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(records(0..100)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/produtos"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(records(100..130)))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, body, _) = send(app(config(&server, &[]), sink.clone()), get("/api/produtos?limit=25")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 130);
        assert_eq!(data[129]["codigo"], "129");

        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "produtos_log");
        assert_eq!(rows[1].0, "api_logs");
        assert_eq!(rows[1].1.operation, Operation::Listar);
        assert_eq!(rows[1].1.status, AuditStatus::Sucesso);
        assert_eq!(rows[1].1.route.as_deref(), Some("/api/produtos"));
        assert_eq!(rows[1].1.method.as_deref(), Some("GET"));
    }

    #[tokio::test]
    async fn test_wrapped_listing_keeps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/entidades"))
            .and(query_param("offset", "0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "registros": records(0..100), "total": 101 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/entidades"))
            .and(query_param("offset", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(records(100..101)))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, body, _) = send(app(config(&server, &[]), sink), get("/api/entidades")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["registros"].as_array().unwrap().len(), 101);
        assert_eq!(body["data"]["total"], 101);
    }

    #[tokio::test]
    async fn test_pedidos_default_to_one_page_with_shaped_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/davs"))
            .and(query_param("cliente.eq", "251"))
            .respond_with(ResponseTemplate::new(200).set_body_json(records(0..3)))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, body, _) =
            send(app(config(&server, &[]), sink.clone()), get("/api/pedidos?cliente=251&single=true")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({ "codigo": "0" }));

        let received = server.received_requests().await.unwrap();
        let query = received[0].url.query().unwrap_or_default().to_string();
        assert!(!query.contains("single"));
        assert!(!query.contains("limit"));

        let rows = sink.rows();
        assert_eq!(rows[0].1.payload, json!({ "cliente.eq": "251" }));
    }

    #[tokio::test]
    async fn test_explicit_page_is_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/entidades"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(records(0..2)))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, body, _) =
            send(app(config(&server, &[]), sink), get("/api/entidades?limit=500&offset=200")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }
}

// ── Writes and validation ────────────────────────────────────

mod write_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pedido_injects_date_and_audits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public-api/v1/davs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "codigo": "9001", "status": 0 })))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let body = json!({
            "dav": {
                "cliente": "251",
                "filial": "1",
                "itens": [{ "produto": "15", "quantidade": 1, "precoUnitario": 12.73 }]
            }
        });
        let (status, resp, _) =
            send(app(config(&server, &[]), sink.clone()), json_request("POST", "/api/pedidos", body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp, json!({ "success": true, "data": { "codigo": "9001", "status": 0 } }));

        let received = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(sent["dav"]["data"], json!(today));
        assert_eq!(sent["dav"]["cliente"], "251");

        let rows = sink.rows();
        let tables: Vec<_> = rows.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tables, vec!["pedidos_log", "api_logs"]);
        for (_, entry) in &rows {
            assert_eq!(entry.operation, Operation::Criar);
            assert_eq!(entry.status, AuditStatus::Sucesso);
            assert_eq!(entry.record_code.as_deref(), Some("9001"));
            assert_eq!(entry.resource.as_deref(), Some("pedidos"));
        }
    }

    #[tokio::test]
    async fn test_juridica_without_document_never_reaches_upstream() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());
        let body = json!({ "entidade": { "nome": "ACME", "tipo": "1", "tipoPessoa": "1" } });

        let (status, resp, _) =
            send(app(config(&server, &[]), sink.clone()), json_request("POST", "/api/entidades", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["success"], false);
        assert_eq!(resp["error"], "Campo \"cnpjCpf\" e obrigatorio para pessoa juridica.");
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_relabelled_and_audited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public-api/v1/entidades"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "erro": "timeout no banco" })))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let body = json!({ "nome": "Cliente", "tipo": "1", "cnpjCpf": "12345678901" });
        let (status, resp, _) =
            send(app(config(&server, &[]), sink.clone()), json_request("POST", "/api/entidades", body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp["success"], false);
        assert_eq!(resp["error"], "Falha ao criar entidade na UniPlus.");
        assert_eq!(resp["details"], json!({ "erro": "timeout no banco" }));
        assert!(resp.get("auditError").is_none());

        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(_, e)| e.operation == Operation::Criar && e.status == AuditStatus::Falha));
        // The upstream body is what was validated, wrapped.
        assert_eq!(rows[0].1.payload["entidade"]["nome"], "Cliente");
    }

    #[tokio::test]
    async fn test_produto_update_requires_codigo() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());
        let body = json!({ "produto": { "nome": "AGUA", "unidadeMedida": "UN", "preco": 2.5 } });

        let (status, resp, _) =
            send(app(config(&server, &[]), sink), json_request("PUT", "/api/produtos", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "Campo \"codigo\" e obrigatorio.");
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());
        let req = Request::builder()
            .method("POST")
            .uri("/api/produtos")
            .header("content-type", "application/json")
            .body(Body::from("{ not json"))
            .unwrap();

        let (status, resp, _) = send(app(config(&server, &[]), sink), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({ "success": false, "error": "Payload invalido.", "details": null }));
    }

    #[tokio::test]
    async fn test_delete_audits_path_code() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/public-api/v1/produtos/42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let req = Request::builder().method("DELETE").uri("/api/produtos/42").body(Body::empty()).unwrap();
        let (status, resp, _) = send(app(config(&server, &[]), sink.clone()), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"], Value::Null);
        let rows = sink.rows();
        assert_eq!(rows[0].1.operation, Operation::Apagar);
        assert_eq!(rows[0].1.record_code.as_deref(), Some("42"));
        assert_eq!(rows[0].1.payload, json!({ "codigo": "42" }));
    }
    #[tokio::test]
    async fn test_encoded_slash_in_code_stays_inside_family() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let req = Request::builder()
            .method("DELETE")
            .uri("/api/produtos/..%2Fentidades%2F5")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(app(config(&server, &[]), sink.clone()), req).await;
        assert_eq!(status, StatusCode::OK);

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].url.path(), "/public-api/v1/produtos/..%2Fentidades%2F5");
        assert_eq!(sink.rows()[0].1.record_code.as_deref(), Some("../entidades/5"));
    }

    #[tokio::test]
    async fn test_dot_segment_code_is_rejected_before_upstream() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());

        let (status, resp, _) =
            send(app(config(&server, &[]), sink.clone()), get("/api/entidades/%2E%2E")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "Parametro de caminho invalido.");
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(sink.rows().is_empty());
    }
}

// ── Audit failures ───────────────────────────────────────────

mod audit_failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_success_survives_audit_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/produtos/15"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "codigo": "15", "nome": "AGUA" })))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::failing());
        let (status, resp, _) = send(app(config(&server, &[]), sink), get("/api/produtos/15")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["success"], true);
        assert_eq!(resp["data"]["nome"], "AGUA");
        assert_eq!(
            resp["auditError"],
            "produtos_log: connection refused | api_logs: connection refused"
        );
    }

    #[tokio::test]
    async fn test_business_failure_carries_audit_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/davs/7"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "nao existe" })))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::failing());
        let (status, resp, _) = send(app(config(&server, &[]), sink), get("/api/pedidos/7")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(resp["error"], "Falha ao obter pedido na UniPlus.");
        assert_eq!(resp["details"], json!({ "message": "nao existe" }));
        assert!(resp["auditError"].as_str().unwrap().contains("pedidos_log"));
    }
}

// ── Ordens de servico ────────────────────────────────────────

mod ordens_servico_tests {
    use super::*;

    async fn mount_422(server: &MockServer, codigo: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/public-api/v1/ordem-servico/{}", codigo)))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "message": "use filtros" })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_422_falls_back_to_listing() {
        let server = MockServer::start().await;
        mount_422(&server, "31").await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/ordem-servico"))
            .and(query_param("codigo.eq", "31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "codigo": "31", "situacao": "ABERTA" }])))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, resp, _) = send(app(config(&server, &[]), sink.clone()), get("/api/ordens-servico/31")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["situacao"], "ABERTA");

        let ops: Vec<_> = sink
            .rows()
            .into_iter()
            .filter(|(t, _)| t == "ordens_servico_log")
            .map(|(_, e)| (e.operation, e.status))
            .collect();
        assert_eq!(
            ops,
            vec![(Operation::Consultar, AuditStatus::Falha), (Operation::Listar, AuditStatus::Sucesso)]
        );
    }

    #[tokio::test]
    async fn test_fallback_keeps_audit_failure_of_direct_lookup() {
        let server = MockServer::start().await;
        mount_422(&server, "31").await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/ordem-servico"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "codigo": "31" }])))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::failing());
        let (status, resp, _) = send(app(config(&server, &[]), sink), get("/api/ordens-servico/31")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["codigo"], "31");
        let one_write = "ordens_servico_log: connection refused | api_logs: connection refused";
        assert_eq!(resp["auditError"], format!("{} | {}", one_write, one_write));
    }

    #[tokio::test]
    async fn test_empty_fallback_is_404() {
        let server = MockServer::start().await;
        mount_422(&server, "99").await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/ordem-servico"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, resp, _) = send(app(config(&server, &[]), sink), get("/api/ordens-servico/99")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(resp["error"], "Ordem de servico nao encontrada.");
    }

    #[tokio::test]
    async fn test_other_errors_do_not_fall_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/ordem-servico/5"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, resp, _) = send(app(config(&server, &[]), sink), get("/api/ordens-servico/5")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(resp["error"], "Falha ao obter ordem de servico na UniPlus.");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}

// ── Pass-through families and Portal ─────────────────────────

mod passthrough_tests {
    use super::*;

    #[tokio::test]
    async fn test_estoque_requires_date_filter() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());
        let (status, resp, _) =
            send(app(config(&server, &[]), sink), get("/api/estoque/movimentacoes?produto=1")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "O parametro data (ou data.ge/data.le) e obrigatorio.");
    }

    #[tokio::test]
    async fn test_estoque_forwards_params_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v2/movimentacao-estoque"))
            .and(query_param("data.ge", "2024-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, resp, _) =
            send(app(config(&server, &[]), sink.clone()), get("/api/estoque/movimentacoes?data.ge=2024-01-01")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"], json!([{ "id": 1 }]));
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn test_arquivos_requires_tipo() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());
        let (status, resp, _) = send(app(config(&server, &[]), sink), get("/api/arquivos")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "Parametro tipo e obrigatorio (ex: DOCUMENTO_FISCAL).");
    }

    #[tokio::test]
    async fn test_gourmet_create_returns_201() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public-api/v1/gourmet/conta"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "conta": 12 })))
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let (status, resp, _) = send(
            app(config(&server, &[]), sink),
            json_request("POST", "/api/gourmet/contas", json!({ "mesa": 4 })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp["data"]["conta"], 12);
    }

    #[tokio::test]
    async fn test_portal_uses_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/portal/contrato/12345678901/ATIVO"))
            .and(header("token", "portal-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ATIVO" })))
            .expect(1)
            .mount(&server)
            .await;

        let sink = Arc::new(MemorySink::default());
        let cfg = config(&server, &[("PORTAL_API_TOKEN", "portal-secret")]);
        let (status, resp, _) = send(app(cfg, sink), get("/api/portal/contrato/12345678901/ATIVO")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["data"]["status"], "ATIVO");
    }

    #[tokio::test]
    async fn test_portal_without_token_is_configuration_error() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());
        let req = Request::builder()
            .method("POST")
            .uri("/api/portal/bloquear-contrato/12345678901")
            .body(Body::empty())
            .unwrap();

        let (status, resp, _) = send(app(config(&server, &[]), sink), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp["error"], "PORTAL_API_TOKEN e obrigatorio para a API do Portal Comercial.");
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

// ── Surface: auth gate, fallback, health, docs ───────────────

mod surface_tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn gated(server: &MockServer) -> Router {
        let cfg = config(server, &[("BASIC_AUTH_USER", "admin"), ("BASIC_AUTH_PASS", "s3cret")]);
        app(cfg, Arc::new(MemorySink::default()))
    }

    #[tokio::test]
    async fn test_basic_gate_challenges_and_admits() {
        let server = MockServer::start().await;

        let (status, resp, headers) = send(gated(&server), get("/health")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"], "Autenticacao requerida.");
        assert_eq!(headers["www-authenticate"], "Basic realm=\"UniPlus API\"");

        let wrong = Request::builder()
            .uri("/health")
            .header("authorization", format!("Basic {}", STANDARD.encode("admin:nope")))
            .body(Body::empty())
            .unwrap();
        let (status, resp, _) = send(gated(&server), wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"], "Credenciais invalidas.");

        let right = Request::builder()
            .uri("/health")
            .header("authorization", format!("Basic {}", STANDARD.encode("admin:s3cret")))
            .body(Body::empty())
            .unwrap();
        let (status, resp, _) = send(gated(&server), right).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["status"], "ok");
    }

    #[tokio::test]
    async fn test_gate_covers_unknown_routes() {
        let server = MockServer::start().await;
        let (status, _, _) = send(gated(&server), get("/nao-existe")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_envelope_and_request_id() {
        let server = MockServer::start().await;
        let sink = Arc::new(MemorySink::default());
        let (status, resp, headers) = send(app(config(&server, &[]), sink), get("/api/nada")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(resp["success"], false);
        assert_eq!(resp["error"], "Rota nao encontrada.");
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_uniplus_health_fetches_oauth_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("authorization", "Basic c2VjcmV0"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "abc", "expires_in": 3600 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(&server, &[("UNIPLUS_TOKEN", ""), ("UNIPLUS_AUTH_BASIC", "Basic c2VjcmV0")]);
        let (status, resp, _) = send(app(cfg, Arc::new(MemorySink::default())), get("/health/uniplus")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["tokenSource"], "oauth");
        assert!(resp["expiresIn"].as_u64().unwrap() > 3000);
    }

    #[tokio::test]
    async fn test_database_health_reports_unhealthy_store() {
        let server = MockServer::start().await;
        let (status, resp, _) =
            send(app(config(&server, &[]), Arc::new(MemorySink::failing())), get("/health/database")).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp["status"], "unhealthy");
        assert_eq!(resp["details"], "connection refused");
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let server = MockServer::start().await;
        let cfg = config(&server, &[("PUBLIC_BASE_URL", "https://api.example.com")]);
        let (status, resp, _) = send(app(cfg, Arc::new(MemorySink::default())), get("/openapi.json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["openapi"], "3.0.0");
        assert_eq!(resp["servers"][0]["url"], "https://api.example.com");
        assert!(resp["paths"]["/api/ordens-servico/{codigo}"]["get"].is_object());
    }
}
