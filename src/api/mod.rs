use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method, Uri},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::middleware::basic_auth::basic_auth;
use crate::AppState;

pub mod catalog;
pub mod docs;
pub mod extract;
pub mod health;
pub mod portal;
pub mod resources;

use resources::{Entidades, Pedidos, Produtos};

/// Request bodies above this size are refused before reaching a handler.
const BODY_LIMIT: usize = 1024 * 1024;

/// Build the full HTTP surface. Every route, the 404 fallback included,
/// sits behind the optional Basic gate.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/database", get(health::database))
        .route("/health/uniplus", get(health::uniplus))
        .route("/docs", get(docs::swagger_ui))
        .route("/openapi.json", get(docs::openapi))
        // Audited ERP families
        .route(
            "/api/pedidos",
            get(resources::list::<Pedidos>)
                .post(resources::create::<Pedidos>)
                .put(resources::update::<Pedidos>),
        )
        .route(
            "/api/pedidos/:codigo",
            get(resources::get_one::<Pedidos>).delete(resources::delete::<Pedidos>),
        )
        .route(
            "/api/entidades",
            get(resources::list::<Entidades>)
                .post(resources::create::<Entidades>)
                .put(resources::update::<Entidades>),
        )
        .route(
            "/api/entidades/:codigo",
            get(resources::get_one::<Entidades>).delete(resources::delete::<Entidades>),
        )
        .route(
            "/api/produtos",
            get(resources::list::<Produtos>)
                .post(resources::create::<Produtos>)
                .put(resources::update::<Produtos>),
        )
        .route(
            "/api/produtos/:codigo",
            get(resources::get_one::<Produtos>).delete(resources::delete::<Produtos>),
        )
        .route("/api/ordens-servico", get(resources::listar_ordens_servico))
        .route("/api/ordens-servico/:codigo", get(resources::obter_ordem_servico))
        // Pass-through ERP families
        .route("/api/vendas", get(catalog::listar_vendas))
        .route("/api/vendas/itens", get(catalog::listar_vendas_itens))
        .route("/api/estoque/movimentacoes", get(catalog::listar_movimentacoes_estoque))
        .route("/api/arquivos", get(catalog::listar_arquivos))
        .route(
            "/api/tipos-documentos-financeiros",
            get(catalog::listar_tipos_documentos_financeiros),
        )
        .route(
            "/api/tipos-documentos-financeiros/:codigo",
            get(catalog::obter_tipo_documento_financeiro),
        )
        .route(
            "/api/gourmet/contas",
            get(catalog::listar_contas_gourmet).post(catalog::criar_conta_gourmet),
        )
        // Portal Comercial
        .route("/api/portal/bloquear-contrato/:cpfcnpj", post(portal::bloquear_contrato))
        .route("/api/portal/desbloquear-contrato/:cpfcnpj", post(portal::desbloquear_contrato))
        .route("/api/portal/contratos", get(portal::listar_contratos))
        .route("/api/portal/contratos/:status", get(portal::listar_contratos_por_status))
        .route("/api/portal/contrato/:cpfcnpj", get(portal::obter_contrato))
        .route("/api/portal/contrato/:cpfcnpj/:status", get(portal::obter_contrato_por_status))
        .fallback(fallback_404)
        .layer(middleware::from_fn_with_state(state.clone(), basic_auth))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(security_headers_middleware))
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(BODY_LIMIT)),
        )
        .with_state(state)
}

async fn fallback_404(method: Method, uri: Uri) -> AppError {
    tracing::debug!(%method, path = %uri.path(), "no route");
    AppError::not_found("Rota nao encontrada.")
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    // ERP and audit data must never sit in shared caches.
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.remove("Server");

    resp
}
