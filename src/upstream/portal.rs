//! Portal Comercial client: plain pass-through authenticated by a `token` header.

use reqwest::Method;
use serde_json::Value;

use super::client::parse_body;
use super::path_segment;
use crate::config::Config;
use crate::errors::AppError;

pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PortalClient {
    pub fn new(http: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(cfg.upstream_timeout())
            .connect_timeout(cfg.upstream_timeout())
            .build()?;
        Ok(Self::new(http, &cfg.portal_base_url, cfg.portal_api_token.clone()))
    }

    pub async fn bloquear_contrato(&self, cpf_cnpj: &str) -> Result<Value, AppError> {
        self.call(Method::POST, &format!("/bloquear-contrato/{}", path_segment(cpf_cnpj)?)).await
    }

    pub async fn desbloquear_contrato(&self, cpf_cnpj: &str) -> Result<Value, AppError> {
        self.call(Method::POST, &format!("/desbloquear-contrato/{}", path_segment(cpf_cnpj)?)).await
    }

    pub async fn listar_contratos(&self) -> Result<Value, AppError> {
        self.call(Method::GET, "/contratos").await
    }

    pub async fn listar_contratos_por_status(&self, status: &str) -> Result<Value, AppError> {
        self.call(Method::GET, &format!("/contratos/{}", path_segment(status)?)).await
    }

    pub async fn obter_contrato(&self, cpf_cnpj: &str) -> Result<Value, AppError> {
        self.call(Method::GET, &format!("/contrato/{}", path_segment(cpf_cnpj)?)).await
    }

    pub async fn obter_contrato_por_status(
        &self,
        cpf_cnpj: &str,
        status: &str,
    ) -> Result<Value, AppError> {
        let path = format!("/contrato/{}/{}", path_segment(cpf_cnpj)?, path_segment(status)?);
        self.call(Method::GET, &path).await
    }

    async fn call(&self, method: Method, path: &str) -> Result<Value, AppError> {
        let Some(token) = &self.token else {
            return Err(AppError::configuration(
                "PORTAL_API_TOKEN e obrigatorio para a API do Portal Comercial.",
            ));
        };

        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .request(method.clone(), &url)
            .header("token", token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%method, path, "Portal Comercial request failed: {}", e);
                AppError::transport("Erro ao comunicar com a API do Portal Comercial.", &e)
            })?;

        let status = resp.status();
        let body = parse_body(resp.text().await.unwrap_or_default());
        if status.is_success() {
            return Ok(body);
        }

        let message = match status.as_u16() {
            401 | 403 => "Nao autorizado na API do Portal Comercial.",
            s if s >= 500 => "Erro interno no servidor do Portal Comercial.",
            _ => "Erro ao comunicar com a API do Portal Comercial.",
        };
        Err(AppError::upstream(status.as_u16(), message, body))
    }
}
