//! HTTP client bound to the UniPlus ERP base URL.
//!
//! Every call carries `Authorization: Bearer <token>` from the shared
//! [`TokenManager`] plus the optional client-credential headers. A 401 on the
//! first attempt forces one token refresh and one retry, unless the token is
//! the static override, which has nothing to refresh. Anything else is
//! normalized into an [`AppError`] carrying the upstream status and body.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde_json::Value;

use super::token::TokenManager;
use super::QueryParams;
use crate::config::Config;
use crate::errors::AppError;

const TRANSPORT_MESSAGE: &str = "Erro ao comunicar com a API do UniPlus.";

pub struct UniplusClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl UniplusClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<TokenManager>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            client_id,
            client_secret,
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(cfg.upstream_timeout())
            .connect_timeout(cfg.upstream_timeout())
            .build()?;
        let tokens = Arc::new(TokenManager::from_config(cfg, http.clone()));

        Ok(Self::new(
            http,
            &cfg.uniplus_base_url,
            tokens,
            cfg.uniplus_client_id.clone(),
            cfg.uniplus_client_secret.clone(),
        ))
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, AppError> {
        self.request(Method::GET, path, Some(params), None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, AppError> {
        self.request(Method::POST, path, None, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, AppError> {
        self.request(Method::PUT, path, None, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, AppError> {
        self.request(Method::DELETE, path, None, None).await
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let token = self.tokens.get_token().await?;
        let resp = self.send(&method, path, params, body, &token).await?;

        if resp.status() == StatusCode::UNAUTHORIZED && !self.tokens.is_static() {
            tracing::warn!(%method, path, "UniPlus answered 401, refreshing token and retrying once");
            let fresh = self.tokens.refresh_after_rejection(&token).await?;
            let retry = self.send(&method, path, params, body, &fresh).await?;
            return read_response(retry).await;
        }

        read_response(resp).await
    }

    async fn send(
        &self,
        method: &Method,
        path: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
        token: &str,
    ) -> Result<reqwest::Response, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method.clone(), &url).bearer_auth(token);

        // Some tenants also want the client credentials as headers.
        if let Some(id) = &self.client_id {
            req = req.header("X-Client-Id", id);
        }
        if let Some(secret) = &self.client_secret {
            req = req.header("X-Client-Secret", secret);
        }
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        tracing::debug!(%method, path, "calling UniPlus");
        req.send().await.map_err(|e| {
            tracing::warn!(%method, path, "UniPlus request failed: {}", e);
            AppError::transport(TRANSPORT_MESSAGE, &e)
        })
    }
}

async fn read_response(resp: reqwest::Response) -> Result<Value, AppError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| AppError::transport(TRANSPORT_MESSAGE, &e))?;
    let body = parse_body(text);

    if status.is_success() {
        return Ok(body);
    }

    let message = match status.as_u16() {
        401 => "Nao autorizado (401). Verifique o token da UniPlus.",
        403 => "Acesso negado (403). Verifique as credenciais.",
        s if s >= 500 => "Erro interno no servidor da UniPlus.",
        _ => TRANSPORT_MESSAGE,
    };
    Err(AppError::upstream(status.as_u16(), message, body))
}

/// JSON when it parses, the raw text otherwise, `null` for an empty body.
pub(crate) fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, static_token: Option<&str>) -> UniplusClient {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenManager::new(
            http.clone(),
            &server.uri(),
            Some("c2VjcmV0".into()),
            static_token.map(String::from),
        ));
        UniplusClient::new(
            http,
            &format!("{}/public-api", server.uri()),
            tokens,
            Some("client-1".into()),
            Some("shh".into()),
        )
    }

    async fn mount_tokens(server: &MockServer, first: &str, second: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": first, "expires_in": 3600})),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": second, "expires_in": 3600})),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(String::new()), Value::Null);
        assert_eq!(parse_body("[1,2]".into()), json!([1, 2]));
        assert_eq!(parse_body("<html>oops</html>".into()), json!("<html>oops</html>"));
    }

    #[tokio::test]
    async fn test_headers_and_query_are_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/produtos"))
            .and(header("authorization", "Bearer fixed"))
            .and(header("x-client-id", "client-1"))
            .and(header("x-client-secret", "shh"))
            .and(query_param("codigo.eq", "15"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"codigo": "15"}])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, Some("fixed"));
        let mut params = QueryParams::new();
        params.insert("codigo.eq".into(), "15".into());
        let data = client.get("/v1/produtos", &params).await.unwrap();
        assert_eq!(data, json!([{"codigo": "15"}]));
    }

    #[tokio::test]
    async fn test_401_triggers_one_refresh_and_one_retry() {
        let server = MockServer::start().await;
        mount_tokens(&server, "stale", "fresh").await;

        Mock::given(method("GET"))
            .and(path("/public-api/v1/davs/7"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/public-api/v1/davs/7"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"codigo": "7"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, None);
        let data = client.get("/v1/davs/7", &QueryParams::new()).await.unwrap();
        assert_eq!(data["codigo"], "7");
    }

    #[tokio::test]
    async fn test_second_401_is_final() {
        let server = MockServer::start().await;
        mount_tokens(&server, "stale", "also-rejected").await;

        Mock::given(method("GET"))
            .and(path("/public-api/v1/davs"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "denied"})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server, None);
        let err = client.get("/v1/davs", &QueryParams::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "Nao autorizado (401). Verifique o token da UniPlus.");
        assert_eq!(err.details, Some(json!({"message": "denied"})));
    }

    #[tokio::test]
    async fn test_static_token_401_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/public-api/v1/produtos/9"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, Some("fixed"));
        let err = client.delete("/v1/produtos/9").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_server_error_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/public-api/v1/entidades"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"erro": "falhou"})))
            .mount(&server)
            .await;

        let client = client(&server, Some("fixed"));
        let err = client.post("/v1/entidades", &json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Upstream);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Erro interno no servidor da UniPlus.");
        assert_eq!(err.details, Some(json!({"erro": "falhou"})));
    }

    #[tokio::test]
    async fn test_client_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/public-api/v1/produtos"))
            .respond_with(ResponseTemplate::new(422).set_body_string("codigo invalido"))
            .mount(&server)
            .await;

        let client = client(&server, Some("fixed"));
        let err = client.put("/v1/produtos", &json!({})).await.unwrap_err();
        assert_eq!(err.status.as_u16(), 422);
        assert_eq!(err.details, Some(json!("codigo invalido")));
    }

    #[tokio::test]
    async fn test_transport_failure_is_500() {
        let tokens = Arc::new(TokenManager::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
            None,
            Some("fixed".into()),
        ));
        let client = UniplusClient::new(reqwest::Client::new(), "http://127.0.0.1:1", tokens, None, None);

        let err = client.get("/v1/davs", &QueryParams::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Upstream);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err.details, Some(Value::String(_))));
    }
}
