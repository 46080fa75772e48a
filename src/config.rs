use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_PORTAL_BASE_URL: &str = "https://canal.intelidata.inf.br/public-api";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// ERP REST base URL, e.g. `https://erp.example.com/public-api`.
    pub uniplus_base_url: String,
    /// OAuth server root. Derived from the base URL when not set.
    pub uniplus_server_url: String,
    /// Pre-shared secret for the token endpoint (without the `Basic ` prefix).
    pub uniplus_auth_basic: Option<String>,
    /// Static bearer token; disables the token cache when set.
    pub uniplus_token: Option<String>,
    pub uniplus_client_id: Option<String>,
    pub uniplus_client_secret: Option<String>,
    /// Page size requested in fetch-all mode. Set via UNIPLUS_ALL_LIMIT. Default: 1000.
    pub all_limit: usize,
    pub upstream_timeout_secs: u64,
    pub portal_base_url: String,
    pub portal_api_token: Option<String>,
    pub basic_auth_user: Option<String>,
    pub basic_auth_pass: Option<String>,
    pub public_base_url: String,
}

impl Config {
    /// The inbound gate is active only when both halves are configured.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (&self.basic_auth_user, &self.basic_auth_pass) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Builds a config from any key lookup. `load` feeds it the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(uniplus_base_url) = var("UNIPLUS_BASE_URL") else {
            anyhow::bail!("UNIPLUS_BASE_URL e obrigatorio.");
        };
        let uniplus_server_url = match var("UNIPLUS_SERVER_URL") {
            Some(url) => url,
            None => derive_server_url(&uniplus_base_url),
        };
        if uniplus_server_url.is_empty() {
            anyhow::bail!("UNIPLUS_SERVER_URL e obrigatorio.");
        }

        let Some(database_url) = var("DATABASE_URL") else {
            anyhow::bail!("DATABASE_URL e obrigatorio para o registro de auditoria.");
        };

        let port = var("PORT").and_then(|v| v.parse().ok()).unwrap_or(3000);

        Ok(Config {
            port,
            database_url,
            uniplus_base_url: uniplus_base_url.trim_end_matches('/').to_string(),
            uniplus_server_url: uniplus_server_url.trim_end_matches('/').to_string(),
            uniplus_auth_basic: var("UNIPLUS_AUTH_BASIC").map(|raw| normalize_basic(&raw)),
            uniplus_token: var("UNIPLUS_TOKEN"),
            uniplus_client_id: var("UNIPLUS_CLIENT_ID"),
            uniplus_client_secret: var("UNIPLUS_CLIENT_SECRET"),
            all_limit: var("UNIPLUS_ALL_LIMIT")
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(1000),
            upstream_timeout_secs: var("UPSTREAM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            portal_base_url: var("PORTAL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PORTAL_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            portal_api_token: var("PORTAL_API_TOKEN"),
            basic_auth_user: var("BASIC_AUTH_USER"),
            basic_auth_pass: var("BASIC_AUTH_PASS"),
            public_base_url: var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
        })
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Config::from_lookup(|key| std::env::var(key).ok())
}

/// `https://host/public-api/` -> `https://host`
fn derive_server_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    trimmed.strip_suffix("/public-api").unwrap_or(trimmed).to_string()
}

fn normalize_basic(raw: &str) -> String {
    raw.strip_prefix("Basic ").unwrap_or(raw).trim().to_string()
}
