//! ERP bearer token cache.
//!
//! Tokens come from the OAuth `client_credentials` grant and are kept until
//! 60 seconds before they expire. Refreshes are singleflight: callers that
//! find the cache empty queue on one async lock, and the lock holds the
//! outcome of the last refresh together with a generation counter. A caller
//! that queued while a refresh was in flight takes that refresh's outcome,
//! token or error, so a burst of concurrent requests produces exactly one
//! token request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;

use super::client::parse_body;
use crate::config::Config;
use crate::errors::AppError;

/// Tokens are treated as expired this long before the server says they are.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Used when the token response omits (or garbles) `expires_in`.
const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_usable(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    basic_secret: Option<String>,
    static_token: Option<String>,
    cached: Mutex<Option<AccessToken>>,
    /// Outcome of the most recent refresh. Holding the lock means owning the refresh.
    last_refresh: AsyncMutex<Option<Result<String, AppError>>>,
    /// Bumped, under `last_refresh`, each time a refresh completes.
    generation: AtomicU64,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        server_url: &str,
        basic_secret: Option<String>,
        static_token: Option<String>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth/token", server_url.trim_end_matches('/')),
            basic_secret,
            static_token,
            cached: Mutex::new(None),
            last_refresh: AsyncMutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &Config, http: reqwest::Client) -> Self {
        Self::new(
            http,
            &cfg.uniplus_server_url,
            cfg.uniplus_auth_basic.clone(),
            cfg.uniplus_token.clone(),
        )
    }

    /// True when a static override token is configured (nothing to refresh).
    pub fn is_static(&self) -> bool {
        self.static_token.is_some()
    }

    pub async fn get_token(&self) -> Result<String, AppError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        self.refresh_shared(|_| true).await
    }

    /// Forces a new token after the ERP rejected `rejected` with a 401.
    /// If a concurrent caller already replaced it, that replacement is reused.
    pub async fn refresh_after_rejection(&self, rejected: &str) -> Result<String, AppError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        self.refresh_shared(|token| token != rejected).await
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = None;
        }
    }

    /// Remaining lifetime of the cached token, if any.
    pub fn remaining_lifetime(&self) -> Option<Duration> {
        let guard = self.cached.lock().ok()?;
        let token = guard.as_ref()?;
        token.expires_at.checked_duration_since(Instant::now())
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.cached.lock().ok()?;
        guard
            .as_ref()
            .filter(|t| t.is_usable(Instant::now()))
            .map(|t| t.value.clone())
    }

    /// Singleflight refresh. `reusable` decides whether a cached token found
    /// after taking the lock is good enough for this caller.
    async fn refresh_shared(&self, reusable: impl Fn(&str) -> bool) -> Result<String, AppError> {
        let seen = self.generation.load(Ordering::Acquire);
        let mut last = self.last_refresh.lock().await;

        // A refresh finished while we were queued: its outcome is ours too.
        if self.generation.load(Ordering::Acquire) != seen {
            if let Some(outcome) = last.as_ref() {
                return outcome.clone();
            }
        }
        if let Some(token) = self.cached_token().filter(|t| reusable(t.as_str())) {
            return Ok(token);
        }

        let outcome = self.refresh_locked().await;
        *last = Some(outcome.clone());
        self.generation.fetch_add(1, Ordering::Release);
        outcome
    }

    /// Must be called with `last_refresh` held.
    async fn refresh_locked(&self) -> Result<String, AppError> {
        self.invalidate();
        let token = self.fetch().await?;
        let value = token.value.clone();
        if let Ok(mut guard) = self.cached.lock() {
            *guard = Some(token);
        }
        Ok(value)
    }

    async fn fetch(&self) -> Result<AccessToken, AppError> {
        let Some(secret) = &self.basic_secret else {
            return Err(AppError::authentication(
                "UNIPLUS_AUTH_BASIC e obrigatorio para gerar token.",
            ));
        };

        tracing::info!(url = %self.token_url, "requesting UniPlus access token");

        let resp = self
            .http
            .post(&self.token_url)
            .header(AUTHORIZATION, format!("Basic {}", secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "public-api")])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("token request failed: {}", e);
                AppError::authentication("Falha ao obter token da UniPlus.")
                    .with_details(Value::String(e.to_string()))
            })?;

        let status = resp.status();
        let body = parse_body(resp.text().await.unwrap_or_default());
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "token endpoint rejected the credentials");
            return Err(AppError::authentication("Falha ao obter token da UniPlus.")
                .with_details(json!({ "status": status.as_u16(), "body": body })));
        }

        let value = body
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("Resposta de token invalida da UniPlus."))?
            .to_string();

        let ttl = Duration::from_secs(expires_in_secs(body.get("expires_in")));
        tracing::info!(ttl_secs = ttl.as_secs(), "UniPlus access token refreshed");

        Ok(AccessToken {
            value,
            expires_at: Instant::now() + ttl.saturating_sub(EXPIRY_SKEW),
        })
    }
}

fn expires_in_secs(raw: Option<&Value>) -> u64 {
    let secs = match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if secs.is_finite() && secs >= 1.0 {
        secs as u64
    } else {
        DEFAULT_TTL_SECS
    }
}
