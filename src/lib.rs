//! UniPlus middleware: a uniform REST surface over the UniPlus ERP and the
//! Portal Comercial API, with an append-only audit trail.
//!
//! The library exists so that `tests/` can drive the full router.

use std::sync::Arc;
use std::time::Instant;

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod upstream;

use middleware::audit::{AuditRecorder, AuditSink};
use services::{AuditedResource, ResourceFamily};
use upstream::client::UniplusClient;
use upstream::paginate::Paginator;
use upstream::portal::PortalClient;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: config::Config,
    pub uniplus: UniplusClient,
    pub paginator: Paginator,
    pub portal: PortalClient,
    pub audit: AuditRecorder,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: config::Config, sink: Arc<dyn AuditSink>) -> anyhow::Result<Self> {
        let uniplus = UniplusClient::from_config(&config)?;
        let portal = PortalClient::from_config(&config)?;

        Ok(Self {
            uniplus,
            portal,
            paginator: Paginator::default(),
            audit: AuditRecorder::new(sink),
            started_at: Instant::now(),
            config,
        })
    }

    pub fn resource(&self, family: &'static ResourceFamily) -> AuditedResource<'_> {
        AuditedResource::new(family, &self.uniplus, self.paginator, &self.audit, self.config.all_limit)
    }
}
