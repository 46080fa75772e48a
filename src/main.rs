use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uniplus_middleware::cli::{self, Commands};
use uniplus_middleware::store::postgres::PgStore;
use uniplus_middleware::upstream::client::UniplusClient;
use uniplus_middleware::{api, config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    match args.command {
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(Commands::Token) => print_token(&cfg).await,
    }
}

/// fmt layer filtered by RUST_LOG, plus OTLP export when
/// OTEL_EXPORTER_OTLP_ENDPOINT is set.
fn init_tracing() {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let installed = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "uniplus-middleware"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio);
        match installed {
            Ok(tracer) => Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Err(e) => {
                eprintln!("OpenTelemetry disabled, tracer install failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "uniplus_middleware=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to audit database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let state = Arc::new(AppState::new(cfg, Arc::new(db))?);
    if state.uniplus.tokens().is_static() {
        tracing::info!("using static UniPlus token, OAuth refresh disabled");
    }

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("UniPlus middleware listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn print_token(cfg: &config::Config) -> anyhow::Result<()> {
    let client = UniplusClient::from_config(cfg)?;
    let tokens = client.tokens();
    let token = tokens
        .get_token()
        .await
        .map_err(|e| anyhow::anyhow!("{} ({:?})", e.message, e.details))?;

    println!("token:  {}", cli::mask(&token));
    match tokens.remaining_lifetime() {
        Some(left) => println!("valid:  {}s", left.as_secs()),
        None if tokens.is_static() => println!("valid:  static token (UNIPLUS_TOKEN), no expiry tracked"),
        None => println!("valid:  unknown"),
    }
    Ok(())
}
