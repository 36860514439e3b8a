use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use axon::api::{create_router, AppState};
use axon::config::Config;
use axon::db::{Database, DatabaseBackend, LibSqlBackend};
use axon::embeddings::{Embedder, EmbeddingProvider};
use axon::gateway::{IpfsGateway, MetadataFetcher};
use axon::llm::{ChatModel, LlmProvider};
use axon::migration;

const REPLICA_SYNC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "axon")]
#[command(about = "Persona retrieval-augmented chat service")]
struct Args {
    /// Override AXON_HOST
    #[arg(long)]
    host: Option<String>,
    /// Override AXON_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axon=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Loading embedding model: {}...", config.embeddings.model);
    let embeddings = EmbeddingProvider::new(&config.embeddings)?;

    tracing::info!("Initializing LLM provider: {}...", config.llm.model);
    let llm = LlmProvider::new(&config.llm)?;

    let gateway = IpfsGateway::new(&config.gateway)?;
    tracing::info!("Content gateway: {}", gateway.base_url());

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database, embeddings.dimensions()).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    if let Err(e) = migration::check_dimension_compatibility(&*db, embeddings.dimensions()).await {
        tracing::error!("Cannot start with dimension mismatch: {}", e);
        return Err(e.into());
    }

    let embeddings: Arc<dyn Embedder> = Arc::new(embeddings);
    let llm: Arc<dyn ChatModel> = Arc::new(llm);
    let fetcher: Arc<dyn MetadataFetcher> = Arc::new(gateway);

    let state = AppState::new(config.clone(), db, embeddings, llm, fetcher);
    let cancel_token = CancellationToken::new();

    if config.database.local_path.is_some() {
        tracing::info!("Starting replica sync... (interval={}s)", REPLICA_SYNC_INTERVAL.as_secs());
        let db = state.db.clone();
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Replica sync shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(REPLICA_SYNC_INTERVAL) => {
                        if let Err(e) = db.sync().await {
                            tracing::error!("Replica sync error: {}", e);
                        }
                    }
                }
            }
        });
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Axon starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
