use std::sync::Arc;

use finaicer_backend::chat::ChatClient;
use finaicer_backend::config::{Config, StoreConfig};
use finaicer_backend::notifier::Notifier;
use finaicer_backend::store::{MemoryStore, PgStore, Store};
use finaicer_backend::{routes, AppState};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("ENV").ok().as_deref() != Some("prod") {
        dotenvy::dotenv().ok();
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let store: Arc<dyn Store> = match &config.store {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Postgres(options) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options.clone())
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
    };
    tracing::info!(backend = store.backend_tag(), "store ready");

    if config.gemini.api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; /gemini-chat will be rejected by the provider");
    }
    let chat = ChatClient::new(
        &config.gemini.base_url,
        &config.gemini.model,
        &config.gemini.api_key,
    );
    let state = AppState::new(store.clone(), Notifier::new(config.event_capacity), chat);
    let app = routes::app().with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    match store.count_reports().await {
        Ok(count) => tracing::info!(count, "reports in store"),
        Err(e) => tracing::error!(error = %e, "failed to count reports"),
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    store.close().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
