use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use recommender_api::api::{create_router, AppState};
use recommender_api::config::Config;
use recommender_api::db;
use recommender_api::services::dataset::{InteractionStore, PgDataset, SimulatedDataset};
use recommender_api::services::recommender::Recommender;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = build_store(&config).await;
    let model = Arc::new(Recommender::new(store).await?);

    let state = AppState::new(model, config.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the interaction store: Postgres when configured and reachable,
/// otherwise the seeded simulated dataset.
async fn build_store(config: &Config) -> Arc<dyn InteractionStore> {
    if let Some(database_url) = &config.database_url {
        match db::create_pool(database_url).await {
            Ok(pool) => {
                tracing::info!("Using database-backed interaction store");
                return Arc::new(PgDataset::new(pool));
            }
            Err(error) => {
                tracing::warn!(%error, "Database unreachable, falling back to simulated dataset");
            }
        }
    }

    tracing::info!(
        users = config.simulated_users,
        contents = config.simulated_contents,
        "Using simulated interaction store"
    );
    Arc::new(SimulatedDataset::new(
        config.simulated_users,
        config.simulated_contents,
    ))
}
