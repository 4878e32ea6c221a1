#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use retail_hub_api::state::State;
use retail_hub_migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let sentry_dsn = std::env::var("SENTRY_DSN").unwrap_or_default();
    let _sentry_guard = if sentry_dsn.is_empty() {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .init();
        None
    } else {
        let guard = sentry::init((
            sentry_dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                traces_sample_rate: 0.3,
                ..Default::default()
            },
        ));
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .with(sentry_tracing::layer())
            .init();
        Some(guard)
    };

    tracing::info!("Starting retail-hub API service");

    let config = config::Config::from_env()?;

    let state = Arc::new(State::from_env().await?);
    Migrator::up(&state.db, None).await?;

    let app = retail_hub_api::construct_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
