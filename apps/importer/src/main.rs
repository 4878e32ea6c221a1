//! Loads a partner YAML price list into the catalog.
//!
//! Usage: `retail-hub-importer <pricelist.yaml>` with `DATABASE_URL` set.

use anyhow::Context;
use retail_hub_api::pricelist;
use retail_hub_migration::{Migrator, MigratorTrait};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: retail-hub-importer <pricelist.yaml>")?;
    let yaml = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path))?;
    let list = pricelist::parse(&yaml).context("failed to parse the price list")?;

    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let db = sea_orm::Database::connect(db_url)
        .await
        .context("failed to connect to the database")?;
    Migrator::up(&db, None).await?;

    let stats = pricelist::import(&db, list).await?;
    tracing::info!(
        categories = stats.categories,
        products = stats.products,
        offers = stats.offers,
        parameters = stats.parameters,
        "price list imported"
    );

    Ok(())
}
