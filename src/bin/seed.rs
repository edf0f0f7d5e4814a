//! One-shot catalog seeding binary.
//!
//! Reads `DATABASE_URL` and `SEED_MANIFEST` (falling back to the
//! default manifest path), provisions the schema, and populates the
//! reference tables unless they already hold data.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::info;

use storefront_bot::config::DEFAULT_SEED_MANIFEST;
use storefront_bot::{db, seed};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenv::dotenv().ok();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let manifest = env::var("SEED_MANIFEST")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SEED_MANIFEST));

    let pool = db::connect(&database_url).await?;
    db::init_database_schema(&pool).await?;

    let report = seed::seed_catalog(&pool, &manifest).await?;
    if report.skipped {
        info!("Catalog already seeded; nothing to do");
    } else {
        info!(
            categories = report.categories,
            items = report.items,
            prompts = report.prompts,
            "Catalog seeded"
        );
    }

    Ok(())
}
