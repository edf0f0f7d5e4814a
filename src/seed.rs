//! # Catalog Seeding Module
//!
//! One-shot population of the reference tables (categories, goods,
//! step prompts) from a JSON manifest plus image files on disk. Seeding
//! is idempotent: when the catalog already holds categories, the run is
//! a no-op, so re-running the binary against a live database is safe.

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::fs;
use std::path::Path;

/// Root of the seed manifest
#[derive(Debug, Deserialize)]
pub struct SeedManifest {
    #[serde(default)]
    pub prompts: Vec<SeedPrompt>,
    pub categories: Vec<SeedCategory>,
}

/// Text shown verbatim at one funnel step
#[derive(Debug, Deserialize)]
pub struct SeedPrompt {
    pub state_id: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub description: String,
    pub items: Vec<SeedItem>,
}

/// A catalog item; `image` is a path relative to the manifest file
#[derive(Debug, Deserialize)]
pub struct SeedItem {
    pub name: String,
    pub description: String,
    pub image: String,
}

/// What a seeding run did
#[derive(Debug, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub items: usize,
    pub prompts: usize,
    pub skipped: bool,
}

/// Parse the manifest file
pub fn load_manifest(path: &Path) -> Result<SeedManifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed manifest at {}", path.display()))?;

    let manifest: SeedManifest = serde_json::from_str(&raw)
        .with_context(|| format!("Seed manifest at {} is not valid JSON", path.display()))?;

    Ok(manifest)
}

/// Read an item's showcase image into the blob stored alongside it
fn read_image_blob(base: &Path, relative: &str) -> Result<Vec<u8>> {
    let path = base.join(relative);
    fs::read(&path).with_context(|| format!("Failed to read image file {}", path.display()))
}

/// Populate the reference tables from `manifest_path` unless categories
/// already exist. All rows land in one transaction.
pub async fn seed_catalog(pool: &SqlitePool, manifest_path: &Path) -> Result<SeedReport> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to check for existing catalog")?;

    if existing > 0 {
        info!("Catalog already holds {existing} categories; skipping seed");
        return Ok(SeedReport {
            categories: 0,
            items: 0,
            prompts: 0,
            skipped: true,
        });
    }

    let manifest = load_manifest(manifest_path)?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let mut tx = pool.begin().await.context("Failed to open seed transaction")?;
    let mut items = 0usize;

    for category in &manifest.categories {
        let result = sqlx::query("INSERT INTO categories (name, description) VALUES (?1, ?2)")
            .bind(&category.name)
            .bind(&category.description)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert category '{}'", category.name))?;
        let category_id = result.last_insert_rowid();

        for item in &category.items {
            let image = read_image_blob(base, &item.image)?;
            sqlx::query(
                "INSERT INTO goods (name, description, image, category_id) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&item.name)
            .bind(&item.description)
            .bind(image)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert item '{}'", item.name))?;
            items += 1;
        }
    }

    for prompt in &manifest.prompts {
        sqlx::query("INSERT INTO step_prompts (state_id, message) VALUES (?1, ?2)")
            .bind(prompt.state_id)
            .bind(&prompt.message)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert prompt for step {}", prompt.state_id))?;
    }

    tx.commit().await.context("Failed to commit seed transaction")?;

    info!(
        "Seeded {} categories, {} items, {} prompts",
        manifest.categories.len(),
        items,
        manifest.prompts.len()
    );

    Ok(SeedReport {
        categories: manifest.categories.len(),
        items,
        prompts: manifest.prompts.len(),
        skipped: false,
    })
}
