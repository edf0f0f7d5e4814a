//! # Catalog Gateway Module
//!
//! Read-only accessors over the seeded reference tables (categories,
//! goods, per-step prompts). Every accessor reports absence as `None`
//! or an empty list rather than an error; callers decide how to fall
//! back. Rows are returned in catalog (insertion) order.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// A goods category shown on the category menu
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A single catalog item, carrying its showcase image as a blob
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Goods {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image: Vec<u8>,
    pub category_id: i64,
}

/// List all category names in catalog order
pub async fn list_category_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM categories ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list category names")?;

    Ok(names.into_iter().map(|(name,)| name).collect())
}

/// Look up a category by its id
pub async fn category_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, description FROM categories WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to read category by id")?;

    Ok(category)
}

/// Look up a category by its exact display name
pub async fn category_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, description FROM categories WHERE name = ?1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("Failed to read category by name")?;

    Ok(category)
}

/// List all item names across every category, in catalog order
pub async fn list_item_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM goods ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list item names")?;

    Ok(names.into_iter().map(|(name,)| name).collect())
}

/// List the goods belonging to one category, in catalog order
pub async fn items_in_category(pool: &SqlitePool, category_id: i64) -> Result<Vec<Goods>> {
    let goods = sqlx::query_as::<_, Goods>(
        "SELECT id, name, description, image, category_id
         FROM goods WHERE category_id = ?1 ORDER BY id",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await
    .context("Failed to list items in category")?;

    Ok(goods)
}

/// Look up a single item by its exact display name
pub async fn item_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Goods>> {
    let goods = sqlx::query_as::<_, Goods>(
        "SELECT id, name, description, image, category_id FROM goods WHERE name = ?1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("Failed to read item by name")?;

    Ok(goods)
}

/// Fetch the prompt text attached to a funnel step, if any was seeded
pub async fn prompt_for_step(pool: &SqlitePool, step_id: i64) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT message FROM step_prompts WHERE state_id = ?1 ORDER BY id LIMIT 1")
            .bind(step_id)
            .fetch_optional(pool)
            .await
            .context("Failed to read step prompt")?;

    Ok(row.and_then(|(message,)| message))
}

/// The in-memory copy of category and item names captured once at
/// process start and used for literal text matching.
///
/// The catalog is reference data populated out-of-band before the bot
/// runs; additions made while the process is up are invisible to the
/// matcher until restart. This is an explicit assumption, not an
/// oversight.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub category_names: Vec<String>,
    pub item_names: Vec<String>,
}

impl CatalogSnapshot {
    /// Capture the current category and item name lists
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        Ok(Self {
            category_names: list_category_names(pool).await?,
            item_names: list_item_names(pool).await?,
        })
    }
}
