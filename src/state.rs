//! # State Store Module
//!
//! Durable per-user conversation state: which funnel step the user is
//! on and which category they picked. One row per user, created lazily
//! on first contact and never deleted. The message handler is the only
//! writer, one turn at a time per user; every mutation is committed
//! before the corresponding reply is sent.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use log::{info, warn};
use sqlx::SqlitePool;

use crate::catalog;

/// Funnel step a user starts at on first contact
pub const INITIAL_STATE: i64 = 0;
/// Floor step; back-navigation never goes below this
pub const FLOOR_STATE: i64 = 0;

/// One user's persisted position in the funnel
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserConversation {
    pub user_id: i64,
    pub state: i64,
    pub category_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

async fn fetch(pool: &SqlitePool, user_id: i64) -> Result<Option<UserConversation>> {
    let conv = sqlx::query_as::<_, UserConversation>(
        "SELECT user_id, state, category_id, created_at, updated_at
         FROM user_states WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read user conversation")?;

    Ok(conv)
}

async fn persist(pool: &SqlitePool, conv: &mut UserConversation) -> Result<()> {
    conv.updated_at = Utc::now().naive_utc();

    sqlx::query(
        "UPDATE user_states SET state = ?1, category_id = ?2, updated_at = ?3 WHERE user_id = ?4",
    )
    .bind(conv.state)
    .bind(conv.category_id)
    .bind(conv.updated_at)
    .bind(conv.user_id)
    .execute(pool)
    .await
    .context("Failed to persist user conversation")?;

    Ok(())
}

/// Return the existing conversation row for `user_id`, or create one at
/// the greeting step with no category selected. The new row is committed
/// before this returns, so a crash before the first reply cannot
/// re-trigger creation ambiguously.
pub async fn load_or_create(pool: &SqlitePool, user_id: i64) -> Result<UserConversation> {
    if let Some(conv) = fetch(pool, user_id).await? {
        return Ok(conv);
    }

    info!("Creating conversation state for user_id: {}", user_id);

    // INSERT OR IGNORE keeps creation race-safe: two near-simultaneous
    // first messages still end up with exactly one row.
    sqlx::query("INSERT OR IGNORE INTO user_states (user_id, state) VALUES (?1, ?2)")
        .bind(user_id)
        .bind(INITIAL_STATE)
        .execute(pool)
        .await
        .context("Failed to create user conversation")?;

    fetch(pool, user_id)
        .await?
        .context("Conversation row missing right after creation")
}

/// Advance the conversation by exactly one step.
///
/// When `selected_category_name` is given it is resolved against the
/// catalog and bound to the conversation. A name that no longer resolves
/// skips the binding but still advances the step; the menu render for
/// the new step recovers from the missing category.
pub async fn advance(
    pool: &SqlitePool,
    mut conv: UserConversation,
    selected_category_name: Option<&str>,
) -> Result<UserConversation> {
    conv.state += 1;

    if let Some(name) = selected_category_name {
        match catalog::category_by_name(pool, name).await? {
            Some(category) => conv.category_id = Some(category.id),
            None => warn!(
                "Category '{}' picked by user {} is not in the catalog; step advanced without binding",
                name, conv.user_id
            ),
        }
    }

    persist(pool, &mut conv).await?;
    Ok(conv)
}

/// Step the conversation back by one, clamped at the greeting floor.
pub async fn retreat(pool: &SqlitePool, mut conv: UserConversation) -> Result<UserConversation> {
    if conv.state > FLOOR_STATE {
        conv.state -= 1;
    }
    persist(pool, &mut conv).await?;
    Ok(conv)
}

/// Put a conversation back at the category menu with no category bound.
///
/// Recovery path for a row claiming an item step while its category
/// reference is missing or stale.
pub async fn reset_to_category_menu(
    pool: &SqlitePool,
    mut conv: UserConversation,
) -> Result<UserConversation> {
    conv.state = 1;
    conv.category_id = None;
    persist(pool, &mut conv).await?;
    Ok(conv)
}
