//! Message Handler module for processing incoming Telegram messages
//!
//! One inbound text message equals one funnel turn: take the user's
//! turn lock, run the transition (which commits its own state
//! mutations), then deliver the reply. Delivery failures are logged and
//! swallowed — the state is already ahead of what the user saw, and
//! their next message continues from there.

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::{debug, error};

use crate::catalog::CatalogSnapshot;
use crate::engine::{self, Reply};

use super::turn_lock::TurnLockManager;
use super::ui_builder::create_choice_keyboard;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    pool: SqlitePool,
    snapshot: Arc<CatalogSnapshot>,
    locks: Arc<TurnLockManager>,
    send_timeout: Duration,
) -> Result<()> {
    // Only text addressed to the bot in a direct conversation drives
    // the funnel; everything else is ignored.
    if !msg.chat.is_private() {
        debug!(chat_id = %msg.chat.id, "Ignoring non-private chat update");
        return Ok(());
    }
    let Some(text) = msg.text() else {
        debug!(chat_id = %msg.chat.id, "Ignoring non-text message");
        return Ok(());
    };

    let user_id = msg.chat.id.0;
    debug!(user_id, message_length = text.len(), "Received text message from user");

    // One turn at a time per user; the guard spans state load through send
    let _turn_guard = locks.acquire(user_id).await;

    let outcome = engine::run_turn(&pool, &snapshot, user_id, text).await?;
    debug!(user_id, state = outcome.conv.state, "Turn committed");

    if let Err(e) = deliver(&bot, msg.chat.id, outcome.reply, send_timeout).await {
        // State committed before the send; this turn's reply is lost but
        // the next inbound message continues from the new step.
        error!(user_id, error = %e, "Failed to deliver reply");
    }

    Ok(())
}

/// Send one render instruction as exactly one outbound message, bounded
/// by the configured timeout so a stalled upload cannot wedge the turn.
async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    reply: Reply,
    send_timeout: Duration,
) -> Result<()> {
    let keyboard = create_choice_keyboard(&reply.button_rows);

    let send = async {
        match reply.photo {
            Some(bytes) => {
                bot.send_photo(chat_id, InputFile::memory(bytes))
                    .caption(reply.text)
                    .reply_markup(keyboard)
                    .await?;
            }
            None => {
                bot.send_message(chat_id, reply.text)
                    .reply_markup(keyboard)
                    .await?;
            }
        }
        anyhow::Ok(())
    };

    tokio::time::timeout(send_timeout, send)
        .await
        .map_err(|_| anyhow::anyhow!("Send timed out after {}s", send_timeout.as_secs()))??;

    Ok(())
}
