//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - turns the Telegram sender into a core `Actor`
//! - parses arguments
//! - calls into `gossip-core` and reports the outcome to the sender

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, ParseMode, User},
};

use gossip_core::{domain::Actor, Error};

use crate::router::AppState;

mod callback;
mod commands;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(bot, msg, state).await;
        }
    }

    // Plain chatter is only answered in private chats.
    if msg.chat.is_private() {
        let _ = bot
            .send_message(msg.chat.id, commands::HELP_TEXT)
            .parse_mode(ParseMode::Html)
            .await;
    }
    Ok(())
}

pub(crate) fn actor_from(user: &User) -> Actor {
    Actor::new(user.id.0 as i64, user.full_name())
}

/// Log the full error, return the sender-facing text.
pub(crate) fn report(op: &str, actor: &Actor, err: &Error) -> &'static str {
    if err.is_retryable() {
        tracing::warn!(op, user = %actor.id, error = %err, "operation failed, retryable");
    } else {
        tracing::info!(op, user = %actor.id, error = %err, "operation refused");
    }
    err.user_message()
}
