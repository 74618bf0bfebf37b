//! Telegram adapter (teloxide).
//!
//! This crate implements the `gossip-core` MessagingPort over the Telegram Bot
//! API. Discussion threads are modelled as a header message replying to the
//! published confession; replies are posted as replies to that header.
//! Deleting the header leaves those replies in place, so the core records each
//! reply and deletes it on retraction.

use std::collections::HashSet;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use gossip_core::{
    domain::{ChatId, MessageId, MessageRef, RoleId, ThreadRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{FetchedMessage, InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMINISTRATOR: &str = "administrator";
pub const ROLE_MEMBER: &str = "member";

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::ExternalSurface(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    async fn send_reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(to.chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_to_message_id(Self::tg_msg_id(to.message_id))
                    .disable_web_page_preview(true)
            })
            .await?;

        Ok(MessageRef {
            chat_id: to.chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_edit: true,
            supports_pins: true,
            // The Bot API cannot read arbitrary messages back.
            supports_fetch: false,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .disable_web_page_preview(true)
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .edit_message_text(
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.message_id),
                    html.to_string(),
                )
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await?;
        Ok(())
    }

    async fn pin_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .pin_chat_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
                .disable_notification(true)
        })
        .await?;
        Ok(())
    }

    async fn create_thread(&self, msg: MessageRef, name: &str) -> Result<ThreadRef> {
        let header = format!("<b>{}</b>", gossip_core::formatting::escape_html(name));
        let root = self.send_reply_html(msg, &header).await?;
        Ok(ThreadRef {
            chat_id: root.chat_id,
            root: root.message_id,
        })
    }

    async fn send_in_thread(&self, thread: ThreadRef, html: &str) -> Result<MessageRef> {
        self.send_reply_html(thread.root_message(), html).await
    }

    async fn delete_thread(&self, thread: ThreadRef) -> Result<()> {
        self.delete_message(thread.root_message()).await
    }

    async fn fetch_message(&self, _msg: MessageRef) -> Result<Option<FetchedMessage>> {
        Err(Error::ExternalSurface(
            "telegram bots cannot fetch messages by id".to_string(),
        ))
    }

    async fn actor_roles(&self, chat_id: ChatId, user_id: UserId) -> Result<HashSet<RoleId>> {
        let tg_user = teloxide::types::UserId(user_id.0 as u64);
        let member = self
            .with_retry(|| self.bot.get_chat_member(Self::tg_chat(chat_id), tg_user))
            .await?;

        let mut roles = HashSet::new();
        if member.kind.is_owner() {
            roles.insert(RoleId::new(ROLE_OWNER));
        }
        if member.kind.is_administrator() {
            roles.insert(RoleId::new(ROLE_ADMINISTRATOR));
        }
        if member.kind.is_present() {
            roles.insert(RoleId::new(ROLE_MEMBER));
        }
        Ok(roles)
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        // All buttons on one row: Approve | Deny.
        let row: Vec<InlineKeyboardButton> = keyboard
            .buttons
            .into_iter()
            .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
            .collect();
        let markup = InlineKeyboardMarkup::new(vec![row]);

        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup.clone())
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await?;
        Ok(())
    }
}
