use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use tokio::time::timeout;

use crate::{
    domain::{ChatId, MessageRef, RoleId, ThreadRef, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{FetchedMessage, InlineKeyboard, MessagingCapabilities},
    },
    Result,
};

/// MessagingPort decorator that bounds every outbound call.
///
/// An elapsed call surfaces as `Error::Timeout`, which is retryable. The
/// underlying request may still land on the platform afterwards.
pub struct TimeoutMessenger {
    inner: Arc<dyn MessagingPort>,
    limit: Duration,
}

impl TimeoutMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout(self.limit, fut).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(op, limit_ms = self.limit.as_millis() as u64, "surface call timed out");
                Err(Error::Timeout(self.limit, op.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for TimeoutMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.bounded("send_html", self.inner.send_html(chat_id, html))
            .await
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        self.bounded("edit_html", self.inner.edit_html(msg, html))
            .await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.bounded("delete_message", self.inner.delete_message(msg))
            .await
    }

    async fn pin_message(&self, msg: MessageRef) -> Result<()> {
        self.bounded("pin_message", self.inner.pin_message(msg))
            .await
    }

    async fn create_thread(&self, msg: MessageRef, name: &str) -> Result<ThreadRef> {
        self.bounded("create_thread", self.inner.create_thread(msg, name))
            .await
    }

    async fn send_in_thread(&self, thread: ThreadRef, html: &str) -> Result<MessageRef> {
        self.bounded("send_in_thread", self.inner.send_in_thread(thread, html))
            .await
    }

    async fn delete_thread(&self, thread: ThreadRef) -> Result<()> {
        self.bounded("delete_thread", self.inner.delete_thread(thread))
            .await
    }

    async fn fetch_message(&self, msg: MessageRef) -> Result<Option<FetchedMessage>> {
        self.bounded("fetch_message", self.inner.fetch_message(msg))
            .await
    }

    async fn actor_roles(&self, chat_id: ChatId, user_id: UserId) -> Result<HashSet<RoleId>> {
        self.bounded("actor_roles", self.inner.actor_roles(chat_id, user_id))
            .await
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.bounded(
            "send_inline_keyboard",
            self.inner.send_inline_keyboard(chat_id, html, keyboard),
        )
        .await
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.bounded(
            "answer_callback_query",
            self.inner.answer_callback_query(callback_id, text),
        )
        .await
    }
}
