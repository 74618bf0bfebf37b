use std::collections::HashSet;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef, RoleId, ThreadRef, UserId},
    messaging::types::{FetchedMessage, InlineKeyboard, MessagingCapabilities},
    Result,
};

/// Cross-platform port used by the confession core.
///
/// Posting goes to one of three surfaces (public, moderation, log), all plain
/// chats from the port's point of view. Deletions are best-effort: callers
/// expect them to fail when the target is already gone.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;
    async fn pin_message(&self, msg: MessageRef) -> Result<()>;

    /// Open a discussion thread under `msg`.
    async fn create_thread(&self, msg: MessageRef, name: &str) -> Result<ThreadRef>;
    async fn send_in_thread(&self, thread: ThreadRef, html: &str) -> Result<MessageRef>;
    async fn delete_thread(&self, thread: ThreadRef) -> Result<()>;

    /// `Ok(None)` when the message no longer exists. Only meaningful when
    /// `capabilities().supports_fetch` is set.
    async fn fetch_message(&self, msg: MessageRef) -> Result<Option<FetchedMessage>>;

    /// Roles held by `user_id` in `chat_id`.
    async fn actor_roles(&self, chat_id: ChatId, user_id: UserId) -> Result<HashSet<RoleId>>;

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}
