use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

/// Platform message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i32);

/// A stable reference to a posted message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A discussion thread hanging off a published confession.
///
/// `root` is the message that opens the thread; replies are attached to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRef {
    pub chat_id: ChatId,
    pub root: MessageId,
}

impl ThreadRef {
    pub fn root_message(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.root,
        }
    }
}

/// Role identifier as reported by the platform (e.g. `administrator`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub String);

impl RoleId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

/// Opaque submission identifier. Never changes once assigned.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    /// Id of a submission published straight to the public chat.
    pub fn from_message(msg: MessageRef) -> Self {
        Self(format!("{}:{}", msg.chat_id.0, msg.message_id.0))
    }

    /// Locally generated id for a submission parked for review.
    pub fn generate_pending() -> Self {
        let n: u64 = rand::random();
        Self(format!("p-{:012x}", n & 0xffff_ffff_ffff))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whoever triggered an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            display_name: display_name.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    PendingReview,
    Published,
    Rejected,
    Deleted,
}

impl SubmissionState {
    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Rejected | SubmissionState::Deleted)
    }

    pub fn label(self) -> &'static str {
        match self {
            SubmissionState::PendingReview => "pending review",
            SubmissionState::Published => "published",
            SubmissionState::Rejected => "rejected",
            SubmissionState::Deleted => "deleted",
        }
    }
}

/// One confession tracked through its lifecycle.
///
/// `author_id` is always stored, even for anonymous submissions: moderation
/// and self-service retraction depend on it. `anonymous` only affects display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub author_id: UserId,
    pub author_name: String,
    pub content: String,
    pub anonymous: bool,
    pub state: SubmissionState,
    pub created_at: DateTime<Utc>,

    /// Public message, once published.
    #[serde(default)]
    pub published: Option<MessageRef>,
    /// Moderation chat post awaiting a decision.
    #[serde(default)]
    pub review: Option<MessageRef>,
    #[serde(default)]
    pub thread: Option<ThreadRef>,
    /// Replies posted into the thread, removed along with it on retraction.
    #[serde(default)]
    pub replies: Vec<MessageRef>,
}

impl Submission {
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}…")
        } else {
            head
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_ids_are_prefixed_and_distinct() {
        let a = SubmissionId::generate_pending();
        let b = SubmissionId::generate_pending();
        assert!(a.as_str().starts_with("p-"));
        assert_eq!(a.as_str().len(), 14);
        assert_ne!(a, b);
    }

    #[test]
    fn message_ids_embed_chat_and_message() {
        let id = SubmissionId::from_message(MessageRef {
            chat_id: ChatId(-100),
            message_id: MessageId(7),
        });
        assert_eq!(id.to_string(), "-100:7");
    }

    #[test]
    fn terminal_states() {
        assert!(SubmissionState::Rejected.is_terminal());
        assert!(SubmissionState::Deleted.is_terminal());
        assert!(!SubmissionState::PendingReview.is_terminal());
        assert!(!SubmissionState::Published.is_terminal());
    }

    #[test]
    fn preview_marks_truncation() {
        let s = Submission {
            id: SubmissionId("x".to_string()),
            author_id: UserId(1),
            author_name: "a".to_string(),
            content: "héllo world".to_string(),
            anonymous: true,
            state: SubmissionState::Published,
            created_at: Utc::now(),
            published: None,
            review: None,
            thread: None,
            replies: Vec::new(),
        };
        assert_eq!(s.preview(5), "héllo…");
        assert_eq!(s.preview(50), "héllo world");
    }
}
