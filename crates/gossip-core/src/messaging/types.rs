use crate::domain::{MessageRef, SubmissionId};

const CALLBACK_PREFIX: &str = "gossip";

/// Inline keyboard (buttons) attached to moderation posts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub buttons: Vec<InlineButton>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineKeyboard {
    pub fn new(buttons: Vec<InlineButton>) -> Self {
        Self { buttons }
    }

    /// Approve / Deny buttons for a pending submission.
    pub fn review(id: &SubmissionId) -> Self {
        Self::new(vec![
            InlineButton {
                label: "✅ Approve".to_string(),
                callback_data: ReviewAction::Approve.callback_data(id),
            },
            InlineButton {
                label: "⛔ Deny".to_string(),
                callback_data: ReviewAction::Deny.callback_data(id),
            },
        ])
    }
}

/// Moderator decision carried by a button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Deny,
}

impl ReviewAction {
    fn verb(self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Deny => "deny",
        }
    }

    pub fn callback_data(self, id: &SubmissionId) -> String {
        format!("{CALLBACK_PREFIX}:{}:{}", self.verb(), id)
    }

    /// Parse `gossip:{approve|deny}:{id}`.
    pub fn parse_callback(data: &str) -> Option<(ReviewAction, SubmissionId)> {
        let mut parts = data.splitn(3, ':');
        if parts.next()? != CALLBACK_PREFIX {
            return None;
        }
        let action = match parts.next()? {
            "approve" => ReviewAction::Approve,
            "deny" => ReviewAction::Deny,
            _ => return None,
        };
        let id = parts.next()?.trim();
        if id.is_empty() {
            return None;
        }
        Some((action, SubmissionId(id.to_string())))
    }
}

/// What the core needs to know about a live message.
#[derive(Clone, Debug)]
pub struct FetchedMessage {
    pub msg: MessageRef,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_edit: bool,
    pub supports_pins: bool,
    pub supports_fetch: bool,
}
