//! Identity-revealing operational log.
//!
//! Each event goes to two places: the log chat (for moderators) and an
//! append-only file that is never rewritten, so it outlives retracted records.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;

use crate::{
    domain::{Actor, ChatId, Submission, UserId},
    errors::Error,
    formatting::log_entry_html,
    messaging::port::MessagingPort,
    utils::iso_timestamp_utc,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    Submitted,
    Published,
    Approved,
    Denied,
    Replied,
    Retracted,
    Banned,
    Unbanned,
}

impl AuditEventKind {
    pub fn title(self) -> &'static str {
        match self {
            AuditEventKind::Submitted => "New confession (pending review)",
            AuditEventKind::Published => "New confession",
            AuditEventKind::Approved => "Confession approved",
            AuditEventKind::Denied => "Confession denied",
            AuditEventKind::Replied => "New reply",
            AuditEventKind::Retracted => "Confession retracted",
            AuditEventKind::Banned => "Gossip ban",
            AuditEventKind::Unbanned => "Gossip unban",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: AuditEventKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    fn blank(event: AuditEventKind) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event,
            submission_id: None,
            author_id: None,
            author_name: None,
            moderator_id: None,
            moderator_name: None,
            target_id: None,
            anonymous: None,
            content: None,
            reason: None,
        }
    }

    /// Event about a submission, naming its real author.
    pub fn submission(event: AuditEventKind, sub: &Submission) -> Self {
        Self {
            submission_id: Some(sub.id.to_string()),
            author_id: Some(sub.author_id.0),
            author_name: Some(sub.author_name.clone()),
            anonymous: Some(sub.anonymous),
            content: Some(sub.content.clone()),
            ..Self::blank(event)
        }
    }

    pub fn decision(event: AuditEventKind, sub: &Submission, moderator: &Actor) -> Self {
        Self {
            moderator_id: Some(moderator.id.0),
            moderator_name: Some(moderator.display_name.clone()),
            ..Self::submission(event, sub)
        }
    }

    pub fn reply(sub: &Submission, author: &Actor, content: &str, anonymous: bool) -> Self {
        Self {
            submission_id: Some(sub.id.to_string()),
            author_id: Some(author.id.0),
            author_name: Some(author.display_name.clone()),
            anonymous: Some(anonymous),
            content: Some(content.to_string()),
            ..Self::blank(AuditEventKind::Replied)
        }
    }

    pub fn ban(moderator: &Actor, target: UserId, reason: Option<&str>) -> Self {
        Self {
            moderator_id: Some(moderator.id.0),
            moderator_name: Some(moderator.display_name.clone()),
            target_id: Some(target.0),
            reason: reason.map(|s| s.to_string()),
            ..Self::blank(AuditEventKind::Banned)
        }
    }

    pub fn unban(moderator: &Actor, target: UserId) -> Self {
        Self {
            moderator_id: Some(moderator.id.0),
            moderator_name: Some(moderator.display_name.clone()),
            target_id: Some(target.0),
            ..Self::blank(AuditEventKind::Unbanned)
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, event: &AuditEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::Json(serde::ser::Error::custom(
                "audit event is not a JSON object",
            )));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

/// Fan-out of audit events to the file and the log chat.
///
/// Neither sink can fail the action being logged; failures end up in tracing.
pub struct ModLog {
    audit: AuditLogger,
    messenger: Arc<dyn MessagingPort>,
    chat: ChatId,
}

impl ModLog {
    pub fn new(audit: AuditLogger, messenger: Arc<dyn MessagingPort>, chat: ChatId) -> Self {
        Self {
            audit,
            messenger,
            chat,
        }
    }

    pub async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.audit.write(&event) {
            tracing::warn!(error = %e, event = ?event.event, "audit file write failed");
        }
        if let Err(e) = self
            .messenger
            .send_html(self.chat, &log_entry_html(&event))
            .await
        {
            tracing::warn!(error = %e, event = ?event.event, "log chat post failed");
        }
    }
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}
