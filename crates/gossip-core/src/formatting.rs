//! HTML rendering for the three surfaces.
//!
//! Public renderers must never mention the author of an anonymous submission.
//! Moderation and log renderers always do.

use crate::{
    audit::AuditEvent,
    domain::{Actor, Submission, SubmissionId},
    utils::truncate_text,
};

/// Keeps a log entry under the platform's message size.
const LOG_CONTENT_CHARS: usize = 3000;

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━━━━";

fn footer(brand: &str) -> String {
    format!("<i>XOXO, {} 💋</i>", escape_html(brand))
}

pub fn public_post_html(brand: &str, sub: &Submission) -> String {
    let mut out = format!("<b>🤫 Confession</b>\n\n{}", escape_html(&sub.content));
    if !sub.anonymous {
        out.push_str(&format!("\n\n— <i>{}</i>", escape_html(&sub.author_name)));
    }
    out.push_str("\n\n");
    out.push_str(&footer(brand));
    out
}

pub fn review_post_html(sub: &Submission) -> String {
    format!(
        "<b>🕵️ Pending confession</b> <code>{}</code>\n\
         <b>Author:</b> {} (<code>{}</code>)\n\
         <b>Anonymous:</b> {}\n\n{}",
        escape_html(sub.id.as_str()),
        escape_html(&sub.author_name),
        sub.author_id,
        yes_no(sub.anonymous),
        escape_html(&sub.content),
    )
}

pub fn review_outcome_html(sub: &Submission, moderator: &Actor, approved: bool) -> String {
    let verdict = if approved { "✅ Approved" } else { "⛔ Denied" };
    format!(
        "{}\n\n<b>{verdict}</b> by {} (<code>{}</code>)",
        review_post_html(sub),
        escape_html(&moderator.display_name),
        moderator.id,
    )
}

pub fn thread_name(id: &SubmissionId) -> String {
    format!("💬 Replies — #{id}")
}

pub fn reply_html(author: &Actor, content: &str, anonymous: bool) -> String {
    if anonymous {
        format!("<b>Reply (anonymous)</b>\n{}", escape_html(content))
    } else {
        format!(
            "<b>{}:</b>\n{}",
            escape_html(&author.display_name),
            escape_html(content)
        )
    }
}

pub fn panel_html(brand: &str) -> String {
    let brand = escape_html(brand);
    format!(
        "<b>{brand} — confession corner</b>\n\
         {SEPARATOR}\n\
         • <b>Confess</b> something juicy: DM me <code>/confess your story</code> (anonymous), \
         or <code>/confess_signed</code> to sign it.\n\
         • Every post gets a <b>thread</b> for replies: <code>/reply &lt;id&gt; text</code>.\n\
         • Changed your mind? <code>/mine</code> then <code>/retract &lt;id&gt;</code>.\n\
         • Stay classy: no doxxing, no targeted insults, no personal info.\n\n\
         <i>XOXO, {brand} 💋</i>"
    )
}

/// One line per audit field, for the log chat.
pub fn log_entry_html(ev: &AuditEvent) -> String {
    let mut out = format!("<b>🗂️ {}</b>", ev.event.title());
    if let Some(id) = &ev.submission_id {
        out.push_str(&format!(" <code>{}</code>", escape_html(id)));
    }
    if let (Some(id), Some(name)) = (ev.author_id, &ev.author_name) {
        out.push_str(&format!(
            "\n<b>Author:</b> {} (<code>{id}</code>)",
            escape_html(name)
        ));
    }
    if let (Some(id), Some(name)) = (ev.moderator_id, &ev.moderator_name) {
        out.push_str(&format!(
            "\n<b>Moderator:</b> {} (<code>{id}</code>)",
            escape_html(name)
        ));
    }
    if let Some(target) = ev.target_id {
        out.push_str(&format!("\n<b>Member:</b> <code>{target}</code>"));
    }
    if let Some(anon) = ev.anonymous {
        out.push_str(&format!("\n<b>Anonymous:</b> {}", yes_no(anon)));
    }
    if let Some(reason) = &ev.reason {
        out.push_str(&format!("\n<b>Reason:</b> {}", escape_html(reason)));
    }
    if let Some(content) = &ev.content {
        out.push_str(&format!(
            "\n<b>Content:</b>\n{}",
            escape_html(&truncate_text(content, LOG_CONTENT_CHARS))
        ));
    }
    out
}

pub fn submissions_list_html(items: &[(SubmissionId, String, &'static str)]) -> String {
    if items.is_empty() {
        return "📭 You have no confessions on record.".to_string();
    }
    let mut out = "<b>Your confessions</b> (oldest first)\n".to_string();
    for (id, preview, state) in items {
        out.push_str(&format!(
            "\n• <code>{}</code> [{state}] {}",
            escape_html(id.as_str()),
            escape_html(preview)
        ));
    }
    out.push_str("\n\nUse <code>/retract &lt;id&gt;</code> to delete one.");
    out
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}
