use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};

use gossip_core::{
    config::parse_yes,
    domain::{SubmissionId, SubmissionState, UserId},
    formatting::{escape_html, submissions_list_html},
};

use crate::router::AppState;

use super::{actor_from, report};

pub(crate) const HELP_TEXT: &str = "<b>Confessions</b> (in a private chat with me)\n\
/confess &lt;text&gt; — anonymous confession\n\
/confess_signed &lt;text&gt; — confession signed with your name\n\
/reply &lt;id&gt; &lt;text&gt; — anonymous reply in a confession's thread\n\
/reply_signed &lt;id&gt; &lt;text&gt; — signed reply\n\
/mine — your confessions\n\
/retract &lt;id&gt; — delete one of your confessions\n\n\
<b>Moderators</b>\n\
/approve &lt;id&gt;, /deny &lt;id&gt;\n\
/ban &lt;user id&gt; [reason] (or reply to their message), /unban &lt;user id&gt;, /bans";

/// Commands that would expose the sender if used in a group.
const PRIVATE_ONLY: &[&str] = &[
    "confess",
    "confess_signed",
    "reply",
    "reply_signed",
    "mine",
    "retract",
];

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim_start()),
        None => (s, ""),
    }
}

/// Optional leading `anon=<yes|no>` overrides the command's default.
fn parse_anon_flag(args: &str, default: bool) -> (bool, &str) {
    let (head, rest) = split_first_word(args);
    let value = head
        .strip_prefix("anon=")
        .or_else(|| head.strip_prefix("anonymous="));
    match value {
        Some(v) => (parse_yes(v), rest),
        None => (default, args.trim_start()),
    }
}

fn parse_user_id(s: &str) -> Option<UserId> {
    s.trim().parse::<i64>().ok().map(UserId)
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let actor = actor_from(user);
    let (cmd, args) = parse_command(text);

    if PRIVATE_ONLY.contains(&cmd.as_str()) && !msg.chat.is_private() {
        // Take the command out of the group before anyone reads it.
        let _ = bot.delete_message(msg.chat.id, msg.id).await;
        let _ = bot
            .send_message(
                user.id,
                "🤫 Send that to me in private, so nobody sees who you are.",
            )
            .await;
        return Ok(());
    }

    let svc = &state.service;
    let reply = match cmd.as_str() {
        "start" | "help" => HELP_TEXT.to_string(),

        "confess" | "confess_signed" => {
            let (anonymous, body) = parse_anon_flag(&args, cmd == "confess");
            match svc.submit_confession(&actor, body, anonymous).await {
                Ok(sub) if sub.state == SubmissionState::Published => format!(
                    "✅ <b>Published!</b> A thread is open for replies.\nId: <code>{}</code>",
                    escape_html(sub.id.as_str())
                ),
                Ok(sub) => format!(
                    "📨 Sent to the moderators. Check /mine for its status.\nId: <code>{}</code>",
                    escape_html(sub.id.as_str())
                ),
                Err(e) => report("submit", &actor, &e).to_string(),
            }
        }

        "reply" | "reply_signed" => {
            let (id, rest) = split_first_word(&args);
            let (anonymous, body) = parse_anon_flag(rest, cmd == "reply");
            if id.is_empty() {
                "Usage: /reply &lt;id&gt; &lt;text&gt;".to_string()
            } else {
                match svc
                    .reply(&actor, &SubmissionId(id.to_string()), body, anonymous)
                    .await
                {
                    Ok(_) => "✅ Reply posted in the thread.".to_string(),
                    Err(e) => report("reply", &actor, &e).to_string(),
                }
            }
        }

        "mine" => {
            let items = svc
                .list_mine(&actor)
                .await
                .into_iter()
                .map(|e| (e.id, e.preview, e.state.label()))
                .collect::<Vec<_>>();
            submissions_list_html(&items)
        }

        "retract" => {
            let (id, _) = split_first_word(&args);
            if id.is_empty() {
                "Usage: /retract &lt;id&gt; (see /mine)".to_string()
            } else {
                match svc.delete(&actor, &SubmissionId(id.to_string())).await {
                    Ok(sub) => format!(
                        "🗑️ Confession <code>{}</code> deleted.",
                        escape_html(sub.id.as_str())
                    ),
                    Err(e) => report("retract", &actor, &e).to_string(),
                }
            }
        }

        "approve" | "deny" => {
            let (id, _) = split_first_word(&args);
            let id = SubmissionId(id.to_string());
            let res = if cmd == "approve" {
                svc.approve(&actor, &id).await
            } else {
                svc.deny(&actor, &id).await
            };
            match res {
                Ok(sub) => format!(
                    "✅ <code>{}</code> is now {}.",
                    escape_html(sub.id.as_str()),
                    sub.state.label()
                ),
                Err(e) => report(&cmd, &actor, &e).to_string(),
            }
        }

        "ban" | "unban" => {
            // Either an explicit id or a reply to the member's message.
            let (head, rest) = split_first_word(&args);
            let from_reply = msg
                .reply_to_message()
                .and_then(|m| m.from())
                .map(|u| UserId(u.id.0 as i64));
            let (target, reason) = match (parse_user_id(head), from_reply) {
                (Some(id), _) => (Some(id), rest),
                (None, Some(id)) => (Some(id), args.as_str()),
                (None, None) => (None, ""),
            };

            match target {
                None => format!("Usage: /{cmd} &lt;user id&gt; (or reply to their message)"),
                Some(target) if cmd == "ban" => {
                    let reason = Some(reason).filter(|r| !r.trim().is_empty());
                    match svc.ban(&actor, target, reason).await {
                        Ok(true) => format!("✅ <code>{target}</code> banned from confessions."),
                        Ok(false) => format!("ℹ️ <code>{target}</code> was already banned."),
                        Err(e) => report("ban", &actor, &e).to_string(),
                    }
                }
                Some(target) => match svc.unban(&actor, target).await {
                    Ok(true) => format!("✅ <code>{target}</code> unbanned."),
                    Ok(false) => format!("ℹ️ <code>{target}</code> was not banned."),
                    Err(e) => report("unban", &actor, &e).to_string(),
                },
            }
        }

        "bans" => match svc.list_bans(&actor).await {
            Ok(bans) if bans.is_empty() => "📭 Ban list is empty.".to_string(),
            Ok(bans) => {
                let lines = bans
                    .iter()
                    .map(|id| format!("- <code>{id}</code>"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("🚫 <b>Banned:</b>\n{lines}")
            }
            Err(e) => report("bans", &actor, &e).to_string(),
        },

        _ => "Unknown command. Try /help.".to_string(),
    };

    let _ = bot
        .send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await;
    Ok(())
}
