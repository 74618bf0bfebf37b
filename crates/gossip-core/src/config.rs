use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    domain::{ChatId, RoleId},
    errors::Error,
    Result,
};

pub const DEFAULT_CONTENT_LIMIT: usize = 1800;
pub const DEFAULT_REPLY_LIMIT: usize = 1700;

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Platform
    pub telegram_bot_token: String,
    pub gossip_chat_id: ChatId,
    pub log_chat_id: ChatId,
    pub moderation_chat_id: Option<ChatId>,
    pub moderator_roles: Vec<RoleId>,

    // Presentation
    pub author_name: String,
    pub pin_published_message: bool,
    pub post_panel_on_start: bool,

    // Persistence
    pub store_file: PathBuf,
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,

    // Limits
    pub content_limit: usize,
    pub reply_limit: usize,
    pub surface_timeout: Duration,
}

/// The slice of configuration the confession workflow depends on.
///
/// Variants of the workflow (banlist-only vs. moderation-gated, pinning) are
/// expressed here instead of in forked code paths.
#[derive(Clone, Debug)]
pub struct Policy {
    pub public_chat: ChatId,
    pub log_chat: ChatId,
    /// `None` publishes immediately.
    pub moderation_chat: Option<ChatId>,
    pub moderator_roles: HashSet<RoleId>,
    pub pin_on_publish: bool,
    pub content_limit: usize,
    pub reply_limit: usize,
    pub author_name: String,
}

impl Policy {
    pub fn moderation_enabled(&self) -> bool {
        self.moderation_chat.is_some()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let gossip_chat_id = ChatId(required_i64("GOSSIP_CHAT_ID")?);
        let log_chat_id = ChatId(required_i64("LOG_CHAT_ID")?);

        // Moderation is enabled by the presence of a moderation chat.
        let moderation_chat_id = match env_str("MODERATION_CHAT_ID").and_then(non_empty) {
            Some(raw) => Some(ChatId(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("MODERATION_CHAT_ID is not a chat id: {raw}"))
            })?)),
            None => None,
        };
        let moderator_roles = parse_csv_lower(
            env_str("MODERATOR_ROLES").or_else(|| Some("owner,administrator".to_string())),
        )
        .into_iter()
        .map(RoleId)
        .collect::<Vec<_>>();
        if moderation_chat_id.is_some() && moderator_roles.is_empty() {
            return Err(Error::Config(
                "MODERATOR_ROLES must name at least one role when moderation is enabled"
                    .to_string(),
            ));
        }

        let author_name = env_str("AUTHOR_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| "Gossip Miri".to_string());
        let pin_published_message = env_bool("PIN_PUBLISHED_MESSAGE").unwrap_or(false);
        let post_panel_on_start = env_bool("POST_PANEL_ON_START").unwrap_or(true);

        let store_file =
            PathBuf::from(env_str("STORE_FILE").unwrap_or("gossip_store.json".to_string()));
        let audit_log_path =
            PathBuf::from(env_str("AUDIT_LOG_PATH").unwrap_or("gossip_audit.log".to_string()));

        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(true);

        let content_limit = env_usize("CONTENT_LIMIT")
            .unwrap_or(DEFAULT_CONTENT_LIMIT)
            .max(1);
        let reply_limit = env_usize("REPLY_LIMIT").unwrap_or(DEFAULT_REPLY_LIMIT).max(1);
        let surface_timeout =
            Duration::from_millis(env_u64("SURFACE_TIMEOUT_MS").unwrap_or(10_000).max(100));

        Ok(Self {
            telegram_bot_token,
            gossip_chat_id,
            log_chat_id,
            moderation_chat_id,
            moderator_roles,
            author_name,
            pin_published_message,
            post_panel_on_start,
            store_file,
            audit_log_path,
            audit_log_json,
            content_limit,
            reply_limit,
            surface_timeout,
        })
    }

    pub fn policy(&self) -> Policy {
        Policy {
            public_chat: self.gossip_chat_id,
            log_chat: self.log_chat_id,
            moderation_chat: self.moderation_chat_id,
            moderator_roles: self.moderator_roles.iter().cloned().collect(),
            pin_on_publish: self.pin_published_message,
            content_limit: self.content_limit,
            reply_limit: self.reply_limit,
            author_name: self.author_name.clone(),
        }
    }
}

/// Yes/no vocabulary accepted for typed anonymity flags.
pub fn parse_yes(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "oui" | "o" | "yes" | "y" | "true" | "1"
    )
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn required_i64(key: &str) -> Result<i64> {
    let raw = env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{key} is not a chat id: {raw}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
