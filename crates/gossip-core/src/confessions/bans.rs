use std::collections::BTreeSet;

use crate::{
    audit::AuditEvent,
    domain::{Actor, UserId},
    Result,
};

use super::ConfessionService;

const DEFAULT_BAN_REASON: &str = "No reason given";

impl ConfessionService {
    /// Ban `target` from confessing and replying. `Ok(false)` if already banned.
    pub async fn ban(&self, moderator: &Actor, target: UserId, reason: Option<&str>) -> Result<bool> {
        self.gate.require_moderator(moderator).await?;

        let added = self.store.add_ban(target).await?;
        if added {
            let reason = reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_BAN_REASON);
            tracing::info!(member = %target, moderator = %moderator.id, "member banned");
            self.modlog
                .record(AuditEvent::ban(moderator, target, Some(reason)))
                .await;
        }
        Ok(added)
    }

    /// `Ok(false)` if `target` was not banned.
    pub async fn unban(&self, moderator: &Actor, target: UserId) -> Result<bool> {
        self.gate.require_moderator(moderator).await?;

        let removed = self.store.remove_ban(target).await?;
        if removed {
            tracing::info!(member = %target, moderator = %moderator.id, "member unbanned");
            self.modlog.record(AuditEvent::unban(moderator, target)).await;
        }
        Ok(removed)
    }

    pub async fn list_bans(&self, moderator: &Actor) -> Result<BTreeSet<UserId>> {
        self.gate.require_moderator(moderator).await?;
        Ok(self.store.all_bans().await)
    }
}
