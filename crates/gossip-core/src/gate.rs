//! Identity & permission gate: ban membership and moderator capability.

use std::{collections::HashSet, sync::Arc};

use crate::{
    domain::{Actor, ChatId, RoleId, UserId},
    errors::Error,
    messaging::port::MessagingPort,
    store::RecordStore,
    Result,
};

/// Moderation is granted iff the actor holds at least one allow-listed role.
pub fn has_moderator_role(roles: &HashSet<RoleId>, allowed: &HashSet<RoleId>) -> bool {
    !roles.is_disjoint(allowed)
}

pub struct PermissionGate {
    store: Arc<RecordStore>,
    messenger: Arc<dyn MessagingPort>,
    /// Chat whose memberships carry the roles.
    roles_chat: ChatId,
    moderator_roles: HashSet<RoleId>,
}

impl PermissionGate {
    pub fn new(
        store: Arc<RecordStore>,
        messenger: Arc<dyn MessagingPort>,
        roles_chat: ChatId,
        moderator_roles: HashSet<RoleId>,
    ) -> Self {
        Self {
            store,
            messenger,
            roles_chat,
            moderator_roles,
        }
    }

    pub async fn is_banned(&self, user: UserId) -> bool {
        self.store.is_banned(user).await
    }

    /// Fails closed: a role lookup error means "not a moderator".
    pub async fn can_moderate(&self, actor: &Actor) -> bool {
        match self.messenger.actor_roles(self.roles_chat, actor.id).await {
            Ok(roles) => has_moderator_role(&roles, &self.moderator_roles),
            Err(e) => {
                tracing::warn!(user = %actor.id, error = %e, "role lookup failed, treating as non-moderator");
                false
            }
        }
    }

    pub async fn require_not_banned(&self, actor: &Actor) -> Result<()> {
        if self.is_banned(actor.id).await {
            return Err(Error::Forbidden(format!("user {} is banned", actor.id)));
        }
        Ok(())
    }

    pub async fn require_moderator(&self, actor: &Actor) -> Result<()> {
        if !self.can_moderate(actor).await {
            return Err(Error::Forbidden(format!(
                "user {} lacks a moderator role",
                actor.id
            )));
        }
        Ok(())
    }
}
