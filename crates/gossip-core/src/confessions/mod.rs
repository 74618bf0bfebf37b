//! Confession workflow: lifecycle state machine, thread correlation,
//! self-service retraction and ban management.
//!
//! Every operation that reads-then-writes a submission holds that
//! submission's lock for the whole check → act → persist sequence. Platform
//! calls that happen after the record is persisted are best-effort.

use std::sync::Arc;

use crate::{
    audit::{AuditLogger, ModLog},
    config::Policy,
    domain::{MessageRef, SubmissionId, ThreadRef},
    formatting::thread_name,
    gate::PermissionGate,
    locks::KeyedLocks,
    messaging::port::MessagingPort,
    store::RecordStore,
    Result,
};

mod bans;
mod lifecycle;
mod reply;
mod retract;

pub use retract::MineEntry;

pub struct ConfessionService {
    policy: Policy,
    store: Arc<RecordStore>,
    messenger: Arc<dyn MessagingPort>,
    gate: PermissionGate,
    modlog: ModLog,
    locks: KeyedLocks<SubmissionId>,
}

impl ConfessionService {
    pub fn new(
        policy: Policy,
        store: Arc<RecordStore>,
        messenger: Arc<dyn MessagingPort>,
        audit: AuditLogger,
    ) -> Self {
        let gate = PermissionGate::new(
            store.clone(),
            messenger.clone(),
            policy.public_chat,
            policy.moderator_roles.clone(),
        );
        let modlog = ModLog::new(audit, messenger.clone(), policy.log_chat);
        Self {
            policy,
            store,
            messenger,
            gate,
            modlog,
            locks: KeyedLocks::default(),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    async fn open_thread(&self, id: &SubmissionId, public: MessageRef) -> Result<ThreadRef> {
        self.messenger
            .create_thread(public, &thread_name(id))
            .await
    }

    async fn pin_if_configured(&self, public: MessageRef) {
        if !self.policy.pin_on_publish || !self.messenger.capabilities().supports_pins {
            return;
        }
        if let Err(e) = self.messenger.pin_message(public).await {
            tracing::warn!(error = %e, "pinning published confession failed");
        }
    }

    async fn discard_message(&self, msg: MessageRef) {
        if let Err(e) = self.messenger.delete_message(msg).await {
            tracing::warn!(
                chat = msg.chat_id.0,
                message = msg.message_id.0,
                error = %e,
                "best-effort message removal failed"
            );
        }
    }

    async fn discard_thread(&self, thread: ThreadRef) {
        if let Err(e) = self.messenger.delete_thread(thread).await {
            tracing::warn!(
                chat = thread.chat_id.0,
                root = thread.root.0,
                error = %e,
                "best-effort thread removal failed"
            );
        }
    }
}
