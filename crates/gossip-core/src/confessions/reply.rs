use crate::{
    audit::AuditEvent,
    domain::{Actor, MessageRef, SubmissionId, SubmissionState, ThreadRef},
    errors::Error,
    formatting::reply_html,
    utils::sanitize,
    Result,
};

use super::ConfessionService;

impl ConfessionService {
    /// Post a reply into the confession's thread, opening the thread first if
    /// it does not exist yet. The first caller to find no thread creates it;
    /// everyone after that reuses the persisted one.
    pub async fn reply(
        &self,
        actor: &Actor,
        id: &SubmissionId,
        content: &str,
        anonymous: bool,
    ) -> Result<MessageRef> {
        self.gate.require_not_banned(actor).await?;

        let content = sanitize(content, self.policy.reply_limit);
        if content.is_empty() {
            return Err(Error::InvalidInput("empty reply".to_string()));
        }

        // Held until the posted reply is recorded on the submission.
        let _guard = self.locks.lock(id).await;
        let mut sub = self.store.get(id).await?;
        if sub.state != SubmissionState::Published {
            return Err(Error::NotFound(format!("submission {id} is not published")));
        }
        let thread = match sub.thread {
            Some(t) => t,
            None => {
                let t = self.thread_for_orphaned_post(&sub.id, sub.published).await?;
                sub.thread = Some(t);
                if let Err(e) = self.store.put(sub.clone()).await {
                    self.discard_thread(t).await;
                    return Err(e);
                }
                t
            }
        };

        let posted = self
            .messenger
            .send_in_thread(thread, &reply_html(actor, &content, anonymous))
            .await?;

        sub.replies.push(posted);
        if let Err(e) = self.store.put(sub.clone()).await {
            self.discard_message(posted).await;
            return Err(e);
        }

        tracing::info!(id = %sub.id, author = %actor.id, "reply posted");
        self.modlog
            .record(AuditEvent::reply(&sub, actor, &content, anonymous))
            .await;
        Ok(posted)
    }

    async fn thread_for_orphaned_post(
        &self,
        id: &SubmissionId,
        published: Option<MessageRef>,
    ) -> Result<ThreadRef> {
        let Some(public) = published else {
            return Err(Error::NotFound(format!("submission {id} has no public post")));
        };
        if self.messenger.capabilities().supports_fetch
            && self.messenger.fetch_message(public).await?.is_none()
        {
            return Err(Error::NotFound(format!(
                "public post of {id} no longer exists"
            )));
        }
        self.open_thread(id, public).await
    }
}
