use chrono::Utc;

use crate::{
    audit::{AuditEvent, AuditEventKind},
    domain::{Actor, Submission, SubmissionId, SubmissionState},
    errors::Error,
    formatting::{public_post_html, review_outcome_html, review_post_html},
    messaging::types::InlineKeyboard,
    utils::sanitize,
    Result,
};

use super::ConfessionService;

impl ConfessionService {
    /// Accept a new confession.
    ///
    /// Without a moderation chat it is published right away (post, thread,
    /// optional pin). Otherwise it is parked in the moderation chat with
    /// Approve/Deny buttons. Nothing is posted if the actor is banned or the
    /// content is empty.
    pub async fn submit_confession(
        &self,
        actor: &Actor,
        content: &str,
        anonymous: bool,
    ) -> Result<Submission> {
        self.gate.require_not_banned(actor).await?;

        let content = sanitize(content, self.policy.content_limit);
        if content.is_empty() {
            return Err(Error::InvalidInput("empty confession".to_string()));
        }

        let sub = Submission {
            id: SubmissionId::generate_pending(),
            author_id: actor.id,
            author_name: actor.display_name.clone(),
            content,
            anonymous,
            state: SubmissionState::PendingReview,
            created_at: Utc::now(),
            published: None,
            review: None,
            thread: None,
            replies: Vec::new(),
        };

        if self.policy.moderation_enabled() {
            self.park_for_review(sub).await
        } else {
            self.publish_directly(sub).await
        }
    }

    async fn park_for_review(&self, mut sub: Submission) -> Result<Submission> {
        let Some(mod_chat) = self.policy.moderation_chat else {
            return Err(Error::Config("moderation chat is not configured".to_string()));
        };

        let review = self
            .messenger
            .send_inline_keyboard(mod_chat, &review_post_html(&sub), InlineKeyboard::review(&sub.id))
            .await?;
        sub.review = Some(review);

        if let Err(e) = self.store.put(sub.clone()).await {
            self.discard_message(review).await;
            return Err(e);
        }

        tracing::info!(id = %sub.id, author = %sub.author_id, "confession parked for review");
        self.modlog
            .record(AuditEvent::submission(AuditEventKind::Submitted, &sub))
            .await;
        Ok(sub)
    }

    async fn publish_directly(&self, mut sub: Submission) -> Result<Submission> {
        let public = self
            .messenger
            .send_html(
                self.policy.public_chat,
                &public_post_html(&self.policy.author_name, &sub),
            )
            .await?;
        sub.id = SubmissionId::from_message(public);

        let thread = match self.open_thread(&sub.id, public).await {
            Ok(t) => t,
            Err(e) => {
                self.discard_message(public).await;
                return Err(e);
            }
        };

        sub.published = Some(public);
        sub.thread = Some(thread);
        sub.state = SubmissionState::Published;

        if let Err(e) = self.store.put(sub.clone()).await {
            self.discard_thread(thread).await;
            self.discard_message(public).await;
            return Err(e);
        }
        self.pin_if_configured(public).await;

        tracing::info!(id = %sub.id, author = %sub.author_id, "confession published");
        self.modlog
            .record(AuditEvent::submission(AuditEventKind::Published, &sub))
            .await;
        Ok(sub)
    }

    /// Publish a pending confession. Of two racing decisions, only the first
    /// one applies; the other sees `InvalidState`.
    pub async fn approve(&self, moderator: &Actor, id: &SubmissionId) -> Result<Submission> {
        self.gate.require_moderator(moderator).await?;

        let _guard = self.locks.lock(id).await;
        let mut sub = self.store.get(id).await?;
        require_pending(&sub)?;

        let public = self
            .messenger
            .send_html(
                self.policy.public_chat,
                &public_post_html(&self.policy.author_name, &sub),
            )
            .await?;

        let (thread, fresh_thread) = match sub.thread {
            Some(t) => (t, false),
            None => match self.open_thread(&sub.id, public).await {
                Ok(t) => (t, true),
                Err(e) => {
                    self.discard_message(public).await;
                    return Err(e);
                }
            },
        };

        let mut next = sub.clone();
        next.published = Some(public);
        next.thread = Some(thread);
        next.state = SubmissionState::Published;
        if let Err(e) = self.store.put(next.clone()).await {
            if fresh_thread {
                self.discard_thread(thread).await;
            }
            self.discard_message(public).await;
            return Err(e);
        }
        sub = next;
        self.pin_if_configured(public).await;
        self.mark_review(&sub, moderator, true).await;

        tracing::info!(id = %sub.id, moderator = %moderator.id, "confession approved");
        self.modlog
            .record(AuditEvent::decision(AuditEventKind::Approved, &sub, moderator))
            .await;
        Ok(sub)
    }

    /// Reject a pending confession for good. Nothing is ever published.
    pub async fn deny(&self, moderator: &Actor, id: &SubmissionId) -> Result<Submission> {
        self.gate.require_moderator(moderator).await?;

        let _guard = self.locks.lock(id).await;
        let mut sub = self.store.get(id).await?;
        require_pending(&sub)?;

        sub.state = SubmissionState::Rejected;
        self.store.put(sub.clone()).await?;
        self.mark_review(&sub, moderator, false).await;

        tracing::info!(id = %sub.id, moderator = %moderator.id, "confession denied");
        self.modlog
            .record(AuditEvent::decision(AuditEventKind::Denied, &sub, moderator))
            .await;
        Ok(sub)
    }

    /// Replace the buttons of the moderation post with the verdict.
    async fn mark_review(&self, sub: &Submission, moderator: &Actor, approved: bool) {
        let Some(review) = sub.review else {
            return;
        };
        if !self.messenger.capabilities().supports_edit {
            return;
        }
        let html = review_outcome_html(sub, moderator, approved);
        if let Err(e) = self.messenger.edit_html(review, &html).await {
            tracing::warn!(id = %sub.id, error = %e, "updating moderation post failed");
        }
    }
}

fn require_pending(sub: &Submission) -> Result<()> {
    if sub.state != SubmissionState::PendingReview {
        return Err(Error::InvalidState(format!(
            "submission {} is {}",
            sub.id,
            sub.state.label()
        )));
    }
    Ok(())
}
