use crate::{
    audit::{AuditEvent, AuditEventKind},
    domain::{Actor, Submission, SubmissionId, SubmissionState},
    errors::Error,
    Result,
};

use super::ConfessionService;

const PREVIEW_CHARS: usize = 80;

/// One row of an author's own submissions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MineEntry {
    pub id: SubmissionId,
    pub preview: String,
    pub state: SubmissionState,
}

impl ConfessionService {
    /// The actor's own submissions, oldest first, at most 25.
    pub async fn list_mine(&self, actor: &Actor) -> Vec<MineEntry> {
        self.store
            .list_by_author(actor.id)
            .await
            .into_iter()
            .map(|s| MineEntry {
                preview: s.preview(PREVIEW_CHARS),
                id: s.id,
                state: s.state,
            })
            .collect()
    }

    /// Retract one of the actor's own submissions.
    ///
    /// Only the author may do this, moderator or not. Platform cleanup
    /// (thread, public post, moderation post) is best-effort; the record is
    /// purged regardless.
    pub async fn delete(&self, actor: &Actor, id: &SubmissionId) -> Result<Submission> {
        self.gate.require_not_banned(actor).await?;

        let _guard = self.locks.lock(id).await;
        let sub = self.store.get(id).await?;
        if sub.author_id != actor.id {
            return Err(Error::Forbidden(format!(
                "user {} does not own submission {id}",
                actor.id
            )));
        }
        if sub.state.is_terminal() {
            return Err(Error::InvalidState(format!(
                "submission {id} is {}",
                sub.state.label()
            )));
        }

        for reply in &sub.replies {
            self.discard_message(*reply).await;
        }
        if let Some(thread) = sub.thread {
            self.discard_thread(thread).await;
        }
        if let Some(public) = sub.published {
            self.discard_message(public).await;
        }
        if let Some(review) = sub.review {
            if sub.state == SubmissionState::PendingReview {
                self.discard_message(review).await;
            }
        }

        let mut removed = self.store.delete(id).await?;
        removed.state = SubmissionState::Deleted;

        tracing::info!(id = %removed.id, author = %actor.id, "confession retracted");
        self.modlog
            .record(AuditEvent::submission(AuditEventKind::Retracted, &removed))
            .await;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{service, LOG};

    fn alice() -> Actor {
        Actor::new(1001, "Alice")
    }

    #[tokio::test]
    async fn author_can_list_and_retract() {
        let (svc, fake) = service(false);
        let sub = svc.submit_confession(&alice(), "regret", true).await.unwrap();

        let mine = svc.list_mine(&alice()).await;
        assert_eq!(
            mine,
            vec![MineEntry {
                id: sub.id.clone(),
                preview: "regret".to_string(),
                state: SubmissionState::Published,
            }]
        );

        let removed = svc.delete(&alice(), &sub.id).await.unwrap();
        assert_eq!(removed.state, SubmissionState::Deleted);
        assert_eq!(fake.deleted_threads(), vec![sub.thread.unwrap()]);
        assert_eq!(fake.deleted_messages(), vec![sub.published.unwrap()]);
        assert!(matches!(
            svc.store().get(&sub.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            svc.delete(&alice(), &sub.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(svc.list_mine(&alice()).await.is_empty());
        assert!(fake.sent_to(LOG).last().unwrap().contains("retracted"));
    }

    #[tokio::test]
    async fn retraction_removes_every_reply_in_the_thread() {
        let (svc, fake) = service(false);
        let bob = Actor::new(3003, "Bob");
        let sub = svc.submit_confession(&alice(), "tea", true).await.unwrap();
        let r1 = svc.reply(&bob, &sub.id, "no way", true).await.unwrap();
        let r2 = svc.reply(&bob, &sub.id, "way", false).await.unwrap();

        svc.delete(&alice(), &sub.id).await.unwrap();

        let deleted = fake.deleted_messages();
        assert!(deleted.contains(&r1));
        assert!(deleted.contains(&r2));
        assert!(deleted.contains(&sub.published.unwrap()));
        assert_eq!(fake.deleted_threads(), vec![sub.thread.unwrap()]);
    }

    #[tokio::test]
    async fn reply_racing_a_retraction_leaves_nothing_live() {
        let (svc, fake) = service(false);
        let bob = Actor::new(3003, "Bob");
        let sub = svc.submit_confession(&alice(), "tea", true).await.unwrap();

        let owner = alice();
        let (replied, deleted) = tokio::join!(
            svc.reply(&bob, &sub.id, "late reply", true),
            svc.delete(&owner, &sub.id),
        );
        deleted.unwrap();

        match replied {
            Ok(posted) => assert!(fake.deleted_messages().contains(&posted)),
            Err(e) => {
                assert!(matches!(e, Error::NotFound(_)));
                assert!(fake.thread_posts().is_empty());
            }
        }
        assert!(matches!(
            svc.store().get(&sub.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn others_cannot_retract_even_moderators() {
        let (svc, fake) = service(false);
        let owner = Actor::new(2002, "Owner");
        fake.grant_role(owner.id, "owner");
        let sub = svc.submit_confession(&alice(), "mine", true).await.unwrap();

        let err = svc.delete(&owner, &sub.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(svc.store().get(&sub.id).await.is_ok());
        assert!(fake.deleted_messages().is_empty());
        assert!(svc.list_mine(&owner).await.is_empty());
    }

    #[tokio::test]
    async fn platform_cleanup_failures_still_purge_the_record() {
        let (svc, fake) = service(false);
        let sub = svc.submit_confession(&alice(), "gone", true).await.unwrap();
        fake.fail_deletes(true);

        svc.delete(&alice(), &sub.id).await.unwrap();
        assert!(matches!(
            svc.store().get(&sub.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn banned_author_cannot_retract() {
        let (svc, fake) = service(false);
        let sub = svc.submit_confession(&alice(), "x", true).await.unwrap();
        svc.store().add_ban(alice().id).await.unwrap();

        let err = svc.delete(&alice(), &sub.id).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(svc.store().get(&sub.id).await.is_ok());
        assert!(fake.deleted_messages().is_empty());
    }

    #[tokio::test]
    async fn rejected_submissions_cannot_be_retracted() {
        let (svc, fake) = service(true);
        let m = Actor::new(2002, "Marie");
        fake.grant_role(m.id, "owner");
        let sub = svc.submit_confession(&alice(), "no", true).await.unwrap();
        svc.deny(&m, &sub.id).await.unwrap();

        let err = svc.delete(&alice(), &sub.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(
            svc.list_mine(&alice()).await[0].state,
            SubmissionState::Rejected
        );
    }

    #[tokio::test]
    async fn pending_submission_retraction_removes_moderation_post() {
        let (svc, fake) = service(true);
        let sub = svc.submit_confession(&alice(), "wait", true).await.unwrap();

        svc.delete(&alice(), &sub.id).await.unwrap();
        assert_eq!(fake.deleted_messages(), vec![sub.review.unwrap()]);
        assert!(fake.deleted_threads().is_empty());
    }

    #[tokio::test]
    async fn previews_are_shortened() {
        let (svc, _fake) = service(false);
        svc.submit_confession(&alice(), &"y".repeat(300), true)
            .await
            .unwrap();
        let mine = svc.list_mine(&alice()).await;
        assert_eq!(mine[0].preview.chars().count(), PREVIEW_CHARS + 1);
    }
}
