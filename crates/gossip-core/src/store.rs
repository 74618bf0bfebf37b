//! Durable submission records and ban set.
//!
//! The whole structure is rewritten on every mutation (write to a sibling temp
//! file, then rename). Mutations are serialized by the inner mutex, and memory
//! is only updated once the rewrite succeeded, so a failed save leaves both
//! copies at the previous state.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::{Submission, SubmissionId, UserId},
    errors::Error,
    utils::iso_timestamp_compact,
    Result,
};

/// Selection menus on the platform side cannot show more than this.
pub const MAX_LIST_ENTRIES: usize = 25;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct StoreData {
    /// Insertion order.
    #[serde(default)]
    submissions: Vec<Submission>,
    #[serde(default)]
    bans: BTreeSet<UserId>,
}

pub struct RecordStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl RecordStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty. An unreadable one is moved aside and the
    /// store starts empty as well: losing records beats refusing to start.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match load_store_file(&path) {
            Ok(Some(data)) => {
                tracing::info!(
                    path = %path.display(),
                    submissions = data.submissions.len(),
                    bans = data.bans.len(),
                    "record store loaded"
                );
                data
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "no record store yet, starting empty");
                StoreData::default()
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "RECORD STORE UNREADABLE, starting empty; previous data is lost"
                );
                quarantine(&path);
                StoreData::default()
            }
        };

        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn put(&self, submission: Submission) -> Result<()> {
        self.mutate(|data| {
            match data
                .submissions
                .iter_mut()
                .find(|s| s.id == submission.id)
            {
                Some(slot) => *slot = submission,
                None => data.submissions.push(submission),
            }
        })
        .await
    }

    pub async fn get(&self, id: &SubmissionId) -> Result<Submission> {
        let data = self.data.lock().await;
        data.submissions
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("submission {id}")))
    }

    /// Remove and return the record.
    pub async fn delete(&self, id: &SubmissionId) -> Result<Submission> {
        let removed = self
            .mutate(|data| {
                let idx = data.submissions.iter().position(|s| &s.id == id)?;
                Some(data.submissions.remove(idx))
            })
            .await?;
        removed.ok_or_else(|| Error::NotFound(format!("submission {id}")))
    }

    /// Oldest first, at most [`MAX_LIST_ENTRIES`].
    pub async fn list_by_author(&self, author: UserId) -> Vec<Submission> {
        let data = self.data.lock().await;
        data.submissions
            .iter()
            .filter(|s| s.author_id == author)
            .take(MAX_LIST_ENTRIES)
            .cloned()
            .collect()
    }

    /// `true` if the actor was not banned before.
    pub async fn add_ban(&self, user: UserId) -> Result<bool> {
        if self.is_banned(user).await {
            return Ok(false);
        }
        self.mutate(|data| data.bans.insert(user)).await
    }

    /// `true` if the actor was banned before.
    pub async fn remove_ban(&self, user: UserId) -> Result<bool> {
        if !self.is_banned(user).await {
            return Ok(false);
        }
        self.mutate(|data| data.bans.remove(&user)).await
    }

    pub async fn is_banned(&self, user: UserId) -> bool {
        self.data.lock().await.bans.contains(&user)
    }

    pub async fn all_bans(&self) -> BTreeSet<UserId> {
        self.data.lock().await.bans.clone()
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> Result<R> {
        let mut guard = self.data.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next);
        save_store_file(&self.path, &next)?;
        *guard = next;
        Ok(out)
    }
}

fn load_store_file(path: &Path) -> Result<Option<StoreData>> {
    if !path.exists() {
        return Ok(None);
    }
    let txt = fs::read_to_string(path)
        .map_err(|e| Error::StoreCorruption(format!("read {}: {e}", path.display())))?;
    if txt.trim().is_empty() {
        return Ok(None);
    }
    let data: StoreData = serde_json::from_str(&txt)
        .map_err(|e| Error::StoreCorruption(format!("parse {}: {e}", path.display())))?;
    Ok(Some(data))
}

fn save_store_file(path: &Path, data: &StoreData) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let txt = serde_json::to_string_pretty(data)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, txt)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn quarantine(path: &Path) {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".corrupt-{}", iso_timestamp_compact()));
    let target = path.with_file_name(name);
    match fs::rename(path, &target) {
        Ok(()) => tracing::warn!(moved_to = %target.display(), "unreadable record store moved aside"),
        Err(e) => tracing::warn!(error = %e, "could not move unreadable record store aside"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SubmissionState;
    use crate::test_support::tmp_file;
    use chrono::Utc;

    fn submission(id: &str, author: i64) -> Submission {
        Submission {
            id: SubmissionId(id.to_string()),
            author_id: UserId(author),
            author_name: format!("user{author}"),
            content: format!("secret {id}"),
            anonymous: true,
            state: SubmissionState::Published,
            created_at: Utc::now(),
            published: None,
            review: None,
            thread: None,
            replies: Vec::new(),
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_the_same_record() {
        let store = RecordStore::open(tmp_file("gossip-store-put"));
        let s = submission("a", 1);
        store.put(s.clone()).await.unwrap();
        assert_eq!(store.get(&s.id).await.unwrap(), s);
    }

    #[tokio::test]
    async fn put_replaces_in_place_keeping_order() {
        let store = RecordStore::open(tmp_file("gossip-store-order"));
        store.put(submission("a", 1)).await.unwrap();
        store.put(submission("b", 1)).await.unwrap();
        let mut a = submission("a", 1);
        a.state = SubmissionState::Rejected;
        store.put(a).await.unwrap();

        let ids: Vec<_> = store
            .list_by_author(UserId(1))
            .await
            .into_iter()
            .map(|s| (s.id.0, s.state))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("a".to_string(), SubmissionState::Rejected),
                ("b".to_string(), SubmissionState::Published)
            ]
        );
    }

    #[tokio::test]
    async fn list_is_author_scoped_and_capped() {
        let store = RecordStore::open(tmp_file("gossip-store-cap"));
        for i in 0..30 {
            store.put(submission(&format!("m{i}"), 7)).await.unwrap();
        }
        store.put(submission("other", 8)).await.unwrap();

        let mine = store.list_by_author(UserId(7)).await;
        assert_eq!(mine.len(), MAX_LIST_ENTRIES);
        assert_eq!(mine[0].id.as_str(), "m0");
        assert!(mine.iter().all(|s| s.author_id == UserId(7)));
        assert_eq!(store.list_by_author(UserId(8)).await.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_and_repeats_are_not_found() {
        let store = RecordStore::open(tmp_file("gossip-store-del"));
        let s = submission("a", 1);
        store.put(s.clone()).await.unwrap();

        assert_eq!(store.delete(&s.id).await.unwrap(), s);
        assert!(matches!(store.get(&s.id).await, Err(Error::NotFound(_))));
        assert!(matches!(store.delete(&s.id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn records_and_bans_survive_reopen() {
        let path = tmp_file("gossip-store-reopen");
        {
            let store = RecordStore::open(&path);
            store.put(submission("a", 1)).await.unwrap();
            assert!(store.add_ban(UserId(9)).await.unwrap());
            assert!(!store.add_ban(UserId(9)).await.unwrap());
        }

        let store = RecordStore::open(&path);
        assert!(store.get(&SubmissionId("a".to_string())).await.is_ok());
        assert!(store.is_banned(UserId(9)).await);
        assert_eq!(store.all_bans().await, BTreeSet::from([UserId(9)]));

        assert!(store.remove_ban(UserId(9)).await.unwrap());
        assert!(!store.remove_ban(UserId(9)).await.unwrap());
        assert!(!RecordStore::open(&path).is_banned(UserId(9)).await);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty_and_is_moved_aside() {
        let path = tmp_file("gossip-store-corrupt");
        fs::write(&path, "{ not json").unwrap();

        let store = RecordStore::open(&path);
        assert!(store.all_bans().await.is_empty());
        assert!(store.list_by_author(UserId(1)).await.is_empty());
        assert!(!path.exists());

        // Still writable afterwards.
        store.add_ban(UserId(3)).await.unwrap();
        assert!(RecordStore::open(&path).is_banned(UserId(3)).await);
    }

    #[tokio::test]
    async fn failed_save_leaves_memory_untouched() {
        // A regular file where the parent directory should be makes the save fail.
        let blocker = tmp_file("gossip-store-blocker");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("store.json");

        let store = RecordStore::open(&path);
        assert!(store.add_ban(UserId(1)).await.is_err());
        assert!(!store.is_banned(UserId(1)).await);
    }
}
