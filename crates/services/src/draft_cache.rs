use std::sync::Arc;

use chrono::{DateTime, Utc};
use exam_core::Clock;
use exam_core::model::{Answers, DraftRecord, ExamId, draft_key};
use storage::repository::KeyValueStore;
use tracing::{debug, warn};

/// Advisory local copy of in-progress answers, one record per exam.
///
/// Never fails toward the caller: write errors are logged and dropped, and an
/// unreadable or undecodable record reads as "no draft".
#[derive(Clone)]
pub struct DraftCache {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl DraftCache {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            clock,
            store,
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(
            clock,
            Arc::new(storage::repository::InMemoryRepository::new()),
            crate::config::DEFAULT_STORAGE_PREFIX,
        )
    }

    /// Full storage key for an exam's draft.
    #[must_use]
    pub fn key(&self, exam_id: &ExamId) -> String {
        format!("{}{}", self.prefix, draft_key(exam_id))
    }

    /// Persist `answers` stamped with the cache clock's current time.
    pub async fn save(&self, exam_id: &ExamId, answers: &Answers) {
        self.save_at(exam_id, answers, self.clock.now()).await;
    }

    /// Persist `answers` stamped with an explicit time, e.g. from a session clock.
    pub async fn save_at(&self, exam_id: &ExamId, answers: &Answers, saved_at: DateTime<Utc>) {
        let record = DraftRecord::new(answers.clone(), saved_at);
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(exam = %exam_id, error = %err, "draft serialization failed");
                return;
            }
        };

        match self.store.set(&self.key(exam_id), &payload).await {
            Ok(()) => debug!(exam = %exam_id, answers = answers.len(), "draft saved"),
            Err(err) => warn!(exam = %exam_id, error = %err, "draft save failed"),
        }
    }

    /// Last saved draft, or `None` when absent or unreadable.
    pub async fn load(&self, exam_id: &ExamId) -> Option<DraftRecord> {
        let raw = match self.store.get(&self.key(exam_id)).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(exam = %exam_id, error = %err, "draft load failed");
                return None;
            }
        };

        match serde_json::from_str::<DraftRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(exam = %exam_id, error = %err, "ignoring undecodable draft");
                None
            }
        }
    }

    pub async fn clear(&self, exam_id: &ExamId) {
        if let Err(err) = self.store.remove(&self.key(exam_id)).await {
            warn!(exam = %exam_id, error = %err, "draft clear failed");
        }
    }

    /// Remove every key under this cache's prefix. Returns how many were removed.
    pub async fn clear_all(&self) -> usize {
        let keys = match self.store.keys_with_prefix(&self.prefix).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "listing stored keys failed");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            match self.store.remove(&key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "removing stored key failed"),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{OptionId, QuestionId};
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn exam() -> ExamId {
        ExamId::new("hrvatski-2024").unwrap()
    }

    fn answers(pairs: &[(u64, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(q, o)| (QuestionId::new(*q), OptionId::new(*o)))
            .collect()
    }

    #[tokio::test]
    async fn save_then_load_returns_record() {
        let cache = DraftCache::in_memory(fixed_clock());
        cache.save(&exam(), &answers(&[(1, "a"), (2, "d")])).await;

        let record = cache.load(&exam()).await.expect("draft");
        assert_eq!(record.answers, answers(&[(1, "a"), (2, "d")]));
        assert_eq!(record.saved_at(), Some(fixed_now()));
    }

    #[tokio::test]
    async fn missing_and_corrupt_drafts_read_as_none() {
        let repo = InMemoryRepository::new();
        let cache = DraftCache::new(fixed_clock(), Arc::new(repo.clone()), "matura_");
        assert!(cache.load(&exam()).await.is_none());

        repo.set("matura_draft_hrvatski-2024", "not json").await.unwrap();
        assert!(cache.load(&exam()).await.is_none());
    }

    #[tokio::test]
    async fn quota_failure_is_swallowed() {
        let repo = InMemoryRepository::new().with_quota(8);
        let cache = DraftCache::new(fixed_clock(), Arc::new(repo), "matura_");

        cache.save(&exam(), &answers(&[(1, "a")])).await;
        assert!(cache.load(&exam()).await.is_none());
    }

    #[tokio::test]
    async fn clear_removes_only_that_exam() {
        let cache = DraftCache::in_memory(fixed_clock());
        let other = ExamId::new("fizika-2024").unwrap();
        cache.save(&exam(), &answers(&[(1, "a")])).await;
        cache.save(&other, &answers(&[(1, "b")])).await;

        cache.clear(&exam()).await;
        assert!(cache.load(&exam()).await.is_none());
        assert!(cache.load(&other).await.is_some());

        assert_eq!(cache.clear_all().await, 1);
        assert!(cache.load(&other).await.is_none());
    }

    #[test]
    fn key_uses_prefix_and_exam() {
        let cache = DraftCache::in_memory(fixed_clock());
        assert_eq!(cache.key(&exam()), "matura_draft_hrvatski-2024");
    }
}
