use std::sync::Arc;

use exam_core::model::ExamId;
use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::config::SessionConfig;
use crate::draft_cache::DraftCache;
use crate::error::AppServicesError;
use crate::questions::{MockQuestionSource, QuestionSource};
use crate::sessions::{ExamSessionHost, OpenOutcome};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    config: SessionConfig,
    drafts: DraftCache,
    questions: Arc<dyn QuestionSource>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        info!(db_url, "draft storage opened");
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Build services backed by process memory.
    #[must_use]
    pub fn in_memory(clock: Clock, config: SessionConfig) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, config)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: SessionConfig) -> Self {
        let drafts = DraftCache::new(clock, Arc::clone(&storage.kv), config.storage_prefix.clone());
        Self {
            clock,
            config,
            drafts,
            questions: Arc::new(MockQuestionSource::new()),
        }
    }

    #[must_use]
    pub fn with_question_source(mut self, questions: Arc<dyn QuestionSource>) -> Self {
        self.questions = questions;
        self
    }

    #[must_use]
    pub fn drafts(&self) -> &DraftCache {
        &self.drafts
    }

    #[must_use]
    pub fn questions(&self) -> Arc<dyn QuestionSource> {
        Arc::clone(&self.questions)
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A host with no exam open yet.
    #[must_use]
    pub fn new_host(&self) -> ExamSessionHost {
        ExamSessionHost::new(self.clock, self.config.clone(), self.drafts.clone())
    }

    /// Load an exam's content and open it in a new host.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Questions` if the exam cannot be loaded.
    pub async fn open_exam(
        &self,
        exam_id: &ExamId,
    ) -> Result<(ExamSessionHost, OpenOutcome), AppServicesError> {
        let meta = self.questions.exam_meta(exam_id).await?;
        let questions = self.questions.questions(exam_id).await?;
        let mut host = self.new_host();
        let outcome = host.open(&meta, questions).await;
        Ok((host, outcome))
    }
}
