//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ExamId, QuestionError};
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `QuestionSource`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSourceError {
    #[error("unknown exam: {0}")]
    UnknownExam(ExamId),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Errors emitted by the session runtime handle.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session runtime is closed")]
    Closed,
    #[error("session task failed: {0}")]
    Join(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Questions(#[from] QuestionSourceError),
}
