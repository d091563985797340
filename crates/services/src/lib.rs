#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod draft_cache;
pub mod error;
pub mod notice;
pub mod questions;
pub mod sessions;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use config::SessionConfig;
pub use draft_cache::DraftCache;
pub use error::{AppServicesError, QuestionSourceError, SessionError};
pub use notice::{Notice, NoticeLevel};
pub use questions::{MockQuestionSource, QuestionSource};

pub use sessions::{
    ExamSession, ExamSessionController, ExamSessionHost, HostCommand, OpenOutcome, SessionHandle,
    SessionIntent, SessionProgress, SessionView, StartDisposition, spawn_session,
};
