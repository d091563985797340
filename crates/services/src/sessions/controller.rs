use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use exam_core::model::{Answers, ExamId, ExamResult, OptionId, Question, QuestionId};
use exam_core::time::elapsed_seconds;

use super::progress::SessionProgress;

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// One attempt at one exam.
///
/// Read-only outside this module; all mutation goes through
/// [`ExamSessionController`].
#[derive(Debug, Clone)]
pub struct ExamSession {
    exam_id: ExamId,
    questions: Arc<[Question]>,
    answers: Answers,
    flagged: HashSet<QuestionId>,
    current_index: usize,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    #[must_use]
    pub fn flagged(&self) -> &HashSet<QuestionId> {
        &self.flagged
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn is_flagged(&self, question_id: QuestionId) -> bool {
        self.flagged.contains(&question_id)
    }

    fn question(&self, question_id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == question_id)
    }

    fn accepts(&self, question_id: QuestionId, option_id: &OptionId) -> bool {
        self.question(question_id)
            .is_some_and(|q| q.has_option(option_id))
    }

    fn clamp_index(&self, index: usize) -> usize {
        index.min(self.questions.len().saturating_sub(1))
    }
}

/// Result of [`ExamSessionController::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDisposition {
    Started,
    /// The same exam was already active with questions; nothing changed.
    AlreadyActive,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Owns the active exam session and the last submitted result.
///
/// Operations never fail. Anything invalid (unknown question, mutation after
/// submission, no active session) is a no-op and mutators report whether they
/// changed state. Timestamps come from the caller's clock.
#[derive(Default)]
pub struct ExamSessionController {
    session: Option<ExamSession>,
    last_result: Option<ExamResult>,
}

impl ExamSessionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session(&self) -> Option<&ExamSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&ExamResult> {
        self.last_result.as_ref()
    }

    /// True when `exam_id` is the active exam and its questions are loaded.
    #[must_use]
    pub fn is_active(&self, exam_id: &ExamId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| &s.exam_id == exam_id && !s.questions.is_empty())
    }

    fn open_session_mut(&mut self) -> Option<&mut ExamSession> {
        self.session.as_mut().filter(|s| !s.is_submitted())
    }

    /// Begin a fresh attempt, replacing any previous session and result.
    pub fn start(
        &mut self,
        exam_id: ExamId,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> StartDisposition {
        if self.is_active(&exam_id) {
            return StartDisposition::AlreadyActive;
        }

        self.last_result = None;
        self.session = Some(ExamSession {
            exam_id,
            questions: questions.into(),
            answers: Answers::new(),
            flagged: HashSet::new(),
            current_index: 0,
            started_at: now,
            submitted_at: None,
        });
        StartDisposition::Started
    }

    /// Merge previously saved answers; saved entries win on conflict.
    ///
    /// Entries for questions or options not in this exam are dropped.
    pub fn restore_draft(&mut self, saved: &Answers) -> bool {
        let Some(session) = self.open_session_mut() else {
            return false;
        };

        let mut changed = false;
        for (question_id, option_id) in saved {
            if session.accepts(*question_id, option_id) {
                let previous = session.answers.insert(*question_id, option_id.clone());
                changed |= previous.as_ref() != Some(option_id);
            }
        }
        changed
    }

    /// Record or overwrite the selection for a question.
    pub fn set_answer(&mut self, question_id: QuestionId, option_id: OptionId) -> bool {
        let Some(session) = self.open_session_mut() else {
            return false;
        };
        if !session.accepts(question_id, &option_id) {
            return false;
        }
        session.answers.insert(question_id, option_id);
        true
    }

    pub fn toggle_flag(&mut self, question_id: QuestionId) -> bool {
        let Some(session) = self.open_session_mut() else {
            return false;
        };
        if session.question(question_id).is_none() {
            return false;
        }
        if !session.flagged.remove(&question_id) {
            session.flagged.insert(question_id);
        }
        true
    }

    /// Move to `index`, clamped to the loaded questions.
    pub fn go_to_question(&mut self, index: usize) -> bool {
        let Some(session) = self.open_session_mut() else {
            return false;
        };
        let target = session.clamp_index(index);
        let changed = target != session.current_index;
        session.current_index = target;
        changed
    }

    /// Finish the attempt and capture the result snapshot.
    ///
    /// Returns `None` if there is no open session.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Option<&ExamResult> {
        let session = self.open_session_mut()?;
        session.submitted_at = Some(now);

        let result = ExamResult::new(
            session.exam_id.clone(),
            session.answers.clone(),
            Arc::clone(&session.questions),
            now,
            elapsed_seconds(session.started_at, now),
        );
        self.last_result = Some(result);
        self.last_result.as_ref()
    }

    /// Drop the session but keep the last result for the results view.
    pub fn reset(&mut self) {
        self.session = None;
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.session.as_ref().map(SessionProgress::from_session)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.session.as_ref().and_then(ExamSession::current_question)
    }

    #[must_use]
    pub fn is_current_flagged(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.current_question().map(|q| s.is_flagged(q.id())))
            .unwrap_or(false)
    }

    /// Whether leaving now would lose an unsubmitted attempt.
    #[must_use]
    pub fn needs_unload_guard(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| !s.questions.is_empty() && !s.is_submitted())
    }
}

impl fmt::Debug for ExamSessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session.as_ref();
        f.debug_struct("ExamSessionController")
            .field("exam_id", &session.map(ExamSession::exam_id))
            .field("questions_len", &session.map(|s| s.questions.len()))
            .field("answers_len", &session.map(|s| s.answers.len()))
            .field("current_index", &session.map(ExamSession::current_index))
            .field("submitted_at", &session.and_then(ExamSession::submitted_at))
            .field("has_last_result", &self.last_result.is_some())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
