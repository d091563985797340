use chrono::Duration;
use tracing::{debug, info};

use exam_core::model::{DraftRecord, ExamId, ExamMeta, ExamResult, Question};
use exam_core::{Clock, Countdown};

use crate::config::SessionConfig;
use crate::draft_cache::DraftCache;
use crate::notice::Notice;

use super::controller::ExamSessionController;
use super::keyboard::{KeyPress, SHORTCUT_HELP, SessionIntent, intent_for_key};

/// What happened when an exam was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The exam was already running; nothing was reset.
    AlreadyActive,
    Fresh,
    /// A stored draft with answers exists. The caller must choose between
    /// [`ExamSessionHost::confirm_restore`] and [`ExamSessionHost::discard_draft`].
    DraftOffered { answered: usize },
}

/// Drives one exam-taking view: the controller plus its countdown, draft
/// cache, auto-save and user notices.
///
/// The host's clock is advanced by one second per countdown tick when it is a
/// fixed clock, so simulated sessions measure elapsed time in ticks. A system
/// clock keeps wall time.
pub struct ExamSessionHost {
    clock: Clock,
    config: SessionConfig,
    drafts: DraftCache,
    controller: ExamSessionController,
    countdown: Option<Countdown>,
    pending_draft: Option<DraftRecord>,
    notices: Vec<Notice>,
}

impl ExamSessionHost {
    #[must_use]
    pub fn new(clock: Clock, config: SessionConfig, drafts: DraftCache) -> Self {
        Self {
            clock,
            config,
            drafts,
            controller: ExamSessionController::new(),
            countdown: None,
            pending_draft: None,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &ExamSessionController {
        &self.controller
    }

    #[must_use]
    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn exam_id(&self) -> Option<&ExamId> {
        self.controller.session().map(|s| s.exam_id())
    }

    #[must_use]
    pub fn pending_draft(&self) -> Option<&DraftRecord> {
        self.pending_draft.as_ref()
    }

    /// Whether the presentation should ask before the page is left.
    #[must_use]
    pub fn should_warn_on_unload(&self) -> bool {
        self.controller.needs_unload_guard()
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Open an exam, starting its countdown and checking for a stored draft.
    pub async fn open(&mut self, meta: &ExamMeta, questions: Vec<Question>) -> OpenOutcome {
        if self.controller.is_active(&meta.exam_id) {
            debug!(exam = %meta.exam_id, "exam already active");
            return OpenOutcome::AlreadyActive;
        }

        let draft = self.drafts.load(&meta.exam_id).await;
        let count = questions.len();
        self.controller
            .start(meta.exam_id.clone(), questions, self.clock.now());
        self.countdown = Some(Countdown::new(
            meta.duration_seconds(),
            self.config.countdown(),
        ));
        self.pending_draft = None;
        info!(
            exam = %meta.exam_id,
            questions = count,
            duration_secs = meta.duration_seconds(),
            "exam session started"
        );

        match draft.filter(DraftRecord::has_answers) {
            Some(draft) => {
                let answered = draft.answers.len();
                self.pending_draft = Some(draft);
                OpenOutcome::DraftOffered { answered }
            }
            None => OpenOutcome::Fresh,
        }
    }

    /// Accept the offered draft. Returns whether any answer changed.
    pub fn confirm_restore(&mut self) -> bool {
        let Some(draft) = self.pending_draft.take() else {
            return false;
        };
        let changed = self.controller.restore_draft(&draft.answers);
        self.notices
            .push(Notice::success("Previous answers restored."));
        changed
    }

    /// Reject the offered draft and delete it from storage.
    ///
    /// Does nothing unless a draft offer is pending, so autosaved answers of the
    /// running attempt are never removed here.
    pub async fn discard_draft(&mut self) -> bool {
        if self.pending_draft.take().is_none() {
            return false;
        }
        let Some(exam_id) = self.exam_id().cloned() else {
            return false;
        };
        self.drafts.clear(&exam_id).await;
        debug!(exam = %exam_id, "draft discarded");
        true
    }

    /// Apply a user intent. Returns whether session state changed.
    pub async fn apply(&mut self, intent: SessionIntent) -> bool {
        let Some(session) = self.controller.session() else {
            return false;
        };
        let index = session.current_index();
        let total = session.questions().len();
        let current = session.current_question().map(Question::id);

        match intent {
            SessionIntent::Previous => index > 0 && self.controller.go_to_question(index - 1),
            SessionIntent::Next => index + 1 < total && self.controller.go_to_question(index + 1),
            SessionIntent::GoTo(target) => self.controller.go_to_question(target),
            SessionIntent::Answer(option) => {
                current.is_some_and(|id| self.controller.set_answer(id, option))
            }
            SessionIntent::ToggleFlag => current.is_some_and(|id| self.controller.toggle_flag(id)),
            SessionIntent::ShowHelp => {
                self.notices.push(Notice::info(SHORTCUT_HELP));
                false
            }
            SessionIntent::Submit => self.submit().await.is_some(),
        }
    }

    /// Translate a key press and apply it.
    pub async fn handle_key(&mut self, press: &KeyPress) -> bool {
        match intent_for_key(press) {
            Some(intent) => self.apply(intent).await,
            None => false,
        }
    }

    /// Account for one elapsed second. Returns the result if the countdown
    /// expired and the exam was submitted.
    pub async fn tick(&mut self) -> Option<ExamResult> {
        let countdown = self.countdown.as_mut()?;
        if !countdown.is_running() {
            return None;
        }

        self.clock.advance(Duration::seconds(1));
        let tick = countdown.tick();

        if tick.warning {
            self.notices
                .push(Notice::warning(warning_message(self.config.warning_at_secs)));
        }
        if tick.expired {
            info!("countdown expired, submitting");
            return self.submit().await;
        }
        None
    }

    /// Persist current answers when there is something to save.
    pub async fn autosave(&mut self) -> bool {
        let Some(session) = self.controller.session() else {
            return false;
        };
        if session.is_submitted() || session.answers().is_empty() {
            return false;
        }
        self.drafts
            .save_at(session.exam_id(), session.answers(), self.clock.now())
            .await;
        true
    }

    /// Submit the attempt, stop the countdown and clear the stored draft.
    pub async fn submit(&mut self) -> Option<ExamResult> {
        let result = self.controller.submit(self.clock.now())?.clone();
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.stop();
        }
        self.pending_draft = None;
        self.drafts.clear(result.exam_id()).await;

        info!(
            exam = %result.exam_id(),
            answered = result.answers().len(),
            elapsed_secs = result.elapsed_seconds(),
            "exam submitted"
        );
        Some(result)
    }

    pub fn pause_timer(&mut self) {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.pause();
        }
    }

    pub fn resume_timer(&mut self) {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.resume();
        }
    }

    /// Abandon the current attempt. The last submitted result survives.
    pub fn close(&mut self) {
        self.controller.reset();
        self.countdown = None;
        self.pending_draft = None;
    }
}

fn warning_message(warning_at_secs: u64) -> String {
    if warning_at_secs >= 60 && warning_at_secs % 60 == 0 {
        format!("Less than {} minutes remaining!", warning_at_secs / 60)
    } else {
        format!("Less than {warning_at_secs} seconds remaining!")
    }
}
