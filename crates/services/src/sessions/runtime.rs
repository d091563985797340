//! Background task that owns an [`ExamSessionHost`] and drives its timers.
//!
//! The task ticks the countdown once per `tick_interval`, auto-saves once per
//! `autosave_interval` and applies commands sent through the
//! [`SessionHandle`]. After every event it publishes a fresh [`SessionView`]
//! and forwards queued notices.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use exam_core::TimerUrgency;
use exam_core::model::{ExamId, ExamResult, Question};

use crate::error::SessionError;
use crate::notice::Notice;

use super::host::ExamSessionHost;
use super::keyboard::{KeyPress, SessionIntent};
use super::progress::SessionProgress;

const COMMAND_BUFFER: usize = 32;

/// Commands accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Intent(SessionIntent),
    Key(KeyPress),
    RestoreDraft,
    DiscardDraft,
    Autosave,
    PauseTimer,
    ResumeTimer,
}

/// Read-only snapshot of a running session for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub exam_id: Option<ExamId>,
    pub progress: Option<SessionProgress>,
    pub current_question: Option<Question>,
    pub current_flagged: bool,
    pub remaining_secs: u64,
    /// Remaining time as `MM:SS` or `H:MM:SS`.
    pub clock_text: String,
    pub urgency: Option<TimerUrgency>,
    pub timer_running: bool,
    /// Number of answers in a draft awaiting the restore decision.
    pub draft_offered: Option<usize>,
    pub warn_on_unload: bool,
    pub result: Option<ExamResult>,
}

impl SessionView {
    #[must_use]
    pub fn of(host: &ExamSessionHost) -> Self {
        let controller = host.controller();
        let countdown = host.countdown();
        Self {
            exam_id: host.exam_id().cloned(),
            progress: controller.progress(),
            current_question: controller.current_question().cloned(),
            current_flagged: controller.is_current_flagged(),
            remaining_secs: countdown.map_or(0, |c| c.remaining()),
            clock_text: countdown.map(|c| c.formatted()).unwrap_or_default(),
            urgency: countdown.map(|c| c.urgency()),
            timer_running: countdown.is_some_and(|c| c.is_running()),
            draft_offered: host.pending_draft().map(|d| d.answers.len()),
            warn_on_unload: host.should_warn_on_unload(),
            result: controller.last_result().cloned(),
        }
    }
}

/// Handle to a spawned session task.
///
/// Dropping the handle cancels the task; use [`SessionHandle::shutdown`] to
/// get the host back.
pub struct SessionHandle {
    commands: mpsc::Sender<HostCommand>,
    view: watch::Receiver<SessionView>,
    notices: Option<mpsc::UnboundedReceiver<Notice>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<ExamSessionHost>>,
}

impl SessionHandle {
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub async fn send(&self, command: HostCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    #[must_use]
    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    #[must_use]
    pub fn current(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// The notice stream. Only the first call returns `Some`.
    pub fn take_notices(&mut self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notices.take()
    }

    /// Stop the task, auto-saving unsubmitted answers, and return the host.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Join` if the task panicked.
    pub async fn shutdown(mut self) -> Result<ExamSessionHost, SessionError> {
        self.cancel.cancel();
        let task = self.task.take().ok_or(SessionError::Closed)?;
        task.await.map_err(|e| SessionError::Join(e.to_string()))
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Spawn the session task on the current tokio runtime.
#[must_use]
pub fn spawn_session(host: ExamSessionHost) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (view_tx, view_rx) = watch::channel(SessionView::of(&host));
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run(
        host,
        command_rx,
        view_tx,
        notice_tx,
        cancel.clone(),
    ));

    SessionHandle {
        commands: command_tx,
        view: view_rx,
        notices: Some(notice_rx),
        cancel,
        task: Some(task),
    }
}

async fn run(
    mut host: ExamSessionHost,
    mut commands: mpsc::Receiver<HostCommand>,
    view: watch::Sender<SessionView>,
    notices: mpsc::UnboundedSender<Notice>,
    cancel: CancellationToken,
) -> ExamSessionHost {
    let tick_period = non_zero(host.config().tick_interval);
    let autosave_period = non_zero(host.config().autosave_interval);
    let start = Instant::now();
    let mut ticks = interval_at(start + tick_period, tick_period);
    let mut autosaves = interval_at(start + autosave_period, autosave_period);

    debug!(exam = ?host.exam_id(), "session task started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => apply(&mut host, command).await,
                None => break,
            },
            _ = ticks.tick() => {
                if let Some(result) = host.tick().await {
                    info!(exam = %result.exam_id(), "session auto-submitted on expiry");
                }
            }
            _ = autosaves.tick() => {
                if host.autosave().await {
                    debug!("draft auto-saved");
                }
            }
        }

        for notice in host.take_notices() {
            // The receiver may have been dropped; notices are best-effort.
            let _ = notices.send(notice);
        }
        view.send_replace(SessionView::of(&host));
    }

    host.autosave().await;
    debug!(exam = ?host.exam_id(), "session task stopped");
    host
}

async fn apply(host: &mut ExamSessionHost, command: HostCommand) {
    match command {
        HostCommand::Intent(intent) => {
            host.apply(intent).await;
        }
        HostCommand::Key(press) => {
            host.handle_key(&press).await;
        }
        HostCommand::RestoreDraft => {
            host.confirm_restore();
        }
        HostCommand::DiscardDraft => {
            host.discard_draft().await;
        }
        HostCommand::Autosave => {
            host.autosave().await;
        }
        HostCommand::PauseTimer => host.pause_timer(),
        HostCommand::ResumeTimer => host.resume_timer(),
    }
}

fn non_zero(period: Duration) -> Duration {
    period.max(Duration::from_millis(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::draft_cache::DraftCache;
    use crate::notice::NoticeLevel;
    use crate::sessions::keyboard::Key;
    use crate::sessions::host::OpenOutcome;
    use exam_core::model::{AnswerOption, ExamLevel, ExamMeta, OptionId, QuestionId};
    use exam_core::time::fixed_clock;

    fn meta(minutes: u32) -> ExamMeta {
        ExamMeta {
            exam_id: ExamId::new("fizika-2024").unwrap(),
            level: ExamLevel::Basic,
            duration_minutes: minutes,
            question_count: 3,
            points_per_question: 1,
        }
    }

    fn questions() -> Vec<Question> {
        (1..=3)
            .map(|id| {
                let options = ["a", "b", "c", "d"]
                    .into_iter()
                    .map(|o| AnswerOption::new(o, o))
                    .collect();
                Question::new(QuestionId::new(id), "Q", options, OptionId::new("b"), 1).unwrap()
            })
            .collect()
    }

    async fn running(minutes: u32) -> (SessionHandle, DraftCache) {
        let drafts = DraftCache::in_memory(fixed_clock());
        let mut host = ExamSessionHost::new(fixed_clock(), SessionConfig::default(), drafts.clone());
        assert_eq!(host.open(&meta(minutes), questions()).await, OpenOutcome::Fresh);
        (spawn_session(host), drafts)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_count_down_in_view() {
        let (handle, _) = running(70).await;
        tokio::time::sleep(Duration::from_millis(5_500)).await;

        let view = handle.current();
        assert_eq!(view.remaining_secs, 70 * 60 - 5);
        assert_eq!(view.clock_text, "69:55");
        assert_eq!(view.urgency, Some(TimerUrgency::Normal));
        assert!(view.timer_running);
    }

    #[tokio::test(start_paused = true)]
    async fn commands_update_view() {
        let (handle, _) = running(70).await;
        handle
            .send(HostCommand::Key(KeyPress::new(Key::Character('b'))))
            .await
            .unwrap();
        handle
            .send(HostCommand::Intent(SessionIntent::Next))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let view = handle.current();
        let progress = view.progress.unwrap();
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.current_index, 1);
        assert_eq!(view.current_question.map(|q| q.id()), Some(QuestionId::new(2)));
        assert!(view.warn_on_unload);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_runs_on_interval() {
        let (handle, drafts) = running(70).await;
        handle
            .send(HostCommand::Intent(SessionIntent::Answer(OptionId::new("c"))))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(drafts.load(&meta(70).exam_id).await.is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let draft = drafts.load(&meta(70).exam_id).await.unwrap();
        assert_eq!(draft.answers.get(&QuestionId::new(1)), Some(&OptionId::new("c")));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_and_notifies() {
        let (mut handle, drafts) = running(1).await;
        let mut notices = handle.take_notices().unwrap();
        assert!(handle.take_notices().is_none());

        tokio::time::sleep(Duration::from_secs(61)).await;
        let view = handle.current();
        let result = view.result.expect("submitted");
        assert_eq!(result.elapsed_seconds(), 60);
        assert!(!view.timer_running);
        assert!(!view.warn_on_unload);
        assert!(drafts.load(&meta(1).exam_id).await.is_none());

        let first = notices.recv().await.unwrap();
        assert_eq!(first.level, NoticeLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_host_and_saves_answers() {
        let (handle, drafts) = running(70).await;
        handle
            .send(HostCommand::Intent(SessionIntent::Answer(OptionId::new("a"))))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let host = handle.shutdown().await.unwrap();
        assert_eq!(host.controller().session().unwrap().answers().len(), 1);
        assert!(drafts.load(&meta(70).exam_id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn paused_timer_holds_remaining_time() {
        let (handle, _) = running(70).await;
        handle.send(HostCommand::PauseTimer).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.current().remaining_secs, 70 * 60);
        assert!(!handle.current().timer_running);

        handle.send(HostCommand::ResumeTimer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(handle.current().remaining_secs < 70 * 60);
    }
}
