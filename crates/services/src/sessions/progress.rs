use super::controller::ExamSession;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    pub current_index: usize,
    /// Answered share, rounded to a whole percent.
    pub percent: u32,
    pub is_submitted: bool,
}

impl SessionProgress {
    pub(crate) fn from_session(session: &ExamSession) -> Self {
        let total = session.questions().len();
        let answered = session.answers().len();
        let percent = if total == 0 {
            0
        } else {
            u32::try_from((answered * 100 + total / 2) / total).unwrap_or(100)
        };
        Self {
            total,
            answered,
            flagged: session.flagged().len(),
            current_index: session.current_index(),
            percent,
            is_submitted: session.is_submitted(),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}
