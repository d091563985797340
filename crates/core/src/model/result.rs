use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::draft::Answers;
use crate::model::ids::ExamId;
use crate::model::question::Question;

/// Outcome of a single question in a submitted exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOutcome {
    Correct,
    Incorrect,
    Skipped,
}

/// Aggregate score of a submitted exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    pub total_points: u64,
    pub max_points: u64,
    /// Share of correctly answered questions, rounded to a whole percent.
    pub percentage: u32,
}

/// Qualitative band for a score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    VeryGood,
    Good,
    Sufficient,
    NeedsPractice,
}

impl ScoreBand {
    #[must_use]
    pub fn from_percentage(pct: u32) -> Self {
        match pct {
            90.. => Self::Excellent,
            75..=89 => Self::VeryGood,
            60..=74 => Self::Good,
            50..=59 => Self::Sufficient,
            _ => Self::NeedsPractice,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very good",
            Self::Good => "Good",
            Self::Sufficient => "Sufficient",
            Self::NeedsPractice => "Needs practice",
        }
    }
}

/// Immutable snapshot of a session captured at submission.
///
/// Owns its answers; later changes to the live session never reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResult {
    exam_id: ExamId,
    answers: Answers,
    questions: Arc<[Question]>,
    submitted_at: DateTime<Utc>,
    elapsed_seconds: u64,
}

impl ExamResult {
    #[must_use]
    pub fn new(
        exam_id: ExamId,
        answers: Answers,
        questions: Arc<[Question]>,
        submitted_at: DateTime<Utc>,
        elapsed_seconds: u64,
    ) -> Self {
        Self {
            exam_id,
            answers,
            questions,
            submitted_at,
            elapsed_seconds,
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Per-question outcome, in question order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<QuestionOutcome> {
        self.questions
            .iter()
            .map(|q| match self.answers.get(&q.id()) {
                None => QuestionOutcome::Skipped,
                Some(selected) if q.is_correct(selected) => QuestionOutcome::Correct,
                Some(_) => QuestionOutcome::Incorrect,
            })
            .collect()
    }

    #[must_use]
    pub fn score(&self) -> ScoreSummary {
        let mut correct = 0_usize;
        let mut incorrect = 0_usize;
        let mut skipped = 0_usize;
        let mut total_points = 0_u64;
        let mut max_points = 0_u64;

        for (question, outcome) in self.questions.iter().zip(self.outcomes()) {
            max_points = max_points.saturating_add(u64::from(question.points()));
            match outcome {
                QuestionOutcome::Correct => {
                    correct += 1;
                    total_points = total_points.saturating_add(u64::from(question.points()));
                }
                QuestionOutcome::Incorrect => incorrect += 1,
                QuestionOutcome::Skipped => skipped += 1,
            }
        }

        ScoreSummary {
            correct,
            incorrect,
            skipped,
            total_points,
            max_points,
            percentage: percent(correct, self.questions.len()),
        }
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (part as f64 / total as f64 * 100.0).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = scaled as u32;
    pct
}

/// Formats a score as a whole percentage, e.g. `73%`.
#[must_use]
pub fn format_score(correct: usize, total: usize) -> String {
    format!("{}%", percent(correct, total))
}

/// Formats elapsed exam time as `m:ss`, with minutes unbounded.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
