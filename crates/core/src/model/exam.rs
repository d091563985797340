use crate::model::ids::ExamId;

/// Exam level. Higher-level ids contain `visa` by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamLevel {
    Basic,
    Higher,
}

impl ExamLevel {
    #[must_use]
    pub fn from_exam_id(id: &ExamId) -> Self {
        if id.as_str().contains("visa") {
            Self::Higher
        } else {
            Self::Basic
        }
    }
}

/// Static description of an exam as supplied by the question source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamMeta {
    pub exam_id: ExamId,
    pub level: ExamLevel,
    pub duration_minutes: u32,
    pub question_count: usize,
    pub points_per_question: u32,
}

impl ExamMeta {
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    #[must_use]
    pub fn max_points(&self) -> u64 {
        u64::try_from(self.question_count)
            .unwrap_or(u64::MAX)
            .saturating_mul(u64::from(self.points_per_question))
    }
}

/// Formats an exam length: `45 min`, `1h 10min`, `2h`.
#[must_use]
pub fn format_duration_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let h = minutes / 60;
    let m = minutes % 60;
    if m == 0 {
        format!("{h}h")
    } else {
        format!("{h}h {m}min")
    }
}
