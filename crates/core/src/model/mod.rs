mod draft;
mod exam;
mod ids;
mod question;
mod result;

pub use draft::{Answers, DraftRecord, draft_key};
pub use exam::{ExamLevel, ExamMeta, format_duration_minutes};
pub use ids::{ExamId, OptionId, ParseIdError, QuestionId};
pub use question::{AnswerOption, Question, QuestionError};
pub use result::{
    ExamResult, QuestionOutcome, ScoreBand, ScoreSummary, format_elapsed, format_score,
};
