use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ExamId, OptionId, QuestionId};
use crate::time::{from_epoch_millis, to_epoch_millis};

/// Selected option per question.
pub type Answers = BTreeMap<QuestionId, OptionId>;

/// Locally persisted copy of in-progress answers.
///
/// Serialized as `{"answers": {"<question>": "<option>"}, "savedAt": <epoch ms>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub answers: Answers,
    pub saved_at: i64,
}

impl DraftRecord {
    #[must_use]
    pub fn new(answers: Answers, saved_at: DateTime<Utc>) -> Self {
        Self {
            answers,
            saved_at: to_epoch_millis(saved_at),
        }
    }

    #[must_use]
    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }

    #[must_use]
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        from_epoch_millis(self.saved_at)
    }
}

/// Storage key (without namespace prefix) for an exam's draft.
#[must_use]
pub fn draft_key(exam_id: &ExamId) -> String {
    format!("draft_{exam_id}")
}
