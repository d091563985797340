use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: OptionId::new(id),
            text: text.into(),
        }
    }
}

/// A multiple-choice question.
///
/// The prompt is carried verbatim and may contain inline (`$...$`) or block
/// (`$$...$$`) math markup for the presentation layer to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<AnswerOption>,
    correct: OptionId,
    points: u32,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, there are no options,
    /// option ids repeat, `correct` names no option, or `points` is zero.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        correct: OptionId,
        points: u32,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions { id });
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(&option.id) {
                return Err(QuestionError::DuplicateOption {
                    id,
                    option: option.id.clone(),
                });
            }
        }
        if !seen.contains(&correct) {
            return Err(QuestionError::UnknownCorrectOption { id, option: correct });
        }
        if points == 0 {
            return Err(QuestionError::ZeroPoints { id });
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct,
            points,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> &OptionId {
        &self.correct
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn has_option(&self, option: &OptionId) -> bool {
        self.options.iter().any(|o| &o.id == option)
    }

    #[must_use]
    pub fn is_correct(&self, option: &OptionId) -> bool {
        &self.correct == option
    }
}

//
// ─── QUESTION VALIDATION ERRORS ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} has no options")]
    NoOptions { id: QuestionId },

    #[error("question {id} repeats option {option}")]
    DuplicateOption { id: QuestionId, option: OptionId },

    #[error("question {id} marks unknown option {option} as correct")]
    UnknownCorrectOption { id: QuestionId, option: OptionId },

    #[error("question {id} must be worth at least one point")]
    ZeroPoints { id: QuestionId },
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
