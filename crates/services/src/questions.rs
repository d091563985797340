use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use exam_core::model::{AnswerOption, ExamId, ExamLevel, ExamMeta, OptionId, Question, QuestionId};

use crate::error::QuestionSourceError;

/// Supplies exam metadata and question sets.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `QuestionSourceError` if the exam is unknown or cannot be loaded.
    async fn exam_meta(&self, exam_id: &ExamId) -> Result<ExamMeta, QuestionSourceError>;

    /// Questions in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError` if the exam is unknown or cannot be loaded.
    async fn questions(&self, exam_id: &ExamId) -> Result<Vec<Question>, QuestionSourceError>;
}

const OPTION_IDS: [&str; 4] = ["a", "b", "c", "d"];

/// Placeholder content until a real content service exists.
///
/// Higher-level exams get 40 two-point questions and 90 minutes; the rest get
/// 30 one-point questions and 70 minutes. The correct option is random.
///
/// Only ids of the form `<subject>-<session>` name an exam; anything else is
/// `QuestionSourceError::UnknownExam`.
#[derive(Debug, Clone, Default)]
pub struct MockQuestionSource {
    seed: Option<u64>,
}

impl MockQuestionSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the generated answer key reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn meta_for(exam_id: &ExamId) -> Result<ExamMeta, QuestionSourceError> {
        match exam_id.as_str().split_once('-') {
            Some((subject, session)) if !subject.is_empty() && !session.is_empty() => {}
            _ => return Err(QuestionSourceError::UnknownExam(exam_id.clone())),
        }

        let level = ExamLevel::from_exam_id(exam_id);
        let (duration_minutes, question_count, points_per_question) = match level {
            ExamLevel::Higher => (90, 40, 2),
            ExamLevel::Basic => (70, 30, 1),
        };
        Ok(ExamMeta {
            exam_id: exam_id.clone(),
            level,
            duration_minutes,
            question_count,
            points_per_question,
        })
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

#[async_trait]
impl QuestionSource for MockQuestionSource {
    async fn exam_meta(&self, exam_id: &ExamId) -> Result<ExamMeta, QuestionSourceError> {
        Self::meta_for(exam_id)
    }

    async fn questions(&self, exam_id: &ExamId) -> Result<Vec<Question>, QuestionSourceError> {
        let meta = Self::meta_for(exam_id)?;
        let mut rng = self.rng();

        (1..=meta.question_count)
            .map(|n| {
                let options = OPTION_IDS
                    .iter()
                    .map(|id| {
                        AnswerOption::new(
                            *id,
                            format!("Option {} for question {n}", id.to_uppercase()),
                        )
                    })
                    .collect();
                let correct = OPTION_IDS[rng.random_range(0..OPTION_IDS.len())];
                Question::new(
                    QuestionId::new(u64::try_from(n).unwrap_or(u64::MAX)),
                    format!("Question {n}: sample exam question. Choose the correct answer."),
                    options,
                    OptionId::new(correct),
                    meta.points_per_question,
                )
                .map_err(QuestionSourceError::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_exam_has_thirty_single_point_questions() {
        let source = MockQuestionSource::new().with_seed(7);
        let id = ExamId::new("biologija-2024-ljeto").unwrap();

        let meta = source.exam_meta(&id).await.unwrap();
        assert_eq!(meta.duration_minutes, 70);

        let questions = source.questions(&id).await.unwrap();
        assert_eq!(questions.len(), 30);
        assert!(questions.iter().all(|q| q.points() == 1 && q.options().len() == 4));
        assert_eq!(questions[0].id(), QuestionId::new(1));
        assert_eq!(questions[29].id(), QuestionId::new(30));
    }

    #[tokio::test]
    async fn higher_exam_has_forty_double_point_questions() {
        let source = MockQuestionSource::new();
        let id = ExamId::new("matematika-2024-visa").unwrap();

        let meta = source.exam_meta(&id).await.unwrap();
        assert_eq!(meta.duration_seconds(), 90 * 60);
        let questions = source.questions(&id).await.unwrap();
        assert_eq!(questions.len(), 40);
        assert!(questions.iter().all(|q| q.points() == 2));
    }

    #[tokio::test]
    async fn ids_without_session_are_unknown() {
        let source = MockQuestionSource::new();
        for raw in ["fizika", "fizika-", "-2024"] {
            let id = ExamId::new(raw).unwrap();
            assert!(matches!(
                source.exam_meta(&id).await,
                Err(QuestionSourceError::UnknownExam(unknown)) if unknown == id
            ));
            assert!(matches!(
                source.questions(&id).await,
                Err(QuestionSourceError::UnknownExam(_))
            ));
        }
    }

    #[tokio::test]
    async fn seeded_source_is_reproducible() {
        let id = ExamId::new("kemija-2023").unwrap();
        let a = MockQuestionSource::new().with_seed(42).questions(&id).await.unwrap();
        let b = MockQuestionSource::new().with_seed(42).questions(&id).await.unwrap();
        assert_eq!(a, b);
    }
}
