use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Structural problems in raw quiz data.
///
/// The upstream data model does not enforce the one-correct-option rule, so
/// it is enforced here, at the point a definition is built from raw data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizDefinitionError {
    #[error("question {question} has no options")]
    NoOptions { question: QuestionId },

    #[error("question {question} repeats option id {option}")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },

    #[error("question {question} has no correct option")]
    NoCorrectOption { question: QuestionId },

    #[error("question {question} has more than one correct option")]
    MultipleCorrectOptions { question: QuestionId },

    #[error("duplicate question id {question}")]
    DuplicateQuestion { question: QuestionId },

    #[error("passing score {0} is above 100")]
    InvalidPassingScore(u8),
}

//
// ─── DEFINITIONS ───────────────────────────────────────────────────────────────
//

/// One selectable answer option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDefinition {
    id: OptionId,
    text: String,
    is_correct: bool,
}

impl OptionDefinition {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            is_correct,
        }
    }

    #[must_use]
    pub fn id(&self) -> &OptionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

/// A question with its ordered options.
///
/// Option order is the display order and does not change for the lifetime of
/// a session. Construction guarantees exactly one correct option, so
/// `correct_option` is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDefinition {
    id: QuestionId,
    text: String,
    options: Vec<OptionDefinition>,
    correct: usize,
}

impl QuestionDefinition {
    /// Builds a question, validating its option set.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError` if the question has no options, repeats
    /// an option id, or does not have exactly one correct option.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<OptionDefinition>,
    ) -> Result<Self, QuizDefinitionError> {
        if options.is_empty() {
            return Err(QuizDefinitionError::NoOptions { question: id });
        }

        let mut seen = HashSet::new();
        for option in &options {
            if !seen.insert(option.id().clone()) {
                return Err(QuizDefinitionError::DuplicateOption {
                    question: id,
                    option: option.id().clone(),
                });
            }
        }

        let mut correct_indices = options
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_correct())
            .map(|(i, _)| i);

        let Some(correct) = correct_indices.next() else {
            return Err(QuizDefinitionError::NoCorrectOption { question: id });
        };
        if correct_indices.next().is_some() {
            return Err(QuizDefinitionError::MultipleCorrectOptions { question: id });
        }

        Ok(Self {
            id,
            text: text.into(),
            options,
            correct,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Options in display order.
    #[must_use]
    pub fn options(&self) -> &[OptionDefinition] {
        &self.options
    }

    /// The single correct option, established at construction.
    #[must_use]
    pub fn correct_option(&self) -> &OptionDefinition {
        &self.options[self.correct]
    }

    /// Whether `option` belongs to this question's option set.
    #[must_use]
    pub fn has_option(&self, option: &OptionId) -> bool {
        self.options.iter().any(|o| o.id() == option)
    }
}

/// Immutable definition of one quiz, loaded once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDefinition {
    id: QuizId,
    passing_score: u8,
    questions: Vec<QuestionDefinition>,
}

impl QuizDefinition {
    /// Builds a quiz definition from already-validated questions.
    ///
    /// An empty question list is representable here: a course may carry a
    /// quiz whose questions are not published yet. Sessions reject it at
    /// start instead.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError` if the passing score exceeds 100 or a
    /// question id repeats.
    pub fn new(
        id: QuizId,
        passing_score: u8,
        questions: Vec<QuestionDefinition>,
    ) -> Result<Self, QuizDefinitionError> {
        if passing_score > 100 {
            return Err(QuizDefinitionError::InvalidPassingScore(passing_score));
        }

        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id().clone()) {
                return Err(QuizDefinitionError::DuplicateQuestion {
                    question: question.id().clone(),
                });
            }
        }

        Ok(Self {
            id,
            passing_score,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    /// Integer percent threshold for a pass, 0..=100.
    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    /// Questions in display order.
    #[must_use]
    pub fn questions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Looks up a question by id.
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.id() == id)
    }
}

//
// ─── RAW PAYLOADS ──────────────────────────────────────────────────────────────
//

/// Wire shape of an option as served by the course API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionPayload {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

/// Wire shape of a question as served by the course API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    pub id: String,
    pub text: String,
    pub options: Vec<OptionPayload>,
}

/// Wire shape of a quiz as served by the course API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPayload {
    pub id: u64,
    pub passing_score: u8,
    pub questions: Vec<QuestionPayload>,
}

impl QuizPayload {
    /// Converts the raw payload into a validated definition.
    ///
    /// # Errors
    ///
    /// Returns `QuizDefinitionError` for any structural problem in the raw
    /// data; malformed quizzes are rejected here, never repaired.
    pub fn into_definition(self) -> Result<QuizDefinition, QuizDefinitionError> {
        let questions = self
            .questions
            .into_iter()
            .map(|question| {
                let options = question
                    .options
                    .into_iter()
                    .map(|o| OptionDefinition::new(OptionId::new(o.id), o.text, o.is_correct))
                    .collect();
                QuestionDefinition::new(QuestionId::new(question.id), question.text, options)
            })
            .collect::<Result<Vec<_>, _>>()?;

        QuizDefinition::new(QuizId::new(self.id), self.passing_score, questions)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
