//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CompletionError, OptionId, QuestionId, QuizDefinitionError};
use storage::repository::StorageError;

/// Errors emitted by quiz sessions and the session workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quiz has no questions")]
    Empty,

    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),

    #[error("option {option} does not belong to question {question}")]
    ForeignOption {
        question: QuestionId,
        option: OptionId,
    },

    #[error("question {question} has no answer yet")]
    Unanswered { question: QuestionId },

    #[error("attempt already submitted")]
    AlreadySubmitted,

    #[error("attempt is still in progress")]
    InProgress,

    #[error("attempt did not pass; there is nothing to record")]
    NotPassed,

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Definition(#[from] QuizDefinitionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ApiCourseCatalog`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course catalog request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Definition(#[from] QuizDefinitionError),

    #[error("invalid catalog url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
