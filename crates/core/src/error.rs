use thiserror::Error;

use crate::model::CompletionError;
use crate::model::QuizDefinitionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Definition(#[from] QuizDefinitionError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}
