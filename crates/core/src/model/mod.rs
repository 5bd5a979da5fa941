mod completion;
mod ids;
mod outcome;
mod quiz;

pub use ids::{
    AttemptId, CourseId, OptionId, ParseIdError, QuestionId, QuizId, UserCourseId, UserId,
};

pub use completion::{CompletionError, CourseCompletion};
pub use outcome::{AnswerReview, QuizOutcome};
pub use quiz::{
    OptionDefinition, OptionPayload, QuestionDefinition, QuestionPayload, QuizDefinition,
    QuizDefinitionError, QuizPayload,
};
