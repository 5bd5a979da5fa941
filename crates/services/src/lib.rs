#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use catalog::{ApiCourseCatalog, CatalogConfig};
pub use error::{CatalogError, SessionError};

pub use sessions::{
    CompletionHistoryService, CompletionId, CompletionListItem, CompletionStatus,
    QUIZ_TIME_LIMIT_SECS, QuizLoopService, QuizPhase, QuizSession, SessionProgress, SessionTicker,
    SubmitResult, Tick, TickResult,
};
