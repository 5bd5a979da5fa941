mod progress;
mod service;
mod timer;
mod view;
mod workflow;

// Public API of the quiz session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{QUIZ_TIME_LIMIT_SECS, QuizPhase, QuizSession, Tick};
pub use timer::SessionTicker;
pub use view::{CompletionHistoryService, CompletionId, CompletionListItem};
pub use workflow::{CompletionStatus, QuizLoopService, SubmitResult, TickResult};
