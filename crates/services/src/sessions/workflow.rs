use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::model::{CourseCompletion, CourseId, QuizOutcome, UserCourseId, UserId};
use storage::repository::{CompletionRepository, QuizSource, StorageError};

use super::service::{QuizSession, Tick};
use super::view::CompletionId;
use crate::Clock;
use crate::error::SessionError;

/// Persistence status of a submitted attempt.
#[derive(Debug)]
pub enum CompletionStatus {
    /// The attempt did not pass; nothing is recorded.
    NotRecorded,
    /// The completion row was written with this id.
    Recorded(CompletionId),
    /// The outcome is computed and kept, but the write failed; retry it
    /// through `QuizLoopService::finalize_completion` without retaking.
    WriteFailed(StorageError),
}

/// Result of submitting an attempt, whether manual or by expiry.
#[derive(Debug)]
pub struct SubmitResult {
    pub outcome: QuizOutcome,
    pub completion: CompletionStatus,
}

/// Result of driving the countdown by one second.
#[derive(Debug)]
pub enum TickResult {
    Running { remaining_secs: u32 },
    /// The countdown expired and the attempt was force-submitted.
    Submitted(SubmitResult),
}

/// Orchestrates session start, submission, and completion persistence.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    user_id: UserId,
    quizzes: Arc<dyn QuizSource>,
    completions: Arc<dyn CompletionRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        user_id: UserId,
        quizzes: Arc<dyn QuizSource>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            clock,
            user_id,
            quizzes,
            completions,
        }
    }

    /// The user this workflow acts for.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Start a new attempt for the given enrollment.
    ///
    /// Returns `Ok(None)` when the course has no quiz; the caller shows its
    /// no-quiz state instead of entering the quiz view.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the quiz source fails and
    /// `SessionError::Empty` for a quiz with no questions.
    pub async fn start_session(
        &self,
        course_id: CourseId,
        user_course_id: UserCourseId,
    ) -> Result<Option<QuizSession>, SessionError> {
        let Some(definition) = self.quizzes.get_quiz(course_id).await? else {
            return Ok(None);
        };

        let session = QuizSession::start(
            Arc::new(definition),
            course_id,
            user_course_id,
            self.clock.now(),
        )?;
        tracing::debug!(
            attempt = %session.attempt_id(),
            course = %course_id,
            questions = session.question_count(),
            "quiz attempt started"
        );
        Ok(Some(session))
    }

    /// Submit the attempt and persist a passing outcome.
    ///
    /// The outcome is always returned once scoring succeeds; a failed
    /// completion write is reported in `SubmitResult::completion`, never as
    /// an `Err`, so the caller can offer a persistence retry instead of a
    /// retake.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` if the attempt was already
    /// submitted.
    pub async fn submit(&self, session: &mut QuizSession) -> Result<SubmitResult, SessionError> {
        let now = self.clock.now();
        let outcome = session.submit(now)?;
        let completion = self.record_if_passed(session, outcome, now).await;
        Ok(SubmitResult {
            outcome,
            completion,
        })
    }

    /// Drive the countdown by one second, force-submitting on expiry.
    ///
    /// The expiry path persists exactly like a manual submit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` once the attempt is over;
    /// the caller uses that to stop its ticker if it has not already.
    pub async fn tick(&self, session: &mut QuizSession) -> Result<TickResult, SessionError> {
        let now = self.clock.now();
        match session.tick(now)? {
            Tick::Running { remaining_secs } => Ok(TickResult::Running { remaining_secs }),
            Tick::Expired(outcome) => {
                tracing::debug!(
                    attempt = %session.attempt_id(),
                    "countdown expired, attempt force-submitted"
                );
                let completion = self.record_if_passed(session, outcome, now).await;
                Ok(TickResult::Submitted(SubmitResult {
                    outcome,
                    completion,
                }))
            }
        }
    }

    /// Retry completion persistence after a failed write.
    ///
    /// Idempotent once a completion id is recorded on the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InProgress` before submission,
    /// `SessionError::NotPassed` for a failed attempt, and
    /// `SessionError::Storage` if the write fails again.
    pub async fn finalize_completion(
        &self,
        session: &mut QuizSession,
    ) -> Result<CompletionId, SessionError> {
        if let Some(id) = session.completion_id() {
            return Ok(id);
        }

        let Some(outcome) = session.outcome() else {
            return Err(SessionError::InProgress);
        };
        if !outcome.passed() {
            return Err(SessionError::NotPassed);
        }
        let completed_at = session.submitted_at().ok_or(SessionError::InProgress)?;

        let completion = self.build_completion(session, &outcome, completed_at)?;
        let id = self.completions.record_completion(&completion).await?;
        session.set_completion_id(id);
        Ok(id)
    }

    fn build_completion(
        &self,
        session: &QuizSession,
        outcome: &QuizOutcome,
        completed_at: DateTime<Utc>,
    ) -> Result<CourseCompletion, SessionError> {
        Ok(CourseCompletion::from_outcome(
            self.user_id,
            session.user_course_id(),
            session.course_id(),
            session.attempt_id(),
            outcome,
            completed_at,
        )?)
    }

    async fn record_if_passed(
        &self,
        session: &mut QuizSession,
        outcome: QuizOutcome,
        completed_at: DateTime<Utc>,
    ) -> CompletionStatus {
        if !outcome.passed() {
            return CompletionStatus::NotRecorded;
        }

        let completion = match self.build_completion(session, &outcome, completed_at) {
            Ok(completion) => completion,
            // `from_outcome` only rejects non-passing outcomes, which the
            // guard above already filtered.
            Err(_) => return CompletionStatus::NotRecorded,
        };

        match self.completions.record_completion(&completion).await {
            Ok(id) => {
                session.set_completion_id(id);
                CompletionStatus::Recorded(id)
            }
            Err(err) => {
                tracing::warn!(
                    attempt = %session.attempt_id(),
                    user_course = %session.user_course_id(),
                    error = %err,
                    "completion write failed; outcome kept locally"
                );
                CompletionStatus::WriteFailed(err)
            }
        }
    }
}
