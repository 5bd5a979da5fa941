use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AttemptId, CourseId, UserCourseId, UserId};
use crate::model::outcome::QuizOutcome;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("score percent {score} is above 100")]
    InvalidScore { score: u8 },

    #[error("attempt did not pass")]
    NotPassed,
}

/// Persisted record of a passing quiz attempt.
///
/// Only passing attempts are ever recorded; failed attempts leave no trace
/// beyond the in-memory session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseCompletion {
    user_id: UserId,
    user_course_id: UserCourseId,
    course_id: CourseId,
    attempt_id: AttemptId,
    score_percent: u8,
    completed: bool,
    completed_at: DateTime<Utc>,
}

impl CourseCompletion {
    /// Rehydrate a completion from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::InvalidScore` if the stored score is above
    /// 100.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        user_course_id: UserCourseId,
        course_id: CourseId,
        attempt_id: AttemptId,
        score_percent: u8,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, CompletionError> {
        if score_percent > 100 {
            return Err(CompletionError::InvalidScore {
                score: score_percent,
            });
        }

        Ok(Self {
            user_id,
            user_course_id,
            course_id,
            attempt_id,
            score_percent,
            completed,
            completed_at,
        })
    }

    /// Build a completion record from a scored outcome.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::NotPassed` when the outcome did not clear
    /// the passing score; failed attempts are never recorded.
    pub fn from_outcome(
        user_id: UserId,
        user_course_id: UserCourseId,
        course_id: CourseId,
        attempt_id: AttemptId,
        outcome: &QuizOutcome,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, CompletionError> {
        if !outcome.passed() {
            return Err(CompletionError::NotPassed);
        }

        Self::from_persisted(
            user_id,
            user_course_id,
            course_id,
            attempt_id,
            outcome.score_percent(),
            true,
            completed_at,
        )
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn user_course_id(&self) -> UserCourseId {
        self.user_course_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn score_percent(&self) -> u8 {
        self.score_percent
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}
