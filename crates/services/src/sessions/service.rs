use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quiz_core::model::{
    AnswerReview, AttemptId, CourseId, OptionId, QuestionDefinition, QuestionId, QuizDefinition,
    QuizOutcome, UserCourseId,
};

use super::progress::SessionProgress;
use crate::error::SessionError;

/// Countdown allotted to one attempt, in seconds.
pub const QUIZ_TIME_LIMIT_SECS: u32 = 300;

//
// ─── PHASE & TICK ──────────────────────────────────────────────────────────────
//

/// Coarse lifecycle state of one attempt. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    InProgress,
    Submitted,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining_secs: u32 },
    /// The countdown reached zero and the attempt was force-submitted.
    Expired(QuizOutcome),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state for one attempt at one quiz.
///
/// Owned exclusively by the view that created it; every mutation goes
/// through this type, and nothing mutates after the transition to
/// `Submitted`. Dropping the session before submission discards the attempt
/// without a trace.
pub struct QuizSession {
    attempt_id: AttemptId,
    definition: Arc<QuizDefinition>,
    course_id: CourseId,
    user_course_id: UserCourseId,
    current: usize,
    answers: HashMap<QuestionId, OptionId>,
    remaining_secs: u32,
    phase: QuizPhase,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    outcome: Option<QuizOutcome>,
    completion_id: Option<i64>,
}

impl QuizSession {
    /// Begin a fresh attempt at the given quiz.
    ///
    /// `started_at` should come from the services layer clock to keep time
    /// deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the definition has no questions;
    /// callers must not enter the quiz view in that case.
    pub fn start(
        definition: Arc<QuizDefinition>,
        course_id: CourseId,
        user_course_id: UserCourseId,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if definition.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            attempt_id: AttemptId::generate(),
            definition,
            course_id,
            user_course_id,
            current: 0,
            answers: HashMap::new(),
            remaining_secs: QUIZ_TIME_LIMIT_SECS,
            phase: QuizPhase::InProgress,
            started_at,
            submitted_at: None,
            outcome: None,
            completion_id: None,
        })
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn definition(&self) -> &QuizDefinition {
        &self.definition
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn user_course_id(&self) -> UserCourseId {
        self.user_course_id
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.phase == QuizPhase::Submitted
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// The outcome, once the attempt has been submitted.
    #[must_use]
    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.outcome
    }

    /// Storage id of the persisted completion, once recorded.
    #[must_use]
    pub fn completion_id(&self) -> Option<i64> {
        self.completion_id
    }

    pub(crate) fn set_completion_id(&mut self, id: i64) {
        self.completion_id = Some(id);
    }

    /// Zero-based index of the question currently on screen.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question currently on screen.
    #[must_use]
    pub fn current_question(&self) -> &QuestionDefinition {
        // `start` rejects empty quizzes and navigation clamps the index.
        &self.definition.questions()[self.current]
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.definition.question_count()
    }

    /// Number of questions with a recorded answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// The option recorded for a question, if any.
    #[must_use]
    pub fn selected_option(&self, question: &QuestionId) -> Option<&OptionId> {
        self.answers.get(question)
    }

    /// Returns a summary of the current attempt progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.question_count(),
            answered: self.answered_count(),
            unanswered: self.question_count().saturating_sub(self.answered_count()),
            is_submitted: self.is_submitted(),
        }
    }

    /// Per-question review rows for the results screen, in display order.
    #[must_use]
    pub fn answer_reviews(&self) -> Vec<AnswerReview> {
        AnswerReview::from_answers(&self.definition, &self.answers)
    }

    /// Whether the forward-navigation control should be enabled.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.phase == QuizPhase::InProgress
            && self.current + 1 < self.question_count()
            && self.answers.contains_key(self.current_question().id())
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.phase {
            QuizPhase::InProgress => Ok(()),
            QuizPhase::Submitted => Err(SessionError::AlreadySubmitted),
        }
    }

    /// Record (or overwrite) the answer for a question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` after submission,
    /// `SessionError::UnknownQuestion` for a question outside this quiz, and
    /// `SessionError::ForeignOption` when the option belongs to a different
    /// question. State is unchanged on every error.
    pub fn select_answer(
        &mut self,
        question: QuestionId,
        option: OptionId,
    ) -> Result<(), SessionError> {
        self.ensure_in_progress()?;

        let Some(definition) = self.definition.question(&question) else {
            return Err(SessionError::UnknownQuestion(question));
        };
        if !definition.has_option(&option) {
            return Err(SessionError::ForeignOption { question, option });
        }

        self.answers.insert(question, option);
        Ok(())
    }

    /// Move to the next question and return the new index.
    ///
    /// A call on the last question is a no-op. Forward navigation requires
    /// the current question to be answered; the UI disables its control via
    /// `can_advance` before this is ever hit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` after submission and
    /// `SessionError::Unanswered` when the current question has no answer.
    pub fn go_next(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;

        if self.current + 1 >= self.question_count() {
            return Ok(self.current);
        }
        let question = self.current_question().id();
        if !self.answers.contains_key(question) {
            return Err(SessionError::Unanswered {
                question: question.clone(),
            });
        }

        self.current += 1;
        Ok(self.current)
    }

    /// Move to the previous question and return the new index.
    ///
    /// Clamps at the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` after submission.
    pub fn go_previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.current = self.current.saturating_sub(1);
        Ok(self.current)
    }

    /// Advance the countdown by one second.
    ///
    /// When the countdown reaches zero the attempt is force-submitted and
    /// `Tick::Expired` carries the outcome. The phase guard makes expiry and
    /// a racing manual submit mutually exclusive: whichever runs first wins,
    /// the loser gets `AlreadySubmitted`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` after submission.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Tick, SessionError> {
        self.ensure_in_progress()?;

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            let outcome = self.finish(now)?;
            return Ok(Tick::Expired(outcome));
        }

        Ok(Tick::Running {
            remaining_secs: self.remaining_secs,
        })
    }

    /// Score the attempt and transition to `Submitted`.
    ///
    /// Unanswered questions count as incorrect. Scoring is a pure local
    /// computation; persistence of a passing outcome is the workflow's job.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` if the attempt was already
    /// submitted (manually or by expiry).
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<QuizOutcome, SessionError> {
        self.ensure_in_progress()?;
        self.finish(now)
    }

    fn finish(&mut self, now: DateTime<Utc>) -> Result<QuizOutcome, SessionError> {
        let outcome =
            QuizOutcome::from_answers(&self.definition, &self.answers).ok_or(SessionError::Empty)?;

        self.phase = QuizPhase::Submitted;
        self.submitted_at = Some(now);
        self.outcome = Some(outcome);
        Ok(outcome)
    }

    /// Begin a fresh attempt at the same quiz.
    ///
    /// The definition is shared, so question and option order are identical
    /// across retakes; answers, navigation, and the countdown reset.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InProgress` if this attempt has not been
    /// submitted yet.
    pub fn retake(&self, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if self.phase != QuizPhase::Submitted {
            return Err(SessionError::InProgress);
        }
        Self::start(
            Arc::clone(&self.definition),
            self.course_id,
            self.user_course_id,
            started_at,
        )
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("attempt_id", &self.attempt_id)
            .field("course_id", &self.course_id)
            .field("user_course_id", &self.user_course_id)
            .field("current", &self.current)
            .field("answered", &self.answers.len())
            .field("remaining_secs", &self.remaining_secs)
            .field("phase", &self.phase)
            .field("completion_id", &self.completion_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
