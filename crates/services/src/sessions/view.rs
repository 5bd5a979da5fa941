use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{CourseCompletion, CourseId, UserCourseId, UserId};
use storage::repository::{CompletionRepository, CompletionRow};

use crate::error::SessionError;

/// Storage identifier for a persisted course completion.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type CompletionId = i64;

/// Presentation-agnostic list item for a recorded completion.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings
/// - no localization assumptions
///
/// The UI may format timestamps (e.g., relative time, locale) as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionListItem {
    pub id: CompletionId,
    pub course_id: CourseId,
    pub user_course_id: UserCourseId,
    pub score_percent: u8,
    pub completed_at: DateTime<Utc>,
}

impl CompletionListItem {
    #[must_use]
    pub fn from_row(row: &CompletionRow) -> Self {
        Self {
            id: row.id,
            course_id: row.completion.course_id(),
            user_course_id: row.completion.user_course_id(),
            score_percent: row.completion.score_percent(),
            completed_at: row.completion.completed_at(),
        }
    }
}

/// Read-side service over recorded completions for history screens.
#[derive(Clone)]
pub struct CompletionHistoryService {
    completions: Arc<dyn CompletionRepository>,
}

impl CompletionHistoryService {
    #[must_use]
    pub fn new(completions: Arc<dyn CompletionRepository>) -> Self {
        Self { completions }
    }

    /// List a user's completions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<CompletionListItem>, SessionError> {
        let rows = self.completions.list_completions(user_id, limit).await?;
        Ok(rows.iter().map(CompletionListItem::from_row).collect())
    }

    /// Fetch a recorded completion by id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the completion is missing or
    /// storage fails.
    pub async fn get(&self, id: CompletionId) -> Result<CourseCompletion, SessionError> {
        let completion = self.completions.get_completion(id).await?;
        Ok(completion)
    }
}
