use quiz_core::model::{CourseCompletion, UserId};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_completion_row, map_completion_row_with_id},
};
use crate::repository::{CompletionRepository, CompletionRow, StorageError};

fn write_err(e: sqlx::Error) -> StorageError {
    if e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

#[async_trait::async_trait]
impl CompletionRepository for SqliteRepository {
    async fn record_completion(&self, completion: &CourseCompletion) -> Result<i64, StorageError> {
        let user_id = id_i64("user_id", completion.user_id().value())?;
        let user_course_id = id_i64("user_course_id", completion.user_course_id().value())?;
        let course_id = id_i64("course_id", completion.course_id().value())?;

        let res = sqlx::query(
            r"
                INSERT INTO course_completions (
                    user_id, user_course_id, course_id, attempt_id,
                    score_percent, completed, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(user_id)
        .bind(user_course_id)
        .bind(course_id)
        .bind(completion.attempt_id().to_string())
        .bind(i64::from(completion.score_percent()))
        .bind(completion.completed())
        .bind(completion.completed_at())
        .execute(self.pool())
        .await
        .map_err(write_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_completion(&self, id: i64) -> Result<CourseCompletion, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, user_course_id, course_id, attempt_id,
                       score_percent, completed, completed_at
                FROM course_completions
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_completion_row(&row)
    }

    async fn list_completions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<CompletionRow>, StorageError> {
        let user = id_i64("user_id", user_id.value())?;

        let rows = sqlx::query(
            r"
                SELECT id, user_id, user_course_id, course_id, attempt_id,
                       score_percent, completed, completed_at
                FROM course_completions
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_completion_row_with_id).collect()
    }
}
