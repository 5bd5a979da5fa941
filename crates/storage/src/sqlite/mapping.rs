use quiz_core::model::{
    AttemptId, CourseCompletion, CourseId, QuizId, UserCourseId, UserId,
};
use sqlx::Row;

use crate::repository::{CompletionRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

fn score_from_i64(v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid score_percent: {v}")))
}

fn attempt_id_from_str(s: &str) -> Result<AttemptId, StorageError> {
    s.parse::<AttemptId>()
        .map_err(|_| StorageError::Serialization(format!("invalid attempt_id: {s}")))
}

pub(crate) fn map_completion_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CourseCompletion, StorageError> {
    let user_id = UserId::new(i64_to_u64(
        "user_id",
        row.try_get::<i64, _>("user_id").map_err(ser)?,
    )?);
    let user_course_id = UserCourseId::new(i64_to_u64(
        "user_course_id",
        row.try_get::<i64, _>("user_course_id").map_err(ser)?,
    )?);
    let course_id = course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?;
    let attempt_id =
        attempt_id_from_str(row.try_get::<String, _>("attempt_id").map_err(ser)?.as_str())?;
    let score_percent = score_from_i64(row.try_get::<i64, _>("score_percent").map_err(ser)?)?;
    let completed: bool = row.try_get("completed").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    CourseCompletion::from_persisted(
        user_id,
        user_course_id,
        course_id,
        attempt_id,
        score_percent,
        completed,
        completed_at,
    )
    .map_err(ser)
}

pub(crate) fn map_completion_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<CompletionRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let completion = map_completion_row(row)?;
    Ok(CompletionRow::new(id, completion))
}
