use async_trait::async_trait;
use quiz_core::model::{CourseCompletion, CourseId, QuizDefinition, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted completion together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRow {
    pub id: i64,
    pub completion: CourseCompletion,
}

impl CompletionRow {
    #[must_use]
    pub fn new(id: i64, completion: CourseCompletion) -> Self {
        Self { id, completion }
    }
}

/// Read-side contract for resolving a course's quiz.
///
/// Implemented by local stores and by the remote course catalog alike; the
/// session workflow only needs this side.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// Fetch the quiz for a course.
    ///
    /// `Ok(None)` means the course has no quiz. That is a valid state the
    /// caller must handle, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the source cannot be reached or the stored
    /// data is malformed.
    async fn get_quiz(&self, course_id: CourseId) -> Result<Option<QuizDefinition>, StorageError>;
}

/// Read/write contract for a local quiz store.
#[async_trait]
pub trait QuizRepository: QuizSource {
    /// Persist or replace the quiz for a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(
        &self,
        course_id: CourseId,
        quiz: &QuizDefinition,
    ) -> Result<(), StorageError>;
}

/// Contract for recording and reading course completions.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Append a completion and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt was already recorded,
    /// or other storage errors.
    async fn record_completion(&self, completion: &CourseCompletion) -> Result<i64, StorageError>;

    /// Fetch a completion by storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_completion(&self, id: i64) -> Result<CourseCompletion, StorageError>;

    /// List a user's completions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_completions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<CompletionRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<CourseId, QuizDefinition>>>,
    completions: Arc<Mutex<Vec<CompletionRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            quizzes: Arc::new(Mutex::new(HashMap::new())),
            completions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QuizSource for InMemoryRepository {
    async fn get_quiz(&self, course_id: CourseId) -> Result<Option<QuizDefinition>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&course_id).cloned())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(
        &self,
        course_id: CourseId,
        quiz: &QuizDefinition,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course_id, quiz.clone());
        Ok(())
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn record_completion(&self, completion: &CourseCompletion) -> Result<i64, StorageError> {
        let mut guard = self
            .completions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard
            .iter()
            .any(|row| row.completion.attempt_id() == completion.attempt_id())
        {
            return Err(StorageError::Conflict);
        }
        let id = guard.last().map_or(1, |row| row.id + 1);
        guard.push(CompletionRow::new(id, completion.clone()));
        Ok(id)
    }

    async fn get_completion(&self, id: i64) -> Result<CourseCompletion, StorageError> {
        let guard = self
            .completions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.completion.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_completions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<CompletionRow>, StorageError> {
        let guard = self
            .completions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<CompletionRow> = guard
            .iter()
            .filter(|row| row.completion.user_id() == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.completion
                .completed_at()
                .cmp(&a.completion.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub completions: Arc<dyn CompletionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let completions: Arc<dyn CompletionRepository> = Arc::new(repo);
        Self {
            quizzes,
            completions,
        }
    }

    /// Build `SQLite`-backed storage.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection or migration fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, crate::sqlite::SqliteInitError> {
        let repo = crate::sqlite::SqliteRepository::connect(database_url).await?;
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let completions: Arc<dyn CompletionRepository> = Arc::new(repo);
        Ok(Self {
            quizzes,
            completions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{
        AttemptId, OptionDefinition, OptionId, QuestionDefinition, QuestionId, QuizId,
        UserCourseId,
    };
    use quiz_core::time::fixed_now;

    fn build_quiz(id: u64) -> QuizDefinition {
        let question = QuestionDefinition::new(
            QuestionId::new("q1"),
            "2 + 2?",
            vec![
                OptionDefinition::new(OptionId::new("a"), "3", false),
                OptionDefinition::new(OptionId::new("b"), "4", true),
            ],
        )
        .unwrap();
        QuizDefinition::new(QuizId::new(id), 80, vec![question]).unwrap()
    }

    fn build_completion(user: u64, score: u8, offset_days: i64) -> CourseCompletion {
        CourseCompletion::from_persisted(
            UserId::new(user),
            UserCourseId::new(10),
            CourseId::new(5),
            AttemptId::generate(),
            score,
            true,
            fixed_now() + Duration::days(offset_days),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn round_trips_quiz() {
        let repo = InMemoryRepository::new();
        let quiz = build_quiz(1);
        repo.upsert_quiz(CourseId::new(5), &quiz).await.unwrap();

        let fetched = repo.get_quiz(CourseId::new(5)).await.unwrap();
        assert_eq!(fetched, Some(quiz));
    }

    #[tokio::test]
    async fn missing_quiz_is_none_not_error() {
        let repo = InMemoryRepository::new();
        let fetched = repo.get_quiz(CourseId::new(404)).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn completions_list_newest_first() {
        let repo = InMemoryRepository::new();
        let old = build_completion(1, 80, 0);
        let recent = build_completion(1, 90, 3);
        let other_user = build_completion(2, 100, 5);

        repo.record_completion(&old).await.unwrap();
        repo.record_completion(&recent).await.unwrap();
        repo.record_completion(&other_user).await.unwrap();

        let rows = repo.list_completions(UserId::new(1), 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].completion.score_percent(), 90);
        assert_eq!(rows[1].completion.score_percent(), 80);
    }

    #[tokio::test]
    async fn duplicate_attempt_conflicts() {
        let repo = InMemoryRepository::new();
        let completion = build_completion(1, 80, 0);
        repo.record_completion(&completion).await.unwrap();
        let err = repo.record_completion(&completion).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn get_completion_by_id() {
        let repo = InMemoryRepository::new();
        let completion = build_completion(1, 85, 0);
        let id = repo.record_completion(&completion).await.unwrap();

        let fetched = repo.get_completion(id).await.unwrap();
        assert_eq!(fetched, completion);

        let err = repo.get_completion(id + 1).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
