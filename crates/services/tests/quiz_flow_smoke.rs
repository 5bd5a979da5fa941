use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use quiz_core::model::{
    CourseCompletion, CourseId, OptionId, QuestionId, QuizPayload, UserCourseId, UserId,
};
use quiz_core::time::fixed_clock;
use services::{CompletionStatus, QuizLoopService, SessionError, TickResult};
use storage::repository::{
    CompletionRepository, CompletionRow, InMemoryRepository, QuizRepository, StorageError,
};

fn sample_quiz_json() -> &'static str {
    r#"{
        "id": 1,
        "passingScore": 80,
        "questions": [
            {
                "id": "Q1",
                "text": "2 + 2?",
                "options": [
                    {"id": "a", "text": "3", "isCorrect": false},
                    {"id": "b", "text": "4", "isCorrect": true}
                ]
            },
            {
                "id": "Q2",
                "text": "Capital of France?",
                "options": [
                    {"id": "x", "text": "Paris", "isCorrect": true},
                    {"id": "y", "text": "Lyon", "isCorrect": false}
                ]
            }
        ]
    }"#
}

async fn seeded_repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    let payload: QuizPayload = serde_json::from_str(sample_quiz_json()).unwrap();
    let quiz = payload.into_definition().unwrap();
    repo.upsert_quiz(CourseId::new(5), &quiz).await.unwrap();
    repo
}

fn loop_service(repo: &InMemoryRepository) -> QuizLoopService {
    QuizLoopService::new(
        fixed_clock(),
        UserId::new(1),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    )
}

/// Completion store that fails a configurable number of writes before
/// delegating to an in-memory store.
struct FlakyCompletions {
    inner: InMemoryRepository,
    failures_left: AtomicU32,
}

impl FlakyCompletions {
    fn failing_once(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(1),
        }
    }
}

#[async_trait]
impl CompletionRepository for FlakyCompletions {
    async fn record_completion(&self, completion: &CourseCompletion) -> Result<i64, StorageError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok()
        {
            return Err(StorageError::Connection("simulated outage".into()));
        }
        self.inner.record_completion(completion).await
    }

    async fn get_completion(&self, id: i64) -> Result<CourseCompletion, StorageError> {
        self.inner.get_completion(id).await
    }

    async fn list_completions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<CompletionRow>, StorageError> {
        self.inner.list_completions(user_id, limit).await
    }
}

#[tokio::test]
async fn passing_attempt_persists_exactly_one_completion() {
    let repo = seeded_repo().await;
    let loop_svc = loop_service(&repo);

    let mut session = loop_svc
        .start_session(CourseId::new(5), UserCourseId::new(10))
        .await
        .unwrap()
        .expect("course has a quiz");

    session
        .select_answer(QuestionId::new("Q1"), OptionId::new("b"))
        .unwrap();
    session
        .select_answer(QuestionId::new("Q2"), OptionId::new("x"))
        .unwrap();

    let result = loop_svc.submit(&mut session).await.unwrap();
    assert_eq!(result.outcome.score_percent(), 100);
    assert!(result.outcome.passed());
    let id = match result.completion {
        CompletionStatus::Recorded(id) => id,
        other => panic!("expected a recorded completion, got {other:?}"),
    };
    assert_eq!(session.completion_id(), Some(id));

    let rows = repo.list_completions(UserId::new(1), 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].completion.score_percent(), 100);
    assert!(rows[0].completion.completed());
    assert_eq!(rows[0].completion.user_course_id(), UserCourseId::new(10));
}

#[tokio::test]
async fn failed_attempt_leaves_no_completion_and_allows_retake() {
    let repo = seeded_repo().await;
    let loop_svc = loop_service(&repo);

    let mut session = loop_svc
        .start_session(CourseId::new(5), UserCourseId::new(10))
        .await
        .unwrap()
        .unwrap();

    session
        .select_answer(QuestionId::new("Q1"), OptionId::new("b"))
        .unwrap();
    session
        .select_answer(QuestionId::new("Q2"), OptionId::new("y"))
        .unwrap();

    let result = loop_svc.submit(&mut session).await.unwrap();
    assert_eq!(result.outcome.score_percent(), 50);
    assert!(!result.outcome.passed());
    assert!(matches!(result.completion, CompletionStatus::NotRecorded));

    let rows = repo.list_completions(UserId::new(1), 10).await.unwrap();
    assert!(rows.is_empty());

    let fresh = session.retake(quiz_core::time::fixed_now()).unwrap();
    assert_eq!(fresh.answered_count(), 0);
}

#[tokio::test]
async fn course_without_quiz_starts_no_session() {
    let repo = InMemoryRepository::new();
    let loop_svc = loop_service(&repo);

    let session = loop_svc
        .start_session(CourseId::new(404), UserCourseId::new(10))
        .await
        .unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn expired_countdown_submits_and_persists() {
    let repo = seeded_repo().await;
    let loop_svc = loop_service(&repo);

    let mut session = loop_svc
        .start_session(CourseId::new(5), UserCourseId::new(10))
        .await
        .unwrap()
        .unwrap();

    session
        .select_answer(QuestionId::new("Q1"), OptionId::new("b"))
        .unwrap();
    session
        .select_answer(QuestionId::new("Q2"), OptionId::new("x"))
        .unwrap();

    let mut submitted = None;
    for _ in 0..services::QUIZ_TIME_LIMIT_SECS {
        match loop_svc.tick(&mut session).await.unwrap() {
            TickResult::Running { .. } => {}
            TickResult::Submitted(result) => {
                assert!(submitted.is_none(), "expiry must submit exactly once");
                submitted = Some(result);
            }
        }
    }

    let result = submitted.expect("countdown expired within the time limit");
    assert!(result.outcome.passed());
    assert!(matches!(result.completion, CompletionStatus::Recorded(_)));

    // The ticker keeps no business running after the attempt is over.
    let err = loop_svc.tick(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadySubmitted));

    let rows = repo.list_completions(UserId::new(1), 10).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn failed_write_surfaces_and_is_retryable_without_retake() {
    let repo = seeded_repo().await;
    let completions = Arc::new(FlakyCompletions::failing_once(repo.clone()));
    let loop_svc = QuizLoopService::new(
        fixed_clock(),
        UserId::new(1),
        Arc::new(repo.clone()),
        Arc::clone(&completions) as Arc<dyn CompletionRepository>,
    );

    let mut session = loop_svc
        .start_session(CourseId::new(5), UserCourseId::new(10))
        .await
        .unwrap()
        .unwrap();

    session
        .select_answer(QuestionId::new("Q1"), OptionId::new("b"))
        .unwrap();
    session
        .select_answer(QuestionId::new("Q2"), OptionId::new("x"))
        .unwrap();

    // The write fails, but the outcome is computed and returned.
    let result = loop_svc.submit(&mut session).await.unwrap();
    assert!(result.outcome.passed());
    assert!(matches!(result.completion, CompletionStatus::WriteFailed(_)));
    assert_eq!(session.completion_id(), None);

    // Retrying the persistence step alone succeeds; no retake needed.
    let id = loop_svc.finalize_completion(&mut session).await.unwrap();
    assert_eq!(session.completion_id(), Some(id));

    // A second finalize is a no-op returning the same id.
    let again = loop_svc.finalize_completion(&mut session).await.unwrap();
    assert_eq!(again, id);

    let rows = repo.list_completions(UserId::new(1), 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
}

#[tokio::test]
async fn finalize_rejects_in_progress_and_failed_attempts() {
    let repo = seeded_repo().await;
    let loop_svc = loop_service(&repo);

    let mut session = loop_svc
        .start_session(CourseId::new(5), UserCourseId::new(10))
        .await
        .unwrap()
        .unwrap();

    let err = loop_svc.finalize_completion(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::InProgress));

    let _ = loop_svc.submit(&mut session).await.unwrap();
    let err = loop_svc.finalize_completion(&mut session).await.unwrap_err();
    assert!(matches!(err, SessionError::NotPassed));
}
