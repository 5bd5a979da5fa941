use chrono::Duration;
use quiz_core::model::{
    AttemptId, CourseCompletion, CourseId, OptionDefinition, OptionId, QuestionDefinition,
    QuestionId, QuizDefinition, QuizId, UserCourseId, UserId,
};
use quiz_core::time::fixed_now;
use storage::repository::{CompletionRepository, QuizRepository, QuizSource, StorageError};
use storage::sqlite::SqliteRepository;

fn build_quiz() -> QuizDefinition {
    let q1 = QuestionDefinition::new(
        QuestionId::new("q1"),
        "2 + 2?",
        vec![
            OptionDefinition::new(OptionId::new("a"), "3", false),
            OptionDefinition::new(OptionId::new("b"), "4", true),
            OptionDefinition::new(OptionId::new("c"), "5", false),
        ],
    )
    .unwrap();
    let q2 = QuestionDefinition::new(
        QuestionId::new("q2"),
        "Capital of France?",
        vec![
            OptionDefinition::new(OptionId::new("x"), "Paris", true),
            OptionDefinition::new(OptionId::new("y"), "Lyon", false),
        ],
    )
    .unwrap();
    QuizDefinition::new(QuizId::new(7), 80, vec![q1, q2]).unwrap()
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
async fn sqlite_roundtrip_preserves_question_and_option_order() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_quiz_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");

    let quiz = build_quiz();
    repo.upsert_quiz(CourseId::new(5), &quiz).await.unwrap();

    let fetched = repo
        .get_quiz(CourseId::new(5))
        .await
        .expect("fetch")
        .expect("quiz present");

    assert_eq!(fetched, quiz);
    assert_eq!(fetched.questions()[0].id(), &QuestionId::new("q1"));
    assert_eq!(fetched.questions()[1].id(), &QuestionId::new("q2"));
    let first_options: Vec<&str> = fetched.questions()[0]
        .options()
        .iter()
        .map(|o| o.id().as_str())
        .collect();
    assert_eq!(first_options, ["a", "b", "c"]);
    assert_eq!(
        fetched.questions()[1].correct_option().id(),
        &OptionId::new("x")
    );
}

#[tokio::test]
async fn sqlite_upsert_replaces_previous_quiz() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_quiz_replace?mode=memory&cache=shared")
        .await
        .expect("connect");

    repo.upsert_quiz(CourseId::new(5), &build_quiz()).await.unwrap();

    let replacement = QuizDefinition::new(
        QuizId::new(8),
        50,
        vec![
            QuestionDefinition::new(
                QuestionId::new("q9"),
                "Only question",
                vec![OptionDefinition::new(OptionId::new("a"), "yes", true)],
            )
            .unwrap(),
        ],
    )
    .unwrap();
    repo.upsert_quiz(CourseId::new(5), &replacement).await.unwrap();

    let fetched = repo.get_quiz(CourseId::new(5)).await.unwrap().unwrap();
    assert_eq!(fetched, replacement);
    assert_eq!(fetched.question_count(), 1);
}

#[tokio::test]
async fn sqlite_missing_quiz_is_none() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_quiz_missing?mode=memory&cache=shared")
        .await
        .expect("connect");

    let fetched = repo.get_quiz(CourseId::new(404)).await.unwrap();
    assert!(fetched.is_none());
}

#[tokio::test]
async fn sqlite_completions_roundtrip_and_order() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_completions?mode=memory&cache=shared")
        .await
        .expect("connect");

    let old = build_completion(1, 80, 0);
    let recent = build_completion(1, 95, 2);
    let other_user = build_completion(2, 100, 4);

    let old_id = repo.record_completion(&old).await.unwrap();
    repo.record_completion(&recent).await.unwrap();
    repo.record_completion(&other_user).await.unwrap();

    let fetched = repo.get_completion(old_id).await.unwrap();
    assert_eq!(fetched, old);

    let rows = repo.list_completions(UserId::new(1), 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].completion.score_percent(), 95);
    assert_eq!(rows[1].completion.score_percent(), 80);
}

#[tokio::test]
async fn sqlite_rejects_duplicate_attempt_ids() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_dup_attempt?mode=memory&cache=shared")
        .await
        .expect("connect");

    let completion = build_completion(1, 90, 0);
    repo.record_completion(&completion).await.unwrap();
    let err = repo.record_completion(&completion).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_connect_is_idempotent_over_migrations() {
    let url = "sqlite:file:memdb_migrate_twice?mode=memory&cache=shared";
    let first = SqliteRepository::connect(url).await.expect("first connect");
    first
        .upsert_quiz(CourseId::new(1), &build_quiz())
        .await
        .unwrap();

    // A second connection against the same database must not re-run the
    // schema migration or disturb existing rows.
    let second = SqliteRepository::connect(url).await.expect("second connect");
    let fetched = second.get_quiz(CourseId::new(1)).await.unwrap();
    assert!(fetched.is_some());
}
