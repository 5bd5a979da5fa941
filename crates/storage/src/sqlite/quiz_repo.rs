use std::collections::HashMap;

use quiz_core::model::{
    CourseId, OptionDefinition, OptionId, QuestionDefinition, QuestionId, QuizDefinition,
};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_i64, quiz_id_from_i64, ser},
};
use crate::repository::{QuizRepository, QuizSource, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl QuizSource for SqliteRepository {
    async fn get_quiz(&self, course_id: CourseId) -> Result<Option<QuizDefinition>, StorageError> {
        let course = id_i64("course_id", course_id.value())?;

        let Some(quiz_row) =
            sqlx::query("SELECT quiz_id, passing_score FROM quizzes WHERE course_id = ?1")
                .bind(course)
                .fetch_optional(self.pool())
                .await
                .map_err(conn)?
        else {
            return Ok(None);
        };

        let quiz_id = quiz_id_from_i64(quiz_row.try_get::<i64, _>("quiz_id").map_err(ser)?)?;
        let passing_score_i64: i64 = quiz_row.try_get("passing_score").map_err(ser)?;
        let passing_score = u8::try_from(passing_score_i64)
            .map_err(|_| ser(format!("invalid passing_score: {passing_score_i64}")))?;

        let option_rows = sqlx::query(
            r"
                SELECT question_id, id, text, is_correct FROM quiz_options
                WHERE course_id = ?1
                ORDER BY question_id, position
            ",
        )
        .bind(course)
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut options_by_question: HashMap<String, Vec<OptionDefinition>> = HashMap::new();
        for row in &option_rows {
            let question_id: String = row.try_get("question_id").map_err(ser)?;
            let option = OptionDefinition::new(
                OptionId::new(row.try_get::<String, _>("id").map_err(ser)?),
                row.try_get::<String, _>("text").map_err(ser)?,
                row.try_get::<bool, _>("is_correct").map_err(ser)?,
            );
            options_by_question.entry(question_id).or_default().push(option);
        }

        let question_rows = sqlx::query(
            r"
                SELECT id, text FROM quiz_questions
                WHERE course_id = ?1
                ORDER BY position
            ",
        )
        .bind(course)
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        // Rebuild through the validating constructors so malformed rows are
        // rejected here instead of leaking into a session.
        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            let id: String = row.try_get("id").map_err(ser)?;
            let text: String = row.try_get("text").map_err(ser)?;
            let options = options_by_question.remove(id.as_str()).unwrap_or_default();
            let question =
                QuestionDefinition::new(QuestionId::new(id), text, options).map_err(ser)?;
            questions.push(question);
        }

        let quiz = QuizDefinition::new(quiz_id, passing_score, questions).map_err(ser)?;
        Ok(Some(quiz))
    }
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn upsert_quiz(
        &self,
        course_id: CourseId,
        quiz: &QuizDefinition,
    ) -> Result<(), StorageError> {
        let course = id_i64("course_id", course_id.value())?;
        let quiz_id = id_i64("quiz_id", quiz.id().value())?;

        let mut tx = self.pool().begin().await.map_err(conn)?;

        // Replacing the whole quiz keeps position bookkeeping trivial;
        // question rows cascade into their options.
        sqlx::query("DELETE FROM quizzes WHERE course_id = ?1")
            .bind(course)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        sqlx::query("INSERT INTO quizzes (course_id, quiz_id, passing_score) VALUES (?1, ?2, ?3)")
            .bind(course)
            .bind(quiz_id)
            .bind(i64::from(quiz.passing_score()))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in quiz.questions().iter().enumerate() {
            let position = i64::try_from(position).map_err(ser)?;
            sqlx::query(
                r"
                    INSERT INTO quiz_questions (course_id, id, text, position)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(course)
            .bind(question.id().as_str())
            .bind(question.text())
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for (option_position, option) in question.options().iter().enumerate() {
                let option_position = i64::try_from(option_position).map_err(ser)?;
                sqlx::query(
                    r"
                        INSERT INTO quiz_options
                            (course_id, question_id, id, text, is_correct, position)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                )
                .bind(course)
                .bind(question.id().as_str())
                .bind(option.id().as_str())
                .bind(option.text())
                .bind(option.is_correct())
                .bind(option_position)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
