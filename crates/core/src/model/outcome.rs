use std::collections::HashMap;

use crate::model::ids::{OptionId, QuestionId};
use crate::model::quiz::QuizDefinition;

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Scored result of one quiz attempt.
///
/// Computed once at submission; unanswered questions count as incorrect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    correct_count: u32,
    question_count: u32,
    score_percent: u8,
    passed: bool,
}

/// Round-half-up integer percent. `total` must be non-zero.
#[allow(clippy::cast_possible_truncation)]
fn percent(correct: u32, total: u32) -> u8 {
    let correct = u64::from(correct);
    let total = u64::from(total);
    let scaled = (100 * correct + total / 2) / total;
    // correct <= total, so the result is within 0..=100.
    scaled as u8
}

impl QuizOutcome {
    /// Scores an answer map against a definition.
    ///
    /// Returns `None` when the definition has no questions; sessions refuse
    /// to start on such a definition, so callers inside a session never see
    /// it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_answers(
        definition: &QuizDefinition,
        answers: &HashMap<QuestionId, OptionId>,
    ) -> Option<Self> {
        let question_count = u32::try_from(definition.question_count()).ok()?;
        if question_count == 0 {
            return None;
        }

        let correct_count = definition
            .questions()
            .iter()
            .filter(|question| {
                answers
                    .get(question.id())
                    .is_some_and(|selected| selected == question.correct_option().id())
            })
            .count() as u32;

        let score_percent = percent(correct_count, question_count);
        Some(Self {
            correct_count,
            question_count,
            score_percent,
            passed: score_percent >= definition.passing_score(),
        })
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    /// Rounded percent score, 0..=100.
    #[must_use]
    pub fn score_percent(&self) -> u8 {
        self.score_percent
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }
}

//
// ─── ANSWER REVIEW ─────────────────────────────────────────────────────────────
//

/// Per-question review row for the results screen: what was chosen and what
/// the correct choice was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerReview {
    pub question_id: QuestionId,
    pub selected: Option<OptionId>,
    pub correct: OptionId,
    pub is_correct: bool,
}

impl AnswerReview {
    /// Builds one review row per question, in display order.
    #[must_use]
    pub fn from_answers(
        definition: &QuizDefinition,
        answers: &HashMap<QuestionId, OptionId>,
    ) -> Vec<Self> {
        definition
            .questions()
            .iter()
            .map(|question| {
                let selected = answers.get(question.id()).cloned();
                let correct = question.correct_option().id().clone();
                let is_correct = selected.as_ref() == Some(&correct);
                Self {
                    question_id: question.id().clone(),
                    selected,
                    correct,
                    is_correct,
                }
            })
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuizId;
    use crate::model::quiz::{OptionDefinition, QuestionDefinition};

    fn quiz(passing_score: u8, question_count: usize) -> QuizDefinition {
        let questions = (0..question_count)
            .map(|i| {
                QuestionDefinition::new(
                    QuestionId::new(format!("q{i}")),
                    format!("question {i}"),
                    vec![
                        OptionDefinition::new(OptionId::new("right"), "right", true),
                        OptionDefinition::new(OptionId::new("wrong"), "wrong", false),
                    ],
                )
                .unwrap()
            })
            .collect();
        QuizDefinition::new(QuizId::new(1), passing_score, questions).unwrap()
    }

    fn answer_first_n(quiz: &QuizDefinition, n: usize) -> HashMap<QuestionId, OptionId> {
        quiz.questions()
            .iter()
            .take(n)
            .map(|q| (q.id().clone(), OptionId::new("right")))
            .collect()
    }

    #[test]
    fn all_correct_scores_100_and_passes() {
        let quiz = quiz(100, 4);
        let answers = answer_first_n(&quiz, 4);
        let outcome = QuizOutcome::from_answers(&quiz, &answers).unwrap();
        assert_eq!(outcome.score_percent(), 100);
        assert_eq!(outcome.correct_count(), 4);
        assert!(outcome.passed());
    }

    #[test]
    fn no_answers_scores_zero() {
        let quiz = quiz(50, 5);
        let outcome = QuizOutcome::from_answers(&quiz, &HashMap::new()).unwrap();
        assert_eq!(outcome.score_percent(), 0);
        assert_eq!(outcome.correct_count(), 0);
        assert!(!outcome.passed());
    }

    #[test]
    fn rounding_is_half_up() {
        // 4/8 = 50.0 -> 50
        let q8 = quiz(50, 8);
        let outcome = QuizOutcome::from_answers(&q8, &answer_first_n(&q8, 4)).unwrap();
        assert_eq!(outcome.score_percent(), 50);

        // 1/3 = 33.33 -> 33
        let q3 = quiz(50, 3);
        let outcome = QuizOutcome::from_answers(&q3, &answer_first_n(&q3, 1)).unwrap();
        assert_eq!(outcome.score_percent(), 33);

        // 5/8 = 62.5 -> 63
        let q8 = quiz(50, 8);
        let outcome = QuizOutcome::from_answers(&q8, &answer_first_n(&q8, 5)).unwrap();
        assert_eq!(outcome.score_percent(), 63);
    }

    #[test]
    fn exact_threshold_passes() {
        let quiz = quiz(50, 2);
        let outcome = QuizOutcome::from_answers(&quiz, &answer_first_n(&quiz, 1)).unwrap();
        assert_eq!(outcome.score_percent(), 50);
        assert!(outcome.passed());
    }

    #[test]
    fn empty_definition_has_no_outcome() {
        let quiz = QuizDefinition::new(QuizId::new(1), 50, Vec::new()).unwrap();
        assert!(QuizOutcome::from_answers(&quiz, &HashMap::new()).is_none());
    }

    #[test]
    fn wrong_selection_counts_as_incorrect() {
        let quiz = quiz(50, 2);
        let mut answers = answer_first_n(&quiz, 1);
        answers.insert(quiz.questions()[1].id().clone(), OptionId::new("wrong"));
        let outcome = QuizOutcome::from_answers(&quiz, &answers).unwrap();
        assert_eq!(outcome.correct_count(), 1);
    }

    #[test]
    fn review_rows_follow_display_order() {
        let quiz = quiz(50, 3);
        let mut answers = answer_first_n(&quiz, 1);
        answers.insert(quiz.questions()[2].id().clone(), OptionId::new("wrong"));

        let rows = AnswerReview::from_answers(&quiz, &answers);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].question_id, quiz.questions()[0].id().clone());
        assert!(rows[0].is_correct);
        assert_eq!(rows[0].selected, Some(OptionId::new("right")));

        assert_eq!(rows[1].selected, None);
        assert!(!rows[1].is_correct);

        assert_eq!(rows[2].selected, Some(OptionId::new("wrong")));
        assert_eq!(rows[2].correct, OptionId::new("right"));
        assert!(!rows[2].is_correct);
    }
}
