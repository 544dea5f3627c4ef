//! Scoring engine.
//!
//! Maps a test and the recorded answers to a deterministic [`ScoringResult`].
//! Malformed data never raises: a question without a correct option can only
//! score incorrect, and an unanswered question is always incorrect.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerKey, AnswerRecord, OptionId, QuestionId, Test};

/// Grading outcome for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    /// `None` when the question has no correct option configured.
    pub correct_option_id: Option<OptionId>,
    /// `None` when the question was left unanswered.
    pub selected_option_id: Option<OptionId>,
}

impl QuestionResult {
    /// Display label: `correct`, `incorrect`, or `unanswered`.
    pub fn verdict(&self) -> &'static str {
        match (self.is_correct, self.selected_option_id) {
            (true, _) => "correct",
            (false, None) => "unanswered",
            (false, Some(_)) => "incorrect",
        }
    }
}

/// Aggregate grading outcome for a whole attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Percentage in `[0, 100]`, unrounded.
    pub score: f64,
    /// One entry per question, in test order.
    pub details: Vec<QuestionResult>,
}

impl ScoringResult {
    /// The result for a test with no questions.
    pub fn empty() -> Self {
        Self {
            total_questions: 0,
            correct_answers: 0,
            score: 0.0,
            details: Vec::new(),
        }
    }

    /// True when there is at least one question and every one is correct.
    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.correct_answers == self.total_questions
    }

    /// Details of the questions that did not score.
    pub fn incorrect(&self) -> impl Iterator<Item = &QuestionResult> {
        self.details.iter().filter(|d| !d.is_correct)
    }

    pub fn unanswered_count(&self) -> usize {
        self.details
            .iter()
            .filter(|d| d.selected_option_id.is_none())
            .count()
    }
}

/// Score `answers` against the key carried by the test's own option flags.
pub fn score(test: &Test, answers: &AnswerRecord) -> ScoringResult {
    score_with_key(test, answers, &AnswerKey::from_test(test))
}

/// Score `answers` against an explicitly supplied key.
///
/// Only the test's question order and ids are used; option flags are ignored.
pub fn score_with_key(test: &Test, answers: &AnswerRecord, key: &AnswerKey) -> ScoringResult {
    let details: Vec<QuestionResult> = test
        .questions
        .iter()
        .map(|q| {
            let correct_option_id = key.correct_option(q.id);
            let selected_option_id = answers.selected(q.id);
            // Absent never matches absent.
            let is_correct = matches!(
                (selected_option_id, correct_option_id),
                (Some(selected), Some(correct)) if selected == correct
            );
            QuestionResult {
                question_id: q.id,
                is_correct,
                correct_option_id,
                selected_option_id,
            }
        })
        .collect();

    let total_questions = details.len();
    let correct_answers = details.iter().filter(|d| d.is_correct).count();
    let score = if total_questions > 0 {
        correct_answers as f64 / total_questions as f64 * 100.0
    } else {
        0.0
    };

    ScoringResult {
        total_questions,
        correct_answers,
        score,
        details,
    }
}
