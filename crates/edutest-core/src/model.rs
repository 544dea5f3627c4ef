//! Core data model types for edutest.
//!
//! A [`Test`] is the aggregate root: its questions and their options have no
//! lifecycle of their own. Field names follow the portal's camelCase JSON.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TestId = u64;
pub type QuestionId = u64;
pub type OptionId = u64;

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    /// Unique within its question.
    pub id: OptionId,
    /// Display text.
    pub text: String,
    /// Whether this option is the right answer.
    ///
    /// Stripped from payloads delivered to test-takers in some flows, in which
    /// case it defaults to `false` and the key must come from elsewhere.
    #[serde(default)]
    pub is_correct: bool,
}

/// A single question with its ordered options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique within the test.
    pub id: QuestionId,
    /// Display text.
    pub text: String,
    /// Ordered options.
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

impl Question {
    /// The option flagged correct. The first one wins if several are flagged.
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    /// Look up an option of this question by id.
    pub fn option(&self, id: OptionId) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn has_option(&self, id: OptionId) -> bool {
        self.option(id).is_some()
    }
}

/// A graded assessment valid within a start/end window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: TestId,
    /// Identifier of the authoring teacher.
    pub author_id: u64,
    /// Display name of the authoring teacher.
    #[serde(default)]
    pub author_name: String,
    /// Subject/discipline the test belongs to.
    pub subject_id: u64,
    /// Groups the test is assigned to.
    #[serde(default)]
    pub group_ids: Vec<u64>,
    pub title: String,
    /// Start of the validity window.
    pub start_time: DateTime<Utc>,
    /// End of the validity window.
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Ordered questions.
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Where a point in time falls relative to a test's validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    NotStarted,
    Open,
    Closed,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::NotStarted => write!(f, "not started"),
            Availability::Open => write!(f, "open"),
            Availability::Closed => write!(f, "closed"),
        }
    }
}

impl Test {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Look up a question by id.
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Classify `now` against the `[start_time, end_time]` window (inclusive).
    pub fn availability(&self, now: DateTime<Utc>) -> Availability {
        if now < self.start_time {
            Availability::NotStarted
        } else if now > self.end_time {
            Availability::Closed
        } else {
            Availability::Open
        }
    }
}

/// The answers recorded for one attempt: question id to selected option id.
///
/// Last write wins per question. Ordering is irrelevant to grading; a
/// `BTreeMap` keeps serialized output stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerRecord(BTreeMap<QuestionId, OptionId>);

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the selection for a question.
    pub fn select(&mut self, question: QuestionId, option: OptionId) {
        self.0.insert(question, option);
    }

    pub fn selected(&self, question: QuestionId) -> Option<OptionId> {
        self.0.get(&question).copied()
    }

    pub fn contains(&self, question: QuestionId) -> bool {
        self.0.contains_key(&question)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, OptionId)> + '_ {
        self.0.iter().map(|(q, o)| (*q, *o))
    }
}

impl FromIterator<(QuestionId, OptionId)> for AnswerRecord {
    fn from_iter<I: IntoIterator<Item = (QuestionId, OptionId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The correct option per question.
///
/// Either derived from the `is_correct` flags of a fully populated test or
/// supplied separately by a trusted source at grading time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(BTreeMap<QuestionId, OptionId>);

impl AnswerKey {
    /// Derive the key from the option flags. Questions without a flagged
    /// option have no entry.
    pub fn from_test(test: &Test) -> Self {
        test.questions
            .iter()
            .filter_map(|q| q.correct_option().map(|o| (q.id, o.id)))
            .collect()
    }

    pub fn correct_option(&self, question: QuestionId) -> Option<OptionId> {
        self.0.get(&question).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(QuestionId, OptionId)> for AnswerKey {
    fn from_iter<I: IntoIterator<Item = (QuestionId, OptionId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deserialize_camel_case_payload() {
        let json = r#"{
            "id": 5,
            "authorId": 9,
            "authorName": "B. Smith",
            "subjectId": 4,
            "groupIds": [101, 102],
            "title": "Algebra quiz",
            "startTime": "2026-03-01T08:00:00Z",
            "endTime": "2026-03-01T09:00:00Z",
            "createdAt": "2026-02-20T12:00:00Z",
            "questions": [
                {"id": 1, "text": "2+2?", "options": [
                    {"id": 10, "text": "4", "isCorrect": true},
                    {"id": 11, "text": "5", "isCorrect": false}
                ]}
            ]
        }"#;
        let test: Test = serde_json::from_str(json).unwrap();
        assert_eq!(test.id, 5);
        assert_eq!(test.group_ids, vec![101, 102]);
        assert_eq!(test.questions[0].correct_option().map(|o| o.id), Some(10));
    }

    #[test]
    fn stripped_correct_flag_defaults_to_false() {
        let json = r#"{"id": 1, "text": "q", "options": [{"id": 3, "text": "a"}]}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert!(!q.options[0].is_correct);
        assert!(q.correct_option().is_none());
    }

    #[test]
    fn first_flagged_option_wins() {
        let mut q = question(1, &[10, 11], None);
        q.options[0].is_correct = true;
        q.options[1].is_correct = true;
        assert_eq!(q.correct_option().map(|o| o.id), Some(10));
    }

    #[test]
    fn availability_window() {
        let test = two_question_test();
        let before = Utc.with_ymd_and_hms(2026, 1, 10, 8, 59, 59).unwrap();
        let during = Utc.with_ymd_and_hms(2026, 1, 10, 10, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 10, 11, 0, 1).unwrap();
        assert_eq!(test.availability(before), Availability::NotStarted);
        assert_eq!(test.availability(during), Availability::Open);
        assert_eq!(test.availability(test.end_time), Availability::Open);
        assert_eq!(test.availability(after), Availability::Closed);
    }

    #[test]
    fn answer_record_last_write_wins() {
        let mut answers = AnswerRecord::new();
        answers.select(1, 10);
        answers.select(1, 11);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.selected(1), Some(11));
    }

    #[test]
    fn answer_record_json_uses_string_keys() {
        let answers: AnswerRecord = serde_json::from_str(r#"{"1": 10, "2": 21}"#).unwrap();
        assert_eq!(answers.selected(2), Some(21));
        assert_eq!(serde_json::to_string(&answers).unwrap(), r#"{"1":10,"2":21}"#);
    }

    #[test]
    fn answer_key_skips_questions_without_flag() {
        let test = test_with(vec![
            question(1, &[10, 11], Some(11)),
            question(2, &[20, 21], None),
        ]);
        let key = AnswerKey::from_test(&test);
        assert_eq!(key.len(), 1);
        assert_eq!(key.correct_option(1), Some(11));
        assert_eq!(key.correct_option(2), None);
    }
}
