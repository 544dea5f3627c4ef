//! Attempt state machine.
//!
//! A [`TestSession`] tracks one attempt at one test: the loaded definition,
//! the current question, the recorded answers and, once graded, the result.
//! Every change goes through [`TestSession::apply`]; the named methods are thin
//! wrappers around it. Nothing here performs I/O. Loading is split into
//! [`TestSession::begin_load`] and [`TestSession::finish_load`] so the fetch
//! itself can live elsewhere (see `controller`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{AnswerKey, AnswerRecord, OptionId, Question, QuestionId, Test};
use crate::scoring::{self, ScoringResult};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No test loaded.
    Idle,
    /// A load has been started and not yet finished.
    Loading,
    /// Test loaded, answers may be recorded.
    InProgress,
    /// Graded; answers are frozen until reset.
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::InProgress => write!(f, "in progress"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Identifies one load. Only the most recently issued ticket may finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Every input the state machine accepts.
#[derive(Debug, Clone)]
pub enum SessionAction {
    BeginLoad,
    LoadSucceeded { ticket: LoadTicket, test: Box<Test> },
    LoadFailed { ticket: LoadTicket, message: String },
    SelectAnswer { question: QuestionId, option: OptionId },
    NextQuestion,
    PreviousQuestion,
    GoToQuestion(usize),
    /// Grade against the supplied key, or the one derived from the test.
    CheckAnswers { key: Option<AnswerKey> },
    Reset,
}

/// Why an action left the session untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ignored {
    NoTest,
    StaleLoad,
    NotLoading,
    AlreadyCompleted,
    UnknownQuestion(QuestionId),
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
    OutOfRange(usize),
}

impl fmt::Display for Ignored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ignored::NoTest => write!(f, "no test loaded"),
            Ignored::StaleLoad => write!(f, "load superseded by a newer one"),
            Ignored::NotLoading => write!(f, "no load in progress"),
            Ignored::AlreadyCompleted => write!(f, "attempt already graded"),
            Ignored::UnknownQuestion(q) => write!(f, "unknown question {q}"),
            Ignored::UnknownOption { question, option } => {
                write!(f, "option {option} does not belong to question {question}")
            }
            Ignored::OutOfRange(i) => write!(f, "question index {i} out of range"),
        }
    }
}

/// Outcome of [`TestSession::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored(Ignored),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// State of one attempt.
#[derive(Debug, Clone)]
pub struct TestSession {
    status: SessionStatus,
    test: Option<Test>,
    answers: AnswerRecord,
    current_index: usize,
    result: Option<ScoringResult>,
    last_error: Option<String>,
    generation: u64,
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSession {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            test: None,
            answers: AnswerRecord::new(),
            current_index: 0,
            result: None,
            last_error: None,
            generation: 0,
        }
    }

    /// A session with `test` already installed, bypassing the load cycle.
    pub fn with_test(test: Test) -> Self {
        let mut session = Self::new();
        session.install(test);
        session
    }

    /// Apply one action. This is the only place state changes.
    pub fn apply(&mut self, action: SessionAction) -> Transition {
        let transition = match action {
            SessionAction::BeginLoad => {
                self.generation += 1;
                self.status = SessionStatus::Loading;
                self.test = None;
                self.last_error = None;
                self.clear_attempt();
                Transition::Applied
            }
            SessionAction::LoadSucceeded { ticket, test } => match self.check_ticket(ticket) {
                Some(ignored) => Transition::Ignored(ignored),
                None => {
                    self.install(*test);
                    Transition::Applied
                }
            },
            SessionAction::LoadFailed { ticket, message } => match self.check_ticket(ticket) {
                Some(ignored) => Transition::Ignored(ignored),
                None => {
                    tracing::warn!("test load failed: {message}");
                    self.status = SessionStatus::Idle;
                    self.test = None;
                    self.last_error = Some(message);
                    Transition::Applied
                }
            },
            SessionAction::SelectAnswer { question, option } => {
                self.record_answer(question, option)
            }
            SessionAction::NextQuestion => match self.navigable_len() {
                None => Transition::Ignored(Ignored::NoTest),
                Some(len) if self.current_index + 1 < len => {
                    self.current_index += 1;
                    Transition::Applied
                }
                Some(_) => Transition::Ignored(Ignored::OutOfRange(self.current_index + 1)),
            },
            SessionAction::PreviousQuestion => match self.navigable_len() {
                None => Transition::Ignored(Ignored::NoTest),
                Some(_) if self.current_index > 0 => {
                    self.current_index -= 1;
                    Transition::Applied
                }
                Some(_) => Transition::Ignored(Ignored::OutOfRange(0)),
            },
            SessionAction::GoToQuestion(index) => match self.navigable_len() {
                None => Transition::Ignored(Ignored::NoTest),
                Some(len) if index < len => {
                    self.current_index = index;
                    Transition::Applied
                }
                Some(_) => Transition::Ignored(Ignored::OutOfRange(index)),
            },
            SessionAction::CheckAnswers { key } => match (&self.test, self.status) {
                (Some(test), SessionStatus::InProgress | SessionStatus::Completed) => {
                    let result = match key {
                        Some(key) => scoring::score_with_key(test, &self.answers, &key),
                        None => scoring::score(test, &self.answers),
                    };
                    tracing::debug!(
                        correct = result.correct_answers,
                        total = result.total_questions,
                        "attempt graded"
                    );
                    self.result = Some(result);
                    self.status = SessionStatus::Completed;
                    Transition::Applied
                }
                _ => Transition::Ignored(Ignored::NoTest),
            },
            SessionAction::Reset => match self.status {
                SessionStatus::InProgress | SessionStatus::Completed => {
                    self.clear_attempt();
                    self.status = SessionStatus::InProgress;
                    Transition::Applied
                }
                _ => Transition::Ignored(Ignored::NoTest),
            },
        };

        if let Transition::Ignored(reason) = &transition {
            tracing::debug!(status = %self.status, "action ignored: {reason}");
        }
        transition
    }

    /// Start a load: drop the current test and attempt, return the ticket the
    /// completion must present.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.apply(SessionAction::BeginLoad);
        LoadTicket(self.generation)
    }

    /// Finish the load identified by `ticket`. Outcomes of superseded loads
    /// are ignored.
    pub fn finish_load(&mut self, ticket: LoadTicket, outcome: Result<Test, String>) -> Transition {
        match outcome {
            Ok(test) => self.apply(SessionAction::LoadSucceeded {
                ticket,
                test: Box::new(test),
            }),
            Err(message) => self.apply(SessionAction::LoadFailed { ticket, message }),
        }
    }

    /// Record `option` for `question`, replacing any earlier choice.
    ///
    /// Only ids of the loaded test are accepted: an unknown question yields
    /// `Ignored::UnknownQuestion`, and an option that does not belong to the
    /// question yields `Ignored::UnknownOption`, leaving the record untouched.
    /// Once graded, answers are frozen until [`reset`](Self::reset).
    pub fn select_answer(&mut self, question: QuestionId, option: OptionId) -> Transition {
        self.apply(SessionAction::SelectAnswer { question, option })
    }

    pub fn next_question(&mut self) -> Transition {
        self.apply(SessionAction::NextQuestion)
    }

    pub fn previous_question(&mut self) -> Transition {
        self.apply(SessionAction::PreviousQuestion)
    }

    pub fn go_to_question(&mut self, index: usize) -> Transition {
        self.apply(SessionAction::GoToQuestion(index))
    }

    pub fn check_answers(&mut self) -> Transition {
        self.apply(SessionAction::CheckAnswers { key: None })
    }

    pub fn check_answers_with_key(&mut self, key: AnswerKey) -> Transition {
        self.apply(SessionAction::CheckAnswers { key: Some(key) })
    }

    pub fn reset(&mut self) -> Transition {
        self.apply(SessionAction::Reset)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn test(&self) -> Option<&Test> {
        self.test.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.test
            .as_ref()
            .and_then(|t| t.questions.get(self.current_index))
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn selected_option(&self, question: QuestionId) -> Option<OptionId> {
        self.answers.selected(question)
    }

    pub fn result(&self) -> Option<&ScoringResult> {
        self.result.as_ref()
    }

    /// Message of the most recent failed load, cleared by the next load.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn question_count(&self) -> usize {
        self.test.as_ref().map_or(0, Test::question_count)
    }

    /// Number of questions of the loaded test that have an answer.
    pub fn answered_count(&self) -> usize {
        self.test.as_ref().map_or(0, |t| {
            t.questions
                .iter()
                .filter(|q| self.answers.contains(q.id))
                .count()
        })
    }

    /// Percentage of questions answered, recomputed on every call.
    pub fn progress(&self) -> f64 {
        match self.question_count() {
            0 => 0.0,
            total => self.answered_count() as f64 / total as f64 * 100.0,
        }
    }

    /// True iff the test has questions and every one of them is answered.
    pub fn is_completed(&self) -> bool {
        let total = self.question_count();
        total > 0 && self.answered_count() == total
    }

    fn install(&mut self, test: Test) {
        tracing::debug!(test_id = test.id, questions = test.questions.len(), "test loaded");
        self.test = Some(test);
        self.last_error = None;
        self.clear_attempt();
        self.status = SessionStatus::InProgress;
    }

    fn clear_attempt(&mut self) {
        self.answers.clear();
        self.current_index = 0;
        self.result = None;
    }

    fn check_ticket(&self, ticket: LoadTicket) -> Option<Ignored> {
        if ticket.0 != self.generation {
            Some(Ignored::StaleLoad)
        } else if self.status != SessionStatus::Loading {
            Some(Ignored::NotLoading)
        } else {
            None
        }
    }

    /// Question count when navigation is allowed, `None` otherwise.
    fn navigable_len(&self) -> Option<usize> {
        match self.status {
            SessionStatus::InProgress | SessionStatus::Completed => {
                Some(self.question_count()).filter(|&len| len > 0)
            }
            _ => None,
        }
    }

    fn record_answer(&mut self, question: QuestionId, option: OptionId) -> Transition {
        match self.status {
            SessionStatus::Completed => return Transition::Ignored(Ignored::AlreadyCompleted),
            SessionStatus::InProgress => {}
            _ => return Transition::Ignored(Ignored::NoTest),
        }
        let Some(test) = &self.test else {
            return Transition::Ignored(Ignored::NoTest);
        };
        let Some(q) = test.question(question) else {
            return Transition::Ignored(Ignored::UnknownQuestion(question));
        };
        if !q.has_option(option) {
            return Transition::Ignored(Ignored::UnknownOption { question, option });
        }
        self.answers.select(question, option);
        Transition::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;

    fn three_question_session() -> TestSession {
        TestSession::with_test(test_with(vec![
            question(1, &[10, 11], Some(10)),
            question(2, &[20, 21], Some(21)),
            question(3, &[30, 31], Some(30)),
        ]))
    }

    #[test]
    fn new_session_is_idle() {
        let session = TestSession::new();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.test().is_none());
        assert_eq!(session.progress(), 0.0);
        assert!(!session.is_completed());
    }

    #[test]
    fn load_cycle_installs_test() {
        let mut session = TestSession::new();
        let ticket = session.begin_load();
        assert_eq!(session.status(), SessionStatus::Loading);

        let t = session.finish_load(ticket, Ok(two_question_test()));
        assert!(t.is_applied());
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.question_count(), 2);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn failed_load_records_error_and_installs_nothing() {
        let mut session = three_question_session();
        session.select_answer(1, 10);

        let ticket = session.begin_load();
        session.finish_load(ticket, Err("network error: connection refused".into()));

        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.test().is_none());
        assert!(session.answers().is_empty());
        assert_eq!(
            session.last_error(),
            Some("network error: connection refused")
        );

        // A later successful load clears the error.
        let ticket = session.begin_load();
        session.finish_load(ticket, Ok(two_question_test()));
        assert!(session.last_error().is_none());
    }

    #[test]
    fn stale_load_does_not_clobber_newer_one() {
        let mut session = TestSession::new();
        let first = session.begin_load();
        let second = session.begin_load();

        let mut newer = two_question_test();
        newer.id = 2;
        assert!(session.finish_load(second, Ok(newer)).is_applied());

        let mut older = two_question_test();
        older.id = 1;
        assert_eq!(
            session.finish_load(first, Ok(older)),
            Transition::Ignored(Ignored::StaleLoad)
        );
        assert_eq!(session.test().map(|t| t.id), Some(2));
    }

    #[test]
    fn stale_failure_is_ignored_too() {
        let mut session = TestSession::new();
        let first = session.begin_load();
        let second = session.begin_load();
        session.finish_load(second, Ok(two_question_test()));
        session.finish_load(first, Err("timeout".into()));
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn navigation_is_bounded() {
        let mut session = three_question_session();
        assert!(!session.previous_question().is_applied());
        assert_eq!(session.current_index(), 0);

        for _ in 0..10 {
            session.next_question();
        }
        assert_eq!(session.current_index(), 2);
        assert_eq!(session.current_question().map(|q| q.id), Some(3));

        for _ in 0..10 {
            session.previous_question();
        }
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn go_to_question() {
        let mut session = three_question_session();
        assert!(session.go_to_question(2).is_applied());
        assert_eq!(session.current_index(), 2);
        assert_eq!(
            session.go_to_question(3),
            Transition::Ignored(Ignored::OutOfRange(3))
        );
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn navigation_on_empty_test_is_noop() {
        let mut session = TestSession::with_test(test_with(vec![]));
        session.next_question();
        session.previous_question();
        assert_eq!(session.current_index(), 0);
        assert!(session.current_question().is_none());
    }

    #[test]
    fn select_answer_overwrites() {
        let mut session = three_question_session();
        session.select_answer(1, 10);
        session.select_answer(1, 11);
        assert_eq!(session.selected_option(1), Some(11));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn select_answer_rejects_unknown_ids() {
        let mut session = three_question_session();
        assert_eq!(
            session.select_answer(9, 10),
            Transition::Ignored(Ignored::UnknownQuestion(9))
        );
        assert_eq!(
            session.select_answer(1, 20),
            Transition::Ignored(Ignored::UnknownOption {
                question: 1,
                option: 20
            })
        );
        assert!(session.answers().is_empty());
    }

    #[test]
    fn select_answer_without_test_is_ignored() {
        let mut session = TestSession::new();
        assert_eq!(
            session.select_answer(1, 10),
            Transition::Ignored(Ignored::NoTest)
        );
    }

    #[test]
    fn progress_tracks_answers_exactly() {
        let mut session = three_question_session();
        let mut last = session.progress();
        assert_eq!(last, 0.0);

        for (k, (q, o)) in [(1, 10), (2, 20), (3, 31)].into_iter().enumerate() {
            session.select_answer(q, o);
            let progress = session.progress();
            assert!(progress >= last);
            let expected = 100.0 * (k + 1) as f64 / 3.0;
            assert!((progress - expected).abs() < 1e-9, "{progress} vs {expected}");
            last = progress;
        }
        assert!(session.is_completed());
    }

    #[test]
    fn empty_test_is_never_completed() {
        let session = TestSession::with_test(test_with(vec![]));
        assert!(!session.is_completed());
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn check_answers_grades_and_completes() {
        let mut session = three_question_session();
        session.select_answer(1, 10);
        session.select_answer(2, 20);

        assert!(session.check_answers().is_applied());
        assert_eq!(session.status(), SessionStatus::Completed);
        let result = session.result().unwrap();
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.correct_answers, 1);
        assert_eq!(result.unanswered_count(), 1);
    }

    #[test]
    fn answers_are_frozen_after_grading() {
        let mut session = three_question_session();
        session.select_answer(1, 11);
        session.check_answers();

        assert_eq!(
            session.select_answer(1, 10),
            Transition::Ignored(Ignored::AlreadyCompleted)
        );
        assert_eq!(session.selected_option(1), Some(11));

        // Review navigation still works.
        assert!(session.next_question().is_applied());
    }

    #[test]
    fn check_answers_with_supplied_key() {
        let mut session = TestSession::with_test(test_with(vec![
            question(1, &[10, 11], None),
            question(2, &[20, 21], None),
        ]));
        session.select_answer(1, 11);
        session.select_answer(2, 21);
        let key: AnswerKey = [(1, 11), (2, 20)].into_iter().collect();
        session.check_answers_with_key(key);
        assert_eq!(session.result().map(|r| r.correct_answers), Some(1));
    }

    #[test]
    fn check_answers_without_test_is_noop() {
        let mut session = TestSession::new();
        assert_eq!(
            session.check_answers(),
            Transition::Ignored(Ignored::NoTest)
        );
        assert!(session.result().is_none());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn check_answers_on_empty_test_yields_zero_result() {
        let mut session = TestSession::with_test(test_with(vec![]));
        session.check_answers();
        assert_eq!(session.result(), Some(&ScoringResult::empty()));
    }

    #[test]
    fn reset_clears_attempt_but_keeps_test() {
        let mut session = three_question_session();
        session.select_answer(1, 10);
        session.select_answer(2, 21);
        session.select_answer(3, 30);
        session.next_question();
        session.check_answers();

        assert!(session.reset().is_applied());
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(session.answers().is_empty());
        assert_eq!(session.current_index(), 0);
        assert!(!session.is_completed());
        assert!(session.result().is_none());
        assert_eq!(session.question_count(), 3);

        // Idempotent.
        session.reset();
        assert!(session.answers().is_empty());
        assert_eq!(session.current_index(), 0);

        // Retake.
        assert!(session.select_answer(1, 11).is_applied());
    }

    #[test]
    fn reset_without_test_is_noop() {
        let mut session = TestSession::new();
        assert!(!session.reset().is_applied());
        assert!(session.answers().is_empty());
        assert_eq!(session.current_index(), 0);
        assert!(!session.is_completed());
    }
}
