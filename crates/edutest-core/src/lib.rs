//! edutest-core: test definitions, scoring, and the attempt state machine.
//!
//! This crate defines the data model, the pure scoring engine, the
//! reducer-style session state machine, and the gateway seam that the rest of
//! edutest builds on.

pub mod controller;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
pub mod traits;

pub use controller::SessionController;
pub use error::GatewayError;
pub use model::{AnswerKey, AnswerRecord, Question, QuestionOption, Test};
pub use scoring::{score, score_with_key, QuestionResult, ScoringResult};
pub use session::{SessionAction, SessionStatus, TestSession, Transition};
pub use traits::TestGateway;
