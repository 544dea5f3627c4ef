//! Test definition loader and authoring validation.
//!
//! Loads tests and answer files from JSON, and checks test definitions for the
//! issues the authoring flow rejects. Scoring tolerates all of these; the
//! warnings exist for authors and for the `validate` command.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{AnswerKey, AnswerRecord, QuestionId, Test};

/// Minimum number of options a question must offer.
pub const MIN_OPTIONS: usize = 2;

/// Parse a single JSON file into a `Test`.
pub fn parse_test(path: &Path) -> Result<Test> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test file: {}", path.display()))?;

    parse_test_str(&content, path)
}

/// Parse a JSON string into a `Test` (useful for testing).
pub fn parse_test_str(content: &str, source_path: &Path) -> Result<Test> {
    serde_json::from_str(content)
        .with_context(|| format!("failed to parse test JSON: {}", source_path.display()))
}

/// Load an answer record (`{"<question id>": <option id>, ...}`).
pub fn parse_answers(path: &Path) -> Result<AnswerRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers JSON: {}", path.display()))
}

/// Load an answer key (same shape as an answer record).
pub fn parse_answer_key(path: &Path) -> Result<AnswerKey> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer key: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answer key JSON: {}", path.display()))
}

/// Whether `path` names a test definition (`*.json` but not `*.key.json`).
pub fn is_test_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
        && !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".key.json"))
}

/// Recursively load every test definition under `dir`.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_test_directory(dir: &Path) -> Result<Vec<Test>> {
    let mut tests = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            tests.extend(load_test_directory(&path)?);
        } else if is_test_file(&path) {
            match parse_test(&path) {
                Ok(test) => tests.push(test),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    tests.sort_by_key(|t| t.id);
    Ok(tests)
}

/// A warning from test validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<QuestionId>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn test(message: impl Into<String>) -> Self {
        Self {
            question_id: None,
            message: message.into(),
        }
    }

    fn question(id: QuestionId, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id),
            message: message.into(),
        }
    }
}

/// Validate a test definition against the authoring rules.
pub fn validate_test(test: &Test) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if test.title.trim().is_empty() {
        warnings.push(ValidationWarning::test("title is empty"));
    }

    if test.end_time <= test.start_time {
        warnings.push(ValidationWarning::test(format!(
            "end time {} is not after start time {}",
            test.end_time, test.start_time
        )));
    }

    if test.questions.is_empty() {
        warnings.push(ValidationWarning::test("test has no questions"));
    }

    let mut seen_questions = HashSet::new();
    for question in &test.questions {
        if !seen_questions.insert(question.id) {
            warnings.push(ValidationWarning::question(
                question.id,
                format!("duplicate question ID: {}", question.id),
            ));
        }

        if question.text.trim().is_empty() {
            warnings.push(ValidationWarning::question(question.id, "question text is empty"));
        }

        if question.options.len() < MIN_OPTIONS {
            warnings.push(ValidationWarning::question(
                question.id,
                format!(
                    "has {} option(s), at least {MIN_OPTIONS} required",
                    question.options.len()
                ),
            ));
        }

        let mut seen_options = HashSet::new();
        for option in &question.options {
            if !seen_options.insert(option.id) {
                warnings.push(ValidationWarning::question(
                    question.id,
                    format!("duplicate option ID: {}", option.id),
                ));
            }
            if option.text.trim().is_empty() {
                warnings.push(ValidationWarning::question(
                    question.id,
                    format!("option {} has empty text", option.id),
                ));
            }
        }

        match question.options.iter().filter(|o| o.is_correct).count() {
            1 => {}
            0 => warnings.push(ValidationWarning::question(
                question.id,
                "no option is marked correct",
            )),
            n => warnings.push(ValidationWarning::question(
                question.id,
                format!("{n} options are marked correct, expected exactly one"),
            )),
        }
    }

    warnings
}
