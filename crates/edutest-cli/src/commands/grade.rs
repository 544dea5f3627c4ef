//! The `edutest grade` command.

use std::path::PathBuf;

use anyhow::Result;

use edutest_core::parser;
use edutest_core::report::TestSummary;
use edutest_core::scoring::{score, score_with_key};

use crate::render::{print_result, Format};

pub fn execute(
    test_path: PathBuf,
    answers_path: PathBuf,
    key_path: Option<PathBuf>,
    format: String,
) -> Result<()> {
    let format = Format::parse(&format)?;
    let test = parser::parse_test(&test_path)?;
    let answers = parser::parse_answers(&answers_path)?;

    for (question, option) in answers.iter() {
        match test.question(question) {
            None => tracing::warn!(question, "answer for a question not in the test, ignored"),
            Some(q) if !q.has_option(option) => {
                tracing::warn!(question, option, "answer names an unknown option")
            }
            Some(_) => {}
        }
    }

    let result = match key_path {
        Some(path) => score_with_key(&test, &answers, &parser::parse_answer_key(&path)?),
        None => score(&test, &answers),
    };

    print_result(&TestSummary::from(&test), &result, format)
}
