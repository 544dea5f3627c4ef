//! Console rendering shared by the commands.

use anyhow::{bail, Result};
use comfy_table::{Cell, Table};

use edutest_core::model::{Question, Test};
use edutest_core::report::{display_id, to_markdown, TestSummary};
use edutest_core::scoring::ScoringResult;

/// Output formats accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
    Markdown,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "markdown" | "md" => Ok(Format::Markdown),
            other => bail!("unknown format '{other}' (expected text, json or markdown)"),
        }
    }
}

/// Per-question outcome table.
pub fn result_table(result: &ScoringResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Selected", "Correct", "Result"]);

    for d in &result.details {
        table.add_row(vec![
            Cell::new(d.question_id),
            Cell::new(display_id(d.selected_option_id)),
            Cell::new(display_id(d.correct_option_id)),
            Cell::new(d.verdict()),
        ]);
    }

    table
}

pub fn score_line(result: &ScoringResult) -> String {
    format!(
        "Score: {:.1}% ({}/{} correct)",
        result.score, result.correct_answers, result.total_questions
    )
}

/// Print a graded result in the requested format.
pub fn print_result(test: &TestSummary, result: &ScoringResult, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(result)?),
        Format::Markdown => println!("{}", to_markdown(test, result)),
        Format::Text => {
            println!("{} (test {})", test.title, test.id);
            println!("{}", score_line(result));
            if !result.details.is_empty() {
                println!("\n{}", result_table(result));
            }
        }
    }
    Ok(())
}

/// Render a question with its options, marking the selected one.
pub fn question_block(test: &Test, index: usize, question: &Question, selected: Option<u64>) -> String {
    let mut out = format!(
        "\nQuestion {}/{}: {}\n",
        index + 1,
        test.question_count(),
        question.text
    );
    for (n, option) in question.options.iter().enumerate() {
        let mark = if selected == Some(option.id) { "x" } else { " " };
        out.push_str(&format!("  [{mark}] {}) {}\n", n + 1, option.text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutest_core::scoring::QuestionResult;

    fn sample_result() -> ScoringResult {
        ScoringResult {
            total_questions: 3,
            correct_answers: 1,
            score: 100.0 / 3.0,
            details: vec![
                QuestionResult {
                    question_id: 1,
                    is_correct: true,
                    correct_option_id: Some(10),
                    selected_option_id: Some(10),
                },
                QuestionResult {
                    question_id: 2,
                    is_correct: false,
                    correct_option_id: Some(21),
                    selected_option_id: Some(20),
                },
                QuestionResult {
                    question_id: 3,
                    is_correct: false,
                    correct_option_id: None,
                    selected_option_id: None,
                },
            ],
        }
    }

    #[test]
    fn parse_formats() {
        assert_eq!(Format::parse("text").unwrap(), Format::Text);
        assert_eq!(Format::parse("md").unwrap(), Format::Markdown);
        assert!(Format::parse("html").is_err());
    }

    #[test]
    fn table_marks_each_outcome() {
        let rendered = result_table(&sample_result()).to_string();
        assert!(rendered.contains("correct"));
        assert!(rendered.contains("incorrect"));
        assert!(rendered.contains("unanswered"));
    }

    #[test]
    fn score_line_rounds_to_one_decimal() {
        assert_eq!(score_line(&sample_result()), "Score: 33.3% (1/3 correct)");
    }
}
