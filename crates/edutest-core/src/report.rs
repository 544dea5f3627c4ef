//! Attempt report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerRecord, Test, TestId};
use crate::scoring::ScoringResult;

/// A graded attempt, as exported by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the attempt was graded.
    pub created_at: DateTime<Utc>,
    /// Summary of the test.
    pub test: TestSummary,
    /// The answers that were graded.
    pub answers: AnswerRecord,
    /// The grading outcome.
    pub result: ScoringResult,
}

/// Summary of a test (without the question definitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub id: TestId,
    pub title: String,
    pub author_name: String,
    pub question_count: usize,
}

impl From<&Test> for TestSummary {
    fn from(test: &Test) -> Self {
        Self {
            id: test.id,
            title: test.title.clone(),
            author_name: test.author_name.clone(),
            question_count: test.questions.len(),
        }
    }
}

impl AttemptReport {
    pub fn new(test: &Test, answers: &AnswerRecord, result: &ScoringResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            test: TestSummary::from(test),
            answers: answers.clone(),
            result: result.clone(),
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        to_markdown(&self.test, &self.result)
    }
}

/// Render a result as a markdown summary plus per-question table.
pub fn to_markdown(test: &TestSummary, result: &ScoringResult) -> String {
    let mut md = String::new();

    md.push_str(&format!("## {} (test {})\n\n", test.title, test.id));
    md.push_str(&format!(
        "**Score:** {:.1}% ({}/{} correct)\n\n",
        result.score, result.correct_answers, result.total_questions
    ));

    if !result.details.is_empty() {
        md.push_str("| Question | Selected | Correct | Result |\n");
        md.push_str("|----------|----------|---------|--------|\n");
        for d in &result.details {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                d.question_id,
                display_id(d.selected_option_id),
                display_id(d.correct_option_id),
                d.verdict()
            ));
        }
    }

    md
}

/// Render an optional id, `-` when absent.
pub fn display_id(id: Option<u64>) -> String {
    id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;
    use crate::scoring::score;

    fn make_report() -> AttemptReport {
        let test = two_question_test();
        let answers: AnswerRecord = [(1, 10)].into_iter().collect();
        let result = score(&test, &answers);
        AttemptReport::new(&test, &answers, &result)
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("attempt.json");

        report.save_json(&path).unwrap();
        let loaded = AttemptReport::load_json(&path).unwrap();

        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.test.question_count, 2);
        assert_eq!(loaded.result, report.result);
    }

    #[test]
    fn markdown_output() {
        let md = make_report().to_markdown();
        assert!(md.contains("Sample test"));
        assert!(md.contains("**Score:** 50.0% (1/2 correct)"));
        assert!(md.contains("| 1 | 10 | 10 | correct |"));
        assert!(md.contains("| 2 | - | 21 | unanswered |"));
    }
}
