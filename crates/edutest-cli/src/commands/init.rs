//! The `edutest init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("edutest.toml").exists() {
        println!("edutest.toml already exists, skipping.");
    } else {
        std::fs::write("edutest.toml", SAMPLE_CONFIG)?;
        println!("Created edutest.toml");
    }

    std::fs::create_dir_all("quizzes")?;
    let example_path = std::path::Path::new("quizzes/example.json");
    if example_path.exists() {
        println!("quizzes/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_TEST)?;
        println!("Created quizzes/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit edutest.toml to point at your portal, or keep the local quiz directory");
    println!("  2. Run: edutest validate --test quizzes/example.json");
    println!("  3. Run: edutest take --test-id 1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# edutest configuration

# Where graded attempt reports are written.
output_dir = "./edutest-results"

# Load tests from local JSON files.
[gateway]
type = "directory"
path = "./quizzes"

# Or load them from the portal API:
#
# [gateway]
# type = "http"
# base_url = "https://portal.example.edu/api"
# access_token = "${EDUTEST_TOKEN}"
# refresh_token = "${EDUTEST_REFRESH_TOKEN}"
# timeout_secs = 30
"#;

const EXAMPLE_TEST: &str = r#"{
  "id": 1,
  "authorId": 1,
  "authorName": "Example Teacher",
  "subjectId": 1,
  "groupIds": [1],
  "title": "Example quiz",
  "startTime": "2026-01-01T00:00:00Z",
  "endTime": "2030-12-31T23:59:59Z",
  "createdAt": "2026-01-01T00:00:00Z",
  "questions": [
    {
      "id": 1,
      "text": "What is the capital of France?",
      "options": [
        { "id": 10, "text": "Paris", "isCorrect": true },
        { "id": 11, "text": "Lyon", "isCorrect": false },
        { "id": 12, "text": "Marseille", "isCorrect": false }
      ]
    },
    {
      "id": 2,
      "text": "What is 2 + 2?",
      "options": [
        { "id": 20, "text": "3", "isCorrect": false },
        { "id": 21, "text": "4", "isCorrect": true },
        { "id": 22, "text": "5", "isCorrect": false }
      ]
    }
  ]
}
"#;
