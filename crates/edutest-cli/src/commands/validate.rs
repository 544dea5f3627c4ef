//! The `edutest validate` command.

use std::path::PathBuf;

use anyhow::Result;

use edutest_core::parser;

pub fn execute(test_path: PathBuf) -> Result<()> {
    let tests = if test_path.is_dir() {
        parser::load_test_directory(&test_path)?
    } else {
        vec![parser::parse_test(&test_path)?]
    };

    let mut total_warnings = 0;

    for test in &tests {
        println!(
            "Test {}: {} ({} questions)",
            test.id,
            test.title,
            test.question_count()
        );

        let warnings = parser::validate_test(test);
        for w in &warnings {
            let prefix = w
                .question_id
                .map(|id| format!("  [question {id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All tests valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
