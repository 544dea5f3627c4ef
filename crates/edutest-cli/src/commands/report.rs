//! The `edutest report` command.

use std::path::PathBuf;

use anyhow::Result;

use edutest_core::report::AttemptReport;

use crate::render::{print_result, Format};

pub fn execute(path: PathBuf, format: String) -> Result<()> {
    let format = Format::parse(&format)?;
    let report = AttemptReport::load_json(&path)?;

    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if format == Format::Text {
        println!(
            "Attempt {} graded {}",
            report.id,
            report.created_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    print_result(&report.test, &report.result, format)
}
