//! The `edutest take` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;

use edutest_core::model::{AnswerRecord, Availability, Test};
use edutest_core::parser;
use edutest_core::report::AttemptReport;
use edutest_core::session::{SessionStatus, TestSession, Transition};
use edutest_core::traits::TestGateway;
use edutest_core::SessionController;
use edutest_gateway::config::load_config_from;
use edutest_gateway::create_gateway;

use crate::render::{question_block, result_table, score_line};

const HELP: &str = "\
Commands:
  <n>        select option n of the current question
  next, n    go to the next question
  prev, p    go to the previous question
  goto <n>   jump to question n
  check      grade the attempt (check! grades with unanswered questions)
  reset      clear all answers and start over
  progress   show how many questions are answered
  help       show this help
  quit, q    finish";

pub async fn execute(
    test_id: u64,
    config_path: Option<PathBuf>,
    answers_path: Option<PathBuf>,
    output: Option<PathBuf>,
    ignore_window: bool,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let gateway: Arc<dyn TestGateway> = Arc::from(create_gateway(&config.gateway)?);
    tracing::debug!(gateway = gateway.name(), test_id, "starting attempt");

    let mut controller = SessionController::new(gateway);
    let test = load(&mut controller, test_id).await?;
    check_window(&test, ignore_window)?;

    eprintln!(
        "{} by {} ({} questions)",
        test.title,
        test.author_name,
        test.question_count()
    );

    match answers_path {
        Some(path) => {
            let answers = parser::parse_answers(&path)?;
            apply_answers(&controller, &answers);
            if let Transition::Ignored(reason) = controller.check_answers().await {
                bail!("could not grade attempt: {reason}");
            }
        }
        None => {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            run_interactive(&controller, stdin.lock(), &mut stdout).await?;
        }
    }

    let session = controller.snapshot();
    let Some(result) = session.result() else {
        eprintln!("Attempt not graded, nothing saved.");
        return Ok(());
    };

    println!("{}", score_line(result));
    println!("\n{}", result_table(result));

    let output = output.unwrap_or(config.output_dir);
    let timestamp = Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("attempt-{}-{timestamp}.json", test.id));
    AttemptReport::new(&test, session.answers(), result).save_json(&path)?;
    eprintln!("Attempt saved to: {}", path.display());

    Ok(())
}

/// Load the test and hand back a copy of it, or the recorded load error.
async fn load(controller: &mut SessionController, test_id: u64) -> Result<Test> {
    let status = controller.load_test_and_wait(test_id).await;
    let session = controller.snapshot();
    match session.test() {
        Some(test) if status == SessionStatus::InProgress => Ok(test.clone()),
        _ => bail!(
            "failed to load test {test_id}: {}",
            session.last_error().unwrap_or("no test returned")
        ),
    }
}

fn check_window(test: &Test, ignore_window: bool) -> Result<()> {
    let availability = test.availability(Utc::now());
    if availability == Availability::Open {
        return Ok(());
    }
    if ignore_window {
        tracing::warn!(test_id = test.id, %availability, "starting outside the validity window");
        return Ok(());
    }
    bail!(
        "test {} is {availability} (open from {} to {}); pass --ignore-window to start anyway",
        test.id,
        test.start_time,
        test.end_time
    )
}

fn apply_answers(controller: &SessionController, answers: &AnswerRecord) {
    controller.with_session(|session| {
        for (question, option) in answers.iter() {
            if let Transition::Ignored(reason) = session.select_answer(question, option) {
                tracing::warn!(question, option, "answer skipped: {reason}");
            }
        }
    });
}

/// A parsed line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Select(usize),
    Next,
    Prev,
    GoTo(usize),
    Check { force: bool },
    Reset,
    Progress,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or_default();
        let arg = parts.next();

        let position = |s: Option<&str>| -> Result<usize, String> {
            let s = s.ok_or_else(|| format!("'{head}' needs a number"))?;
            match s.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(format!("'{s}' is not a position (numbers start at 1)")),
            }
        };

        match head {
            "next" | "n" => Ok(Command::Next),
            "prev" | "p" => Ok(Command::Prev),
            "goto" | "g" => position(arg).map(Command::GoTo),
            "check" => Ok(Command::Check { force: false }),
            "check!" => Ok(Command::Check { force: true }),
            "reset" => Ok(Command::Reset),
            "progress" => Ok(Command::Progress),
            "help" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other if other.chars().all(|c| c.is_ascii_digit()) => {
                position(Some(other)).map(Command::Select)
            }
            other => Err(format!("unknown command '{other}', type 'help'")),
        }
    }
}

/// Drive the session from line-oriented input until `quit` or end of input.
///
/// Reads block the runtime thread between commands. Nothing else runs on the
/// runtime while the loop waits: the load has settled and grading is awaited
/// inline.
async fn run_interactive<R: BufRead, W: Write>(
    controller: &SessionController,
    input: R,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{HELP}")?;
    print_current(&controller.snapshot(), out)?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Progress => {
                let session = controller.snapshot();
                writeln!(
                    out,
                    "Answered {}/{} ({:.0}%)",
                    session.answered_count(),
                    session.question_count(),
                    session.progress()
                )?;
            }
            Command::Check { force } => {
                let (ready, unanswered) = controller.with_session(|s| {
                    (
                        s.is_completed() || s.status() == SessionStatus::Completed,
                        s.question_count() - s.answered_count(),
                    )
                });
                if !ready && !force {
                    writeln!(
                        out,
                        "{unanswered} question(s) unanswered. Type 'check!' to grade anyway."
                    )?;
                    continue;
                }
                match controller.check_answers().await {
                    Transition::Applied => {
                        if let Some(result) = controller.snapshot().result() {
                            writeln!(out, "{}\n{}", score_line(result), result_table(result))?;
                        }
                        writeln!(out, "Type 'reset' to retake or 'quit' to finish.")?;
                    }
                    Transition::Ignored(reason) => writeln!(out, "Cannot check: {reason}")?,
                }
            }
            command => {
                let outcome = controller.with_session(|s| navigate(s, &command));
                match outcome {
                    Ok(Transition::Applied) => print_current(&controller.snapshot(), out)?,
                    Ok(Transition::Ignored(reason)) => writeln!(out, "Ignored: {reason}")?,
                    Err(message) => writeln!(out, "{message}")?,
                }
            }
        }
    }

    Ok(())
}

/// Apply a selection or navigation command. Positions are 1-based.
fn navigate(session: &mut TestSession, command: &Command) -> Result<Transition, String> {
    match command {
        Command::Select(n) => {
            let Some(question) = session.current_question() else {
                return Err("no question to answer".to_string());
            };
            let Some(option) = question.options.get(n - 1) else {
                return Err(format!("question has no option {n}"));
            };
            let (question_id, option_id) = (question.id, option.id);
            Ok(session.select_answer(question_id, option_id))
        }
        Command::Next => Ok(session.next_question()),
        Command::Prev => Ok(session.previous_question()),
        Command::GoTo(n) => Ok(session.go_to_question(n - 1)),
        Command::Reset => Ok(session.reset()),
        other => Err(format!("'{other:?}' is not a navigation command")),
    }
}

fn print_current<W: Write>(session: &TestSession, out: &mut W) -> Result<()> {
    if let (Some(test), Some(question)) = (session.test(), session.current_question()) {
        let selected = session.selected_option(question.id);
        write!(
            out,
            "{}",
            question_block(test, session.current_index(), question, selected)
        )?;
    }
    Ok(())
}
