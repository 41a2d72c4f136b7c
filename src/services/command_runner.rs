use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{BoardError, CommandError};
use crate::models::{ScrollReport, SubmissionRecord};
use crate::services::command_parser::{Command, parse_command};
use crate::services::config_loader::OutputFormat;
use crate::services::contest_processor::ContestState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AddTeam,
    Start,
    Freeze,
    Scroll,
    QueryRanking,
    QuerySubmission,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::AddTeam => "Add",
            Operation::Start => "Start",
            Operation::Freeze => "Freeze",
            Operation::Scroll => "Scroll",
            Operation::QueryRanking => "Query ranking",
            Operation::QuerySubmission => "Query submission",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    TeamAdded,
    ContestStarted,
    Submitted,
    Flushed,
    Frozen,
    Scrolled {
        report: ScrollReport,
    },
    Ranking {
        team: String,
        rank: usize,
        frozen: bool,
    },
    LastSubmission {
        team: String,
        submission: Option<SubmissionRecord>,
    },
    Ended,
    Failed {
        operation: Operation,
        error: BoardError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub commands: u64,
    pub malformed: u64,
}

fn failed(operation: Operation) -> impl FnOnce(BoardError) -> Response {
    move |error| Response::Failed { operation, error }
}

pub fn execute(state: &mut ContestState, command: Command) -> Response {
    match command {
        Command::AddTeam { name } => state
            .register_team(&name)
            .map_or_else(failed(Operation::AddTeam), |()| Response::TeamAdded),
        Command::Start {
            duration_minutes,
            problem_count,
        } => state
            .start_contest(duration_minutes, problem_count)
            .map_or_else(failed(Operation::Start), |()| Response::ContestStarted),
        Command::Submit {
            problem,
            team,
            verdict,
            time,
        } => {
            state.submit(problem, &team, verdict, time);
            Response::Submitted
        }
        Command::Flush => {
            state.flush();
            Response::Flushed
        }
        Command::Freeze => state
            .freeze()
            .map_or_else(failed(Operation::Freeze), |()| Response::Frozen),
        Command::Scroll => state
            .scroll()
            .map_or_else(failed(Operation::Scroll), |report| Response::Scrolled {
                report,
            }),
        Command::QueryRanking { team } => match state.query_ranking(&team) {
            Ok(answer) => Response::Ranking {
                team,
                rank: answer.rank,
                frozen: answer.frozen,
            },
            Err(error) => failed(Operation::QueryRanking)(error),
        },
        Command::QuerySubmission { team, filter } => {
            match state.query_last_submission(&team, &filter) {
                Ok(submission) => Response::LastSubmission { team, submission },
                Err(error) => failed(Operation::QuerySubmission)(error),
            }
        }
        Command::End => Response::Ended,
    }
}

/// Renders a response in the line protocol. Submissions print nothing.
pub fn render_text(response: &Response) -> Vec<String> {
    match response {
        Response::TeamAdded => vec!["[Info]Add successfully.".to_string()],
        Response::ContestStarted => vec!["[Info]Competition starts.".to_string()],
        Response::Submitted => Vec::new(),
        Response::Flushed => vec!["[Info]Flush scoreboard.".to_string()],
        Response::Frozen => vec!["[Info]Freeze scoreboard.".to_string()],
        Response::Scrolled { report } => {
            let mut lines = Vec::with_capacity(1 + report.before.len() * 2 + report.reveals.len());
            lines.push("[Info]Scroll scoreboard.".to_string());
            lines.extend(report.before.iter().map(ToString::to_string));
            lines.extend(report.reveals.iter().map(ToString::to_string));
            lines.extend(report.after.iter().map(ToString::to_string));
            lines
        }
        Response::Ranking { team, rank, frozen } => {
            let mut lines = vec!["[Info]Complete query ranking.".to_string()];
            if *frozen {
                lines.push(
                    "[Warning]Scoreboard is frozen. The ranking may be inaccurate until it were scrolled."
                        .to_string(),
                );
            }
            lines.push(format!("{team} NOW AT RANKING {rank}"));
            lines
        }
        Response::LastSubmission { team, submission } => {
            let found = match submission {
                Some(record) => format!(
                    "{} {} {} {}",
                    team, record.problem, record.verdict, record.time
                ),
                None => "Cannot find any submission.".to_string(),
            };
            vec!["[Info]Complete query submission.".to_string(), found]
        }
        Response::Ended => vec!["[Info]Competition ends.".to_string()],
        Response::Failed { operation, error } => {
            vec![format!("[Error]{} failed: {}.", operation.label(), error)]
        }
    }
}

fn write_response<W: Write>(
    writer: &mut W,
    response: &Response,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for line in render_text(response) {
                writeln!(writer, "{line}")?;
            }
        }
        OutputFormat::Json => {
            if !matches!(response, Response::Submitted) {
                let encoded =
                    serde_json::to_string(response).context("Failed to encode response")?;
                writeln!(writer, "{encoded}")?;
            }
        }
    }
    Ok(())
}

/// Executes every command read from `reader` until `END` or end of input.
/// Malformed lines are logged and skipped.
pub fn run_commands<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    state: &mut ContestState,
    format: OutputFormat,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();

    for line_result in reader.lines() {
        let line = line_result.context("Failed to read command line")?;
        summary.lines_read += 1;

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(err) => {
                warn!("Line {}: {} | {}", summary.lines_read, err, line.trim());
                summary.malformed += 1;
                continue;
            }
        };

        let is_end = matches!(command, Command::End);
        let response = execute(state, command);
        summary.commands += 1;
        write_response(writer, &response, format)
            .with_context(|| format!("Failed to write response for line {}", summary.lines_read))?;

        if is_end {
            info!("Competition ended on line {}", summary.lines_read);
            break;
        }
    }

    writer.flush().context("Failed to flush output")?;
    Ok(summary)
}
