use std::str::SplitWhitespace;

use chrono::Duration;

use crate::error::CommandError;
use crate::models::{MAX_PROBLEMS, Verdict, problem_index};
use crate::services::submission_query::{StatusFilter, SubmissionFilter};

const WILDCARD: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTeam {
        name: String,
    },
    Start {
        duration_minutes: i64,
        problem_count: usize,
    },
    Submit {
        problem: char,
        team: String,
        verdict: Verdict,
        time: i64,
    },
    Flush,
    Freeze,
    Scroll,
    QueryRanking {
        team: String,
    },
    QuerySubmission {
        team: String,
        filter: SubmissionFilter,
    },
    End,
}

fn next_token<'a>(
    tokens: &mut SplitWhitespace<'a>,
    what: &'static str,
) -> Result<&'a str, CommandError> {
    tokens.next().ok_or(CommandError::MissingToken(what))
}

fn expect_keyword(
    tokens: &mut SplitWhitespace<'_>,
    keyword: &'static str,
) -> Result<(), CommandError> {
    let found = next_token(tokens, keyword)?;
    if found != keyword {
        return Err(CommandError::UnexpectedKeyword {
            expected: keyword,
            found: found.to_string(),
        });
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Result<T, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

fn parse_problem(raw: &str) -> Result<char, CommandError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(label), None) if problem_index(label).is_some() => Ok(label),
        _ => Err(CommandError::InvalidProblem(raw.to_string())),
    }
}

/// Parses `KEY=value`, where `value` may be `ALL`.
fn parse_filter_value<'a>(raw: &'a str, key: &str) -> Result<Option<&'a str>, CommandError> {
    let value = raw
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or_else(|| CommandError::MalformedFilter(raw.to_string()))?;
    Ok((value != WILDCARD).then_some(value))
}

/// Filter values are matched as written: an unknown problem or status simply
/// finds nothing, so the team check still runs.
fn parse_submission_filter(
    tokens: &mut SplitWhitespace<'_>,
) -> Result<SubmissionFilter, CommandError> {
    expect_keyword(tokens, "WHERE")?;
    let raw_problem = next_token(tokens, "problem filter")?;
    let problem = match parse_filter_value(raw_problem, "PROBLEM")? {
        Some(value) => Some(
            value
                .chars()
                .next()
                .ok_or_else(|| CommandError::MalformedFilter(raw_problem.to_string()))?,
        ),
        None => None,
    };
    expect_keyword(tokens, "AND")?;
    let raw_status = next_token(tokens, "status filter")?;
    let status = match parse_filter_value(raw_status, "STATUS")? {
        Some("") => return Err(CommandError::MalformedFilter(raw_status.to_string())),
        Some(value) => StatusFilter::parse(value),
        None => StatusFilter::Any,
    };
    Ok(SubmissionFilter { problem, status })
}

fn parse_duration(raw: &str) -> Result<i64, CommandError> {
    let minutes: i64 = parse_number(raw)?;
    if Duration::try_minutes(minutes).is_none() {
        return Err(CommandError::InvalidNumber(raw.to_string()));
    }
    Ok(minutes)
}

fn parse_problem_count(raw: &str) -> Result<usize, CommandError> {
    let count: usize = parse_number(raw)?;
    if count > MAX_PROBLEMS {
        return Err(CommandError::InvalidNumber(raw.to_string()));
    }
    Ok(count)
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut tokens = line.split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Err(CommandError::Empty);
    };

    match keyword {
        "ADDTEAM" => Ok(Command::AddTeam {
            name: next_token(&mut tokens, "team name")?.to_string(),
        }),
        "START" => {
            expect_keyword(&mut tokens, "DURATION")?;
            let duration_minutes = parse_duration(next_token(&mut tokens, "duration")?)?;
            expect_keyword(&mut tokens, "PROBLEM")?;
            let problem_count = parse_problem_count(next_token(&mut tokens, "problem count")?)?;
            Ok(Command::Start {
                duration_minutes,
                problem_count,
            })
        }
        "SUBMIT" => {
            let problem = parse_problem(next_token(&mut tokens, "problem")?)?;
            expect_keyword(&mut tokens, "BY")?;
            let team = next_token(&mut tokens, "team name")?.to_string();
            expect_keyword(&mut tokens, "WITH")?;
            let verdict = next_token(&mut tokens, "verdict")?.parse()?;
            expect_keyword(&mut tokens, "AT")?;
            let time = parse_number(next_token(&mut tokens, "time")?)?;
            Ok(Command::Submit {
                problem,
                team,
                verdict,
                time,
            })
        }
        "FLUSH" => Ok(Command::Flush),
        "FREEZE" => Ok(Command::Freeze),
        "SCROLL" => Ok(Command::Scroll),
        "QUERY_RANKING" => Ok(Command::QueryRanking {
            team: next_token(&mut tokens, "team name")?.to_string(),
        }),
        "QUERY_SUBMISSION" => {
            let team = next_token(&mut tokens, "team name")?.to_string();
            let filter = parse_submission_filter(&mut tokens)?;
            Ok(Command::QuerySubmission { team, filter })
        }
        "END" => Ok(Command::End),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit() {
        assert_eq!(
            parse_command("SUBMIT C BY team_7 WITH Time_Limit_Exceed AT 187"),
            Ok(Command::Submit {
                problem: 'C',
                team: "team_7".to_string(),
                verdict: Verdict::TimeLimitExceed,
                time: 187,
            })
        );
    }

    #[test]
    fn parses_start() {
        assert_eq!(
            parse_command("START DURATION 300 PROBLEM 12"),
            Ok(Command::Start {
                duration_minutes: 300,
                problem_count: 12,
            })
        );
        assert_eq!(
            parse_command("START DURATION x PROBLEM 12"),
            Err(CommandError::InvalidNumber("x".to_string()))
        );
    }

    #[test]
    fn rejects_start_values_out_of_range() {
        assert_eq!(
            parse_command("START DURATION 9223372036854775807 PROBLEM 2"),
            Err(CommandError::InvalidNumber("9223372036854775807".to_string()))
        );
        assert_eq!(
            parse_command("START DURATION 300 PROBLEM 4000000000"),
            Err(CommandError::InvalidNumber("4000000000".to_string()))
        );
        assert_eq!(
            parse_command("START DURATION 300 PROBLEM 26"),
            Ok(Command::Start {
                duration_minutes: 300,
                problem_count: 26,
            })
        );
    }

    #[test]
    fn unknown_filter_values_still_parse() {
        assert_eq!(
            parse_command("QUERY_SUBMISSION ghost WHERE PROBLEM=ALL AND STATUS=Compile_Error"),
            Ok(Command::QuerySubmission {
                team: "ghost".to_string(),
                filter: SubmissionFilter {
                    problem: None,
                    status: StatusFilter::Other("Compile_Error".to_string()),
                },
            })
        );
        assert_eq!(
            parse_command("QUERY_SUBMISSION alpha WHERE PROBLEM= AND STATUS=ALL"),
            Err(CommandError::MalformedFilter("PROBLEM=".to_string()))
        );
    }

    #[test]
    fn parses_submission_query_filters() {
        assert_eq!(
            parse_command("QUERY_SUBMISSION alpha WHERE PROBLEM=ALL AND STATUS=ALL"),
            Ok(Command::QuerySubmission {
                team: "alpha".to_string(),
                filter: SubmissionFilter::default(),
            })
        );
        assert_eq!(
            parse_command("QUERY_SUBMISSION alpha WHERE PROBLEM=B AND STATUS=Accepted"),
            Ok(Command::QuerySubmission {
                team: "alpha".to_string(),
                filter: SubmissionFilter {
                    problem: Some('B'),
                    status: StatusFilter::Verdict(Verdict::Accepted),
                },
            })
        );
        assert_eq!(
            parse_command("QUERY_SUBMISSION alpha WHERE STATUS=ALL AND PROBLEM=ALL"),
            Err(CommandError::MalformedFilter("STATUS=ALL".to_string()))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("LAUNCH"),
            Err(CommandError::UnknownCommand("LAUNCH".to_string()))
        );
        assert_eq!(
            parse_command("SUBMIT A BY alpha WITH Compile_Error AT 3"),
            Err(CommandError::UnknownVerdict("Compile_Error".to_string()))
        );
        assert_eq!(
            parse_command("ADDTEAM"),
            Err(CommandError::MissingToken("team name"))
        );
        assert_eq!(
            parse_command("SUBMIT a BY alpha WITH Accepted AT 3"),
            Err(CommandError::InvalidProblem("a".to_string()))
        );
    }

    #[test]
    fn bare_commands() {
        assert_eq!(parse_command("FLUSH"), Ok(Command::Flush));
        assert_eq!(parse_command("FREEZE"), Ok(Command::Freeze));
        assert_eq!(parse_command("SCROLL"), Ok(Command::Scroll));
        assert_eq!(parse_command("END"), Ok(Command::End));
    }
}
