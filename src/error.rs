use serde::Serialize;
use thiserror::Error;

/// Categorical failures of engine operations. A failed operation leaves the
/// contest state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardError {
    #[error("competition has started")]
    AlreadyStarted,
    #[error("duplicated team name")]
    DuplicateName,
    #[error("scoreboard has been frozen")]
    AlreadyFrozen,
    #[error("scoreboard has not been frozen")]
    NotFrozen,
    #[error("cannot find the team")]
    UnknownTeam,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty line")]
    Empty,
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("missing {0}")]
    MissingToken(&'static str),
    #[error("expected keyword {expected}, found {found}")]
    UnexpectedKeyword { expected: &'static str, found: String },
    #[error("invalid number {0}")]
    InvalidNumber(String),
    #[error("invalid problem id {0}")]
    InvalidProblem(String),
    #[error("unknown verdict {0}")]
    UnknownVerdict(String),
    #[error("malformed filter {0}")]
    MalformedFilter(String),
}
