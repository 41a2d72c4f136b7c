//! Contest scoreboard engine with freeze and scroll (resolver) support.

pub mod error;
pub mod models;
pub mod services;

pub use error::{BoardError, CommandError};
pub use services::contest_processor::ContestState;
