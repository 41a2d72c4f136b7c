use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::models::{BoardLine, Reveal, RevealEvent, ScoreboardSnapshot, ScrollReport};
use crate::services::contest_processor::ContestState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollPhase {
    #[default]
    PreScrollFlush,
    RevealStep,
    FinalBoard,
    Finished,
}

/// Drives one scroll pass over a frozen contest.
pub struct ScrollFlow<'a> {
    state: &'a mut ContestState,
    phase: ScrollPhase,
    /// Working order, only recomputed after a revealed acceptance.
    order: Vec<String>,
    report: ScrollReport,
}

impl<'a> ScrollFlow<'a> {
    pub fn begin(state: &'a mut ContestState) -> Result<Self, BoardError> {
        if !state.is_frozen() {
            warn!("Scroll requested while scoreboard is not frozen");
            return Err(BoardError::NotFrozen);
        }

        Ok(Self {
            state,
            phase: ScrollPhase::default(),
            order: Vec::new(),
            report: ScrollReport::default(),
        })
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn report(&self) -> &ScrollReport {
        &self.report
    }

    /// Runs one step. Returns `false` once the pass has finished.
    pub fn advance(&mut self) -> bool {
        let current_phase = std::mem::replace(&mut self.phase, ScrollPhase::Finished);
        self.phase = match current_phase {
            ScrollPhase::PreScrollFlush => {
                let order = self.state.recompute_snapshot().order.clone();
                self.report.before = board_lines(self.state, &order);
                self.order = order;
                debug!("Scroll phase: PreScrollFlush -> RevealStep");
                ScrollPhase::RevealStep
            }
            ScrollPhase::RevealStep => {
                if self.reveal_next() {
                    ScrollPhase::RevealStep
                } else {
                    debug!("Scroll phase: RevealStep -> FinalBoard");
                    ScrollPhase::FinalBoard
                }
            }
            ScrollPhase::FinalBoard => {
                let order = ScoreboardSnapshot::from_teams(self.state.teams.values()).order;
                self.report.after = board_lines(self.state, &order);
                self.order = order;
                self.state.thaw();
                debug!("Scroll phase: FinalBoard -> Finished");
                ScrollPhase::Finished
            }
            ScrollPhase::Finished => ScrollPhase::Finished,
        };

        self.phase != ScrollPhase::Finished
    }

    pub fn finish(mut self) -> ScrollReport {
        while self.advance() {}
        self.report
    }

    /// Reveals the lowest pending problem of the worst ranked team that still
    /// has one. Returns `false` when nothing is left to reveal.
    fn reveal_next(&mut self) -> bool {
        let Some(position) = self.order.iter().rposition(|name| {
            self.state
                .teams
                .get(name)
                .is_some_and(|team| team.has_pending())
        }) else {
            info!(
                "No more team to reveal, {} rank changes",
                self.report.reveals.len()
            );
            return false;
        };

        let team_name = self.order[position].clone();
        let penalty_per_wrong = self.state.penalty_per_wrong;
        let Some(team) = self.state.teams.get_mut(&team_name) else {
            return false;
        };
        let Some(problem) = team.first_pending_problem() else {
            return false;
        };

        let reveal = team.reveal_problem(problem, penalty_per_wrong);
        debug!(
            "Revealed problem {} of {} at rank {}: {:?}",
            problem,
            team_name,
            position + 1,
            reveal
        );

        if let Reveal::Accepted { .. } = reveal {
            let new_order = ScoreboardSnapshot::from_teams(self.state.teams.values()).order;
            if let Some(new_position) = new_order.iter().position(|name| *name == team_name)
                && new_position < position
                && let Some(team) = self.state.teams.get(&team_name)
            {
                let event = RevealEvent {
                    team: team_name.clone(),
                    overtaken: self.order[new_position].clone(),
                    solved: team.solved_count,
                    penalty: team.penalty,
                };
                info!(
                    "{} moves from rank {} to {} passing {}",
                    team_name,
                    position + 1,
                    new_position + 1,
                    event.overtaken
                );
                self.report.reveals.push(event);
            }
            self.order = new_order;
        }

        true
    }
}

fn board_lines(state: &ContestState, order: &[String]) -> Vec<BoardLine> {
    order
        .iter()
        .filter_map(|name| state.team(name))
        .enumerate()
        .map(|(position, team)| team.board_line(position + 1))
        .collect()
}

impl ContestState {
    /// Flushes, reveals every frozen problem and lifts the freeze.
    pub fn scroll(&mut self) -> Result<ScrollReport, BoardError> {
        info!("Scrolling scoreboard");
        Ok(ScrollFlow::begin(self)?.finish())
    }
}
