use tracing::{info, warn};

use crate::error::BoardError;
use crate::services::contest_processor::ContestState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FreezePhase {
    #[default]
    Active,
    Frozen,
}

impl ContestState {
    pub fn is_frozen(&self) -> bool {
        self.phase == FreezePhase::Frozen
    }

    /// Problems are not marked pending here, only on their first submission
    /// after the freeze.
    pub fn freeze(&mut self) -> Result<(), BoardError> {
        if self.is_frozen() {
            warn!("Scoreboard already frozen");
            return Err(BoardError::AlreadyFrozen);
        }

        for team in self.teams.values_mut() {
            team.reset_freeze_shadows();
        }
        self.phase = FreezePhase::Frozen;
        info!("Scoreboard frozen");
        Ok(())
    }

    /// Only reachable as the last step of a scroll.
    pub(crate) fn thaw(&mut self) {
        for team in self.teams.values_mut() {
            team.clear_freeze_marks();
        }
        self.phase = FreezePhase::Active;
        info!("Scoreboard thawed");
    }
}
