use std::collections::BTreeMap;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::models::{
    Contest, MAX_PROBLEMS, ScoreboardSnapshot, SubmissionRecord, SubmissionRoute, TeamAggregate,
    Verdict,
};
use crate::services::freeze_control::FreezePhase;
use crate::services::submission_query::{self, SubmissionFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingAnswer {
    /// 1-based.
    pub rank: usize,
    /// The answer comes from a board that hides frozen outcomes.
    pub frozen: bool,
}

#[derive(Debug)]
pub struct ContestState {
    pub contest: Option<Contest>,
    pub penalty_per_wrong: i64,
    pub(crate) phase: FreezePhase,
    /// Ordered by name, which is also the ranking before the first flush.
    pub(crate) teams: BTreeMap<String, TeamAggregate>,
    pub(crate) last_snapshot: Option<ScoreboardSnapshot>,
}

impl Default for ContestState {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ContestState {
    pub fn new(penalty_per_wrong: i64) -> Self {
        ContestState {
            contest: None,
            penalty_per_wrong,
            phase: FreezePhase::Active,
            teams: BTreeMap::new(),
            last_snapshot: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.contest.is_some()
    }

    pub fn team(&self, name: &str) -> Option<&TeamAggregate> {
        self.teams.get(name)
    }

    pub fn teams(&self) -> impl Iterator<Item = &TeamAggregate> {
        self.teams.values()
    }

    pub fn last_snapshot(&self) -> Option<&ScoreboardSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn register_team(&mut self, name: &str) -> Result<(), BoardError> {
        if self.is_started() {
            warn!("Rejecting team {} after contest start", name);
            return Err(BoardError::AlreadyStarted);
        }
        if self.teams.contains_key(name) {
            warn!("Rejecting duplicated team {}", name);
            return Err(BoardError::DuplicateName);
        }

        self.teams
            .insert(name.to_string(), TeamAggregate::new(name.to_string()));
        info!("Added new team {}", name);
        Ok(())
    }

    /// Out-of-range values are clamped: the contest length to the longest
    /// representable duration and the problem count to `A`..`Z`.
    pub fn start_contest(
        &mut self,
        duration_minutes: i64,
        problem_count: usize,
    ) -> Result<(), BoardError> {
        if self.is_started() {
            warn!("Contest already started");
            return Err(BoardError::AlreadyStarted);
        }

        let duration = Duration::try_minutes(duration_minutes).unwrap_or_else(|| {
            warn!("Contest length of {} minutes is out of range", duration_minutes);
            if duration_minutes < 0 {
                Duration::MIN
            } else {
                Duration::MAX
            }
        });
        if problem_count > MAX_PROBLEMS {
            warn!(
                "Problem count {} exceeds {}, clamping",
                problem_count, MAX_PROBLEMS
            );
        }
        let problem_count = problem_count.min(MAX_PROBLEMS);

        for team in self.teams.values_mut() {
            team.allocate_problems(problem_count);
        }
        self.contest = Some(Contest {
            duration,
            problem_count,
        });
        info!(
            "Contest started: {} minutes, {} problems, {} teams",
            duration_minutes,
            problem_count,
            self.teams.len()
        );
        Ok(())
    }

    /// Unknown teams are tolerated and only logged.
    pub fn submit(
        &mut self,
        problem: char,
        team_name: &str,
        verdict: Verdict,
        time: i64,
    ) -> Option<SubmissionRoute> {
        if let Some(contest) = &self.contest
            && time > contest.duration.num_minutes()
        {
            warn!(
                "Submission by {} at {} is past the contest length of {} minutes",
                team_name,
                time,
                contest.duration.num_minutes()
            );
        }

        let freeze_active = self.is_frozen();
        let penalty_per_wrong = self.penalty_per_wrong;
        let Some(team) = self.teams.get_mut(team_name) else {
            warn!("Ignoring submission from unknown team {}", team_name);
            return None;
        };

        let route = team.record_submission(
            SubmissionRecord {
                problem,
                verdict,
                time,
            },
            freeze_active,
            penalty_per_wrong,
        );
        match route {
            SubmissionRoute::OutOfRange => {
                warn!(
                    "Problem {} out of range, submission by {} kept for queries only",
                    problem, team_name
                );
            }
            route => debug!(
                "Submission {} {} {} {} routed {:?}",
                team_name, problem, verdict, time, route
            ),
        }
        Some(route)
    }

    pub(crate) fn recompute_snapshot(&mut self) -> &ScoreboardSnapshot {
        let snapshot = ScoreboardSnapshot::from_teams(self.teams.values());
        for (rank, name) in snapshot.order.iter().enumerate() {
            if let Some(team) = self.teams.get(name) {
                debug!(
                    "Rank {:0>3} Solved {} Penalty {} TeamName: {}",
                    rank + 1,
                    team.solved_count,
                    team.penalty,
                    name
                );
            }
        }
        self.last_snapshot.insert(snapshot)
    }

    pub fn flush(&mut self) -> &ScoreboardSnapshot {
        info!("Flushing scoreboard");
        self.recompute_snapshot()
    }

    pub fn query_ranking(&self, team_name: &str) -> Result<RankingAnswer, BoardError> {
        if !self.teams.contains_key(team_name) {
            return Err(BoardError::UnknownTeam);
        }

        let rank = match &self.last_snapshot {
            Some(snapshot) if !snapshot.is_empty() => snapshot
                .position(team_name)
                .map_or(snapshot.len(), |position| position + 1),
            _ => {
                self.teams
                    .keys()
                    .position(|name| name == team_name)
                    .unwrap_or_default()
                    + 1
            }
        };

        Ok(RankingAnswer {
            rank,
            frozen: self.is_frozen(),
        })
    }

    pub fn query_last_submission(
        &self,
        team_name: &str,
        filter: &SubmissionFilter,
    ) -> Result<Option<SubmissionRecord>, BoardError> {
        let team = self.teams.get(team_name).ok_or(BoardError::UnknownTeam)?;
        Ok(submission_query::find_last(&team.submissions, filter).copied())
    }
}
