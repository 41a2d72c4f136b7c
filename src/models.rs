use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong_Answer")]
    WrongAnswer,
    #[serde(rename = "Runtime_Error")]
    RuntimeError,
    #[serde(rename = "Time_Limit_Exceed")]
    TimeLimitExceed,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong_Answer",
            Verdict::RuntimeError => "Runtime_Error",
            Verdict::TimeLimitExceed => "Time_Limit_Exceed",
        }
    }

    /// Every rejection reason counts as one wrong attempt.
    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl FromStr for Verdict {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accepted" => Ok(Verdict::Accepted),
            "Wrong_Answer" => Ok(Verdict::WrongAnswer),
            "Runtime_Error" => Ok(Verdict::RuntimeError),
            "Time_Limit_Exceed" => Ok(Verdict::TimeLimitExceed),
            other => Err(CommandError::UnknownVerdict(other.to_string())),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problems are labelled `A` to `Z`.
pub const MAX_PROBLEMS: usize = 26;

/// Maps a problem letter (`A`, `B`, ...) to its 0-based index.
pub fn problem_index(label: char) -> Option<usize> {
    label
        .is_ascii_uppercase()
        .then(|| usize::from(label as u8 - b'A'))
}

#[derive(Debug, Clone)]
pub struct Contest {
    pub duration: Duration,
    pub problem_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub problem: char,
    pub verdict: Verdict,
    pub time: i64,
}

/// Reveal status of a single problem. A problem only becomes `PendingReveal`
/// on its first submission after the freeze.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FreezeMark {
    #[default]
    Clean,
    PendingReveal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProblemOutcome {
    /// Live wrong attempts. Frozen attempts only land here when revealed.
    pub wrong_attempts: u32,
    pub solved: bool,
    pub solve_time: i64,
    pub mark: FreezeMark,
    /// Wrong attempts visible at the moment the problem went pending.
    pub frozen_baseline: u32,
    /// Wrong attempts during the freeze, counted until the first frozen accept.
    pub frozen_wrong: u32,
    pub frozen_accept_time: Option<i64>,
    pub submissions_during_freeze: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Accepted { time: i64 },
    WrongOnly,
    Nothing,
}

impl ProblemOutcome {
    pub fn is_pending(&self) -> bool {
        self.mark == FreezeMark::PendingReveal && !self.solved
    }

    pub fn reset_freeze_shadow(&mut self) {
        self.frozen_baseline = self.wrong_attempts;
        self.submissions_during_freeze = 0;
        self.frozen_wrong = 0;
        self.frozen_accept_time = None;
    }

    fn record_frozen(&mut self, verdict: Verdict, time: i64) {
        if self.mark == FreezeMark::Clean {
            self.mark = FreezeMark::PendingReveal;
            self.reset_freeze_shadow();
        }
        self.submissions_during_freeze += 1;

        if self.frozen_accept_time.is_some() {
            return;
        }
        if verdict.is_accepted() {
            self.frozen_accept_time = Some(time);
        } else {
            self.frozen_wrong += 1;
        }
    }

    /// Folds the frozen attempts into the live count and clears the pending mark.
    /// The caller is responsible for applying an accepted outcome.
    fn reveal(&mut self) -> Reveal {
        if !self.is_pending() {
            return Reveal::Nothing;
        }

        self.wrong_attempts += self.frozen_wrong;
        self.frozen_wrong = 0;
        self.mark = FreezeMark::Clean;
        self.submissions_during_freeze = 0;

        match self.frozen_accept_time.take() {
            Some(time) => Reveal::Accepted { time },
            None => Reveal::WrongOnly,
        }
    }

    pub fn cell(&self) -> ProblemCell {
        if self.is_pending() {
            ProblemCell::Frozen {
                wrong: self.frozen_baseline,
                submissions: self.submissions_during_freeze,
            }
        } else if self.solved {
            ProblemCell::Solved {
                wrong: self.wrong_attempts,
            }
        } else {
            ProblemCell::Unsolved {
                wrong: self.wrong_attempts,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProblemCell {
    Unsolved { wrong: u32 },
    Solved { wrong: u32 },
    Frozen { wrong: u32, submissions: u32 },
}

impl fmt::Display for ProblemCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProblemCell::Unsolved { wrong: 0 } => f.write_str("."),
            ProblemCell::Unsolved { wrong } => write!(f, "-{wrong}"),
            ProblemCell::Solved { wrong: 0 } => f.write_str("+"),
            ProblemCell::Solved { wrong } => write!(f, "+{wrong}"),
            ProblemCell::Frozen {
                wrong: 0,
                submissions,
            } => write!(f, "0/{submissions}"),
            ProblemCell::Frozen { wrong, submissions } => write!(f, "-{wrong}/{submissions}"),
        }
    }
}

/// Where a submission ended up after routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionRoute {
    OutOfRange,
    AlreadySolved,
    Frozen,
    Live,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamAggregate {
    pub name: String,
    pub outcomes: Vec<ProblemOutcome>,
    pub solved_count: u32,
    pub penalty: i64,
    /// Kept sorted in descending order.
    pub solve_times: Vec<i64>,
    pub submissions: Vec<SubmissionRecord>,
}

impl TeamAggregate {
    pub fn new(name: String) -> Self {
        Self {
            name,
            outcomes: Vec::new(),
            solved_count: 0,
            penalty: 0,
            solve_times: Vec::new(),
            submissions: Vec::new(),
        }
    }

    pub fn allocate_problems(&mut self, problem_count: usize) {
        self.outcomes = vec![ProblemOutcome::default(); problem_count];
    }

    pub fn record_submission(
        &mut self,
        record: SubmissionRecord,
        freeze_active: bool,
        penalty_per_wrong: i64,
    ) -> SubmissionRoute {
        self.submissions.push(record);

        let Some(index) = problem_index(record.problem).filter(|&i| i < self.outcomes.len())
        else {
            return SubmissionRoute::OutOfRange;
        };

        let outcome = &mut self.outcomes[index];
        if outcome.solved {
            return SubmissionRoute::AlreadySolved;
        }

        if freeze_active {
            outcome.record_frozen(record.verdict, record.time);
            return SubmissionRoute::Frozen;
        }

        if record.verdict.is_accepted() {
            self.apply_accepted(index, record.time, penalty_per_wrong);
        } else {
            outcome.wrong_attempts += 1;
        }
        SubmissionRoute::Live
    }

    /// The only place live score grows. A solved problem is never touched again.
    pub fn apply_accepted(&mut self, index: usize, time: i64, penalty_per_wrong: i64) {
        let Some(outcome) = self.outcomes.get_mut(index) else {
            return;
        };
        if outcome.solved {
            return;
        }

        outcome.solved = true;
        outcome.solve_time = time;
        self.solved_count += 1;
        self.penalty += penalty_per_wrong * i64::from(outcome.wrong_attempts) + time;

        let position = self.solve_times.partition_point(|&t| t > time);
        self.solve_times.insert(position, time);
    }

    pub fn reset_freeze_shadows(&mut self) {
        self.outcomes
            .iter_mut()
            .for_each(ProblemOutcome::reset_freeze_shadow);
    }

    pub fn has_pending(&self) -> bool {
        self.outcomes.iter().any(ProblemOutcome::is_pending)
    }

    pub fn first_pending_problem(&self) -> Option<usize> {
        self.outcomes.iter().position(ProblemOutcome::is_pending)
    }

    pub fn reveal_problem(&mut self, index: usize, penalty_per_wrong: i64) -> Reveal {
        let Some(outcome) = self.outcomes.get_mut(index) else {
            return Reveal::Nothing;
        };
        let reveal = outcome.reveal();
        if let Reveal::Accepted { time } = reveal {
            self.apply_accepted(index, time, penalty_per_wrong);
        }
        reveal
    }

    pub fn clear_freeze_marks(&mut self) {
        for outcome in &mut self.outcomes {
            outcome.mark = FreezeMark::Clean;
            outcome.submissions_during_freeze = 0;
        }
    }

    pub fn board_line(&self, rank: usize) -> BoardLine {
        BoardLine {
            team: self.name.clone(),
            rank,
            solved: self.solved_count,
            penalty: self.penalty,
            cells: self.outcomes.iter().map(ProblemOutcome::cell).collect(),
        }
    }
}

impl PartialEq for TeamAggregate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TeamAggregate {}

impl PartialOrd for TeamAggregate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TeamAggregate {
    fn cmp(&self, other: &Self) -> Ordering {
        // More solved problems first
        if self.solved_count != other.solved_count {
            return other.solved_count.cmp(&self.solved_count);
        }
        // Lower penalty first
        if self.penalty != other.penalty {
            return self.penalty.cmp(&other.penalty);
        }
        // Earlier latest solve first, then next latest, ...
        let len = self.solve_times.len().max(other.solve_times.len());
        for i in 0..len {
            let mine = self.solve_times.get(i).copied().unwrap_or(0);
            let theirs = other.solve_times.get(i).copied().unwrap_or(0);
            if mine != theirs {
                return mine.cmp(&theirs);
            }
        }
        self.name.cmp(&other.name)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreboardSnapshot {
    pub order: Vec<String>,
    #[serde(skip)]
    rank_of: HashMap<String, usize>,
}

impl ScoreboardSnapshot {
    pub fn from_teams<'a>(teams: impl IntoIterator<Item = &'a TeamAggregate>) -> Self {
        let mut sorted: Vec<&TeamAggregate> = teams.into_iter().collect();
        sorted.sort_unstable();

        let order: Vec<String> = sorted.iter().map(|team| team.name.clone()).collect();
        let rank_of = order
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        Self { order, rank_of }
    }

    /// 0-based position.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.rank_of.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardLine {
    pub team: String,
    /// 1-based.
    pub rank: usize,
    pub solved: u32,
    pub penalty: i64,
    pub cells: Vec<ProblemCell>,
}

impl fmt::Display for BoardLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.team, self.rank, self.solved, self.penalty
        )?;
        for cell in &self.cells {
            write!(f, " {cell}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealEvent {
    pub team: String,
    /// Team that held the revealed team's new position right before the reveal.
    pub overtaken: String,
    pub solved: u32,
    pub penalty: i64,
}

impl fmt::Display for RevealEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.team, self.overtaken, self.solved, self.penalty
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrollReport {
    pub before: Vec<BoardLine>,
    pub reveals: Vec<RevealEvent>,
    pub after: Vec<BoardLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(problem: char, verdict: Verdict, time: i64) -> SubmissionRecord {
        SubmissionRecord {
            problem,
            verdict,
            time,
        }
    }

    fn team_with(name: &str, problems: usize) -> TeamAggregate {
        let mut team = TeamAggregate::new(name.to_string());
        team.allocate_problems(problems);
        team
    }

    #[test]
    fn accepted_after_wrong_attempts_adds_penalty() {
        let mut team = team_with("alpha", 2);
        team.record_submission(submission('A', Verdict::WrongAnswer, 10), false, 20);
        team.record_submission(submission('A', Verdict::RuntimeError, 12), false, 20);
        team.record_submission(submission('A', Verdict::Accepted, 30), false, 20);

        assert_eq!(team.solved_count, 1);
        assert_eq!(team.penalty, 70);
        assert_eq!(team.solve_times, vec![30]);
        assert_eq!(team.outcomes[0].cell().to_string(), "+2");
    }

    #[test]
    fn solved_problem_absorbs_later_submissions() {
        let mut team = team_with("alpha", 1);
        team.record_submission(submission('A', Verdict::Accepted, 5), false, 20);

        let route = team.record_submission(submission('A', Verdict::WrongAnswer, 6), false, 20);
        assert_eq!(route, SubmissionRoute::AlreadySolved);
        let route = team.record_submission(submission('A', Verdict::Accepted, 7), true, 20);
        assert_eq!(route, SubmissionRoute::AlreadySolved);

        assert_eq!(team.solved_count, 1);
        assert_eq!(team.penalty, 5);
        assert_eq!(team.outcomes[0].solve_time, 5);
        assert_eq!(team.submissions.len(), 3);
    }

    #[test]
    fn out_of_range_problem_is_logged_only() {
        let mut team = team_with("alpha", 2);
        let route = team.record_submission(submission('C', Verdict::Accepted, 5), false, 20);

        assert_eq!(route, SubmissionRoute::OutOfRange);
        assert_eq!(team.solved_count, 0);
        assert_eq!(team.submissions.len(), 1);
    }

    #[test]
    fn frozen_submissions_stay_out_of_live_metrics() {
        let mut team = team_with("alpha", 1);
        team.record_submission(submission('A', Verdict::WrongAnswer, 1), false, 20);
        team.reset_freeze_shadows();

        team.record_submission(submission('A', Verdict::WrongAnswer, 2), true, 20);
        team.record_submission(submission('A', Verdict::Accepted, 3), true, 20);
        team.record_submission(submission('A', Verdict::WrongAnswer, 4), true, 20);

        let outcome = &team.outcomes[0];
        assert_eq!(outcome.mark, FreezeMark::PendingReveal);
        assert_eq!(outcome.wrong_attempts, 1);
        assert_eq!(outcome.frozen_wrong, 1);
        assert_eq!(outcome.frozen_accept_time, Some(3));
        assert_eq!(outcome.submissions_during_freeze, 3);
        assert_eq!(outcome.cell().to_string(), "-1/3");
        assert_eq!(team.solved_count, 0);
        assert_eq!(team.penalty, 0);
    }

    #[test]
    fn reveal_conserves_wrong_attempts() {
        let mut team = team_with("alpha", 1);
        team.record_submission(submission('A', Verdict::WrongAnswer, 1), false, 20);
        team.reset_freeze_shadows();
        team.record_submission(submission('A', Verdict::TimeLimitExceed, 2), true, 20);
        team.record_submission(submission('A', Verdict::WrongAnswer, 3), true, 20);

        let before = team.outcomes[0].wrong_attempts + team.outcomes[0].frozen_wrong;
        assert_eq!(team.reveal_problem(0, 20), Reveal::WrongOnly);
        let after = team.outcomes[0].wrong_attempts + team.outcomes[0].frozen_wrong;

        assert_eq!(before, after);
        assert_eq!(team.outcomes[0].wrong_attempts, 3);
        assert!(!team.has_pending());
        assert_eq!(team.outcomes[0].cell().to_string(), "-3");
    }

    #[test]
    fn reveal_of_frozen_accept_applies_solve() {
        let mut team = team_with("alpha", 2);
        team.record_submission(submission('A', Verdict::Accepted, 20), false, 20);
        team.reset_freeze_shadows();
        team.record_submission(submission('B', Verdict::WrongAnswer, 100), true, 20);
        team.record_submission(submission('B', Verdict::WrongAnswer, 120), true, 20);
        team.record_submission(submission('B', Verdict::Accepted, 150), true, 20);

        assert_eq!(team.first_pending_problem(), Some(1));
        assert_eq!(team.reveal_problem(1, 20), Reveal::Accepted { time: 150 });
        assert_eq!(team.solved_count, 2);
        assert_eq!(team.penalty, 20 + 40 + 150);
        assert_eq!(team.solve_times, vec![150, 20]);
        assert_eq!(team.reveal_problem(1, 20), Reveal::Nothing);
    }

    #[test]
    fn comparator_orders_by_solved_then_penalty_then_latest_solve() {
        let mut a = team_with("a", 3);
        let mut b = team_with("b", 3);
        a.apply_accepted(0, 10, 20);
        a.apply_accepted(1, 50, 20);
        b.apply_accepted(0, 30, 20);
        b.apply_accepted(1, 30, 20);
        // Equal solved and penalty, b's latest solve is earlier
        assert_eq!(a.penalty, b.penalty);
        assert_eq!(b.cmp(&a), Ordering::Less);

        let mut c = team_with("c", 3);
        c.apply_accepted(0, 1, 20);
        c.apply_accepted(1, 1, 20);
        c.apply_accepted(2, 1, 20);
        assert_eq!(c.cmp(&a), Ordering::Less);
        assert_eq!(a.cmp(&c), Ordering::Greater);
    }

    #[test]
    fn comparator_falls_back_to_name() {
        let zed = team_with("zed", 1);
        let amy = team_with("amy", 1);
        assert_eq!(amy.cmp(&zed), Ordering::Less);
        assert_eq!(zed.cmp(&amy), Ordering::Greater);
        assert_eq!(amy.cmp(&amy), Ordering::Equal);
    }

    #[test]
    fn snapshot_positions_follow_comparator() {
        let mut strong = team_with("strong", 1);
        strong.apply_accepted(0, 5, 20);
        let idle_b = team_with("b-idle", 1);
        let idle_a = team_with("a-idle", 1);

        let snapshot = ScoreboardSnapshot::from_teams([&idle_b, &strong, &idle_a]);
        assert_eq!(snapshot.order, vec!["strong", "a-idle", "b-idle"]);
        assert_eq!(snapshot.position("b-idle"), Some(2));
        assert_eq!(snapshot.position("missing"), None);
    }

    #[test]
    fn cells_render_like_the_board() {
        assert_eq!(ProblemCell::Unsolved { wrong: 0 }.to_string(), ".");
        assert_eq!(ProblemCell::Unsolved { wrong: 2 }.to_string(), "-2");
        assert_eq!(ProblemCell::Solved { wrong: 0 }.to_string(), "+");
        assert_eq!(
            ProblemCell::Frozen {
                wrong: 0,
                submissions: 4
            }
            .to_string(),
            "0/4"
        );
    }

    #[test]
    fn verdict_parses_protocol_spelling() {
        assert_eq!("Runtime_Error".parse::<Verdict>(), Ok(Verdict::RuntimeError));
        assert!("Compile_Error".parse::<Verdict>().is_err());
        assert_eq!(problem_index('C'), Some(2));
        assert_eq!(problem_index('c'), None);
    }
}
