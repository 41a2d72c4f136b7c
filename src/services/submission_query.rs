use crate::models::{SubmissionRecord, Verdict};

/// Status part of a query. A status that is not a known verdict is kept as
/// written and never matches a logged submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Any,
    Verdict(Verdict),
    Other(String),
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Self {
        raw.parse::<Verdict>()
            .map_or_else(|_| StatusFilter::Other(raw.to_string()), StatusFilter::Verdict)
    }

    fn matches(&self, verdict: Verdict) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Verdict(wanted) => *wanted == verdict,
            StatusFilter::Other(_) => false,
        }
    }
}

/// `None` / `Any` match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub problem: Option<char>,
    pub status: StatusFilter,
}

impl SubmissionFilter {
    pub fn matches(&self, record: &SubmissionRecord) -> bool {
        self.problem.is_none_or(|problem| problem == record.problem)
            && self.status.matches(record.verdict)
    }
}

/// Most recent submission in `log` matching `filter`.
pub fn find_last<'a>(
    log: &'a [SubmissionRecord],
    filter: &SubmissionFilter,
) -> Option<&'a SubmissionRecord> {
    log.iter().rev().find(|record| filter.matches(record))
}
