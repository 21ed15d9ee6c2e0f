//! What to do when more than one project matches.

use crate::matching::{MatchResult, SkipReason};
use crate::service::ProjectCandidate;
use std::collections::HashSet;

/// Disposition of several firmly matching candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    /// Skip the record. Never guesses.
    #[default]
    Refuse,
    /// Report every candidate as a match.
    ///
    /// Exploratory only: at most one of the reported projects can be right,
    /// so the output needs human review before it is used.
    Enumerate,
}

impl AmbiguityPolicy {
    pub fn from_allow_duplicates(allow: bool) -> Self {
        if allow { Self::Enumerate } else { Self::Refuse }
    }

    /// Final results for one pre-policy match result.
    pub fn settle(self, result: MatchResult) -> Vec<MatchResult> {
        match (self, result) {
            (Self::Refuse, MatchResult::Ambiguous { .. }) => vec![MatchResult::Skipped {
                reason: SkipReason::Ambiguous,
            }],
            (Self::Enumerate, MatchResult::Ambiguous { candidates }) => candidates
                .into_iter()
                .map(|candidate| MatchResult::Matched { candidate })
                .collect(),
            (_, other) => vec![other],
        }
    }
}

/// Pre-policy result for a list of firmly matching candidates.
///
/// Candidates are deduplicated by id, keeping the first occurrence.
pub fn resolve(candidates: Vec<ProjectCandidate>) -> MatchResult {
    let mut seen = HashSet::new();
    let mut unique: Vec<ProjectCandidate> = candidates
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .collect();
    match unique.len() {
        0 => MatchResult::NotFound,
        1 => MatchResult::Matched {
            candidate: unique.remove(0),
        },
        _ => MatchResult::Ambiguous { candidates: unique },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64) -> ProjectCandidate {
        ProjectCandidate {
            id,
            name: format!("p{}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_counts_unique_ids() {
        assert_eq!(resolve(vec![]), MatchResult::NotFound);
        assert!(matches!(
            resolve(vec![candidate(1), candidate(1)]),
            MatchResult::Matched { candidate } if candidate.id == 1
        ));
        assert!(matches!(
            resolve(vec![candidate(1), candidate(2), candidate(1)]),
            MatchResult::Ambiguous { candidates } if candidates.len() == 2
        ));
    }

    #[test]
    fn test_refuse_skips_ambiguous() {
        let result = resolve(vec![candidate(1), candidate(2)]);
        assert_eq!(
            AmbiguityPolicy::Refuse.settle(result),
            vec![MatchResult::Skipped {
                reason: SkipReason::Ambiguous
            }]
        );
    }

    #[test]
    fn test_enumerate_reports_each() {
        let result = resolve(vec![candidate(1), candidate(2)]);
        let settled = AmbiguityPolicy::Enumerate.settle(result);
        assert_eq!(settled.len(), 2);
        assert!(settled.iter().all(|r| matches!(r, MatchResult::Matched { .. })));
    }

    #[test]
    fn test_other_results_pass_through() {
        for policy in [AmbiguityPolicy::Refuse, AmbiguityPolicy::Enumerate] {
            assert_eq!(policy.settle(MatchResult::NotFound), vec![MatchResult::NotFound]);
            let matched = resolve(vec![candidate(3)]);
            assert_eq!(policy.settle(matched.clone()), vec![matched]);
        }
        assert_eq!(AmbiguityPolicy::default(), AmbiguityPolicy::Refuse);
        assert_eq!(AmbiguityPolicy::from_allow_duplicates(true), AmbiguityPolicy::Enumerate);
    }
}
