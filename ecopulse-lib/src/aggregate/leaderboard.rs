use crate::model::RepositoryRecord;
use crate::scoring::NormalizedHealthScore;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of every leaderboard.
pub const LEADERBOARD_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub record: RepositoryRecord,
    pub score: NormalizedHealthScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorEntry {
    pub login: CompactString,
    pub commits: u64,
}

/// Scored repositories by composite total, best first.
#[must_use]
pub fn project_leaderboard(records: &[RepositoryRecord], scores: &BTreeMap<String, NormalizedHealthScore>) -> Vec<ProjectEntry> {
    let mut entries: Vec<ProjectEntry> = records
        .iter()
        .filter_map(|record| {
            scores.get(&record.key()).map(|score| ProjectEntry {
                record: record.clone(),
                score: *score,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .total
            .total_cmp(&a.score.total)
            .then_with(|| a.record.key().cmp(&b.record.key()))
    });
    entries.truncate(LEADERBOARD_LIMIT);
    entries
}

/// Contributors by commits summed across repositories, most first.
#[must_use]
pub fn contributor_leaderboard(commits_by_login: BTreeMap<CompactString, u64>) -> Vec<ContributorEntry> {
    let mut entries: Vec<ContributorEntry> = commits_by_login
        .into_iter()
        .map(|(login, commits)| ContributorEntry { login, commits })
        .collect();

    // the map is ordered by login, so the stable sort breaks ties alphabetically
    entries.sort_by(|a, b| b.commits.cmp(&a.commits));
    entries.truncate(LEADERBOARD_LIMIT);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> RepositoryRecord {
        let mut r = RepositoryRecord::inaccessible(&format!("https://github.com/o/{name}"), "o", name);
        r.valid = true;
        r
    }

    #[test]
    fn projects_are_truncated_and_strictly_descending() {
        let records: Vec<RepositoryRecord> = (0..20).map(|i| record(&format!("r{i:02}"))).collect();
        let scores: BTreeMap<String, NormalizedHealthScore> = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let pct = f64::from(u8::try_from(i).unwrap()) * 5.0;
                (r.key(), NormalizedHealthScore::new(pct, pct, pct, pct, pct))
            })
            .collect();

        let board = project_leaderboard(&records, &scores);
        assert_eq!(board.len(), LEADERBOARD_LIMIT);
        assert_eq!(board[0].record.name, "r19");
        for pair in board.windows(2) {
            assert!(pair[0].score.total > pair[1].score.total);
        }
    }

    #[test]
    fn unscored_projects_are_left_out() {
        let records = vec![record("a"), record("b")];
        let scores = BTreeMap::from([("o#b".to_string(), NormalizedHealthScore::new(1.0, 1.0, 1.0, 1.0, 1.0))]);
        let board = project_leaderboard(&records, &scores);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].record.name, "b");
    }

    #[test]
    fn contributors_sum_and_rank() {
        let totals: BTreeMap<CompactString, u64> = (0..20_u64).map(|i| (CompactString::from(format!("user{i:02}")), i)).collect();
        let board = contributor_leaderboard(totals);

        assert_eq!(board.len(), LEADERBOARD_LIMIT);
        assert_eq!(board[0].login, "user19");
        assert_eq!(board[14].commits, 5);
    }

    #[test]
    fn contributor_ties_break_by_login() {
        let totals = BTreeMap::from([(CompactString::from("bob"), 3), (CompactString::from("alice"), 3)]);
        let board = contributor_leaderboard(totals);
        assert_eq!(board[0].login, "alice");
    }
}
