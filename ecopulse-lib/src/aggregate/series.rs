//! Merging of per-repository time series into protocol-wide series.
//!
//! Each merge folds one repository's series into an accumulator. An empty accumulator is
//! seeded with the first series it sees. Outputs are sorted by their key.

use crate::model::{CodeFrequencyEntry, PunchCardEntry, WeeklyCommitActivity};
use std::collections::BTreeMap;

/// Fold weekly commit activity into `acc`.
///
/// When both series cover the same weeks in the same order they are added position by
/// position. Otherwise weeks are matched by their start timestamp.
pub fn merge_commit_activity(acc: &mut Vec<WeeklyCommitActivity>, next: &[WeeklyCommitActivity]) {
    if acc.is_empty() {
        acc.extend_from_slice(next);
        acc.sort_by_key(|w| w.week);
        return;
    }

    let aligned = acc.len() == next.len() && acc.iter().zip(next).all(|(a, b)| a.week == b.week);
    if aligned {
        for (a, b) in acc.iter_mut().zip(next) {
            add_week(a, b);
        }
        return;
    }

    let mut by_week: BTreeMap<i64, WeeklyCommitActivity> = acc.drain(..).map(|w| (w.week, w)).collect();
    for week in next {
        let _ = by_week
            .entry(week.week)
            .and_modify(|existing| add_week(existing, week))
            .or_insert_with(|| week.clone());
    }
    acc.extend(by_week.into_values());
}

fn add_week(acc: &mut WeeklyCommitActivity, other: &WeeklyCommitActivity) {
    if acc.days.len() < other.days.len() {
        acc.days.resize(other.days.len(), 0);
    }
    for (day, value) in acc.days.iter_mut().zip(&other.days) {
        *day += value;
    }
    acc.total += other.total;
}

/// Fold weekly additions and deletions into `acc`, matching weeks by date.
pub fn merge_code_frequency(acc: &mut Vec<CodeFrequencyEntry>, next: &[CodeFrequencyEntry]) {
    let mut by_date: BTreeMap<String, (u64, u64)> = acc.drain(..).map(|e| (e.date, (e.additions, e.deletions))).collect();
    for entry in next {
        let slot = by_date.entry(entry.date.clone()).or_insert((0, 0));
        slot.0 += entry.additions;
        slot.1 += entry.deletions;
    }
    acc.extend(by_date.into_iter().map(|(date, (additions, deletions))| CodeFrequencyEntry {
        date,
        additions,
        deletions,
    }));
}

/// Fold punch card cells into `acc`, matching cells by weekday and hour.
pub fn merge_punch_card(acc: &mut Vec<PunchCardEntry>, next: &[PunchCardEntry]) {
    let mut cells: BTreeMap<(u8, u8), u64> = acc.drain(..).map(|e| ((e.day, e.hour), e.commits)).collect();
    for entry in next {
        *cells.entry((entry.day, entry.hour)).or_insert(0) += entry.commits;
    }
    acc.extend(cells.into_iter().map(|((day, hour), commits)| PunchCardEntry { day, hour, commits }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(week: i64, days: &[u64]) -> WeeklyCommitActivity {
        WeeklyCommitActivity {
            days: days.to_vec(),
            total: days.iter().sum(),
            week,
        }
    }

    #[test]
    fn aligned_weeks_add_positionally() {
        let mut acc = Vec::new();
        merge_commit_activity(&mut acc, &[week(100, &[1, 0])]);
        merge_commit_activity(&mut acc, &[week(100, &[2, 1])]);
        assert_eq!(acc, vec![week(100, &[3, 1])]);
        assert_eq!(acc[0].total, 4);
    }

    #[test]
    fn misaligned_weeks_merge_by_key() {
        let mut acc = vec![week(100, &[1]), week(200, &[1])];
        merge_commit_activity(&mut acc, &[week(200, &[5]), week(300, &[7])]);
        assert_eq!(acc, vec![week(100, &[1]), week(200, &[6]), week(300, &[7])]);
    }

    #[test]
    fn first_series_seeds_sorted() {
        let mut acc = Vec::new();
        merge_commit_activity(&mut acc, &[week(300, &[1]), week(100, &[2])]);
        assert_eq!(acc.iter().map(|w| w.week).collect::<Vec<_>>(), vec![100, 300]);
    }

    #[test]
    fn code_frequency_merges_by_date() {
        let entry = |date: &str, additions, deletions| CodeFrequencyEntry {
            date: date.to_string(),
            additions,
            deletions,
        };

        let mut acc = Vec::new();
        merge_code_frequency(&mut acc, &[entry("2024-01-08", 1, 1), entry("2024-01-01", 2, 0)]);
        merge_code_frequency(&mut acc, &[entry("2024-01-08", 10, 3)]);

        assert_eq!(acc, vec![entry("2024-01-01", 2, 0), entry("2024-01-08", 11, 4)]);
    }

    #[test]
    fn punch_card_merges_by_cell() {
        let cell = |day, hour, commits| PunchCardEntry { day, hour, commits };

        let mut acc = Vec::new();
        merge_punch_card(&mut acc, &[cell(1, 9, 2), cell(0, 0, 1)]);
        merge_punch_card(&mut acc, &[cell(1, 9, 3)]);

        assert_eq!(acc, vec![cell(0, 0, 1), cell(1, 9, 5)]);
    }
}
