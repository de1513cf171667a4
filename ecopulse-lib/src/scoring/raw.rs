//! Repository-local health sub-scores.
//!
//! Every sub-score decays older activity so that a repository's score reflects what it
//! is doing now rather than what it did years ago.

use super::stats::{MinMax, ema, gini, mean, pop_std};
use crate::model::{ContributorActivity, IssueItem, ReleaseItem, WeeklyCommitActivity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SECONDS_PER_DAY: f64 = 86_400.0;

const COMMIT_WEEKLY_DECAY: f64 = 0.05;
const COMMIT_CONSISTENCY_WEIGHT: f64 = 10.0;

const ITEM_DAILY_DECAY: f64 = 0.005;
const ITEM_CLOSED_REWARD: f64 = 1.5;
const ITEM_COMMENT_REWARD: f64 = 0.05;

const RELEASE_INDEX_DECAY: f64 = 0.1;
const RELEASE_STALENESS: f64 = 0.01;

const CONTRIBUTION_EMA_ALPHA: f64 = 0.1;
const CONTRIBUTOR_SATURATION: f64 = 100.0;

/// Smoothing term that keeps divisions by day counts finite.
const EPSILON_DAYS: f64 = 0.01;

/// The five repository-local sub-scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawHealthScore {
    pub commit: f64,
    pub issue: f64,
    pub pr: f64,
    pub release: f64,
    pub contribution: f64,
}

/// Snapshots a repository's raw score is computed from.
#[derive(Debug, Clone, Default)]
pub struct ScoreInputs {
    pub commit_activity: Vec<WeeklyCommitActivity>,
    pub issues: Vec<IssueItem>,
    pub pull_requests: Vec<IssueItem>,
    pub releases: Vec<ReleaseItem>,
    pub contributors: Vec<ContributorActivity>,
}

#[must_use]
pub fn raw_score(inputs: &ScoreInputs, now: DateTime<Utc>) -> RawHealthScore {
    RawHealthScore {
        commit: finite_or_zero(commit_score(&inputs.commit_activity)),
        issue: finite_or_zero(item_score(&inputs.issues, now)),
        pr: finite_or_zero(item_score(&inputs.pull_requests, now)),
        release: finite_or_zero(release_score(&inputs.releases, now)),
        contribution: finite_or_zero(contribution_score(&inputs.contributors)),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn days_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    #[expect(clippy::cast_precision_loss, reason = "second counts are far below 2^52")]
    let seconds = (later - earlier).num_seconds() as f64;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

/// Decayed weekly commit totals, damped by how irregular the weeks are.
#[must_use]
pub fn commit_score(weeks: &[WeeklyCommitActivity]) -> f64 {
    if weeks.is_empty() {
        return 0.0;
    }

    let mut sorted: Vec<&WeeklyCommitActivity> = weeks.iter().collect();
    sorted.sort_by_key(|w| w.week);

    #[expect(clippy::cast_precision_loss, reason = "commit counts are far below 2^52")]
    let totals: Vec<f64> = sorted.iter().map(|w| w.total as f64).collect();

    let newest = totals.len() - 1;
    let decayed: f64 = totals
        .iter()
        .enumerate()
        .map(|(i, total)| {
            #[expect(clippy::cast_precision_loss, reason = "week offsets are tiny")]
            let weeks_ago = (newest - i) as f64;
            total * (-COMMIT_WEEKLY_DECAY * weeks_ago).exp()
        })
        .sum();

    let m = mean(&totals);
    let cv = if m < 1e-9 { 0.0 } else { pop_std(&totals) / m };

    decayed * (-COMMIT_CONSISTENCY_WEIGHT * cv).exp()
}

/// Decayed rewards for issues or pull requests. Closing quickly earns more.
#[must_use]
pub fn item_score(items: &[IssueItem], now: DateTime<Utc>) -> f64 {
    let close_days: Vec<f64> = items
        .iter()
        .filter(|item| item.is_closed())
        .filter_map(|item| item.closed_at.map(|closed| days_between(closed, item.created_at)))
        .collect();

    let avg_days_to_close = (!close_days.is_empty()).then(|| mean(&close_days));

    items
        .iter()
        .map(|item| {
            let comments = ITEM_COMMENT_REWARD * comment_count(item);

            let (reward, relevant) = match (item.is_closed(), item.closed_at) {
                (true, Some(closed_at)) => {
                    let factor = avg_days_to_close.map_or(1.0, |avg| avg / (days_between(closed_at, item.created_at) + EPSILON_DAYS));
                    (ITEM_CLOSED_REWARD.mul_add(factor, comments), closed_at)
                }
                _ => (1.0 + comments, item.created_at),
            };

            reward * (-ITEM_DAILY_DECAY * days_between(now, relevant)).exp()
        })
        .sum()
}

#[expect(clippy::cast_precision_loss, reason = "comment counts are far below 2^52")]
fn comment_count(item: &IssueItem) -> f64 {
    item.comments as f64
}

/// Rewards a steady release cadence and recent releases.
#[must_use]
pub fn release_score(releases: &[ReleaseItem], now: DateTime<Utc>) -> f64 {
    let mut published: Vec<DateTime<Utc>> = releases.iter().filter_map(|r| r.published_at).collect();
    if published.is_empty() {
        return 0.0;
    }

    published.sort_unstable_by(|a, b| b.cmp(a));

    let days_since_last = days_between(now, published[0]);
    let interval_std = if published.len() == 1 {
        days_since_last
    } else {
        let gaps: Vec<f64> = published.windows(2).map(|pair| days_between(pair[0], pair[1])).collect();
        pop_std(&gaps)
    };

    let penalty = 1.0 / RELEASE_STALENESS.mul_add(days_since_last, 1.0);
    let regularity = 1.0 / (interval_std + EPSILON_DAYS);

    (0..published.len())
        .map(|i| {
            #[expect(clippy::cast_precision_loss, reason = "release indexes are tiny")]
            let index = i as f64;
            penalty * (-RELEASE_INDEX_DECAY * index).exp() * regularity
        })
        .sum()
}

/// Breadth and momentum of the contributor base.
#[must_use]
pub fn contribution_score(contributors: &[ContributorActivity]) -> f64 {
    if contributors.is_empty() {
        return 0.0;
    }

    // decay-weighted (week, additions, deletions, commits) per contributor
    let weighted: Vec<Vec<(i64, f64, f64, f64)>> = contributors.iter().map(weighted_weeks).collect();

    let all = || weighted.iter().flatten();
    let additions = MinMax::of(all().map(|r| r.1));
    let deletions = MinMax::of(all().map(|r| r.2));
    let commits = MinMax::of(all().map(|r| r.3));

    let mut weekly_commits: BTreeMap<i64, f64> = BTreeMap::new();
    let mut efficiency_terms = Vec::new();
    for &(week, a, d, c) in all() {
        let norm_a = additions.scale(a);
        let norm_d = deletions.scale(d);
        let norm_c = commits.scale(c);

        *weekly_commits.entry(week).or_insert(0.0) += norm_c;

        let ratio = if norm_d > 0.0 { norm_a / norm_d } else { 0.0 };
        efficiency_terms.push(ratio * norm_c);
    }

    let series: Vec<f64> = weekly_commits.into_values().collect();
    let smoothed = ema(&series, CONTRIBUTION_EMA_ALPHA);
    let trend = match (smoothed.first(), smoothed.last()) {
        (Some(first), Some(last)) => {
            let peak = smoothed.iter().copied().fold(1.0_f64, f64::max);
            (((last - first) / peak + 1.0) / 2.0).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };

    let efficiency = mean(&efficiency_terms);

    #[expect(clippy::cast_precision_loss, reason = "commit counts are far below 2^52")]
    let totals: Vec<f64> = contributors.iter().map(|c| c.total as f64).collect();
    let concentration = gini(&totals);

    #[expect(clippy::cast_precision_loss, reason = "contributor counts are tiny")]
    let count_ratio = (contributors.len() as f64 / CONTRIBUTOR_SATURATION).min(1.0);

    0.20f64.mul_add(trend, 0.30f64.mul_add(1.0 - concentration, 0.20f64.mul_add(efficiency, 0.30 * count_ratio)))
}

/// Later weeks weigh more: week `j` of `n` (oldest first) is scaled by `(j + 1) / n`.
#[expect(clippy::cast_precision_loss, reason = "week counts and line counts are far below 2^52")]
fn weighted_weeks(contributor: &ContributorActivity) -> Vec<(i64, f64, f64, f64)> {
    let n = contributor.weeks.len() as f64;
    contributor
        .weeks
        .iter()
        .enumerate()
        .map(|(j, w)| {
            let weight = (j + 1) as f64 / n;
            (w.w, w.a as f64 * weight, w.d as f64 * weight, w.c as f64 * weight)
        })
        .collect()
}
