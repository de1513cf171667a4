use super::grade::Grade;
use super::raw::RawHealthScore;
use super::stats::{mean, median, normal_cdf, pop_std, quantile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentile assigned when a population cannot be spread out.
pub const FALLBACK_PERCENTILE: f64 = 50.0;

const COMMIT_WEIGHT: f64 = 0.28;
const ISSUE_WEIGHT: f64 = 0.16;
const PR_WEIGHT: f64 = 0.16;
const RELEASE_WEIGHT: f64 = 0.08;
const CONTRIBUTION_WEIGHT: f64 = 0.32;

/// Sub-scores as percentiles within the protocol, plus their weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedHealthScore {
    pub commit: f64,
    pub issue: f64,
    pub pr: f64,
    pub release: f64,
    pub contribution: f64,
    pub total: f64,
    pub grade: Grade,
}

impl NormalizedHealthScore {
    #[must_use]
    pub fn new(commit: f64, issue: f64, pr: f64, release: f64, contribution: f64) -> Self {
        let total = COMMIT_WEIGHT.mul_add(
            commit,
            ISSUE_WEIGHT.mul_add(issue, PR_WEIGHT.mul_add(pr, RELEASE_WEIGHT.mul_add(release, CONTRIBUTION_WEIGHT * contribution))),
        );

        Self {
            commit,
            issue,
            pr,
            release,
            contribution,
            total,
            grade: Grade::from_total(total),
        }
    }
}

/// Normalize every sub-score across the given population of repositories.
#[must_use]
pub fn normalize(raw: &BTreeMap<String, RawHealthScore>) -> BTreeMap<String, NormalizedHealthScore> {
    let column = |pick: fn(&RawHealthScore) -> f64| percentiles(&raw.values().map(pick).collect::<Vec<_>>());

    let commit = column(|r| r.commit);
    let issue = column(|r| r.issue);
    let pr = column(|r| r.pr);
    let release = column(|r| r.release);
    let contribution = column(|r| r.contribution);

    raw.keys()
        .enumerate()
        .map(|(i, key)| {
            (
                key.clone(),
                NormalizedHealthScore::new(commit[i], issue[i], pr[i], release[i], contribution[i]),
            )
        })
        .collect()
}

/// Robust scale, then standard scale, then the normal CDF as a percentile.
#[must_use]
pub fn percentiles(values: &[f64]) -> Vec<f64> {
    let values: Vec<f64> = values.iter().map(|v| if v.is_finite() { *v } else { 0.0 }).collect();

    let uniform = values.windows(2).all(|pair| (pair[0] - pair[1]).abs() < f64::EPSILON);
    if values.len() < 2 || uniform {
        return vec![FALLBACK_PERCENTILE; values.len()];
    }

    let center = median(&values);
    let iqr = quantile(&values, 0.75) - quantile(&values, 0.25);
    let divisor = if iqr > 0.0 { iqr } else { 1.0 };
    let robust: Vec<f64> = values.iter().map(|v| (v - center) / divisor).collect();

    let m = mean(&robust);
    let std = pop_std(&robust);

    robust
        .iter()
        .map(|v| {
            let z = if std > 0.0 { (v - m) / std } else { 0.0 };
            (normal_cdf(z) * 100.0).clamp(0.0, 100.0)
        })
        .collect()
}
