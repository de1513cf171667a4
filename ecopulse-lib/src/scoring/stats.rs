//! Small statistics toolbox used by the scorer.
//!
//! All functions take finite inputs and return `0.0` for empty slices unless noted.

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    #[expect(clippy::cast_precision_loss, reason = "slice lengths are far below 2^52")]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Population standard deviation.
#[must_use]
pub fn pop_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let m = mean(values);
    let squares: Vec<f64> = values.iter().map(|v| (v - m).powi(2)).collect();
    mean(&squares).sqrt()
}

/// Quantile with linear interpolation between closest ranks. `q` is in [0, 1].
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[expect(clippy::cast_precision_loss, reason = "slice lengths are far below 2^52")]
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "position is within [0, len-1]")]
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);

    #[expect(clippy::cast_precision_loss, reason = "index fits in f64")]
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[must_use]
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Error function, Abramowitz and Stegun formula 7.1.26 (max error 1.5e-7).
#[must_use]
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / P.mul_add(x, 1.0);
    let poly = A5.mul_add(t, A4).mul_add(t, A3).mul_add(t, A2).mul_add(t, A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal cumulative distribution function.
#[must_use]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / core::f64::consts::SQRT_2))
}

/// Gini coefficient of non-negative values.
///
/// Returns 1.0 (total concentration) for fewer than two values or an all-zero population.
#[must_use]
pub fn gini(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 1.0;
    }

    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 1.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[expect(clippy::cast_precision_loss, reason = "population sizes are far below 2^52")]
    let n = sorted.len() as f64;

    #[expect(clippy::cast_precision_loss, reason = "rank fits in f64")]
    let weighted: f64 = sorted.iter().enumerate().map(|(i, v)| (i + 1) as f64 * v).sum();

    (2.0 * weighted) / (n * total) - (n + 1.0) / n
}

/// Exponential moving average, seeded with the first value.
#[must_use]
pub fn ema(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut current = None;
    for &v in values {
        let next = current.map_or(v, |prev: f64| alpha.mul_add(v, (1.0 - alpha) * prev));
        out.push(next);
        current = Some(next);
    }
    out
}

/// Min-max scaling parameters of a population. A zero range scales everything to 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    min: f64,
    range: f64,
}

impl MinMax {
    #[must_use]
    pub fn of(values: impl IntoIterator<Item = f64>) -> Self {
        let (min, max) = values
            .into_iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if min.is_finite() && max.is_finite() {
            Self { min, range: max - min }
        } else {
            Self { min: 0.0, range: 0.0 }
        }
    }

    #[must_use]
    pub fn scale(&self, value: f64) -> f64 {
        if self.range <= 0.0 { 0.0 } else { (value - self.min) / self.range }
    }
}
