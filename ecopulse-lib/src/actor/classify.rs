//! Failure classification for upstream responses.
//!
//! Every provider speaks HTTP, so classification is driven by the status line and the
//! rate-limit headers. The resulting [`Classification`] decides whether the actor
//! returns, waits and retries, or gives up.

use chrono::{DateTime, Utc};
use core::time::Duration;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// How a single response should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Data is available.
    Ready,

    /// The request was accepted but the payload is still being computed upstream.
    NotReady,

    /// The request succeeded with no content.
    Empty,

    /// The provider throttled us. `reset_at` is set when the response told us when the window reopens.
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// A permanent failure for this item: bad request, unauthenticated, not found, gone, unprocessable.
    ClientError(StatusCode),

    /// The provider failed; worth a bounded number of retries.
    ServerError(StatusCode),
}

/// Classify a response from its status and headers.
#[must_use]
pub fn classify(status: StatusCode, headers: &HeaderMap, now: DateTime<Utc>) -> Classification {
    if status == StatusCode::ACCEPTED {
        return Classification::NotReady;
    }

    if status == StatusCode::NO_CONTENT {
        return Classification::Empty;
    }

    if status.is_success() {
        return Classification::Ready;
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Classification::RateLimited {
            reset_at: extract_reset(headers, now),
        };
    }

    // GitHub signals primary and secondary rate limits with 403
    if status == StatusCode::FORBIDDEN && (quota_exhausted(headers) || headers.contains_key(RETRY_AFTER)) {
        return Classification::RateLimited {
            reset_at: extract_reset(headers, now),
        };
    }

    if status.is_server_error() {
        return Classification::ServerError(status);
    }

    Classification::ClientError(status)
}

/// Time to wait before the rate-limit window reopens, never negative.
#[must_use]
pub fn rate_limit_wait(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (reset_at - now).to_std().unwrap_or(Duration::ZERO)
}

fn quota_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .is_some_and(|remaining| remaining == 0)
}

/// Read the reset instant from `x-ratelimit-reset` (epoch seconds) or `Retry-After` (delta seconds).
fn extract_reset(headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let reset = headers
        .get("x-ratelimit-reset")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|ts| DateTime::from_timestamp(ts, 0));

    reset.or_else(|| {
        let secs = headers
            .get(RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())?;
        Some(now + chrono::Duration::seconds(secs.max(0)))
    })
}
