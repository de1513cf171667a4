//! Resilient access to upstream APIs.
//!
//! Every upstream integration goes through an [`Actor`]: one configured HTTP client per
//! provider with a shared [`RateBudget`], bounded retries and pagination. Outcomes are
//! reported as [`ApiResult`] rather than raised, so a single unavailable item never
//! aborts a collection run.

mod api_result;
mod classify;
mod client;
mod github;
mod pagination;
mod profile;
mod rate_budget;

pub use api_result::ApiResult;
pub use classify::{Classification, classify, rate_limit_wait};
pub use client::{Actor, Params};
pub use github::RepositoryDescription;
pub use pagination::{Cursor, Fetched, Page, extend_items, next_link};
pub use profile::{AuthScheme, ProviderKind, ProviderProfile, RetryPolicy};
pub use rate_budget::RateBudget;
