#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for ecopulse
//!
//! This library holds the ingestion-and-scoring pipeline behind the `ecopulse` tool, which
//! crawls open-source ecosystems, collects repository activity from upstream APIs, scores
//! every repository's health and rolls the results up into ecosystem-wide snapshots.
//!
//! # Module Organization
//!
//! - [`actor`]: Resilient, paginated API client shared by every upstream integration
//! - [`crawler`]: Manifest resolution and repository validation
//! - [`collector`]: Per-repository metric snapshots
//! - [`integrations`]: Protocol-level forum, developer, governance and asset snapshots
//! - [`scoring`]: Raw and normalized health scores
//! - [`aggregate`]: Cumulative totals, merged series and leaderboards
//! - [`pipeline`]: Per-protocol orchestration
//! - [`store`]: Document store abstraction and implementations
//! - [`commands`]: Command-line interface

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod actor;
pub mod aggregate;
pub mod collector;
pub mod commands;
pub mod config;
pub mod crawler;
pub mod integrations;
pub mod model;
pub mod pipeline;
pub mod scoring;
pub mod store;

pub use crate::commands::{Host, run};
