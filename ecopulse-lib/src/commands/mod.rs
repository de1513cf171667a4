//! Command-line front end for ecopulse.
//!
//! Everything here goes through a [`Host`] so commands can be exercised in tests
//! without touching the real process streams or exit code.

mod collect;
mod common;
mod host;
mod init;
mod progress_reporter;
mod run;
mod validate;

pub use collect::{RunArgs, run_pipeline};
pub use common::{ColorMode, LogLevel};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use validate::{ValidateArgs, validate_config};
