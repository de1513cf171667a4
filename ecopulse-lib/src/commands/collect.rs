use super::common::{ColorMode, LogLevel, init_logging};
use super::{Host, ProgressReporter};
use crate::Result;
use crate::collector::default_steps;
use crate::config::{Config, ProtocolConfig};
use crate::pipeline::{Credentials, Pipeline, RunContext, RunReport};
use crate::store::{DocumentStore, FileStore};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use directories::BaseDirs;
use ohno::{IntoAppError, app_err, bail};
use std::io::Write;
use std::sync::Arc;

const LOG_TARGET: &str = "       cli";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only run the named protocol (repeatable, default is every configured protocol)
    #[arg(long, value_name = "NAME")]
    pub protocol: Vec<String>,

    /// Fail when any protocol reports a failed step
    #[arg(long)]
    pub strict: bool,

    /// Path to configuration file (default is `ecopulse.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory where collected documents are stored
    #[arg(long, value_name = "PATH")]
    pub store_dir: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,

    /// Control when to use colored progress output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true, help_heading = "Credentials")]
    pub github_token: Option<String>,

    /// API key for the forum hosts
    #[arg(long, value_name = "KEY", env = "FORUM_API_KEY", hide_env_values = true, help_heading = "Credentials")]
    pub forum_api_key: Option<String>,

    /// API key for the governance provider
    #[arg(long, value_name = "KEY", env = "GOVERNANCE_API_KEY", hide_env_values = true, help_heading = "Credentials")]
    pub governance_api_key: Option<String>,

    /// API key for the asset data provider
    #[arg(long, value_name = "KEY", env = "ASSET_API_KEY", hide_env_values = true, help_heading = "Credentials")]
    pub asset_api_key: Option<String>,

    /// API key for the developer report provider
    #[arg(long, value_name = "KEY", env = "DEVREPORT_API_KEY", hide_env_values = true, help_heading = "Credentials")]
    pub developer_report_api_key: Option<String>,
}

impl RunArgs {
    fn credentials(&self) -> Credentials {
        Credentials {
            github_token: self.github_token.clone(),
            forum_api_key: self.forum_api_key.clone(),
            governance_api_key: self.governance_api_key.clone(),
            asset_api_key: self.asset_api_key.clone(),
            developer_report_api_key: self.developer_report_api_key.clone(),
        }
    }

    fn store_dir(&self) -> Result<Utf8PathBuf> {
        if let Some(dir) = &self.store_dir {
            return Ok(dir.clone());
        }

        let data_dir = BaseDirs::new().into_app_err("could not determine the data directory")?.data_dir().join("ecopulse");
        Utf8PathBuf::from_path_buf(data_dir)
            .map_err(|path| app_err!("data directory '{}' is not valid UTF-8", path.display()))
    }
}

/// Run the pipeline for the selected protocols and print one summary line per protocol.
pub async fn run_pipeline<H: Host>(host: &mut H, args: &RunArgs) -> Result<()> {
    init_logging(args.log_level);

    let config = Config::load(Utf8Path::new("."), args.config.as_ref())?;
    let protocols: Vec<ProtocolConfig> = config.select_protocols(&args.protocol)?.into_iter().cloned().collect();
    if protocols.is_empty() {
        bail!("no protocols configured, add a [[protocol]] table or run 'ecopulse init'");
    }

    let store_dir = args.store_dir()?;
    log::info!(target: LOG_TARGET, "Storing documents under '{store_dir}'");
    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(store_dir));

    let progress = Arc::new(ProgressReporter::new(args.log_level.progress_delay(), args.color.use_colors()));
    let ctx = RunContext::new(config.settings.clone(), &protocols, &args.credentials(), store, progress)?;

    let cancel = ctx.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!(target: LOG_TARGET, "Interrupted, finishing in-flight work");
            cancel.cancel();
        }
    });

    let selected: Vec<&ProtocolConfig> = protocols.iter().collect();
    let reports = Pipeline::new(&ctx, default_steps())?.run(&selected).await;
    interrupt.abort();

    report(host, &reports);

    let failed = reports.iter().filter(|r| !r.failed_steps.is_empty()).count();
    if args.strict && failed > 0 {
        bail!("{failed} of {} protocols reported failed steps", reports.len());
    }

    Ok(())
}

fn report<H: Host>(host: &mut H, reports: &[RunReport]) {
    let mut out = host.output();
    for report in reports {
        let _ = writeln!(out, "{}", report.summary());
        for (step, error) in &report.failed_steps {
            let _ = writeln!(out, "  failed {step}: {error}");
        }
    }
}
