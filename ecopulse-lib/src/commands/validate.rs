use super::Host;
use crate::Result;
use crate::config::Config;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file (default is `ecopulse.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,
}

pub fn validate_config<H: Host>(host: &mut H, args: &ValidateArgs) -> Result<()> {
    let config_path = args.config.as_ref();

    match Config::load(Utf8Path::new("."), config_path) {
        Ok(config) => {
            let _ = writeln!(host.output(), "Configuration file is valid");
            if let Some(path) = config_path {
                let _ = writeln!(host.output(), "Config file: {path}");
            } else {
                let _ = writeln!(host.output(), "Using default configuration (no config file found)");
            }
            for protocol in &config.protocol {
                let _ = writeln!(host.output(), "Protocol: {} ({} manifests)", protocol.name, protocol.manifests.len());
            }
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(host.error(), "❌ Configuration validation failed: {e}");
            host.exit(1);
            Err(e)
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use crate::commands::init::{InitArgs, init_config};

    fn write_config(dir: &tempfile::TempDir, name: &str, text: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    fn validate(path: Utf8PathBuf) -> (Result<()>, TestHost) {
        let mut host = TestHost::new();
        let result = validate_config(&mut host, &ValidateArgs { config: Some(path) });
        (result, host)
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn generated_default_config_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("ecopulse.toml")).unwrap();
        init_config(&mut TestHost::new(), &InitArgs { output: Some(path.clone()) }).unwrap();

        let (result, host) = validate(path);
        result.unwrap();
        assert!(host.output_text().contains("Configuration file is valid"));
        assert!(host.output_text().contains("Protocol: uniswap"));
        assert_eq!(host.exit_code, None);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn empty_config_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let (result, _) = validate(write_config(&dir, "empty.toml", "# nothing here\n"));
        result.unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn invalid_toml_exits_with_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (result, host) = validate(write_config(&dir, "broken.toml", "[[protocol]\nname = \"x\"\n"));

        assert!(result.is_err());
        assert_eq!(host.exit_code, Some(1));
        assert!(host.error_text().contains("Configuration validation failed"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn unknown_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (result, host) = validate(write_config(&dir, "unknown.toml", "[settings]\nturbo = true\n"));

        assert!(result.is_err());
        assert_eq!(host.exit_code, Some(1));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn bad_duration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (result, _) = validate(write_config(&dir, "duration.toml", "[settings.rate_limit]\nmax_wait = \"soon\"\n"));
        assert!(result.is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.toml")).unwrap();
        let (result, host) = validate(path);

        assert!(result.is_err());
        assert_eq!(host.exit_code, Some(1));
    }
}
