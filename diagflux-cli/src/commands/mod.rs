//! Command handlers -- one module per subcommand

pub mod config;
pub mod import;

use std::path::Path;

use diagflux_core::config::DiagfluxConfig;
use diagflux_core::error::{ConfigError, DiagfluxError};

use crate::error::CliError;

/// Load the configuration, falling back to defaults when the file is absent.
///
/// Environment overrides still apply to the defaults, so `import` can run
/// without any configuration file.
pub async fn load_or_default(path: &Path) -> Result<DiagfluxConfig, CliError> {
    match DiagfluxConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(DiagfluxError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = DiagfluxConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let config = load_or_default(Path::new("/nonexistent/diagflux.toml"))
            .await
            .expect("missing file should use defaults");
        assert_eq!(config.import.batch_size, 1000);
        assert_eq!(config.sink.kind, "influx");
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("diagflux.toml");
        std::fs::write(&path, "[import\nbatch_size = 1").expect("should write file");

        let err = load_or_default(&path)
            .await
            .expect_err("malformed file should fail");
        assert_eq!(err.exit_code(), 2);
    }
}
