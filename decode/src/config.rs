use std::path::{Path, PathBuf};

use diagcat::DecoderConfig;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

/// Reads a TOML decoder config, or returns the defaults when no path is given.
pub async fn parse_config(path: Option<&Path>) -> Result<DecoderConfig, ConfigError> {
    let Some(path) = path else {
        debug!("no config file given, using defaults");
        return Ok(DecoderConfig::default());
    };
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
    toml::from_str(&contents).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
}

#[cfg(test)]
mod test {
    use super::*;
    use diagcat::DecodeMode;
    use std::io::Write;

    #[tokio::test]
    async fn test_defaults_without_file() {
        assert_eq!(parse_config(None).await.unwrap(), DecoderConfig::default());
    }

    #[tokio::test]
    async fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = \"network\"\nradio_id = 1").unwrap();
        let config = parse_config(Some(file.path())).await.unwrap();
        assert_eq!(config.mode, DecodeMode::Network);
        assert_eq!(config.radio_id, 1);
        assert!(config.validate_crc);
    }

    #[tokio::test]
    async fn test_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mode = 3").unwrap();
        assert!(matches!(
            parse_config(Some(file.path())).await,
            Err(ConfigError::Parse(..))
        ));
        assert!(matches!(
            parse_config(Some(Path::new("/nonexistent/diagcat.toml"))).await,
            Err(ConfigError::Read(..))
        ));
    }
}
