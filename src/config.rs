use std::fmt;
use std::path::PathBuf;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    Missing(&'static str),
    /// Validation error.
    Validation(String),
    /// Failed to create the download directory.
    CreateDownloadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "environment variable {var} is required"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
            Self::CreateDownloadDir { path, source } => {
                write!(
                    f,
                    "failed to create download directory '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDownloadDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Bot configuration, sourced from the environment (plus `.env` via dotenvy).
///
/// An explicit object handed to the message handler at startup rather than
/// process-global state.
pub struct Config {
    pub telegram_token: String,
    /// Directory downloads are written into.
    pub download_dir: PathBuf,
    /// Path to the yt-dlp binary. Defaults to `yt-dlp` on PATH.
    pub ytdlp_bin: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let telegram_token = get("TELEGRAM_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_token.split(':').collect();
        if token_parts.len() != 2
            || token_parts[0].parse::<u64>().is_err()
            || token_parts[1].is_empty()
        {
            return Err(ConfigError::Validation(
                "TELEGRAM_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let download_dir = get("DOWNLOAD_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("DOWNLOAD_PATH"))?;

        let ytdlp_bin = get("YTDLP_BIN")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("yt-dlp"));

        Ok(Self {
            telegram_token,
            download_dir,
            ytdlp_bin,
        })
    }

    /// Create the download directory if it does not exist yet. An unwritable
    /// path fails here, at startup, rather than as opaque downloader errors
    /// later.
    pub fn ensure_download_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.download_dir).map_err(|e| ConfigError::CreateDownloadDir {
            path: self.download_dir.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        Config::from_lookup(|key| map.get(key).map(|v| (*v).to_string()))
    }

    fn assert_err(result: Result<Config, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = load(&[
            ("TELEGRAM_TOKEN", "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"),
            ("DOWNLOAD_PATH", "/tmp/downloads"),
        ])
        .expect("should load valid config");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/downloads"));
        assert_eq!(config.ytdlp_bin, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn test_ytdlp_bin_override() {
        let config = load(&[
            ("TELEGRAM_TOKEN", "123456789:ABCdef"),
            ("DOWNLOAD_PATH", "/tmp/downloads"),
            ("YTDLP_BIN", "/opt/yt-dlp/yt-dlp"),
        ])
        .expect("should load valid config");
        assert_eq!(config.ytdlp_bin, PathBuf::from("/opt/yt-dlp/yt-dlp"));
    }

    #[test]
    fn test_missing_token() {
        let err = assert_err(load(&[("DOWNLOAD_PATH", "/tmp/downloads")]));
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_TOKEN")));
    }

    #[test]
    fn test_empty_token() {
        let err = assert_err(load(&[
            ("TELEGRAM_TOKEN", ""),
            ("DOWNLOAD_PATH", "/tmp/downloads"),
        ]));
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_TOKEN")));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let err = assert_err(load(&[
            ("TELEGRAM_TOKEN", "invalid_token_no_colon"),
            ("DOWNLOAD_PATH", "/tmp/downloads"),
        ]));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let err = assert_err(load(&[
            ("TELEGRAM_TOKEN", "notanumber:ABCdef"),
            ("DOWNLOAD_PATH", "/tmp/downloads"),
        ]));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_download_path() {
        let err = assert_err(load(&[("TELEGRAM_TOKEN", "123456789:ABCdef")]));
        assert!(matches!(err, ConfigError::Missing("DOWNLOAD_PATH")));
    }

    #[test]
    fn test_ensure_download_dir_creates_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            telegram_token: "123456789:ABCdef".to_string(),
            download_dir: dir.path().join("media").join("video"),
            ytdlp_bin: PathBuf::from("yt-dlp"),
        };

        config.ensure_download_dir().expect("should create directory");
        assert!(config.download_dir.is_dir());
    }

    #[test]
    fn test_ensure_download_dir_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let occupied = dir.path().join("occupied");
        std::fs::write(&occupied, b"not a directory").unwrap();

        let config = Config {
            telegram_token: "123456789:ABCdef".to_string(),
            download_dir: occupied.join("sub"),
            ytdlp_bin: PathBuf::from("yt-dlp"),
        };

        let err = assert_err(config.ensure_download_dir().map(|()| config));
        assert!(matches!(err, ConfigError::CreateDownloadDir { .. }));
        assert!(err.to_string().contains("download directory"));
    }
}
