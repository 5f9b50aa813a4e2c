//! Application configuration
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/cchat/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default backend URL
const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Effective application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chat backend
    pub server_url: String,
    /// Milliseconds per revealed character in the streaming transcript
    pub reveal_speed_ms: u64,
    /// Demo mode: play a scripted response instead of contacting a backend
    pub demo_mode: bool,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Also write JSON logs to rotating files
    pub file_enabled: bool,
    /// Directory for log files
    pub file_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: default_log_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reveal_speed_ms: crate::reveal::DEFAULT_REVEAL_SPEED_MS,
            demo_mode: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, overlaid by the config file, overlaid
    /// by environment variables.
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Some(file) = FileConfig::read() {
            config.apply_file(file);
        }
        config.apply_env();
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.server_url {
            self.server_url = url;
        }
        if let Some(ms) = file.reveal_speed_ms {
            self.reveal_speed_ms = ms;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(enabled) = logging.file_enabled {
                self.logging.file_enabled = enabled;
            }
            if let Some(dir) = logging.file_dir {
                self.logging.file_dir = dir;
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CCHAT_SERVER_URL") {
            self.server_url = url;
        }
        if let Ok(ms) = std::env::var("CCHAT_REVEAL_MS") {
            match ms.parse() {
                Ok(parsed) => self.reveal_speed_ms = parsed,
                Err(_) => eprintln!("Warning: invalid CCHAT_REVEAL_MS value: {ms}"),
            }
        }
        if let Ok(demo) = std::env::var("CCHAT_DEMO") {
            self.demo_mode = demo == "1" || demo.eq_ignore_ascii_case("true");
        }
        if let Ok(level) = std::env::var("CCHAT_LOG") {
            self.logging.level = level;
        }
    }

    pub fn reveal_speed(&self) -> Duration {
        Duration::from_millis(self.reveal_speed_ms.max(1))
    }

    /// Path of the config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cchat").join("config.toml"))
    }

    /// Write a commented template on first run so options are discoverable.
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };
        if path.exists() {
            return;
        }
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let _ = std::fs::write(path, CONFIG_TEMPLATE);
    }

    /// Effective configuration rendered for `cchat config --show`.
    pub fn render(&self) -> String {
        format!(
            "server_url = {:?}\nreveal_speed_ms = {}\ndemo_mode = {}\n\n[logging]\nlevel = {:?}\nfile_enabled = {}\nfile_dir = {:?}\n",
            self.server_url,
            self.reveal_speed_ms,
            self.demo_mode,
            self.logging.level,
            self.logging.file_enabled,
            self.logging.file_dir,
        )
    }
}

/// Raw config file shape; every field optional so partial files work.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server_url: Option<String>,
    reveal_speed_ms: Option<u64>,
    logging: Option<FileLogging>,
}

#[derive(Debug, Deserialize)]
struct FileLogging {
    level: Option<String>,
    file_enabled: Option<bool>,
    file_dir: Option<PathBuf>,
}

impl FileConfig {
    fn read() -> Option<Self> {
        let path = Config::config_path()?;
        let contents = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&contents) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                eprintln!("Warning: ignoring malformed config {path:?}: {err}");
                None
            }
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cchat")
        .join("logs")
}

const CONFIG_TEMPLATE: &str = r#"# cchat configuration
# Values here override the defaults; environment variables override both.

# Base URL of the chat backend
# server_url = "http://localhost:8000"

# Milliseconds per revealed character while streaming (lower = faster)
# reveal_speed_ms = 12

[logging]
# Log level: trace, debug, info, warn, error
# level = "info"

# Also write JSON logs to rotating files
# file_enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.reveal_speed_ms, 12);
        assert!(!config.demo_mode);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_overlay() {
        let mut config = Config::default();
        let file: FileConfig = toml::from_str(
            r#"
            server_url = "http://example.com:9000"
            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        config.apply_file(file);
        assert_eq!(config.server_url, "http://example.com:9000");
        assert_eq!(config.logging.level, "debug");
        // Untouched fields keep their defaults
        assert_eq!(config.reveal_speed_ms, 12);
        assert!(!config.logging.file_enabled);
    }

    #[test]
    fn test_partial_file_parses() {
        let file: Result<FileConfig, _> = toml::from_str("reveal_speed_ms = 5");
        assert_eq!(file.unwrap().reveal_speed_ms, Some(5));
    }

    #[test]
    fn test_reveal_speed_never_zero() {
        let mut config = Config::default();
        config.reveal_speed_ms = 0;
        assert_eq!(config.reveal_speed(), Duration::from_millis(1));
    }

    #[test]
    fn test_template_is_valid_toml() {
        // The commented template must parse once uncommented defaults are used
        let parsed: Result<FileConfig, _> = toml::from_str(CONFIG_TEMPLATE);
        assert!(parsed.is_ok());
    }
}
