// Configuration loading and parsing (board.toml).

use chrono::NaiveTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Board data endpoint consumed by the fetch client.
    pub endpoint_url: String,
    pub schedule: ScheduleConfig,
    pub coordination: CoordinationConfig,
}

/// Polling cadence and quiet-window boundaries.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Seconds between polls while the board is active.
    pub poll_interval_secs: u64,
    /// Seconds until the next attempt after a failed fetch.
    pub retry_delay_secs: u64,
    /// Daily time the quiet window opens (polling suppressed).
    pub quiet_start: NaiveTime,
    /// Daily time the quiet window closes (polling resumes).
    pub quiet_end: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct CoordinationConfig {
    /// Out-of-band activation key gating priority mode.
    pub secret_key: String,
    /// Override for the shared lease directory. When `None` the per-user
    /// runtime directory is used.
    pub lease_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// board.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire board.toml file.
#[derive(Debug, Clone, Deserialize)]
struct BoardFile {
    endpoint: EndpointSection,
    schedule: ScheduleSection,
    coordination: CoordinationSection,
}

#[derive(Debug, Clone, Deserialize)]
struct EndpointSection {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ScheduleSection {
    poll_interval_secs: u64,
    retry_delay_secs: u64,
    quiet_start: String,
    quiet_end: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CoordinationSection {
    secret_key: String,
    #[serde(default)]
    lease_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/board.toml` relative to the
/// given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization
/// automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let board_path = base_dir.join("config").join("board.toml");
    let board_text = read_file(&board_path)?;
    let board_file: BoardFile =
        toml::from_str(&board_text).map_err(|e| ConfigError::ParseError {
            path: board_path.clone(),
            source: e,
        })?;

    let quiet_start = parse_time_of_day("schedule.quiet_start", &board_file.schedule.quiet_start)?;
    let quiet_end = parse_time_of_day("schedule.quiet_end", &board_file.schedule.quiet_end)?;

    let config = Config {
        endpoint_url: board_file.endpoint.url,
        schedule: ScheduleConfig {
            poll_interval_secs: board_file.schedule.poll_interval_secs,
            retry_delay_secs: board_file.schedule.retry_delay_secs,
            quiet_start,
            quiet_end,
        },
        coordination: CoordinationConfig {
            secret_key: board_file.coordination.secret_key,
            lease_dir: board_file.coordination.lease_dir.map(PathBuf::from),
        },
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory. Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_time_of_day(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| ConfigError::ValidationError {
        field: field.to_string(),
        message: format!("must be a time of day in HH:MM format, got `{value}`"),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.endpoint_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "endpoint.url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.schedule.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "schedule.poll_interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.schedule.retry_delay_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "schedule.retry_delay_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.schedule.quiet_start == config.schedule.quiet_end {
        return Err(ConfigError::ValidationError {
            field: "schedule.quiet_start".into(),
            message: "quiet window must not be zero-length (start == end)".into(),
        });
    }

    if config.coordination.secret_key.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "coordination.secret_key".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_BOARD_TOML: &str = r#"
[endpoint]
url = "http://localhost:3000/api/houses"

[schedule]
poll_interval_secs = 30
retry_delay_secs = 3
quiet_start = "16:30"
quiet_end = "07:30"

[coordination]
secret_key = "+9F3A7-1CDE4-B82F0-64A9C-5DBE1"
"#;

    fn sandbox(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("hillboard_config_{name}"));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config() {
        let tmp = sandbox("valid");
        fs::write(tmp.join("config/board.toml"), VALID_BOARD_TOML).unwrap();

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.endpoint_url, "http://localhost:3000/api/houses");
        assert_eq!(config.schedule.poll_interval_secs, 30);
        assert_eq!(config.schedule.retry_delay_secs, 3);
        assert_eq!(
            config.schedule.quiet_start,
            NaiveTime::from_hms_opt(16, 30, 0).unwrap()
        );
        assert_eq!(
            config.schedule.quiet_end,
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(
            config.coordination.secret_key,
            "+9F3A7-1CDE4-B82F0-64A9C-5DBE1"
        );
        assert!(config.coordination.lease_dir.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn lease_dir_is_optional_but_read() {
        let tmp = sandbox("lease_dir");
        let toml = VALID_BOARD_TOML.replace(
            "[coordination]",
            "[coordination]\nlease_dir = \"/tmp/hillboard-lease\"",
        );
        fs::write(tmp.join("config/board.toml"), toml).unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(
            config.coordination.lease_dir.as_deref(),
            Some(Path::new("/tmp/hillboard-lease"))
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_endpoint_url() {
        let tmp = sandbox("empty_url");
        let toml = VALID_BOARD_TOML.replace(
            "url = \"http://localhost:3000/api/houses\"",
            "url = \"\"",
        );
        fs::write(tmp.join("config/board.toml"), toml).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "endpoint.url"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let tmp = sandbox("zero_interval");
        let toml = VALID_BOARD_TOML.replace("poll_interval_secs = 30", "poll_interval_secs = 0");
        fs::write(tmp.join("config/board.toml"), toml).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "schedule.poll_interval_secs");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_retry_delay() {
        let tmp = sandbox("zero_retry");
        let toml = VALID_BOARD_TOML.replace("retry_delay_secs = 3", "retry_delay_secs = 0");
        fs::write(tmp.join("config/board.toml"), toml).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "schedule.retry_delay_secs");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_malformed_quiet_start() {
        let tmp = sandbox("bad_time");
        let toml = VALID_BOARD_TOML.replace("quiet_start = \"16:30\"", "quiet_start = \"4:30pm\"");
        fs::write(tmp.join("config/board.toml"), toml).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "schedule.quiet_start");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_length_quiet_window() {
        let tmp = sandbox("zero_window");
        let toml = VALID_BOARD_TOML.replace("quiet_end = \"07:30\"", "quiet_end = \"16:30\"");
        fs::write(tmp.join("config/board.toml"), toml).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "schedule.quiet_start");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_secret_key() {
        let tmp = sandbox("empty_key");
        let toml = VALID_BOARD_TOML.replace(
            "secret_key = \"+9F3A7-1CDE4-B82F0-64A9C-5DBE1\"",
            "secret_key = \"\"",
        );
        fs::write(tmp.join("config/board.toml"), toml).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "coordination.secret_key");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_board_toml() {
        let tmp = sandbox("missing");
        // config/ exists but board.toml does not
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("board.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = sandbox("invalid_toml");
        fs::write(tmp.join("config/board.toml"), "this is not valid [[[ toml").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("board.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("hillboard_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join("board.toml"), VALID_BOARD_TOML).unwrap();
        // Example file that should NOT be copied
        fs::write(defaults_dir.join("board.toml.example"), "# template\n").unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/board.toml").exists());
        assert!(!tmp.join("config/board.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("hillboard_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);

        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/board.toml"), VALID_BOARD_TOML).unwrap();
        fs::write(tmp.join("config/board.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());

        // Original custom content should be preserved
        let content = fs::read_to_string(tmp.join("config/board.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("hillboard_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
