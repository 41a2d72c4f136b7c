use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
    /// Used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: default_log_file_prefix(),
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// Minutes charged for every wrong attempt before a problem is solved.
    #[serde(default = "default_penalty_per_wrong")]
    pub penalty_per_wrong: i64,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            penalty_per_wrong: default_penalty_per_wrong(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_penalty_per_wrong() -> i64 {
    20
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_file_prefix() -> String {
    "scoreboard.log".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

pub fn parse_board_config(raw: &str) -> Result<BoardConfig, String> {
    toml::from_str::<BoardConfig>(raw).map_err(|err| format!("Failed to parse config: {err}"))
}

pub fn load_board_config(config_path: &Path) -> Result<BoardConfig, String> {
    if !config_path.exists() {
        info!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        return Ok(BoardConfig::default());
    }

    let raw = fs::read_to_string(config_path).map_err(|err| {
        format!(
            "Failed to read config at {}: {}",
            config_path.display(),
            err
        )
    })?;

    parse_board_config(&raw)
        .map_err(|err| format!("{} ({})", err, config_path.display()))
}
