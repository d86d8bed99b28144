//! Multi-tier TOML configuration for eventline.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use eventline_core::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, ReconnectConfig};
use eventline_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How the CLI prints dispatched events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A header line per event followed by its indented data lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                key: "format".into(),
                message: format!("expected 'text' or 'json', got '{other}'"),
            }),
        }
    }
}

/// Resolved configuration for one eventline run.
#[derive(Debug, Clone)]
pub struct EventlineConfig {
    pub format: OutputFormat,
    pub buffer_size: usize,
    pub reconnect: ReconnectConfig,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSettings {
    pub buffer_size: Option<usize>,
}

/// Reconnect section of the config file. Unset keys keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconnectSettings {
    pub default_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub format: Option<String>,
    pub buffer_size: Option<usize>,
}

impl EventlineConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables (`EVENTLINE_FORMAT`, `EVENTLINE_BUFFER_SIZE`)
    /// 3. Config file (~/.eventline/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::load_from(config_dir(), overrides, |key| std::env::var(key).ok())
    }

    fn load_from(
        config_dir: PathBuf,
        overrides: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let settings = load_settings_file(&config_dir.join("config.toml"));

        // Resolve output format: CLI > env > config file
        let format = match overrides.format.or_else(|| env("EVENTLINE_FORMAT")) {
            Some(raw) => raw.parse()?,
            None => settings.output.format.unwrap_or_default(),
        };

        // Resolve buffer size: CLI > env > config file
        let buffer_size = match overrides.buffer_size {
            Some(size) => size,
            None => match env("EVENTLINE_BUFFER_SIZE") {
                Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "EVENTLINE_BUFFER_SIZE".into(),
                    message: format!("{e}"),
                })?,
                None => settings.source.buffer_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            },
        };
        if buffer_size == 0 || buffer_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidValue {
                key: "buffer_size".into(),
                message: format!("must be between 1 and {MAX_CHUNK_SIZE}, got {buffer_size}"),
            });
        }

        let reconnect = resolve_reconnect(settings.reconnect)?;

        Ok(EventlineConfig {
            format,
            buffer_size,
            reconnect,
            config_dir,
        })
    }
}

fn resolve_reconnect(settings: ReconnectSettings) -> Result<ReconnectConfig, ConfigError> {
    let defaults = ReconnectConfig::default();
    let config = ReconnectConfig {
        default_delay_ms: settings
            .default_delay_ms
            .unwrap_or(defaults.default_delay_ms),
        max_delay_ms: settings.max_delay_ms.unwrap_or(defaults.max_delay_ms),
    };

    if config.default_delay_ms > config.max_delay_ms {
        return Err(ConfigError::InvalidValue {
            key: "reconnect.default_delay_ms".into(),
            message: format!(
                "{} exceeds max_delay_ms ({})",
                config.default_delay_ms, config.max_delay_ms
            ),
        });
    }
    Ok(config)
}

/// Get the eventline config directory path (~/.eventline/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EVENTLINE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eventline")
}

/// Parse the contents of a TOML settings file.
pub fn parse_settings(path: &Path, content: &str) -> Result<SettingsFile, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_settings(path, &content).unwrap_or_else(|e| {
            tracing::warn!("{e}");
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}
