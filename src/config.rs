//! Configuration loading.
//!
//! Settings come from a TOML file: the path given on the command line, else
//! `<config dir>/mgmtutil/config.toml` when it exists, else built-in defaults.

use crate::error::{MgmtError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "mgmtutil";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Reset control number used when neither the config nor the command line names one.
pub const DEFAULT_RESET_CONTROL: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub hpi: HpiConfig,
    pub console: ConsoleConfig,
}

/// Management domain settings for `hpireset`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HpiConfig {
    /// Domain description file backing the session.
    pub domain_file: Option<PathBuf>,
    /// Number of the digital control that resets the chassis.
    pub reset_control: u32,
}

impl Default for HpiConfig {
    fn default() -> Self {
        Self {
            domain_file: None,
            reset_control: DEFAULT_RESET_CONTROL,
        }
    }
}

/// Serial-over-LAN console input settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Escape character that, at the start of a line and followed by `.`, ends the session.
    pub escape_char: char,
    /// Number of pending input chunks the listener may queue before it blocks.
    pub buffer_capacity: usize,
    /// How long the listener waits for a console event per poll.
    pub poll_interval_ms: u64,
    /// Put the console in raw mode for the session.
    pub raw_mode: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            escape_char: '~',
            buffer_capacity: 64,
            poll_interval_ms: 20,
            raw_mode: true,
        }
    }
}

impl ConsoleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.escape_char.is_ascii() {
            return Err(MgmtError::config(format!(
                "escape_char must be ASCII, got {:?}",
                self.escape_char
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(MgmtError::config("buffer_capacity must be greater than 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(MgmtError::config("poll_interval_ms must be greater than 0"));
        }
        Ok(())
    }
}

impl Config {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| MgmtError::config(e.message().to_string()))?;
        config.console.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MgmtError::io(format!("Cannot read config file {}", path.display()), e)
        })?;
        Self::from_toml_str(&text)
    }

    /// Default location of the config file, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the explicit file if given, else the default file if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}
