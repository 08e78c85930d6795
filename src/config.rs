//! Configuration management for the Cylc language server.
//!
//! Handles:
//! - Command-line argument parsing
//! - The optional TOML config file
//! - Validator and linter settings

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lint::DEFAULT_MAX_LINE_LENGTH;
use crate::validation::engine::{ValidationMode, DEFAULT_VALIDATE_TIMEOUT};

/// Command-line arguments for the Cylc language server
#[derive(Debug, Default, Parser)]
#[command(name = "cylc-language-server")]
#[command(about = "Language server for Cylc workflow configurations")]
#[command(version)]
pub struct Args {
    /// Config file to read instead of the default location
    #[arg(long, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    /// Validator executable
    #[arg(long, help = "Program used to validate workflows (default: cylc)")]
    pub validator: Option<String>,

    #[arg(long, help = "Seconds before a validator run is abandoned")]
    pub validate_timeout: Option<u64>,

    #[arg(long, help = "Only lint on open and change, never run the validator")]
    pub lint_only: bool,

    #[arg(long, help = "Maximum line length accepted by the linter")]
    pub max_line_length: Option<usize>,

    /// Log level for the language server
    #[arg(long, help = "Log level (trace, debug, info, warn, error)")]
    pub log_level: Option<String>,
}

/// Contents of the config file; every key is optional
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub validator: Option<String>,
    pub validator_args: Option<Vec<String>>,
    pub validate_timeout_secs: Option<u64>,
    pub lint_only: Option<bool>,
    pub max_line_length: Option<usize>,
    pub log_level: Option<String>,
}

/// Combined configuration from all sources
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub validator: String,
    pub validator_args: Vec<String>,
    pub validate_timeout: Duration,
    pub lint_only: bool,
    pub max_line_length: usize,
    pub log_level: String,
    /// Config file that was read, if any
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            validator: "cylc".to_string(),
            validator_args: vec!["validate".to_string()],
            validate_timeout: DEFAULT_VALIDATE_TIMEOUT,
            lint_only: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            log_level: "info".to_string(),
            config_file: None,
        }
    }
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => Some((path.clone(), Self::load_file(path)?)),
            None => match Self::default_config_path().filter(|path| path.is_file()) {
                Some(path) => {
                    let file = Self::load_file(&path)?;
                    Some((path, file))
                }
                None => None,
            },
        };

        let mut config = Config::default();

        if let Some((path, file)) = file {
            log::debug!("Using config file {}", path.display());
            config.apply_file(file);
            config.config_file = Some(path);
        }

        // Command line wins over the file
        if let Some(validator) = args.validator {
            config.validator = validator;
        }
        if let Some(secs) = args.validate_timeout {
            config.validate_timeout = Duration::from_secs(secs);
        }
        if args.lint_only {
            config.lint_only = true;
        }
        if let Some(max) = args.max_line_length {
            config.max_line_length = max;
        }
        if let Some(level) = args.log_level {
            config.log_level = level;
        }

        Ok(config)
    }

    /// `<config dir>/cylc-ls/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cylc-ls").join("config.toml"))
    }

    pub fn load_file(path: &Path) -> Result<FileConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(validator) = file.validator {
            self.validator = validator;
        }
        if let Some(args) = file.validator_args {
            self.validator_args = args;
        }
        if let Some(secs) = file.validate_timeout_secs {
            self.validate_timeout = Duration::from_secs(secs);
        }
        if let Some(lint_only) = file.lint_only {
            self.lint_only = lint_only;
        }
        if let Some(max) = file.max_line_length {
            self.max_line_length = max;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
    }

    /// Mode used for automatic cycles on open, change and save
    pub fn validation_mode(&self) -> ValidationMode {
        if self.lint_only {
            ValidationMode::LintOnly
        } else {
            ValidationMode::Full
        }
    }
}
