//! Command-line interface and resolved server settings
//!
//! Every setting resolves CLI flag → environment variable → TOML file →
//! compiled default. clap handles the first two via `env = ...`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sonalyze_common::config::{CompiledDefaults, RootFolderResolver, TomlConfig};

/// Command-line arguments for sonalyze-web
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "sonalyze-web")]
#[command(about = "Audio upload analysis web application")]
#[command(version)]
pub struct Cli {
    /// Root folder holding the database, uploads and charts
    /// (also read from SONALYZE_ROOT_FOLDER)
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// TOML config file (defaults to the platform config location)
    #[arg(short, long, env = "SONALYZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "SONALYZE_BIND")]
    pub bind: Option<String>,

    /// Maximum upload size in megabytes
    #[arg(long, env = "SONALYZE_MAX_UPLOAD_MB")]
    pub max_upload_mb: Option<u64>,

    /// Seconds allowed for decoding and analysing one upload
    #[arg(long, env = "SONALYZE_ANALYSIS_TIMEOUT_SECS")]
    pub analysis_timeout_secs: Option<u64>,

    /// Frames below this RMS level (dBFS) count as silence
    #[arg(long, env = "SONALYZE_SILENCE_THRESHOLD_DB", allow_hyphen_values = true)]
    pub silence_threshold_db: Option<f32>,

    /// Drop and recreate all tables at startup
    #[arg(long, env = "SONALYZE_RESET_DATABASE")]
    pub reset_database: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    pub write_config: bool,
}

/// Fully resolved settings the server runs with
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub max_upload_bytes: usize,
    pub analysis_timeout: Duration,
    pub silence_threshold_db: f32,
    pub reset_database: bool,
    pub log_level: String,
}

impl ServerSettings {
    pub fn resolve(cli: &Cli, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder = RootFolderResolver::new()
            .with_cli_arg(cli.root_folder.clone())
            .with_toml(toml)
            .resolve();

        let max_upload_mb = cli
            .max_upload_mb
            .or(toml.max_upload_mb)
            .unwrap_or(defaults.max_upload_mb);
        let timeout_secs = cli
            .analysis_timeout_secs
            .or(toml.analysis_timeout_secs)
            .unwrap_or(defaults.analysis_timeout_secs);

        Self {
            root_folder,
            bind_address: cli
                .bind
                .clone()
                .or_else(|| toml.bind_address.clone())
                .unwrap_or(defaults.bind_address),
            max_upload_bytes: (max_upload_mb as usize).saturating_mul(1024 * 1024),
            analysis_timeout: Duration::from_secs(timeout_secs.max(1)),
            silence_threshold_db: cli
                .silence_threshold_db
                .or(toml.silence_threshold_db)
                .unwrap_or(defaults.silence_threshold_db),
            reset_database: cli.reset_database || toml.reset_database.unwrap_or(false),
            log_level: toml.logging.level.clone(),
        }
    }

    /// Settings as a TOML document (for `--write-config`)
    pub fn to_toml(&self) -> TomlConfig {
        TomlConfig {
            root_folder: Some(self.root_folder.clone()),
            bind_address: Some(self.bind_address.clone()),
            max_upload_mb: Some((self.max_upload_bytes / (1024 * 1024)) as u64),
            analysis_timeout_secs: Some(self.analysis_timeout.as_secs()),
            silence_threshold_db: Some(self.silence_threshold_db),
            reset_database: Some(self.reset_database),
            logging: sonalyze_common::config::LoggingConfig {
                level: self.log_level.clone(),
            },
        }
    }
}
