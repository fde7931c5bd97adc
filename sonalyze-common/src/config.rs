//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `SONALYZE_ROOT_FOLDER`
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is not an error; compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SONALYZE_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "sonalyze.db";

/// Raw upload directory inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Publicly served directory inside the root folder
pub const STATIC_DIR: &str = "static";

/// Chart directory inside the static directory
pub const CHARTS_DIR: &str = "charts";

/// Compiled defaults used when no other configuration source applies
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub max_upload_mb: u64,
    pub analysis_timeout_secs: u64,
    pub silence_threshold_db: f32,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_address: "127.0.0.1:5740".to_string(),
            max_upload_mb: 50,
            analysis_timeout_secs: 120,
            silence_threshold_db: -40.0,
        }
    }
}

/// `[logging]` table of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// On-disk TOML configuration
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub max_upload_mb: Option<u64>,
    pub analysis_timeout_secs: Option<u64>,
    pub silence_threshold_db: Option<f32>,
    /// Drop and recreate all tables at startup
    pub reset_database: Option<bool>,
    pub logging: LoggingConfig,
}

/// Locate the TOML config file for this platform
///
/// Linux checks `~/.config/sonalyze/config.toml` then `/etc/sonalyze/config.toml`.
/// Other platforms check only the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = user_config_path() {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/sonalyze/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Per-user config file location, whether or not it exists
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sonalyze").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config from `explicit` or the platform location
///
/// Returns `Ok(None)` when no config file exists. A file that exists but
/// cannot be read or parsed is an error; callers log it and continue with
/// compiled defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<TomlConfig>> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => {
                debug!("No config file found, using compiled defaults");
                return Ok(None);
            }
        },
    };

    let config = load_toml_config(&path)?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(Some(config))
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sonalyze"))
        .unwrap_or_else(|| PathBuf::from("./sonalyze_data"))
}

/// Resolves the root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates and describes the root folder layout
///
/// ```text
/// <root>/sonalyze.db
/// <root>/uploads/
/// <root>/static/charts/<content hash>/*.png
/// ```
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder and its subdirectories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.uploads_dir())?;
        std::fs::create_dir_all(self.charts_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.root.join(STATIC_DIR)
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.static_dir().join(CHARTS_DIR)
    }
}
