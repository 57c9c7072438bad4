//! Configuration loading and library folder resolution
//!
//! Bootstrap configuration lives in a small TOML file. Every setting has a
//! built-in default, so a missing file is never fatal; a file that exists but
//! cannot be parsed is.
//!
//! # Resolution priority
//!
//! Config file:
//! 1. Command-line argument (highest priority)
//! 2. `MUSE_CONFIG` environment variable
//! 3. `<config dir>/muse/config.toml`
//! 4. None (compiled defaults)
//!
//! Library folder:
//! 1. Command-line argument
//! 2. `MUSE_LIBRARY` environment variable
//! 3. `library_folder` in the TOML file
//! 4. OS-dependent compiled default (`~/Music`)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MUSE_CONFIG";

/// Environment variable naming the library folder
pub const LIBRARY_ENV_VAR: &str = "MUSE_LIBRARY";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder scanned for tracks (optional)
    #[serde(default)]
    pub library_folder: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Raw `[playback]` table, deserialized by the run engine into its own type
    #[serde(default)]
    pub playback: Option<toml::Table>,
}

impl TomlConfig {
    /// Deserialize the `[playback]` section into `T`, falling back to `T::default()`
    /// when the section is absent.
    pub fn playback_section<T>(&self) -> Result<T>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        match &self.playback {
            Some(table) => toml::Value::Table(table.clone())
                .try_into()
                .map_err(|e| Error::Config(format!("Invalid [playback] section: {}", e))),
            None => Ok(T::default()),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled-in defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub library_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            library_folder: default_library_folder(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// OS-dependent default library folder (`~/Music`)
pub fn default_library_folder() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
        .unwrap_or_else(|| PathBuf::from("./Music"))
}

/// Default per-user config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("muse").join("config.toml"))
}

/// Resolves which config file to load
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Resolve the config file path, or None when no candidate exists
    ///
    /// Explicit paths (CLI, environment) are returned even if the file is
    /// missing, so the loader can warn about them.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_path().filter(|path| path.exists())
    }

    /// Resolve and load in one step
    pub fn load(&self) -> Result<TomlConfig> {
        match self.resolve() {
            Some(path) => load_config(&path),
            None => {
                info!("No config file found, using built-in defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Load a TOML config file
///
/// A missing file logs a warning and yields defaults. A file that cannot be
/// read or parsed is an error.
pub fn load_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file {:?} not found, using built-in defaults", path);
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", path, e)))?;

    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Resolves the library folder following the documented priority order
pub struct LibraryFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    toml: Option<&'a TomlConfig>,
}

impl<'a> LibraryFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, toml: Option<&'a TomlConfig>) -> Self {
        Self { cli_arg, toml }
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(LIBRARY_ENV_VAR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(folder) = self.toml.and_then(|t| t.library_folder.clone()) {
            return folder;
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().library_folder
    }
}
