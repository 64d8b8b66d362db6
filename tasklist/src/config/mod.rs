//! Configuration system for the `Tasklist` CLI.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasklist/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tasklist_proto::task::{DEFAULT_STORAGE_KEY, MAX_TASK_TEXT_LENGTH};

use crate::tasks::TaskLimits;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    tasks: TasksFileConfig,
    watch: WatchFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
    key: Option<String>,
}

/// `[tasks]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TasksFileConfig {
    max_text_len: Option<usize>,
}

/// `[watch]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct WatchFileConfig {
    interval_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct TasklistConfig {
    /// Directory holding the durable store.
    pub data_dir: PathBuf,
    /// Key the task collection is stored under.
    pub storage_key: String,
    /// Maximum task text length in characters.
    pub max_text_len: usize,
    /// How often `watch` polls the store for external changes.
    pub watch_interval: Duration,
}

impl Default for TasklistConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_text_len: MAX_TASK_TEXT_LENGTH,
            watch_interval: Duration::from_millis(500),
        }
    }
}

impl TasklistConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path
    /// (`~/.config/tasklist/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `TasklistConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        let watch_interval = match &cli.command {
            Some(Command::Watch {
                interval_ms: Some(ms),
            }) => Some(*ms),
            _ => None,
        }
        .or(file.watch.interval_ms)
        .map_or(defaults.watch_interval, Duration::from_millis);

        Self {
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            storage_key: cli
                .key
                .clone()
                .or_else(|| file.storage.key.clone())
                .unwrap_or(defaults.storage_key),
            max_text_len: file.tasks.max_text_len.unwrap_or(defaults.max_text_len),
            watch_interval,
        }
    }

    /// Validation limits for the task manager.
    #[must_use]
    pub const fn task_limits(&self) -> TaskLimits {
        TaskLimits {
            max_text_len: self.max_text_len,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Persisted task list")]
pub struct CliArgs {
    /// Directory holding the task store (default: platform data dir).
    #[arg(long, env = "TASKLIST_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage key for the task list.
    #[arg(long, env = "TASKLIST_KEY", global = true)]
    pub key: Option<String>,

    /// Path to config file (default: `~/.config/tasklist/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "TASKLIST_LOG", global = true)]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do (default: `list`).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands of the `tasklist` binary.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show all tasks.
    List,
    /// Add a task; the words are joined with spaces.
    Add {
        /// Task text.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Flip a task between open and completed.
    Toggle {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Delete a task.
    Delete {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Show tasks and refresh whenever another process changes them.
    Watch {
        /// Poll interval in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(|| PathBuf::from(".tasklist"), |dir| dir.join("tasklist"))
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tasklist").join("config.toml"))
}

/// Reads the TOML config file.
///
/// An explicit path must exist. The default location is optional and
/// yields an empty `ConfigFile` when absent.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let (path, required) = match explicit_path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(ConfigFile::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if !required && e.kind() == ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
