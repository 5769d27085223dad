//! Layered configuration: CLI flags and their environment variables take
//! precedence over `~/.config/deadline-tracker/config.toml`, which takes
//! precedence over compiled defaults.
//!
//! A missing default config file is not an error. An explicit `--config`
//! path that cannot be read or parsed is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reminder::DEFAULT_REMINDER_INTERVAL;
use crate::store::TaskStore;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    reminders: RemindersFileConfig,
    storage: StorageFileConfig,
    ui: UiFileConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemindersFileConfig {
    interval_secs: Option<u64>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Period between polls of each task's reminder.
    pub reminder_interval: Duration,
    /// JSON file holding the task collection.
    pub store_path: PathBuf,
    /// How long the UI waits for a key press before running reminders again.
    pub poll_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            reminder_interval: DEFAULT_REMINDER_INTERVAL,
            store_path: TaskStore::default_path(),
            poll_timeout: Duration::from_millis(250),
        }
    }
}

impl TrackerConfig {
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            reminder_interval: cli
                .interval_secs
                .or(file.reminders.interval_secs)
                .filter(|secs| *secs > 0)
                .map_or(defaults.reminder_interval, Duration::from_secs),
            store_path: cli
                .store
                .clone()
                .or_else(|| file.storage.path.clone())
                .unwrap_or(defaults.store_path),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
        }
    }
}

#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal task tracker with overdue reminders")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/deadline-tracker/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Task file to use instead of the configured one.
    #[arg(long, global = true, env = "DEADLINE_TRACKER_STORE")]
    pub store: Option<PathBuf>,

    /// Seconds between reminder checks for each task.
    #[arg(long, global = true)]
    pub interval_secs: Option<u64>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "DEADLINE_TRACKER_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/deadline-tracker.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a task.
    Add(TaskArgs),
    /// List tasks with their state.
    List,
    /// Toggle completion of the task at a 1-based position.
    Done { position: usize },
    /// Delete the task at a 1-based position.
    Rm { position: usize },
    /// Replace the task at a 1-based position.
    Edit {
        position: usize,
        #[command(flatten)]
        task: TaskArgs,
    },
    /// Print a reminder for every overdue task.
    Check,
    /// Run reminders without the interactive UI, printing to stdout.
    Watch,
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct TaskArgs {
    pub text: String,
    /// Due date, YYYY-MM-DD.
    pub date: String,
    /// Due time on a 12-hour clock, H:MM.
    pub time: String,
    /// AM or PM.
    pub meridiem: String,
}

/// An explicit path must be readable and valid. The default location is
/// optional, but a file that exists there must parse.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    match explicit_path {
        Some(path) => read_config_file(path),
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path),
            _ => Ok(ConfigFile::default()),
        },
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("deadline-tracker").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.reminder_interval, Duration::from_secs(120));
        assert_eq!(config.poll_timeout, Duration::from_millis(250));
        assert!(config.store_path.ends_with("tasks.json"));
    }

    #[test]
    fn toml_parsing_full() {
        let toml_str = r#"
[reminders]
interval_secs = 30

[storage]
path = "/tmp/my-tasks.json"

[ui]
poll_timeout_ms = 100
"#;
        let file: ConfigFile = toml::from_str(toml_str).unwrap();
        let config = TrackerConfig::resolve(&CliArgs::default(), &file);
        assert_eq!(config.reminder_interval, Duration::from_secs(30));
        assert_eq!(config.store_path, PathBuf::from("/tmp/my-tasks.json"));
        assert_eq!(config.poll_timeout, Duration::from_millis(100));
    }

    #[test]
    fn toml_parsing_empty() {
        let file: ConfigFile = toml::from_str("").unwrap();
        let config = TrackerConfig::resolve(&CliArgs::default(), &file);
        assert_eq!(config.reminder_interval, DEFAULT_REMINDER_INTERVAL);
    }

    #[test]
    fn zero_interval_is_ignored() {
        let file: ConfigFile = toml::from_str("[reminders]\ninterval_secs = 0\n").unwrap();
        let config = TrackerConfig::resolve(&CliArgs::default(), &file);
        assert_eq!(config.reminder_interval, DEFAULT_REMINDER_INTERVAL);
    }

    #[test]
    fn cli_overrides_file() {
        let file: ConfigFile =
            toml::from_str("[reminders]\ninterval_secs = 30\n[storage]\npath = \"file.json\"\n")
                .unwrap();
        let cli = CliArgs {
            interval_secs: Some(5),
            store: None,
            ..Default::default()
        };
        let config = TrackerConfig::resolve(&cli, &file);
        assert_eq!(config.reminder_interval, Duration::from_secs(5));
        assert_eq!(config.store_path, PathBuf::from("file.json"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let err = load_config_file(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn explicit_unparsable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[reminders\ninterval_secs = ").unwrap();
        let cli = CliArgs {
            config: Some(path),
            store: Some(PathBuf::from("mine.json")),
            ..Default::default()
        };
        assert!(matches!(
            TrackerConfig::load(&cli),
            Err(ConfigError::ParseToml(_))
        ));
    }

    #[test]
    fn explicit_config_keeps_cli_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\npath = \"file.json\"\n[reminders]\ninterval_secs = 30\n").unwrap();
        let cli = CliArgs {
            config: Some(path),
            store: Some(PathBuf::from("mine.json")),
            ..Default::default()
        };
        let config = TrackerConfig::load(&cli).unwrap();
        assert_eq!(config.store_path, PathBuf::from("mine.json"));
        assert_eq!(config.reminder_interval, Duration::from_secs(30));
    }

    #[test]
    fn parses_subcommands() {
        let cli = CliArgs::try_parse_from([
            "deadline-tracker",
            "--store",
            "t.json",
            "add",
            "Pay rent",
            "2024-03-01",
            "9:00",
            "AM",
        ])
        .unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("t.json")));
        assert_eq!(
            cli.command,
            Some(Command::Add(TaskArgs {
                text: "Pay rent".to_string(),
                date: "2024-03-01".to_string(),
                time: "9:00".to_string(),
                meridiem: "AM".to_string(),
            }))
        );

        let cli = CliArgs::try_parse_from(["deadline-tracker", "done", "2"]).unwrap();
        assert_eq!(cli.command, Some(Command::Done { position: 2 }));

        let cli = CliArgs::try_parse_from(["deadline-tracker"]).unwrap();
        assert_eq!(cli.command, None);
    }
}
