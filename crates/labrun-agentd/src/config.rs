use std::path::PathBuf;

use thiserror::Error;

use labrun_exec::Sandbox;
use labrun_model::RecordId;

pub const DEFAULT_JUPYTER_BASE_PORT: u16 = 8800;
pub const DEFAULT_SYNC_INTERVAL_MIN: i64 = 10;

/// First-class script types the agent will execute.
pub const ALLOWED_SUFFIXES: &[&str] = &["py", "ipynb"];

/// Directories whose contents are never executed or inventoried.
pub const SKIP_DIRS: &[&str] = &[
    ".venv",
    ".cache",
    ".local",
    "anaconda3",
    "__pycache__",
    ".git",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required in the environment")]
    MissingVar(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    InvalidVar {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Immutable agent settings, read once at startup and passed into each
/// component.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Host account the agent runs as, used to look up the queue identity.
    pub linux_user: String,
    /// Pre-resolved queue identity; looked up from the store when unset.
    pub user_id: Option<String>,
    pub queue_url: String,
    pub queue_service_key: String,
    /// Completion webhook; notifications are skipped when unset.
    pub notify_url: Option<String>,
    pub home_root: PathBuf,
    pub log_root: PathBuf,
    pub jupyter_base_port: u16,
    pub jupyter_ip: String,
    /// Pass legacy `NotebookApp` options instead of `ServerApp`.
    pub jupyter_legacy: bool,
    /// Minutes between inventory syncs; zero or negative forces a sync.
    pub sync_interval_min: i64,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get_nonempty = |name: &'static str| get(name).filter(|value| !value.is_empty());
        let require = |name: &'static str| get_nonempty(name).ok_or(ConfigError::MissingVar(name));

        let home_root = match get_nonempty("LABRUN_HOME") {
            Some(path) => PathBuf::from(path),
            None => dirs::home_dir().ok_or(ConfigError::NoHomeDir)?,
        };
        let log_root = get_nonempty("LABRUN_LOG_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_root.join("lab_job_logs"));

        Ok(Self {
            linux_user: require("LABRUN_USER")?,
            user_id: get_nonempty("LABRUN_USER_ID"),
            queue_url: require("LABRUN_QUEUE_URL")?,
            queue_service_key: require("LABRUN_QUEUE_SERVICE_KEY")?,
            notify_url: get_nonempty("LABRUN_NOTIFY_URL"),
            jupyter_base_port: parse_var(
                "JUPYTER_BASE_PORT",
                get_nonempty("JUPYTER_BASE_PORT"),
                "a port number",
                DEFAULT_JUPYTER_BASE_PORT,
            )?,
            jupyter_ip: get_nonempty("JUPYTER_IP").unwrap_or_else(|| "0.0.0.0".to_string()),
            jupyter_legacy: get_nonempty("JUPYTER_LEGACY")
                .map(|value| is_truthy(&value))
                .unwrap_or(false),
            sync_interval_min: parse_var(
                "SYNC_INTERVAL_MIN",
                get_nonempty("SYNC_INTERVAL_MIN"),
                "a number of minutes",
                DEFAULT_SYNC_INTERVAL_MIN,
            )?,
            home_root,
            log_root,
        })
    }

    pub fn job_log_dir(&self, job_id: &RecordId) -> PathBuf {
        self.log_root.join(job_id.to_string())
    }

    pub fn session_log_file(&self, session_id: &RecordId) -> PathBuf {
        self.log_root.join("jupyter").join(format!("{session_id}.log"))
    }

    pub fn sync_cursor_path(&self) -> PathBuf {
        self.log_root.join("last_sync.txt")
    }

    pub fn sandbox(&self) -> Sandbox {
        Sandbox::new(self.home_root.clone(), ALLOWED_SUFFIXES, SKIP_DIRS)
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            expected,
            value,
        }),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
