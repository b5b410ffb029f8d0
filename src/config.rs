use std::{env, path::PathBuf, time::Duration};
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PASSWORD: &str = "admin";
const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub admin_password: String,
    pub session_ttl: Duration,
}

impl Config {
    /// Reads `PORT`, `GANTT_DATA_DIR`, `GANTT_ADMIN_PASSWORD` and
    /// `GANTT_SESSION_TTL_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let port = parse_var("PORT").unwrap_or(DEFAULT_PORT);
        let data_dir = env::var("GANTT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        let admin_password = env::var("GANTT_ADMIN_PASSWORD").unwrap_or_else(|_| {
            warn!("GANTT_ADMIN_PASSWORD not set, using the built-in default");
            DEFAULT_PASSWORD.to_string()
        });
        let session_ttl = Duration::from_secs(
            parse_var("GANTT_SESSION_TTL_SECS").unwrap_or(DEFAULT_SESSION_TTL_SECS),
        );

        Self {
            port,
            data_dir,
            admin_password,
            session_ttl,
        }
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: data_dir.into(),
            admin_password: DEFAULT_PASSWORD.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join("data.json")
    }

    pub fn assignees_path(&self) -> PathBuf {
        self.data_dir.join("assignees.json")
    }

    pub fn task_types_path(&self) -> PathBuf {
        self.data_dir.join("task_types.json")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("ignoring invalid {name}={value}");
            None
        }
    }
}
