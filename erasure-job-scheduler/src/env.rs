use erasure_common::db::deletion_request::DEFAULT_EXPIRY_WINDOW;

use once_cell::sync::Lazy;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub static CONF: Lazy<Config> = Lazy::new(|| match Config::from_env() {
    Ok(c) => c,
    Err(e) => {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
});

const DATA_DIR_VAR: &str = "ERASURE_DATA_DIR";
const REQUEST_EXPIRY_HOURS_VAR: &str = "ERASURE_REQUEST_EXPIRY_HOURS";

const UPDATE_FREQUENCY_SECS_VAR: &str = "ERASURE_UPDATE_FREQUENCY_SECS";
const CLEAR_EXPIRED_REQUESTS_JOB_FREQUENCY_SECS_VAR: &str =
    "ERASURE_CLEAR_EXPIRED_REQUESTS_JOB_FREQUENCY_SECS";

const WORKER_THREADS_VAR: &str = "ERASURE_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "ERASURE_MAX_BLOCKING_THREADS";
const LOG_LEVEL_VAR: &str = "ERASURE_LOG_LEVEL";

const REQUESTS_DIR_NAME: &str = "requests";
const JOB_REGISTRY_FILE_NAME: &str = "job_registry.json";

#[derive(Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub request_expiry: Duration,

    pub update_frequency: Duration,
    pub clear_expired_requests_job_frequency: Duration,

    pub worker_threads: usize,
    pub max_blocking_threads: usize,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let request_expiry = request_expiry_from_hours(env_var_or(
            REQUEST_EXPIRY_HOURS_VAR,
            DEFAULT_EXPIRY_WINDOW.as_secs() / 3600,
        ))?;

        let update_frequency_secs: u64 = env_var_or(UPDATE_FREQUENCY_SECS_VAR, 10);
        if update_frequency_secs == 0 {
            return Err(ConfigError::InvalidVar(UPDATE_FREQUENCY_SECS_VAR));
        }

        let worker_threads: usize = env_var_or(WORKER_THREADS_VAR, num_cpus::get());
        if worker_threads == 0 {
            return Err(ConfigError::InvalidVar(WORKER_THREADS_VAR));
        }

        let max_blocking_threads: usize = env_var_or(MAX_BLOCKING_THREADS_VAR, 40);
        if max_blocking_threads == 0 {
            return Err(ConfigError::InvalidVar(MAX_BLOCKING_THREADS_VAR));
        }

        Ok(Config {
            data_dir: env_var_or(DATA_DIR_VAR, PathBuf::from("./data")),
            request_expiry,

            update_frequency: Duration::from_secs(update_frequency_secs),
            clear_expired_requests_job_frequency: Duration::from_secs(env_var_or(
                CLEAR_EXPIRED_REQUESTS_JOB_FREQUENCY_SECS_VAR,
                3600,
            )),

            worker_threads,
            max_blocking_threads,
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        })
    }

    pub fn requests_dir(&self) -> PathBuf {
        self.data_dir.join(REQUESTS_DIR_NAME)
    }

    pub fn job_registry_path(&self) -> PathBuf {
        self.data_dir.join(JOB_REGISTRY_FILE_NAME)
    }
}

fn request_expiry_from_hours(hours: u64) -> Result<Duration, ConfigError> {
    match hours.checked_mul(3600) {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidVar(REQUEST_EXPIRY_HOURS_VAR)),
    }
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    InvalidVar(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(CONF.request_expiry >= Duration::from_secs(3600));
        assert!(CONF.update_frequency > Duration::ZERO);
        assert!(CONF.worker_threads > 0);
        assert!(CONF.max_blocking_threads > 0);
    }

    #[test]
    fn test_request_expiry_from_hours() {
        assert_eq!(request_expiry_from_hours(1).unwrap(), Duration::from_secs(3600));
        assert_eq!(CONF.request_expiry, DEFAULT_EXPIRY_WINDOW);

        assert!(matches!(
            request_expiry_from_hours(0),
            Err(ConfigError::InvalidVar(REQUEST_EXPIRY_HOURS_VAR))
        ));
        assert!(matches!(
            request_expiry_from_hours(u64::MAX / 3600 + 1),
            Err(ConfigError::InvalidVar(REQUEST_EXPIRY_HOURS_VAR))
        ));
    }

    #[test]
    fn test_paths_live_under_data_dir() {
        assert!(CONF.requests_dir().starts_with(&CONF.data_dir));
        assert!(CONF.job_registry_path().starts_with(&CONF.data_dir));
        assert_ne!(CONF.requests_dir(), CONF.job_registry_path());
    }
}
