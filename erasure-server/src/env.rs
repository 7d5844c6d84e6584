use erasure_common::db::deletion_request::DEFAULT_EXPIRY_WINDOW;

use lettre::message::Mailbox;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DATA_DIR_VAR: &str = "ERASURE_DATA_DIR";
const REQUEST_EXPIRY_HOURS_VAR: &str = "ERASURE_REQUEST_EXPIRY_HOURS";

const EMAIL_ENABLED_VAR: &str = "ERASURE_EMAIL_ENABLED";
const EMAIL_FROM_ADDR_VAR: &str = "ERASURE_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR_VAR: &str = "ERASURE_EMAIL_REPLY_TO_ADDR";
const SUPPORT_EMAIL_ADDR_VAR: &str = "ERASURE_SUPPORT_EMAIL_ADDR";
const SMTP_ADDRESS_VAR: &str = "ERASURE_SMTP_ADDRESS";
const SMTP_USERNAME_VAR: &str = "ERASURE_SMTP_USERNAME";
const SMTP_PASSWORD_VAR: &str = "ERASURE_SMTP_PASSWORD";
const MAX_SMTP_CONNECTIONS_VAR: &str = "ERASURE_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "ERASURE_SMTP_IDLE_TIMEOUT_SECS";

const CONFIRMATION_URL_VAR: &str = "ERASURE_CONFIRMATION_URL";
const HEALTH_ENDPOINT_KEY_VAR: &str = "ERASURE_HEALTH_ENDPOINT_KEY";

const ACTIX_WORKER_COUNT_VAR: &str = "ERASURE_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "ERASURE_LOG_LEVEL";

#[derive(Zeroize)]
pub struct ConfigInner {
    #[zeroize(skip)]
    pub data_dir: PathBuf,
    #[zeroize(skip)]
    pub request_expiry: Duration,

    pub email_enabled: bool,
    #[zeroize(skip)]
    pub email_from_address: Mailbox,
    #[zeroize(skip)]
    pub email_reply_to_address: Mailbox,
    #[zeroize(skip)]
    pub support_email_address: String,
    pub smtp_address: String,
    pub smtp_username: String,
    pub smtp_password: String,
    #[zeroize(skip)]
    pub max_smtp_connections: Option<u32>,
    #[zeroize(skip)]
    pub smtp_idle_timeout: Duration,

    #[zeroize(skip)]
    pub confirmation_url: String,
    pub health_endpoint_key: String,

    #[zeroize(skip)]
    pub actix_worker_count: usize,

    #[zeroize(skip)]
    pub log_level: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let email_enabled = if cfg!(test) {
            false
        } else {
            env_var(EMAIL_ENABLED_VAR)?
        };

        let email_from_address: Mailbox =
            required_var(EMAIL_FROM_ADDR_VAR, "Account Support <no-reply@erasure.test>")?;
        let email_reply_to_address: Mailbox =
            required_var(EMAIL_REPLY_TO_ADDR_VAR, "support@erasure.test")?;

        let support_email_address: String =
            required_var(SUPPORT_EMAIL_ADDR_VAR, "support@erasure.test")?;
        if !support_email_address.contains('@') {
            return Err(ConfigError::invalid(SUPPORT_EMAIL_ADDR_VAR));
        }

        let smtp_address: String = env_var_or(SMTP_ADDRESS_VAR, String::new());
        let smtp_username: String = env_var_or(SMTP_USERNAME_VAR, String::new());
        let smtp_password: String = env_var_or(SMTP_PASSWORD_VAR, String::new());

        if email_enabled {
            if smtp_address.is_empty() {
                return Err(ConfigError::missing(SMTP_ADDRESS_VAR));
            }

            if smtp_username.is_empty() {
                return Err(ConfigError::missing(SMTP_USERNAME_VAR));
            }

            if smtp_password.is_empty() {
                return Err(ConfigError::missing(SMTP_PASSWORD_VAR));
            }
        }

        let request_expiry = request_expiry_from_hours(env_var_or(
            REQUEST_EXPIRY_HOURS_VAR,
            DEFAULT_EXPIRY_WINDOW.as_secs() / 3600,
        ))?;

        let inner = ConfigInner {
            data_dir: env_var_or(DATA_DIR_VAR, PathBuf::from("./data")),
            request_expiry,

            email_enabled,
            email_from_address,
            email_reply_to_address,
            support_email_address,
            smtp_address,
            smtp_username,
            smtp_password,
            max_smtp_connections: std::env::var(MAX_SMTP_CONNECTIONS_VAR)
                .ok()
                .and_then(|v| v.parse().ok()),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            confirmation_url: required_var(
                CONFIRMATION_URL_VAR,
                "http://localhost:9000/api/deletion_request/confirm",
            )?,
            health_endpoint_key: required_var(HEALTH_ENDPOINT_KEY_VAR, "test-health-key")?,

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn request_expiry_from_hours(hours: u64) -> Result<Duration, ConfigError> {
    match hours.checked_mul(3600) {
        Some(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::invalid(REQUEST_EXPIRY_HOURS_VAR)),
    }
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

/// Required outside of tests. Unit tests fall back to `test_default` so they can run
/// without a prepared environment.
fn required_var<T: FromStr>(key: &'static str, test_default: &str) -> Result<T, ConfigError> {
    if cfg!(test) && std::env::var(key).is_err() {
        return test_default.parse().map_err(|_| ConfigError::invalid(key));
    }

    env_var(key)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use erasure_common::db::StoreHandle;
    use erasure_common::email::senders::MockSender;
    use erasure_common::email::EmailSender;
    use erasure_common::models::deletion_request::DeletionRequest;
    use erasure_common::storage::{RecordStore, StorageError, StoreGuard};

    use actix_web::web::Data;
    use std::io;
    use std::sync::Arc;

    pub fn store() -> Data<StoreHandle> {
        Data::new(StoreHandle::in_memory())
    }

    /// A store whose every operation fails with an I/O error.
    pub fn failing_store() -> Data<StoreHandle> {
        Data::new(StoreHandle::new(Arc::new(FailingStore)))
    }

    struct FailingStore;

    fn io_failure() -> StorageError {
        StorageError::Io(io::Error::new(io::ErrorKind::Other, "disk unavailable"))
    }

    impl RecordStore for FailingStore {
        fn put(&self, _key: &str, _record: &DeletionRequest) -> Result<(), StorageError> {
            Err(io_failure())
        }

        fn get(&self, _key: &str) -> Result<Option<DeletionRequest>, StorageError> {
            Err(io_failure())
        }

        fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Err(io_failure())
        }

        fn list_all(&self) -> Result<Vec<DeletionRequest>, StorageError> {
            Err(io_failure())
        }

        fn lock_exclusive(&self) -> Result<StoreGuard<'_>, StorageError> {
            Err(io_failure())
        }
    }

    /// Returns the app data to register and a clone for inspecting the outbox.
    pub fn email_sender(sender: MockSender) -> (Data<EmailSender>, MockSender) {
        let boxed: EmailSender = Box::new(sender.clone());
        (Data::from(Arc::new(boxed)), sender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_under_test() {
        assert!(!CONF.email_enabled);
        assert!(CONF.request_expiry >= Duration::from_secs(3600));
        assert!(!CONF.confirmation_url.is_empty());
        assert!(!CONF.health_endpoint_key.is_empty());
        assert!(CONF.support_email_address.contains('@'));
        assert!(CONF.actix_worker_count > 0);
    }

    #[test]
    fn test_request_expiry_from_hours() {
        assert_eq!(
            request_expiry_from_hours(24).unwrap(),
            Duration::from_secs(24 * 3600)
        );
        assert_eq!(CONF.request_expiry, DEFAULT_EXPIRY_WINDOW);

        assert!(matches!(
            request_expiry_from_hours(0),
            Err(ConfigError::InvalidVar(REQUEST_EXPIRY_HOURS_VAR))
        ));
        assert!(matches!(
            request_expiry_from_hours(u64::MAX),
            Err(ConfigError::InvalidVar(REQUEST_EXPIRY_HOURS_VAR))
        ));
        assert!(matches!(
            request_expiry_from_hours(u64::MAX / 3600 + 1),
            Err(ConfigError::InvalidVar(REQUEST_EXPIRY_HOURS_VAR))
        ));
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::missing(CONFIRMATION_URL_VAR).to_string(),
            "Missing environment variable 'ERASURE_CONFIRMATION_URL'"
        );
        assert_eq!(
            ConfigError::invalid(REQUEST_EXPIRY_HOURS_VAR).to_string(),
            "Environment variable 'ERASURE_REQUEST_EXPIRY_HOURS' is invalid"
        );
    }
}
