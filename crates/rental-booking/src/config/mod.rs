use std::env;
use std::fmt;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the booking service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub booking: BookingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let lock_timeout = match env::var("BOOKING_LOCK_TIMEOUT_MS") {
            Ok(raw) => parse_lock_timeout(&raw)?,
            Err(_) => BookingConfig::DEFAULT_LOCK_TIMEOUT,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            booking: BookingConfig { lock_timeout },
        })
    }
}

fn parse_lock_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(millis) if millis > 0 => Ok(Duration::from_millis(millis)),
        _ => Err(ConfigError::InvalidLockTimeout {
            value: raw.to_string(),
        }),
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Reservation engine tuning.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// How long an operation waits for a resource's lock before failing as busy.
    pub lock_timeout: Duration,
}

impl BookingConfig {
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidLockTimeout { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidLockTimeout { value } => write!(
                f,
                "BOOKING_LOCK_TIMEOUT_MS must be a positive number of milliseconds (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("BOOKING_LOCK_TIMEOUT_MS");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.booking.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn recognizes_production_aliases() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", " PROD ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        reset_env();
    }

    #[test]
    fn reads_lock_timeout_override() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BOOKING_LOCK_TIMEOUT_MS", "1200");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.booking.lock_timeout, Duration::from_millis(1200));
        reset_env();
    }

    #[test]
    fn rejects_zero_lock_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("BOOKING_LOCK_TIMEOUT_MS", "0");
        let err = AppConfig::load().expect_err("zero timeout rejected");
        assert!(matches!(err, ConfigError::InvalidLockTimeout { .. }));
        reset_env();
    }
}
