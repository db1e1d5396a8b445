//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.
//!
//! Check-in policy values (clock-skew tolerance, grace period, geofence override,
//! accuracy threshold) live here as named settings so that policy changes never
//! require code changes.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_duration_minutes: u64,
    pub clock_skew_tolerance_seconds: i64,
    pub grace_period_seconds: i64,
    pub geofence_radius_override_meters: Option<f64>,
    pub accuracy_threshold_meters: f64,
    pub accuracy_policy: String,
    pub code_window_tolerance: i64,
    pub demo_sweep_interval_seconds: u64,
    pub demo_idle_seconds: i64,
    pub demo_retention_seconds: i64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

/// Reads `key` and parses it, falling back to `default` when unset or malformed.
fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing values fall back to development defaults. `JWT_SECRET` defaults to
    /// an empty string; the server refuses to start with an empty secret.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            project_name: env::var("PROJECT_NAME").unwrap_or_else(|_| "roll-call".into()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info,sqlx=warn,sea_orm=warn".into()),
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "api.log".into()),
            log_to_stdout: env::var("LOG_TO_STDOUT").unwrap_or_else(|_| "false".into()) == "true",
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/attendance.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: parsed_or("PORT", 3000),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            jwt_duration_minutes: parsed_or("JWT_DURATION_MINUTES", 60),
            clock_skew_tolerance_seconds: parsed_or("CLOCK_SKEW_TOLERANCE_SECONDS", 60),
            grace_period_seconds: parsed_or("GRACE_PERIOD_SECONDS", 300),
            geofence_radius_override_meters: env::var("GEOFENCE_RADIUS_OVERRIDE_METERS")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            accuracy_threshold_meters: parsed_or("ACCURACY_THRESHOLD_METERS", 100.0),
            accuracy_policy: env::var("ACCURACY_POLICY").unwrap_or_else(|_| "annotate".into()),
            code_window_tolerance: parsed_or("CODE_WINDOW_TOLERANCE", 1),
            demo_sweep_interval_seconds: parsed_or("DEMO_SWEEP_INTERVAL_SECONDS", 60),
            demo_idle_seconds: parsed_or("DEMO_IDLE_SECONDS", 300),
            demo_retention_seconds: parsed_or("DEMO_RETENTION_SECONDS", 600),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock
                .write()
                .expect("Failed to acquire AppConfig write lock");
            *guard = AppConfig::from_env();
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_host(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.host = value.into());
    }

    pub fn set_port(value: u16) {
        AppConfig::set_field(|cfg| cfg.port = value);
    }

    pub fn set_jwt_secret(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.jwt_secret = value.into());
    }

    pub fn set_jwt_duration_minutes(value: impl Into<u64>) {
        AppConfig::set_field(|cfg| cfg.jwt_duration_minutes = value.into());
    }

    pub fn set_clock_skew_tolerance_seconds(value: i64) {
        AppConfig::set_field(|cfg| cfg.clock_skew_tolerance_seconds = value);
    }

    pub fn set_grace_period_seconds(value: i64) {
        AppConfig::set_field(|cfg| cfg.grace_period_seconds = value);
    }

    pub fn set_geofence_radius_override_meters(value: Option<f64>) {
        AppConfig::set_field(|cfg| cfg.geofence_radius_override_meters = value);
    }

    pub fn set_accuracy_threshold_meters(value: f64) {
        AppConfig::set_field(|cfg| cfg.accuracy_threshold_meters = value);
    }

    pub fn set_accuracy_policy(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.accuracy_policy = value.into());
    }

    pub fn set_code_window_tolerance(value: i64) {
        AppConfig::set_field(|cfg| cfg.code_window_tolerance = value);
    }
}

// --- Free accessors ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn jwt_secret() -> String {
    AppConfig::global().jwt_secret.clone()
}

pub fn jwt_duration_minutes() -> u64 {
    AppConfig::global().jwt_duration_minutes
}

pub fn clock_skew_tolerance_seconds() -> i64 {
    AppConfig::global().clock_skew_tolerance_seconds
}

pub fn grace_period_seconds() -> i64 {
    AppConfig::global().grace_period_seconds
}

pub fn geofence_radius_override_meters() -> Option<f64> {
    AppConfig::global().geofence_radius_override_meters
}

pub fn accuracy_threshold_meters() -> f64 {
    AppConfig::global().accuracy_threshold_meters
}

pub fn accuracy_policy() -> String {
    AppConfig::global().accuracy_policy.clone()
}

pub fn code_window_tolerance() -> i64 {
    AppConfig::global().code_window_tolerance
}

pub fn demo_sweep_interval_seconds() -> u64 {
    AppConfig::global().demo_sweep_interval_seconds
}

pub fn demo_idle_seconds() -> i64 {
    AppConfig::global().demo_idle_seconds
}

pub fn demo_retention_seconds() -> i64 {
    AppConfig::global().demo_retention_seconds
}
