// src/config/settings.rs
// DOCUMENTATION: Tiered application settings
// PURPOSE: Resolve base defaults, environment variant, .env file and process overrides
// into one fully populated record

use super::db::{derive_engine_options, sqlite_url, EngineOptions, EngineParams};
use super::env::{env_file_path, load_env_file, process_overrides, Environment, Overlay, Overrides};
use crate::errors::{ConfigError, GymConfigError};
use crate::models::GymConfig;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Published development secret; never valid in production
pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key-change-in-production";

const TESTING_DATABASE_URL: &str = "sqlite:///:memory:";

fn as_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_secs())
}

/// Application configuration
/// DOCUMENTATION: Every key has a concrete value once resolved. Field names map to
/// environment variables in SCREAMING_SNAKE_CASE (e.g. `mail_port` -> `MAIL_PORT`).
/// Build with Settings::resolve() at application startup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    // Application
    pub app_name: String,
    pub app_version: String,
    pub env: Environment,
    pub debug: bool,
    pub testing: bool,

    // Server
    pub server_address: String,
    pub server_port: u16,

    // Paths
    pub base_dir: PathBuf,
    pub instance_path: PathBuf,
    /// Gym profile JSON document
    pub gym_config_path: PathBuf,
    pub static_folder: String,
    pub static_url_path: String,

    // Uploads
    pub upload_folder: PathBuf,
    /// Maximum request body size in bytes
    pub max_content_length: usize,
    pub allowed_extensions: BTreeSet<String>,

    // Localization
    pub timezone: String,

    // Database
    /// Connection URL; the scheme decides the derived engine options
    pub database_url: String,
    pub db_echo: bool,
    pub db_pool_pre_ping: bool,
    pub db_pool_size: u32,
    pub db_max_overflow: u32,
    pub db_pool_recycle: u64,
    pub db_pool_timeout: u64,
    pub db_connect_timeout: u64,
    pub db_app_name: String,
    #[serde(rename = "DB_ENGINE_OPTIONS")]
    pub engine_options: EngineOptions,

    // Security
    pub secret_key: String,
    pub session_cookie_secure: bool,
    pub session_cookie_httponly: bool,
    pub session_cookie_samesite: String,
    #[serde(serialize_with = "as_secs")]
    pub permanent_session_lifetime: Duration,
    pub remember_cookie_secure: bool,
    #[serde(serialize_with = "as_secs")]
    pub remember_cookie_duration: Duration,
    pub preferred_url_scheme: String,
    pub csrf_enabled: bool,
    pub csrf_time_limit: u64,

    // Password policy
    pub password_min_length: usize,
    pub password_require_uppercase: bool,
    pub password_require_lowercase: bool,
    pub password_require_numbers: bool,
    pub password_require_special: bool,
    /// bcrypt cost factor
    pub password_hash_rounds: u32,

    // Rate limiting
    pub ratelimit_enabled: bool,
    pub ratelimit_storage_url: String,
    pub ratelimit_default: String,
    pub ratelimit_login_attempts: String,

    // Login
    pub login_view: String,
    pub login_message: String,
    pub login_message_category: String,

    // Pagination
    pub items_per_page: u32,

    // Email
    pub mail_server: String,
    pub mail_port: u16,
    pub mail_use_tls: bool,
    pub mail_use_ssl: bool,
    /// Empty when the mail server needs no authentication
    pub mail_username: String,
    pub mail_password: String,
    pub mail_default_sender: String,
    pub mail_suppress_send: bool,
    pub mail_debug: bool,

    // Logging
    pub log_level: String,
    /// Empty logs to stderr
    pub log_file: String,

    // Membership
    pub membership_grace_period_days: u32,
    pub payment_due_reminder_days: u32,

    // Feature flags
    pub feature_online_payment: bool,
    pub feature_email_notifications: bool,
    pub feature_sms_notifications: bool,

    // Static files
    pub send_file_max_age_default: u64,
}

impl Settings {
    /// Base defaults shared by every environment
    pub fn base(base_dir: &Path) -> Self {
        let instance_path = base_dir.join("instance");
        let params = EngineParams::default();
        let database_url = sqlite_url(&instance_path, "gymnassic.db");
        let engine_options = derive_engine_options(&database_url, &params);

        Settings {
            app_name: "Gymnassic".to_string(),
            app_version: "2.0.0".to_string(),
            env: Environment::Development,
            debug: false,
            testing: false,

            server_address: "127.0.0.1".to_string(),
            server_port: 5000,

            base_dir: base_dir.to_path_buf(),
            gym_config_path: base_dir.join("gym_profile.json"),
            instance_path,
            static_folder: "static".to_string(),
            static_url_path: "/static".to_string(),

            upload_folder: base_dir.join("uploads"),
            max_content_length: 16 * 1024 * 1024,
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "pdf"]
                .into_iter()
                .map(String::from)
                .collect(),

            timezone: "UTC".to_string(),

            database_url,
            db_echo: false,
            db_pool_pre_ping: params.pool_pre_ping,
            db_pool_size: params.pool_size,
            db_max_overflow: params.max_overflow,
            db_pool_recycle: params.pool_recycle,
            db_pool_timeout: params.pool_timeout,
            db_connect_timeout: params.connect_timeout,
            db_app_name: params.app_name,
            engine_options,

            secret_key: DEFAULT_SECRET_KEY.to_string(),
            session_cookie_secure: false,
            session_cookie_httponly: true,
            session_cookie_samesite: "Lax".to_string(),
            permanent_session_lifetime: Duration::from_secs(3600),
            remember_cookie_secure: false,
            remember_cookie_duration: Duration::from_secs(7 * 24 * 3600),
            preferred_url_scheme: "http".to_string(),
            csrf_enabled: true,
            csrf_time_limit: 3600,

            password_min_length: 8,
            password_require_uppercase: true,
            password_require_lowercase: true,
            password_require_numbers: true,
            password_require_special: true,
            password_hash_rounds: 12,

            ratelimit_enabled: true,
            ratelimit_storage_url: "memory://".to_string(),
            ratelimit_default: "200 per day, 50 per hour".to_string(),
            ratelimit_login_attempts: "5 per 15 minutes".to_string(),

            login_view: "auth.login".to_string(),
            login_message: "Please log in to access this page.".to_string(),
            login_message_category: "info".to_string(),

            items_per_page: 20,

            mail_server: "localhost".to_string(),
            mail_port: 587,
            mail_use_tls: true,
            mail_use_ssl: false,
            mail_username: String::new(),
            mail_password: String::new(),
            mail_default_sender: "noreply@gymnassic.com".to_string(),
            mail_suppress_send: false,
            mail_debug: false,

            log_level: "INFO".to_string(),
            log_file: String::new(),

            membership_grace_period_days: 3,
            payment_due_reminder_days: 7,

            feature_online_payment: false,
            feature_email_notifications: true,
            feature_sms_notifications: false,

            send_file_max_age_default: 43200,
        }
    }

    /// Base defaults with the environment variant applied, before external overrides
    pub fn for_environment(environment: Environment, base_dir: &Path) -> Self {
        let mut settings = Settings::base(base_dir);
        settings.env = environment;

        match environment {
            Environment::Development => {
                settings.debug = true;
                settings.db_echo = true;
                settings.session_cookie_secure = false;
                settings.log_level = "DEBUG".to_string();
                settings.mail_suppress_send = true;
                settings.send_file_max_age_default = 0;
            }
            Environment::Production => {
                settings.debug = false;
                settings.database_url = "postgresql://localhost:5432/gymnassic_db".to_string();
                settings.db_echo = false;
                // No usable default: must come from SECRET_KEY
                settings.secret_key = String::new();
                settings.session_cookie_secure = true;
                settings.csrf_enabled = true;
                settings.remember_cookie_secure = true;
                settings.preferred_url_scheme = "https".to_string();
                settings.ratelimit_storage_url = "redis://localhost:6379/0".to_string();
                settings.log_level = "WARNING".to_string();
                settings.log_file = "logs/gymnassic.log".to_string();
                settings.mail_suppress_send = false;
                settings.send_file_max_age_default = 31_536_000;
                settings.feature_online_payment = true;
            }
            Environment::Testing => {
                settings.testing = true;
                settings.debug = true;
                settings.database_url = TESTING_DATABASE_URL.to_string();
                settings.csrf_enabled = false;
                settings.session_cookie_secure = false;
                settings.ratelimit_enabled = false;
                settings.mail_suppress_send = true;
                settings.password_min_length = 4;
                settings.password_hash_rounds = 4;
            }
        }

        settings.engine_options = derive_engine_options(&settings.database_url, &settings.engine_params());
        settings
    }

    /// Resolve settings for the named environment from the working directory
    /// DOCUMENTATION: Reads APP_ENV when no name is given. Reads the matching .env
    /// file and the process environment; never modifies either. Warnings are
    /// returned, not logged, so they can be emitted once logging is configured
    pub fn resolve(environment_name: Option<&str>) -> Result<Resolution, ConfigError> {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Settings::resolution_in(&base_dir, environment_name, &process_overrides())
    }

    /// Resolve settings with an explicit base directory and process variables,
    /// logging any warnings immediately
    pub fn resolve_in(
        base_dir: &Path,
        environment_name: Option<&str>,
        process: &Overrides,
    ) -> Result<Self, ConfigError> {
        Ok(Settings::resolution_in(base_dir, environment_name, process)?.into_logged())
    }

    /// Resolve settings with an explicit base directory, collecting warnings
    pub fn resolution_in(
        base_dir: &Path,
        environment_name: Option<&str>,
        process: &Overrides,
    ) -> Result<Resolution, ConfigError> {
        let (environment, selection_warning) = Environment::select(environment_name, process);
        let file = load_env_file(&env_file_path(base_dir, environment))?;

        let mut resolution = Settings::merge_collecting(environment, base_dir, &file, process)?;
        if let Some(warning) = selection_warning {
            resolution.warnings.insert(0, warning);
        }
        Ok(resolution)
    }

    /// Merge all layers in fixed precedence, logging any warnings immediately
    pub fn merge(
        environment: Environment,
        base_dir: &Path,
        file: &Overrides,
        process: &Overrides,
    ) -> Result<Self, ConfigError> {
        Ok(Settings::merge_collecting(environment, base_dir, file, process)?.into_logged())
    }

    /// DOCUMENTATION: base < variant < env file < process environment, then variant
    /// enforcement, engine option derivation and validation
    fn merge_collecting(
        environment: Environment,
        base_dir: &Path,
        file: &Overrides,
        process: &Overrides,
    ) -> Result<Resolution, ConfigError> {
        let mut settings = Settings::for_environment(environment, base_dir);

        let overlay = Overlay::new(file, process);
        settings.apply(&overlay);
        let mut warnings = overlay.into_warnings();

        warnings.extend(settings.enforce_variant());
        settings.engine_options = derive_engine_options(&settings.database_url, &settings.engine_params());
        settings.validate()?;

        if settings.ratelimit_enabled
            && settings.env.is_production()
            && settings.ratelimit_storage_url.starts_with("memory://")
        {
            warnings.push("RATELIMIT_STORAGE_URL=memory:// is not shared across workers".to_string());
        }

        Ok(Resolution { settings, warnings })
    }

    /// Apply external overrides; ENV and derived keys are not overridable
    fn apply(&mut self, o: &Overlay<'_>) {
        o.string("APP_NAME", &mut self.app_name);
        o.string("APP_VERSION", &mut self.app_version);
        o.flag("DEBUG", &mut self.debug);
        o.flag("TESTING", &mut self.testing);

        o.string("SERVER_ADDRESS", &mut self.server_address);
        o.number("SERVER_PORT", &mut self.server_port);

        o.path("INSTANCE_PATH", &mut self.instance_path);
        o.path("GYM_CONFIG_PATH", &mut self.gym_config_path);
        o.string("STATIC_FOLDER", &mut self.static_folder);
        o.string("STATIC_URL_PATH", &mut self.static_url_path);

        o.path("UPLOAD_FOLDER", &mut self.upload_folder);
        o.number("MAX_CONTENT_LENGTH", &mut self.max_content_length);
        o.set("ALLOWED_EXTENSIONS", &mut self.allowed_extensions);

        o.string("TIMEZONE", &mut self.timezone);

        o.string("DATABASE_URL", &mut self.database_url);
        o.flag("DB_ECHO", &mut self.db_echo);
        o.flag("DB_POOL_PRE_PING", &mut self.db_pool_pre_ping);
        o.number("DB_POOL_SIZE", &mut self.db_pool_size);
        o.number("DB_MAX_OVERFLOW", &mut self.db_max_overflow);
        o.number("DB_POOL_RECYCLE", &mut self.db_pool_recycle);
        o.number("DB_POOL_TIMEOUT", &mut self.db_pool_timeout);
        o.number("DB_CONNECT_TIMEOUT", &mut self.db_connect_timeout);
        o.string("DB_APP_NAME", &mut self.db_app_name);

        o.string("SECRET_KEY", &mut self.secret_key);
        o.flag("SESSION_COOKIE_SECURE", &mut self.session_cookie_secure);
        o.flag("SESSION_COOKIE_HTTPONLY", &mut self.session_cookie_httponly);
        o.string("SESSION_COOKIE_SAMESITE", &mut self.session_cookie_samesite);
        o.seconds("PERMANENT_SESSION_LIFETIME", &mut self.permanent_session_lifetime);
        o.flag("REMEMBER_COOKIE_SECURE", &mut self.remember_cookie_secure);
        o.seconds("REMEMBER_COOKIE_DURATION", &mut self.remember_cookie_duration);
        o.string("PREFERRED_URL_SCHEME", &mut self.preferred_url_scheme);
        o.flag("CSRF_ENABLED", &mut self.csrf_enabled);
        o.number("CSRF_TIME_LIMIT", &mut self.csrf_time_limit);

        o.number("PASSWORD_MIN_LENGTH", &mut self.password_min_length);
        o.flag("PASSWORD_REQUIRE_UPPERCASE", &mut self.password_require_uppercase);
        o.flag("PASSWORD_REQUIRE_LOWERCASE", &mut self.password_require_lowercase);
        o.flag("PASSWORD_REQUIRE_NUMBERS", &mut self.password_require_numbers);
        o.flag("PASSWORD_REQUIRE_SPECIAL", &mut self.password_require_special);
        o.number("PASSWORD_HASH_ROUNDS", &mut self.password_hash_rounds);

        o.flag("RATELIMIT_ENABLED", &mut self.ratelimit_enabled);
        o.string("RATELIMIT_STORAGE_URL", &mut self.ratelimit_storage_url);
        o.string("RATELIMIT_DEFAULT", &mut self.ratelimit_default);
        o.string("RATELIMIT_LOGIN_ATTEMPTS", &mut self.ratelimit_login_attempts);

        o.string("LOGIN_VIEW", &mut self.login_view);
        o.string("LOGIN_MESSAGE", &mut self.login_message);
        o.string("LOGIN_MESSAGE_CATEGORY", &mut self.login_message_category);

        o.number("ITEMS_PER_PAGE", &mut self.items_per_page);

        o.string("MAIL_SERVER", &mut self.mail_server);
        o.number("MAIL_PORT", &mut self.mail_port);
        o.flag("MAIL_USE_TLS", &mut self.mail_use_tls);
        o.flag("MAIL_USE_SSL", &mut self.mail_use_ssl);
        o.string("MAIL_USERNAME", &mut self.mail_username);
        o.string("MAIL_PASSWORD", &mut self.mail_password);
        o.string("MAIL_DEFAULT_SENDER", &mut self.mail_default_sender);
        o.flag("MAIL_SUPPRESS_SEND", &mut self.mail_suppress_send);
        o.flag("MAIL_DEBUG", &mut self.mail_debug);

        o.string("LOG_LEVEL", &mut self.log_level);
        o.string("LOG_FILE", &mut self.log_file);

        o.number("MEMBERSHIP_GRACE_PERIOD_DAYS", &mut self.membership_grace_period_days);
        o.number("PAYMENT_DUE_REMINDER_DAYS", &mut self.payment_due_reminder_days);

        o.flag("FEATURE_ONLINE_PAYMENT", &mut self.feature_online_payment);
        o.flag("FEATURE_EMAIL_NOTIFICATIONS", &mut self.feature_email_notifications);
        o.flag("FEATURE_SMS_NOTIFICATIONS", &mut self.feature_sms_notifications);

        o.number("SEND_FILE_MAX_AGE_DEFAULT", &mut self.send_file_max_age_default);
    }

    /// Re-assert values a variant does not allow overriding
    fn enforce_variant(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self.env {
            Environment::Production => {
                if !self.session_cookie_secure || !self.csrf_enabled {
                    warnings.push("Secure cookies and CSRF protection are enforced in production".to_string());
                }
                self.session_cookie_secure = true;
                self.csrf_enabled = true;
            }
            Environment::Testing => {
                if self.database_url != TESTING_DATABASE_URL {
                    warnings.push(format!(
                        "Ignoring DATABASE_URL={} in testing; using in-memory database",
                        self.database_url
                    ));
                    self.database_url = TESTING_DATABASE_URL.to_string();
                }
            }
            Environment::Development => {}
        }
        warnings
    }

    /// Validate critical configuration
    /// DOCUMENTATION: Ensures the application can start safely
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.env.is_production()
            && (self.secret_key.trim().is_empty() || self.secret_key == DEFAULT_SECRET_KEY)
        {
            return Err(ConfigError::InsecureSecretKey);
        }

        Ok(())
    }

    /// Engine derivation inputs from the DB_* keys
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            pool_pre_ping: self.db_pool_pre_ping,
            pool_size: self.db_pool_size,
            max_overflow: self.db_max_overflow,
            pool_recycle: self.db_pool_recycle,
            pool_timeout: self.db_pool_timeout,
            connect_timeout: self.db_connect_timeout,
            app_name: self.db_app_name.clone(),
        }
    }

    /// Load the gym profile at GYM_CONFIG_PATH
    /// DOCUMENTATION: A missing file means no profile is configured
    pub fn gym_config(&self) -> Result<Option<GymConfig>, GymConfigError> {
        match GymConfig::from_json_file(&self.gym_config_path) {
            Ok(config) => Ok(Some(config)),
            Err(GymConfigError::NotFound(path)) => {
                log::info!("No gym profile at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Log filter from LOG_LEVEL, also accepting WARNING and CRITICAL
    pub fn log_filter(&self) -> log::LevelFilter {
        match self.log_level.trim().to_uppercase().as_str() {
            "TRACE" => log::LevelFilter::Trace,
            "DEBUG" => log::LevelFilter::Debug,
            "WARN" | "WARNING" => log::LevelFilter::Warn,
            "ERROR" | "CRITICAL" => log::LevelFilter::Error,
            "OFF" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        }
    }

    /// Log file location, None when logging to stderr
    pub fn log_file_path(&self) -> Option<PathBuf> {
        if self.log_file.trim().is_empty() {
            return None;
        }
        Some(self.base_dir.join(&self.log_file))
    }

    /// The record as a key -> value mapping for consumers
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Resolved settings plus the warnings raised while resolving them
#[derive(Debug)]
pub struct Resolution {
    pub settings: Settings,
    pub warnings: Vec<String>,
}

impl Resolution {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            log::warn!("{}", warning);
        }
    }

    /// Log the warnings and keep the settings
    pub fn into_logged(self) -> Settings {
        self.log_warnings();
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::db::DatabaseEngine;
    use tempfile::tempdir;

    fn overrides(pairs: &[(&str, &str)]) -> Overrides {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn merge(environment: Environment, process: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        Settings::merge(
            environment,
            Path::new("/srv/gymnassic"),
            &Overrides::new(),
            &overrides(process),
        )
    }

    const PROD_SECRET: (&str, &str) = ("SECRET_KEY", "test-production-secret-key-12345678");

    #[test]
    fn test_base_defaults() {
        let settings = Settings::base(Path::new("/srv/gymnassic"));
        assert_eq!(settings.app_name, "Gymnassic");
        assert_eq!(settings.app_version, "2.0.0");
        assert!(!settings.debug);
        assert!(!settings.testing);
        assert_eq!(settings.env, Environment::Development);
        assert_eq!(settings.session_cookie_samesite, "Lax");
        assert!(settings.csrf_enabled);
        assert_eq!(settings.password_min_length, 8);
        assert_eq!(settings.mail_port, 587);
        assert_eq!(settings.mail_default_sender, "noreply@gymnassic.com");
        assert!(!settings.feature_online_payment);
        assert!(settings.feature_email_notifications);
        assert!(settings.database_url.starts_with("sqlite:///"));
        assert!(settings.gym_config_path.ends_with("gym_profile.json"));
        assert_eq!(settings.engine_options.engine, DatabaseEngine::Sqlite);
    }

    #[test]
    fn test_every_key_present_in_all_environments() {
        for environment in [
            Environment::Development,
            Environment::Production,
            Environment::Testing,
        ] {
            let settings = merge(environment, &[PROD_SECRET]).unwrap();
            let map = settings.to_map();
            for key in [
                "APP_NAME",
                "ENV",
                "BASE_DIR",
                "DATABASE_URL",
                "DB_ENGINE_OPTIONS",
                "SECRET_KEY",
                "PERMANENT_SESSION_LIFETIME",
                "REMEMBER_COOKIE_DURATION",
                "ALLOWED_EXTENSIONS",
                "MAIL_USERNAME",
                "SEND_FILE_MAX_AGE_DEFAULT",
            ] {
                assert!(map.contains_key(key), "{key} missing in {environment}");
            }
            assert!(map.values().all(|v| !v.is_null()), "null value in {environment}");
        }
    }

    #[test]
    fn test_development_variant() {
        let settings = merge(Environment::Development, &[]).unwrap();
        assert_eq!(settings.env, Environment::Development);
        assert!(settings.debug);
        assert!(settings.db_echo);
        assert!(!settings.session_cookie_secure);
        assert_eq!(settings.log_level, "DEBUG");
        assert!(settings.mail_suppress_send);
        assert_eq!(settings.send_file_max_age_default, 0);
    }

    #[test]
    fn test_production_requires_secret() {
        assert!(matches!(
            merge(Environment::Production, &[]),
            Err(ConfigError::InsecureSecretKey)
        ));
        assert!(matches!(
            merge(Environment::Production, &[("SECRET_KEY", DEFAULT_SECRET_KEY)]),
            Err(ConfigError::InsecureSecretKey)
        ));
        assert!(matches!(
            merge(Environment::Production, &[("SECRET_KEY", "  ")]),
            Err(ConfigError::InsecureSecretKey)
        ));
        assert!(merge(Environment::Production, &[PROD_SECRET]).is_ok());
    }

    #[test]
    fn test_default_secret_allowed_outside_production() {
        let settings = merge(Environment::Development, &[]).unwrap();
        assert_eq!(settings.secret_key, DEFAULT_SECRET_KEY);
    }

    #[test]
    fn test_production_variant_and_forced_security() {
        let settings = merge(
            Environment::Production,
            &[
                PROD_SECRET,
                ("SESSION_COOKIE_SECURE", "false"),
                ("CSRF_ENABLED", "false"),
            ],
        )
        .unwrap();

        assert_eq!(settings.env, Environment::Production);
        assert!(!settings.debug);
        assert!(settings.session_cookie_secure);
        assert!(settings.csrf_enabled);
        assert!(settings.remember_cookie_secure);
        assert_eq!(settings.preferred_url_scheme, "https");
        assert_eq!(settings.ratelimit_storage_url, "redis://localhost:6379/0");
        assert_eq!(settings.log_level, "WARNING");
        assert_eq!(settings.send_file_max_age_default, 31_536_000);
        assert!(settings.feature_online_payment);
        assert_eq!(settings.engine_options.engine, DatabaseEngine::Postgresql);
        assert!(settings.engine_options.pool.is_some());
    }

    #[test]
    fn test_testing_variant_pins_memory_database() {
        let settings = merge(
            Environment::Testing,
            &[("DATABASE_URL", "postgresql://db.example.com/real")],
        )
        .unwrap();

        assert!(settings.testing);
        assert!(settings.debug);
        assert_eq!(settings.database_url, "sqlite:///:memory:");
        assert_eq!(settings.engine_options.engine, DatabaseEngine::Sqlite);
        assert!(!settings.csrf_enabled);
        assert!(!settings.ratelimit_enabled);
        assert_eq!(settings.password_min_length, 4);
    }

    #[test]
    fn test_process_overrides_typed_values() {
        let settings = merge(
            Environment::Development,
            &[
                ("APP_NAME", "TestGym"),
                ("DEBUG", "false"),
                ("TIMEZONE", "America/New_York"),
                ("MAIL_PORT", "2525"),
                ("PASSWORD_MIN_LENGTH", "12"),
                ("MAIL_USE_TLS", "no"),
                ("FEATURE_SMS_NOTIFICATIONS", "YES"),
                ("ITEMS_PER_PAGE", "twenty"),
                ("ENV", "production"),
            ],
        )
        .unwrap();

        assert_eq!(settings.app_name, "TestGym");
        assert!(!settings.debug);
        assert_eq!(settings.timezone, "America/New_York");
        assert_eq!(settings.mail_port, 2525);
        assert_eq!(settings.password_min_length, 12);
        assert!(!settings.mail_use_tls);
        assert!(settings.feature_sms_notifications);
        assert_eq!(settings.items_per_page, 20);
        assert_eq!(settings.env, Environment::Development);
    }

    #[test]
    fn test_database_url_override_rederives_engine_options() {
        let settings = merge(
            Environment::Development,
            &[("DATABASE_URL", "postgresql://localhost/test"), ("DB_POOL_SIZE", "5")],
        )
        .unwrap();
        let pool = settings.engine_options.pool.as_ref().unwrap();
        assert_eq!(pool.pool_size, 5);
        assert_eq!(pool.max_overflow, 20);
    }

    #[test]
    fn test_resolve_in_reads_env_file_below_process() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env.testing"),
            "APP_NAME=FileGym\nTIMEZONE=Europe/Madrid\n",
        )
        .unwrap();

        let process = overrides(&[("APP_ENV", "testing"), ("APP_NAME", "ProcessGym")]);
        let settings = Settings::resolve_in(dir.path(), None, &process).unwrap();

        assert_eq!(settings.env, Environment::Testing);
        assert_eq!(settings.app_name, "ProcessGym");
        assert_eq!(settings.timezone, "Europe/Madrid");
    }

    #[test]
    fn test_resolution_collects_warnings() {
        let dir = tempdir().unwrap();
        let process = overrides(&[
            ("APP_ENV", "staging"),
            ("ITEMS_PER_PAGE", "twenty"),
        ]);
        let resolution = Settings::resolution_in(dir.path(), None, &process).unwrap();
        assert_eq!(resolution.settings.env, Environment::Development);
        assert_eq!(resolution.warnings.len(), 2);
        assert!(resolution.warnings[0].contains("staging"));
        assert!(resolution.warnings[1].contains("ITEMS_PER_PAGE"));

        let testing = Settings::resolution_in(
            dir.path(),
            Some("testing"),
            &overrides(&[("DATABASE_URL", "postgresql://db.example.com/real")]),
        )
        .unwrap();
        assert!(testing.warnings.iter().any(|w| w.contains("DATABASE_URL")));

        let production = Settings::resolution_in(
            dir.path(),
            Some("production"),
            &overrides(&[PROD_SECRET, ("CSRF_ENABLED", "false")]),
        )
        .unwrap();
        assert!(production.settings.csrf_enabled);
        assert!(production.warnings.iter().any(|w| w.contains("CSRF")));

        let clean = Settings::resolution_in(dir.path(), Some("development"), &Overrides::new()).unwrap();
        assert!(clean.warnings.is_empty());
    }

    #[test]
    fn test_resolve_in_malformed_env_file_fails() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".env.testing"), "APP_NAME=\"unterminated\n").unwrap();

        let result = Settings::resolve_in(dir.path(), Some("testing"), &Overrides::new());
        assert!(matches!(result, Err(ConfigError::EnvFile { .. })));
    }

    #[test]
    fn test_resolve_in_unknown_environment_falls_back() {
        let dir = tempdir().unwrap();
        let settings = Settings::resolve_in(dir.path(), Some("staging"), &Overrides::new()).unwrap();
        assert_eq!(settings.env, Environment::Development);
    }

    #[test]
    fn test_resolve_in_production_secret_from_env_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".env.production"), "SECRET_KEY=from-file-secret\n").unwrap();

        let settings = Settings::resolve_in(dir.path(), Some("production"), &Overrides::new()).unwrap();
        assert_eq!(settings.secret_key, "from-file-secret");
    }

    #[test]
    fn test_gym_config_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let settings = merge(
            Environment::Development,
            &[("GYM_CONFIG_PATH", dir.path().join("absent.json").to_str().unwrap())],
        )
        .unwrap();
        assert!(settings.gym_config().unwrap().is_none());
    }

    #[test]
    fn test_gym_config_loads_when_present() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gym_profile.json");
        std::fs::write(
            &path,
            r#"{"gym_name": "Test Integration Gym", "contact": {"email": "test@integration.com"}, "facilities": ["Weights", "Cardio"]}"#,
        )
        .unwrap();

        for environment in [Environment::Development, Environment::Testing, Environment::Production] {
            let settings = merge(
                environment,
                &[PROD_SECRET, ("GYM_CONFIG_PATH", path.to_str().unwrap())],
            )
            .unwrap();
            let gym = settings.gym_config().unwrap().unwrap();
            assert_eq!(gym.gym_name, "Test Integration Gym");
            assert!(gym.facilities.contains(&"Weights".to_string()));
        }
    }

    #[test]
    fn test_log_filter_accepts_level_aliases() {
        let mut settings = Settings::base(Path::new("."));
        settings.log_level = "WARNING".to_string();
        assert_eq!(settings.log_filter(), log::LevelFilter::Warn);
        settings.log_level = "critical".to_string();
        assert_eq!(settings.log_filter(), log::LevelFilter::Error);
        settings.log_level = "verbose".to_string();
        assert_eq!(settings.log_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_log_file_path() {
        let production = merge(Environment::Production, &[PROD_SECRET]).unwrap();
        assert_eq!(
            production.log_file_path(),
            Some(PathBuf::from("/srv/gymnassic/logs/gymnassic.log"))
        );
        let development = merge(Environment::Development, &[]).unwrap();
        assert!(development.log_file_path().is_none());
    }
}
