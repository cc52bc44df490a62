// src/config/db.rs
// DOCUMENTATION: Database engine options and connection pool initialization
// PURPOSE: Derive pool settings from the connection URL scheme and build the sqlx pool

use crate::config::{ensure_directory_exists, Settings};
use serde::Serialize;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SQLITE_PREFIX: &str = "sqlite:///";
const SQLITE_MEMORY: &str = ":memory:";

/// Database engine detected from a connection URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Sqlite,
    Postgresql,
    Mysql,
}

impl DatabaseEngine {
    /// Detect the engine by URL prefix
    /// DOCUMENTATION: Unknown schemes fall back to PostgreSQL
    pub fn from_url(database_url: &str) -> Self {
        if database_url.starts_with("sqlite") {
            DatabaseEngine::Sqlite
        } else if database_url.starts_with("postgresql") || database_url.starts_with("postgres") {
            DatabaseEngine::Postgresql
        } else if database_url.starts_with("mysql") {
            DatabaseEngine::Mysql
        } else {
            DatabaseEngine::Postgresql
        }
    }
}

/// Inputs for engine option derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    pub pool_pre_ping: bool,
    pub pool_size: u32,
    pub max_overflow: u32,
    /// Seconds before a pooled connection is recycled
    pub pool_recycle: u64,
    /// Seconds to wait for a pooled connection
    pub pool_timeout: u64,
    /// Seconds to wait when opening a connection
    pub connect_timeout: u64,
    pub app_name: String,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            pool_pre_ping: true,
            pool_size: 10,
            max_overflow: 20,
            pool_recycle: 3600,
            pool_timeout: 30,
            connect_timeout: 10,
            app_name: "gymnassic".to_string(),
        }
    }
}

/// Pool sizing, only meaningful for server databases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSizing {
    pub pool_size: u32,
    pub max_overflow: u32,
    pub pool_recycle: u64,
    pub pool_timeout: u64,
}

/// Driver-level connection arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_same_thread: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
}

/// Derived connection pool options for one database URL
/// DOCUMENTATION: SQLite carries no pool sizing; PostgreSQL and MySQL share the
/// pool shape and differ only in connect args
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineOptions {
    pub engine: DatabaseEngine,
    pub pool_pre_ping: bool,
    #[serde(flatten)]
    pub pool: Option<PoolSizing>,
    pub connect_args: ConnectArgs,
}

/// Derive engine options from a database URL
/// DOCUMENTATION: Pure function, called once at settings resolution
pub fn derive_engine_options(database_url: &str, params: &EngineParams) -> EngineOptions {
    let engine = DatabaseEngine::from_url(database_url);

    let pool = || PoolSizing {
        pool_size: params.pool_size,
        max_overflow: params.max_overflow,
        pool_recycle: params.pool_recycle,
        pool_timeout: params.pool_timeout,
    };

    let (pool, connect_args) = match engine {
        DatabaseEngine::Sqlite => (
            None,
            ConnectArgs {
                check_same_thread: Some(false),
                ..ConnectArgs::default()
            },
        ),
        DatabaseEngine::Postgresql => (
            Some(pool()),
            ConnectArgs {
                connect_timeout: Some(params.connect_timeout),
                application_name: Some(params.app_name.clone()),
                ..ConnectArgs::default()
            },
        ),
        DatabaseEngine::Mysql => (
            Some(pool()),
            ConnectArgs {
                connect_timeout: Some(params.connect_timeout),
                ..ConnectArgs::default()
            },
        ),
    };

    EngineOptions {
        engine,
        pool_pre_ping: params.pool_pre_ping,
        pool,
        connect_args,
    }
}

/// SQLite URL for a database file inside the instance directory
pub fn sqlite_url(instance_path: &Path, filename: &str) -> String {
    format!("{}{}", SQLITE_PREFIX, instance_path.join(filename).display())
}

/// PostgreSQL URL from its parts
#[allow(dead_code)]
pub fn postgres_url(
    username: &str,
    password: &str,
    host: Option<&str>,
    port: Option<u16>,
    database: Option<&str>,
) -> String {
    format!(
        "postgresql://{}:{}@{}:{}/{}",
        username,
        password,
        host.unwrap_or("localhost"),
        port.unwrap_or(5432),
        database.unwrap_or("gymnassic_db")
    )
}

/// Create the instance directory holding file databases
pub fn ensure_instance_directory(settings: &Settings) -> io::Result<PathBuf> {
    ensure_directory_exists(&settings.instance_path)
}

/// File path of a `sqlite:///path` URL, None for in-memory databases
fn sqlite_file(database_url: &str) -> Option<&Path> {
    database_url
        .strip_prefix(SQLITE_PREFIX)
        .filter(|rest| !rest.is_empty() && !rest.starts_with(SQLITE_MEMORY))
        .map(Path::new)
}

/// Translate a configured URL into the form sqlx expects
/// DOCUMENTATION: `sqlite:///:memory:` becomes `sqlite::memory:`, file databases are
/// opened in create mode, PostgreSQL URLs gain the application name
pub fn connection_url(database_url: &str, options: &EngineOptions) -> Result<String, sqlx::Error> {
    match options.engine {
        DatabaseEngine::Sqlite => match sqlite_file(database_url) {
            Some(path) => Ok(format!("sqlite://{}?mode=rwc", path.display())),
            None if database_url.contains(SQLITE_MEMORY) => Ok("sqlite::memory:".to_string()),
            None => Ok(database_url.to_string()),
        },
        DatabaseEngine::Postgresql => {
            let Some(app_name) = options.connect_args.application_name.as_deref() else {
                return Ok(database_url.to_string());
            };
            let mut url = url::Url::parse(database_url)
                .map_err(|e| sqlx::Error::Configuration(Box::new(e)))?;
            if !url.query_pairs().any(|(key, _)| key == "application_name") {
                url.query_pairs_mut().append_pair("application_name", app_name);
            }
            Ok(url.to_string())
        }
        DatabaseEngine::Mysql => Ok(database_url.to_string()),
    }
}

/// Initialize the database connection pool
/// DOCUMENTATION: Creates the pool from the derived engine options
/// Called once during application startup
/// Returns pool that is used for all database operations
pub async fn init_db_pool(settings: &Settings) -> Result<AnyPool, sqlx::Error> {
    install_default_drivers();

    let options = &settings.engine_options;
    if let Some(path) = sqlite_file(&settings.database_url) {
        ensure_instance_directory(settings)?;
        if let Some(parent) = path.parent() {
            ensure_directory_exists(parent)?;
        }
    }

    let url = connection_url(&settings.database_url, options)?;
    log::info!("Initializing database pool: {}", settings.database_url);

    let mut pool_options = AnyPoolOptions::new().test_before_acquire(options.pool_pre_ping);

    pool_options = match &options.pool {
        Some(sizing) => pool_options
            .max_connections(sizing.pool_size + sizing.max_overflow)
            .acquire_timeout(Duration::from_secs(sizing.pool_timeout))
            .max_lifetime(Duration::from_secs(sizing.pool_recycle)),
        // Each in-memory SQLite connection is a separate database
        None if url == "sqlite::memory:" => pool_options.max_connections(1),
        None => pool_options,
    };

    let connect = pool_options.connect(&url);
    let pool = match options.connect_args.connect_timeout {
        Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), connect)
            .await
            .map_err(|_| {
                log::error!("Database connection timed out after {}s", seconds);
                sqlx::Error::PoolTimedOut
            })??,
        None => connect.await?,
    };

    // Verify connection works
    sqlx::query("SELECT 1").execute(&pool).await?;

    log::info!("Database pool initialized successfully");
    Ok(pool)
}
