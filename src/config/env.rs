// src/config/env.rs
// DOCUMENTATION: Environment selection and environment variable management
// PURPOSE: Pick the active environment, read .env files and typed overrides

use crate::errors::ConfigError;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Process variable that selects the active environment
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

/// Raw key/value overrides from an env file or the process environment
pub type Overrides = HashMap<String, String>;

/// Deployment environment
/// DOCUMENTATION: Selects the settings variant and the .env file consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Testing,
}

impl Environment {
    /// Parse an environment tag (any case)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "production" => Some(Environment::Production),
            "testing" => Some(Environment::Testing),
            "development" => Some(Environment::Development),
            _ => None,
        }
    }

    /// Environment named by the argument, else by APP_ENV in `process`, else development
    /// DOCUMENTATION: An unknown name selects development and returns a warning
    /// for the caller to log
    pub fn select(name: Option<&str>, process: &Overrides) -> (Self, Option<String>) {
        let Some(name) = name.or_else(|| process.get(ENVIRONMENT_VAR).map(String::as_str)) else {
            return (Environment::Development, None);
        };

        match Environment::from_name(name) {
            Some(environment) => (environment, None),
            None => (
                Environment::Development,
                Some(format!("Unknown environment '{}', using development", name.trim())),
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Testing => "testing",
        }
    }

    /// File name of the environment-specific dotenv file
    pub fn env_file_name(&self) -> String {
        format!(".env.{}", self.as_str())
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    #[allow(dead_code)]
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    #[allow(dead_code)]
    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locate the dotenv file for an environment
/// DOCUMENTATION: Uses BASE_DIR/.env.<env>; falls back to BASE_DIR/.env when the
/// specific file is missing and the generic one exists
pub fn env_file_path(base_dir: &Path, environment: Environment) -> PathBuf {
    let specific = base_dir.join(environment.env_file_name());
    if !specific.exists() {
        let fallback = base_dir.join(".env");
        if fallback.exists() {
            return fallback;
        }
    }
    specific
}

/// Parse a dotenv file into overrides without touching the process environment
/// DOCUMENTATION: A missing file yields no overrides
pub fn load_env_file(path: &Path) -> Result<Overrides, ConfigError> {
    if !path.exists() {
        log::info!(
            "No environment file found at {}; using process environment only",
            path.display()
        );
        return Ok(Overrides::new());
    }

    let to_error = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let mut values = Overrides::new();
    for item in dotenv::from_path_iter(path).map_err(to_error)? {
        let (key, value) = item.map_err(to_error)?;
        values.insert(key, value);
    }

    log::info!("Loaded environment from: {}", path.display());
    Ok(values)
}

/// Snapshot of the process environment
pub fn process_overrides() -> Overrides {
    env::vars().collect()
}

/// Lenient boolean parsing: only true/1/yes/on (any case) are true
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Create a directory (and parents) if needed and return it
pub fn ensure_directory_exists(path: &Path) -> io::Result<PathBuf> {
    std::fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Typed view over layered overrides
/// DOCUMENTATION: Each setter leaves the target untouched when the key is absent.
/// Malformed numbers keep the current value and record a warning instead of failing.
pub struct Overlay<'a> {
    layers: [&'a Overrides; 2],
    warnings: RefCell<Vec<String>>,
}

impl<'a> Overlay<'a> {
    /// Later layers win: `file` is read first, `process` overrides it
    pub fn new(file: &'a Overrides, process: &'a Overrides) -> Self {
        Self {
            layers: [file, process],
            warnings: RefCell::new(Vec::new()),
        }
    }

    /// Warnings recorded while applying values
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings.into_inner()
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(key))
            .map(String::as_str)
    }

    pub fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = self.get(key) {
            *target = value.to_string();
        }
    }

    pub fn path(&self, key: &str, target: &mut PathBuf) {
        if let Some(value) = self.get(key) {
            *target = PathBuf::from(value);
        }
    }

    pub fn flag(&self, key: &str, target: &mut bool) {
        if let Some(value) = self.get(key) {
            *target = parse_bool(value);
        }
    }

    pub fn number<T: FromStr>(&self, key: &str, target: &mut T) {
        if let Some(value) = self.get(key) {
            match value.trim().parse() {
                Ok(parsed) => *target = parsed,
                Err(_) => self
                    .warnings
                    .borrow_mut()
                    .push(format!("Ignoring non-numeric value for {}: '{}'", key, value)),
            }
        }
    }

    pub fn seconds(&self, key: &str, target: &mut Duration) {
        let mut secs = target.as_secs();
        self.number(key, &mut secs);
        *target = Duration::from_secs(secs);
    }

    pub fn set(&self, key: &str, target: &mut BTreeSet<String>) {
        if let Some(value) = self.get(key) {
            *target = value
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect();
        }
    }
}
