// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for configuration, gym profile and HTTP layers

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

/// Configuration resolution failures
/// DOCUMENTATION: Every variant aborts startup; main.rs exits on any of them
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "SECRET_KEY must be set to a secure value in production. \
         Set the SECRET_KEY environment variable."
    )]
    InsecureSecretKey,

    #[error("Failed to read environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    #[error("Invalid rate limit '{value}' for {key}: {reason}")]
    InvalidRateLimit {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Gym profile document failures
/// DOCUMENTATION: Validation carries every violated constraint, not just the first
#[derive(Error, Debug)]
pub enum GymConfigError {
    #[error("Gym config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid gym config document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Gym config I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Password hashing and policy failures
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password does not meet policy: {}", .0.join("; "))]
    Policy(Vec<String>),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Application-specific HTTP errors
/// DOCUMENTATION: Each variant maps to an HTTP status code and JSON error body
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal server error: {0}")]
    #[allow(dead_code)]
    Internal(String),
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
