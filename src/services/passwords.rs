// src/services/passwords.rs
// DOCUMENTATION: Password hashing context
// PURPOSE: bcrypt hashing/verification and the configured password policy

use crate::config::Settings;
use crate::errors::PasswordError;

/// Password rules from the PASSWORD_* settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special: bool,
}

impl PasswordPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            min_length: settings.password_min_length,
            require_uppercase: settings.password_require_uppercase,
            require_lowercase: settings.password_require_lowercase,
            require_numbers: settings.password_require_numbers,
            require_special: settings.password_require_special,
        }
    }

    /// Every rule the password breaks
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut violations = Vec::new();

        if password.chars().count() < self.min_length {
            violations.push(format!("must be at least {} characters", self.min_length));
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            violations.push("must contain an uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            violations.push("must contain a lowercase letter".to_string());
        }
        if self.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("must contain a number".to_string());
        }
        if self.require_special
            && !password
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
        {
            violations.push("must contain a special character".to_string());
        }

        violations
    }
}

/// Shared password hashing service
/// DOCUMENTATION: Hashing runs on the blocking thread pool
#[derive(Debug, Clone)]
pub struct PasswordContext {
    cost: u32,
    policy: PasswordPolicy,
}

impl PasswordContext {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cost: settings.password_hash_rounds,
            policy: PasswordPolicy::from_settings(settings),
        }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Check the policy, reporting every failed rule
    pub fn check_policy(&self, password: &str) -> Result<(), PasswordError> {
        let violations = self.policy.violations(password);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(PasswordError::Policy(violations))
        }
    }

    /// Hash a password that satisfies the policy
    #[allow(dead_code)]
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        self.check_policy(password)?;

        let password = password.to_string();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    /// Verify a password against a stored bcrypt hash
    #[allow(dead_code)]
    pub async fn verify(&self, password: &str, hashed: &str) -> Result<bool, PasswordError> {
        let password = password.to_string();
        let hashed = hashed.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed)).await??;
        Ok(matches)
    }
}
