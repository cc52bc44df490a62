// src/models/gym.rs
// DOCUMENTATION: Gym profile document
// PURPOSE: Validated business profile of a single gym, persisted as JSON

use crate::errors::GymConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use validator::{Validate, ValidationError};

use super::{BusinessHours, GymAddress, GymContact, SocialMedia};

static CURRENCY_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency pattern is valid"));

static LANGUAGE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-[A-Z]{2})?$").expect("language pattern is valid"));

/// Legal and business information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BusinessInfo {
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1900, max = 2100))]
    pub established_year: Option<i64>,
}

/// Gym capacity settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GymCapacity {
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_members: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_concurrent_users: Option<i64>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_date_format() -> String {
    "MM/DD/YYYY".to_string()
}

/// Operational settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GymSettings {
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// ISO 4217 code, three uppercase letters
    #[serde(default = "default_currency")]
    #[validate(regex(path = "CURRENCY_CODE", code = "currency"))]
    pub currency: String,

    /// Lowercase language with optional uppercase region, e.g. "en" or "en-US"
    #[serde(default = "default_language")]
    #[validate(regex(path = "LANGUAGE_CODE", code = "language"))]
    pub language: String,

    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for GymSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            currency: default_currency(),
            language: default_language(),
            date_format: default_date_format(),
        }
    }
}

/// Custom key/value attribute beyond the standard schema
/// DOCUMENTATION: Any string is a valid key, including the empty string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymAttribute {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub description: Option<String>,
}

fn validate_unique_attribute_keys(config: &GymConfig) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if config
        .custom_attributes
        .iter()
        .all(|attr| seen.insert(attr.key.as_str()))
    {
        Ok(())
    } else {
        Err(ValidationError::new("duplicate_attribute_key"))
    }
}

/// Complete gym configuration and profile
/// DOCUMENTATION: Value object; construct with GymConfig::new() or load with
/// GymConfig::from_json_file(). Never persisted implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_unique_attribute_keys", skip_on_field_errors = false))]
pub struct GymConfig {
    /// Display name, stored trimmed
    #[validate(length(min = 1, max = 100))]
    pub gym_name: String,

    #[validate]
    pub contact: GymContact,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub business_name: Option<String>,

    #[serde(default)]
    #[validate(length(max = 200))]
    pub tagline: Option<String>,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[serde(default)]
    pub logo_url: Option<String>,

    #[serde(default)]
    #[validate]
    pub address: Option<GymAddress>,

    #[serde(default)]
    #[validate]
    pub business_hours: Option<BusinessHours>,

    #[serde(default)]
    #[validate]
    pub social_media: Option<SocialMedia>,

    #[serde(default)]
    #[validate]
    pub business_info: Option<BusinessInfo>,

    #[serde(default)]
    #[validate]
    pub capacity: Option<GymCapacity>,

    #[serde(default)]
    #[validate]
    pub settings: GymSettings,

    /// Facilities and amenities
    #[serde(default)]
    pub facilities: Vec<String>,

    #[serde(default)]
    pub custom_attributes: Vec<GymAttribute>,
}

impl GymConfig {
    /// Build a minimal validated profile
    pub fn new(gym_name: impl Into<String>, contact: GymContact) -> Result<Self, GymConfigError> {
        GymConfig {
            gym_name: gym_name.into(),
            contact,
            business_name: None,
            tagline: None,
            description: None,
            logo_url: None,
            address: None,
            business_hours: None,
            social_media: None,
            business_info: None,
            capacity: None,
            settings: GymSettings::default(),
            facilities: Vec::new(),
            custom_attributes: Vec::new(),
        }
        .validated()
    }

    /// Normalize and validate
    /// DOCUMENTATION: Trims the gym name, then checks every constraint and reports
    /// all violations together. URLs are stored in canonical form once valid
    pub fn validated(mut self) -> Result<Self, GymConfigError> {
        self.gym_name = self.gym_name.trim().to_string();
        self.validate()?;

        self.contact.canonicalize_urls();
        if let Some(social) = self.social_media.as_mut() {
            social.canonicalize_urls();
        }
        Ok(self)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, GymConfigError> {
        let config: GymConfig = serde_json::from_str(json)?;
        config.validated()
    }

    /// Load gym configuration from a JSON file
    /// DOCUMENTATION: NotFound when the path does not exist; Malformed for bad JSON
    /// or wrong types; Validation for constraint violations
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GymConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GymConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        GymConfig::from_json_str(&contents)
    }

    /// Save gym configuration to a JSON file, creating parent directories
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), GymConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        log::debug!("Saved gym profile to {}", path.display());
        Ok(())
    }

    /// Custom attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&Value> {
        self.custom_attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| &attr.value)
    }

    /// Custom attribute value by key, or `default` when absent
    pub fn get_attribute_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get_attribute(key).unwrap_or(default)
    }

    /// Set a custom attribute, replacing any entry with the same key
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>, description: Option<String>) {
        let key = key.into();
        self.custom_attributes.retain(|attr| attr.key != key);
        self.custom_attributes.push(GymAttribute {
            key,
            value: value.into(),
            description,
        });
    }

    /// Formatted single-line address, empty when no address is set
    pub fn get_display_address(&self) -> String {
        self.address
            .as_ref()
            .map(GymAddress::display)
            .unwrap_or_default()
    }

    /// Whether the gym is open on a day (full day name, any case)
    /// DOCUMENTATION: False when hours are unset, the day has no record or is closed
    pub fn is_open_on_day(&self, day_name: &str) -> bool {
        self.business_hours
            .as_ref()
            .and_then(|hours| hours.for_day(day_name))
            .map_or(false, |day| !day.closed && day.open.is_some())
    }

    /// Formatted hours for a day, e.g. "06:00 - 22:00" or "Closed"
    /// DOCUMENTATION: A day with only one of open/close reports "Hours not set"
    pub fn get_day_hours(&self, day_name: &str) -> String {
        let Some(day) = self
            .business_hours
            .as_ref()
            .and_then(|hours| hours.for_day(day_name))
        else {
            return "Hours not set".to_string();
        };

        if day.closed {
            return "Closed".to_string();
        }

        match (&day.open, &day.close) {
            (Some(open), Some(close)) => format!("{} - {}", open, close),
            _ => "Hours not set".to_string(),
        }
    }
}
