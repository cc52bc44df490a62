// src/models/contact.rs
// DOCUMENTATION: Contact, address and social media sections of the gym profile

use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError};

/// Accept only absolute http(s) URLs with a host
pub(crate) fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(ValidationError::new("http_url")),
    }
}

/// Rewrite a valid URL into canonical form (e.g. "https://gym.com" -> "https://gym.com/")
fn canonicalize_url(value: &mut Option<String>) {
    if let Some(url) = value.as_deref().and_then(|raw| Url::parse(raw).ok()) {
        *value = Some(url.to_string());
    }
}

/// Gym contact information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GymContact {
    #[validate(email)]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub phone_secondary: Option<String>,

    #[serde(default)]
    pub fax: Option<String>,

    /// Public website; canonical form once validated
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub website: Option<String>,
}

impl GymContact {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            phone: None,
            phone_secondary: None,
            fax: None,
            website: None,
        }
    }

    pub(crate) fn canonicalize_urls(&mut self) {
        canonicalize_url(&mut self.website);
    }
}

fn default_country() -> String {
    "USA".to_string()
}

/// Gym physical address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GymAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub street2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for GymAddress {
    fn default() -> Self {
        Self {
            street: None,
            street2: None,
            city: None,
            state: None,
            postal_code: None,
            country: default_country(),
        }
    }
}

fn present(part: &Option<String>) -> Option<&str> {
    part.as_deref().filter(|s| !s.is_empty())
}

impl GymAddress {
    /// Single-line address: street lines, "city, state, postal", country
    /// DOCUMENTATION: Unset or empty components are skipped
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = [&self.street, &self.street2]
            .into_iter()
            .filter_map(present)
            .map(String::from)
            .collect();

        let locality: Vec<&str> = [&self.city, &self.state, &self.postal_code]
            .into_iter()
            .filter_map(present)
            .collect();
        if !locality.is_empty() {
            parts.push(locality.join(", "));
        }

        if !self.country.is_empty() {
            parts.push(self.country.clone());
        }

        parts.join(", ")
    }
}

/// Social media profile URLs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct SocialMedia {
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub facebook: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub instagram: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub twitter: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub youtube: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub linkedin: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub tiktok: Option<String>,
}

impl SocialMedia {
    pub(crate) fn canonicalize_urls(&mut self) {
        for url in [
            &mut self.facebook,
            &mut self.instagram,
            &mut self.twitter,
            &mut self.youtube,
            &mut self.linkedin,
            &mut self.tiktok,
        ] {
            canonicalize_url(url);
        }
    }
}
