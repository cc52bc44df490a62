// src/models/hours.rs
// DOCUMENTATION: Weekly business hours for the gym profile
// PURPOSE: Per-day open/close times with HH:MM validation and day lookup

use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 24-hour time of day, e.g. "06:00" or "9:30"
static TIME_OF_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("time-of-day pattern is valid")
});

/// Operating hours for a single day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DayHours {
    #[serde(default)]
    #[validate(regex(path = "TIME_OF_DAY", code = "time_format"))]
    pub open: Option<String>,

    #[serde(default)]
    #[validate(regex(path = "TIME_OF_DAY", code = "time_format"))]
    pub close: Option<String>,

    #[serde(default)]
    pub closed: bool,
}

impl DayHours {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: Some(open.to_string()),
            close: Some(close.to_string()),
            closed: false,
        }
    }

    pub fn closed() -> Self {
        Self {
            closed: true,
            ..Self::default()
        }
    }
}

/// Weekly business hours; days without a record are unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BusinessHours {
    #[serde(default)]
    #[validate]
    pub monday: Option<DayHours>,
    #[serde(default)]
    #[validate]
    pub tuesday: Option<DayHours>,
    #[serde(default)]
    #[validate]
    pub wednesday: Option<DayHours>,
    #[serde(default)]
    #[validate]
    pub thursday: Option<DayHours>,
    #[serde(default)]
    #[validate]
    pub friday: Option<DayHours>,
    #[serde(default)]
    #[validate]
    pub saturday: Option<DayHours>,
    #[serde(default)]
    #[validate]
    pub sunday: Option<DayHours>,
}

impl BusinessHours {
    /// Hours recorded for a weekday
    pub fn get(&self, day: Weekday) -> Option<&DayHours> {
        match day {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    /// Hours recorded for a full day name, case-insensitive
    pub fn for_day(&self, day_name: &str) -> Option<&DayHours> {
        parse_day_name(day_name).and_then(|day| self.get(day))
    }
}

/// Full English day name to weekday; abbreviations are not accepted
pub fn parse_day_name(day_name: &str) -> Option<Weekday> {
    match day_name.trim().to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
