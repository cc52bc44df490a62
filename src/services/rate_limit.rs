// src/services/rate_limit.rs
// DOCUMENTATION: Per-client request rate limiting
// PURPOSE: Parse "N per period" limit strings into keyed governor limiters and
// enforce them as actix middleware

use crate::app::AppState;
use crate::config::Settings;
use crate::errors::{AppError, ConfigError};
use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, ResponseError};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// One limit: `count` requests per `period`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub count: NonZeroU32,
    pub period: Duration,
}

fn unit_seconds(unit: &str) -> Option<u64> {
    let unit = unit.trim().to_lowercase();
    let unit = unit.strip_suffix('s').unwrap_or(&unit);
    match unit {
        "second" | "sec" => Some(1),
        "minute" | "min" => Some(60),
        "hour" | "hr" => Some(3600),
        "day" => Some(86_400),
        "month" => Some(30 * 86_400),
        "year" => Some(365 * 86_400),
        _ => None,
    }
}

impl FromStr for RateLimit {
    type Err = String;

    /// Accepts "200 per day", "5 per 15 minutes" and "10/hour"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, period) = s
            .split_once(" per ")
            .or_else(|| s.split_once('/'))
            .ok_or_else(|| format!("expected '<count> per <period>' in '{}'", s.trim()))?;

        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| format!("invalid count '{}'", count.trim()))?;
        let count = NonZeroU32::new(count).ok_or("count must be positive")?;

        let mut words = period.split_whitespace();
        let (multiplier, unit) = match (words.next(), words.next(), words.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(n), Some(unit), None) => {
                let n: u64 = n.parse().map_err(|_| format!("invalid multiplier '{}'", n))?;
                (n, unit)
            }
            _ => return Err(format!("invalid period '{}'", period.trim())),
        };

        let seconds = unit_seconds(unit).ok_or_else(|| format!("unknown unit '{}'", unit))?;
        if multiplier == 0 {
            return Err("period must be positive".to_string());
        }

        Ok(RateLimit {
            count,
            period: Duration::from_secs(seconds * multiplier),
        })
    }
}

/// Parse a comma or semicolon separated list of limits
pub fn parse_rate_limits(key: &'static str, value: &str) -> Result<Vec<RateLimit>, ConfigError> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse().map_err(|reason| ConfigError::InvalidRateLimit {
                key,
                value: value.to_string(),
                reason,
            })
        })
        .collect()
}

fn build_limiter(limit: &RateLimit) -> KeyedLimiter {
    // Refill one request every period/count, allow the full count as burst
    let interval = limit.period / limit.count.get();
    let quota = Quota::with_period(interval.max(Duration::from_nanos(1)))
        .map(|quota| quota.allow_burst(limit.count))
        .unwrap_or_else(|| Quota::per_second(limit.count));
    RateLimiter::keyed(quota)
}

/// A group of limits that must all pass
struct LimitSet {
    limiters: Vec<(RateLimit, KeyedLimiter)>,
}

impl LimitSet {
    fn new(limits: &[RateLimit]) -> Self {
        Self {
            limiters: limits.iter().map(|l| (*l, build_limiter(l))).collect(),
        }
    }

    fn check(&self, key: &str) -> bool {
        let key = key.to_string();
        self.limiters
            .iter()
            .all(|(_, limiter)| limiter.check_key(&key).is_ok())
    }

    fn retain_recent(&self) {
        for (_, limiter) in &self.limiters {
            limiter.retain_recent();
        }
    }
}

/// In-memory rate limiters for all requests and for login attempts
/// DOCUMENTATION: Keyed by client address; built once at startup
pub struct RateLimits {
    default: LimitSet,
    login: LimitSet,
}

impl RateLimits {
    pub fn new(default: &[RateLimit], login: &[RateLimit]) -> Self {
        Self {
            default: LimitSet::new(default),
            login: LimitSet::new(login),
        }
    }

    /// Build from RATELIMIT_* settings; None when rate limiting is disabled
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>, ConfigError> {
        if !settings.ratelimit_enabled {
            log::info!("Rate limiting disabled");
            return Ok(None);
        }

        if !settings.ratelimit_storage_url.starts_with("memory://") {
            log::warn!(
                "Rate limit storage {} is not available; limits are kept in process memory",
                settings.ratelimit_storage_url
            );
        }

        let default = parse_rate_limits("RATELIMIT_DEFAULT", &settings.ratelimit_default)?;
        let login = parse_rate_limits("RATELIMIT_LOGIN_ATTEMPTS", &settings.ratelimit_login_attempts)?;
        log::info!(
            "Rate limiting enabled: default '{}', login '{}'",
            settings.ratelimit_default,
            settings.ratelimit_login_attempts
        );

        Ok(Some(RateLimits::new(&default, &login)))
    }

    /// Record a request from `key`; false when any default limit is exceeded
    pub fn check(&self, key: &str) -> bool {
        self.default.check(key)
    }

    /// Record a login attempt from `key`; false when the login limit is exceeded
    #[allow(dead_code)]
    pub fn check_login(&self, key: &str) -> bool {
        self.login.check(key)
    }

    /// Drop state for clients whose limits have fully replenished
    pub fn cleanup(&self) {
        self.default.retain_recent();
        self.login.retain_recent();
    }
}

/// Start background cleanup task
/// DOCUMENTATION: Periodically forgets idle clients
pub fn start_cleanup_task(limits: Arc<RateLimits>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));

        loop {
            interval.tick().await;
            limits.cleanup();
        }
    });
}

/// Peer IP address; forwarding headers are client-controlled and ignored
fn client_key(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting clients over their limit with 429
pub async fn enforce_rate_limit<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let limits = req
        .app_data::<web::Data<AppState>>()
        .and_then(|state| state.rate_limits.clone());

    if let Some(limits) = limits {
        let key = client_key(&req);
        if !limits.check(&key) {
            log::warn!("Rate limit exceeded for {} on {}", key, req.path());
            let response = AppError::RateLimitExceeded.error_response();
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(count: u32, secs: u64) -> RateLimit {
        RateLimit {
            count: NonZeroU32::new(count).unwrap(),
            period: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_parse_single_limits() {
        assert_eq!("200 per day".parse::<RateLimit>().unwrap(), limit(200, 86_400));
        assert_eq!("5 per 15 minutes".parse::<RateLimit>().unwrap(), limit(5, 900));
        assert_eq!("10/hour".parse::<RateLimit>().unwrap(), limit(10, 3600));
        assert_eq!("1 per second".parse::<RateLimit>().unwrap(), limit(1, 1));
    }

    #[test]
    fn test_parse_invalid_limits() {
        for bad in ["many per day", "0 per day", "5 per fortnight", "5 every day", "5 per 0 days"] {
            assert!(bad.parse::<RateLimit>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_parse_limit_list() {
        let limits = parse_rate_limits("RATELIMIT_DEFAULT", "200 per day, 50 per hour").unwrap();
        assert_eq!(limits, vec![limit(200, 86_400), limit(50, 3600)]);

        let err = parse_rate_limits("RATELIMIT_DEFAULT", "200 per day; lots").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRateLimit { key: "RATELIMIT_DEFAULT", .. }));
    }

    #[test]
    fn test_limits_are_per_client() {
        let limits = RateLimits::new(&[limit(2, 3600)], &[limit(1, 900)]);

        assert!(limits.check("10.0.0.1"));
        assert!(limits.check("10.0.0.1"));
        assert!(!limits.check("10.0.0.1"));
        assert!(limits.check("10.0.0.2"));

        assert!(limits.check_login("10.0.0.1"));
        assert!(!limits.check_login("10.0.0.1"));
    }

    #[test]
    fn test_all_limits_must_pass() {
        let limits = RateLimits::new(&[limit(100, 86_400), limit(1, 3600)], &[]);
        assert!(limits.check("client"));
        assert!(!limits.check("client"));
    }

    #[test]
    fn test_disabled_in_testing_environment() {
        let settings = Settings::for_environment(
            crate::config::Environment::Testing,
            std::path::Path::new("."),
        );
        assert!(RateLimits::from_settings(&settings).unwrap().is_none());
    }

    #[test]
    fn test_invalid_setting_fails_startup() {
        let mut settings = Settings::base(std::path::Path::new("."));
        settings.ratelimit_login_attempts = "five per minute".to_string();
        assert!(RateLimits::from_settings(&settings).is_err());
    }
}
