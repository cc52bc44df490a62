// src/app.rs
// DOCUMENTATION: Application factory
// PURPOSE: Resolve settings, load the gym profile and build shared dependencies once

use crate::config::{self, Settings};
use crate::handlers;
use crate::logging;
use crate::models::GymConfig;
use crate::services::{PasswordContext, RateLimits};
use actix_web::middleware::DefaultHeaders;
use actix_web::web;
use anyhow::Context;
use sqlx::AnyPool;
use std::sync::Arc;

/// Shared application dependencies
/// DOCUMENTATION: Built once at startup and handed to actix as web::Data
pub struct AppState {
    pub settings: Arc<Settings>,
    /// None when no gym profile file is configured
    pub gym: Option<Arc<GymConfig>>,
    pub db: AnyPool,
    /// None when rate limiting is disabled
    pub rate_limits: Option<Arc<RateLimits>>,
    #[allow(dead_code)]
    pub passwords: PasswordContext,
}

/// Create the application state for an environment
/// DOCUMENTATION: Uses APP_ENV (default development) when no name is given.
/// An insecure production configuration aborts here.
pub async fn create_app(environment_name: Option<&str>) -> anyhow::Result<AppState> {
    let resolution = Settings::resolve(environment_name).context("Configuration error")?;
    logging::init_logging(&resolution.settings)?;
    // Resolution runs before a logger exists; emit its warnings now
    let settings = resolution.into_logged();

    log::info!("Starting {} v{}...", settings.app_name, settings.app_version);
    log::info!("Environment: {}", settings.env);
    log::info!("Debug: {}", settings.debug);
    log::info!("Database: {}", settings.database_url);
    log::info!(
        "Session cookie secure: {}, CSRF enabled: {}",
        settings.session_cookie_secure,
        settings.csrf_enabled
    );

    init_extensions(settings).await
}

/// Build every dependency from resolved settings
pub async fn init_extensions(settings: Settings) -> anyhow::Result<AppState> {
    let gym = settings
        .gym_config()
        .with_context(|| format!("Invalid gym profile at {}", settings.gym_config_path.display()))?
        .map(Arc::new);

    if let Some(gym) = &gym {
        log::info!("Gym profile loaded: {}", gym.gym_name);
    }

    let db = config::init_db_pool(&settings)
        .await
        .context("Failed to connect to database")?;

    let rate_limits = RateLimits::from_settings(&settings)?.map(Arc::new);
    let passwords = PasswordContext::from_settings(&settings);

    Ok(AppState {
        settings: Arc::new(settings),
        gym,
        db,
        rate_limits,
        passwords,
    })
}

/// Security headers applied outside debug mode
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Strict-Transport-Security", "max-age=31536000; includeSubDomains"))
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
}

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(handlers::health_config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, Overrides};
    use crate::services::enforce_rate_limit;
    use actix_web::middleware::{from_fn, Condition};
    use actix_web::{http::StatusCode, test, App};
    use tempfile::tempdir;

    fn testing_settings(process: &[(&str, &str)]) -> (tempfile::TempDir, Settings) {
        let dir = tempdir().unwrap();
        let process: Overrides = process
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = Settings::resolve_in(dir.path(), Some("testing"), &process).unwrap();
        (dir, settings)
    }

    #[actix_rt::test]
    async fn test_init_extensions_testing() {
        let (_dir, settings) = testing_settings(&[]);
        let state = init_extensions(settings).await.unwrap();

        assert_eq!(state.settings.env, Environment::Testing);
        assert!(state.gym.is_none());
        assert!(state.rate_limits.is_none());
        assert_eq!(state.passwords.policy().min_length, 4);
    }

    #[actix_rt::test]
    async fn test_init_extensions_loads_gym_profile() {
        let (dir, mut settings) = testing_settings(&[]);
        let path = dir.path().join("gym_profile.json");
        GymConfig::new("Iron Temple", crate::models::GymContact::new("hi@iron.gym"))
            .unwrap()
            .to_json_file(&path)
            .unwrap();
        settings.gym_config_path = path;

        let state = init_extensions(settings).await.unwrap();
        assert_eq!(state.gym.unwrap().gym_name, "Iron Temple");
    }

    #[actix_rt::test]
    async fn test_init_extensions_rejects_invalid_gym_profile() {
        let (dir, mut settings) = testing_settings(&[]);
        let path = dir.path().join("gym_profile.json");
        std::fs::write(&path, r#"{"gym_name": " ", "contact": {"email": "x@y.com"}}"#).unwrap();
        settings.gym_config_path = path;

        assert!(init_extensions(settings).await.is_err());
    }

    #[actix_rt::test]
    async fn test_rate_limited_app_returns_429() {
        let (_dir, settings) = testing_settings(&[
            ("RATELIMIT_ENABLED", "true"),
            ("RATELIMIT_DEFAULT", "1 per hour"),
        ]);
        let state = web::Data::new(init_extensions(settings).await.unwrap());
        let debug = state.settings.debug;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .wrap(Condition::new(!debug, security_headers()))
                .wrap(from_fn(enforce_rate_limit))
                .configure(configure),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_rt::test]
    async fn test_rate_limit_keyed_by_peer_not_forwarded_header() {
        let (_dir, settings) = testing_settings(&[
            ("RATELIMIT_ENABLED", "true"),
            ("RATELIMIT_DEFAULT", "1 per hour"),
        ]);
        let state = web::Data::new(init_extensions(settings).await.unwrap());

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .wrap(from_fn(enforce_rate_limit))
                .configure(configure),
        )
        .await;

        let peer: std::net::SocketAddr = "10.0.0.7:40000".parse().unwrap();
        let request = |forwarded: &str| {
            test::TestRequest::get()
                .uri("/health")
                .peer_addr(peer)
                .insert_header(("x-forwarded-for", forwarded.to_string()))
                .to_request()
        };

        let first = test::call_service(&app, request("1.2.3.1")).await;
        assert_eq!(first.status(), StatusCode::OK);

        let spoofed = test::call_service(&app, request("1.2.3.2")).await;
        assert_eq!(spoofed.status(), StatusCode::TOO_MANY_REQUESTS);

        let other_peer = test::TestRequest::get()
            .uri("/health")
            .peer_addr("10.0.0.8:40000".parse().unwrap())
            .to_request();
        let resp = test::call_service(&app, other_peer).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_security_headers_outside_debug() {
        let (_dir, settings) = testing_settings(&[("DEBUG", "false")]);
        let state = web::Data::new(init_extensions(settings).await.unwrap());
        let debug = state.settings.debug;

        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .wrap(Condition::new(!debug, security_headers()))
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.headers().contains_key("strict-transport-security"));
        assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
    }
}
