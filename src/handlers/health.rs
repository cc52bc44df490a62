// src/handlers/health.rs
// DOCUMENTATION: Health check handler
// PURPOSE: Report service identity, environment, database reachability and the gym profile

use crate::app::AppState;
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "ok",
        Err(e) => {
            log::warn!("Health check database ping failed: {}", e);
            "unavailable"
        }
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": state.settings.app_name,
        "version": state.settings.app_version,
        "environment": state.settings.env,
        "database": database,
        "gym_name": state.gym.as_ref().map(|gym| gym.gym_name.clone())
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
