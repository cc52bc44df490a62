// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Build the application state and start the HTTP server

mod app;
mod config;
mod errors;
mod handlers;
mod logging;
mod models;
mod services;

use actix_web::middleware::{from_fn, Compress, Condition, Logger};
use actix_web::{web, App, HttpServer};
use services::{enforce_rate_limit, start_cleanup_task};
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Resolve configuration, initialize logging and extensions
    let state = match app::create_app(None).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Startup failed: {:#}", e);
            eprintln!("Startup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    // Forget idle rate limit clients every 5 minutes
    if let Some(limits) = &state.rate_limits {
        start_cleanup_task(limits.clone(), 300);
        log::info!("Started rate limit cleanup task (interval: 5 minutes)");
    }

    // 2. Start HTTP server
    let server_addr = format!(
        "{}:{}",
        state.settings.server_address, state.settings.server_port
    );
    let debug = state.settings.debug;
    let max_content_length = state.settings.max_content_length;
    log::info!("Server Address: {}", server_addr);

    HttpServer::new(move || {
        App::new()
            // Application state
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(max_content_length))
            .app_data(web::JsonConfig::default().limit(max_content_length))
            // Middleware
            .wrap(Condition::new(!debug, app::security_headers()))
            .wrap(from_fn(enforce_rate_limit))
            .wrap(Compress::default())
            .wrap(Logger::default())
            // Routes
            .configure(app::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
