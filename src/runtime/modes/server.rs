//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! Route layout, outermost first:
//! - `/api/v1/analytics/*` — authenticated read API (CORS + WorkspaceAuth)
//! - `/health*` — probes
//! - `/{slug}` — the redirect edge, registered last as the catch-all

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Compress, web};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::middleware::WorkspaceAuth;
use crate::api::services::{AppStartTime, analytics_routes, health_routes, redirect_routes};
use crate::config::CorsConfig;
use crate::runtime::lifetime;

/// Build CORS middleware from configuration
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    if !cors_config.enabled {
        return Cors::permissive();
    }

    let mut cors = Cors::default();

    if cors_config.allowed_origins.is_empty() {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    for method in &cors_config.allowed_methods {
        if let Ok(m) = method.to_string().parse::<actix_web::http::Method>() {
            cors = cors.allowed_methods(vec![m]);
        }
    }

    for header in &cors_config.allowed_headers {
        cors = cors.allowed_header(header);
    }

    cors.max_age(cors_config.max_age as usize)
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &crate::config::AppConfig) -> Result<()> {
    // Record application start time
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    debug!("Starting pre-startup processing...");

    let startup = lifetime::startup::prepare_server_startup()
        .await
        .map_err(|e| anyhow::anyhow!("startup failed: {}", e))?;

    let storage = startup.storage;
    let counters = startup.counters;
    let plan_cache = startup.plan_cache;
    let resolver = startup.resolver;
    let analytics = startup.analytics;
    let pipeline = startup.pipeline;

    debug!(
        "Pre-startup processing completed in {} ms",
        chrono::Utc::now()
            .signed_duration_since(app_start_time.start_datetime)
            .num_milliseconds()
    );

    let cpu_count = config.server.cpu_count.min(32);
    let cors_config = config.cors.clone();
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);

        App::new()
            .wrap(Compress::default())
            .app_data(web::Data::new(Arc::clone(&storage)))
            .app_data(web::Data::new(Arc::clone(&counters)))
            .app_data(web::Data::new(Arc::clone(&plan_cache)))
            .app_data(web::Data::new(Arc::clone(&resolver)))
            .app_data(web::Data::new(Arc::clone(&analytics)))
            .app_data(web::Data::new(Arc::clone(&pipeline)))
            .app_data(web::Data::new(app_start_time.clone()))
            .service(
                web::scope("/api").wrap(cors).service(
                    web::scope("/v1").service(analytics_routes().wrap(WorkspaceAuth)),
                ),
            )
            .service(health_routes())
            // 重定向必须最后注册（catch-all）
            .service(redirect_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(bind_address)?.run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown() => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
