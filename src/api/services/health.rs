//! 健康检查端点
//!
//! /health       整体状态 + 存储检查
//! /health/live  存活探针（无依赖）
//! /health/ready 就绪探针（存储探活）

use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::storage::SeaOrmStorage;

/// 应用启动时间（uptime 计算用）
#[derive(Clone)]
pub struct AppStartTime {
    pub start_datetime: DateTime<Utc>,
}

pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        storage: web::Data<Arc<SeaOrmStorage>>,
        start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let now = Utc::now();
        let uptime = now
            .signed_duration_since(start_time.start_datetime)
            .num_seconds()
            .max(0);

        let storage_check = match storage.ping().await {
            Ok(()) => json!({ "status": "ok", "backend": storage.backend_name() }),
            Err(e) => json!({ "status": "error", "error": e.to_string() }),
        };
        let healthy = storage_check["status"] == "ok";

        let body = json!({
            "status": if healthy { "ok" } else { "degraded" },
            "timestamp": now.to_rfc3339(),
            "uptime": uptime,
            "checks": { "storage": storage_check },
        });

        if healthy {
            HttpResponse::Ok().json(body)
        } else {
            HttpResponse::ServiceUnavailable().json(body)
        }
    }

    pub async fn liveness_check() -> impl Responder {
        HttpResponse::Ok().json(json!({ "status": "alive" }))
    }

    pub async fn readiness_check(storage: web::Data<Arc<SeaOrmStorage>>) -> impl Responder {
        match storage.ping().await {
            Ok(()) => HttpResponse::Ok().json(json!({ "status": "ready" })),
            Err(e) => HttpResponse::ServiceUnavailable()
                .json(json!({ "status": "not_ready", "error": e.to_string() })),
        }
    }
}

/// 健康检查路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
}
