//! Analytics API 端点
//!
//! 全部只读汇总表；调用方身份由认证中间件放进请求扩展。
//! range 超出套餐回看上限 → VALIDATION_ERROR，不读任何汇总。

use std::sync::Arc;

use actix_web::{HttpMessage, HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::debug;

use crate::api::envelope::{ApiErrorCode, error_from_shortspan, error_response, success};
use crate::api::middleware::AuthedWorkspace;
use crate::services::{AnalyticsService, RangeToken};

/// Analytics 查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsQuery {
    /// 范围令牌：7d / 30d / 90d / all，默认 7d
    pub range: Option<String>,
}

/// 取认证身份 + 解析范围令牌（两步失败各自对应 401 / 400）
fn parse_request(
    req: &HttpRequest,
    query: &AnalyticsQuery,
) -> Result<(AuthedWorkspace, RangeToken), HttpResponse> {
    let Some(auth) = req.extensions().get::<AuthedWorkspace>().cloned() else {
        return Err(error_response(
            ApiErrorCode::Unauthorized,
            "Missing workspace identity",
        ));
    };

    let range = match query.range.as_deref() {
        None => RangeToken::D7,
        Some(raw) => match RangeToken::parse(raw) {
            Some(token) => token,
            None => {
                return Err(error_response(
                    ApiErrorCode::ValidationError,
                    &format!("Unknown range token '{}' (expected 7d, 30d, 90d, all)", raw),
                ));
            }
        },
    };

    Ok((auth, range))
}

/// GET /api/v1/analytics/overview
pub async fn get_overview(
    req: HttpRequest,
    query: web::Query<AnalyticsQuery>,
    service: web::Data<Arc<AnalyticsService>>,
) -> impl Responder {
    let (auth, range) = match parse_request(&req, &query) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    debug!("Analytics overview: workspace={}, range={}", auth.workspace_id, range.as_str());

    match service
        .overview(&auth.workspace_id, auth.plan, range)
        .await
    {
        Ok(data) => success(data),
        Err(e) => error_from_shortspan(&e),
    }
}

/// GET /api/v1/analytics/links
pub async fn get_links(
    req: HttpRequest,
    query: web::Query<AnalyticsQuery>,
    service: web::Data<Arc<AnalyticsService>>,
) -> impl Responder {
    let (auth, range) = match parse_request(&req, &query) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    match service.links(&auth.workspace_id, auth.plan, range).await {
        Ok(data) => success(data),
        Err(e) => error_from_shortspan(&e),
    }
}

/// GET /api/v1/analytics/referrers
pub async fn get_referrers(
    req: HttpRequest,
    query: web::Query<AnalyticsQuery>,
    service: web::Data<Arc<AnalyticsService>>,
) -> impl Responder {
    let (auth, range) = match parse_request(&req, &query) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    match service
        .referrers(&auth.workspace_id, auth.plan, range)
        .await
    {
        Ok(data) => success(data),
        Err(e) => error_from_shortspan(&e),
    }
}

/// GET /api/v1/analytics/countries
pub async fn get_countries(
    req: HttpRequest,
    query: web::Query<AnalyticsQuery>,
    service: web::Data<Arc<AnalyticsService>>,
) -> impl Responder {
    let (auth, range) = match parse_request(&req, &query) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    match service
        .countries(&auth.workspace_id, auth.plan, range)
        .await
    {
        Ok(data) => success(data),
        Err(e) => error_from_shortspan(&e),
    }
}

/// GET /api/v1/analytics/devices
pub async fn get_devices(
    req: HttpRequest,
    query: web::Query<AnalyticsQuery>,
    service: web::Data<Arc<AnalyticsService>>,
) -> impl Responder {
    let (auth, range) = match parse_request(&req, &query) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    match service.devices(&auth.workspace_id, auth.plan, range).await {
        Ok(data) => success(data),
        Err(e) => error_from_shortspan(&e),
    }
}

/// Analytics 路由配置
pub fn analytics_routes() -> actix_web::Scope {
    web::scope("/analytics")
        .route("/overview", web::get().to(get_overview))
        .route("/overview", web::head().to(get_overview))
        .route("/links", web::get().to(get_links))
        .route("/links", web::head().to(get_links))
        .route("/referrers", web::get().to(get_referrers))
        .route("/referrers", web::head().to(get_referrers))
        .route("/countries", web::get().to(get_countries))
        .route("/countries", web::head().to(get_countries))
        .route("/devices", web::get().to(get_devices))
        .route("/devices", web::head().to(get_devices))
}
