//! Analytics API 集成测试
//!
//! 覆盖：api_key 认证、信封格式、范围令牌与套餐回看上限、
//! 五个端点对汇总表的只读查询。

mod common;

use std::sync::Arc;

use actix_web::{App, test, web};
use chrono::{Duration, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::EntityTrait;

use migration::entities::{
    rollup_daily_country, rollup_daily_device, rollup_daily_link, rollup_daily_referrer,
    rollup_daily_workspace,
};
use shortspan::api::middleware::WorkspaceAuth;
use shortspan::api::services::analytics_routes;
use shortspan::services::AnalyticsService;
use shortspan::storage::SeaOrmStorage;

use common::{init_test_config, seed_domain, seed_link, seed_workspace, test_storage};

macro_rules! analytics_app {
    ($storage:expr, $service:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(Arc::clone(&$storage)))
                .app_data(web::Data::new(Arc::clone(&$service)))
                .service(
                    web::scope("/api")
                        .service(web::scope("/v1").service(analytics_routes().wrap(WorkspaceAuth))),
                ),
        )
        .await
    };
}

async fn seed_workspace_day(storage: &SeaOrmStorage, ws: &str, days_ago: i64, clicks: i64) {
    let day = Utc::now().date_naive() - Duration::days(days_ago);
    rollup_daily_workspace::Entity::insert(rollup_daily_workspace::ActiveModel {
        workspace_id: Set(ws.to_string()),
        day: Set(day),
        total_clicks: Set(clicks),
        ..Default::default()
    })
    .exec(storage.get_db())
    .await
    .unwrap();
}

async fn seed_link_day(storage: &SeaOrmStorage, link_id: &str, days_ago: i64, clicks: i64) {
    let day = Utc::now().date_naive() - Duration::days(days_ago);
    rollup_daily_link::Entity::insert(rollup_daily_link::ActiveModel {
        link_id: Set(link_id.to_string()),
        day: Set(day),
        total_clicks: Set(clicks),
        ..Default::default()
    })
    .exec(storage.get_db())
    .await
    .unwrap();
}

#[actix_rt::test]
async fn test_missing_or_invalid_api_key_is_unauthorized() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;
    seed_workspace(&storage, "w1", "free", "key-w1", None).await;

    let service = Arc::new(AnalyticsService::new(Arc::clone(&storage)));
    let app = analytics_app!(storage, service);

    // 无凭据
    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/overview")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // 错误凭据
    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/overview")
        .insert_header(("Authorization", "Bearer wrong-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_rt::test]
async fn test_overview_sums_range_and_returns_trend() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;
    seed_workspace(&storage, "w1", "free", "key-w1", None).await;

    // 7d 窗口内 2 天 + 窗口外 1 天
    seed_workspace_day(&storage, "w1", 1, 10).await;
    seed_workspace_day(&storage, "w1", 3, 5).await;
    seed_workspace_day(&storage, "w1", 10, 99).await;
    // 其他租户不可见
    seed_workspace_day(&storage, "w2", 1, 1000).await;

    let service = Arc::new(AnalyticsService::new(Arc::clone(&storage)));
    let app = analytics_app!(storage, service);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/overview?range=7d")
        .insert_header(("Authorization", "Bearer key-w1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["total_clicks"], 15);
    // 趋势固定 30 个点，缺数据补零
    let trend = body["data"]["daily_trend"].as_array().unwrap();
    assert_eq!(trend.len(), 30);
    let trend_total: i64 = trend
        .iter()
        .map(|p| p["total_clicks"].as_i64().unwrap())
        .sum();
    assert_eq!(trend_total, 114);
}

#[actix_rt::test]
async fn test_links_joined_with_catalog_ordered_by_clicks() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;
    seed_workspace(&storage, "w1", "free", "key-w1", None).await;
    seed_domain(&storage, "d1", "w1", "example.test", "verified").await;
    seed_link(&storage, "l1", "w1", "d1", "alpha", "https://a.example/", "active").await;
    seed_link(&storage, "l2", "w1", "d1", "beta", "https://b.example/", "active").await;

    seed_link_day(&storage, "l1", 1, 3).await;
    seed_link_day(&storage, "l1", 2, 4).await;
    seed_link_day(&storage, "l2", 1, 20).await;

    let service = Arc::new(AnalyticsService::new(Arc::clone(&storage)));
    let app = analytics_app!(storage, service);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/links?range=7d")
        .insert_header(("Authorization", "Bearer key-w1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    // 点击降序
    assert_eq!(list[0]["id"], "l2");
    assert_eq!(list[0]["slug"], "beta");
    assert_eq!(list[0]["destination_url"], "https://b.example/");
    assert_eq!(list[0]["total_clicks"], 20);
    assert_eq!(list[1]["id"], "l1");
    assert_eq!(list[1]["total_clicks"], 7);
}

#[actix_rt::test]
async fn test_referrers_countries_devices() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;
    seed_workspace(&storage, "w1", "free", "key-w1", None).await;

    let day = Utc::now().date_naive() - Duration::days(1);
    let db = storage.get_db();

    for (referrer, clicks) in [("a.test", 3), ("(direct)", 1)] {
        rollup_daily_referrer::Entity::insert(rollup_daily_referrer::ActiveModel {
            workspace_id: Set("w1".to_string()),
            day: Set(day),
            referrer: Set(referrer.to_string()),
            total_clicks: Set(clicks),
            ..Default::default()
        })
        .exec(db)
        .await
        .unwrap();
    }
    for (country, clicks) in [("US", 2), ("unknown", 2)] {
        rollup_daily_country::Entity::insert(rollup_daily_country::ActiveModel {
            workspace_id: Set("w1".to_string()),
            day: Set(day),
            country: Set(country.to_string()),
            total_clicks: Set(clicks),
            ..Default::default()
        })
        .exec(db)
        .await
        .unwrap();
    }
    for (device, clicks) in [("desktop", 3), ("mobile", 1)] {
        rollup_daily_device::Entity::insert(rollup_daily_device::ActiveModel {
            workspace_id: Set("w1".to_string()),
            day: Set(day),
            device_class: Set(device.to_string()),
            total_clicks: Set(clicks),
            ..Default::default()
        })
        .exec(db)
        .await
        .unwrap();
    }

    let service = Arc::new(AnalyticsService::new(Arc::clone(&storage)));
    let app = analytics_app!(storage, service);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/referrers")
        .insert_header(("Authorization", "Bearer key-w1"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list[0]["referrer"], "a.test");
    assert_eq!(list[0]["total_clicks"], 3);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/countries")
        .insert_header(("Authorization", "Bearer key-w1"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/devices")
        .insert_header(("Authorization", "Bearer key-w1"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list[0]["device_type"], "desktop");
    assert_eq!(list[1]["device_type"], "mobile");
}

#[actix_rt::test]
async fn test_free_plan_range_ceiling_is_enforced() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;
    seed_workspace(&storage, "wfree", "free", "key-free", None).await;
    seed_workspace(&storage, "wpro", "pro", "key-pro", None).await;

    let service = Arc::new(AnalyticsService::new(Arc::clone(&storage)));
    let app = analytics_app!(storage, service);

    // Free + 90d → 校验失败
    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/overview?range=90d")
        .insert_header(("Authorization", "Bearer key-free"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Free + 30d → 允许
    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/overview?range=30d")
        .insert_header(("Authorization", "Bearer key-free"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // Pro + 90d → 允许
    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/overview?range=90d")
        .insert_header(("Authorization", "Bearer key-pro"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn test_unknown_range_token_is_validation_error() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;
    seed_workspace(&storage, "w1", "free", "key-w1", None).await;

    let service = Arc::new(AnalyticsService::new(Arc::clone(&storage)));
    let app = analytics_app!(storage, service);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/overview?range=1y")
        .insert_header(("Authorization", "Bearer key-w1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
