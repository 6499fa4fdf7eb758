//! 集成测试公共设施
//!
//! 每个测试用独立的文件版 SQLite（TempDir 保活），配置按测试二进制初始化一次。

#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::EntityTrait;
use tempfile::TempDir;

use migration::entities::{click_log, domain, link, workspace};
use shortspan::config::{self, AppConfig};
use shortspan::storage::SeaOrmStorage;

static INIT: Once = Once::new();

/// 初始化测试配置（每个测试二进制一次）
pub fn init_test_config<F: FnOnce(&mut AppConfig)>(customize: F) {
    let mut cfg = AppConfig::default();
    customize(&mut cfg);
    INIT.call_once(|| {
        config::init_config_from(cfg);
    });
}

/// 新建独立的文件版 SQLite 存储
pub async fn test_storage() -> (TempDir, Arc<SeaOrmStorage>) {
    let dir = TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("shortspan_test.db");
    let url = format!("sqlite://{}", db_path.display());
    let storage = SeaOrmStorage::new(&url, "sqlite")
        .await
        .expect("init test storage");
    (dir, Arc::new(storage))
}

// ============ 种子数据 ============

pub async fn seed_workspace(
    storage: &SeaOrmStorage,
    id: &str,
    plan: &str,
    api_key: &str,
    period: Option<(DateTime<Utc>, DateTime<Utc>)>,
) {
    let model = workspace::ActiveModel {
        id: Set(id.to_string()),
        name: Set(format!("{} workspace", id)),
        plan: Set(plan.to_string()),
        api_key: Set(api_key.to_string()),
        billing_status: Set(Some("active".to_string())),
        current_period_start: Set(period.map(|(s, _)| s)),
        current_period_end: Set(period.map(|(_, e)| e)),
        created_at: Set(Utc::now()),
    };
    workspace::Entity::insert(model)
        .exec(storage.get_db())
        .await
        .expect("seed workspace");
}

pub async fn seed_domain(storage: &SeaOrmStorage, id: &str, workspace_id: &str, hostname: &str, status: &str) {
    let model = domain::ActiveModel {
        id: Set(id.to_string()),
        workspace_id: Set(Some(workspace_id.to_string())),
        hostname: Set(hostname.to_string()),
        status: Set(status.to_string()),
        created_at: Set(Utc::now()),
    };
    domain::Entity::insert(model)
        .exec(storage.get_db())
        .await
        .expect("seed domain");
}

pub async fn seed_link(
    storage: &SeaOrmStorage,
    id: &str,
    workspace_id: &str,
    domain_id: &str,
    slug: &str,
    destination_url: &str,
    status: &str,
) {
    let model = link::ActiveModel {
        id: Set(id.to_string()),
        workspace_id: Set(workspace_id.to_string()),
        domain_id: Set(domain_id.to_string()),
        slug: Set(slug.to_string()),
        destination_url: Set(destination_url.to_string()),
        status: Set(status.to_string()),
        created_at: Set(Utc::now()),
    };
    link::Entity::insert(model)
        .exec(storage.get_db())
        .await
        .expect("seed link");
}

pub async fn seed_click(
    storage: &SeaOrmStorage,
    click_id: &str,
    workspace_id: &str,
    link_id: &str,
    clicked_at: DateTime<Utc>,
    referrer: Option<&str>,
    country: Option<&str>,
    device_class: &str,
) {
    let model = click_log::ActiveModel {
        click_id: Set(click_id.to_string()),
        clicked_at: Set(clicked_at),
        workspace_id: Set(workspace_id.to_string()),
        link_id: Set(link_id.to_string()),
        domain: Set("example.test".to_string()),
        slug: Set("x".to_string()),
        destination_url: Set("https://dest.example/path".to_string()),
        referrer: Set(referrer.map(String::from)),
        user_agent: Set(None),
        ip_hash: Set(None),
        country: Set(country.map(String::from)),
        region: Set(None),
        city: Set(None),
        device_class: Set(device_class.to_string()),
        bot_suspected: Set(false),
    };
    click_log::Entity::insert(model)
        .exec(storage.get_db())
        .await
        .expect("seed click");
}

/// 轮询等待条件成立（异步副作用用）
pub async fn wait_until<F, Fut>(mut probe: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    loop {
        if probe().await {
            return true;
        }
        if std::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}
