//! 配置加载与全局访问
//!
//! 加载顺序：config.toml（若存在）→ 环境变量覆盖。
//! 环境变量名与配置项一一对应（FREE_MONTHLY_CAP 等）。

use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use tracing::warn;

use super::AppConfig;

static CONFIG: OnceLock<ArcSwap<AppConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<AppConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Initialize the global configuration
///
/// Loads configuration from "config.toml" in the current directory,
/// then applies environment variable overrides. If the file doesn't
/// exist, uses in-memory defaults.
pub fn init_config() {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(AppConfig::load()));
}

/// 以显式配置初始化（测试用）
pub fn init_config_from(config: AppConfig) {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(config));
}

impl AppConfig {
    /// 从 config.toml + 环境变量加载配置
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("config.toml") {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config.toml: {}, using defaults", e);
                    AppConfig::default()
                }
            },
            Err(_) => AppConfig::default(),
        };

        config.apply_env_overrides();
        config
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        override_from_env("SERVER_HOST", &mut self.server.host);
        override_from_env("SERVER_PORT", &mut self.server.port);
        override_from_env("DATABASE_URL", &mut self.database.database_url);
        override_from_env("DATABASE_POOL_SIZE", &mut self.database.pool_size);

        override_from_env("FREE_MONTHLY_CAP", &mut self.usage.free_monthly_cap);
        override_from_env("PRO_INCLUDED_CLICKS", &mut self.usage.pro_included_clicks);
        override_from_env(
            "PRO_OVERAGE_UNIT_CLICKS",
            &mut self.usage.pro_overage_unit_clicks,
        );
        override_from_env(
            "PRO_OVERAGE_UNIT_PRICE",
            &mut self.usage.pro_overage_unit_price,
        );
        override_from_env(
            "RECONCILIATION_TOLERANCE_CLICKS",
            &mut self.usage.reconciliation_tolerance_clicks,
        );

        override_from_env(
            "AGGREGATION_BATCH_SIZE",
            &mut self.analytics.aggregation_batch_size,
        );
        override_from_env(
            "RETENTION_DAYS_FREE",
            &mut self.analytics.retention_days_free,
        );
        override_from_env(
            "RETENTION_BATCH_SIZE",
            &mut self.analytics.retention_batch_size,
        );
        override_from_env(
            "DETACHED_TASK_DEADLINE",
            &mut self.analytics.detached_task_deadline_secs,
        );

        override_from_env("PLAN_CACHE_TTL_SECONDS", &mut self.plan_cache.ttl_seconds);

        override_from_env("LOG_LEVEL", &mut self.logging.level);
        override_from_env("LOG_FORMAT", &mut self.logging.format);
    }
}

/// 单个环境变量覆盖，解析失败时保留原值并告警
fn override_from_env<T: FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring unparsable env override {}={}", name, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.usage.free_monthly_cap, 5000);
        assert_eq!(config.usage.pro_included_clicks, 2_000_000);
        assert_eq!(config.usage.pro_overage_unit_clicks, 100_000);
        assert_eq!(config.usage.pro_overage_unit_price, 100);
        assert_eq!(config.usage.reconciliation_tolerance_clicks, 1000);
        assert_eq!(config.analytics.aggregation_batch_size, 1000);
        assert_eq!(config.analytics.retention_days_free, 30);
        assert_eq!(config.analytics.retention_batch_size, 5000);
        assert_eq!(config.analytics.detached_task_deadline_secs, 5);
        assert_eq!(config.plan_cache.ttl_seconds, 60);
    }

    #[test]
    fn test_env_override_applies() {
        // 环境变量覆盖数字配置
        unsafe { std::env::set_var("FREE_MONTHLY_CAP", "3") };
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.usage.free_monthly_cap, 3);
        unsafe { std::env::remove_var("FREE_MONTHLY_CAP") };
    }

    #[test]
    fn test_env_override_ignores_garbage() {
        unsafe { std::env::set_var("PRO_INCLUDED_CLICKS", "not-a-number") };
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.usage.pro_included_clicks, 2_000_000);
        unsafe { std::env::remove_var("PRO_INCLUDED_CLICKS") };
    }
}
