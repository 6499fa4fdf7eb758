use serde::{Deserialize, Serialize};

/// 应用程序配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub plan_cache: PlanCacheConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 用量与计费配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    /// Free 套餐每 UTC 月可跟踪点击上限
    #[serde(default = "default_free_monthly_cap")]
    pub free_monthly_cap: i64,
    /// Pro 套餐每计费周期包含的点击数
    #[serde(default = "default_pro_included_clicks")]
    pub pro_included_clicks: i64,
    /// 超额计费单位（点击数）
    #[serde(default = "default_pro_overage_unit_clicks")]
    pub pro_overage_unit_clicks: i64,
    /// 每超额单位价格（最小货币单位）
    #[serde(default = "default_pro_overage_unit_price")]
    pub pro_overage_unit_price: i64,
    /// 对账容差（吸收上报执行期间到达的点击）
    #[serde(default = "default_reconciliation_tolerance_clicks")]
    pub reconciliation_tolerance_clicks: i64,
}

/// 点击管道与聚合配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// 聚合任务单批处理的原始点击数
    #[serde(default = "default_aggregation_batch_size")]
    pub aggregation_batch_size: u64,
    /// 原始点击日志保留天数
    #[serde(default = "default_retention_days_free")]
    pub retention_days_free: u64,
    /// 保留任务单批删除的行数
    #[serde(default = "default_retention_batch_size")]
    pub retention_batch_size: u64,
    /// 点击管道通道容量（满则丢弃，不阻塞响应）
    #[serde(default = "default_pipeline_capacity")]
    pub pipeline_capacity: usize,
    /// 管道消费 worker 数
    #[serde(default = "default_pipeline_workers")]
    pub pipeline_workers: usize,
    /// 日志写入单批最大事件数
    #[serde(default = "default_write_batch_size")]
    pub write_batch_size: usize,
    /// 响应后分离任务的最长执行时间（秒）
    #[serde(default = "default_detached_task_deadline_secs")]
    pub detached_task_deadline_secs: u64,
}

/// 套餐查询缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCacheConfig {
    #[serde(default = "default_plan_cache_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_plan_cache_capacity")]
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    /// 可信反向代理（IP 或 CIDR），为空时自动探测私网连接
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// CORS 跨域配置（仅作用于 /api 前缀）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

// Default value functions
fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "shortspan.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_free_monthly_cap() -> i64 {
    5000
}

fn default_pro_included_clicks() -> i64 {
    2_000_000
}

fn default_pro_overage_unit_clicks() -> i64 {
    100_000
}

fn default_pro_overage_unit_price() -> i64 {
    100
}

fn default_reconciliation_tolerance_clicks() -> i64 {
    1000
}

fn default_aggregation_batch_size() -> u64 {
    1000
}

fn default_retention_days_free() -> u64 {
    30
}

fn default_retention_batch_size() -> u64 {
    5000
}

fn default_pipeline_capacity() -> usize {
    8192
}

fn default_pipeline_workers() -> usize {
    2
}

fn default_write_batch_size() -> usize {
    200
}

fn default_detached_task_deadline_secs() -> u64 {
    5
}

fn default_plan_cache_ttl_seconds() -> u64 {
    60
}

fn default_plan_cache_capacity() -> u64 {
    10000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_cors_enabled() -> bool {
    true
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET".to_string(), "HEAD".to_string(), "OPTIONS".to_string()]
}

fn default_cors_headers() -> Vec<String> {
    vec![
        "Content-Type".to_string(),
        "Authorization".to_string(),
        "Accept".to_string(),
    ]
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            free_monthly_cap: default_free_monthly_cap(),
            pro_included_clicks: default_pro_included_clicks(),
            pro_overage_unit_clicks: default_pro_overage_unit_clicks(),
            pro_overage_unit_price: default_pro_overage_unit_price(),
            reconciliation_tolerance_clicks: default_reconciliation_tolerance_clicks(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            aggregation_batch_size: default_aggregation_batch_size(),
            retention_days_free: default_retention_days_free(),
            retention_batch_size: default_retention_batch_size(),
            pipeline_capacity: default_pipeline_capacity(),
            pipeline_workers: default_pipeline_workers(),
            write_batch_size: default_write_batch_size(),
            detached_task_deadline_secs: default_detached_task_deadline_secs(),
        }
    }
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_plan_cache_ttl_seconds(),
            max_capacity: default_plan_cache_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_cors_enabled(),
            allowed_origins: vec![],
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            max_age: default_cors_max_age(),
        }
    }
}
