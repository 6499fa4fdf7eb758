//! 点击管道与聚合
//!
//! 负责响应后的一切点击处理：
//! - 富化（click_id / ip_hash / 设备分类 / bot 判定）
//! - 有界通道管道（满则丢弃，绝不阻塞响应）
//! - 日志写入（按 click_id 幂等）
//! - 水位线驱动的日汇总
//! - 原始日志保留清理

pub mod aggregator;
pub mod enricher;
pub mod pipeline;
pub mod retention;
pub mod sink;
pub mod writer;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use aggregator::{AggregationReport, Aggregator};
pub use enricher::{ClickRequestContext, enrich};
pub use pipeline::ClickPipeline;
pub use retention::RetentionTask;
pub use sink::ClickLogSink;
pub use writer::ClickLogWriter;

// ============ 公共工具函数 ============

/// UTC 日期键（ISO 时间戳前 10 位）
pub(crate) fn date_key(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// referrer 归一化为 host（聚合时调用，不在富化阶段）
///
/// - 空/缺失 → "(direct)"
/// - 带 scheme 的 URL → host（去掉前导 www.、端口、userinfo，转小写）
/// - 无法解析 → 原样截取前 100 个字符
pub fn referrer_host(referrer: Option<&str>) -> String {
    let Some(raw) = referrer else {
        return "(direct)".to_string();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return "(direct)".to_string();
    }

    if let Some((_, rest)) = raw.split_once("://") {
        let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
        // 去掉 userinfo 与端口
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        if !host.is_empty() {
            let host = host.to_ascii_lowercase();
            return host
                .strip_prefix("www.")
                .map(str::to_string)
                .unwrap_or(host);
        }
    }

    raw.chars().take(100).collect()
}

/// 队列消息：富化后的点击事件
///
/// 消费端必须容忍 optional 字段缺失（serde default）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    pub click_id: String,
    pub ts: DateTime<Utc>,
    pub workspace_id: String,
    pub link_id: String,
    pub domain: String,
    pub slug: String,
    pub destination_url: String,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ip_hash: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_device_class")]
    pub device_class: String,
    #[serde(default)]
    pub bot_suspected: bool,
}

fn default_device_class() -> String {
    "unknown".to_string()
}
