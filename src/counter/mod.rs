//! 每租户用量计数
//!
//! 两个互相独立的计数器：
//! - Free：按 UTC 月份（YYYY-MM）计数，读写前先做月份重置检查
//! - Pro：按计费周期 (start, end) 计数，只由 SetProPeriod 重置（webhook 驱动）
//!
//! 所有操作在 per-workspace 串行化保证下执行（见 manager）。

pub mod manager;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use manager::WorkspaceCounters;

/// 计算 UTC 月份键（ISO 时间戳前 7 位）
pub fn month_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m").to_string()
}

/// 每租户计数状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterState {
    pub workspace_id: String,
    /// UTC 月份键 "YYYY-MM"
    pub free_month_key: String,
    pub free_tracked_clicks: i64,
    pub pro_period_start: Option<DateTime<Utc>>,
    pub pro_period_end: Option<DateTime<Utc>>,
    pub pro_tracked_clicks: i64,
}

impl CounterState {
    /// 新租户的初始状态（计数从当前月份起步）
    pub fn fresh(workspace_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            workspace_id: workspace_id.to_string(),
            free_month_key: month_key(now),
            free_tracked_clicks: 0,
            pro_period_start: None,
            pro_period_end: None,
            pro_tracked_clicks: 0,
        }
    }
}

/// Free 用量快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeUsage {
    pub month_key: String,
    pub tracked: i64,
}

/// Pro 用量快照（读取不触发隐式重置）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProUsage {
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub tracked: i64,
}

/// IncrementFreeIfUnderCap 的结果
#[derive(Debug, Clone)]
pub struct FreeIncrementOutcome {
    /// false 表示已达上限，本次点击未计入
    pub incremented: bool,
    pub state: CounterState,
}

/// 计数状态持久化接口
///
/// 持久值是进程重启后的唯一权威；每次变更即保存。
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn load(&self, workspace_id: &str) -> anyhow::Result<Option<CounterState>>;
    async fn save(&self, state: &CounterState) -> anyhow::Result<()>;
}
