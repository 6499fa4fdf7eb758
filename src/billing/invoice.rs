//! 发票项接口
//!
//! 核心只负责在超额时请求创建一个发票项并记录外部引用；
//! 真正的支付服务对接由部署方注入实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

/// 待创建的超额发票项
#[derive(Debug, Clone)]
pub struct OverageItem {
    pub workspace_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub overage_units: i64,
    /// 最小货币单位
    pub amount: i64,
}

#[async_trait]
pub trait InvoiceClient: Send + Sync {
    /// 创建发票项，返回外部引用 id
    async fn create_overage_item(&self, item: &OverageItem) -> anyhow::Result<String>;
}

/// 只记日志的空实现（自托管默认）
pub struct NullInvoiceClient;

#[async_trait]
impl InvoiceClient for NullInvoiceClient {
    async fn create_overage_item(&self, item: &OverageItem) -> anyhow::Result<String> {
        // 确定性引用：同一周期重复调用得到同一 id
        let reference = format!(
            "null-{}-{}",
            item.workspace_id,
            item.period_end.timestamp()
        );
        info!(
            "Overage invoice item (null client): workspace={}, units={}, amount={} -> {}",
            item.workspace_id, item.overage_units, item.amount, reference
        );
        Ok(reference)
    }
}
