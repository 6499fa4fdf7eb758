//! 对账任务
//!
//! 对最近 7 天上报过的用量快照，重读在线 Pro 计数器：
//! 当且仅当计数器仍停留在快照周期时比较两者，
//! 漂移超过容差记 BILLING_MISMATCH 日志。只读，绝不修正。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::{debug, error, info, warn};

use crate::counter::WorkspaceCounters;
use crate::storage::SeaOrmStorage;

use migration::entities::billing_usage_period;

/// 对账回看窗口
const LOOKBACK_DAYS: i64 = 7;

/// 一次对账运行的汇总
#[derive(Debug, Default)]
pub struct ReconciliationSummary {
    pub periods_checked: usize,
    pub periods_compared: usize,
    pub mismatches: usize,
}

pub struct Reconciler {
    storage: Arc<SeaOrmStorage>,
    counters: Arc<WorkspaceCounters>,
    /// 容差（吸收上报执行期间到达的点击）
    tolerance_clicks: i64,
}

impl Reconciler {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        counters: Arc<WorkspaceCounters>,
        tolerance_clicks: i64,
    ) -> Self {
        Self {
            storage,
            counters,
            tolerance_clicks,
        }
    }

    pub async fn run_once(&self) -> anyhow::Result<ReconciliationSummary> {
        self.run_once_at(Utc::now()).await
    }

    pub async fn run_once_at(&self, now: DateTime<Utc>) -> anyhow::Result<ReconciliationSummary> {
        let mut summary = ReconciliationSummary::default();
        let since = now - Duration::days(LOOKBACK_DAYS);

        let recent = billing_usage_period::Entity::find()
            .filter(billing_usage_period::Column::ReportedAt.gt(since))
            .all(self.storage.get_db())
            .await?;
        summary.periods_checked = recent.len();

        for row in recent {
            let usage = match self.counters.get_pro_usage(&row.workspace_id).await {
                Ok(usage) => usage,
                Err(e) => {
                    error!(
                        "Reconciliation: failed to read counter for {}: {}",
                        row.workspace_id, e
                    );
                    continue;
                }
            };

            // 计数器已翻到新周期 → 在线值与快照不可比
            if usage.period_start != Some(row.period_start)
                || usage.period_end != Some(row.period_end)
            {
                debug!(
                    "Reconciliation: counter moved on for {} ({}..{}), skipping",
                    row.workspace_id, row.period_start, row.period_end
                );
                continue;
            }

            summary.periods_compared += 1;
            let drift = (usage.tracked - row.total_clicks).abs();
            if drift > self.tolerance_clicks {
                summary.mismatches += 1;
                warn!(
                    "BILLING_MISMATCH workspace={} period={}..{} reported={} live={} drift={}",
                    row.workspace_id,
                    row.period_start,
                    row.period_end,
                    row.total_clicks,
                    usage.tracked,
                    drift
                );
            }
        }

        info!(
            "Reconciliation run: {} checked, {} compared, {} mismatches",
            summary.periods_checked, summary.periods_compared, summary.mismatches
        );
        Ok(summary)
    }
}
