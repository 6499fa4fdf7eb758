//! 用量上报任务
//!
//! 每日运行：找出计费周期已结束且尚无用量快照的 Pro 租户，
//! 读在线计数器，算超额，必要时创建发票项，无论是否超额都落一行快照。
//! (workspace, period_start, period_end) 唯一，重复运行是 no-op。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::{error, info, warn};

use crate::counter::WorkspaceCounters;
use crate::storage::SeaOrmStorage;

use migration::entities::billing_usage_period;

use super::invoice::{InvoiceClient, OverageItem};
use super::{overage_amount, overage_units};

/// 一次上报运行的汇总
#[derive(Debug, Default)]
pub struct ReportSummary {
    pub workspaces_examined: usize,
    pub periods_reported: usize,
    pub invoice_items_created: usize,
}

pub struct UsageReporter {
    storage: Arc<SeaOrmStorage>,
    counters: Arc<WorkspaceCounters>,
    invoice: Arc<dyn InvoiceClient>,
    included_clicks: i64,
    overage_unit_clicks: i64,
    overage_unit_price: i64,
}

impl UsageReporter {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        counters: Arc<WorkspaceCounters>,
        invoice: Arc<dyn InvoiceClient>,
        included_clicks: i64,
        overage_unit_clicks: i64,
        overage_unit_price: i64,
    ) -> Self {
        Self {
            storage,
            counters,
            invoice,
            included_clicks,
            overage_unit_clicks,
            overage_unit_price,
        }
    }

    pub async fn run_once(&self) -> anyhow::Result<ReportSummary> {
        self.run_once_at(Utc::now()).await
    }

    pub async fn run_once_at(&self, now: DateTime<Utc>) -> anyhow::Result<ReportSummary> {
        let mut summary = ReportSummary::default();

        let candidates = self.storage.find_period_ended_pro_workspaces(now).await?;
        summary.workspaces_examined = candidates.len();

        for workspace in candidates {
            let (Some(period_start), Some(period_end)) =
                (workspace.current_period_start, workspace.current_period_end)
            else {
                continue;
            };

            // 逐租户处理，单个失败不拖垮整轮
            match self
                .report_period(&workspace.id, period_start, period_end, now)
                .await
            {
                Ok(Some(invoiced)) => {
                    summary.periods_reported += 1;
                    if invoiced {
                        summary.invoice_items_created += 1;
                    }
                }
                Ok(None) => {} // 已上报过
                Err(e) => {
                    error!(
                        "Usage report failed for workspace {} period {}..{}: {}",
                        workspace.id, period_start, period_end, e
                    );
                }
            }
        }

        info!(
            "Usage report run: {} examined, {} reported, {} invoice items",
            summary.workspaces_examined, summary.periods_reported, summary.invoice_items_created
        );
        Ok(summary)
    }

    /// 上报单个租户的单个周期
    ///
    /// 返回 Some(是否创建了发票项)；周期已有快照时返回 None。
    async fn report_period(
        &self,
        workspace_id: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<bool>> {
        let db = self.storage.get_db();

        let existing = billing_usage_period::Entity::find()
            .filter(billing_usage_period::Column::WorkspaceId.eq(workspace_id))
            .filter(billing_usage_period::Column::PeriodStart.eq(period_start))
            .filter(billing_usage_period::Column::PeriodEnd.eq(period_end))
            .one(db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let usage = self.counters.get_pro_usage(workspace_id).await?;
        if usage.period_start != Some(period_start) || usage.period_end != Some(period_end) {
            // 计数器已经进入别的周期（例如 webhook 先一步翻转）——
            // 此时在线值已不代表该周期，仍按读到的值快照并告警。
            warn!(
                "Counter period mismatch for {} while reporting {}..{} (counter holds {:?}..{:?})",
                workspace_id, period_start, period_end, usage.period_start, usage.period_end
            );
        }
        let total_clicks = usage.tracked;

        let units = overage_units(total_clicks, self.included_clicks, self.overage_unit_clicks);
        let amount = overage_amount(units, self.overage_unit_price);

        let invoice_item_id = if units > 0 {
            let item = OverageItem {
                workspace_id: workspace_id.to_string(),
                period_start,
                period_end,
                overage_units: units,
                amount,
            };
            Some(self.invoice.create_overage_item(&item).await?)
        } else {
            None
        };

        let row = billing_usage_period::ActiveModel {
            workspace_id: Set(workspace_id.to_string()),
            period_start: Set(period_start),
            period_end: Set(period_end),
            total_clicks: Set(total_clicks),
            included_clicks: Set(self.included_clicks),
            overage_units: Set(units),
            overage_amount: Set(amount),
            invoice_item_id: Set(invoice_item_id.clone()),
            reported_at: Set(now),
            ..Default::default()
        };
        billing_usage_period::Entity::insert(row).exec(db).await?;

        info!(
            "Billing period reported: workspace={}, {}..{}, clicks={}, units={}, amount={}",
            workspace_id, period_start, period_end, total_clicks, units, amount
        );
        Ok(Some(invoice_item_id.is_some()))
    }
}
