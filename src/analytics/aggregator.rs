//! 日汇总聚合器
//!
//! 定时任务：以单一水位线驱动，把原始点击日志灌入五张日汇总表。
//! 一个批次的全部 upsert 与水位线推进在同一事务内提交，
//! 崩溃重放时整批重算，加法合并 + 原子批保证幂等。
//!
//! 单实例约束：同一时刻只允许一个聚合器在跑（调度器持租约）。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use tracing::{debug, info};

use crate::storage::SeaOrmStorage;

use migration::entities::{
    aggregation_watermark, click_log, rollup_daily_country, rollup_daily_device,
    rollup_daily_link, rollup_daily_referrer, rollup_daily_workspace,
};

use super::{date_key, referrer_host};

/// 聚合运行报告
#[derive(Debug, Default)]
pub struct AggregationReport {
    pub batches: u32,
    pub clicks_processed: u64,
}

/// 一个批次按五个维度分组后的计数
#[derive(Debug)]
pub(crate) struct GroupedBatch {
    pub by_workspace: HashMap<(String, NaiveDate), i64>,
    pub by_link: HashMap<(String, NaiveDate), i64>,
    pub by_referrer: HashMap<(String, NaiveDate, String), i64>,
    pub by_country: HashMap<(String, NaiveDate, String), i64>,
    pub by_device: HashMap<(String, NaiveDate, String), i64>,
    pub max_ts: DateTime<Utc>,
}

/// 批次内存分组（纯函数，求和可交换）
pub(crate) fn group_batch(clicks: &[click_log::Model]) -> GroupedBatch {
    let mut grouped = GroupedBatch {
        by_workspace: HashMap::new(),
        by_link: HashMap::new(),
        by_referrer: HashMap::new(),
        by_country: HashMap::new(),
        by_device: HashMap::new(),
        max_ts: DateTime::UNIX_EPOCH,
    };

    for click in clicks {
        let day = date_key(click.clicked_at);
        if click.clicked_at > grouped.max_ts {
            grouped.max_ts = click.clicked_at;
        }

        *grouped
            .by_workspace
            .entry((click.workspace_id.clone(), day))
            .or_insert(0) += 1;
        *grouped
            .by_link
            .entry((click.link_id.clone(), day))
            .or_insert(0) += 1;

        let referrer = referrer_host(click.referrer.as_deref());
        *grouped
            .by_referrer
            .entry((click.workspace_id.clone(), day, referrer))
            .or_insert(0) += 1;

        let country = click
            .country
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        *grouped
            .by_country
            .entry((click.workspace_id.clone(), day, country))
            .or_insert(0) += 1;

        *grouped
            .by_device
            .entry((click.workspace_id.clone(), day, click.device_class.clone()))
            .or_insert(0) += 1;
    }

    grouped
}

pub struct Aggregator {
    storage: Arc<SeaOrmStorage>,
    batch_size: u64,
}

impl Aggregator {
    pub fn new(storage: Arc<SeaOrmStorage>, batch_size: u64) -> Self {
        Self {
            storage,
            batch_size: batch_size.max(1),
        }
    }

    /// 一次调度运行：循环吃批次直到不足一批
    pub async fn run_once(&self) -> anyhow::Result<AggregationReport> {
        let mut report = AggregationReport::default();

        loop {
            let processed = self.process_batch().await?;
            if processed == 0 {
                break;
            }
            report.batches += 1;
            report.clicks_processed += processed;

            if processed < self.batch_size {
                break;
            }
        }

        if report.clicks_processed > 0 {
            info!(
                "Aggregation completed: {} clicks in {} batches",
                report.clicks_processed, report.batches
            );
        }
        Ok(report)
    }

    /// 处理一个批次，返回处理的原始点击行数
    async fn process_batch(&self) -> anyhow::Result<u64> {
        let db = self.storage.get_db();

        let watermark = Self::load_watermark(db).await?;
        let clicks = click_log::Entity::find()
            .filter(click_log::Column::ClickedAt.gt(watermark))
            .order_by_asc(click_log::Column::ClickedAt)
            .limit(self.batch_size)
            .all(db)
            .await?;

        if clicks.is_empty() {
            return Ok(0);
        }

        let grouped = group_batch(&clicks);

        // 五张表的 upsert + 水位线推进作为一个原子批提交
        let txn = db.begin().await?;

        for ((workspace_id, day), count) in &grouped.by_workspace {
            Self::add_workspace_day(&txn, workspace_id, *day, *count).await?;
        }
        for ((link_id, day), count) in &grouped.by_link {
            Self::add_link_day(&txn, link_id, *day, *count).await?;
        }
        for ((workspace_id, day, referrer), count) in &grouped.by_referrer {
            Self::add_referrer_day(&txn, workspace_id, *day, referrer, *count).await?;
        }
        for ((workspace_id, day, country), count) in &grouped.by_country {
            Self::add_country_day(&txn, workspace_id, *day, country, *count).await?;
        }
        for ((workspace_id, day, device), count) in &grouped.by_device {
            Self::add_device_day(&txn, workspace_id, *day, device, *count).await?;
        }

        Self::store_watermark(&txn, grouped.max_ts).await?;
        txn.commit().await?;

        debug!(
            "Aggregation batch: {} clicks, watermark -> {}",
            clicks.len(),
            grouped.max_ts
        );
        Ok(clicks.len() as u64)
    }

    // ============ 水位线 ============

    pub(crate) async fn load_watermark<C: ConnectionTrait>(
        conn: &C,
    ) -> anyhow::Result<DateTime<Utc>> {
        let row = aggregation_watermark::Entity::find_by_id(1).one(conn).await?;
        Ok(row
            .map(|r| r.last_processed_at)
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    async fn store_watermark<C: ConnectionTrait>(
        conn: &C,
        ts: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let existing = aggregation_watermark::Entity::find_by_id(1).one(conn).await?;
        if existing.is_some() {
            let active = aggregation_watermark::ActiveModel {
                id: Set(1),
                last_processed_at: Set(ts),
            };
            aggregation_watermark::Entity::update(active).exec(conn).await?;
        } else {
            let active = aggregation_watermark::ActiveModel {
                id: Set(1),
                last_processed_at: Set(ts),
            };
            aggregation_watermark::Entity::insert(active).exec(conn).await?;
        }
        Ok(())
    }

    // ============ 加法 upsert ============

    async fn add_workspace_day<C: ConnectionTrait>(
        conn: &C,
        workspace_id: &str,
        day: NaiveDate,
        count: i64,
    ) -> anyhow::Result<()> {
        let existing = rollup_daily_workspace::Entity::find()
            .filter(rollup_daily_workspace::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_workspace::Column::Day.eq(day))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                let active = rollup_daily_workspace::ActiveModel {
                    id: Set(row.id),
                    total_clicks: Set(row.total_clicks + count),
                    ..Default::default()
                };
                rollup_daily_workspace::Entity::update(active).exec(conn).await?;
            }
            None => {
                let active = rollup_daily_workspace::ActiveModel {
                    workspace_id: Set(workspace_id.to_string()),
                    day: Set(day),
                    total_clicks: Set(count),
                    ..Default::default()
                };
                rollup_daily_workspace::Entity::insert(active).exec(conn).await?;
            }
        }
        Ok(())
    }

    async fn add_link_day<C: ConnectionTrait>(
        conn: &C,
        link_id: &str,
        day: NaiveDate,
        count: i64,
    ) -> anyhow::Result<()> {
        let existing = rollup_daily_link::Entity::find()
            .filter(rollup_daily_link::Column::LinkId.eq(link_id))
            .filter(rollup_daily_link::Column::Day.eq(day))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                let active = rollup_daily_link::ActiveModel {
                    id: Set(row.id),
                    total_clicks: Set(row.total_clicks + count),
                    ..Default::default()
                };
                rollup_daily_link::Entity::update(active).exec(conn).await?;
            }
            None => {
                let active = rollup_daily_link::ActiveModel {
                    link_id: Set(link_id.to_string()),
                    day: Set(day),
                    total_clicks: Set(count),
                    ..Default::default()
                };
                rollup_daily_link::Entity::insert(active).exec(conn).await?;
            }
        }
        Ok(())
    }

    async fn add_referrer_day<C: ConnectionTrait>(
        conn: &C,
        workspace_id: &str,
        day: NaiveDate,
        referrer: &str,
        count: i64,
    ) -> anyhow::Result<()> {
        let existing = rollup_daily_referrer::Entity::find()
            .filter(rollup_daily_referrer::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_referrer::Column::Day.eq(day))
            .filter(rollup_daily_referrer::Column::Referrer.eq(referrer))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                let active = rollup_daily_referrer::ActiveModel {
                    id: Set(row.id),
                    total_clicks: Set(row.total_clicks + count),
                    ..Default::default()
                };
                rollup_daily_referrer::Entity::update(active).exec(conn).await?;
            }
            None => {
                let active = rollup_daily_referrer::ActiveModel {
                    workspace_id: Set(workspace_id.to_string()),
                    day: Set(day),
                    referrer: Set(referrer.to_string()),
                    total_clicks: Set(count),
                    ..Default::default()
                };
                rollup_daily_referrer::Entity::insert(active).exec(conn).await?;
            }
        }
        Ok(())
    }

    async fn add_country_day<C: ConnectionTrait>(
        conn: &C,
        workspace_id: &str,
        day: NaiveDate,
        country: &str,
        count: i64,
    ) -> anyhow::Result<()> {
        let existing = rollup_daily_country::Entity::find()
            .filter(rollup_daily_country::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_country::Column::Day.eq(day))
            .filter(rollup_daily_country::Column::Country.eq(country))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                let active = rollup_daily_country::ActiveModel {
                    id: Set(row.id),
                    total_clicks: Set(row.total_clicks + count),
                    ..Default::default()
                };
                rollup_daily_country::Entity::update(active).exec(conn).await?;
            }
            None => {
                let active = rollup_daily_country::ActiveModel {
                    workspace_id: Set(workspace_id.to_string()),
                    day: Set(day),
                    country: Set(country.to_string()),
                    total_clicks: Set(count),
                    ..Default::default()
                };
                rollup_daily_country::Entity::insert(active).exec(conn).await?;
            }
        }
        Ok(())
    }

    async fn add_device_day<C: ConnectionTrait>(
        conn: &C,
        workspace_id: &str,
        day: NaiveDate,
        device_class: &str,
        count: i64,
    ) -> anyhow::Result<()> {
        let existing = rollup_daily_device::Entity::find()
            .filter(rollup_daily_device::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_device::Column::Day.eq(day))
            .filter(rollup_daily_device::Column::DeviceClass.eq(device_class))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                let active = rollup_daily_device::ActiveModel {
                    id: Set(row.id),
                    total_clicks: Set(row.total_clicks + count),
                    ..Default::default()
                };
                rollup_daily_device::Entity::update(active).exec(conn).await?;
            }
            None => {
                let active = rollup_daily_device::ActiveModel {
                    workspace_id: Set(workspace_id.to_string()),
                    day: Set(day),
                    device_class: Set(device_class.to_string()),
                    total_clicks: Set(count),
                    ..Default::default()
                };
                rollup_daily_device::Entity::insert(active).exec(conn).await?;
            }
        }
        Ok(())
    }
}
