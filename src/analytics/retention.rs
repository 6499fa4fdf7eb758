//! 原始日志保留任务
//!
//! 每日清理超出保留期的原始点击日志，分批删除避免长事务。
//! 不触碰任何汇总表：聚合结果的生命周期长于 PII。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::{debug, info, warn};

use crate::storage::SeaOrmStorage;

use migration::entities::click_log;

pub struct RetentionTask {
    storage: Arc<SeaOrmStorage>,
    /// 原始点击日志保留天数
    retention_days: u64,
    /// 每次删除批量大小
    batch_size: u64,
}

impl RetentionTask {
    pub fn new(storage: Arc<SeaOrmStorage>, retention_days: u64, batch_size: u64) -> Self {
        Self {
            storage,
            retention_days,
            batch_size: batch_size.max(1),
        }
    }

    /// 运行一次清理，返回删除的行数
    pub async fn run_cleanup(&self) -> anyhow::Result<u64> {
        self.run_cleanup_at(Utc::now()).await
    }

    pub async fn run_cleanup_at(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let db = self.storage.get_db();
        let cutoff = now - Duration::days(self.retention_days as i64);

        let mut total_deleted = 0u64;
        let mut iterations = 0;
        let max_iterations = 1000; // 防止无限循环

        loop {
            if iterations >= max_iterations {
                warn!(
                    "Raw log cleanup reached max iterations {} (deleted {} rows)",
                    max_iterations, total_deleted
                );
                break;
            }

            // 查找要删除的 click_id 列表
            let ids_to_delete: Vec<String> = click_log::Entity::find()
                .select_only()
                .column(click_log::Column::ClickId)
                .filter(click_log::Column::ClickedAt.lt(cutoff))
                .order_by_asc(click_log::Column::ClickedAt)
                .limit(self.batch_size)
                .into_tuple()
                .all(db)
                .await?;

            if ids_to_delete.is_empty() {
                break;
            }

            // 批量删除
            let deleted = click_log::Entity::delete_many()
                .filter(click_log::Column::ClickId.is_in(ids_to_delete.clone()))
                .exec(db)
                .await?
                .rows_affected;

            total_deleted += deleted;
            iterations += 1;

            debug!(
                "Raw log cleanup batch {}: deleted {} rows (total {})",
                iterations, deleted, total_deleted
            );

            // 如果删除的数量小于批量大小，说明已经没有更多数据
            if deleted < self.batch_size {
                break;
            }

            // 短暂暂停，避免对数据库造成过大压力
            tokio::time::sleep(StdDuration::from_millis(100)).await;
        }

        if total_deleted > 0 {
            info!(
                "Raw log retention completed: {} rows deleted (cutoff: {})",
                total_deleted, cutoff
            );
        }
        Ok(total_deleted)
    }
}
