//! 定时子系统
//!
//! 四个 UTC 槽位：
//! - 聚合：每 5 分钟（单实例租约，上一轮未结束则跳过本轮）
//! - 保留清理：每日 03:00
//! - 用量上报：每日 04:00
//! - 对账：每日 05:00
//!
//! 任务级错误记日志后等下一个 tick 从持久状态（水位线、快照表）续跑。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, trace};

use crate::analytics::{Aggregator, RetentionTask};
use crate::billing::{InvoiceClient, Reconciler, UsageReporter};
use crate::config::get_config;
use crate::counter::WorkspaceCounters;
use crate::storage::SeaOrmStorage;

/// 聚合槽位间隔
const AGGREGATION_INTERVAL_SECS: u64 = 300;
const RETENTION_HOUR_UTC: u32 = 3;
const REPORT_HOUR_UTC: u32 = 4;
const RECONCILE_HOUR_UTC: u32 = 5;

/// 启动全部后台任务
pub fn spawn_scheduled_jobs(
    storage: Arc<SeaOrmStorage>,
    counters: Arc<WorkspaceCounters>,
    invoice: Arc<dyn InvoiceClient>,
) {
    let config = get_config();

    // ============ 聚合 ============
    {
        let aggregator = Arc::new(Aggregator::new(
            Arc::clone(&storage),
            config.analytics.aggregation_batch_size,
        ));
        let lease = Arc::new(tokio::sync::Mutex::new(()));

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(AGGREGATION_INTERVAL_SECS));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                // 单实例约束：同一时刻只允许一个聚合器在跑
                let Ok(_guard) = lease.try_lock() else {
                    trace!("Aggregation still running, skipping tick");
                    continue;
                };
                if let Err(e) = aggregator.run_once().await {
                    error!("Aggregation run failed: {}", e);
                }
            }
        });
    }

    // ============ 保留清理 ============
    {
        let retention = Arc::new(RetentionTask::new(
            Arc::clone(&storage),
            config.analytics.retention_days_free,
            config.analytics.retention_batch_size,
        ));
        spawn_daily_job("retention", RETENTION_HOUR_UTC, move || {
            let retention = Arc::clone(&retention);
            async move { retention.run_cleanup().await.map(|_| ()) }
        });
    }

    // ============ 用量上报 ============
    {
        let reporter = Arc::new(UsageReporter::new(
            Arc::clone(&storage),
            Arc::clone(&counters),
            invoice,
            config.usage.pro_included_clicks,
            config.usage.pro_overage_unit_clicks,
            config.usage.pro_overage_unit_price,
        ));
        spawn_daily_job("billing_report", REPORT_HOUR_UTC, move || {
            let reporter = Arc::clone(&reporter);
            async move { reporter.run_once().await.map(|_| ()) }
        });
    }

    // ============ 对账 ============
    {
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&storage),
            Arc::clone(&counters),
            config.usage.reconciliation_tolerance_clicks,
        ));
        spawn_daily_job("reconciliation", RECONCILE_HOUR_UTC, move || {
            let reconciler = Arc::clone(&reconciler);
            async move { reconciler.run_once().await.map(|_| ()) }
        });
    }

    info!("Scheduled jobs started (aggregation / retention / report / reconcile)");
}

/// 每日固定 UTC 整点运行的任务循环
fn spawn_daily_job<F, Fut>(name: &'static str, hour_utc: u32, job: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        loop {
            let wait = duration_until_next_utc_hour(hour_utc, Utc::now());
            trace!("Job '{}' sleeping {:?} until next run", name, wait);
            tokio::time::sleep(wait).await;

            if let Err(e) = job().await {
                error!("Scheduled job '{}' failed: {}", name, e);
            }
        }
    });
}

/// 距下一个 UTC HH:00 的时长
pub(crate) fn duration_until_next_utc_hour(hour: u32, now: DateTime<Utc>) -> Duration {
    let today_run = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("valid hour")
        .and_utc();
    let next = if today_run > now {
        today_run
    } else {
        today_run + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}
