//! 计费上报与对账集成测试
//!
//! 覆盖：周期关账快照、超额向上取整计费、重复上报 no-op、
//! 对账只在周期匹配时比较且绝不改数。

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, TimeZone, Utc};
use sea_orm::EntityTrait;

use migration::entities::billing_usage_period;
use shortspan::billing::invoice::{InvoiceClient, OverageItem};
use shortspan::billing::{Reconciler, UsageReporter};
use shortspan::counter::{CounterState, CounterStore, WorkspaceCounters};
use shortspan::storage::SeaOrmStorage;

use common::{init_test_config, seed_workspace, test_storage};

/// 记录调用次数的发票客户端
struct RecordingInvoiceClient {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl InvoiceClient for RecordingInvoiceClient {
    async fn create_overage_item(&self, item: &OverageItem) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ii_{}_{}", item.workspace_id, item.period_end.timestamp()))
    }
}

fn reporter(
    storage: &Arc<SeaOrmStorage>,
    counters: &Arc<WorkspaceCounters>,
    invoice: &Arc<RecordingInvoiceClient>,
) -> UsageReporter {
    UsageReporter::new(
        Arc::clone(storage),
        Arc::clone(counters),
        Arc::clone(invoice) as Arc<dyn InvoiceClient>,
        2_000_000,
        100_000,
        100,
    )
}

#[actix_rt::test]
async fn test_report_with_overage_creates_invoice_item_once() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;

    let now = Utc.with_ymd_and_hms(2026, 4, 1, 5, 0, 0).unwrap();
    let period_start = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
    let period_end = now - Duration::hours(1);

    seed_workspace(&storage, "wpro", "pro", "key-pro", Some((period_start, period_end))).await;

    // 在线计数器：2,150,000 次点击，周期与租户一致
    storage
        .save(&CounterState {
            workspace_id: "wpro".to_string(),
            free_month_key: "2026-03".to_string(),
            free_tracked_clicks: 0,
            pro_period_start: Some(period_start),
            pro_period_end: Some(period_end),
            pro_tracked_clicks: 2_150_000,
        })
        .await
        .unwrap();

    let counters = Arc::new(WorkspaceCounters::new(
        Arc::clone(&storage) as Arc<dyn CounterStore>
    ));
    let invoice = Arc::new(RecordingInvoiceClient {
        calls: AtomicUsize::new(0),
    });

    let reporter = reporter(&storage, &counters, &invoice);
    let summary = reporter.run_once_at(now).await.unwrap();
    assert_eq!(summary.periods_reported, 1);
    assert_eq!(summary.invoice_items_created, 1);
    assert_eq!(invoice.calls.load(Ordering::SeqCst), 1);

    let rows = billing_usage_period::Entity::find()
        .all(storage.get_db())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_clicks, 2_150_000);
    assert_eq!(rows[0].included_clicks, 2_000_000);
    // ceil(150,000 / 100,000) = 2 个单位，2 × 100 = 200
    assert_eq!(rows[0].overage_units, 2);
    assert_eq!(rows[0].overage_amount, 200);
    assert!(rows[0].invoice_item_id.is_some());

    // 重复运行：no-op（(workspace, start, end) 唯一）
    let summary = reporter.run_once_at(now + Duration::hours(1)).await.unwrap();
    assert_eq!(summary.periods_reported, 0);
    assert_eq!(invoice.calls.load(Ordering::SeqCst), 1);
    let rows = billing_usage_period::Entity::find()
        .all(storage.get_db())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[actix_rt::test]
async fn test_report_without_overage_records_snapshot_only() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;

    let now = Utc.with_ymd_and_hms(2026, 4, 1, 5, 0, 0).unwrap();
    let period_start = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
    let period_end = now - Duration::hours(2);

    seed_workspace(&storage, "wok", "pro", "key-ok", Some((period_start, period_end))).await;
    storage
        .save(&CounterState {
            workspace_id: "wok".to_string(),
            free_month_key: "2026-03".to_string(),
            free_tracked_clicks: 0,
            pro_period_start: Some(period_start),
            pro_period_end: Some(period_end),
            pro_tracked_clicks: 1_000_000,
        })
        .await
        .unwrap();

    let counters = Arc::new(WorkspaceCounters::new(
        Arc::clone(&storage) as Arc<dyn CounterStore>
    ));
    let invoice = Arc::new(RecordingInvoiceClient {
        calls: AtomicUsize::new(0),
    });

    let summary = reporter(&storage, &counters, &invoice)
        .run_once_at(now)
        .await
        .unwrap();
    assert_eq!(summary.periods_reported, 1);
    assert_eq!(summary.invoice_items_created, 0);
    assert_eq!(invoice.calls.load(Ordering::SeqCst), 0);

    let rows = billing_usage_period::Entity::find()
        .all(storage.get_db())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].overage_units, 0);
    assert_eq!(rows[0].overage_amount, 0);
    assert!(rows[0].invoice_item_id.is_none());
}

#[actix_rt::test]
async fn test_pro_workspace_with_open_period_not_reported() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;

    let now = Utc.with_ymd_and_hms(2026, 4, 1, 5, 0, 0).unwrap();
    // 周期尚未结束
    seed_workspace(
        &storage,
        "wopen",
        "pro",
        "key-open",
        Some((now - Duration::days(10), now + Duration::days(20))),
    )
    .await;

    let counters = Arc::new(WorkspaceCounters::new(
        Arc::clone(&storage) as Arc<dyn CounterStore>
    ));
    let invoice = Arc::new(RecordingInvoiceClient {
        calls: AtomicUsize::new(0),
    });

    let summary = reporter(&storage, &counters, &invoice)
        .run_once_at(now)
        .await
        .unwrap();
    assert_eq!(summary.workspaces_examined, 0);
    assert_eq!(summary.periods_reported, 0);
}

#[actix_rt::test]
async fn test_reconciler_flags_drift_beyond_tolerance() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;

    let now = Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).unwrap();
    let period_start = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
    let period_end = now - Duration::hours(2);

    seed_workspace(&storage, "wrec", "pro", "key-rec", Some((period_start, period_end))).await;
    storage
        .save(&CounterState {
            workspace_id: "wrec".to_string(),
            free_month_key: "2026-03".to_string(),
            free_tracked_clicks: 0,
            pro_period_start: Some(period_start),
            pro_period_end: Some(period_end),
            pro_tracked_clicks: 2_150_000,
        })
        .await
        .unwrap();

    let counters = Arc::new(WorkspaceCounters::new(
        Arc::clone(&storage) as Arc<dyn CounterStore>
    ));
    let invoice = Arc::new(RecordingInvoiceClient {
        calls: AtomicUsize::new(0),
    });
    reporter(&storage, &counters, &invoice)
        .run_once_at(now)
        .await
        .unwrap();

    let reconciler = Reconciler::new(Arc::clone(&storage), Arc::clone(&counters), 1000);

    // 漂移 0 → 无 mismatch
    let summary = reconciler.run_once_at(now).await.unwrap();
    assert_eq!(summary.periods_compared, 1);
    assert_eq!(summary.mismatches, 0);

    // 在线计数器继续涨，超出容差
    storage
        .save(&CounterState {
            workspace_id: "wrec".to_string(),
            free_month_key: "2026-03".to_string(),
            free_tracked_clicks: 0,
            pro_period_start: Some(period_start),
            pro_period_end: Some(period_end),
            pro_tracked_clicks: 2_151_500,
        })
        .await
        .unwrap();

    let counters = Arc::new(WorkspaceCounters::new(
        Arc::clone(&storage) as Arc<dyn CounterStore>
    ));
    let reconciler = Reconciler::new(Arc::clone(&storage), counters, 1000);
    let summary = reconciler.run_once_at(now).await.unwrap();
    assert_eq!(summary.mismatches, 1);

    // 对账绝不修正：快照保持原值
    let rows = billing_usage_period::Entity::find()
        .all(storage.get_db())
        .await
        .unwrap();
    assert_eq!(rows[0].total_clicks, 2_150_000);
}

#[actix_rt::test]
async fn test_reconciler_skips_when_counter_period_moved_on() {
    init_test_config(|_| {});
    let (_dir, storage) = test_storage().await;

    let now = Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0).unwrap();
    let period_start = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
    let period_end = now - Duration::hours(2);

    seed_workspace(&storage, "wmoved", "pro", "key-moved", Some((period_start, period_end))).await;
    storage
        .save(&CounterState {
            workspace_id: "wmoved".to_string(),
            free_month_key: "2026-03".to_string(),
            free_tracked_clicks: 0,
            pro_period_start: Some(period_start),
            pro_period_end: Some(period_end),
            pro_tracked_clicks: 500,
        })
        .await
        .unwrap();

    let counters = Arc::new(WorkspaceCounters::new(
        Arc::clone(&storage) as Arc<dyn CounterStore>
    ));
    let invoice = Arc::new(RecordingInvoiceClient {
        calls: AtomicUsize::new(0),
    });
    reporter(&storage, &counters, &invoice)
        .run_once_at(now)
        .await
        .unwrap();

    // webhook 已翻转到新周期
    counters
        .set_pro_period("wmoved", period_end, period_end + Duration::days(31))
        .await
        .unwrap();

    let reconciler = Reconciler::new(Arc::clone(&storage), counters, 1000);
    let summary = reconciler.run_once_at(now).await.unwrap();
    assert_eq!(summary.periods_checked, 1);
    // 周期不匹配 → 不比较
    assert_eq!(summary.periods_compared, 0);
    assert_eq!(summary.mismatches, 0);
}
