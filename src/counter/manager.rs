//! 计数管理器
//!
//! per-workspace 串行化：workspace_id 哈希到固定数量的分片锁，
//! 同一租户的所有计数操作全局至多一个在途。
//! 同一分片的不同租户互相排队，强于契约要求，可接受。
//!
//! 缓存策略：DashMap 缓存最近状态，落盘成功后才更新缓存；
//! 落盘失败向上返回错误，由调用方按未跟踪处理。

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CounterState, CounterStore, FreeIncrementOutcome, FreeUsage, ProUsage, month_key};

/// 分片锁数量
const SHARD_COUNT: usize = 64;

pub struct WorkspaceCounters {
    store: Arc<dyn CounterStore>,
    shards: Vec<Mutex<()>>,
    /// 最近一次成功落盘的状态
    states: DashMap<String, CounterState>,
}

impl WorkspaceCounters {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(())).collect(),
            states: DashMap::new(),
        }
    }

    fn shard_for(&self, workspace_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        workspace_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// 读取状态：缓存 → 持久层 → 新建
    async fn load_state(
        &self,
        workspace_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CounterState> {
        if let Some(cached) = self.states.get(workspace_id) {
            return Ok(cached.clone());
        }
        match self.store.load(workspace_id).await? {
            Some(state) => Ok(state),
            None => Ok(CounterState::fresh(workspace_id, now)),
        }
    }

    /// 落盘并更新缓存（只有落盘成功才可见）
    async fn persist(&self, state: CounterState) -> anyhow::Result<CounterState> {
        self.store.save(&state).await?;
        self.states
            .insert(state.workspace_id.clone(), state.clone());
        Ok(state)
    }

    /// 月份重置检查：观察到的 UTC 月份与存储键不同则清零
    fn apply_month_reset(state: &mut CounterState, now: DateTime<Utc>) -> bool {
        let current = month_key(now);
        if state.free_month_key != current {
            debug!(
                "Free counter month reset for {}: {} -> {}",
                state.workspace_id, state.free_month_key, current
            );
            state.free_month_key = current;
            state.free_tracked_clicks = 0;
            true
        } else {
            false
        }
    }

    // ============ 操作 ============

    /// Free 计数：未达上限则 +1 并落盘
    pub async fn increment_free_if_under_cap(
        &self,
        workspace_id: &str,
        cap: i64,
    ) -> anyhow::Result<FreeIncrementOutcome> {
        self.increment_free_if_under_cap_at(workspace_id, cap, Utc::now())
            .await
    }

    pub async fn increment_free_if_under_cap_at(
        &self,
        workspace_id: &str,
        cap: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<FreeIncrementOutcome> {
        let _guard = self.shard_for(workspace_id).lock().await;

        let mut state = self.load_state(workspace_id, now).await?;
        let reset = Self::apply_month_reset(&mut state, now);

        if state.free_tracked_clicks >= cap {
            // 已达上限：本次点击不计入。月份重置本身仍需落盘。
            let state = if reset {
                self.persist(state).await?
            } else {
                state
            };
            return Ok(FreeIncrementOutcome {
                incremented: false,
                state,
            });
        }

        state.free_tracked_clicks += 1;
        let state = self.persist(state).await?;
        Ok(FreeIncrementOutcome {
            incremented: true,
            state,
        })
    }

    /// Pro 计数：无条件 +1 并落盘（套餐判断在调用方）
    pub async fn increment_pro(&self, workspace_id: &str) -> anyhow::Result<CounterState> {
        self.increment_pro_at(workspace_id, Utc::now()).await
    }

    pub async fn increment_pro_at(
        &self,
        workspace_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CounterState> {
        let _guard = self.shard_for(workspace_id).lock().await;

        let mut state = self.load_state(workspace_id, now).await?;
        state.pro_tracked_clicks += 1;
        self.persist(state).await
    }

    /// 设置 Pro 计费周期：(start, end) 与存储不同则覆盖并清零
    ///
    /// 由计费协作方在观察到订阅周期变更时调用；相同周期重复调用是 no-op。
    pub async fn set_pro_period(
        &self,
        workspace_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<CounterState> {
        let _guard = self.shard_for(workspace_id).lock().await;

        let now = Utc::now();
        let mut state = self.load_state(workspace_id, now).await?;

        if state.pro_period_start == Some(start) && state.pro_period_end == Some(end) {
            return Ok(state);
        }

        state.pro_period_start = Some(start);
        state.pro_period_end = Some(end);
        state.pro_tracked_clicks = 0;
        self.persist(state).await
    }

    /// Free 用量快照（先做月份重置检查）
    pub async fn get_free_usage(&self, workspace_id: &str) -> anyhow::Result<FreeUsage> {
        self.get_free_usage_at(workspace_id, Utc::now()).await
    }

    pub async fn get_free_usage_at(
        &self,
        workspace_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<FreeUsage> {
        let _guard = self.shard_for(workspace_id).lock().await;

        let mut state = self.load_state(workspace_id, now).await?;
        let state = if Self::apply_month_reset(&mut state, now) {
            self.persist(state).await?
        } else {
            state
        };

        Ok(FreeUsage {
            month_key: state.free_month_key,
            tracked: state.free_tracked_clicks,
        })
    }

    /// Pro 用量快照（不做隐式重置，周期重置只来自 SetProPeriod）
    pub async fn get_pro_usage(&self, workspace_id: &str) -> anyhow::Result<ProUsage> {
        let _guard = self.shard_for(workspace_id).lock().await;

        let state = self.load_state(workspace_id, Utc::now()).await?;
        Ok(ProUsage {
            period_start: state.pro_period_start,
            period_end: state.pro_period_end,
            tracked: state.pro_tracked_clicks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// 内存版 CounterStore（持久层行为的最小模拟）
    struct MemoryStore {
        rows: DashMap<String, CounterState>,
        fail_saves: std::sync::atomic::AtomicBool,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                rows: DashMap::new(),
                fail_saves: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl CounterStore for MemoryStore {
        async fn load(&self, workspace_id: &str) -> anyhow::Result<Option<CounterState>> {
            Ok(self.rows.get(workspace_id).map(|r| r.clone()))
        }

        async fn save(&self, state: &CounterState) -> anyhow::Result<()> {
            if self.fail_saves.load(std::sync::atomic::Ordering::Relaxed) {
                return Err(anyhow::anyhow!("simulated storage failure"));
            }
            self.rows
                .insert(state.workspace_id.clone(), state.clone());
            Ok(())
        }
    }

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_free_increment_under_cap() {
        let counters = WorkspaceCounters::new(Arc::new(MemoryStore::new()));
        let now = ts(2026, 3, 1);

        for expected in 1..=3 {
            let outcome = counters
                .increment_free_if_under_cap_at("ws1", 5, now)
                .await
                .unwrap();
            assert!(outcome.incremented);
            assert_eq!(outcome.state.free_tracked_clicks, expected);
        }
    }

    #[tokio::test]
    async fn test_free_cap_reached_stops_counting() {
        let counters = WorkspaceCounters::new(Arc::new(MemoryStore::new()));
        let now = ts(2026, 3, 1);

        for _ in 0..3 {
            counters
                .increment_free_if_under_cap_at("ws1", 3, now)
                .await
                .unwrap();
        }

        // 第四次触顶
        let outcome = counters
            .increment_free_if_under_cap_at("ws1", 3, now)
            .await
            .unwrap();
        assert!(!outcome.incremented);
        assert_eq!(outcome.state.free_tracked_clicks, 3);
    }

    #[tokio::test]
    async fn test_month_transition_resets_to_one() {
        let counters = WorkspaceCounters::new(Arc::new(MemoryStore::new()));

        for _ in 0..5 {
            counters
                .increment_free_if_under_cap_at("ws1", 5, ts(2026, 3, 15))
                .await
                .unwrap();
        }
        // 3 月已满
        let outcome = counters
            .increment_free_if_under_cap_at("ws1", 5, ts(2026, 3, 31))
            .await
            .unwrap();
        assert!(!outcome.incremented);

        // 跨月后第一次点击计为 1
        let outcome = counters
            .increment_free_if_under_cap_at("ws1", 5, ts(2026, 4, 1))
            .await
            .unwrap();
        assert!(outcome.incremented);
        assert_eq!(outcome.state.free_month_key, "2026-04");
        assert_eq!(outcome.state.free_tracked_clicks, 1);
    }

    #[tokio::test]
    async fn test_get_free_usage_applies_month_reset() {
        let store = Arc::new(MemoryStore::new());
        let counters = WorkspaceCounters::new(store.clone());

        counters
            .increment_free_if_under_cap_at("ws1", 100, ts(2026, 3, 1))
            .await
            .unwrap();

        let usage = counters
            .get_free_usage_at("ws1", ts(2026, 4, 2))
            .await
            .unwrap();
        assert_eq!(usage.month_key, "2026-04");
        assert_eq!(usage.tracked, 0);

        // 重置必须已落盘
        let persisted = store.load("ws1").await.unwrap().unwrap();
        assert_eq!(persisted.free_month_key, "2026-04");
        assert_eq!(persisted.free_tracked_clicks, 0);
    }

    #[tokio::test]
    async fn test_same_period_set_is_noop() {
        let counters = WorkspaceCounters::new(Arc::new(MemoryStore::new()));
        let start = ts(2026, 3, 1);
        let end = ts(2026, 4, 1);

        counters.set_pro_period("ws1", start, end).await.unwrap();
        for _ in 0..4 {
            counters.increment_pro("ws1").await.unwrap();
        }

        // 相同 (start, end)：计数保持
        let state = counters.set_pro_period("ws1", start, end).await.unwrap();
        assert_eq!(state.pro_tracked_clicks, 4);

        // 不同周期：清零
        let state = counters
            .set_pro_period("ws1", start, ts(2026, 5, 1))
            .await
            .unwrap();
        assert_eq!(state.pro_tracked_clicks, 0);
    }

    #[tokio::test]
    async fn test_get_pro_usage_does_not_reset() {
        let counters = WorkspaceCounters::new(Arc::new(MemoryStore::new()));
        let start = ts(2026, 1, 1);
        let end = ts(2026, 2, 1);

        counters.set_pro_period("ws1", start, end).await.unwrap();
        counters.increment_pro("ws1").await.unwrap();

        // 周期早已结束，但读取不做隐式重置
        let usage = counters.get_pro_usage("ws1").await.unwrap();
        assert_eq!(usage.period_start, Some(start));
        assert_eq!(usage.period_end, Some(end));
        assert_eq!(usage.tracked, 1);
    }

    #[tokio::test]
    async fn test_free_and_pro_counters_are_independent() {
        let counters = WorkspaceCounters::new(Arc::new(MemoryStore::new()));
        let now = ts(2026, 3, 1);

        counters
            .increment_free_if_under_cap_at("ws1", 100, now)
            .await
            .unwrap();
        counters.increment_pro_at("ws1", now).await.unwrap();
        counters.increment_pro_at("ws1", now).await.unwrap();

        let free = counters.get_free_usage_at("ws1", now).await.unwrap();
        let pro = counters.get_pro_usage("ws1").await.unwrap();
        assert_eq!(free.tracked, 1);
        assert_eq!(pro.tracked, 2);
    }

    #[tokio::test]
    async fn test_save_failure_surfaces_and_keeps_cache_clean() {
        let store = Arc::new(MemoryStore::new());
        let counters = WorkspaceCounters::new(store.clone());
        let now = ts(2026, 3, 1);

        counters
            .increment_free_if_under_cap_at("ws1", 10, now)
            .await
            .unwrap();

        store
            .fail_saves
            .store(true, std::sync::atomic::Ordering::Relaxed);
        assert!(
            counters
                .increment_free_if_under_cap_at("ws1", 10, now)
                .await
                .is_err()
        );
        store
            .fail_saves
            .store(false, std::sync::atomic::Ordering::Relaxed);

        // 失败的增量不可见
        let usage = counters.get_free_usage_at("ws1", now).await.unwrap();
        assert_eq!(usage.tracked, 1);
    }

    /// 并发触顶：cap=N 时恰好一个胜出（per-key 串行化）
    #[tokio::test]
    async fn test_concurrent_increment_at_cap_boundary() {
        let counters = Arc::new(WorkspaceCounters::new(Arc::new(MemoryStore::new())));
        let now = ts(2026, 3, 1);
        let cap = 50;

        let mut handles = vec![];
        for _ in 0..8 {
            let counters = Arc::clone(&counters);
            handles.push(tokio::spawn(async move {
                let mut wins = 0;
                for _ in 0..10 {
                    let outcome = counters
                        .increment_free_if_under_cap_at("ws1", cap, now)
                        .await
                        .unwrap();
                    if outcome.incremented {
                        wins += 1;
                    }
                }
                wins
            }));
        }

        let mut total_wins = 0;
        for handle in handles {
            total_wins += handle.await.unwrap();
        }

        // 80 次尝试，恰好 cap 次成功
        assert_eq!(total_wins, cap);
        let usage = counters.get_free_usage_at("ws1", now).await.unwrap();
        assert_eq!(usage.tracked, cap);
    }
}
