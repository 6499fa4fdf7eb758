//! 套餐查询缓存
//!
//! moka TTL 缓存（≤60s）。允许读到陈旧套餐：上限由计数器强制执行，
//! 陈旧的 "free" 只是让升级后的免计数生效晚最多一个 TTL。
//! 未命中且目录查不到时不缓存负结果。

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::errors::Result;
use crate::storage::{Plan, SeaOrmStorage};

pub struct PlanCache {
    inner: Cache<String, Plan>,
    storage: Arc<SeaOrmStorage>,
}

impl PlanCache {
    pub fn new(storage: Arc<SeaOrmStorage>, ttl_seconds: u64, max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_seconds.max(1)))
            .build();

        debug!(
            "PlanCache initialized: ttl={}s, capacity={}",
            ttl_seconds, max_capacity
        );
        Self { inner, storage }
    }

    /// 读取租户套餐（缓存 → 目录）
    pub async fn get_plan(&self, workspace_id: &str) -> Result<Option<Plan>> {
        if let Some(plan) = self.inner.get(workspace_id).await {
            return Ok(Some(plan));
        }

        match self.storage.get_workspace_plan(workspace_id).await? {
            Some(plan) => {
                self.inner.insert(workspace_id.to_string(), plan).await;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    /// 失效单个租户（测试与运维钩子）
    pub async fn invalidate(&self, workspace_id: &str) {
        self.inner.invalidate(workspace_id).await;
    }
}
