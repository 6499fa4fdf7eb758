//! 数据库写入重试策略
//!
//! 点击批量写入、计数落盘和聚合事务共享同一个存储；在 SQLite 上
//! 它们还争抢 WAL 的单写者锁，busy_timeout 耗尽后锁冲突以
//! Query/Exec 错误的形式冒出来，和连接池瞬断一样属于瞬时错误。
//! 退避用全抖动（延迟在 [0, 上限] 内均匀取值）：三类写入方由同一个
//! 调度节拍唤醒，固定步长的退避会让它们反复同相互踩。

use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 瞬时错误判定
///
/// - 连接获取失败 / 连接断开：池恢复后可重试
/// - SQLite 写锁冲突（"database is locked" / "database table is locked"）：
///   另一个写入方正持有 WAL 写锁，退避后重试
pub fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Query(e) | DbErr::Exec(e) => {
            let msg = e.to_string();
            msg.contains("database is locked") || msg.contains("database table is locked")
        }
        _ => false,
    }
}

/// 重试策略（次数与退避参数来自 [database] 配置）
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }

    /// 执行操作，瞬时错误退避后重试；非瞬时错误立即向上返回
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, DbErr>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("操作 '{}' 在第 {} 次重试后成功", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(e) if is_transient(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_ms(attempt);
                    warn!(
                        "操作 '{}' 瞬时失败 (尝试 {}/{}): {}，{} 毫秒后重试",
                        operation_name,
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// 全抖动退避：上限随尝试次数指数增长，实际延迟在 [0, 上限] 均匀取
    fn backoff_ms(&self, attempt: u32) -> u64 {
        use rand::Rng;
        let ceiling = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay_ms);
        rand::rng().random_range(0..=ceiling)
    }
}
