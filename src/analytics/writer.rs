//! 点击日志写入器（队列消费侧）
//!
//! 一个批次一次插入，insert on conflict do nothing（按 click_id）。
//! 批次失败整体重试（相当于重投递），幂等键保证已写入的事件不会重复成行；
//! 重试耗尽后丢弃并记日志。坏消息（缺关键字段）单独丢弃，不拖累批次。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::enricher;
use super::{ClickEvent, ClickLogSink};

pub struct ClickLogWriter {
    sink: Arc<dyn ClickLogSink>,
    /// 批次写入最大尝试次数（首次 + 重试）
    max_attempts: u32,
}

impl ClickLogWriter {
    pub fn new(sink: Arc<dyn ClickLogSink>) -> Self {
        Self {
            sink,
            max_attempts: 3,
        }
    }

    pub fn with_max_attempts(sink: Arc<dyn ClickLogSink>, max_attempts: u32) -> Self {
        Self { sink, max_attempts }
    }

    /// 坏消息判定：缺关键字段的事件无法成行
    fn is_poison(event: &ClickEvent) -> bool {
        event.click_id.is_empty() || event.workspace_id.is_empty() || event.link_id.is_empty()
    }

    /// 补齐派生字段（事件可能来自未做完整富化的生产者）
    fn normalize(event: &mut ClickEvent) {
        if (event.device_class.is_empty() || event.device_class == "unknown")
            && event.user_agent.is_some()
        {
            event.device_class = enricher::device_class(event.user_agent.as_deref()).to_string();
        }
    }

    /// 写入一个批次
    ///
    /// 返回实际新增的行数。批次内坏消息被剔除并记日志。
    pub async fn write_batch(&self, mut batch: Vec<ClickEvent>) -> u64 {
        batch.retain(|event| {
            if Self::is_poison(event) {
                warn!(
                    "Dropping poison click event (click_id='{}', workspace='{}')",
                    event.click_id, event.workspace_id
                );
                false
            } else {
                true
            }
        });

        if batch.is_empty() {
            return 0;
        }

        for event in batch.iter_mut() {
            Self::normalize(event);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.sink.insert_clicks(&batch).await {
                Ok(inserted) => {
                    debug!(
                        "Click log writer: batch of {} events persisted ({} new rows)",
                        batch.len(),
                        inserted
                    );
                    return inserted;
                }
                Err(e) if attempt < self.max_attempts => {
                    // 相当于整批 nack 重投递；已落行的事件由 click_id 冲突跳过
                    warn!(
                        "Click log batch insert failed (attempt {}/{}): {}, redelivering",
                        attempt, self.max_attempts, e
                    );
                    sleep(Duration::from_millis(100 * attempt as u64)).await;
                }
                Err(e) => {
                    error!(
                        "Click log batch dropped after {} attempts ({} events): {}",
                        attempt,
                        batch.len(),
                        e
                    );
                    return 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct MockSink {
        inserted: Mutex<Vec<ClickEvent>>,
        /// 前 N 次调用失败
        failures_remaining: AtomicU32,
    }

    impl MockSink {
        fn new(failures: u32) -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
                failures_remaining: AtomicU32::new(failures),
            }
        }
    }

    #[async_trait::async_trait]
    impl ClickLogSink for MockSink {
        async fn insert_clicks(&self, events: &[ClickEvent]) -> anyhow::Result<u64> {
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(anyhow::anyhow!("simulated insert failure"));
            }
            let mut guard = self.inserted.lock().unwrap();
            let mut new_rows = 0;
            for event in events {
                // 模拟 on conflict do nothing
                if !guard.iter().any(|e| e.click_id == event.click_id) {
                    guard.push(event.clone());
                    new_rows += 1;
                }
            }
            Ok(new_rows)
        }
    }

    fn event(click_id: &str) -> ClickEvent {
        ClickEvent {
            click_id: click_id.to_string(),
            ts: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            workspace_id: "ws1".to_string(),
            link_id: "lnk1".to_string(),
            domain: "example.test".to_string(),
            slug: "x".to_string(),
            destination_url: "https://dest.example/".to_string(),
            referrer: None,
            user_agent: None,
            ip_hash: None,
            country: None,
            region: None,
            city: None,
            device_class: "unknown".to_string(),
            bot_suspected: false,
        }
    }

    #[tokio::test]
    async fn test_write_batch_persists_events() {
        let sink = Arc::new(MockSink::new(0));
        let writer = ClickLogWriter::new(sink.clone());

        let inserted = writer.write_batch(vec![event("a"), event("b")]).await;
        assert_eq!(inserted, 2);
        assert_eq!(sink.inserted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_redelivery_after_failure_is_idempotent() {
        let sink = Arc::new(MockSink::new(2));
        let writer = ClickLogWriter::new(sink.clone());

        // 前两次失败，第三次成功
        let inserted = writer.write_batch(vec![event("a"), event("b")]).await;
        assert_eq!(inserted, 2);

        // 同批重放（模拟重复投递）：幂等，0 新行
        let inserted = writer.write_batch(vec![event("a"), event("b")]).await;
        assert_eq!(inserted, 0);
        assert_eq!(sink.inserted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_dropped_after_max_attempts() {
        let sink = Arc::new(MockSink::new(10));
        let writer = ClickLogWriter::with_max_attempts(sink.clone(), 2);

        let inserted = writer.write_batch(vec![event("a")]).await;
        assert_eq!(inserted, 0);
        assert!(sink.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poison_event_dropped_without_blocking_batch() {
        let sink = Arc::new(MockSink::new(0));
        let writer = ClickLogWriter::new(sink.clone());

        let mut poison = event("");
        poison.click_id = String::new();
        let inserted = writer.write_batch(vec![poison, event("ok")]).await;
        assert_eq!(inserted, 1);
        assert_eq!(sink.inserted.lock().unwrap()[0].click_id, "ok");
    }

    #[tokio::test]
    async fn test_device_class_rederived_when_missing() {
        let sink = Arc::new(MockSink::new(0));
        let writer = ClickLogWriter::new(sink.clone());

        let mut e = event("a");
        e.user_agent = Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string());
        e.device_class = "unknown".to_string();
        writer.write_batch(vec![e]).await;

        assert_eq!(sink.inserted.lock().unwrap()[0].device_class, "desktop");
    }
}
