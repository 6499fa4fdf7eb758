use super::ClickEvent;

/// 点击日志 Sink
///
/// 返回实际新写入的行数（重复 click_id 被冲突跳过，不计入）。
#[async_trait::async_trait]
pub trait ClickLogSink: Send + Sync {
    async fn insert_clicks(&self, events: &[ClickEvent]) -> anyhow::Result<u64>;
}

pub struct StdoutSink;

#[async_trait::async_trait]
impl ClickLogSink for StdoutSink {
    async fn insert_clicks(&self, events: &[ClickEvent]) -> anyhow::Result<u64> {
        println!("Click batch: {} events", events.len());
        for event in events {
            println!("  - {} {} {}", event.click_id, event.workspace_id, event.slug);
        }
        Ok(events.len() as u64)
    }
}
