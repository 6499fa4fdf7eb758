//! ClickLogSink implementation for SeaOrmStorage
//!
//! 原始点击日志的批量写入：insert on conflict (click_id) do nothing。
//! 重复投递的消息在这里折叠成单行（幂等锚点是确定性 click_id）。

use async_trait::async_trait;
use sea_orm::ActiveValue::Set;
use sea_orm::EntityTrait;
use sea_orm::sea_query::OnConflict;
use tracing::debug;

use super::SeaOrmStorage;
use crate::analytics::{ClickEvent, ClickLogSink};

use migration::entities::click_log;

fn event_to_active_model(event: &ClickEvent) -> click_log::ActiveModel {
    click_log::ActiveModel {
        click_id: Set(event.click_id.clone()),
        clicked_at: Set(event.ts),
        workspace_id: Set(event.workspace_id.clone()),
        link_id: Set(event.link_id.clone()),
        domain: Set(event.domain.clone()),
        slug: Set(event.slug.clone()),
        destination_url: Set(event.destination_url.clone()),
        referrer: Set(event.referrer.clone()),
        user_agent: Set(event.user_agent.clone()),
        ip_hash: Set(event.ip_hash.clone()),
        country: Set(event.country.clone()),
        region: Set(event.region.clone()),
        city: Set(event.city.clone()),
        device_class: Set(event.device_class.clone()),
        bot_suspected: Set(event.bot_suspected),
    }
}

#[async_trait]
impl ClickLogSink for SeaOrmStorage {
    async fn insert_clicks(&self, events: &[ClickEvent]) -> anyhow::Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let models: Vec<click_log::ActiveModel> = events.iter().map(event_to_active_model).collect();
        let batch_size = models.len();

        let db = &self.db;
        let inserted = self
            .retry
            .run("insert_clicks", || {
                let models = models.clone();
                async move {
                    click_log::Entity::insert_many(models)
                        .on_conflict(
                            OnConflict::column(click_log::Column::ClickId)
                                .do_nothing()
                                .to_owned(),
                        )
                        .exec_without_returning(db)
                        .await
                }
            })
            .await
            .map_err(|e| anyhow::anyhow!("批量写入点击日志失败（重试后仍失败）: {}", e))?;

        debug!(
            "Click log batch persisted: {} events, {} new rows ({})",
            batch_size,
            inserted,
            self.backend_name.to_uppercase()
        );
        Ok(inserted)
    }
}
