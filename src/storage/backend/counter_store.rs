//! CounterStore implementation for SeaOrmStorage
//!
//! workspace_counters 每租户一行，每次计数变更即落盘。
//! 调用方（counter::WorkspaceCounters）持有 per-key 锁，这里不做并发控制。

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::EntityTrait;

use crate::counter::{CounterState, CounterStore};

use migration::entities::workspace_counter;

use super::SeaOrmStorage;

fn model_to_state(model: workspace_counter::Model) -> CounterState {
    CounterState {
        workspace_id: model.workspace_id,
        free_month_key: model.free_month_key,
        free_tracked_clicks: model.free_tracked_clicks,
        pro_period_start: model.pro_period_start,
        pro_period_end: model.pro_period_end,
        pro_tracked_clicks: model.pro_tracked_clicks,
    }
}

fn state_to_active_model(state: &CounterState) -> workspace_counter::ActiveModel {
    workspace_counter::ActiveModel {
        workspace_id: Set(state.workspace_id.clone()),
        free_month_key: Set(state.free_month_key.clone()),
        free_tracked_clicks: Set(state.free_tracked_clicks),
        pro_period_start: Set(state.pro_period_start),
        pro_period_end: Set(state.pro_period_end),
        pro_tracked_clicks: Set(state.pro_tracked_clicks),
        updated_at: Set(Utc::now()),
    }
}

#[async_trait]
impl CounterStore for SeaOrmStorage {
    async fn load(&self, workspace_id: &str) -> anyhow::Result<Option<CounterState>> {
        let model = workspace_counter::Entity::find_by_id(workspace_id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("读取计数状态失败: {}", e))?;
        Ok(model.map(model_to_state))
    }

    async fn save(&self, state: &CounterState) -> anyhow::Result<()> {
        let existing = workspace_counter::Entity::find_by_id(&state.workspace_id)
            .one(&self.db)
            .await
            .map_err(|e| anyhow::anyhow!("读取计数状态失败: {}", e))?;

        let active = state_to_active_model(state);
        let db = &self.db;

        if existing.is_some() {
            self.retry
                .run("save_counter_update", || {
                    let active = active.clone();
                    async move {
                        workspace_counter::Entity::update(active)
                            .exec(db)
                            .await
                            .map(|_| ())
                    }
                })
                .await
                .map_err(|e| anyhow::anyhow!("更新计数状态失败（重试后仍失败）: {}", e))?;
        } else {
            self.retry
                .run("save_counter_insert", || {
                    let active = active.clone();
                    async move {
                        workspace_counter::Entity::insert(active)
                            .exec(db)
                            .await
                            .map(|_| ())
                    }
                })
                .await
                .map_err(|e| anyhow::anyhow!("写入计数状态失败（重试后仍失败）: {}", e))?;
        }

        Ok(())
    }
}
