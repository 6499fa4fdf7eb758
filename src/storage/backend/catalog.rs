//! 目录查询（domains / links / workspaces）
//!
//! 重定向路径最多两次点查：hostname → domain，(domain_id, slug) → link。
//! 查询失败向上传播，由调用方决定降级策略。

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::errors::{Result, ShortspanError};
use crate::storage::models::Plan;

use migration::entities::{domain, link, workspace};

use super::SeaOrmStorage;

impl SeaOrmStorage {
    /// 按 hostname 查 verified 域名（hostname 全小写存储，调用方负责规范化）
    pub async fn find_verified_domain(&self, hostname: &str) -> Result<Option<domain::Model>> {
        domain::Entity::find()
            .filter(domain::Column::Hostname.eq(hostname))
            .filter(domain::Column::Status.eq("verified"))
            .one(&self.db)
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询域名失败: {}", e)))
    }

    /// 按 (domain_id, slug) 查链接（不过滤 status，状态判断在 resolver）
    pub async fn find_link(&self, domain_id: &str, slug: &str) -> Result<Option<link::Model>> {
        link::Entity::find()
            .filter(link::Column::DomainId.eq(domain_id))
            .filter(link::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询链接失败: {}", e)))
    }

    pub async fn get_workspace(&self, workspace_id: &str) -> Result<Option<workspace::Model>> {
        workspace::Entity::find_by_id(workspace_id)
            .one(&self.db)
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询租户失败: {}", e)))
    }

    /// Analytics API 认证：api_key → workspace
    pub async fn get_workspace_by_api_key(
        &self,
        api_key: &str,
    ) -> Result<Option<workspace::Model>> {
        workspace::Entity::find()
            .filter(workspace::Column::ApiKey.eq(api_key))
            .one(&self.db)
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询租户失败: {}", e)))
    }

    /// 读取租户套餐（plan 缓存的底层数据源）
    pub async fn get_workspace_plan(&self, workspace_id: &str) -> Result<Option<Plan>> {
        let workspace = self.get_workspace(workspace_id).await?;
        Ok(workspace.map(|w| Plan::parse(&w.plan)))
    }

    /// 计费周期已结束的 Pro 租户（上报任务的候选集）
    pub async fn find_period_ended_pro_workspaces(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<workspace::Model>> {
        workspace::Entity::find()
            .filter(workspace::Column::Plan.eq("pro"))
            .filter(workspace::Column::CurrentPeriodEnd.is_not_null())
            .filter(workspace::Column::CurrentPeriodEnd.lt(now))
            .all(&self.db)
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询 Pro 租户失败: {}", e)))
    }

    /// 批量取链接（analytics /links 端点与目录连接用）
    pub async fn list_links_by_ids(&self, link_ids: &[String]) -> Result<Vec<link::Model>> {
        if link_ids.is_empty() {
            return Ok(Vec::new());
        }
        link::Entity::find()
            .filter(link::Column::Id.is_in(link_ids.iter().map(|s| s.as_str())))
            .all(&self.db)
            .await
            .map_err(|e| ShortspanError::database_operation(format!("批量查询链接失败: {}", e)))
    }

    /// 取租户全部链接 id（analytics /links 端点的范围界定）
    pub async fn list_link_ids_by_workspace(&self, workspace_id: &str) -> Result<Vec<String>> {
        use sea_orm::QuerySelect;

        link::Entity::find()
            .select_only()
            .column(link::Column::Id)
            .filter(link::Column::WorkspaceId.eq(workspace_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询租户链接失败: {}", e)))
    }
}
