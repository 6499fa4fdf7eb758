//! Workspace entity（租户）
//!
//! plan 是重定向路径上唯一读取的套餐权威字段；
//! billing 字段由外部 webhook 协作方写入。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "workspaces")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    /// 套餐: "free" | "pro"
    pub plan: String,
    /// Analytics API 的认证凭据
    #[sea_orm(unique)]
    pub api_key: String,
    /// 订阅状态 (active / past_due / ...)，仅透传，不参与核心判断
    pub billing_status: Option<String>,
    pub current_period_start: Option<DateTimeUtc>,
    pub current_period_end: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
