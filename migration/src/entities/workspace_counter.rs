//! Workspace counter state（每租户串行化计数状态的持久行）
//!
//! Free 月计数与 Pro 周期计数相互独立，互不迁移。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "workspace_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub workspace_id: String,
    /// UTC 月份键 "YYYY-MM"
    pub free_month_key: String,
    pub free_tracked_clicks: i64,
    pub pro_period_start: Option<DateTimeUtc>,
    pub pro_period_end: Option<DateTimeUtc>,
    pub pro_tracked_clicks: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
