//! Billing usage period（已关账周期的用量快照）
//!
//! (workspace_id, period_start, period_end) 唯一，第二次上报为 no-op。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "billing_usage_periods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub workspace_id: String,
    pub period_start: DateTimeUtc,
    pub period_end: DateTimeUtc,
    pub total_clicks: i64,
    pub included_clicks: i64,
    pub overage_units: i64,
    /// 单位为最小货币单位
    pub overage_amount: i64,
    /// 外部发票项引用（无超额时为 NULL）
    pub invoice_item_id: Option<String>,
    pub reported_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
