//! Raw click log entity (append-only)
//!
//! click_id 是确定性哈希主键，重复投递在插入时折叠。
//! ip_hash 只存 SHA-256 十六进制，绝不落原始 IP。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "click_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub click_id: String,
    pub clicked_at: DateTimeUtc,
    pub workspace_id: String,
    pub link_id: String,
    pub domain: String,
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub destination_url: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub referrer: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub ip_hash: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    /// "mobile" | "tablet" | "desktop" | "unknown"
    pub device_class: String,
    pub bot_suspected: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
