//! Link entity（重定向规则）
//!
//! (domain_id, slug) 唯一；paused 链接在解析时等同于不存在。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub workspace_id: String,
    pub domain_id: String,
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub destination_url: String,
    /// "active" | "paused"
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
