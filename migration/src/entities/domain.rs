//! Domain entity（短链域名）
//!
//! hostname 全小写存储；只有 status = "verified" 的域名参与解析。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "domains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// NULL 表示平台域名
    pub workspace_id: Option<String>,
    #[sea_orm(unique)]
    pub hostname: String,
    /// "pending" | "verified" | "failed"
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
