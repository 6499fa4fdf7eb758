//! 目录表迁移
//!
//! 创建重定向路径依赖的三张读多写少的表：
//! - workspaces（租户 + 套餐 + 计费周期字段）
//! - domains（短链域名，hostname 唯一）
//! - links（重定向规则，(domain_id, slug) 唯一）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Workspaces::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Workspaces::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Workspaces::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Workspaces::Plan)
                            .string_len(16)
                            .not_null()
                            .default("free"),
                    )
                    .col(
                        ColumnDef::new(Workspaces::ApiKey)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Workspaces::BillingStatus)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Workspaces::CurrentPeriodStart)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Workspaces::CurrentPeriodEnd)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Workspaces::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Domains::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Domains::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Domains::WorkspaceId).string_len(64).null())
                    .col(
                        ColumnDef::new(Domains::Hostname)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Domains::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Domains::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Links::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Links::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Links::WorkspaceId).string_len(64).not_null())
                    .col(ColumnDef::new(Links::DomainId).string_len(64).not_null())
                    .col(ColumnDef::new(Links::Slug).string_len(255).not_null())
                    .col(ColumnDef::new(Links::DestinationUrl).text().not_null())
                    .col(
                        ColumnDef::new(Links::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Links::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 解析路径的两次点查各走一个索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_domain_slug")
                    .table(Links::Table)
                    .col(Links::DomainId)
                    .col(Links::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 列表查询用索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_links_workspace_created")
                    .table(Links::Table)
                    .col(Links::WorkspaceId)
                    .col(Links::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_links_workspace_created").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_links_domain_slug").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Links::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Domains::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Workspaces {
    #[sea_orm(iden = "workspaces")]
    Table,
    Id,
    Name,
    Plan,
    ApiKey,
    BillingStatus,
    CurrentPeriodStart,
    CurrentPeriodEnd,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Domains {
    #[sea_orm(iden = "domains")]
    Table,
    Id,
    WorkspaceId,
    Hostname,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Links {
    #[sea_orm(iden = "links")]
    Table,
    Id,
    WorkspaceId,
    DomainId,
    Slug,
    DestinationUrl,
    Status,
    CreatedAt,
}
