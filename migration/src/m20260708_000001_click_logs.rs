//! 原始点击日志表迁移
//!
//! click_logs 是 append-only 事件表：
//! - click_id 为确定性哈希主键（写入幂等锚点）
//! - 聚合任务按 clicked_at 升序扫描
//! - 保留任务按 clicked_at 分批删除

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClickLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClickLogs::ClickId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClickLogs::ClickedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClickLogs::WorkspaceId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClickLogs::LinkId).string_len(64).not_null())
                    .col(ColumnDef::new(ClickLogs::Domain).string_len(255).not_null())
                    .col(ColumnDef::new(ClickLogs::Slug).string_len(255).not_null())
                    .col(ColumnDef::new(ClickLogs::DestinationUrl).text().not_null())
                    .col(ColumnDef::new(ClickLogs::Referrer).text().null())
                    .col(ColumnDef::new(ClickLogs::UserAgent).text().null())
                    .col(ColumnDef::new(ClickLogs::IpHash).string_len(64).null())
                    .col(ColumnDef::new(ClickLogs::Country).string_len(2).null())
                    .col(ColumnDef::new(ClickLogs::Region).string_len(100).null())
                    .col(ColumnDef::new(ClickLogs::City).string_len(100).null())
                    .col(
                        ColumnDef::new(ClickLogs::DeviceClass)
                            .string_len(16)
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(ClickLogs::BotSuspected)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // 时间范围扫描索引（聚合 / 保留任务）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_logs_clicked_at")
                    .table(ClickLogs::Table)
                    .col(ClickLogs::ClickedAt)
                    .to_owned(),
            )
            .await?;

        // 单租户时间序列查询索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_click_logs_workspace_time")
                    .table(ClickLogs::Table)
                    .col(ClickLogs::WorkspaceId)
                    .col(ClickLogs::ClickedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_click_logs_workspace_time")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_click_logs_clicked_at").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClickLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClickLogs {
    #[sea_orm(iden = "click_logs")]
    Table,
    ClickId,
    ClickedAt,
    WorkspaceId,
    LinkId,
    Domain,
    Slug,
    DestinationUrl,
    Referrer,
    UserAgent,
    IpHash,
    Country,
    Region,
    City,
    DeviceClass,
    BotSuspected,
}
