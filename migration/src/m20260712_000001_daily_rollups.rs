//! 日汇总表迁移
//!
//! 五张 upsert 汇总表 + 聚合水位线单行表。
//! 汇总只增不减；原始日志被保留任务删除后汇总仍然保留。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RollupDailyWorkspace::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RollupDailyWorkspace::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyWorkspace::WorkspaceId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RollupDailyWorkspace::Day).date().not_null())
                    .col(
                        ColumnDef::new(RollupDailyWorkspace::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rollup_workspace_day")
                    .table(RollupDailyWorkspace::Table)
                    .col(RollupDailyWorkspace::WorkspaceId)
                    .col(RollupDailyWorkspace::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RollupDailyLink::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RollupDailyLink::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyLink::LinkId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RollupDailyLink::Day).date().not_null())
                    .col(
                        ColumnDef::new(RollupDailyLink::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rollup_link_day")
                    .table(RollupDailyLink::Table)
                    .col(RollupDailyLink::LinkId)
                    .col(RollupDailyLink::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RollupDailyReferrer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RollupDailyReferrer::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyReferrer::WorkspaceId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RollupDailyReferrer::Day).date().not_null())
                    .col(
                        ColumnDef::new(RollupDailyReferrer::Referrer)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyReferrer::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rollup_referrer_day")
                    .table(RollupDailyReferrer::Table)
                    .col(RollupDailyReferrer::WorkspaceId)
                    .col(RollupDailyReferrer::Day)
                    .col(RollupDailyReferrer::Referrer)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RollupDailyCountry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RollupDailyCountry::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyCountry::WorkspaceId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RollupDailyCountry::Day).date().not_null())
                    .col(
                        ColumnDef::new(RollupDailyCountry::Country)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyCountry::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rollup_country_day")
                    .table(RollupDailyCountry::Table)
                    .col(RollupDailyCountry::WorkspaceId)
                    .col(RollupDailyCountry::Day)
                    .col(RollupDailyCountry::Country)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RollupDailyDevice::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RollupDailyDevice::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyDevice::WorkspaceId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RollupDailyDevice::Day).date().not_null())
                    .col(
                        ColumnDef::new(RollupDailyDevice::DeviceClass)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RollupDailyDevice::TotalClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_rollup_device_day")
                    .table(RollupDailyDevice::Table)
                    .col(RollupDailyDevice::WorkspaceId)
                    .col(RollupDailyDevice::Day)
                    .col(RollupDailyDevice::DeviceClass)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 水位线单行表（id 恒为 1）
        manager
            .create_table(
                Table::create()
                    .table(AggregationWatermark::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AggregationWatermark::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AggregationWatermark::LastProcessedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AggregationWatermark::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RollupDailyDevice::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RollupDailyCountry::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RollupDailyReferrer::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RollupDailyLink::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RollupDailyWorkspace::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RollupDailyWorkspace {
    #[sea_orm(iden = "rollup_daily_workspace")]
    Table,
    Id,
    WorkspaceId,
    Day,
    TotalClicks,
}

#[derive(DeriveIden)]
enum RollupDailyLink {
    #[sea_orm(iden = "rollup_daily_link")]
    Table,
    Id,
    LinkId,
    Day,
    TotalClicks,
}

#[derive(DeriveIden)]
enum RollupDailyReferrer {
    #[sea_orm(iden = "rollup_daily_referrer")]
    Table,
    Id,
    WorkspaceId,
    Day,
    Referrer,
    TotalClicks,
}

#[derive(DeriveIden)]
enum RollupDailyCountry {
    #[sea_orm(iden = "rollup_daily_country")]
    Table,
    Id,
    WorkspaceId,
    Day,
    Country,
    TotalClicks,
}

#[derive(DeriveIden)]
enum RollupDailyDevice {
    #[sea_orm(iden = "rollup_daily_device")]
    Table,
    Id,
    WorkspaceId,
    Day,
    DeviceClass,
    TotalClicks,
}

#[derive(DeriveIden)]
enum AggregationWatermark {
    #[sea_orm(iden = "aggregation_watermark")]
    Table,
    Id,
    LastProcessedAt,
}
