//! 用量计数与计费快照表迁移
//!
//! - workspace_counters：每租户计数状态持久行（每次变更即落盘）
//! - billing_usage_periods：周期关账后的用量快照，(workspace, start, end) 唯一

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkspaceCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkspaceCounters::WorkspaceId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WorkspaceCounters::FreeMonthKey)
                            .string_len(7)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkspaceCounters::FreeTrackedClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WorkspaceCounters::ProPeriodStart)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkspaceCounters::ProPeriodEnd)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(WorkspaceCounters::ProTrackedClicks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WorkspaceCounters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BillingUsagePeriods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillingUsagePeriods::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::WorkspaceId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::TotalClicks)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::IncludedClicks)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::OverageUnits)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::OverageAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::InvoiceItemId)
                            .string_len(128)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BillingUsagePeriods::ReportedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_billing_usage_period")
                    .table(BillingUsagePeriods::Table)
                    .col(BillingUsagePeriods::WorkspaceId)
                    .col(BillingUsagePeriods::PeriodStart)
                    .col(BillingUsagePeriods::PeriodEnd)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 对账任务按 reported_at 过滤最近 7 天
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_billing_usage_reported_at")
                    .table(BillingUsagePeriods::Table)
                    .col(BillingUsagePeriods::ReportedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_billing_usage_reported_at")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_billing_usage_period").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BillingUsagePeriods::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkspaceCounters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WorkspaceCounters {
    #[sea_orm(iden = "workspace_counters")]
    Table,
    WorkspaceId,
    FreeMonthKey,
    FreeTrackedClicks,
    ProPeriodStart,
    ProPeriodEnd,
    ProTrackedClicks,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BillingUsagePeriods {
    #[sea_orm(iden = "billing_usage_periods")]
    Table,
    Id,
    WorkspaceId,
    PeriodStart,
    PeriodEnd,
    TotalClicks,
    IncludedClicks,
    OverageUnits,
    OverageAmount,
    InvoiceItemId,
    ReportedAt,
}
