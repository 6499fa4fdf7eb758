pub mod aggregation_watermark;
pub mod billing_usage_period;
pub mod click_log;
pub mod domain;
pub mod link;
pub mod rollup_daily_country;
pub mod rollup_daily_device;
pub mod rollup_daily_link;
pub mod rollup_daily_referrer;
pub mod rollup_daily_workspace;
pub mod workspace;
pub mod workspace_counter;

pub use aggregation_watermark::Entity as AggregationWatermarkEntity;
pub use billing_usage_period::Entity as BillingUsagePeriodEntity;
pub use click_log::Entity as ClickLogEntity;
pub use domain::Entity as DomainEntity;
pub use link::Entity as LinkEntity;
pub use rollup_daily_country::Entity as RollupDailyCountryEntity;
pub use rollup_daily_device::Entity as RollupDailyDeviceEntity;
pub use rollup_daily_link::Entity as RollupDailyLinkEntity;
pub use rollup_daily_referrer::Entity as RollupDailyReferrerEntity;
pub use rollup_daily_workspace::Entity as RollupDailyWorkspaceEntity;
pub use workspace::Entity as WorkspaceEntity;
pub use workspace_counter::Entity as WorkspaceCounterEntity;
