//! Analytics 查询服务
//!
//! 只读汇总表，绝不触碰原始点击日志与计数器。
//! 范围令牌 {7d, 30d, 90d, all}，按套餐做回看上限：
//! Free = 30 天，Pro = 24 个月。固定令牌超出上限直接校验失败；
//! "all" 取套餐完整回看窗口（不是无界扫描）。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::errors::{Result, ShortspanError};
use crate::storage::{Plan, SeaOrmStorage};

use migration::entities::{
    rollup_daily_country, rollup_daily_device, rollup_daily_link, rollup_daily_referrer,
    rollup_daily_workspace,
};

/// Pro 套餐回看窗口（24 个月）
const PRO_CEILING_DAYS: i64 = 730;
/// Free 套餐回看窗口
const FREE_CEILING_DAYS: i64 = 30;

const TOP_LINKS_LIMIT: usize = 100;
const TOP_REFERRERS_LIMIT: usize = 50;
const TOP_COUNTRIES_LIMIT: usize = 50;
const TREND_DAYS: i64 = 30;

/// 查询范围令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeToken {
    D7,
    D30,
    D90,
    All,
}

impl RangeToken {
    pub fn parse(s: &str) -> Option<RangeToken> {
        match s {
            "7d" => Some(RangeToken::D7),
            "30d" => Some(RangeToken::D30),
            "90d" => Some(RangeToken::D90),
            "all" => Some(RangeToken::All),
            _ => None,
        }
    }

    /// 固定天数；All 返回 None
    pub fn days(&self) -> Option<i64> {
        match self {
            RangeToken::D7 => Some(7),
            RangeToken::D30 => Some(30),
            RangeToken::D90 => Some(90),
            RangeToken::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeToken::D7 => "7d",
            RangeToken::D30 => "30d",
            RangeToken::D90 => "90d",
            RangeToken::All => "all",
        }
    }
}

/// 套餐回看上限（天）
pub fn plan_ceiling_days(plan: Plan) -> i64 {
    match plan {
        Plan::Free => FREE_CEILING_DAYS,
        Plan::Pro => PRO_CEILING_DAYS,
    }
}

/// 计算范围起始日（含当日）；固定令牌超出套餐上限返回校验错误
pub fn range_start(token: RangeToken, plan: Plan, today: NaiveDate) -> Result<NaiveDate> {
    let ceiling = plan_ceiling_days(plan);
    match token.days() {
        Some(days) if days > ceiling => Err(ShortspanError::validation(format!(
            "Range '{}' exceeds the {} plan lookback window of {} days",
            token.as_str(),
            plan,
            ceiling
        ))),
        Some(days) => Ok(today - Duration::days(days - 1)),
        None => Ok(today - Duration::days(ceiling - 1)),
    }
}

// ============ 响应数据 ============

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub total_clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewData {
    pub total_clicks: i64,
    pub daily_trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkStat {
    pub id: String,
    pub slug: String,
    pub destination_url: String,
    pub total_clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferrerStat {
    pub referrer: String,
    pub total_clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryStat {
    pub country: String,
    pub total_clicks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStat {
    pub device_type: String,
    pub total_clicks: i64,
}

pub struct AnalyticsService {
    storage: Arc<SeaOrmStorage>,
}

impl AnalyticsService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    // ============ 查询端点 ============

    /// 范围内总点击 + 最近 30 天日趋势
    pub async fn overview(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
    ) -> Result<OverviewData> {
        self.overview_at(workspace_id, plan, range, Utc::now().date_naive())
            .await
    }

    pub async fn overview_at(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
        today: NaiveDate,
    ) -> Result<OverviewData> {
        let start = range_start(range, plan, today)?;

        let rows = self.workspace_days(workspace_id, start).await?;
        let total_clicks: i64 = rows.iter().map(|r| r.total_clicks).sum();

        // 趋势固定取最近 30 天，缺数据的日期补零
        let trend_start = today - Duration::days(TREND_DAYS - 1);
        let by_day: HashMap<NaiveDate, i64> = self
            .workspace_days(workspace_id, trend_start)
            .await?
            .into_iter()
            .map(|r| (r.day, r.total_clicks))
            .collect();

        let mut daily_trend = Vec::with_capacity(TREND_DAYS as usize);
        for offset in 0..TREND_DAYS {
            let day = trend_start + Duration::days(offset);
            daily_trend.push(TrendPoint {
                date: day.format("%Y-%m-%d").to_string(),
                total_clicks: by_day.get(&day).copied().unwrap_or(0),
            });
        }

        Ok(OverviewData {
            total_clicks,
            daily_trend,
        })
    }

    /// 每链接总点击，按点击降序 top 100，连接目录补充 slug/目标
    pub async fn links(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
    ) -> Result<Vec<LinkStat>> {
        self.links_at(workspace_id, plan, range, Utc::now().date_naive())
            .await
    }

    pub async fn links_at(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
        today: NaiveDate,
    ) -> Result<Vec<LinkStat>> {
        let start = range_start(range, plan, today)?;

        let link_ids = self.storage.list_link_ids_by_workspace(workspace_id).await?;
        if link_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = rollup_daily_link::Entity::find()
            .filter(rollup_daily_link::Column::LinkId.is_in(link_ids.iter().map(|s| s.as_str())))
            .filter(rollup_daily_link::Column::Day.gte(start))
            .all(self.storage.get_db())
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询链接汇总失败: {}", e)))?;

        let mut totals: HashMap<String, i64> = HashMap::new();
        for row in rows {
            *totals.entry(row.link_id).or_insert(0) += row.total_clicks;
        }

        let mut ranked: Vec<(String, i64)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(TOP_LINKS_LIMIT);

        let ranked_ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let catalog: HashMap<String, migration::entities::link::Model> = self
            .storage
            .list_links_by_ids(&ranked_ids)
            .await?
            .into_iter()
            .map(|l| (l.id.clone(), l))
            .collect();

        Ok(ranked
            .into_iter()
            .filter_map(|(id, total_clicks)| {
                catalog.get(&id).map(|link| LinkStat {
                    id,
                    slug: link.slug.clone(),
                    destination_url: link.destination_url.clone(),
                    total_clicks,
                })
            })
            .collect())
    }

    /// 每来源总点击 top 50
    pub async fn referrers(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
    ) -> Result<Vec<ReferrerStat>> {
        self.referrers_at(workspace_id, plan, range, Utc::now().date_naive())
            .await
    }

    pub async fn referrers_at(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
        today: NaiveDate,
    ) -> Result<Vec<ReferrerStat>> {
        let start = range_start(range, plan, today)?;

        let rows = rollup_daily_referrer::Entity::find()
            .filter(rollup_daily_referrer::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_referrer::Column::Day.gte(start))
            .all(self.storage.get_db())
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询来源汇总失败: {}", e)))?;

        let mut totals: HashMap<String, i64> = HashMap::new();
        for row in rows {
            *totals.entry(row.referrer).or_insert(0) += row.total_clicks;
        }

        let mut ranked: Vec<ReferrerStat> = totals
            .into_iter()
            .map(|(referrer, total_clicks)| ReferrerStat {
                referrer,
                total_clicks,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.total_clicks
                .cmp(&a.total_clicks)
                .then_with(|| a.referrer.cmp(&b.referrer))
        });
        ranked.truncate(TOP_REFERRERS_LIMIT);
        Ok(ranked)
    }

    /// 每国家总点击 top 50
    pub async fn countries(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
    ) -> Result<Vec<CountryStat>> {
        self.countries_at(workspace_id, plan, range, Utc::now().date_naive())
            .await
    }

    pub async fn countries_at(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
        today: NaiveDate,
    ) -> Result<Vec<CountryStat>> {
        let start = range_start(range, plan, today)?;

        let rows = rollup_daily_country::Entity::find()
            .filter(rollup_daily_country::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_country::Column::Day.gte(start))
            .all(self.storage.get_db())
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询国家汇总失败: {}", e)))?;

        let mut totals: HashMap<String, i64> = HashMap::new();
        for row in rows {
            *totals.entry(row.country).or_insert(0) += row.total_clicks;
        }

        let mut ranked: Vec<CountryStat> = totals
            .into_iter()
            .map(|(country, total_clicks)| CountryStat {
                country,
                total_clicks,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.total_clicks
                .cmp(&a.total_clicks)
                .then_with(|| a.country.cmp(&b.country))
        });
        ranked.truncate(TOP_COUNTRIES_LIMIT);
        Ok(ranked)
    }

    /// 每设备类型总点击（基数小，全量返回）
    pub async fn devices(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
    ) -> Result<Vec<DeviceStat>> {
        self.devices_at(workspace_id, plan, range, Utc::now().date_naive())
            .await
    }

    pub async fn devices_at(
        &self,
        workspace_id: &str,
        plan: Plan,
        range: RangeToken,
        today: NaiveDate,
    ) -> Result<Vec<DeviceStat>> {
        let start = range_start(range, plan, today)?;

        let rows = rollup_daily_device::Entity::find()
            .filter(rollup_daily_device::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_device::Column::Day.gte(start))
            .all(self.storage.get_db())
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询设备汇总失败: {}", e)))?;

        let mut totals: HashMap<String, i64> = HashMap::new();
        for row in rows {
            *totals.entry(row.device_class).or_insert(0) += row.total_clicks;
        }

        let mut ranked: Vec<DeviceStat> = totals
            .into_iter()
            .map(|(device_type, total_clicks)| DeviceStat {
                device_type,
                total_clicks,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.total_clicks
                .cmp(&a.total_clicks)
                .then_with(|| a.device_type.cmp(&b.device_type))
        });
        Ok(ranked)
    }

    // ============ 辅助查询 ============

    async fn workspace_days(
        &self,
        workspace_id: &str,
        start: NaiveDate,
    ) -> Result<Vec<rollup_daily_workspace::Model>> {
        rollup_daily_workspace::Entity::find()
            .filter(rollup_daily_workspace::Column::WorkspaceId.eq(workspace_id))
            .filter(rollup_daily_workspace::Column::Day.gte(start))
            .all(self.storage.get_db())
            .await
            .map_err(|e| ShortspanError::database_operation(format!("查询租户汇总失败: {}", e)))
    }
}
