//! Server startup preparation
//!
//! Wires together storage, counters, plan cache, the click pipeline and
//! the scheduled subsystem before the HTTP server starts accepting traffic.

use std::sync::Arc;

use tracing::debug;

use crate::analytics::{ClickLogSink, ClickPipeline};
use crate::billing::NullInvoiceClient;
use crate::config::get_config;
use crate::counter::{CounterStore, WorkspaceCounters};
use crate::errors::Result;
use crate::scheduler;
use crate::services::{AnalyticsService, PlanCache, Resolver};
use crate::storage::SeaOrmStorage;

/// 服务启动期装配出的共享组件
pub struct ServerStartup {
    pub storage: Arc<SeaOrmStorage>,
    pub counters: Arc<WorkspaceCounters>,
    pub plan_cache: Arc<PlanCache>,
    pub resolver: Arc<Resolver>,
    pub analytics: Arc<AnalyticsService>,
    pub pipeline: Arc<ClickPipeline>,
}

/// Prepare all server components (storage, counters, pipeline, jobs)
pub async fn prepare_server_startup() -> Result<ServerStartup> {
    let config = get_config();

    let storage = Arc::new(SeaOrmStorage::from_url(&config.database.database_url).await?);

    let counters = Arc::new(WorkspaceCounters::new(
        Arc::clone(&storage) as Arc<dyn CounterStore>
    ));

    let plan_cache = Arc::new(PlanCache::new(
        Arc::clone(&storage),
        config.plan_cache.ttl_seconds,
        config.plan_cache.max_capacity,
    ));

    let resolver = Arc::new(Resolver::new(Arc::clone(&storage)));
    let analytics = Arc::new(AnalyticsService::new(Arc::clone(&storage)));

    // 点击管道：响应后跟踪的唯一入口
    let pipeline = ClickPipeline::start(
        Arc::clone(&storage) as Arc<dyn ClickLogSink>,
        config.analytics.pipeline_capacity,
        config.analytics.pipeline_workers,
        config.analytics.write_batch_size,
    );

    // 定时子系统
    scheduler::spawn_scheduled_jobs(
        Arc::clone(&storage),
        Arc::clone(&counters),
        Arc::new(NullInvoiceClient),
    );

    debug!("Server startup preparation completed");

    Ok(ServerStartup {
        storage,
        counters,
        plan_cache,
        resolver,
        analytics,
        pipeline,
    })
}
