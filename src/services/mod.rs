pub mod analytics_service;
pub mod plan_cache;
pub mod resolver;

pub use analytics_service::{AnalyticsService, RangeToken};
pub use plan_cache::PlanCache;
pub use resolver::{Resolution, Resolver};
