pub mod analytics;
pub mod health;
pub mod redirect;

pub use analytics::analytics_routes;
pub use health::{AppStartTime, HealthService, health_routes};
pub use redirect::{RedirectService, redirect_routes};
