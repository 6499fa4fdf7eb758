//! Shortspan - multi-tenant URL shortener data plane
//!
//! One binary serves the redirect edge, the authenticated analytics API,
//! the in-process click pipeline, and the scheduled subsystem
//! (aggregation, retention, billing report, reconciliation).

use color_eyre::Result;
use dotenv::dotenv;

use shortspan::config;
use shortspan::runtime;
use shortspan::system::logging::init_logging;

#[actix_web::main]
async fn main() -> Result<(), color_eyre::Report> {
    // Setup global error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Initialize configuration system
    config::init_config();
    let cfg = config::get_config();

    // Initialize logging (guard must outlive the server)
    let _logging_guard = {
        let result = init_logging(&cfg);
        if let Some(warning) = result.warning {
            tracing::warn!("{}", warning);
        }
        result.guard
    };

    runtime::modes::run_server(&cfg)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e))?;

    Ok(())
}
