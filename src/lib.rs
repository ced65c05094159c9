#[macro_use]
extern crate tracing;

mod errors;
mod logging;

use color_eyre::Result;
pub use errors::init_errors;
use eyre::Context as _;
use logstash_exporter_collector::Orchestrator;
use logstash_exporter_config::Config;
use logstash_exporter_http::{
    create_router,
    serve,
};
pub use logging::init_logging;
use std::sync::Arc;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the collectors for the configured Logstash node and serve them until shutdown.
pub async fn run(config: Config) -> Result<()> {
    let collector_timeout = config.collector_timeout()?;
    let address = config.listen_addr()?;
    let web_config = config.web_config()?;

    let http_client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build the HTTP client")?;

    let orchestrator = Orchestrator::for_logstash(&config.logstash_endpoint, http_client, collector_timeout);
    info!(
        endpoint = %config.logstash_endpoint,
        config_dir = %config.config_dir().display(),
        collectors = ?orchestrator.names().collect::<Vec<_>>(),
        timeout = ?collector_timeout,
        "starting logstash exporter"
    );

    let app = create_router(Arc::new(orchestrator), &config.telemetry_path);
    serve(app, address, web_config).await
}
