//! # Logstash Exporter Collector
//!
//! Turns the Logstash monitoring API into Prometheus metric samples.
//!
//! ## Architecture
//!
//! - **`fetcher`**: one GET against the monitoring API, decoded into a typed JSON shape
//! - **`metrics`**: metric families, samples and the shared sink collectors write into
//! - **`collectors`**: the per-endpoint collectors and the orchestrator that fans out to them
//!
//! ## Usage
//!
//! ```no_run
//! # async fn scrape() {
//! use logstash_exporter_collector::Orchestrator;
//!
//! let orchestrator = Orchestrator::for_logstash("http://localhost:9600", reqwest::Client::new(), None);
//! for sample in orchestrator.collect().await {
//!     println!("{} {:?} {}", sample.name(), sample.labels(), sample.value());
//! }
//! # }
//! ```

pub mod collectors;
pub mod error;
pub mod fetcher;
pub mod metrics;

pub use collectors::*;
pub use error::{
    CollectError,
    FetchError,
    RegistryError,
};
pub use fetcher::RemoteFetcher;
pub use metrics::*;
