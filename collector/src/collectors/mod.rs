//! # Collectors Module
//!
//! - **`Collector` trait**: the interface every metric collector implements
//! - **`NodeStatsCollector`**: runtime statistics from `/_node/stats` (JVM, process, events, pipelines, plugins)
//! - **`NodeInfoCollector`**: static node, OS and JVM facts from `/_node`
//! - **`Orchestrator`**: runs all registered collectors concurrently and records how each one fared

pub mod collector;
pub mod node_info_collector;
pub mod node_stats_collector;
pub mod orchestrator;

pub use collector::Collector;
pub use node_info_collector::NodeInfoCollector;
pub use node_stats_collector::NodeStatsCollector;
pub use orchestrator::{
    Orchestrator,
    ScrapeOutcome,
    ScrapeReport,
    ScrapeResult,
    SCRAPE_DURATION,
};
