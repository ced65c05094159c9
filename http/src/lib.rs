//! # Logstash Exporter HTTP
//!
//! The scrape surface of the exporter.
//!
//! - **`router`**: axum routes for the telemetry path, the `/` redirect and `/healthz`
//! - **`exposition`**: rendering of metric samples in the Prometheus text format
//! - **`server`**: plain or TLS listener with graceful shutdown

#[macro_use]
extern crate tracing;

pub mod error;
pub mod exposition;
pub mod router;
pub mod server;

pub use router::{
    create_router,
    AppState,
};
pub use server::serve;
