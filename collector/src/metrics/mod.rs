//! # Metrics Module
//!
//! Data model shared by every collector and by the exposition layer.
//!
//! - **`MetricFamily`**: name, help text and kind (counter or gauge) of a metric
//! - **`MetricSample`**: one labelled observation of a family
//! - **`MetricSink`**: the concurrent append-only destination collectors write to

pub mod sample;
pub mod sink;

pub use sample::*;
pub use sink::*;
