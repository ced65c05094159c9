use crate::{
    error::CollectError,
    metrics::MetricSink,
};
use std::{
    future::Future,
    pin::Pin,
};

/// Trait for producing the samples of one group of metric families
pub trait Collector: Send + Sync {
    /// Fetch upstream data and append the resulting samples to `sink`.
    ///
    /// An `Err` means no sample of this invocation was appended.
    fn collect(&self, sink: MetricSink) -> Pin<Box<dyn Future<Output = Result<(), CollectError>> + Send + '_>>;
}
