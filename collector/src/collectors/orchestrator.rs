use crate::{
    collectors::{
        Collector,
        NodeInfoCollector,
        NodeStatsCollector,
    },
    error::{
        CollectError,
        RegistryError,
    },
    metrics::{
        MetricFamily,
        MetricSample,
        MetricSink,
    },
};
use futures::{
    future::join_all,
    FutureExt as _,
};
use reqwest::Client as HttpClient;
use std::{
    any::Any,
    fmt,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};
use tracing::{
    debug,
    error,
    warn,
};

pub const SCRAPE_DURATION: MetricFamily = MetricFamily::gauge(
    "logstash_exporter_scrape_duration_seconds",
    "logstash_exporter: Duration of a scrape job.",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeResult {
    Success,
    Error,
}

impl ScrapeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeResult::Success => "success",
            ScrapeResult::Error => "error",
        }
    }
}

/// How one collector fared during one scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    pub collector: String,
    pub duration: Duration,
    pub result: ScrapeResult,
}

impl ScrapeOutcome {
    pub fn to_sample(&self) -> MetricSample {
        SCRAPE_DURATION
            .sample(self.duration.as_secs_f64())
            .label("collector", &self.collector)
            .label("result", self.result.as_str())
    }
}

/// Everything a single scrape produced.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    /// Samples of the successful collectors, grouped per collector in registration order.
    pub samples: Vec<MetricSample>,
    /// One outcome per registered collector, sorted by collector name.
    pub outcomes: Vec<ScrapeOutcome>,
}

impl ScrapeReport {
    /// Collector samples followed by one duration sample per collector.
    pub fn into_samples(self) -> Vec<MetricSample> {
        let mut samples = self.samples;
        samples.extend(self.outcomes.iter().map(ScrapeOutcome::to_sample));
        samples
    }
}

#[derive(Clone)]
struct CollectorEntry {
    name: String,
    collector: Arc<dyn Collector>,
}

/// Owns the registered collectors and runs all of them on every scrape
///
/// Collectors run concurrently, one task each. A failing, panicking or timed
/// out collector only loses its own samples; the scrape itself never fails.
#[derive(Clone, Default)]
pub struct Orchestrator {
    collectors: Vec<CollectorEntry>,
    timeout: Option<Duration>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("collectors", &self.names().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the run time of every collector. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create an orchestrator with the node stats (`node`) and node info
    /// (`info`) collectors for one Logstash endpoint.
    ///
    /// A collector whose endpoint is invalid is logged and left out; the
    /// remaining collectors are still registered.
    pub fn for_logstash(endpoint: &str, http_client: HttpClient, timeout: Option<Duration>) -> Self {
        let mut orchestrator = Self::new().with_timeout(timeout);

        let collectors: [(&str, Result<Arc<dyn Collector>, CollectError>); 2] = [
            (
                "node",
                NodeStatsCollector::new(endpoint, http_client.clone()).map(|c| Arc::new(c) as Arc<dyn Collector>),
            ),
            (
                "info",
                NodeInfoCollector::new(endpoint, http_client).map(|c| Arc::new(c) as Arc<dyn Collector>),
            ),
        ];

        for (name, collector) in collectors {
            match collector {
                Ok(collector) => {
                    if let Err(e) = orchestrator.register(name, collector) {
                        error!(collector = name, error = %e, "Cannot register a new collector");
                    }
                }
                Err(e) => error!(collector = name, error = %e, "Cannot register a new collector"),
            }
        }

        orchestrator
    }

    pub fn register(&mut self, name: impl Into<String>, collector: Arc<dyn Collector>) -> Result<(), RegistryError> {
        let name = name.into();
        if self.collectors.iter().any(|entry| entry.name == name) {
            return Err(RegistryError::DuplicateCollector(name));
        }
        debug!(collector = %name, "registered collector");
        self.collectors.push(CollectorEntry { name, collector });
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collectors.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Run every collector once and wait for all of them.
    ///
    /// Samples of a run that fails, panics or times out are discarded, even
    /// when the collector emitted some of them before failing.
    pub async fn scrape(&self) -> ScrapeReport {
        let started = Instant::now();

        let handles: Vec<_> = self
            .collectors
            .iter()
            .map(|entry| {
                let task = execute(entry.name.clone(), entry.collector.clone(), self.timeout);
                (entry.name.clone(), tokio::spawn(task))
            })
            .collect();

        let runs = join_all(handles.into_iter().map(|(name, handle)| async move {
            match handle.await {
                Ok(run) => run,
                Err(e) => {
                    warn!(collector = %name, error = %e, "collector task did not complete");
                    let outcome = ScrapeOutcome {
                        collector: name,
                        duration: started.elapsed(),
                        result: ScrapeResult::Error,
                    };
                    (outcome, Vec::new())
                }
            }
        }))
        .await;

        let mut samples = Vec::new();
        let mut outcomes = Vec::with_capacity(runs.len());
        for (outcome, run_samples) in runs {
            samples.extend(run_samples);
            outcomes.push(outcome);
        }
        outcomes.sort_by(|a, b| a.collector.cmp(&b.collector));

        ScrapeReport { samples, outcomes }
    }

    /// Run every collector once and return the merged sample stream.
    pub async fn collect(&self) -> Vec<MetricSample> {
        self.scrape().await.into_samples()
    }
}

/// Run one collector into its own sink. The samples are only returned on success.
async fn execute(
    name: String,
    collector: Arc<dyn Collector>,
    timeout: Option<Duration>,
) -> (ScrapeOutcome, Vec<MetricSample>) {
    let (sink, receiver) = MetricSink::channel();
    let begin = Instant::now();
    let run = AssertUnwindSafe(collector.collect(sink)).catch_unwind();

    // Awaiting consumes the run future, dropping the collector's sink with it.
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, run)
            .await
            .unwrap_or(Ok(Err(CollectError::Timeout(limit)))),
        None => run.await,
    }
    .unwrap_or_else(|panic| Err(CollectError::Panicked(panic_message(panic.as_ref()))));

    let duration = begin.elapsed();
    let (result, samples) = match result {
        Ok(()) => {
            debug!(collector = %name, elapsed = ?duration, "OK: collector succeeded");
            (ScrapeResult::Success, receiver.drain())
        }
        Err(e @ (CollectError::Timeout(_) | CollectError::Panicked(_))) => {
            warn!(collector = %name, elapsed = ?duration, error = %e, "ERROR: collector failed");
            (ScrapeResult::Error, Vec::new())
        }
        Err(e) => {
            debug!(collector = %name, elapsed = ?duration, error = %e, "ERROR: collector failed");
            (ScrapeResult::Error, Vec::new())
        }
    };

    let outcome = ScrapeOutcome {
        collector: name,
        duration,
        result,
    };
    (outcome, samples)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
