use crate::{
    collectors::Collector,
    error::CollectError,
    fetcher::{
        endpoint_url,
        RemoteFetcher,
    },
    metrics::{
        MetricFamily,
        MetricSample,
        MetricSink,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    future::Future,
    pin::Pin,
};

const JVM_UPTIME: MetricFamily =
    MetricFamily::gauge("logstash_node_jvm_uptime_seconds", "Time since the Logstash JVM started.");
const JVM_THREADS: MetricFamily = MetricFamily::gauge("logstash_node_jvm_threads_count", "Live JVM threads.");
const JVM_THREADS_PEAK: MetricFamily =
    MetricFamily::gauge("logstash_node_jvm_threads_peak_count", "Peak number of live JVM threads.");

const HEAP_USED_PERCENT: MetricFamily =
    MetricFamily::gauge("logstash_node_mem_heap_used_percent", "Share of the maximum heap in use.");
const HEAP_COMMITTED: MetricFamily =
    MetricFamily::gauge("logstash_node_mem_heap_committed_bytes", "Heap memory committed.");
const HEAP_MAX: MetricFamily = MetricFamily::gauge("logstash_node_mem_heap_max_bytes", "Maximum heap memory.");
const HEAP_USED: MetricFamily = MetricFamily::gauge("logstash_node_mem_heap_used_bytes", "Heap memory in use.");
const NONHEAP_COMMITTED: MetricFamily =
    MetricFamily::gauge("logstash_node_mem_nonheap_committed_bytes", "Non-heap memory committed.");
const NONHEAP_USED: MetricFamily =
    MetricFamily::gauge("logstash_node_mem_nonheap_used_bytes", "Non-heap memory in use.");
const POOL_USED: MetricFamily = MetricFamily::gauge("logstash_node_mem_pool_used_bytes", "Memory pool usage.");
const POOL_PEAK_USED: MetricFamily =
    MetricFamily::gauge("logstash_node_mem_pool_peak_used_bytes", "Peak memory pool usage.");
const POOL_MAX: MetricFamily = MetricFamily::gauge("logstash_node_mem_pool_max_bytes", "Memory pool maximum.");
const POOL_PEAK_MAX: MetricFamily =
    MetricFamily::gauge("logstash_node_mem_pool_peak_max_bytes", "Peak memory pool maximum.");
const POOL_COMMITTED: MetricFamily =
    MetricFamily::gauge("logstash_node_mem_pool_committed_bytes", "Memory pool committed.");

const GC_COLLECTIONS: MetricFamily =
    MetricFamily::counter("logstash_node_gc_collections_total", "Garbage collection runs.");
const GC_DURATION: MetricFamily = MetricFamily::counter(
    "logstash_node_gc_collection_duration_seconds_total",
    "Time spent in garbage collection.",
);

const PROCESS_OPEN_FDS: MetricFamily =
    MetricFamily::gauge("logstash_node_process_open_filedescriptors", "Open file descriptors.");
const PROCESS_MAX_FDS: MetricFamily =
    MetricFamily::gauge("logstash_node_process_max_filedescriptors", "File descriptor limit.");
const PROCESS_CPU_TOTAL: MetricFamily =
    MetricFamily::counter("logstash_node_process_cpu_seconds_total", "CPU time used by the process.");
const PROCESS_CPU_PERCENT: MetricFamily =
    MetricFamily::gauge("logstash_node_process_cpu_percent", "Recent CPU usage of the process.");
const PROCESS_LOAD_AVERAGE: MetricFamily =
    MetricFamily::gauge("logstash_node_process_load_average", "System load average.");
const PROCESS_VIRTUAL_MEM: MetricFamily = MetricFamily::gauge(
    "logstash_node_process_mem_total_virtual_bytes",
    "Virtual memory available to the process.",
);

const EVENTS_IN: MetricFamily = MetricFamily::counter("logstash_node_events_in_total", "Events received.");
const EVENTS_FILTERED: MetricFamily =
    MetricFamily::counter("logstash_node_events_filtered_total", "Events that passed the filters.");
const EVENTS_OUT: MetricFamily = MetricFamily::counter("logstash_node_events_out_total", "Events sent to outputs.");
const EVENTS_DURATION: MetricFamily = MetricFamily::counter(
    "logstash_node_events_duration_seconds_total",
    "Time spent processing events.",
);
const EVENTS_QUEUE_PUSH_DURATION: MetricFamily = MetricFamily::counter(
    "logstash_node_events_queue_push_duration_seconds_total",
    "Time inputs spent pushing events into the queue.",
);

const RELOADS_SUCCESSES: MetricFamily =
    MetricFamily::counter("logstash_node_reloads_successes_total", "Successful configuration reloads.");
const RELOADS_FAILURES: MetricFamily =
    MetricFamily::counter("logstash_node_reloads_failures_total", "Failed configuration reloads.");

const PIPELINE_EVENTS_IN: MetricFamily =
    MetricFamily::counter("logstash_node_pipeline_events_in_total", "Events received by the pipeline.");
const PIPELINE_EVENTS_FILTERED: MetricFamily = MetricFamily::counter(
    "logstash_node_pipeline_events_filtered_total",
    "Events that passed the pipeline filters.",
);
const PIPELINE_EVENTS_OUT: MetricFamily =
    MetricFamily::counter("logstash_node_pipeline_events_out_total", "Events sent by the pipeline.");
const PIPELINE_EVENTS_DURATION: MetricFamily = MetricFamily::counter(
    "logstash_node_pipeline_events_duration_seconds_total",
    "Time the pipeline spent processing events.",
);
const PIPELINE_UP: MetricFamily = MetricFamily::gauge(
    "logstash_node_pipeline_up",
    "Whether the last configuration reload of the pipeline succeeded.",
);
const PIPELINE_RELOADS_SUCCESSES: MetricFamily = MetricFamily::counter(
    "logstash_node_pipeline_reloads_successes_total",
    "Successful reloads of the pipeline.",
);
const PIPELINE_RELOADS_FAILURES: MetricFamily = MetricFamily::counter(
    "logstash_node_pipeline_reloads_failures_total",
    "Failed reloads of the pipeline.",
);
const QUEUE_EVENTS: MetricFamily =
    MetricFamily::gauge("logstash_node_pipeline_queue_events", "Events waiting in the pipeline queue.");
const QUEUE_SIZE: MetricFamily =
    MetricFamily::gauge("logstash_node_pipeline_queue_size_bytes", "Size of the pipeline queue on disk.");
const QUEUE_MAX_SIZE: MetricFamily = MetricFamily::gauge(
    "logstash_node_pipeline_queue_max_size_bytes",
    "Configured maximum size of the pipeline queue.",
);
const DEAD_LETTER_QUEUE_SIZE: MetricFamily = MetricFamily::gauge(
    "logstash_node_pipeline_dead_letter_queue_size_bytes",
    "Size of the pipeline dead letter queue.",
);

const PLUGIN_EVENTS_IN: MetricFamily =
    MetricFamily::counter("logstash_node_plugin_events_in_total", "Events received by the plugin.");
const PLUGIN_EVENTS_OUT: MetricFamily =
    MetricFamily::counter("logstash_node_plugin_events_out_total", "Events emitted by the plugin.");
const PLUGIN_DURATION: MetricFamily = MetricFamily::counter(
    "logstash_node_plugin_duration_seconds_total",
    "Time the plugin spent processing events.",
);
const PLUGIN_QUEUE_PUSH_DURATION: MetricFamily = MetricFamily::counter(
    "logstash_node_plugin_queue_push_duration_seconds_total",
    "Time the input plugin spent pushing events into the queue.",
);
const PLUGIN_MATCHES: MetricFamily =
    MetricFamily::counter("logstash_node_plugin_matches_total", "Events the filter plugin matched.");
const PLUGIN_FAILURES: MetricFamily =
    MetricFamily::counter("logstash_node_plugin_failures_total", "Events the filter plugin failed on.");

/// Subset of `GET /_node/stats` the exporter reads.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStats {
    pub jvm: Jvm,
    pub process: Option<Process>,
    pub events: Option<Events>,
    pub reloads: Option<Reloads>,
    #[serde(default)]
    pub pipelines: BTreeMap<String, Pipeline>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jvm {
    pub uptime_in_millis: f64,
    pub threads: Option<Threads>,
    pub mem: Option<JvmMem>,
    pub gc: Option<Gc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Threads {
    pub count: f64,
    pub peak_count: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JvmMem {
    pub heap_used_percent: f64,
    pub heap_committed_in_bytes: f64,
    pub heap_max_in_bytes: f64,
    pub heap_used_in_bytes: f64,
    pub non_heap_used_in_bytes: f64,
    pub non_heap_committed_in_bytes: f64,
    #[serde(default)]
    pub pools: BTreeMap<String, MemPool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemPool {
    pub used_in_bytes: f64,
    pub peak_used_in_bytes: f64,
    pub max_in_bytes: f64,
    pub peak_max_in_bytes: f64,
    pub committed_in_bytes: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gc {
    #[serde(default)]
    pub collectors: BTreeMap<String, GcCollector>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcCollector {
    pub collection_count: f64,
    pub collection_time_in_millis: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Process {
    pub open_file_descriptors: f64,
    pub max_file_descriptors: f64,
    pub cpu: Option<ProcessCpu>,
    pub mem: Option<ProcessMem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessCpu {
    pub total_in_millis: f64,
    pub percent: f64,
    pub load_average: Option<LoadAverage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadAverage {
    #[serde(rename = "1m")]
    pub one_minute: Option<f64>,
    #[serde(rename = "5m")]
    pub five_minutes: Option<f64>,
    #[serde(rename = "15m")]
    pub fifteen_minutes: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessMem {
    pub total_virtual_in_bytes: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Events {
    #[serde(rename = "in")]
    pub received: f64,
    pub filtered: f64,
    pub out: f64,
    pub duration_in_millis: Option<f64>,
    pub queue_push_duration_in_millis: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reloads {
    pub successes: f64,
    pub failures: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub events: Option<Events>,
    pub plugins: Option<Plugins>,
    pub reloads: Option<PipelineReloads>,
    pub queue: Option<Queue>,
    pub dead_letter_queue: Option<DeadLetterQueue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plugins {
    #[serde(default)]
    pub inputs: Vec<Plugin>,
    #[serde(default)]
    pub codecs: Vec<Plugin>,
    #[serde(default)]
    pub filters: Vec<Plugin>,
    #[serde(default)]
    pub outputs: Vec<Plugin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Plugin {
    pub id: String,
    pub name: Option<String>,
    pub events: Option<PluginEvents>,
    pub matches: Option<f64>,
    pub failures: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginEvents {
    #[serde(rename = "in")]
    pub received: Option<f64>,
    pub out: Option<f64>,
    pub duration_in_millis: Option<f64>,
    pub queue_push_duration_in_millis: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineReloads {
    pub successes: f64,
    pub failures: f64,
    pub last_success_timestamp: Option<DateTime<Utc>>,
    pub last_failure_timestamp: Option<DateTime<Utc>>,
}

impl PipelineReloads {
    /// A pipeline is up unless its most recent reload attempt failed.
    pub fn is_up(&self) -> bool {
        match (self.last_success_timestamp, self.last_failure_timestamp) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(success), Some(failure)) => success >= failure,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Queue {
    #[serde(rename = "type")]
    pub queue_type: String,
    pub events: Option<f64>,
    pub events_count: Option<f64>,
    pub queue_size_in_bytes: Option<f64>,
    pub max_queue_size_in_bytes: Option<f64>,
    pub capacity: Option<QueueCapacity>,
}

/// Older Logstash versions report persisted queue sizes below `capacity`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueCapacity {
    pub queue_size_in_bytes: Option<f64>,
    pub max_queue_size_in_bytes: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeadLetterQueue {
    pub queue_size_in_bytes: f64,
}

fn seconds(millis: f64) -> f64 {
    millis / 1000.0
}

/// Collects JVM, process, event and pipeline statistics from `/_node/stats`
#[derive(Debug, Clone)]
pub struct NodeStatsCollector {
    fetcher: RemoteFetcher,
}

impl NodeStatsCollector {
    pub const PATH: &'static str = "/_node/stats";

    pub fn new(base_endpoint: &str, http_client: HttpClient) -> Result<Self, CollectError> {
        let endpoint = endpoint_url(base_endpoint, Self::PATH)?;
        Ok(Self {
            fetcher: RemoteFetcher::new(http_client, endpoint),
        })
    }

    /// Map decoded node statistics to samples.
    ///
    /// Absent optional sections contribute nothing. The output order only
    /// depends on `stats`.
    pub fn samples(stats: &NodeStats) -> Vec<MetricSample> {
        let mut samples = Vec::new();
        Self::jvm_samples(&stats.jvm, &mut samples);

        if let Some(process) = &stats.process {
            Self::process_samples(process, &mut samples);
        }

        if let Some(events) = &stats.events {
            samples.push(EVENTS_IN.sample(events.received));
            samples.push(EVENTS_FILTERED.sample(events.filtered));
            samples.push(EVENTS_OUT.sample(events.out));
            if let Some(duration) = events.duration_in_millis {
                samples.push(EVENTS_DURATION.sample(seconds(duration)));
            }
            if let Some(duration) = events.queue_push_duration_in_millis {
                samples.push(EVENTS_QUEUE_PUSH_DURATION.sample(seconds(duration)));
            }
        }

        if let Some(reloads) = &stats.reloads {
            samples.push(RELOADS_SUCCESSES.sample(reloads.successes));
            samples.push(RELOADS_FAILURES.sample(reloads.failures));
        }

        for (name, pipeline) in &stats.pipelines {
            Self::pipeline_samples(name, pipeline, &mut samples);
        }

        samples
    }

    fn jvm_samples(jvm: &Jvm, samples: &mut Vec<MetricSample>) {
        samples.push(JVM_UPTIME.sample(seconds(jvm.uptime_in_millis)));

        if let Some(threads) = &jvm.threads {
            samples.push(JVM_THREADS.sample(threads.count));
            samples.push(JVM_THREADS_PEAK.sample(threads.peak_count));
        }

        if let Some(mem) = &jvm.mem {
            samples.push(HEAP_USED_PERCENT.sample(mem.heap_used_percent));
            samples.push(HEAP_COMMITTED.sample(mem.heap_committed_in_bytes));
            samples.push(HEAP_MAX.sample(mem.heap_max_in_bytes));
            samples.push(HEAP_USED.sample(mem.heap_used_in_bytes));
            samples.push(NONHEAP_COMMITTED.sample(mem.non_heap_committed_in_bytes));
            samples.push(NONHEAP_USED.sample(mem.non_heap_used_in_bytes));

            for (pool_name, pool) in &mem.pools {
                for (family, value) in [
                    (POOL_USED, pool.used_in_bytes),
                    (POOL_PEAK_USED, pool.peak_used_in_bytes),
                    (POOL_MAX, pool.max_in_bytes),
                    (POOL_PEAK_MAX, pool.peak_max_in_bytes),
                    (POOL_COMMITTED, pool.committed_in_bytes),
                ] {
                    samples.push(family.sample(value).label("pool", pool_name));
                }
            }
        }

        if let Some(gc) = &jvm.gc {
            for (collector, stats) in &gc.collectors {
                samples.push(GC_COLLECTIONS.sample(stats.collection_count).label("collector", collector));
                samples.push(
                    GC_DURATION
                        .sample(seconds(stats.collection_time_in_millis))
                        .label("collector", collector),
                );
            }
        }
    }

    fn process_samples(process: &Process, samples: &mut Vec<MetricSample>) {
        samples.push(PROCESS_OPEN_FDS.sample(process.open_file_descriptors));
        samples.push(PROCESS_MAX_FDS.sample(process.max_file_descriptors));

        if let Some(cpu) = &process.cpu {
            samples.push(PROCESS_CPU_TOTAL.sample(seconds(cpu.total_in_millis)));
            samples.push(PROCESS_CPU_PERCENT.sample(cpu.percent));

            if let Some(load) = &cpu.load_average {
                for (window, value) in [
                    ("1m", load.one_minute),
                    ("5m", load.five_minutes),
                    ("15m", load.fifteen_minutes),
                ] {
                    if let Some(value) = value {
                        samples.push(PROCESS_LOAD_AVERAGE.sample(value).label("window", window));
                    }
                }
            }
        }

        if let Some(mem) = &process.mem {
            samples.push(PROCESS_VIRTUAL_MEM.sample(mem.total_virtual_in_bytes));
        }
    }

    fn pipeline_samples(name: &str, pipeline: &Pipeline, samples: &mut Vec<MetricSample>) {
        if let Some(events) = &pipeline.events {
            samples.push(PIPELINE_EVENTS_IN.sample(events.received).label("pipeline", name));
            samples.push(PIPELINE_EVENTS_FILTERED.sample(events.filtered).label("pipeline", name));
            samples.push(PIPELINE_EVENTS_OUT.sample(events.out).label("pipeline", name));
            if let Some(duration) = events.duration_in_millis {
                samples.push(
                    PIPELINE_EVENTS_DURATION
                        .sample(seconds(duration))
                        .label("pipeline", name),
                );
            }
        }

        let up = pipeline.reloads.as_ref().is_none_or(PipelineReloads::is_up);
        samples.push(PIPELINE_UP.sample(if up { 1.0 } else { 0.0 }).label("pipeline", name));

        if let Some(reloads) = &pipeline.reloads {
            samples.push(PIPELINE_RELOADS_SUCCESSES.sample(reloads.successes).label("pipeline", name));
            samples.push(PIPELINE_RELOADS_FAILURES.sample(reloads.failures).label("pipeline", name));
        }

        if let Some(queue) = &pipeline.queue {
            let queued = |family: MetricFamily, value: f64| {
                family
                    .sample(value)
                    .label("pipeline", name)
                    .label("queue_type", &queue.queue_type)
            };
            let capacity = queue.capacity.as_ref();

            if let Some(events) = queue.events.or(queue.events_count) {
                samples.push(queued(QUEUE_EVENTS, events));
            }
            if let Some(size) = queue
                .queue_size_in_bytes
                .or_else(|| capacity.and_then(|c| c.queue_size_in_bytes))
            {
                samples.push(queued(QUEUE_SIZE, size));
            }
            if let Some(max) = queue
                .max_queue_size_in_bytes
                .or_else(|| capacity.and_then(|c| c.max_queue_size_in_bytes))
            {
                samples.push(queued(QUEUE_MAX_SIZE, max));
            }
        }

        if let Some(dlq) = &pipeline.dead_letter_queue {
            samples.push(DEAD_LETTER_QUEUE_SIZE.sample(dlq.queue_size_in_bytes).label("pipeline", name));
        }

        if let Some(plugins) = &pipeline.plugins {
            for (plugin_type, list) in [
                ("input", &plugins.inputs),
                ("codec", &plugins.codecs),
                ("filter", &plugins.filters),
                ("output", &plugins.outputs),
            ] {
                for plugin in list {
                    Self::plugin_samples(name, plugin_type, plugin, samples);
                }
            }
        }
    }

    fn plugin_samples(pipeline: &str, plugin_type: &str, plugin: &Plugin, samples: &mut Vec<MetricSample>) {
        let labelled = |family: MetricFamily, value: f64| {
            family
                .sample(value)
                .label("pipeline", pipeline)
                .label("plugin_type", plugin_type)
                .label("plugin", plugin.name.as_deref().unwrap_or_default())
                .label("plugin_id", &plugin.id)
        };

        if let Some(events) = &plugin.events {
            let counters = [
                (PLUGIN_EVENTS_IN, events.received),
                (PLUGIN_EVENTS_OUT, events.out),
                (PLUGIN_DURATION, events.duration_in_millis.map(seconds)),
                (PLUGIN_QUEUE_PUSH_DURATION, events.queue_push_duration_in_millis.map(seconds)),
            ];
            for (family, value) in counters {
                if let Some(value) = value {
                    samples.push(labelled(family, value));
                }
            }
        }
        if let Some(matches) = plugin.matches {
            samples.push(labelled(PLUGIN_MATCHES, matches));
        }
        if let Some(failures) = plugin.failures {
            samples.push(labelled(PLUGIN_FAILURES, failures));
        }
    }
}

impl Collector for NodeStatsCollector {
    fn collect(&self, sink: MetricSink) -> Pin<Box<dyn Future<Output = Result<(), CollectError>> + Send + '_>> {
        Box::pin(async move {
            let stats: NodeStats = self.fetcher.fetch().await?;
            sink.emit_all(Self::samples(&stats));
            Ok(())
        })
    }
}
