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
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::{
    future::Future,
    pin::Pin,
};

const NODE: MetricFamily = MetricFamily::gauge("logstash_info_node", "Logstash node identity, always 1.");
const OS: MetricFamily = MetricFamily::gauge("logstash_info_os", "Operating system of the node, always 1.");
const OS_PROCESSORS: MetricFamily =
    MetricFamily::gauge("logstash_info_os_available_processors", "Processors available to the node.");
const JVM: MetricFamily = MetricFamily::gauge("logstash_info_jvm", "JVM running the node, always 1.");
const JVM_HEAP_MAX: MetricFamily =
    MetricFamily::gauge("logstash_info_jvm_heap_max_bytes", "Maximum heap configured for the JVM.");
const PIPELINE_WORKERS: MetricFamily =
    MetricFamily::gauge("logstash_info_pipeline_workers", "Default number of pipeline workers.");
const PIPELINE_BATCH_SIZE: MetricFamily =
    MetricFamily::gauge("logstash_info_pipeline_batch_size", "Default pipeline batch size.");
const PIPELINE_BATCH_DELAY: MetricFamily =
    MetricFamily::gauge("logstash_info_pipeline_batch_delay", "Default pipeline batch delay in milliseconds.");

/// Subset of `GET /_node` the exporter reads.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub name: String,
    pub host: String,
    pub version: String,
    pub http_address: Option<String>,
    pub status: Option<String>,
    pub pipeline: Option<PipelineSettings>,
    pub os: Option<Os>,
    pub jvm: Option<JvmInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    pub workers: f64,
    pub batch_size: f64,
    pub batch_delay: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Os {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub available_processors: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JvmInfo {
    pub version: String,
    pub vm_name: String,
    pub vm_vendor: String,
    pub mem: Option<JvmInfoMem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JvmInfoMem {
    pub heap_max_in_bytes: f64,
}

/// Collects static node, OS and JVM information from `/_node`
#[derive(Debug, Clone)]
pub struct NodeInfoCollector {
    fetcher: RemoteFetcher,
}

impl NodeInfoCollector {
    pub const PATH: &'static str = "/_node";

    pub fn new(base_endpoint: &str, http_client: HttpClient) -> Result<Self, CollectError> {
        let endpoint = endpoint_url(base_endpoint, Self::PATH)?;
        Ok(Self {
            fetcher: RemoteFetcher::new(http_client, endpoint),
        })
    }

    pub fn samples(info: &NodeInfo) -> Vec<MetricSample> {
        let mut samples = vec![NODE
            .sample(1.0)
            .label("id", &info.id)
            .label("name", &info.name)
            .label("host", &info.host)
            .label("version", &info.version)
            .label("http_address", info.http_address.as_deref().unwrap_or_default())
            .label("status", info.status.as_deref().unwrap_or_default())];

        if let Some(os) = &info.os {
            samples.push(
                OS.sample(1.0)
                    .label("name", &os.name)
                    .label("arch", &os.arch)
                    .label("version", &os.version),
            );
            samples.push(OS_PROCESSORS.sample(os.available_processors));
        }

        if let Some(jvm) = &info.jvm {
            samples.push(
                JVM.sample(1.0)
                    .label("name", &jvm.vm_name)
                    .label("version", &jvm.version)
                    .label("vendor", &jvm.vm_vendor),
            );
            if let Some(mem) = &jvm.mem {
                samples.push(JVM_HEAP_MAX.sample(mem.heap_max_in_bytes));
            }
        }

        if let Some(pipeline) = &info.pipeline {
            samples.push(PIPELINE_WORKERS.sample(pipeline.workers));
            samples.push(PIPELINE_BATCH_SIZE.sample(pipeline.batch_size));
            samples.push(PIPELINE_BATCH_DELAY.sample(pipeline.batch_delay));
        }

        samples
    }
}

impl Collector for NodeInfoCollector {
    fn collect(&self, sink: MetricSink) -> Pin<Box<dyn Future<Output = Result<(), CollectError>> + Send + '_>> {
        Box::pin(async move {
            let info: NodeInfo = self.fetcher.fetch().await?;
            sink.emit_all(Self::samples(&info));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NODE_INFO: &str = r#"{
        "host": "ls-1",
        "version": "8.13.0",
        "http_address": "127.0.0.1:9600",
        "id": "4b3d2c1a",
        "name": "ls-1",
        "ephemeral_id": "e1",
        "status": "green",
        "snapshot": false,
        "pipeline": {"workers": 8, "batch_size": 125, "batch_delay": 50},
        "os": {"name": "Linux", "arch": "amd64", "version": "6.1.0", "available_processors": 8},
        "jvm": {
            "pid": 1,
            "version": "17.0.10",
            "vm_version": "17.0.10",
            "vm_vendor": "Eclipse Adoptium",
            "vm_name": "OpenJDK 64-Bit Server VM",
            "start_time_in_millis": 1714550400000,
            "mem": {"heap_init_in_bytes": 1073741824, "heap_max_in_bytes": 1073741824, "non_heap_init_in_bytes": 7667712, "non_heap_max_in_bytes": 0},
            "gc_collectors": ["G1 Young Generation", "G1 Old Generation"]
        }
    }"#;

    #[test]
    fn maps_every_section() {
        let info: NodeInfo = serde_json::from_str(NODE_INFO).unwrap();
        let samples = NodeInfoCollector::samples(&info);

        let names: Vec<_> = samples.iter().map(MetricSample::name).collect();
        assert_eq!(
            names,
            vec![
                "logstash_info_node",
                "logstash_info_os",
                "logstash_info_os_available_processors",
                "logstash_info_jvm",
                "logstash_info_jvm_heap_max_bytes",
                "logstash_info_pipeline_workers",
                "logstash_info_pipeline_batch_size",
                "logstash_info_pipeline_batch_delay",
            ]
        );

        let node = &samples[0];
        assert_eq!(node.value(), 1.0);
        assert_eq!(node.label_value("version"), Some("8.13.0"));
        assert_eq!(node.label_value("status"), Some("green"));
        assert_eq!(samples[3].label_value("vendor"), Some("Eclipse Adoptium"));
        assert_eq!(samples[5].value(), 8.0);
    }

    #[test]
    fn identity_only_document_yields_node_sample() {
        let info: NodeInfo =
            serde_json::from_str(r#"{"id": "a", "name": "b", "host": "c", "version": "7.17.0"}"#).unwrap();
        let samples = NodeInfoCollector::samples(&info);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label_value("http_address"), Some(""));
    }

    #[test]
    fn missing_identity_is_a_decode_error() {
        assert!(serde_json::from_str::<NodeInfo>(r#"{"id": "a", "name": "b", "host": "c"}"#).is_err());
    }
}
