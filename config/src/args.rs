use clap::Parser;
use std::path::PathBuf;

/// Prometheus exporter for the Logstash monitoring API
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Base URL of the Logstash monitoring API.
    #[arg(long = "logstash.endpoint", value_name = "URL")]
    pub logstash_endpoint: Option<String>,

    /// Address to listen on for telemetry, e.g. `0.0.0.0:9198` or `:9198`.
    #[arg(long = "web.listen-address", value_name = "ADDRESS")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", value_name = "PATH")]
    pub telemetry_path: Option<String>,

    /// Web configuration file enabling TLS.
    #[arg(long = "web.config", value_name = "FILE")]
    pub web_config_file: Option<PathBuf>,

    /// Upper bound for a single collector run, e.g. `10s`. Unbounded when unset.
    #[arg(long = "collector.timeout", value_name = "DURATION")]
    pub collector_timeout: Option<String>,

    /// Default log filter, e.g. `debug` or `info,logstash_exporter_collector=debug`.
    #[arg(long = "log.level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Additional configuration file, layered above the one in the config directory.
    #[arg(long = "config.file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(endpoint) = &self.logstash_endpoint {
                cache.insert("logstash_endpoint".to_string(), endpoint.clone().into());
            }
            if let Some(address) = &self.listen_address {
                cache.insert("listen_address".to_string(), address.clone().into());
            }
            if let Some(path) = &self.telemetry_path {
                cache.insert("telemetry_path".to_string(), path.clone().into());
            }
            if let Some(file) = &self.web_config_file {
                cache.insert("web_config_file".to_string(), file.display().to_string().into());
            }
            if let Some(timeout) = &self.collector_timeout {
                cache.insert("collector_timeout".to_string(), timeout.clone().into());
            }
            if let Some(level) = &self.log_level {
                cache.insert("log_level".to_string(), level.clone().into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}",
        env!("CARGO_PKG_VERSION")
    )
}
