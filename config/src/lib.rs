#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod web_config;

use app_config::{
    AppConfig,
    PROJECT_NAME,
};
pub use app_config::get_config_dir;
pub use args::{
    version,
    Args,
};
use color_eyre::Result;
use eyre::{
    bail,
    Context as _,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};
pub use web_config::{
    TlsServerConfig,
    WebConfig,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    pub logstash_endpoint: String,
    pub listen_address: String,
    pub telemetry_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_config_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_timeout: Option<String>,
    pub log_level: String,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Config {
    /// Layer the built-in defaults, `config.yaml` in the config directory, `--config.file`,
    /// `LOGSTASH_EXPORTER_*` environment variables and finally the command line.
    pub fn new(args: Args) -> Result<Self> {
        Self::load(args, &get_config_dir(), None)
    }

    fn load(args: Args, config_dir: &Path, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("config_dir", config_dir.display().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        if let Some(file) = &args.config_file {
            debug!(file = %file.display(), "Adding configuration file from args");
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        builder = builder.add_source(config::Environment::with_prefix(PROJECT_NAME).source(env));
        builder = builder.add_source(args);

        let cfg: Self = builder
            .build()
            .and_then(config::Config::try_deserialize::<Self>)
            .wrap_err("Failed to load configuration")?;

        Ok(cfg)
    }

    /// Reject settings the exporter cannot start with.
    ///
    /// The Logstash endpoint is not checked here; collectors reject it on registration.
    pub fn validate(&self) -> Result<()> {
        if !self.telemetry_path.starts_with('/') {
            bail!("Telemetry path {:?} must start with '/'", self.telemetry_path);
        }
        if self.telemetry_path == "/" || self.telemetry_path == "/healthz" {
            bail!("Telemetry path {:?} is reserved", self.telemetry_path);
        }
        self.listen_addr()?;
        self.collector_timeout()?;
        Ok(())
    }

    /// Listen address as a socket address. `:9198` is read as `0.0.0.0:9198`.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let address = if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };
        address
            .parse()
            .wrap_err_with(|| format!("Invalid listen address {:?}", self.listen_address))
    }

    pub fn collector_timeout(&self) -> Result<Option<Duration>> {
        let Some(timeout) = self.collector_timeout.as_deref() else {
            return Ok(None);
        };
        let timeout = humantime::parse_duration(timeout)
            .wrap_err_with(|| format!("Invalid collector timeout {timeout:?}"))?;
        if timeout.is_zero() {
            bail!("Collector timeout must be greater than zero");
        }
        Ok(Some(timeout))
    }

    pub fn web_config(&self) -> Result<Option<WebConfig>> {
        self.web_config_file
            .as_deref()
            .map(WebConfig::from_file)
            .transpose()
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }
}
