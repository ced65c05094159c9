use color_eyre::Result;
use eyre::Context as _;
use serde::Deserialize;
use std::path::{
    Path,
    PathBuf,
};

/// Subset of the Prometheus exporter-toolkit web configuration file.
///
/// Only `tls_server_config` is honoured; every other key is accepted and ignored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct WebConfig {
    #[serde(default)]
    pub tls_server_config: Option<TlsServerConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TlsServerConfig {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl WebConfig {
    /// Read a web config file. Relative certificate paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read web config {}", path.display()))?;
        let mut web_config =
            Self::parse(&content).wrap_err_with(|| format!("Failed to parse web config {}", path.display()))?;

        if let (Some(tls), Some(base)) = (web_config.tls_server_config.as_mut(), path.parent()) {
            tls.cert_file = base.join(&tls.cert_file);
            tls.key_file = base.join(&tls.key_file);
        }
        Ok(web_config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(content)?)
    }

    pub fn tls(&self) -> Option<&TlsServerConfig> {
        self.tls_server_config.as_ref()
    }
}
