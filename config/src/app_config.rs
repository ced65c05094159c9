use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env,
    path::PathBuf,
};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub config_dir: PathBuf,
}

/// Prefix of every environment variable the exporter reads.
pub(crate) const PROJECT_NAME: &str = "LOGSTASH_EXPORTER";

lazy_static::lazy_static! {
    static ref CONFIG_FOLDER: Option<PathBuf> = env::var(format!("{PROJECT_NAME}_CONFIG"))
        .ok()
        .map(PathBuf::from);
}

/// Directory holding the optional `config.yaml`.
///
/// `LOGSTASH_EXPORTER_CONFIG` wins over the platform config directory.
pub fn get_config_dir() -> PathBuf {
    config_dir_from(CONFIG_FOLDER.clone())
}

fn config_dir_from(config_folder: Option<PathBuf>) -> PathBuf {
    if let Some(s) = config_folder {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "logstash", "logstash-exporter")
}
