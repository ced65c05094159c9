use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Failure of a single [`RemoteFetcher::fetch`](crate::RemoteFetcher::fetch) call.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The endpoint could not be reached or the body could not be read.
    #[error("cannot retrieve metrics from {endpoint}: {source}")]
    Connection {
        endpoint: Url,
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-2xx status.
    #[error("{endpoint} answered with {status}")]
    Status { endpoint: Url, status: StatusCode },
    /// The body is not JSON or does not match the expected shape.
    #[error("cannot parse response json from {endpoint}: {source}")]
    Decode {
        endpoint: Url,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn endpoint(&self) -> &Url {
        match self {
            FetchError::Connection { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => endpoint,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("collector did not finish within {0:?}")]
    Timeout(Duration),
    #[error("collector panicked: {0}")]
    Panicked(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a collector named {0:?} is already registered")]
    DuplicateCollector(String),
}
