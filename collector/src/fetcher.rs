//! Retrieval of JSON documents from the Logstash monitoring API.

use crate::error::{
    CollectError,
    FetchError,
};
use reqwest::{
    header::ACCEPT,
    Client as HttpClient,
};
use serde::de::DeserializeOwned;
use tracing::{
    debug,
    error,
};
use url::Url;

/// Build the URL of an API path below a base endpoint.
///
/// The path is appended to whatever path the base already has, so
/// `http://proxy/logstash` + `/_node` yields `http://proxy/logstash/_node`.
/// Only the syntax of `base` is checked, nothing is sent over the network.
/// Bases with a query or fragment are rejected since the path could not be
/// appended to them.
pub fn endpoint_url(base: &str, path: &str) -> Result<Url, CollectError> {
    let invalid = |reason: String| CollectError::InvalidEndpoint {
        endpoint: base.to_string(),
        reason,
    };

    let parsed = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".to_string()));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("URL must not carry a query or fragment".to_string()));
    }

    let joined = format!("{}{}", parsed.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| invalid(e.to_string()))
}

/// Fetches one endpoint and decodes its JSON body into a caller supplied shape.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: HttpClient,
    endpoint: Url,
}

impl RemoteFetcher {
    pub fn new(client: HttpClient, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue a single GET and decode the body as `T`.
    ///
    /// Transport failures are returned before any decoding is attempted. The
    /// response body is consumed or dropped on every path, which returns the
    /// connection to the client's pool.
    pub async fn fetch<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        let endpoint = &self.endpoint;
        debug!(%endpoint, "fetching");

        let response = self
            .client
            .get(endpoint.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| {
                error!(%endpoint, error = %source, "Cannot retrieve metrics");
                FetchError::Connection {
                    endpoint: endpoint.clone(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(%endpoint, %status, "Logstash answered with an error status");
            return Err(FetchError::Status {
                endpoint: endpoint.clone(),
                status,
            });
        }

        let body = response.bytes().await.map_err(|source| {
            error!(%endpoint, error = %source, "Cannot read response body");
            FetchError::Connection {
                endpoint: endpoint.clone(),
                source,
            }
        })?;

        serde_json::from_slice(&body).map_err(|source| {
            error!(%endpoint, error = %source, "Cannot parse Logstash response json");
            FetchError::Decode {
                endpoint: endpoint.clone(),
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::get,
        Router,
    };
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Shape {
        value: u64,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher(base: &str, path: &str) -> RemoteFetcher {
        RemoteFetcher::new(HttpClient::new(), endpoint_url(base, path).unwrap())
    }

    #[test]
    fn endpoint_url_appends_path() {
        let url = endpoint_url("http://localhost:9600", "/_node/stats").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9600/_node/stats");

        let url = endpoint_url("http://localhost:9600/", "/_node").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9600/_node");

        let url = endpoint_url("https://proxy.internal/logstash", "/_node").unwrap();
        assert_eq!(url.as_str(), "https://proxy.internal/logstash/_node");
    }

    #[test]
    fn endpoint_url_rejects_malformed_input() {
        for base in [
            "",
            "not a url",
            "localhost:9600",
            "http://",
            "mailto:ops@example.com",
            "http://localhost:9600?pretty=true",
            "http://localhost:9600/#stats",
        ] {
            let err = endpoint_url(base, "/_node").unwrap_err();
            assert!(
                matches!(err, CollectError::InvalidEndpoint { ref endpoint, .. } if endpoint == base),
                "{base:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn decodes_json_body() {
        let base = serve(Router::new().route("/doc", get(|| async { r#"{"value": 7, "ignored": true}"# }))).await;
        let shape: Shape = fetcher(&base, "/doc").fetch().await.unwrap();
        assert_eq!(shape, Shape { value: 7 });
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let base = serve(Router::new().route("/doc", get(|| async { "{\"value\": " }))).await;
        let err = fetcher(&base, "/doc").fetch::<Shape>().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn incompatible_json_is_a_decode_error() {
        let base = serve(Router::new().route("/doc", get(|| async { r#"{"value": "seven"}"# }))).await;
        let err = fetcher(&base, "/doc").fetch::<Shape>().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let base = serve(Router::new().route(
            "/doc",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, r#"{"value": 1}"#) }),
        ))
        .await;
        let err = fetcher(&base, "/doc").fetch::<Shape>().await.unwrap_err();
        match err {
            FetchError::Status { status, ref endpoint } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(endpoint.path(), "/doc");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        // Bind and immediately release a port so nothing listens on it.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(&format!("http://{addr}"), "/doc")
            .fetch::<Shape>()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Connection { .. }), "{err:?}");
        assert_eq!(err.endpoint().path(), "/doc");
    }
}
