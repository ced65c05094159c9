use crate::{
    error::AppError,
    exposition,
};
use axum::{
    extract::State,
    http::{
        header,
        StatusCode,
        Uri,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use logstash_exporter_collector::Orchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub telemetry_path: Arc<str>,
}

pub fn create_router(orchestrator: Arc<Orchestrator>, telemetry_path: &str) -> Router {
    let state = AppState {
        orchestrator,
        telemetry_path: telemetry_path.into(),
    };

    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route(telemetry_path, get(metrics));
    if telemetry_path != "/" {
        router = router.route("/", get(redirect_to_metrics));
    }

    router.fallback(not_found).with_state(state)
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let samples = state.orchestrator.collect().await;
    debug!(samples = samples.len(), "scrape finished");
    ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], exposition::render(&samples))
}

async fn redirect_to_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, state.telemetry_path.to_string())],
    )
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::Request,
    };
    use logstash_exporter_collector::{
        CollectError,
        Collector,
        MetricFamily,
        MetricSink,
    };
    use pretty_assertions::assert_eq;
    use std::{
        future::Future,
        pin::Pin,
    };
    use tower::ServiceExt;

    const UPTIME: MetricFamily = MetricFamily::gauge("logstash_node_jvm_uptime_seconds", "Time since start.");

    struct Uptime;

    impl Collector for Uptime {
        fn collect(&self, sink: MetricSink) -> Pin<Box<dyn Future<Output = Result<(), CollectError>> + Send + '_>> {
            Box::pin(async move {
                sink.emit(UPTIME.sample(12.345));
                Ok(())
            })
        }
    }

    struct Broken;

    impl Collector for Broken {
        fn collect(&self, _sink: MetricSink) -> Pin<Box<dyn Future<Output = Result<(), CollectError>> + Send + '_>> {
            Box::pin(async move { Err(CollectError::Timeout(std::time::Duration::from_secs(1))) })
        }
    }

    fn router(telemetry_path: &str) -> Router {
        let mut orchestrator = Orchestrator::new();
        orchestrator.register("node", Arc::new(Uptime)).unwrap();
        orchestrator.register("info", Arc::new(Broken)).unwrap();
        create_router(Arc::new(orchestrator), telemetry_path)
    }

    async fn request(router: Router, uri: &str) -> axum::response::Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(req).await.unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn metrics_are_rendered_with_outcomes() {
        let resp = request(router("/metrics"), "/metrics").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );

        let body = body_text(resp).await;
        assert!(body.contains("logstash_node_jvm_uptime_seconds 12.345\n"));
        assert!(body.contains("# TYPE logstash_exporter_scrape_duration_seconds gauge\n"));
        assert!(body.contains("logstash_exporter_scrape_duration_seconds{collector=\"info\",result=\"error\"}"));
        assert!(body.contains("logstash_exporter_scrape_duration_seconds{collector=\"node\",result=\"success\"}"));
        assert!(body.contains("logstash_exporter_build_info{version="));
    }

    #[tokio::test]
    async fn root_redirects_permanently_to_telemetry_path() {
        let resp = request(router("/stats"), "/").await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[header::LOCATION], "/stats");
    }

    #[tokio::test]
    async fn custom_telemetry_path_replaces_default() {
        let resp = request(router("/stats"), "/stats").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = request(router("/stats"), "/metrics").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(resp).await, "No route for /metrics");
    }

    #[tokio::test]
    async fn healthz_answers() {
        let resp = request(router("/metrics"), "/healthz").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "OK");
    }
}
