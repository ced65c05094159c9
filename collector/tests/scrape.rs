use axum::{
    http::StatusCode,
    routing::get,
    Router,
};
use logstash_exporter_collector::{
    MetricSample,
    Orchestrator,
    ScrapeResult,
};
use pretty_assertions::assert_eq;
use reqwest::Client as HttpClient;
use std::net::SocketAddr;

const UPTIME_ONLY: &str = r#"{"jvm": {"uptime_in_millis": 12345}}"#;

const NODE_INFO: &str = r#"{
    "id": "4b3d2c1a",
    "name": "ls-1",
    "host": "ls-1",
    "version": "8.13.0",
    "status": "green"
}"#;

/// Serve a fake Logstash monitoring API on an ephemeral port.
async fn fake_logstash(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn unused_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn outcomes(orchestrator_report: &logstash_exporter_collector::ScrapeReport) -> Vec<(&str, ScrapeResult)> {
    orchestrator_report
        .outcomes
        .iter()
        .map(|o| (o.collector.as_str(), o.result))
        .collect()
}

fn find<'a>(samples: &'a [MetricSample], name: &str) -> Vec<&'a MetricSample> {
    samples.iter().filter(|s| s.name() == name).collect()
}

#[tokio::test]
async fn failing_info_endpoint_does_not_hide_node_stats() {
    let base = fake_logstash(
        Router::new()
            .route("/_node/stats", get(|| async { UPTIME_ONLY }))
            .route("/_node", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") })),
    )
    .await;

    let orchestrator = Orchestrator::for_logstash(&base, HttpClient::new(), None);
    let report = orchestrator.scrape().await;

    assert_eq!(
        outcomes(&report),
        vec![("info", ScrapeResult::Error), ("node", ScrapeResult::Success)]
    );

    let uptime = find(&report.samples, "logstash_node_jvm_uptime_seconds");
    assert_eq!(uptime.len(), 1);
    assert_eq!(uptime[0].value(), 12.345);
    assert!(report.samples.iter().all(|s| !s.name().starts_with("logstash_info_")));
}

#[tokio::test]
async fn both_endpoints_answer() {
    let base = fake_logstash(
        Router::new()
            .route("/_node/stats", get(|| async { UPTIME_ONLY }))
            .route("/_node", get(|| async { NODE_INFO })),
    )
    .await;

    let samples = Orchestrator::for_logstash(&base, HttpClient::new(), None)
        .collect()
        .await;

    let node = find(&samples, "logstash_info_node");
    assert_eq!(node.len(), 1);
    assert_eq!(node[0].label_value("version"), Some("8.13.0"));

    let durations: Vec<_> = find(&samples, "logstash_exporter_scrape_duration_seconds")
        .into_iter()
        .map(|s| (s.label_value("collector").unwrap(), s.label_value("result").unwrap()))
        .collect();
    assert_eq!(durations, vec![("info", "success"), ("node", "success")]);
}

#[tokio::test]
async fn unreachable_logstash_still_reports_outcomes() {
    let addr = unused_address().await;
    let orchestrator = Orchestrator::for_logstash(&format!("http://{addr}"), HttpClient::new(), None);

    let report = orchestrator.scrape().await;
    assert!(report.samples.is_empty());
    assert_eq!(
        outcomes(&report),
        vec![("info", ScrapeResult::Error), ("node", ScrapeResult::Error)]
    );
}

#[tokio::test]
async fn unparsable_stats_are_an_error_outcome() {
    let base = fake_logstash(
        Router::new()
            .route("/_node/stats", get(|| async { r#"{"process": {}}"# }))
            .route("/_node", get(|| async { NODE_INFO })),
    )
    .await;

    let report = Orchestrator::for_logstash(&base, HttpClient::new(), None)
        .scrape()
        .await;
    assert_eq!(
        outcomes(&report),
        vec![("info", ScrapeResult::Success), ("node", ScrapeResult::Error)]
    );
    assert!(report.samples.iter().all(|s| !s.name().starts_with("logstash_node_")));
}

#[tokio::test]
async fn repeated_scrapes_yield_the_same_series() {
    let base = fake_logstash(
        Router::new()
            .route("/_node/stats", get(|| async { UPTIME_ONLY }))
            .route("/_node", get(|| async { NODE_INFO })),
    )
    .await;
    let orchestrator = Orchestrator::for_logstash(&base, HttpClient::new(), None);

    let series = |samples: Vec<MetricSample>| -> Vec<(String, Vec<(String, String)>)> {
        let mut series: Vec<_> = samples
            .iter()
            .filter(|s| s.name() != "logstash_exporter_scrape_duration_seconds")
            .map(|s| {
                (
                    s.name().to_string(),
                    s.labels().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                )
            })
            .collect();
        series.sort();
        series
    };

    let first = series(orchestrator.collect().await);
    let second = series(orchestrator.collect().await);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
