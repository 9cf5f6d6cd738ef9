mod support;

use std::time::Duration;
use support::{closed_port_url, serve_once, serve_silent};
use tokio_test::{assert_err, assert_ok};
use vedran_daemon::config::LoadBalancerConfig;
use vedran_daemon::domain::errors::ReportError;
use vedran_daemon::domain::metrics::NodeMetrics;
use vedran_daemon::domain::ports::LoadBalancerClient;
use vedran_daemon::infrastructure::lb::{AUTH_HEADER, HttpLoadBalancerClient};

fn full_snapshot() -> NodeMetrics {
    NodeMetrics::new(Some(19), Some(432933), Some(432640), Some(0)).unwrap()
}

fn client_for(base_url: &str, token: Option<&str>) -> HttpLoadBalancerClient {
    let mut config = LoadBalancerConfig::new(base_url).unwrap();
    config.token = token.map(str::to_string);
    config.request_timeout = Duration::from_secs(5);
    HttpLoadBalancerClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_send_puts_snapshot_and_returns_status() {
    let (base_url, server) = serve_once(200, r#"{"status":"ok"}"#).await;
    let client = client_for(&base_url, Some("node-token"));

    let ack = assert_ok!(client.send(&full_snapshot()).await);
    assert_eq!(ack.status, 200);
    assert_eq!(ack.body, r#"{"status":"ok"}"#);

    let request = server.await.unwrap();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/api/v1/nodes/metrics");
    assert_eq!(request.header(AUTH_HEADER), Some("node-token"));
    assert!(
        request
            .header("content-type")
            .unwrap_or_default()
            .starts_with("application/json")
    );

    let received: NodeMetrics = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(received, full_snapshot());
    assert_eq!(received.peer_count(), Some(19));
    assert_eq!(received.best_block_height(), Some(432933));
    assert_eq!(received.finalized_block_height(), Some(432640));
    assert_eq!(received.ready_transaction_count(), Some(0));
}

#[tokio::test]
async fn test_send_without_token_omits_auth_header() {
    let (base_url, server) = serve_once(200, r#"{"status":"ok"}"#).await;
    let client = client_for(&base_url, None);

    assert_ok!(client.send(&full_snapshot()).await);
    let request = server.await.unwrap();
    assert_eq!(request.header(AUTH_HEADER), None);
}

#[tokio::test]
async fn test_partial_snapshot_keeps_field_presence() {
    let (base_url, server) = serve_once(200, r#"{"status":"ok"}"#).await;
    let client = client_for(&base_url, None);
    let partial = NodeMetrics::new(Some(0), None, None, Some(7)).unwrap();

    assert_ok!(client.send(&partial).await);

    let request = server.await.unwrap();
    let raw: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let object = raw.as_object().unwrap();
    assert_eq!(object.get("peer_count"), Some(&serde_json::json!(0)));
    assert_eq!(object.get("ready_transaction_count"), Some(&serde_json::json!(7)));
    assert!(!object.contains_key("best_block_height"));
    assert!(!object.contains_key("finalized_block_height"));
}

#[tokio::test]
async fn test_not_found_is_remote_rejected() {
    let (base_url, server) = serve_once(404, "Not Found").await;
    let client = client_for(&base_url, None);

    let err = assert_err!(client.send(&full_snapshot()).await);
    match err {
        ReportError::RemoteRejected { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("expected RemoteRejected, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_remote_rejected() {
    let (base_url, _server) = serve_once(503, r#"{"error":"maintenance"}"#).await;
    let client = client_for(&base_url, None);

    let err = assert_err!(client.send(&full_snapshot()).await);
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let base_url = closed_port_url().await;
    let client = client_for(&base_url, None);

    let err = assert_err!(client.send(&full_snapshot()).await);
    assert!(matches!(err, ReportError::TransportError(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_unresponsive_load_balancer_times_out() {
    let (base_url, _server) = serve_silent().await;
    let mut config = LoadBalancerConfig::new(&base_url).unwrap();
    config.request_timeout = Duration::from_millis(500);
    let client = HttpLoadBalancerClient::new(&config).unwrap();

    let started = std::time::Instant::now();
    let err = assert_err!(client.send(&full_snapshot()).await);
    assert!(matches!(err, ReportError::TransportError(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}
