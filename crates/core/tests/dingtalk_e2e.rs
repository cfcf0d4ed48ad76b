//! End-to-end tests for DingTalk failure alerts.
//!
//! A `wiremock` server stands in for the robot endpoint, so these tests
//! exercise the real signer, HTTP client and dispatcher with no external
//! network I/O.

use std::sync::Arc;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use flowalert_core::config::AppConfig;
use flowalert_core::errors::{NotificationError, SigningError};
use flowalert_core::models::{ExecutableFlow, ExecutableNode, Status};
use flowalert_core::notify::signer::sign;
use flowalert_core::{AlertDispatcher, Alerter, DingTalkAlerter};

// ===========================================================================
// Helpers
// ===========================================================================

fn config_for(server: &MockServer, token: Option<&str>, secret: Option<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.dingtalk.webhook_url = format!("{}/robot/send", server.uri());
    config.dingtalk.token = token.map(str::to_owned);
    config.dingtalk.secret = secret.map(str::to_owned);
    config.dingtalk.timeout_secs = 5;
    config
}

fn etl_daily() -> ExecutableFlow {
    ExecutableFlow {
        flow_id: "etl_daily".into(),
        execution_id: 42,
        project_name: "warehouse".into(),
        start_time: 1_700_000_000_000,
        end_time: 1_700_000_060_000,
        status: Status::Failed,
        nodes: vec![
            ExecutableNode::new("extract", Status::Succeeded),
            ExecutableNode::new("load_table", Status::Failed),
            ExecutableNode::new("publish", Status::Cancelled),
        ],
    }
}

fn ok_reply() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(r#"{"errcode":0,"errmsg":"ok"}"#)
}

fn body_json(request: &Request) -> serde_json::Value {
    serde_json::from_slice(&request.body).expect("request body is JSON")
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_failure_report_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .and(query_param("access_token", "tok-42"))
        .and(header("content-type", "application/json"))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, Some("tok-42"), Some("SECtest"));
    let alerter = DingTalkAlerter::new(&config).unwrap();
    alerter
        .alert_on_error(&etl_daily(), &["disk full".to_string()])
        .await
        .expect("alert should be delivered");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    // The signature must match the timestamp the sender chose.
    let query: Vec<(String, String)> = request
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let timestamp: i64 = query
        .iter()
        .find(|(k, _)| k == "timestamp")
        .map(|(_, v)| v.parse().unwrap())
        .expect("timestamp parameter");
    let sent_sign = query
        .iter()
        .find(|(k, _)| k == "sign")
        .map(|(_, v)| v.clone())
        .expect("sign parameter");
    let expected = urlencoding::decode(&sign("SECtest", timestamp).unwrap())
        .unwrap()
        .into_owned();
    assert_eq!(sent_sign, expected);

    let body = body_json(request);
    assert_eq!(body["msgtype"], "markdown");
    assert_eq!(
        body["markdown"]["title"],
        "Flow etl_daily has encountered a failure on azkaban"
    );

    let text = body["markdown"]["text"].as_str().unwrap();
    assert!(text.starts_with(
        "# Execution 42 of flow etl_daily of project warehouse has encountered a failure on azkaban \n"
    ));
    let (_, reasons) = text.split_once("## Reason \n").unwrap();
    let lines: Vec<&str> = reasons.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "- [Failed job 'load_table' Link](https://localhost:8443/executor?execid=42&job=load_table) "
    );
    assert_eq!(lines[1], "- disk full");
}

#[tokio::test]
async fn test_no_token_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply())
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server, None, Some("SECtest"));
    let alerter = DingTalkAlerter::new(&config).unwrap();
    alerter.alert_on_error(&etl_daily(), &[]).await.unwrap();

    let dispatcher = AlertDispatcher::from_config(&config).unwrap();
    assert!(dispatcher.is_empty());
    let outcome = dispatcher.on_error(&etl_daily(), &[]).await;
    assert_eq!(outcome.failed, 0);

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_secret_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_reply())
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server, Some("tok"), None);
    let alerter = DingTalkAlerter::new(&config).unwrap();
    let result = alerter.alert_on_error(&etl_daily(), &[]).await;
    assert!(matches!(
        result,
        Err(NotificationError::Signing(SigningError::MissingSecret))
    ));
}

#[tokio::test]
async fn test_unsigned_robot_when_signature_not_required() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/robot/send"))
        .and(query_param("access_token", "tok"))
        .respond_with(ok_reply())
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server, Some("tok"), None);
    config.dingtalk.require_signature = false;
    let alerter = DingTalkAlerter::new(&config).unwrap();
    alerter.alert_on_error(&etl_daily(), &[]).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query_pairs().all(|(k, _)| k != "sign"));
}

#[tokio::test]
async fn test_provider_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"errcode":310000,"errmsg":"sign not match"}"#),
        )
        .mount(&server)
        .await;

    let config = config_for(&server, Some("tok"), Some("wrong"));
    let alerter = DingTalkAlerter::new(&config).unwrap();
    let result = alerter.alert_on_error(&etl_daily(), &[]).await;
    assert!(matches!(
        result,
        Err(NotificationError::ProviderError { status: 200, .. })
    ));
}

#[tokio::test]
async fn test_dispatcher_swallows_transport_failure() {
    let mut config = AppConfig::default();
    config.dingtalk.token = Some("tok".into());
    config.dingtalk.secret = Some("sec".into());
    config.dingtalk.timeout_secs = 2;
    // Nothing listens on the discard port.
    config.dingtalk.webhook_url = "http://127.0.0.1:9/robot/send".into();

    let dispatcher = AlertDispatcher::from_config(&config).unwrap();
    assert_eq!(dispatcher.len(), 1);

    let outcome = dispatcher.on_error(&etl_daily(), &["disk full".into()]).await;
    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed, 1);
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let config = config_for(&server, Some("tok"), Some("sec"));
    let alerter: Arc<dyn Alerter> = Arc::new(DingTalkAlerter::new(&config).unwrap());
    let result = alerter.alert_on_error(&etl_daily(), &[]).await;
    match result {
        Err(NotificationError::ProviderError { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "unavailable");
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}
