//! Tests for the HTTP client module

use super::*;
use crate::auth::Credentials;
use crate::error::Error;
use crate::types::BackoffType;
use pretty_assertions::assert_eq;
use reqwest::Method;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(format!("{}/api", server.uri()))
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(5),
            Duration::from_millis(50),
        )
        .no_rate_limit()
        .build()
}

async fn get(client: &HttpClient, url: &str) -> crate::Result<reqwest::Response> {
    client.request(Method::GET, url, RequestConfig::new()).await
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("billomat-client/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://acme.billomat.net/api")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .no_rate_limit()
        .build();

    assert_eq!(
        config.base_url.as_deref(),
        Some("https://acme.billomat.net/api")
    );
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.initial_backoff, Duration::from_millis(200));
    assert_eq!(config.max_backoff, Duration::from_secs(30));
    assert!(config.rate_limit.is_none());
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("per_page", "100")
        .query("page", "2")
        .header("X-Request-Id", "abc123")
        .json(serde_json::json!({"client": {"name": "Acme"}}));

    assert_eq!(
        config.query,
        vec![
            ("per_page".to_string(), "100".to_string()),
            ("page".to_string(), "2".to_string()),
        ]
    );
    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert!(config.body.is_some());
}

#[test]
fn test_build_url() {
    let config = HttpClientConfig::builder()
        .base_url("https://acme.billomat.net/api/")
        .no_rate_limit()
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(
        client.build_url("/invoices"),
        "https://acme.billomat.net/api/invoices"
    );
    assert_eq!(
        client.build_url("invoices/7/pdf"),
        "https://acme.billomat.net/api/invoices/7/pdf"
    );
    assert_eq!(client.build_url("http://other/x"), "http://other/x");
}

#[tokio::test]
async fn test_get_json_sends_json_and_auth_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/clients"))
        .and(header("Accept", "application/json"))
        .and(header("X-BillomatApiKey", "key-1"))
        .and(header("X-AppId", "app"))
        .and(header("X-AppSecret", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "clients": {"client": {"id": "1"}, "@total": "1"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_auth(
        test_config(&mock_server),
        Credentials::new("key-1").with_app("app", "secret"),
    )
    .unwrap();
    let data: serde_json::Value = client.get_json("/clients").await.unwrap();

    assert_eq!(data["clients"]["client"]["id"], "1");
}

#[tokio::test]
async fn test_with_auth_rejects_empty_key() {
    let mock_server = MockServer::start().await;
    let result = HttpClient::with_auth(test_config(&mock_server), Credentials::new(""));
    assert!(matches!(result, Err(Error::MissingConfigField { .. })));
}

#[tokio::test]
async fn test_query_params_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/invoices"))
        .and(query_param("status", "PAID"))
        .and(query_param("per_page", "250"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    let data: serde_json::Value = client
        .get_json_with_config(
            "/invoices",
            RequestConfig::new()
                .query("status", "PAID")
                .query_pairs(vec![
                    ("per_page".to_string(), "250".to_string()),
                    ("page".to_string(), "2".to_string()),
                ]),
        )
        .await
        .unwrap();

    assert_eq!(data, serde_json::json!({}));
}

#[tokio::test]
async fn test_send_json_post() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/clients"))
        .and(body_json(serde_json::json!({"client": {"name": "Acme"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "client": {"id": "99", "name": "Acme"}
        })))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    let created: serde_json::Value = client
        .send_json(
            Method::POST,
            "/clients",
            serde_json::json!({"client": {"name": "Acme"}}),
        )
        .await
        .unwrap();

    assert_eq!(created["client"]["id"], "99");
}

#[tokio::test]
async fn test_empty_body_decodes_as_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/invoices/5/complete"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    let value: serde_json::Value = client
        .send_json(
            Method::PUT,
            "/invoices/5/complete",
            serde_json::json!({"complete": {}}),
        )
        .await
        .unwrap();

    assert!(value.is_null());
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    let err = client
        .get_json::<serde_json::Value>("/clients")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::JsonParse(_)));
}

#[tokio::test]
async fn test_404_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/clients/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    let err = get(&client, "/clients/404").await.unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_on_500() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    let response = get(&client, "/flaky").await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_server_error_after_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.max_retries = 2;
    let client = HttpClient::with_config(config).unwrap();
    let err = get(&client, "/always-fail").await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
}

#[tokio::test]
async fn test_rate_limit_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    let response = get(&client, "/limited").await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limit_fail_handler() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    client.set_rate_limit_handler(Arc::new(FailOnRateLimit));
    let err = get(&client, "/limited").await.unwrap_err();

    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_seconds: 7
        }
    ));
}

struct CountingHandler {
    calls: AtomicU32,
}

impl RateLimitHandler for CountingHandler {
    fn on_rate_limited(&self, attempt: u32, _: u32, retry_after: Duration) -> RateLimitAction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(retry_after, Duration::from_secs(DEFAULT_RETRY_AFTER_SECS));
        if attempt == 0 {
            RateLimitAction::Retry(Duration::from_millis(1))
        } else {
            RateLimitAction::Fail
        }
    }
}

#[tokio::test]
async fn test_custom_rate_limit_handler() {
    let mock_server = MockServer::start().await;

    // No Retry-After header: the default is reported to the hook
    Mock::given(method("GET"))
        .and(path("/api/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&mock_server)
        .await;

    let handler = Arc::new(CountingHandler {
        calls: AtomicU32::new(0),
    });
    let mut client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    client.set_rate_limit_handler(handler.clone());

    let err = get(&client, "/limited").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_calculate_backoff_constant() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .no_rate_limit()
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(5), Duration::from_millis(100));
}

#[test]
fn test_calculate_backoff_linear() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(10),
        )
        .no_rate_limit()
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(300));
}

#[test]
fn test_calculate_backoff_exponential_capped() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .no_rate_limit()
        .build();

    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(client.calculate_backoff(10), Duration::from_millis(500));
    assert_eq!(client.calculate_backoff(40), Duration::from_millis(500));
}

#[test]
fn test_http_client_debug() {
    let client = HttpClient::with_config(HttpClientConfig::default()).unwrap();
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("HttpClient"));
    assert!(debug_str.contains("has_rate_limiter: true"));
}

#[tokio::test]
async fn test_with_rate_limiter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(format!("{}/api", mock_server.uri()))
        .rate_limit(RateLimiterConfig::new(100, 10))
        .build();

    let client = HttpClient::with_config(config).unwrap();
    assert!(format!("{client:?}").contains("has_rate_limiter: true"));

    for _ in 0..3 {
        let response = get(&client, "/data").await.unwrap();
        assert_eq!(response.status(), 200);
    }
}

#[tokio::test]
async fn test_delete_ignores_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/clients/3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::with_config(test_config(&mock_server)).unwrap();
    client.delete("/clients/3").await.unwrap();
}

#[tokio::test]
async fn test_retries_stop_at_zero() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/down"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.max_retries = 0;
    let client = HttpClient::with_config(config).unwrap();
    let err = get(&client, "/down").await.unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
