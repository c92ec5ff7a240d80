//! reqwest transport and full runs against local mockito targets.

use mockito::Matcher;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use http_loadtest::loadtest::client::HttpTransport;
use http_loadtest::loadtest::config::{HttpMethod, LoadTestConfig, RequestBody};
use http_loadtest::loadtest::engine::LoadRunner;
use http_loadtest::loadtest::sampler::{sample, SampleOutcome, Transport};

fn body(value: serde_json::Value) -> RequestBody {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

#[tokio::test]
async fn get_success_is_sampled() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/ping")
        .with_status(200)
        .with_body("pong")
        .expect(1)
        .create_async()
        .await;

    let config = LoadTestConfig::new(format!("{}/ping", server.url()), 1, 1);
    let transport = HttpTransport::from_config(&config).unwrap();
    let outcome = sample(&transport, &config).await;

    assert!(outcome.is_success(), "got {outcome:?}");
    mock.assert_async().await;
}

#[tokio::test]
async fn server_error_is_failure_with_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/broken")
        .with_status(503)
        .create_async()
        .await;

    let config = LoadTestConfig::new(format!("{}/broken", server.url()), 1, 1);
    let transport = HttpTransport::from_config(&config).unwrap();

    match sample(&transport, &config).await {
        SampleOutcome::Failure { cause } => {
            assert_eq!(cause.status(), Some(503));
            assert!(cause.to_string().contains("503"), "got: {cause}");
            assert_eq!(cause.error_category(), "http");
        },
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn post_sends_json_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/items")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"name": "widget", "quantity": 3})))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let transport = HttpTransport::new(None).unwrap();
    let status = transport
        .send(
            HttpMethod::Post,
            &format!("{}/items", server.url()),
            Some(&body(json!({"name": "widget", "quantity": 3}))),
        )
        .await
        .unwrap();

    assert_eq!(status, 201);
    mock.assert_async().await;
}

#[tokio::test]
async fn get_ignores_configured_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_body(Matcher::Exact(String::new()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = LoadTestConfig::new(format!("{}/", server.url()), 1, 1)
        .with_body(body(json!({"ignored": true})));
    let transport = HttpTransport::from_config(&config).unwrap();

    assert!(sample(&transport, &config).await.is_success());
    mock.assert_async().await;
}

#[tokio::test]
async fn slow_response_times_out() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/slow")
        .with_status(200)
        .with_chunked_body(|writer| {
            std::thread::sleep(Duration::from_millis(500));
            writer.write_all(b"late")
        })
        .create_async()
        .await;

    let config = LoadTestConfig::new(format!("{}/slow", server.url()), 1, 1)
        .with_timeout(Duration::from_millis(100));
    let transport = HttpTransport::from_config(&config).unwrap();

    let outcome = sample(&transport, &config).await;
    let cause = outcome.failure().expect("request should time out");
    assert_eq!(cause.error_category(), "timeout", "got: {cause}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_run_hits_target_exactly_total_times() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/orders")
        .match_body(Matcher::Json(json!({"sku": "A-1"})))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .expect(20)
        .create_async()
        .await;

    let config = LoadTestConfig::new(format!("{}/orders", server.url()), 20, 4)
        .with_method(HttpMethod::Post)
        .with_body(body(json!({"sku": "A-1"})));
    let runner = LoadRunner::new(config).unwrap();
    let result = runner.run().await;

    assert_eq!(result.error_count, 0);
    assert_eq!(result.success_count(), 20);
    assert!(result.average_latency > 0.0);
    assert!(result.percentiles.p50 <= result.percentiles.p99);
    mock.assert_async().await;
}

#[tokio::test]
async fn full_run_against_refused_port_counts_every_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = LoadTestConfig::new(format!("http://{addr}/"), 5, 2);
    let runner = LoadRunner::new(config).unwrap();
    let result = runner.run().await;

    assert_eq!(result.error_count, 5);
    assert_eq!(result.average_latency, 0.0);
    assert_eq!(result.error_categories.get("connection"), Some(&5));
}

#[tokio::test]
async fn runner_accepts_shared_http_transport() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("GET", "/").with_status(204).create_async().await;

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(None).unwrap());
    let config = LoadTestConfig::new(format!("{}/", server.url()), 3, 3);
    let result = LoadRunner::with_transport(config, transport)
        .unwrap()
        .run()
        .await;

    assert_eq!(result.success_count(), 3);
}
