//! Failure injection tests for upstream and route errors.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use route_gateway::config::parse_config;

mod common;

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let dead = common::closed_port().await;
    let mut config = common::test_config();
    config.gateway.route_shorthands = vec![format!("dead=http://{},Path=/dead", dead)];
    let gateway = common::start_gateway(config).await;

    let res = common::client().get(gateway.url("/dead")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let backend = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "too late".to_string())
    })
    .await;

    let mut config = common::test_config();
    config.timeouts.response_secs = 1;
    config.gateway.route_shorthands = vec![format!("slow=http://{},Path=/slow", backend)];
    let gateway = common::start_gateway(config).await;

    let res = common::client().get(gateway.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn unknown_service_is_unavailable() {
    let mut config = common::test_config();
    config.gateway.route_shorthands = vec!["ghost=lb://ghost,Path=/ghost/**".to_string()];
    let gateway = common::start_gateway(config).await;

    let res = common::client().get(gateway.url("/ghost/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn upstream_errors_are_passed_through() {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let backend = common::start_programmable_backend(move |_| {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            (500, "boom".to_string())
        }
    })
    .await;

    let mut config = common::test_config();
    config.gateway.route_shorthands = vec![format!("flaky=http://{},Path=/flaky", backend)];
    let gateway = common::start_gateway(config).await;

    let res = common::client().get(gateway.url("/flaky")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "boom");
    // no retries
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn broken_route_does_not_take_down_the_others() {
    let backend = common::start_mock_backend("healthy").await;
    let config = parse_config(&format!(
        r#"
        [observability]
        metrics_enabled = false

        [[gateway.routes]]
        id = "broken"
        uri = "http://{backend}"
        predicates = ["Path=/broken", "NoSuchPredicate=1"]

        [[gateway.routes]]
        id = "healthy"
        uri = "http://{backend}"
        predicates = ["Path=/healthy"]
        "#
    ))
    .unwrap();
    let gateway = common::start_gateway(config).await;

    let ids: Vec<_> = gateway
        .gateway
        .routes()
        .snapshot()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(ids, vec!["healthy"]);

    let http = common::client();
    assert_eq!(
        http.get(gateway.url("/broken")).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        http.get(gateway.url("/healthy")).send().await.unwrap().status(),
        StatusCode::OK
    );

    gateway.shutdown.trigger();
}
