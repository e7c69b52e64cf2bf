//! Upstream failures surface as the fixed 502 envelope.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use bobyak_proxy::http::PROXY_CONNECTION_FAILED;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

mod common;

use common::{client, closed_addr, proxy_config, reply, start_programmable_backend, start_proxy};

async fn assert_connection_failed(res: reqwest::Response) {
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "detail": PROXY_CONNECTION_FAILED }));
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let proxy = start_proxy(proxy_config(closed_addr().await)).await;

    let res = client()
        .get(proxy.url("/api/proxy/teams/me"))
        .send()
        .await
        .unwrap();
    assert_connection_failed(res).await;
}

#[tokio::test]
async fn test_unreachable_upstream_with_body() {
    let proxy = start_proxy(proxy_config(closed_addr().await)).await;

    let res = client()
        .post(proxy.url("/api/proxy/missions/7/submit?group_id=3"))
        .body(vec![7u8; 2048])
        .send()
        .await
        .unwrap();
    assert_connection_failed(res).await;
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    // Accepts and reads, but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    let mut config = proxy_config(backend);
    config.timeouts.upstream_secs = 1;
    let proxy = start_proxy(config).await;

    let started = Instant::now();
    let res = client()
        .get(proxy.url("/api/proxy/leaderboard/1"))
        .send()
        .await
        .unwrap();
    assert_connection_failed(res).await;
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_failed_redirect_target_is_bad_gateway() {
    let dead = closed_addr().await;
    let (backend, recorder) = start_programmable_backend(move |_| {
        axum::response::Response::builder()
            .status(307)
            .header("location", format!("http://{dead}/missions/7"))
            .body(axum::body::Body::empty())
            .unwrap()
    })
    .await;
    let proxy = start_proxy(proxy_config(backend)).await;

    let res = client()
        .post(proxy.url("/api/proxy/missions/7/submit"))
        .body("photo")
        .send()
        .await
        .unwrap();
    assert_connection_failed(res).await;
    assert_eq!(recorder.all().len(), 1);
}

#[tokio::test]
async fn test_oversized_body_rejected_before_upstream() {
    let (backend, recorder) = start_programmable_backend(|_| reply(200, "ok")).await;
    let mut config = proxy_config(backend);
    config.limits.max_body_bytes = 1024;
    let proxy = start_proxy(config).await;

    let res = client()
        .post(proxy.url("/api/proxy/missions/7/submit"))
        .body(vec![0u8; 4096])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(recorder.all().is_empty());
}

#[tokio::test]
async fn test_slow_redirect_chain_times_out_as_bad_gateway() {
    // First hop answers late with a redirect, the second never answers.
    let app = Router::new()
        .route(
            "/api/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                Redirect::temporary("/api/hang")
            }),
        )
        .route(
            "/api/hang",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = proxy_config(backend);
    config.timeouts.upstream_secs = 2;
    config.timeouts.request_secs = 3;
    bobyak_proxy::config::validate_config(&config).unwrap();
    let proxy = start_proxy(config).await;

    let started = Instant::now();
    let res = client()
        .get(proxy.url("/api/proxy/slow"))
        .send()
        .await
        .unwrap();
    assert_connection_failed(res).await;
    assert!(started.elapsed() < Duration::from_secs(3));
}
