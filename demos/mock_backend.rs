//! A stand-in for the club/mission backend, for trying the proxy locally.
//!
//! ```text
//! cargo run --example mock_backend
//! cargo run -- --upstream http://127.0.0.1:8081/api
//! curl -i http://127.0.0.1:8080/api/proxy/teams/me -H 'authorization: Bearer demo'
//! ```

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] == "demo" {
        (
            StatusCode::OK,
            Json(json!({ "access_token": "demo", "token_type": "bearer" })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect login id or password" })),
        )
    }
}

async fn my_teams(headers: HeaderMap) -> impl IntoResponse {
    match headers.get(header::AUTHORIZATION) {
        Some(token) if token == "Bearer demo" => (
            StatusCode::OK,
            Json(json!([{ "id": 1, "name": "Photo Club", "role": "owner" }])),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Not authenticated" })),
        ),
    }
}

// Old submission endpoint, moved. The proxy replays the POST with its body.
async fn legacy_submit(Path(id): Path<i64>) -> Redirect {
    Redirect::temporary(&format!("/api/missions/{id}/submit"))
}

async fn submit(Path(id): Path<i64>, body: Bytes) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({ "mission_id": id, "received_bytes": body.len(), "status": "pending" })),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = Router::new()
        .route("/api/users/login", post(login))
        .route("/api/teams/me", get(my_teams))
        .route("/api/missions/{id}/upload", post(legacy_submit))
        .route("/api/missions/{id}/submit", post(submit));

    let addr = SocketAddr::from(([127, 0, 0, 1], 8081));
    println!("Mock backend listening on http://{addr}/api");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
