//! HTTP API tests driven through the router without binding a socket

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use fairseed::api::build_app;
use fairseed::FairseedConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    build_app(&FairseedConfig::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, value)
}

async fn open_session(app: &Router) -> String {
    let (status, _, body) = send(app, "POST", "/sessions", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, headers, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Running");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_create_session_publishes_commitment() {
    let app = app();
    let (status, _, body) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({ "client_seed": "player-chosen" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_seed"], "player-chosen");
    assert_eq!(body["nonce"], 0);
    assert_eq!(body["hashed_server_seed"].as_str().unwrap().len(), 64);
    assert!(body.get("server_seed").is_none());

    let id = body["session_id"].as_str().unwrap();
    let (status, _, fetched) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["hashed_server_seed"], body["hashed_server_seed"]);
}

#[tokio::test]
async fn test_invalid_client_seed_rejected() {
    let app = app();
    let (status, _, body) = send(&app, "POST", "/sessions", Some(json!({ "client_seed": "a:b" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/sessions/nope/dice")
        .header("content-type", "application/json")
        .header("x-request-id", "trace-me")
        .body(Body::from(
            json!({ "bet_amount": 1.0, "target": 50, "direction": "under" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "trace-me");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["request_id"], "trace-me");
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_dice_rejection_keeps_nonce() {
    let app = app();
    let id = open_session(&app).await;
    let uri = format!("/sessions/{}/dice", id);

    let (status, _, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "bet_amount": 1.0, "target": 99, "direction": "under" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "target");

    let (_, _, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["nonce"], 0);

    let (status, _, result) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "bet_amount": 1.0, "target": 50, "direction": "over" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["game_type"], "dice");
    assert_eq!(result["proof"]["nonce"], 0);

    let (_, _, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["nonce"], 1);
}

#[tokio::test]
async fn test_plinko_multi_ball() {
    let app = app();
    let id = open_session(&app).await;

    let (status, _, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/plinko", id),
        Some(json!({ "bet_amount": 1.0, "rows": 12, "risk": "low", "balls": 3 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    let paths = body["paths"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(paths.len(), 3);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result["proof"]["nonce"], i as u64);
        assert_eq!(paths[i].as_array().unwrap().len(), 12);
    }
}

#[tokio::test]
async fn test_blackjack_round_blocks_rotation() {
    let app = app();
    let id = open_session(&app).await;

    // Keep dealing until a round stays open
    let mut open = false;
    for _ in 0..20 {
        let (status, _, body) = send(
            &app,
            "POST",
            &format!("/sessions/{}/blackjack", id),
            Some(json!({ "bet_amount": 2.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if body.get("result").is_none() {
            assert_eq!(body["dealer_cards"].as_array().unwrap().len(), 1);
            open = true;
            break;
        }
    }
    assert!(open);

    let (status, _, body) = send(&app, "POST", &format!("/sessions/{}/rotate", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, _, before) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(before["round_in_progress"], true);

    let (status, _, after) = send(&app, "POST", &format!("/sessions/{}/blackjack/abandon", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["round_in_progress"], false);
    assert_eq!(after["nonce"], before["nonce"]);

    let (status, _, _) = send(
        &app,
        "POST",
        &format!("/sessions/{}/blackjack/action", id),
        Some(json!({ "action": "hit" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(&app, "POST", &format!("/sessions/{}/rotate", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_blackjack_played_to_completion() {
    let app = app();
    let id = open_session(&app).await;

    let (status, _, mut body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/blackjack", id),
        Some(json!({ "bet_amount": 4.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    while body.get("result").is_none() {
        let action = if body["stage"] == "insurance" { "decline_insurance" } else { "stand" };
        let (status, _, next) = send(
            &app,
            "POST",
            &format!("/sessions/{}/blackjack/action", id),
            Some(json!({ "action": action })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body = next;
    }

    assert_eq!(body["stage"], "complete");
    assert_eq!(body["dealer_cards"], body["result"]["game_data"]["settlement"]["dealer_cards"]);
    assert_eq!(body["result"]["proof"]["nonce"], 0);
}

#[tokio::test]
async fn test_rotate_then_verify() {
    let app = app();
    let id = open_session(&app).await;

    let (_, _, result) = send(
        &app,
        "POST",
        &format!("/sessions/{}/dice", id),
        Some(json!({ "bet_amount": 3.0, "target": 30, "direction": "under" })),
    )
    .await;

    let (status, _, rotated) = send(
        &app,
        "POST",
        &format!("/sessions/{}/rotate", id),
        Some(json!({ "client_seed": "next-round" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rotated["revealed"]["hashed_server_seed"], result["proof"]["hashed_server_seed"]);
    assert_eq!(rotated["session"]["client_seed"], "next-round");
    assert_eq!(rotated["session"]["nonce"], 0);

    let server_seed = rotated["revealed"]["server_seed"].clone();
    let (status, _, report) = send(
        &app,
        "POST",
        "/verify",
        Some(json!({ "server_seed": server_seed, "result": result })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["commitment_valid"], true);
    assert_eq!(report["outcome_matches"], true);

    let (status, _, revealed) = send(&app, "GET", &format!("/sessions/{}/revealed", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revealed.as_array().unwrap().len(), 1);
}

async fn open_blackjack_round(app: &Router, id: &str) -> Value {
    for _ in 0..20 {
        let (status, _, body) = send(
            app,
            "POST",
            &format!("/sessions/{}/blackjack", id),
            Some(json!({ "bet_amount": 2.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if body.get("result").is_none() {
            return body;
        }
    }
    panic!("no round stayed open");
}

#[tokio::test]
async fn test_close_session_reveals_and_forgets() {
    let app = app();
    let id = open_session(&app).await;
    let uri = format!("/sessions/{}", id);

    let (_, _, result) = send(
        &app,
        "POST",
        &format!("/sessions/{}/dice", id),
        Some(json!({ "bet_amount": 1.0, "target": 50, "direction": "under" })),
    )
    .await;

    let (status, _, closed) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["session_id"], id.as_str());
    let revealed = closed["revealed"].as_array().unwrap();
    assert_eq!(revealed.len(), 1);
    assert_eq!(revealed[0]["hashed_server_seed"], result["proof"]["hashed_server_seed"]);

    let (status, _, report) = send(
        &app,
        "POST",
        "/verify",
        Some(json!({ "server_seed": revealed[0]["server_seed"], "result": result })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["outcome_matches"], true);
    assert_eq!(report["commitment_valid"], true);

    let (status, _, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, _, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions"], 0);
}

#[tokio::test]
async fn test_close_refused_mid_round() {
    let app = app();
    let id = open_session(&app).await;
    open_blackjack_round(&app, &id).await;

    let (status, _, body) = send(&app, "DELETE", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _, _) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_open_round_can_be_fetched() {
    let app = app();
    let id = open_session(&app).await;
    let uri = format!("/sessions/{}/blackjack", id);

    let (status, _, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let dealt = open_blackjack_round(&app, &id).await;
    let (status, _, fetched) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, dealt);
    assert_eq!(fetched["dealer_cards"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let app = app();
    let id = open_session(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/sessions/{}/plinko", id))
        .header("content-type", "application/json")
        .header("x-request-id", "bad-body")
        .body(Body::from(
            json!({ "bet_amount": 1.0, "rows": 12, "risk": "extreme" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["request_id"], "bad-body");
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["details"]["reason"].is_string());

    let (status, _, body) = send(
        &app,
        "POST",
        &format!("/sessions/{}/dice", id),
        Some(json!({ "bet_amount": 1.0, "target": 300, "direction": "under" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (_, _, session) = send(&app, "GET", &format!("/sessions/{}", id), None).await;
    assert_eq!(session["nonce"], 0);
}
