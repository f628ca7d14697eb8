//! # HTTP Tests for tessera-api
//!
//! Drives the Job API through the full router with the mock backend:
//! submit/poll, admission control, status lookup, sync proving,
//! verification and client messages.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tessera_api::{app, AppState, Orchestrator, OrchestratorSettings, RetryPolicy};
use tessera_core::{
    BlockId, CanonicalVote, HexBytes, PartSetHeader, ProveRequest, SimpleValidator,
    ValidatorSetCommit, VoteType,
};
use tessera_zkp::MockBackend;

fn commit(powers: &[u64]) -> ValidatorSetCommit {
    ValidatorSetCommit {
        validators: powers
            .iter()
            .enumerate()
            .map(|(i, p)| SimpleValidator {
                public_key: HexBytes(vec![i as u8; 32]),
                voting_power: *p,
            })
            .collect(),
        signatures: vec![HexBytes(vec![9; 64])],
        bitmap: HexBytes(vec![0b0000_0001]),
    }
}

fn request(height: u64) -> ProveRequest {
    ProveRequest {
        vote: CanonicalVote {
            vote_type: VoteType::Precommit,
            height,
            round: 0,
            block_id: BlockId {
                hash: HexBytes(vec![3; 32]),
                part_set_header: PartSetHeader {
                    total: 1,
                    hash: HexBytes(vec![4; 32]),
                },
            },
            chain_id: "tessera-devnet".to_string(),
        },
        trusted_commit: commit(&[10, 20]),
        untrusted_commit: commit(&[30, 40]),
    }
}

/// Helper: build the test app around a mock backend.
fn test_app(backend: MockBackend, max_jobs: usize) -> axum::Router {
    let orchestrator = Orchestrator::new(
        std::sync::Arc::new(backend),
        OrchestratorSettings {
            max_jobs,
            job_deadline: None,
        },
    );
    app(AppState::new(
        orchestrator,
        RetryPolicy {
            attempts: 100,
            backoff: Duration::from_millis(10),
        },
    ))
}

fn post_json(uri: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

async fn poll_until_done(app: &axum::Router, req: &ProveRequest) -> Value {
    for _ in 0..200 {
        let (status, body) = send(app, post_json("/v1/proofs", req)).await;
        if status == StatusCode::OK {
            return body;
        }
        assert_eq!(status, StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never completed");
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let app = test_app(MockBackend::new(), 2);
    assert_eq!(
        send(&app, get("/health/liveness")).await,
        (StatusCode::OK, Value::String("ok".into()))
    );
    assert_eq!(
        send(&app, get("/health/readiness")).await,
        (StatusCode::OK, Value::String("ready".into()))
    );
}

// -- Submit / Poll ------------------------------------------------------------

#[tokio::test]
async fn test_submit_then_poll_reaches_done() {
    let app = test_app(MockBackend::with_latency(Duration::from_millis(50)), 2);
    let req = request(1);

    let (status, first) = send(&app, post_json("/v1/proofs", &req)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(first["status"], "pending");
    let fingerprint = first["fingerprint"].as_str().unwrap().to_string();
    assert_eq!(fingerprint, req.fingerprint().unwrap().to_hex());

    let done = poll_until_done(&app, &req).await;
    assert_eq!(done["status"], "done");
    assert_eq!(done["fingerprint"], fingerprint);
    assert_eq!(done["response"]["public_inputs"].as_array().unwrap().len(), 5);

    let (status, looked_up) = send(&app, get(&format!("/v1/proofs/{fingerprint}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(looked_up, done);
}

#[tokio::test]
async fn test_busy_when_slots_exhausted() {
    let app = test_app(MockBackend::with_latency(Duration::from_millis(300)), 1);

    let (status, _) = send(&app, post_json("/v1/proofs", &request(1))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let response = app
        .clone()
        .oneshot(post_json("/v1/proofs", &request(2)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body: Value =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert_eq!(body["error"]["code"], "BUSY");

    // A rejected submission leaves nothing behind.
    let fp = request(2).fingerprint().unwrap();
    let (status, _) = send(&app, get(&format!("/v1/proofs/{fp}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The same submission succeeds once the slot frees up.
    poll_until_done(&app, &request(1)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (status, _) = send(&app, post_json("/v1/proofs", &request(2))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_invalid_request_is_422() {
    let app = test_app(MockBackend::new(), 2);
    let mut req = request(1);
    req.untrusted_commit.bitmap = HexBytes(vec![0xff]);
    let (status, body) = send(&app, post_json("/v1/proofs", &req)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = test_app(MockBackend::new(), 2);
    let (status, body) = send(&app, post_json("/v1/proofs", &json!({"vote": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_status_lookup_errors() {
    let app = test_app(MockBackend::new(), 2);
    let (status, _) = send(&app, get("/v1/proofs/not-hex")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send(&app, get(&format!("/v1/proofs/{}", "00".repeat(32)))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// -- ProveSync / Verify -------------------------------------------------------

#[tokio::test]
async fn test_prove_sync_then_verify() {
    let app = test_app(MockBackend::with_latency(Duration::from_millis(20)), 2);
    let (status, proof) = send(&app, post_json("/v1/proofs/sync", &request(7))).await;
    assert_eq!(status, StatusCode::OK);

    let verify = json!({
        "proof": proof["proof"],
        "public_inputs": proof["public_inputs"],
    });
    let (status, body) = send(&app, post_json("/v1/verify", &verify)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"valid": true}));

    let mut inputs = proof["public_inputs"].as_array().unwrap().clone();
    inputs.swap(3, 4);
    let tampered = json!({"proof": proof["proof"], "public_inputs": inputs});
    let (_, body) = send(&app, post_json("/v1/verify", &tampered)).await;
    assert_eq!(body, json!({"valid": false}));

    let short = json!({"proof": proof["proof"], "public_inputs": []});
    let (status, _) = send(&app, post_json("/v1/verify", &short)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_verifying_key_and_stats() {
    let app = test_app(MockBackend::new(), 3);
    let (status, body) = send(&app, get("/v1/verifying-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "mock");
    assert!(!body["verifying_key"].as_str().unwrap().is_empty());

    let (status, stats) = send(&app, get("/v1/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["max_slots"], 3);
    assert_eq!(stats["jobs"]["pending"], 0);
    assert_eq!(stats["backend"]["public_inputs"], 5);
}

// -- Client Messages ----------------------------------------------------------

#[tokio::test]
async fn test_client_messages() {
    let app = test_app(MockBackend::new(), 2);
    let (_, header) = send(&app, post_json("/v1/proofs/sync", &request(11))).await;

    let mut message = header.clone();
    message["type"] = json!("header");
    let (status, body) = send(&app, post_json("/v1/client-messages", &message)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"accepted": true}));

    let mut swapped = message.clone();
    swapped["trusted_validator_set_root"] = header["untrusted_validator_set_root"].clone();
    let (status, _) = send(&app, post_json("/v1/client-messages", &swapped)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let misbehaviour = json!({
        "type": "misbehaviour",
        "header_a": header,
        "header_b": header,
    });
    let (status, body) = send(&app, post_json("/v1/client-messages", &misbehaviour)).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["code"], "NOT_IMPLEMENTED");
}
