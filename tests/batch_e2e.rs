//! Batch exchanges: ordering, notification elision and per-element errors.

mod common;

use hyper::StatusCode;
use serde_json::json;

use common::{TestServer, body_json, body_text, client, send_body, send_json};

#[tokio::test]
async fn test_batch_replies_exclude_notifications() {
    let server = TestServer::start().await;
    let batch = json!([
        {"jsonrpc": "2.0", "method": "calculate", "params": {"operation": "add", "a": 1, "b": 2}, "id": 1},
        {"jsonrpc": "2.0", "method": "stream_data", "params": {"count": 3}},
        {"jsonrpc": "2.0", "method": "get_weather", "id": "w"},
        {"jsonrpc": "2.0", "method": "calculate", "params": {"operation": "subtract", "a": 9, "b": 4}, "id": 2},
    ]);
    let response = send_json(&client(), server.post(), &batch).await;

    assert_eq!(response.status(), StatusCode::OK);
    let replies = body_json(response).await;
    let replies = replies.as_array().expect("array reply");
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["id"], 1);
    assert_eq!(replies[0]["result"]["result"], 3);
    assert_eq!(replies[1]["id"], "w");
    assert_eq!(replies[1]["result"]["location"], "Seoul");
    assert_eq!(replies[2]["id"], 2);
    assert_eq!(replies[2]["result"]["result"], 5);
}

#[tokio::test]
async fn test_batch_errors_do_not_short_circuit() {
    let server = TestServer::start().await;
    let batch = json!([
        {"jsonrpc": "2.0", "method": "nonexistent_tool", "id": 1},
        {"jsonrpc": "1.0", "method": "calculate", "id": 2},
        42,
        {"jsonrpc": "2.0", "method": "calculate", "params": {"operation": "divide", "a": 1, "b": 0}, "id": 3},
        {"jsonrpc": "2.0", "method": "calculate", "params": {"operation": "multiply", "a": 6, "b": 7}, "id": 4},
    ]);
    let response = send_json(&client(), server.post(), &batch).await;

    assert_eq!(response.status(), StatusCode::OK);
    let replies = body_json(response).await;
    let replies = replies.as_array().expect("array reply");
    assert_eq!(replies.len(), 5);
    assert_eq!(replies[0]["error"]["code"], -32601);
    assert_eq!(replies[1]["error"]["code"], -32600);
    assert_eq!(replies[1]["id"], 2);
    assert_eq!(replies[2]["error"]["code"], -32600);
    assert!(replies[2].get("id").is_none());
    assert_eq!(replies[3]["error"]["code"], -32602);
    assert_eq!(replies[4]["result"]["result"], 42);
}

#[tokio::test]
async fn test_empty_batch_is_single_invalid_request() {
    let server = TestServer::start().await;
    let response = send_body(&client(), server.post(), "[]").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body.is_object());
    assert_eq!(body["error"]["code"], -32600);
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn test_notification_only_batch_is_accepted() {
    let server = TestServer::start().await;
    let batch = json!([
        {"jsonrpc": "2.0", "method": "stream_data"},
        {"jsonrpc": "2.0", "method": "nonexistent_tool"},
    ]);
    let response = send_json(&client(), server.post(), &batch).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_batch_elements_ignore_stream_flag() {
    let server = TestServer::start().await;
    let batch = json!([
        {"jsonrpc": "2.0", "method": "stream_data", "params": {"count": 2, "stream": true}, "id": 1},
    ]);
    let response = send_json(&client(), server.post(), &batch).await;

    assert_eq!(response.status(), StatusCode::OK);
    let replies = body_json(response).await;
    assert_eq!(replies[0]["result"]["message"], "Generated 2 items");
}
