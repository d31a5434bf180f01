//! リクエストクライアントとAPIラッパーのテスト
//!
//! ローカルの簡易サーバーに対して実際にHTTPで送受信する

mod common;

use common::{unused_address, MockServer};
use objects_counter::api::{ApiClient, ServerStatus};
use objects_counter::client::{Method, RequestBody, RequestClient};
use objects_counter::error::ClientError;
use objects_counter_common::Payload;
use serde_json::json;
use std::time::Duration;

fn api(uri: &str, token: Option<&str>) -> ApiClient {
    let mut request = RequestClient::new(uri, false).expect("クライアント作成失敗");
    request.set_token(token.map(str::to_string));
    ApiClient::new(request)
}

/// トークンは Authorization ヘッダーにそのまま載る
#[tokio::test]
async fn test_token_sent_as_raw_authorization_header() {
    let server = MockServer::start(vec![(200, r#"[{"id": 1}]"#)]).await;
    let mut client = RequestClient::new(server.uri(), false).unwrap();
    client.set_token(Some("t0k3n".into()));

    let response = client
        .send_request("/api/results/", RequestBody::Empty, Method::GET)
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.data, Payload::Json(json!([{"id": 1}])));

    let requests = server.finish().await;
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/api/results/");
    assert_eq!(requests[0].header("authorization"), Some("t0k3n"));
}

/// 失敗ステータスでも本文を返す
#[tokio::test]
async fn test_failure_status_keeps_text_body() {
    let server = MockServer::start(vec![(404, "Result not found")]).await;
    let client = RequestClient::new(server.uri(), false).unwrap();

    let response = client
        .send_request("/api/results/3", RequestBody::Empty, Method::GET)
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.data, Payload::Text("Result not found".into()));

    let requests = server.finish().await;
    assert_eq!(requests[0].header("authorization"), None);
}

#[tokio::test]
async fn test_network_error_when_nothing_listens() {
    let address = unused_address().await;
    let client = RequestClient::new(format!("http://{}", address), false).unwrap();

    let result = client
        .send_request("/api/is-alive", RequestBody::Empty, Method::GET)
        .await;
    assert!(matches!(result, Err(ClientError::Network { .. })));
}

#[tokio::test]
async fn test_login_sends_credentials() {
    let server = MockServer::start(vec![(200, r#"{"token": "abc", "user_id": 5, "username": "alice"}"#)]).await;
    let api = api(&server.uri(), None);

    let data = api.login_user("alice", "Secret1!").await.unwrap();
    assert_eq!(data.token, "abc");
    assert_eq!(data.id, 5);

    let requests = server.finish().await;
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/users/login");
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body, json!({"username": "alice", "password": "Secret1!"}));
}

#[tokio::test]
async fn test_login_not_found_is_invalid_credentials() {
    let server = MockServer::start(vec![(404, "User not found")]).await;
    let api = api(&server.uri(), None);

    let result = api.login_user("alice", "Secret1!").await;
    assert!(matches!(result, Err(ClientError::InvalidCredentials)));
    server.finish().await;
}

#[tokio::test]
async fn test_register_rejected() {
    let server = MockServer::start(vec![(400, "User already exists")]).await;
    let api = api(&server.uri(), None);

    let result = api.register_user("alice", "Secret1!").await;
    assert!(matches!(result, Err(ClientError::RegistrationRejected)));
    server.finish().await;
}

/// 入力チェックに通らなければ送信しない
#[tokio::test]
async fn test_register_invalid_input_sends_nothing() {
    let api = api(&format!("http://{}", unused_address().await), None);

    let result = api.register_user("al", "short").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
}

/// 新しい分類名はテキスト本文で送る
#[tokio::test]
async fn test_rename_classification_sends_text_body() {
    let server = MockServer::start(vec![(200, "2")]).await;
    let api = api(&server.uri(), Some("t0k3n"));

    let count = api.rename_result_classification(3, "cat", "dog").await.unwrap();
    assert_eq!(count, 2);

    let requests = server.finish().await;
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/results/3/classification/cat/rename");
    assert_eq!(requests[0].header("content-type"), Some("text/plain"));
    assert_eq!(requests[0].body, "dog");
}

#[tokio::test]
async fn test_unauthorized_status() {
    let server = MockServer::start(vec![(401, "Unauthorized")]).await;
    let api = api(&server.uri(), Some("expired"));

    let result = api.delete_result(3).await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));

    let requests = server.finish().await;
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].path, "/api/results/3");
}

#[tokio::test]
async fn test_failure_message_includes_server_text() {
    let server = MockServer::start(vec![(500, "database is locked")]).await;
    let api = api(&server.uri(), Some("t0k3n"));

    let err = api.delete_dataset(9).await.unwrap_err();
    match err {
        ClientError::RequestFailed { status, message } => {
            assert_eq!(status, 500);
            assert!(message.ends_with("database is locked"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    server.finish().await;
}

#[tokio::test]
async fn test_server_status() {
    let timeout = Duration::from_secs(5);
    let server = MockServer::start(vec![(200, "OK"), (401, "Unauthorized"), (503, "")]).await;
    let api = api(&server.uri(), Some("t0k3n"));

    assert_eq!(api.check_server_status(timeout).await, ServerStatus::Online);
    assert_eq!(api.check_server_status(timeout).await, ServerStatus::SessionExpired);
    assert_eq!(api.check_server_status(timeout).await, ServerStatus::Offline);

    let requests = server.finish().await;
    assert!(requests.iter().all(|r| r.path == "/api/is-alive"));

    let offline = api_for_unused().await;
    assert_eq!(offline.check_server_status(timeout).await, ServerStatus::Offline);
}

async fn api_for_unused() -> ApiClient {
    api(&format!("http://{}", unused_address().await), None)
}
