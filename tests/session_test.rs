//! セッション（Cookie）とコントローラーの結合テスト

mod common;

use common::MockServer;
use objects_counter::config::Config;
use objects_counter::controller::AppController;
use objects_counter::error::ClientError;
use objects_counter::storage::{FileStore, COOKIES_FILE_NAME, LOCAL_STORAGE_FILE_NAME};
use objects_counter_common::{KeyValueStore, Screen};
use std::path::Path;
use tempfile::tempdir;

fn config_for(server: &MockServer) -> Config {
    Config {
        server_address: server.address().to_string(),
        ..Config::default()
    }
}

fn logged_in_cookies(dir: &Path) -> FileStore {
    let mut cookies = FileStore::load(&dir.join(COOKIES_FILE_NAME));
    cookies.set("username", "alice");
    cookies.set("userId", "5");
    cookies.set("userToken", "t0k3n");
    cookies.save().unwrap();
    cookies
}

#[tokio::test]
async fn test_login_stores_session_cookies() {
    let dir = tempdir().expect("Failed to create temp dir");
    let server = MockServer::start(vec![(200, r#"{"token": "abc", "user_id": 5, "username": "alice"}"#)]).await;

    let mut controller = AppController::open(config_for(&server), dir.path()).unwrap();
    assert!(!controller.context().user.is_logged_in());

    controller.login("alice", "Secret1!").await.unwrap();
    assert_eq!(controller.context().user.username(), "alice");
    assert_eq!(controller.context().user.user_id(), 5);
    assert_eq!(controller.api().request().token(), Some("abc"));
    controller.persist().unwrap();
    server.finish().await;

    let cookies = FileStore::load(&dir.path().join(COOKIES_FILE_NAME));
    assert_eq!(cookies.get("username").as_deref(), Some("alice"));
    assert_eq!(cookies.get("userToken").as_deref(), Some("abc"));

    // 次回起動時に復元される
    let restored = AppController::open(Config::default(), dir.path()).unwrap();
    assert!(restored.context().user.is_logged_in());
    assert_eq!(restored.api().request().token(), Some("abc"));
}

/// 401 でログアウトし、Cookieからトークンが消える
#[tokio::test]
async fn test_unauthorized_response_logs_out() {
    let dir = tempdir().expect("Failed to create temp dir");
    let server = MockServer::start(vec![(401, "Unauthorized")]).await;

    let cookies = logged_in_cookies(dir.path());
    let local = FileStore::load(&dir.path().join(LOCAL_STORAGE_FILE_NAME));
    let mut controller = AppController::new(config_for(&server), cookies, local).unwrap();
    assert!(controller.context().user.is_logged_in());

    let result = controller.browse_results().await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));
    assert_eq!(controller.context().view.current(), Screen::MainMenu);

    let requests = server.finish().await;
    assert_eq!(requests[0].header("authorization"), Some("t0k3n"));

    assert_eq!(controller.context().user.username(), "Guest");
    assert_eq!(controller.context().user.token(), "");
    assert_eq!(controller.api().request().token(), None);

    controller.persist().unwrap();
    let cookies = FileStore::load(&dir.path().join(COOKIES_FILE_NAME));
    assert_eq!(cookies.get("userToken"), None);
}

/// 生存確認で 401 が返ってもサーバーはオンライン扱い
#[tokio::test]
async fn test_status_session_expired_logs_out() {
    let dir = tempdir().expect("Failed to create temp dir");
    let server = MockServer::start(vec![(401, "Unauthorized")]).await;

    let cookies = logged_in_cookies(dir.path());
    let local = FileStore::load(&dir.path().join(LOCAL_STORAGE_FILE_NAME));
    let mut controller = AppController::new(config_for(&server), cookies, local).unwrap();

    let status = controller.check_server_status().await;
    assert!(status.is_online());
    assert!(!controller.context().user.is_logged_in());
    server.finish().await;
}

#[tokio::test]
async fn test_invalid_credentials_are_not_sent() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut controller = AppController::open(Config::default(), dir.path()).unwrap();

    let result = controller.login("al", "password").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert!(!controller.context().user.is_logged_in());
}
