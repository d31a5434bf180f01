use super::ApiClient;
use crate::client::{Method, RequestBody};
use log::debug;
use objects_counter_common::endpoints;
use std::time::Duration;

/// 生存確認の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Online,
    /// サーバーは応答したがトークンが無効
    SessionExpired,
    Offline,
}

impl ServerStatus {
    pub fn is_online(&self) -> bool {
        !matches!(self, ServerStatus::Offline)
    }
}

impl ApiClient {
    /// サーバーの生存確認（失敗しない）
    pub async fn check_server_status(&self, timeout: Duration) -> ServerStatus {
        let response = self
            .request
            .send_request_with_timeout(endpoints::IS_ALIVE, RequestBody::Empty, Method::GET, timeout)
            .await;

        match response {
            Ok(response) if response.status == 200 => ServerStatus::Online,
            Ok(response) if response.status == 401 => ServerStatus::SessionExpired,
            Ok(response) => {
                debug!("Server answered is-alive with {}", response.status);
                ServerStatus::Offline
            }
            Err(e) => {
                debug!("Server unreachable: {}", e);
                ServerStatus::Offline
            }
        }
    }
}
