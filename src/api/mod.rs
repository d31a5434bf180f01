//! バックエンドAPIの型付きラッパー
//!
//! エンドポイントごとにURIを組み立て、ステータスで分岐し、
//! レスポンスを common のパーサーで型に変換する。
//!
//! ステータスの扱い:
//! - 401 → `ClientError::Unauthorized`（呼び出し側でログアウト）
//! - その他の失敗 → `ClientError::RequestFailed`（操作ごとのメッセージ付き）

mod comparisons;
mod datasets;
mod images;
mod results;
mod status;
mod users;

use crate::client::{RawResponse, RequestClient};
use crate::error::{ClientError, Result};
use objects_counter_common::{Error as CommonError, Payload};
use serde_json::Value;

pub use status::ServerStatus;
pub use users::validate_credentials;

#[derive(Debug, Clone)]
pub struct ApiClient {
    request: RequestClient,
}

impl ApiClient {
    pub fn new(request: RequestClient) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &RequestClient {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut RequestClient {
        &mut self.request
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.request.set_token(token);
    }
}

/// 成功ステータスなら本文を返す
fn ensure_success(response: RawResponse, failure: impl FnOnce() -> String) -> Result<Payload> {
    if response.is_success() {
        return Ok(response.data);
    }
    if response.status == 401 {
        return Err(ClientError::Unauthorized);
    }
    Err(ClientError::RequestFailed {
        status: response.status,
        message: failure_message(failure(), &response.data),
    })
}

/// 操作ごとのメッセージにサーバーの説明を添える
fn failure_message(failure: String, data: &Payload) -> String {
    let detail = data.to_text();
    let detail = detail.trim();
    if detail.is_empty() {
        failure
    } else {
        format!("{}: {}", failure, detail)
    }
}

/// ID を返すエンドポイント用（数値・数値文字列・`{"id": n}` を受け付ける）
fn parse_id(payload: &Payload, what: &str) -> Result<u64> {
    let id = match payload {
        Payload::Json(Value::Number(n)) => n.as_u64(),
        Payload::Json(Value::String(s)) => s.trim().parse().ok(),
        Payload::Json(Value::Object(map)) => map.get("id").and_then(Value::as_u64),
        Payload::Text(text) => text.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| {
        ClientError::Common(CommonError::Parse(format!(
            "{}: expected an id, got {}",
            what,
            payload.to_text()
        )))
    })
}
