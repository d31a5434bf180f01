use super::{ensure_success, ApiClient};
use crate::client::{Method, RequestBody};
use crate::error::{ClientError, Result};
use objects_counter_common::dto::{Credentials, UserLoginResponse};
use objects_counter_common::endpoints;
use objects_counter_common::validation::{validate_password, validate_username, ValidationIssue};

/// 送信前の入力チェック
pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
    let issues: Vec<ValidationIssue> = validate_username(username)
        .into_iter()
        .chain(validate_password(password))
        .collect();

    if issues.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = issues.iter().map(ValidationIssue::message).collect();
    Err(ClientError::Validation(messages.join("; ")))
}

impl ApiClient {
    pub async fn login_user(&self, username: &str, password: &str) -> Result<UserLoginResponse> {
        let body = RequestBody::json(&Credentials { username, password })?;
        let response = self
            .request
            .send_request(endpoints::USER_LOGIN, body, Method::POST)
            .await?;

        if response.status == 404 {
            return Err(ClientError::InvalidCredentials);
        }
        let data = ensure_success(response, || "Failed to login".into())?;
        Ok(data.parse("login response")?)
    }

    /// ユーザー登録（入力チェックに通った場合のみ送信）
    pub async fn register_user(&self, username: &str, password: &str) -> Result<()> {
        validate_credentials(username, password)?;

        let body = RequestBody::json(&Credentials { username, password })?;
        let response = self
            .request
            .send_request(endpoints::USER_REGISTER, body, Method::POST)
            .await?;

        if response.status == 400 {
            return Err(ClientError::RegistrationRejected);
        }
        ensure_success(response, || "Failed to register".into())?;
        Ok(())
    }
}
