use crate::error::{ClientError, Result};
use log::debug;
use objects_counter_common::Payload;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

/// リクエストボディ（Content-Typeはボディの種類で決まる）
#[derive(Debug)]
pub enum RequestBody {
    Empty,
    Json(String),
    Raw {
        content: String,
        content_type: &'static str,
    },
    /// Content-Type（boundary付き）はreqwestが設定する
    Multipart(Form),
}

impl RequestBody {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(RequestBody::Json(serde_json::to_string(value)?))
    }

    pub fn text(content: impl Into<String>) -> Self {
        RequestBody::Raw {
            content: content.into(),
            content_type: "text/plain",
        }
    }
}

/// ステータスに関わらず返るレスポンス
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub data: Payload,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    base_uri: String,
    token: Option<String>,
    log_responses: bool,
}

impl RequestClient {
    pub fn new(base_uri: impl Into<String>, log_responses: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .gzip(true)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
            token: None,
            log_responses,
        })
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn set_base_uri(&mut self, base_uri: impl Into<String>) {
        self.base_uri = base_uri.into().trim_end_matches('/').to_string();
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// 以降のリクエストに付ける認証トークン（空文字は付けない）
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.is_empty());
    }

    /// パスをサーバーURIに連結（絶対URIはそのまま）
    pub fn uri(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_uri, path)
        }
    }

    /// リクエストを送信
    ///
    /// ステータスが失敗でも `Ok` を返す。`Err` になるのは接続・読み取りの失敗のみ
    pub async fn send_request(&self, path: &str, body: RequestBody, method: Method) -> Result<RawResponse> {
        self.send(path, body, method, None).await
    }

    /// タイムアウト付きで送信
    pub async fn send_request_with_timeout(
        &self,
        path: &str,
        body: RequestBody,
        method: Method,
        timeout: Duration,
    ) -> Result<RawResponse> {
        self.send(path, body, method, Some(timeout)).await
    }

    /// バイナリを取得（画像本体など）
    ///
    /// ステータスと本文をそのまま返す
    pub async fn download(&self, path: &str) -> Result<(u16, Vec<u8>)> {
        let uri = self.uri(path);
        debug!("GET {}", uri);

        let network_error = |source| ClientError::Network { uri: uri.clone(), source };
        let response = self
            .build(Method::GET, &uri, None)
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(network_error)?;

        debug!("Request to {} returned {} ({} bytes)", uri, status, bytes.len());
        Ok((status, bytes.to_vec()))
    }

    fn build(&self, method: Method, uri: &str, timeout: Option<Duration>) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, uri);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        request
    }

    async fn send(
        &self,
        path: &str,
        body: RequestBody,
        method: Method,
        timeout: Option<Duration>,
    ) -> Result<RawResponse> {
        let uri = self.uri(path);
        debug!("{} {}", method, uri);

        let request = self.build(method, &uri, timeout);
        let request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(content) => request.header(CONTENT_TYPE, "application/json").body(content),
            RequestBody::Raw { content, content_type } => request.header(CONTENT_TYPE, content_type).body(content),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let network_error = |source| ClientError::Network { uri: uri.clone(), source };
        let response = request.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(network_error)?;

        if self.log_responses {
            debug!("Request to {} returned {}: {}", uri, status, text);
        } else {
            debug!("Request to {} returned {}", uri, status);
        }

        Ok(RawResponse {
            status,
            data: Payload::from_body(&text),
        })
    }
}
