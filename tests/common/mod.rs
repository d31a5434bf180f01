//! テスト用の簡易HTTPサーバー
//!
//! 用意したレスポンスを接続ごとに1つずつ返し、受け取ったリクエストを記録する。

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct MockServer {
    address: String,
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl MockServer {
    /// `responses` を順に返すサーバーを起動
    pub async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind失敗");
        let address = listener.local_addr().expect("アドレス取得失敗").to_string();

        let handle = tokio::spawn(async move {
            let mut captured = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().await.expect("accept失敗");
                captured.push(respond(stream, status, body).await);
            }
            captured
        });

        Self { address, handle }
    }

    /// host:port
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn uri(&self) -> String {
        format!("http://{}", self.address)
    }

    /// 全レスポンスを返し終えるまで待ち、受け取ったリクエストを返す
    pub async fn finish(self) -> Vec<CapturedRequest> {
        self.handle.await.expect("サーバータスク失敗")
    }
}

/// 何も待ち受けていないアドレス
pub async fn unused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind失敗");
    listener.local_addr().expect("アドレス取得失敗").to_string()
}

async fn respond(mut stream: TcpStream, status: u16, body: &str) -> CapturedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.expect("読み取り失敗");
        assert!(read > 0, "ヘッダーの途中で切断");
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body_bytes = buffer[header_end + 4..].to_vec();
    while body_bytes.len() < content_length {
        let read = stream.read(&mut chunk).await.expect("読み取り失敗");
        assert!(read > 0, "本文の途中で切断");
        body_bytes.extend_from_slice(&chunk[..read]);
    }

    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await.expect("書き込み失敗");
    stream.shutdown().await.ok();

    CapturedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body_bytes).to_string(),
    }
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
