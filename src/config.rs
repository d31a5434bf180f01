use crate::error::{ClientError, Result};
use objects_counter_common::ServerOverride;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SERVER_ENV: &str = "OBJECTS_COUNTER_SERVER";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_address: String,
    pub server_use_https: bool,
    /// 生存確認の間隔
    pub is_alive_delay_ms: u64,
    /// 生存確認のタイムアウト
    pub is_alive_timeout_ms: u64,
    /// レスポンスをdebugログに出す（トークンが漏れる可能性あり）
    pub log_responses: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "localhost:5000".into(),
            server_use_https: false,
            is_alive_delay_ms: 1500,
            is_alive_timeout_ms: 5000,
            log_responses: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        // 環境変数を優先
        if let Ok(address) = std::env::var(SERVER_ENV) {
            if !address.trim().is_empty() {
                config.server_address = address.trim().to_string();
            }
        }
        Ok(config)
    }

    /// 設定ファイルやCookieファイルを置くディレクトリ
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ClientError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("objects-counter"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// ローカルストレージに保存されたサーバーアドレスで上書き
    pub fn apply_override(&mut self, saved: &ServerOverride) {
        if let Some(address) = &saved.address {
            self.server_address = address.clone();
        }
        if let Some(use_https) = saved.use_https {
            self.server_use_https = use_https;
        }
    }

    pub fn server_uri(&self) -> String {
        let scheme = if self.server_use_https { "https://" } else { "http://" };
        format!("{}{}", scheme, self.server_address.trim_end_matches('/'))
    }
}
