//! ユーザーセッション
//!
//! ログイン情報を保持し、Cookieに保存/復元する。
//! Cookieに有効期限は設けない（ログアウトするまで残る）。

use crate::dto::UserLoginResponse;
use crate::storage::KeyValueStore;
use log::{debug, info};

pub const USERNAME_COOKIE: &str = "username";
pub const USER_ID_COOKIE: &str = "userId";
pub const USER_TOKEN_COOKIE: &str = "userToken";

/// セッションで使うCookie名
pub const SESSION_COOKIES: [&str; 3] = [USERNAME_COOKIE, USER_ID_COOKIE, USER_TOKEN_COOKIE];

pub const GUEST_USERNAME: &str = "Guest";

#[derive(Debug, Clone, PartialEq)]
pub struct UserState {
    username: String,
    user_id: u64,
    token: String,
    is_logged_in: bool,
}

impl Default for UserState {
    fn default() -> Self {
        Self {
            username: GUEST_USERNAME.to_string(),
            user_id: 0,
            token: String::new(),
            is_logged_in: false,
        }
    }
}

impl UserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// Authorizationヘッダに載せるトークン
    pub fn auth_token(&self) -> Option<&str> {
        if self.is_logged_in {
            Some(&self.token)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn login<S: KeyValueStore + ?Sized>(&mut self, data: &UserLoginResponse, cookies: &mut S) {
        self.username = data.username.clone();
        self.user_id = data.id;
        self.token = data.token.clone();
        self.is_logged_in = !self.token.is_empty();

        cookies.set(USERNAME_COOKIE, &data.username);
        cookies.set(USER_ID_COOKIE, &data.id.to_string());
        cookies.set(USER_TOKEN_COOKIE, &data.token);
        info!("Logged in as {} (id {})", self.username, self.user_id);
    }

    pub fn logout<S: KeyValueStore + ?Sized>(&mut self, cookies: &mut S) {
        if self.is_logged_in {
            info!("Logging out {}", self.username);
        }
        self.reset();

        for name in SESSION_COOKIES {
            cookies.remove(name);
        }
    }

    /// `name=value; name=value` 形式のCookie文字列から復元
    ///
    /// 空の値は「なし」とみなして上書きしない
    pub fn load_from_cookies(&mut self, cookies: &str) {
        for pair in cookies.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            match name {
                USERNAME_COOKIE => self.username = value.to_string(),
                USER_ID_COOKIE => match value.parse() {
                    Ok(id) => self.user_id = id,
                    Err(_) => debug!("Ignoring invalid userId cookie: {}", value),
                },
                USER_TOKEN_COOKIE => self.token = value.to_string(),
                _ => {}
            }
        }

        self.is_logged_in = !self.token.is_empty();
    }
}
