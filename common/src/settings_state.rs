//! 表示設定
//!
//! テーマとバウンディングボックスの表示項目をローカルストレージに保存する。

use crate::storage::KeyValueStore;
use log::debug;

const DARK_THEME_KEY: &str = "isDarkTheme";
const BOX_CERTAINTY_KEY: &str = "showBoxCertainty";
const BOX_LABEL_KEY: &str = "showBoxLabel";
const ELEMENT_IDS_KEY: &str = "showElementIds";
const SERVER_ADDRESS_KEY: &str = "serverAddress";
const SERVER_USE_HTTPS_KEY: &str = "serverUseHttps";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// ローカルストレージに保存されたサーバーアドレス
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerOverride {
    pub address: Option<String>,
    pub use_https: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsState {
    pub is_dark_theme: bool,
    pub show_box_certainty: bool,
    pub show_box_label: bool,
    pub show_element_ids: bool,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            is_dark_theme: false,
            show_box_certainty: false,
            show_box_label: true,
            show_element_ids: false,
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

impl SettingsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn theme(&self) -> Theme {
        if self.is_dark_theme {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn set_dark_theme<S: KeyValueStore + ?Sized>(&mut self, store: &mut S) {
        self.is_dark_theme = true;
        store.set(DARK_THEME_KEY, "true");
    }

    pub fn set_light_theme<S: KeyValueStore + ?Sized>(&mut self, store: &mut S) {
        self.is_dark_theme = false;
        store.set(DARK_THEME_KEY, "false");
    }

    pub fn set_theme<S: KeyValueStore + ?Sized>(&mut self, theme: Theme, store: &mut S) {
        match theme {
            Theme::Dark => self.set_dark_theme(store),
            Theme::Light => self.set_light_theme(store),
        }
    }

    pub fn update_box_certainty_visibility<S: KeyValueStore + ?Sized>(&mut self, value: bool, store: &mut S) {
        self.show_box_certainty = value;
        store.set(BOX_CERTAINTY_KEY, flag(value));
    }

    pub fn update_box_label_visibility<S: KeyValueStore + ?Sized>(&mut self, value: bool, store: &mut S) {
        self.show_box_label = value;
        store.set(BOX_LABEL_KEY, flag(value));
    }

    pub fn update_element_ids_visibility<S: KeyValueStore + ?Sized>(&mut self, value: bool, store: &mut S) {
        self.show_element_ids = value;
        store.set(ELEMENT_IDS_KEY, flag(value));
    }

    /// ローカルストレージから復元
    ///
    /// テーマが未保存なら `prefers_dark` に従い、
    /// 表示項目が未保存ならデフォルト値を書き込む
    pub fn load_from_storage<S: KeyValueStore + ?Sized>(&mut self, store: &mut S, prefers_dark: bool) {
        let defaults = Self::default();

        match store.get(DARK_THEME_KEY).as_deref() {
            None if prefers_dark => self.set_dark_theme(store),
            None => self.set_light_theme(store),
            Some("true") => self.set_dark_theme(store),
            Some(_) => self.set_light_theme(store),
        }

        match store.get(BOX_CERTAINTY_KEY) {
            None => self.update_box_certainty_visibility(defaults.show_box_certainty, store),
            Some(value) => self.show_box_certainty = value == "true",
        }

        match store.get(BOX_LABEL_KEY) {
            None => self.update_box_label_visibility(defaults.show_box_label, store),
            Some(value) => self.show_box_label = value == "true",
        }

        match store.get(ELEMENT_IDS_KEY) {
            None => self.update_element_ids_visibility(defaults.show_element_ids, store),
            Some(value) => self.show_element_ids = value == "true",
        }

        debug!("Loaded settings: {:?}", self);
    }

    pub fn saved_server_address<S: KeyValueStore + ?Sized>(store: &S) -> ServerOverride {
        ServerOverride {
            address: store.get(SERVER_ADDRESS_KEY).filter(|a| !a.is_empty()),
            use_https: store.get(SERVER_USE_HTTPS_KEY).map(|v| v == "true"),
        }
    }

    pub fn save_server_address<S: KeyValueStore + ?Sized>(store: &mut S, address: &str, use_https: bool) {
        store.set(SERVER_ADDRESS_KEY, address);
        store.set(SERVER_USE_HTTPS_KEY, flag(use_https));
    }

    pub fn reset_server_address<S: KeyValueStore + ?Sized>(store: &mut S) {
        store.remove(SERVER_ADDRESS_KEY);
        store.remove(SERVER_USE_HTTPS_KEY);
    }
}
