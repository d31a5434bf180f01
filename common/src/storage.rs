//! キー/値ストア
//!
//! Cookieとローカルストレージの抽象。
//! ストア側の操作は失敗しない。永続化の失敗は永続化する側で扱う。

use std::collections::BTreeMap;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// メモリ上のストア（テストやセッション限りの利用）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// `name=value; name=value` 形式のCookie文字列を組み立てる
pub fn cookie_string<S: KeyValueStore + ?Sized>(store: &S, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| store.get(name).map(|value| format!("{}={}", name, value)))
        .collect::<Vec<_>>()
        .join("; ")
}
