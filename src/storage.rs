//! ファイル保存のキー/値ストア
//!
//! Cookie（cookies.json）とローカルストレージ（local_storage.json）を
//! 設定ディレクトリにJSONで保存する。変更は save() で書き出す。

use crate::error::Result;
use objects_counter_common::{KeyValueStore, MemoryStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const COOKIES_FILE_NAME: &str = "cookies.json";
pub const LOCAL_STORAGE_FILE_NAME: &str = "local_storage.json";

/// 保存ファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    /// バージョン（互換性チェック用）
    version: u32,
    entries: BTreeMap<String, String>,
}

impl StoreFile {
    const CURRENT_VERSION: u32 = 1;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: MemoryStore,
    dirty: bool,
}

impl FileStore {
    /// ファイルから読み込み
    ///
    /// 存在しない/壊れている/バージョン違いの場合は空で始める
    pub fn load(path: &Path) -> Self {
        let entries = Self::read_entries(path).unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            entries: MemoryStore::from_entries(entries),
            dirty: false,
        }
    }

    fn read_entries(path: &Path) -> Option<BTreeMap<String, String>> {
        let file = File::open(path).ok()?;
        let stored: StoreFile = match serde_json::from_reader(BufReader::new(file)) {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Ignoring unreadable store {}: {}", path.display(), e);
                return None;
            }
        };
        if stored.version != StoreFile::CURRENT_VERSION {
            log::warn!("Store version mismatch in {}, starting empty", path.display());
            return None;
        }
        Some(stored.entries)
    }

    /// 変更があればファイルに書き出す
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stored = StoreFile {
            version: StoreFile::CURRENT_VERSION,
            entries: self.entries.entries().clone(),
        };
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, &stored)?;
        self.dirty = false;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.set(key, value);
        self.dirty = true;
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.dirty = true;
    }
}
