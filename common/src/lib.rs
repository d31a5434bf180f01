//! Objects Counter Common Library
//!
//! 画面遷移・画像データ・セッション・設定の状態管理と、
//! APIの型定義/パーサー。I/Oを持たない部分をここに置く。

pub mod dto;
pub mod endpoints;
pub mod error;
pub mod image_state;
pub mod mask;
pub mod parser;
pub mod settings_state;
pub mod storage;
pub mod types;
pub mod user_state;
pub mod validation;
pub mod view_state;

pub use error::{Error, Result};
pub use image_state::{ImageState, DEFAULT_POINT_TOLERANCE};
pub use mask::MaskBitmap;
pub use parser::Payload;
pub use settings_state::{ServerOverride, SettingsState, Theme};
pub use storage::{KeyValueStore, MemoryStore};
pub use types::{
    BackgroundPoint, ClassificationSummary, ComparisonDiff, ComparisonHistoryItem,
    DatasetClassificationListItem, DatasetListItem, ImageDetails, ImageElement,
    ObjectClassification, ResultHistoryItem,
};
pub use user_state::UserState;
pub use view_state::{ConfirmKind, Screen, ScreenComponent, Toolbar, ViewState, Workflow};
