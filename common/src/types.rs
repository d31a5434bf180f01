//! アプリケーション側の型定義
//!
//! サーバーから受け取ったDTOを変換した後の型:
//! - ImageDetails: 作業中の画像1枚分のデータ
//! - ImageElement: 検出された物体1つ
//! - BackgroundPoint: ユーザーが置いた前景/背景ヒント
//! - *ListItem / *HistoryItem: 一覧表示用のサマリー

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 比較結果の差分（分類名 → 個数差）
pub type ComparisonDiff = BTreeMap<String, i64>;

/// ユーザーが配置した選択点
///
/// サーバーにもこの形のまま送信する
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPoint {
    pub position: [f64; 2],
    /// true: 前景に含める, false: 除外する
    pub positive: bool,
}

impl BackgroundPoint {
    pub fn new(positive: bool, x: f64, y: f64) -> Self {
        Self { position: [x, y], positive }
    }

    /// (x, y) までのユークリッド距離
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        distance(self.position[0], self.position[1], x, y)
    }
}

pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt()
}

/// 検出された物体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    pub id: u64,
    pub top_left: [i32; 2],
    pub bottom_right: [i32; 2],
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub certainty: Option<f64>,
    #[serde(default)]
    pub is_leader: bool,
}

/// 作業中の画像
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub id: u64,
    /// 表示用の画像データ（data URL）
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub background_mask: Option<String>,
    #[serde(default)]
    pub elements: Vec<ImageElement>,
    #[serde(default)]
    pub selected_leader_ids: Vec<u64>,
    #[serde(default)]
    pub background_points: Vec<BackgroundPoint>,
}

impl ImageDetails {
    pub fn new(id: u64, data_url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id,
            data_url: data_url.into(),
            width,
            height,
            ..Default::default()
        }
    }
}

/// 分類（表示切替の単位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectClassification {
    pub name: String,
    pub show_boxes: bool,
}

/// 分類ごとの集計（画像をまたいで名前でマージ）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationSummary {
    pub name: String,
    pub count: usize,
    pub show_boxes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultHistoryItem {
    pub id: u64,
    pub image_id: u64,
    pub thumbnail_uri: Option<String>,
    /// UNIXミリ秒
    pub timestamp: i64,
    pub classification_count: usize,
    pub element_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetListItem {
    pub id: u64,
    pub name: String,
    pub thumbnail_uri: Option<String>,
    pub timestamp: i64,
    pub unfinished: bool,
    pub image_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetClassificationListItem {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonHistoryItem {
    pub id: u64,
    /// データセット削除後はNone
    pub dataset_id: Option<u64>,
    pub thumbnail_uri: Option<String>,
    pub timestamp: i64,
    pub image_count: usize,
    pub classification_count: usize,
}
