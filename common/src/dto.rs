//! APIリクエスト/レスポンスの型定義
//!
//! サーバーとの送受信そのままの形（snake_case）。
//! アプリケーション側の型への変換は parser モジュールが担当する。

use crate::types::{BackgroundPoint, ComparisonDiff};
use serde::{Deserialize, Serialize};

// =============================================
// 共通
// =============================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImageElementResponse {
    pub id: u64,
    pub top_left: [i32; 2],
    pub bottom_right: [i32; 2],
    #[serde(default)]
    pub certainty: Option<f64>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub is_leader: Option<bool>,
}

/// 分類とその分類に属する物体
///
/// 古いサーバーは `name` ではなく `classification` キーを返す
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassificationWithObjects {
    #[serde(alias = "classification")]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ImageElementResponse>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageWithClassifications {
    pub id: u64,
    // 必須: AcceptBackgroundResponse の形式判定に使う
    pub classifications: Vec<ClassificationWithObjects>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPointsData {
    #[serde(default)]
    pub data: Vec<BackgroundPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageWithAllData {
    pub id: u64,
    #[serde(default)]
    pub background_points: Option<BackgroundPointsData>,
    #[serde(default)]
    pub elements: Vec<ImageElementResponse>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThumbnailResponse {
    pub id: u64,
    pub thumbnail: String,
}

// =============================================
// 画像
// =============================================

/// アップロード結果は画像IDのみ
pub type UploadImageResponse = u64;

#[derive(Debug, Clone, Serialize)]
pub struct SendSelectionRequest<'a> {
    pub data: &'a [BackgroundPoint],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendBackgroundPointsResponse {
    pub mask: Vec<Vec<bool>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptBackgroundRequest {
    pub skip_classification: bool,
}

/// 背景確定のレスポンス
///
/// 分類付き（`classifications`）と分類なし（`elements`）の2形式がある
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AcceptBackgroundResponse {
    Classified(ImageWithClassifications),
    NonClassified(ImageWithAllData),
}

// =============================================
// データセット
// =============================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetDatasetResponse {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageWithAllData>,
    #[serde(default)]
    pub unfinished: bool,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetRequest<'a> {
    pub name: &'a str,
    pub unfinished: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderClassification {
    pub name: String,
    pub leader_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddImageToDatasetRequest<'a> {
    pub image_id: u64,
    pub classifications: &'a [LeaderClassification],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationAdjustment {
    pub name: String,
    pub elements: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustClassificationsRequest<'a> {
    pub classifications: &'a [ClassificationAdjustment],
}

// =============================================
// 結果
// =============================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub classifications: Vec<ClassificationWithObjects>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetResultResponse {
    pub id: u64,
    #[serde(default)]
    pub data: ResultData,
    pub image_id: u64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateResultRequest<'a> {
    pub image_ids: &'a [u64],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaders: Option<&'a [u64]>,
}

// =============================================
// 比較
// =============================================

#[derive(Debug, Clone, Serialize)]
pub struct CompareRequest<'a> {
    pub image_ids: &'a [u64],
}

/// 比較結果（比較履歴の1件と同じ形）
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComparisonResponse {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub dataset_id: Option<u64>,
    #[serde(default)]
    pub diff: ComparisonDiff,
    #[serde(default)]
    pub images: Vec<ImageWithAllData>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// =============================================
// ユーザー
// =============================================

#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserLoginResponse {
    /// サーバーは `user_id` で返す
    #[serde(alias = "user_id")]
    pub id: u64,
    pub username: String,
    pub token: String,
}
