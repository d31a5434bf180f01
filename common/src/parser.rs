//! APIレスポンスパーサー
//!
//! レスポンス本文を型付きのDTOにパースし、
//! 一覧表示用のアプリケーション型に変換する。
//! 型が合わない値は黙って通さず Error::Parse にする。

use crate::dto::{
    ClassificationWithObjects, ComparisonResponse, GetDatasetResponse, GetResultResponse,
    ImageElementResponse, ThumbnailResponse,
};
use crate::error::{Error, Result};
use crate::types::{
    ComparisonHistoryItem, DatasetClassificationListItem, DatasetListItem, ImageElement,
    ResultHistoryItem,
};
use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// レスポンス本文
///
/// JSONとして読めればJson、読めなければ生テキスト
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// 本文をJSONとして解釈し、失敗したらテキストとして保持
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(body.to_string()),
        }
    }

    /// 型付きの値にパース
    ///
    /// # Arguments
    /// * `what` - エラーメッセージ用のレスポンス名
    pub fn parse<T: DeserializeOwned>(&self, what: &str) -> Result<T> {
        match self {
            Payload::Json(value) => T::deserialize(value)
                .map_err(|e| Error::Parse(format!("{}: {}", what, e))),
            Payload::Text(text) => Err(Error::Parse(format!(
                "{}: expected JSON, got text ({} chars)",
                what,
                text.len()
            ))),
        }
    }

    /// エラーメッセージなどに使うテキスト表現
    pub fn to_text(&self) -> String {
        match self {
            Payload::Json(Value::String(s)) => s.clone(),
            Payload::Json(value) => value.to_string(),
            Payload::Text(text) => text.clone(),
        }
    }
}

/// サーバーのタイムスタンプをUNIXミリ秒に変換
///
/// 対応形式:
/// 1. RFC 2822 / HTTP-date（`Tue, 14 May 2024 10:00:00 GMT`）
/// 2. RFC 3339
/// 3. タイムゾーンなしのISO形式（UTCとみなす）
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    Err(Error::Parse(format!("invalid timestamp: {}", raw)))
}

fn optional_timestamp(raw: Option<&str>) -> Result<i64> {
    raw.map(parse_timestamp).transpose().map(|t| t.unwrap_or(0))
}

/// Base64サムネイルを表示用のdata URLにする
pub fn thumbnail_uri(base64_thumbnail: &str) -> String {
    format!("data:image/png;base64,{}", base64_thumbnail)
}

fn thumbnail_map(thumbnails: &[ThumbnailResponse]) -> HashMap<u64, String> {
    thumbnails
        .iter()
        .map(|t| (t.id, thumbnail_uri(&t.thumbnail)))
        .collect()
}

/// レスポンスの物体をアプリケーション側の型に変換
///
/// `classification` は翻訳済みの表示名を渡す
pub fn element_from_response(
    element: &ImageElementResponse,
    classification: Option<String>,
) -> ImageElement {
    ImageElement {
        id: element.id,
        top_left: element.top_left,
        bottom_right: element.bottom_right,
        classification,
        certainty: element.certainty,
        is_leader: element.is_leader.unwrap_or(false),
    }
}

pub fn result_history_items(
    results: &[GetResultResponse],
    thumbnails: &[ThumbnailResponse],
) -> Result<Vec<ResultHistoryItem>> {
    let thumbnails = thumbnail_map(thumbnails);
    results
        .iter()
        .map(|r| {
            Ok(ResultHistoryItem {
                id: r.id,
                image_id: r.image_id,
                thumbnail_uri: thumbnails.get(&r.id).cloned(),
                timestamp: optional_timestamp(r.timestamp.as_deref())?,
                classification_count: r.data.classifications.len(),
                element_count: r.data.count,
            })
        })
        .collect()
}

pub fn dataset_list_items(
    datasets: &[GetDatasetResponse],
    thumbnails: &[ThumbnailResponse],
) -> Result<Vec<DatasetListItem>> {
    let thumbnails = thumbnail_map(thumbnails);
    datasets
        .iter()
        .map(|d| {
            Ok(DatasetListItem {
                id: d.id,
                name: d.name.clone(),
                thumbnail_uri: thumbnails.get(&d.id).cloned(),
                timestamp: optional_timestamp(d.timestamp.as_deref())?,
                unfinished: d.unfinished,
                image_count: d.images.len(),
            })
        })
        .collect()
}

pub fn comparison_history_items(
    comparisons: &[ComparisonResponse],
    thumbnails: &[ThumbnailResponse],
) -> Result<Vec<ComparisonHistoryItem>> {
    let thumbnails = thumbnail_map(thumbnails);
    comparisons
        .iter()
        .map(|c| {
            Ok(ComparisonHistoryItem {
                id: c.id,
                dataset_id: c.dataset_id,
                thumbnail_uri: thumbnails.get(&c.id).cloned(),
                timestamp: optional_timestamp(c.timestamp.as_deref())?,
                image_count: c.images.len(),
                classification_count: c.diff.len(),
            })
        })
        .collect()
}

/// データセット内の分類ごとの物体数（初出順）
pub fn dataset_classifications(dataset: &GetDatasetResponse) -> Vec<DatasetClassificationListItem> {
    let mut items: Vec<DatasetClassificationListItem> = Vec::new();
    let names = dataset
        .images
        .iter()
        .flat_map(|image| image.elements.iter())
        .filter_map(|element| element.classification.as_deref());

    for name in names {
        match items.iter_mut().find(|item| item.name == name) {
            Some(item) => item.count += 1,
            None => items.push(DatasetClassificationListItem {
                name: name.to_string(),
                count: 1,
            }),
        }
    }
    items
}

/// 分類付き結果の物体総数
pub fn count_objects(classifications: &[ClassificationWithObjects]) -> usize {
    classifications.iter().map(|c| c.objects.len()).sum()
}
