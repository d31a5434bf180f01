use super::{ensure_success, ApiClient};
use crate::client::{Method, RequestBody};
use crate::error::Result;
use objects_counter_common::dto::{CompareRequest, ComparisonResponse, ThumbnailResponse};
use objects_counter_common::endpoints::{self, fill};
use objects_counter_common::parser::comparison_history_items;
use objects_counter_common::ComparisonHistoryItem;

impl ApiClient {
    /// 画像群をデータセットと比較
    pub async fn compare_to_dataset(&self, dataset_id: u64, image_ids: &[u64]) -> Result<ComparisonResponse> {
        let path = fill(endpoints::COMPARE_TO_DATASET, &[("dataset_id", &dataset_id.to_string())]);
        let body = RequestBody::json(&CompareRequest { image_ids })?;

        let response = self.request.send_request(&path, body, Method::POST).await?;
        let data = ensure_success(response, || format!("Failed to compare dataset {}", dataset_id))?;
        Ok(data.parse("comparison")?)
    }

    pub async fn get_comparison_history(&self) -> Result<Vec<ComparisonResponse>> {
        let response = self
            .request
            .send_request(endpoints::GET_COMPARISON_HISTORY, RequestBody::Empty, Method::GET)
            .await?;
        let data = ensure_success(response, || "Failed to get comparison history".into())?;
        Ok(data.parse("comparison history")?)
    }

    pub async fn get_comparison_history_thumbnails(&self) -> Result<Vec<ThumbnailResponse>> {
        let response = self
            .request
            .send_request(endpoints::GET_COMPARISON_HISTORY_THUMBNAILS, RequestBody::Empty, Method::GET)
            .await?;
        let data = ensure_success(response, || "Failed to get comparison history thumbnails".into())?;
        Ok(data.parse("comparison history thumbnails")?)
    }

    pub async fn comparison_history(&self) -> Result<Vec<ComparisonHistoryItem>> {
        let comparisons = self.get_comparison_history().await?;
        let thumbnails = self.get_comparison_history_thumbnails().await?;
        Ok(comparison_history_items(&comparisons, &thumbnails)?)
    }

    pub async fn delete_comparison(&self, comparison_id: u64) -> Result<()> {
        let path = fill(endpoints::DELETE_COMPARISON, &[("comparison_id", &comparison_id.to_string())]);
        let response = self.request.send_request(&path, RequestBody::Empty, Method::DELETE).await?;
        ensure_success(response, || "Failed to delete comparison".into())?;
        Ok(())
    }
}
