use super::{ensure_success, parse_id, ApiClient};
use crate::client::{Method, RequestBody};
use crate::error::Result;
use objects_counter_common::dto::{CreateResultRequest, GetResultResponse, ThumbnailResponse};
use objects_counter_common::endpoints::{self, fill};
use objects_counter_common::parser::result_history_items;
use objects_counter_common::ResultHistoryItem;

impl ApiClient {
    pub async fn get_result(&self, result_id: u64) -> Result<GetResultResponse> {
        let path = fill(endpoints::GET_RESULT, &[("result_id", &result_id.to_string())]);
        let response = self.request.send_request(&path, RequestBody::Empty, Method::GET).await?;
        let data = ensure_success(response, || format!("Failed to get result {}", result_id))?;
        Ok(data.parse("result")?)
    }

    pub async fn get_results(&self) -> Result<Vec<GetResultResponse>> {
        let response = self
            .request
            .send_request(endpoints::GET_RESULTS, RequestBody::Empty, Method::GET)
            .await?;
        let data = ensure_success(response, || "Failed to get results".into())?;
        Ok(data.parse("results")?)
    }

    pub async fn get_results_thumbnails(&self) -> Result<Vec<ThumbnailResponse>> {
        let response = self
            .request
            .send_request(endpoints::GET_RESULTS_THUMBNAILS, RequestBody::Empty, Method::GET)
            .await?;
        let data = ensure_success(response, || "Failed to get results thumbnails".into())?;
        Ok(data.parse("results thumbnails")?)
    }

    /// 結果履歴（サムネイル付き）
    pub async fn result_history(&self) -> Result<Vec<ResultHistoryItem>> {
        let results = self.get_results().await?;
        let thumbnails = self.get_results_thumbnails().await?;
        Ok(result_history_items(&results, &thumbnails)?)
    }

    /// 画像群から結果を作成し、結果IDを返す
    pub async fn create_result(&self, image_ids: &[u64], leaders: Option<&[u64]>) -> Result<u64> {
        let body = RequestBody::json(&CreateResultRequest { image_ids, leaders })?;
        let response = self
            .request
            .send_request(endpoints::CREATE_RESULT, body, Method::POST)
            .await?;
        let data = ensure_success(response, || "Failed to create result".into())?;
        parse_id(&data, "create result response")
    }

    /// 結果の分類名を変更し、変更された物体数を返す
    ///
    /// 新しい名前はテキストのままボディに入れる
    pub async fn rename_result_classification(
        &self,
        result_id: u64,
        old_name: &str,
        new_name: &str,
    ) -> Result<u64> {
        let path = fill(
            endpoints::RENAME_CLASSIFICATION,
            &[("result_id", &result_id.to_string()), ("classification_name", old_name)],
        );
        let response = self
            .request
            .send_request(&path, RequestBody::text(new_name), Method::POST)
            .await?;
        let data = ensure_success(response, || {
            format!(
                "Failed to rename classification {} to {} for id {}",
                old_name, new_name, result_id
            )
        })?;
        parse_id(&data, "rename count")
    }

    pub async fn delete_result(&self, result_id: u64) -> Result<()> {
        let path = fill(endpoints::DELETE_RESULT, &[("result_id", &result_id.to_string())]);
        let response = self.request.send_request(&path, RequestBody::Empty, Method::DELETE).await?;
        ensure_success(response, || format!("Failed to delete result {}", result_id))?;
        Ok(())
    }
}
