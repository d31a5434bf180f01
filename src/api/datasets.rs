use super::{ensure_success, parse_id, ApiClient};
use crate::client::{Method, RequestBody};
use crate::error::Result;
use objects_counter_common::dto::{
    AddImageToDatasetRequest, AdjustClassificationsRequest, ClassificationAdjustment,
    DatasetRequest, GetDatasetResponse, ImageWithAllData, ImageWithClassifications,
    LeaderClassification, ThumbnailResponse,
};
use objects_counter_common::endpoints::{self, fill};
use objects_counter_common::parser::dataset_list_items;
use objects_counter_common::DatasetListItem;

impl ApiClient {
    pub async fn get_dataset(&self, dataset_id: u64) -> Result<GetDatasetResponse> {
        let path = fill(endpoints::GET_DATASET, &[("dataset_id", &dataset_id.to_string())]);
        let response = self.request.send_request(&path, RequestBody::Empty, Method::GET).await?;
        let data = ensure_success(response, || format!("Failed to get dataset {}", dataset_id))?;
        Ok(data.parse("dataset")?)
    }

    pub async fn get_datasets(&self) -> Result<Vec<GetDatasetResponse>> {
        let response = self
            .request
            .send_request(endpoints::GET_DATASETS, RequestBody::Empty, Method::GET)
            .await?;
        let data = ensure_success(response, || "Failed to get datasets".into())?;
        Ok(data.parse("datasets")?)
    }

    pub async fn get_datasets_thumbnails(&self) -> Result<Vec<ThumbnailResponse>> {
        let response = self
            .request
            .send_request(endpoints::GET_DATASETS_THUMBNAILS, RequestBody::Empty, Method::GET)
            .await?;
        let data = ensure_success(response, || "Failed to get datasets thumbnails".into())?;
        Ok(data.parse("datasets thumbnails")?)
    }

    /// データセット一覧（サムネイル付き）
    pub async fn dataset_list(&self) -> Result<Vec<DatasetListItem>> {
        let datasets = self.get_datasets().await?;
        let thumbnails = self.get_datasets_thumbnails().await?;
        Ok(dataset_list_items(&datasets, &thumbnails)?)
    }

    pub async fn get_dataset_images(&self, dataset_id: u64) -> Result<Vec<ImageWithAllData>> {
        let path = fill(endpoints::GET_DATASET_IMAGES, &[("dataset_id", &dataset_id.to_string())]);
        let response = self.request.send_request(&path, RequestBody::Empty, Method::GET).await?;
        let data = ensure_success(response, || format!("Failed to get images of dataset {}", dataset_id))?;
        Ok(data.parse("dataset images")?)
    }

    /// データセットを作成し、IDを返す
    pub async fn create_dataset(&self, name: &str, unfinished: bool) -> Result<u64> {
        let body = RequestBody::json(&DatasetRequest { name, unfinished })?;
        let response = self
            .request
            .send_request(endpoints::CREATE_DATASET, body, Method::POST)
            .await?;
        let data = ensure_success(response, || format!("Failed to create dataset {}", name))?;
        parse_id(&data, "create dataset response")
    }

    pub async fn rename_dataset(&self, dataset_id: u64, name: &str, unfinished: bool) -> Result<GetDatasetResponse> {
        let path = fill(endpoints::RENAME_DATASET, &[("dataset_id", &dataset_id.to_string())]);
        let body = RequestBody::json(&DatasetRequest { name, unfinished })?;

        let response = self.request.send_request(&path, body, Method::PATCH).await?;
        let data = ensure_success(response, || format!("Failed to rename dataset {} to {}", dataset_id, name))?;
        Ok(data.parse("renamed dataset")?)
    }

    pub async fn delete_dataset(&self, dataset_id: u64) -> Result<()> {
        let path = fill(endpoints::DELETE_DATASET, &[("dataset_id", &dataset_id.to_string())]);
        let response = self.request.send_request(&path, RequestBody::Empty, Method::DELETE).await?;
        ensure_success(response, || format!("Failed to delete dataset {}", dataset_id))?;
        Ok(())
    }

    /// 画像を分類（リーダーごとの名前）付きでデータセットに追加
    pub async fn add_image_to_dataset(
        &self,
        dataset_id: u64,
        image_id: u64,
        classifications: &[LeaderClassification],
    ) -> Result<GetDatasetResponse> {
        let path = fill(endpoints::ADD_IMAGE_TO_DATASET, &[("dataset_id", &dataset_id.to_string())]);
        let body = RequestBody::json(&AddImageToDatasetRequest { image_id, classifications })?;

        let response = self.request.send_request(&path, body, Method::POST).await?;
        let data = ensure_success(response, || {
            format!("Failed to add image {} to dataset {}", image_id, dataset_id)
        })?;
        Ok(data.parse("dataset")?)
    }

    /// データセット内の画像の分類を手動で修正
    pub async fn adjust_classifications(
        &self,
        dataset_id: u64,
        image_id: u64,
        classifications: &[ClassificationAdjustment],
    ) -> Result<ImageWithClassifications> {
        let path = fill(
            endpoints::ADJUST_DATASET_CLASSIFICATIONS,
            &[("dataset_id", &dataset_id.to_string()), ("image_id", &image_id.to_string())],
        );
        let body = RequestBody::json(&AdjustClassificationsRequest { classifications })?;

        let response = self.request.send_request(&path, body, Method::PATCH).await?;
        let data = ensure_success(response, || {
            format!(
                "Failed to adjust classifications for dataset {} image {}",
                dataset_id, image_id
            )
        })?;
        Ok(data.parse("adjusted classifications")?)
    }
}
