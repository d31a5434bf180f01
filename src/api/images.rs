use super::{ensure_success, parse_id, ApiClient};
use crate::client::{Method, RequestBody};
use crate::error::{ClientError, Result};
use crate::imaging::LoadedImage;
use objects_counter_common::dto::{
    AcceptBackgroundRequest, AcceptBackgroundResponse, SendBackgroundPointsResponse,
    SendSelectionRequest,
};
use objects_counter_common::endpoints::{self, fill};
use objects_counter_common::BackgroundPoint;
use reqwest::multipart::{Form, Part};

/// アップロードのフォーム項目名
const UPLOAD_FIELD: &str = "images";

impl ApiClient {
    /// 画像をアップロードし、サーバー上のIDを返す
    pub async fn upload_image(&self, image: &LoadedImage) -> Result<u64> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.mime_type)
            .map_err(|e| ClientError::InvalidState(format!("invalid mime type {}: {}", image.mime_type, e)))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .request
            .send_request(endpoints::UPLOAD_IMAGE, RequestBody::Multipart(form), Method::POST)
            .await?;
        let data = ensure_success(response, || "Failed to upload image".into())?;
        parse_id(&data, "upload response")
    }

    /// アップロード済みの画像本体
    pub async fn get_image(&self, image_id: u64) -> Result<Vec<u8>> {
        let path = fill(endpoints::GET_IMAGE, &[("image_id", &image_id.to_string())]);
        let (status, bytes) = self.request.download(&path).await?;
        match status {
            200..=299 => Ok(bytes),
            401 => Err(ClientError::Unauthorized),
            _ => Err(ClientError::RequestFailed {
                status,
                message: format!("Failed to get image {} blob", image_id),
            }),
        }
    }

    /// 選択点を送り、背景マスクを受け取る
    pub async fn send_background_points(
        &self,
        image_id: u64,
        points: &[BackgroundPoint],
    ) -> Result<SendBackgroundPointsResponse> {
        let path = fill(endpoints::SEND_SELECTION, &[("image_id", &image_id.to_string())]);
        let body = RequestBody::json(&SendSelectionRequest { data: points })?;

        let response = self.request.send_request(&path, body, Method::PUT).await?;
        let data = ensure_success(response, || {
            format!("Failed to send background points for image {}", image_id)
        })?;
        Ok(data.parse("background mask")?)
    }

    /// 背景を確定し、検出結果を受け取る
    pub async fn accept_background(
        &self,
        image_id: u64,
        skip_classification: bool,
    ) -> Result<AcceptBackgroundResponse> {
        let path = fill(endpoints::ACCEPT_BACKGROUND, &[("image_id", &image_id.to_string())]);
        let body = RequestBody::json(&AcceptBackgroundRequest { skip_classification })?;

        let response = self.request.send_request(&path, body, Method::POST).await?;
        let data = ensure_success(response, || "Failed to accept background".into())?;
        Ok(data.parse("accept background response")?)
    }
}
