//! バックエンドのエンドポイント定義

pub const IS_ALIVE: &str = "/api/is-alive";
pub const UPLOAD_IMAGE: &str = "/api/images/upload";
pub const GET_IMAGE: &str = "/api/images/{image_id}";
pub const SEND_SELECTION: &str = "/api/images/{image_id}/background";
pub const ACCEPT_BACKGROUND: &str = "/api/images/{image_id}/background/accept";
pub const USER_REGISTER: &str = "/api/users/register";
pub const USER_LOGIN: &str = "/api/users/login";
pub const GET_RESULTS: &str = "/api/results/";
pub const CREATE_RESULT: &str = "/api/results/";
pub const GET_RESULT: &str = "/api/results/{result_id}";
pub const GET_RESULTS_THUMBNAILS: &str = "/api/results/thumbnails";
pub const DELETE_RESULT: &str = "/api/results/{result_id}";
pub const RENAME_CLASSIFICATION: &str =
    "/api/results/{result_id}/classification/{classification_name}/rename";
pub const GET_DATASETS: &str = "/api/datasets/";
pub const GET_DATASET: &str = "/api/datasets/{dataset_id}";
pub const CREATE_DATASET: &str = "/api/datasets/";
pub const DELETE_DATASET: &str = "/api/datasets/{dataset_id}";
pub const RENAME_DATASET: &str = "/api/datasets/{dataset_id}";
pub const GET_DATASET_IMAGES: &str = "/api/datasets/{dataset_id}/images";
pub const ADD_IMAGE_TO_DATASET: &str = "/api/datasets/{dataset_id}/images";
pub const GET_DATASETS_THUMBNAILS: &str = "/api/datasets/thumbnails";
pub const ADJUST_DATASET_CLASSIFICATIONS: &str = "/api/datasets/{dataset_id}/images/{image_id}";
pub const COMPARE_TO_DATASET: &str = "/api/datasets/{dataset_id}/comparison";
pub const GET_COMPARISON_HISTORY: &str = "/api/comparison_history/";
pub const GET_COMPARISON_HISTORY_THUMBNAILS: &str = "/api/comparison_history/thumbnails";
pub const DELETE_COMPARISON: &str = "/api/comparison_history/{comparison_id}";

/// `{name}` プレースホルダを置換したパスを返す
///
/// 値はパスセグメントとしてパーセントエンコードする
///
/// # Examples
/// ```
/// use objects_counter_common::endpoints::{fill, GET_RESULT};
///
/// assert_eq!(fill(GET_RESULT, &[("result_id", "12")]), "/api/results/12");
/// ```
pub fn fill(template: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(template.to_string(), |path, (name, value)| {
        path.replace(&format!("{{{}}}", name), &encode_segment(value))
    })
}

fn encode_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
