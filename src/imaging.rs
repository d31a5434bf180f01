//! 画像データの変換
//!
//! - アップロードする画像ファイル → 表示用data URL + サイズ
//! - 背景マスク（bool配列） → PNGのdata URL

use crate::error::{ClientError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{GenericImageView, ImageFormat, RgbaImage};
use objects_counter_common::MaskBitmap;
use std::io::Cursor;
use std::path::Path;

/// アップロード用に読み込んだ画像（またはサーバーから取得した画像）
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl LoadedImage {
    pub fn data_url(&self) -> String {
        data_url(self.mime_type, &self.bytes)
    }
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

fn mime_type_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}

/// 画像ファイルを読み込み、形式とサイズを確認
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    image_from_bytes(file_name, bytes)
}

/// バイト列から形式とサイズを判定
pub fn image_from_bytes(file_name: String, bytes: Vec<u8>) -> Result<LoadedImage> {
    let format = image::guess_format(&bytes)?;
    let (width, height) = image::load_from_memory_with_format(&bytes, format)?.dimensions();

    Ok(LoadedImage {
        file_name,
        bytes,
        mime_type: mime_type_for(format),
        width,
        height,
    })
}

/// 背景マスクをPNGのdata URLにする
pub fn mask_to_png_data_url(mask: &[Vec<bool>]) -> Result<String> {
    let bitmap = MaskBitmap::from_rows(mask)?;
    let buffer = RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.rgba)
        .ok_or_else(|| ClientError::InvalidState("mask buffer size mismatch".into()))?;

    let mut png = Cursor::new(Vec::new());
    buffer.write_to(&mut png, ImageFormat::Png)?;
    Ok(data_url("image/png", png.get_ref()))
}

/// data URLからバイト列を取り出す
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let (_, payload) = data_url.split_once(";base64,")?;
    STANDARD.decode(payload).ok()
}
