use crate::error::{ClientError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| is_image_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

/// 引数のパスからアップロード対象の画像を集める
///
/// ファイルはそのまま（拡張子チェックなし）、フォルダは直下の画像を
/// ファイル名順で追加する。`recursive` でサブフォルダも対象にする
pub fn collect_images(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(ClientError::PathNotFound(path.display().to_string()));
        }
        if path.is_file() {
            images.push(path.clone());
        } else {
            images.extend(scan_folder(path, recursive));
        }
    }

    if images.is_empty() {
        let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        return Err(ClientError::NoImagesFound(joined.join(", ")));
    }
    Ok(images)
}

fn scan_folder(folder: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();

    images.sort();
    images
}
