//! 背景マスクのビットマップ変換
//!
//! サーバーが返す `bool` の2次元配列を RGBA バッファにする。
//! 前景ピクセルは全チャンネル255、それ以外は全チャンネル0。

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBitmap {
    pub width: u32,
    pub height: u32,
    /// 行優先の RGBA（1ピクセル4バイト）
    pub rgba: Vec<u8>,
}

impl MaskBitmap {
    pub fn from_rows(mask: &[Vec<bool>]) -> Result<Self> {
        let first = mask
            .first()
            .ok_or_else(|| Error::Parse("mask has no rows".into()))?;
        let width = first.len();
        if width == 0 {
            return Err(Error::Parse("mask has empty rows".into()));
        }
        if let Some((y, row)) = mask.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(Error::Parse(format!(
                "mask row {} has {} columns, expected {}",
                y,
                row.len(),
                width
            )));
        }

        let rgba = mask
            .iter()
            .flat_map(|row| row.iter())
            .flat_map(|&set| [u8::from(set) * 255; 4])
            .collect();

        Ok(Self {
            width: width as u32,
            height: mask.len() as u32,
            rgba,
        })
    }

    /// 前景ピクセル数
    pub fn foreground_pixels(&self) -> usize {
        self.rgba.chunks_exact(4).filter(|px| px[3] == 255).count()
    }
}
