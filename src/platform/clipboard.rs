//! 基于 `arboard` 的系统剪贴板。
//!
//! 每次操作都新建 `arboard::Clipboard`，不跨线程持有句柄。

use std::borrow::Cow;

use image::RgbaImage;

use crate::error::AppError;
use crate::pipeline::ClipboardAccess;

#[derive(Debug, Default, Clone, Copy)]
pub struct ArboardClipboard;

impl ArboardClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<arboard::Clipboard, AppError> {
        arboard::Clipboard::new().map_err(|e| AppError::Clipboard(format!("无法访问剪贴板：{}", e)))
    }
}

fn to_rgba(data: arboard::ImageData<'_>) -> Option<RgbaImage> {
    let width = u32::try_from(data.width).ok()?;
    let height = u32::try_from(data.height).ok()?;
    RgbaImage::from_raw(width, height, data.bytes.into_owned())
}

impl ClipboardAccess for ArboardClipboard {
    fn clear(&self) -> Result<(), AppError> {
        Self::open()?
            .clear()
            .map_err(|e| AppError::Clipboard(format!("清空剪贴板失败：{}", e)))
    }

    fn text_and_image(&self) -> Result<(Option<String>, Option<RgbaImage>), AppError> {
        let mut clipboard = Self::open()?;
        let text = clipboard.get_text().ok();
        let image = clipboard.get_image().ok().and_then(|data| {
            let converted = to_rgba(data);
            if converted.is_none() {
                log::warn!("⚠️ 剪贴板图片像素数据长度异常，忽略图片");
            }
            converted
        });
        Ok((text, image))
    }

    fn copy_image(&self, image: &RgbaImage) -> Result<(), AppError> {
        let (width, height) = image.dimensions();
        let image_data = arboard::ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Borrowed(image.as_raw()),
        };

        Self::open()?
            .set_image(image_data)
            .map_err(|e| AppError::Clipboard(format!("复制失败：{}", e)))?;
        log::debug!("📋 图片已写入剪贴板 - {}x{}", width, height);
        Ok(())
    }

    fn has_image(&self) -> bool {
        Self::open()
            .map(|mut clipboard| clipboard.get_image().is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_data_converts_to_rgba() {
        let data = arboard::ImageData {
            width: 2,
            height: 1,
            bytes: Cow::Owned(vec![255, 0, 0, 255, 0, 255, 0, 128]),
        };
        let image = to_rgba(data).expect("valid buffer");
        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.get_pixel(1, 0).0, [0, 255, 0, 128]);
    }

    #[test]
    fn truncated_image_data_is_rejected() {
        let data = arboard::ImageData {
            width: 4,
            height: 4,
            bytes: Cow::Owned(vec![0; 8]),
        };
        assert!(to_rgba(data).is_none());
    }
}
