//! # 解码与缩放
//!
//! ## 设计思路
//!
//! 将“文件 → 图像 → RGBA”的过程集中管理，缓存只保存处理完成的 RGBA 母版。
//! 缩放优先走 `fast_image_resize`（SIMD 卷积），失败时回退
//! `image::imageops::resize`，保证总能得到结果。

use std::path::Path;

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{ImageBuffer, Rgba, RgbaImage};

use crate::error::AppError;

/// 缺失资源时的占位图尺寸。
pub(crate) const PLACEHOLDER_SIZE: (u32, u32) = (800, 600);

/// 读取文件并转换为 RGBA。
pub(crate) fn decode_rgba(path: &Path) -> Result<RgbaImage, AppError> {
    let decoded = image::open(path)
        .map_err(|e| AppError::Image(format!("图片解码失败 {}: {}", path.display(), e)))?;
    Ok(decoded.to_rgba8())
}

/// 完全透明的占位图。
pub(crate) fn placeholder() -> RgbaImage {
    RgbaImage::new(PLACEHOLDER_SIZE.0, PLACEHOLDER_SIZE.1)
}

/// 等比缩放到指定宽度。
pub(crate) fn resize_to_width(image: RgbaImage, target_width: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width == target_width || width == 0 {
        return image;
    }
    let ratio = target_width as f64 / width as f64;
    let target_height = ((height as f64 * ratio) as u32).max(1);
    resize_exact(&image, target_width, target_height)
}

/// 按比例缩放；比例为 1 或非法时原样返回。
pub(crate) fn scale_by(image: RgbaImage, scale: f32) -> RgbaImage {
    if !scale.is_finite() || scale <= 0.0 || (scale - 1.0).abs() < f32::EPSILON {
        return image;
    }
    let (width, height) = image.dimensions();
    let target_width = ((width as f32 * scale) as u32).max(1);
    let target_height = ((height as f32 * scale) as u32).max(1);
    resize_exact(&image, target_width, target_height)
}

/// 等比缩放到能放进 `max_w × max_h` 的最大尺寸。
pub(crate) fn fit_within(image: &RgbaImage, max_w: u32, max_h: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || max_w == 0 || max_h == 0 {
        return image.clone();
    }
    let scale = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    let target_width = ((width as f64 * scale) as u32).max(1);
    let target_height = ((height as f64 * scale) as u32).max(1);
    resize_exact(image, target_width, target_height)
}

pub(crate) fn resize_exact(image: &RgbaImage, target_width: u32, target_height: u32) -> RgbaImage {
    if image.dimensions() == (target_width, target_height) {
        return image.clone();
    }
    match resize_with_fast_image_resize(image, target_width, target_height) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize：{}", err);
            image::imageops::resize(image, target_width, target_height, FilterType::Lanczos3)
        }
    }
}

fn resize_with_fast_image_resize(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage, AppError> {
    let (src_width, src_height) = image.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| AppError::Image(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| AppError::Image(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| AppError::Image("fast_image_resize 输出缓冲长度异常".to_string()))
}
