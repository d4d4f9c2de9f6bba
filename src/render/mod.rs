//! # 合成模块（render）
//!
//! ## 设计思路
//!
//! 调度流水线只依赖 `Renderer` trait：
//!
//! - `compose`：把解析好的图层列表合成为一张画布（即预览图）。
//! - `draw_content`：在预览图上绘制本次捕获的文字与图片。
//!
//! 合成失败以 `Err` 返回，由流水线转换为“生成失败”状态，不会越过边界。
//! `BasicRenderer` 是基于 `image` + `fontdue` 的参考实现，测试中也可以换成假实现。

mod basic;
mod color;
mod text;

use image::RgbaImage;

use crate::config::CanvasSize;
use crate::error::AppError;
use crate::resolver::ResolvedLayer;

pub use basic::BasicRenderer;
pub use color::parse_hex_color;

/// 外部合成器契约。
pub trait Renderer: Send + Sync {
    /// 按顺序合成图层；`ReuseCache` 表示复用上一帧对应的静态段。
    fn compose(&self, canvas: CanvasSize, layers: &[ResolvedLayer]) -> Result<RgbaImage, AppError>;

    /// 在底图上绘制文字与（可选的）图片。
    fn draw_content(
        &self,
        base: &RgbaImage,
        text: &str,
        image: Option<&RgbaImage>,
    ) -> Result<RgbaImage, AppError>;
}
