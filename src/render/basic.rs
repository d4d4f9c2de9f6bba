//! # 参考合成器
//!
//! ## 设计思路
//!
//! 按图层顺序把每个组件画成“精灵图 + 左上角坐标”，再叠加到画布上。
//! 连续的静态组件同时叠加到一张透明的“静态段”上，合成完成后保存；
//! 下一帧输入中的每个 `ReuseCache` 按顺序取回一段直接贴上。
//!
//! ## 实现思路
//!
//! - 输入里没有 `ReuseCache`：清空旧的静态段，本帧重新划分并保存。
//! - 输入里有 `ReuseCache`：只读取旧段，不再更新。标记数多于已保存段数时返回错误，
//!   由调用方让帧缓存失效后重来。
//! - 最近一次完整合成结果作为 `draw_content` 的底图。

use std::sync::{Arc, Mutex};

use image::imageops;
use image::{Rgba, RgbaImage};

use super::Renderer;
use super::color::parse_hex_color;
use super::text;
use crate::cache::{CacheManager, fit_within, scale_by};
use crate::config::{Align, CanvasSize, ConfigStore, Region};
use crate::error::AppError;
use crate::resolver::{BackgroundFill, ResolvedComponent, ResolvedKind, ResolvedLayer};

/// 一个待叠加的精灵图。
struct Sprite {
    image: RgbaImage,
    x: i64,
    y: i64,
}

pub struct BasicRenderer {
    cache: Arc<CacheManager>,
    store: ConfigStore,
    static_segments: Mutex<Vec<RgbaImage>>,
}

impl BasicRenderer {
    pub fn new(cache: Arc<CacheManager>, store: ConfigStore) -> Self {
        Self {
            cache,
            store,
            static_segments: Mutex::new(Vec::new()),
        }
    }

    /// 当前保存的静态段数量。
    pub fn static_segment_count(&self) -> usize {
        self.static_segments.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn draw_component(
        &self,
        canvas: CanvasSize,
        component: &ResolvedComponent,
    ) -> Result<Option<Sprite>, AppError> {
        let target = (canvas.width, canvas.height);

        let sprite = match &component.kind {
            ResolvedKind::Background(BackgroundFill::None) => None,
            ResolvedKind::Background(BackgroundFill::Color(value)) => {
                let color = parse_hex_color(value)?;
                Some(Sprite {
                    image: RgbaImage::from_pixel(canvas.width, canvas.height, color),
                    x: 0,
                    y: 0,
                })
            }
            ResolvedKind::Background(BackgroundFill::Image(name)) => {
                let image = scale_by(self.cache.background(name), component.scale);
                Some(place(image, Align::TopLeft, target, component.offset))
            }
            ResolvedKind::Character {
                character_name,
                emotion_index,
                character_offset,
                ..
            } => {
                let image = scale_by(self.cache.character(character_name, *emotion_index), component.scale);
                let offset = (
                    component.offset.0 + character_offset.0,
                    component.offset.1 + character_offset.1,
                );
                Some(place(image, Align::TopLeft, target, offset))
            }
            ResolvedKind::Textbox { overlay, align } | ResolvedKind::Extra { overlay, align } => {
                if overlay.is_empty() {
                    None
                } else {
                    let image = scale_by(self.cache.image(overlay), component.scale);
                    Some(place(image, *align, target, component.offset))
                }
            }
            ResolvedKind::Namebox {
                overlay,
                align,
                display_name,
                text: text_config,
                font_name,
            } => {
                if overlay.is_empty() {
                    None
                } else {
                    let mut image = self.cache.image(overlay);
                    match self.cache.font(font_name, text_config.font_size) {
                        Some(font) => {
                            let color = parse_hex_color(&text_config.color)?;
                            text::draw_centered(
                                &mut image,
                                &font,
                                text_config.font_size as f32,
                                color,
                                display_name,
                            );
                        }
                        None => log::warn!("⚠️ 名字框字体缺失，只绘制底图: {}", font_name),
                    }
                    let image = scale_by(image, component.scale);
                    Some(place(image, *align, target, component.offset))
                }
            }
        };

        Ok(sprite)
    }
}

fn place(image: RgbaImage, align: Align, target: (u32, u32), offset: (f32, f32)) -> Sprite {
    let (x, y) = align.position(target, image.dimensions(), offset);
    Sprite { image, x, y }
}

/// 等比缩放后在区域内居中贴图。
fn paste_fitted(canvas: &mut RgbaImage, image: &RgbaImage, region: Region) {
    let fitted = fit_within(image, region.width, region.height);
    let (w, h) = fitted.dimensions();
    let x = region.x as i64 + (region.width as i64 - w as i64) / 2;
    let y = region.y as i64 + (region.height as i64 - h as i64) / 2;
    imageops::overlay(canvas, &fitted, x, y);
}

impl Renderer for BasicRenderer {
    fn compose(&self, canvas: CanvasSize, layers: &[ResolvedLayer]) -> Result<RgbaImage, AppError> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(AppError::Render(format!(
                "画布尺寸无效: {}x{}",
                canvas.width, canvas.height
            )));
        }

        let reuse = layers.iter().any(ResolvedLayer::is_reuse_marker);
        let mut segments = self.static_segments.lock().unwrap_or_else(|e| e.into_inner());

        let mut output = RgbaImage::new(canvas.width, canvas.height);
        let mut fresh_segments = Vec::new();
        let mut current_segment: Option<RgbaImage> = None;
        let mut next_cached = 0usize;

        for layer in layers {
            let component = match layer {
                ResolvedLayer::ReuseCache => {
                    let segment = segments.get(next_cached).ok_or_else(|| {
                        AppError::Render(format!("静态图层缓存缺失: 第 {} 段", next_cached + 1))
                    })?;
                    imageops::overlay(&mut output, segment, 0, 0);
                    next_cached += 1;
                    continue;
                }
                ResolvedLayer::Component(component) => component,
            };

            if !reuse {
                if component.is_static {
                    if current_segment.is_none() {
                        current_segment = Some(RgbaImage::new(canvas.width, canvas.height));
                    }
                } else if let Some(segment) = current_segment.take() {
                    fresh_segments.push(segment);
                }
            }

            let Some(sprite) = self.draw_component(canvas, component)? else {
                continue;
            };
            imageops::overlay(&mut output, &sprite.image, sprite.x, sprite.y);
            if let Some(segment) = current_segment.as_mut() {
                imageops::overlay(segment, &sprite.image, sprite.x, sprite.y);
            }
        }

        if !reuse {
            if let Some(segment) = current_segment.take() {
                fresh_segments.push(segment);
            }
            log::debug!("🧩 静态图层分段已更新 segments={}", fresh_segments.len());
            *segments = fresh_segments;
        }

        Ok(output)
    }

    fn draw_content(
        &self,
        base: &RgbaImage,
        content: &str,
        image: Option<&RgbaImage>,
    ) -> Result<RgbaImage, AppError> {
        let config = self.store.snapshot();
        let style = &config.style;
        let mut canvas = base.clone();
        let has_text = !content.trim().is_empty();

        if let Some(image) = image {
            // 只有图片时占用文本框区域
            let region = if has_text { style.paste_region } else { style.text_region };
            paste_fitted(&mut canvas, image, region);
        }

        if has_text {
            match self.cache.font(&style.font_family, style.font_size) {
                Some(font) => {
                    let color = parse_hex_color(&style.text_color)?;
                    text::draw_text_in_region(
                        &mut canvas,
                        &font,
                        style.font_size as f32,
                        color,
                        style.text_region,
                        content,
                    );
                }
                None => log::warn!("⚠️ 正文字体缺失，跳过文字绘制: {}", style.font_family),
            }
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, TextConfig};
    use std::path::Path;

    fn write_png(path: &Path, width: u32, height: u32, color: Rgba<u8>) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        RgbaImage::from_pixel(width, height, color).save(path).expect("write png");
    }

    fn renderer() -> (tempfile::TempDir, BasicRenderer) {
        let dir = tempfile::tempdir().expect("temp dir");
        write_png(&dir.path().join("shader/box.png"), 20, 10, Rgba([0, 0, 255, 255]));
        let store = ConfigStore::in_memory(AppConfig {
            assets_path: dir.path().to_path_buf(),
            ..Default::default()
        });
        let cache = Arc::new(CacheManager::new(store.clone()));
        (dir, BasicRenderer::new(cache, store))
    }

    fn canvas() -> CanvasSize {
        CanvasSize { width: 40, height: 30 }
    }

    fn component(kind: ResolvedKind, is_static: bool) -> ResolvedLayer {
        ResolvedLayer::Component(ResolvedComponent {
            layer: 0,
            scale: 1.0,
            offset: (0.0, 0.0),
            is_static,
            kind,
        })
    }

    fn color_bg(value: &str) -> ResolvedLayer {
        component(ResolvedKind::Background(BackgroundFill::Color(value.to_string())), false)
    }

    fn textbox(align: Align) -> ResolvedLayer {
        component(
            ResolvedKind::Textbox {
                overlay: "box.png".to_string(),
                align,
            },
            true,
        )
    }

    #[test]
    fn solid_background_fills_canvas() {
        let (_dir, renderer) = renderer();
        let image = renderer.compose(canvas(), &[color_bg("#FF0000")]).expect("compose");
        assert_eq!(image.dimensions(), (40, 30));
        assert!(image.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn overlay_respects_alignment() {
        let (_dir, renderer) = renderer();
        let image = renderer.compose(canvas(), &[textbox(Align::BottomRight)]).expect("compose");
        assert_eq!(image.get_pixel(39, 29), &Rgba([0, 0, 255, 255]));
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn reuse_marker_replays_saved_static_segment() {
        let (_dir, renderer) = renderer();
        let full = renderer
            .compose(canvas(), &[color_bg("#00FF00"), textbox(Align::TopLeft)])
            .expect("compose");
        assert_eq!(renderer.static_segment_count(), 1);

        let reused = renderer
            .compose(canvas(), &[color_bg("#00FF00"), ResolvedLayer::ReuseCache])
            .expect("compose");
        assert_eq!(full, reused);
        assert_eq!(renderer.static_segment_count(), 1);
    }

    #[test]
    fn reuse_marker_without_segments_is_an_error() {
        let (_dir, renderer) = renderer();
        assert!(renderer.compose(canvas(), &[ResolvedLayer::ReuseCache]).is_err());
    }

    #[test]
    fn invalid_color_fails_composition() {
        let (_dir, renderer) = renderer();
        assert!(renderer.compose(canvas(), &[color_bg("#zz")]).is_err());
    }

    #[test]
    fn namebox_without_font_still_draws_overlay() {
        let (_dir, renderer) = renderer();
        let layer = component(
            ResolvedKind::Namebox {
                overlay: "box.png".to_string(),
                align: Align::TopLeft,
                display_name: "艾玛".to_string(),
                text: TextConfig::default(),
                font_name: "missing".to_string(),
            },
            true,
        );
        let image = renderer.compose(canvas(), &[layer]).expect("compose");
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn pasted_image_is_centered_in_text_region_when_alone() {
        let (_dir, renderer) = renderer();
        renderer.store.update(|cfg| {
            cfg.style.text_region = Region {
                x: 0,
                y: 0,
                width: 20,
                height: 20,
            };
        });
        let base = RgbaImage::new(40, 30);
        let pasted = RgbaImage::from_pixel(10, 5, Rgba([9, 9, 9, 255]));
        let image = renderer.draw_content(&base, "", Some(&pasted)).expect("draw");
        // 10x5 放大到 20x10，垂直居中
        assert_eq!(image.get_pixel(10, 10), &Rgba([9, 9, 9, 255]));
        assert_eq!(image.get_pixel(10, 2).0[3], 0);
    }
}
