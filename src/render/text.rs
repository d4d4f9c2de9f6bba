//! # 文字栅格化（fontdue）
//!
//! 逐字符栅格化并按覆盖率与目标像素做 alpha 混合。中文没有空格分词，
//! 所以按字符宽度折行；`\n` 强制换行；超出区域高度的行直接丢弃。

use fontdue::Font;
use image::{Rgba, RgbaImage};

use crate::config::Region;

struct LineMetrics {
    ascent: f32,
    line_height: f32,
}

fn line_metrics(font: &Font, size: f32) -> LineMetrics {
    match font.horizontal_line_metrics(size) {
        Some(m) => LineMetrics {
            ascent: m.ascent,
            line_height: m.new_line_size.max(size),
        },
        None => LineMetrics {
            ascent: size * 0.8,
            line_height: size * 1.2,
        },
    }
}

/// 单行宽度（像素）。
pub fn measure(font: &Font, size: f32, line: &str) -> f32 {
    line.chars().map(|ch| font.metrics(ch, size).advance_width).sum()
}

/// 按最大宽度折行。
pub fn wrap_lines(font: &Font, size: f32, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut width = 0.0f32;
        for ch in paragraph.chars() {
            let advance = font.metrics(ch, size).advance_width;
            if width + advance > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(ch);
            width += advance;
        }
        lines.push(current);
    }

    lines
}

/// 在区域内从左上角开始绘制折行后的文本。
pub fn draw_text_in_region(
    canvas: &mut RgbaImage,
    font: &Font,
    size: f32,
    color: Rgba<u8>,
    region: Region,
    text: &str,
) -> usize {
    let metrics = line_metrics(font, size);
    let max_lines = ((region.height as f32) / metrics.line_height).floor().max(1.0) as usize;
    let lines = wrap_lines(font, size, text, region.width as f32);

    if lines.len() > max_lines {
        log::warn!("⚠️ 文本超出文本框，截断显示 lines={} max={}", lines.len(), max_lines);
    }

    let mut drawn = 0;
    for (row, line) in lines.iter().take(max_lines).enumerate() {
        let baseline = region.y as f32 + metrics.ascent + row as f32 * metrics.line_height;
        draw_line(canvas, font, size, color, region.x as f32, baseline, line);
        drawn += 1;
    }
    drawn
}

/// 单行文字在 `target` 内水平、垂直居中。
pub fn draw_centered(canvas: &mut RgbaImage, font: &Font, size: f32, color: Rgba<u8>, text: &str) {
    let metrics = line_metrics(font, size);
    let (width, height) = canvas.dimensions();
    let x = (width as f32 - measure(font, size, text)) / 2.0;
    let baseline = (height as f32 - metrics.line_height) / 2.0 + metrics.ascent;
    draw_line(canvas, font, size, color, x, baseline, text);
}

fn draw_line(
    canvas: &mut RgbaImage,
    font: &Font,
    size: f32,
    color: Rgba<u8>,
    x: f32,
    baseline: f32,
    line: &str,
) {
    let mut pen_x = x;
    for ch in line.chars() {
        let (metrics, bitmap) = font.rasterize(ch, size);
        let left = (pen_x + metrics.xmin as f32).round() as i64;
        let top = (baseline - (metrics.height as i32 + metrics.ymin) as f32).round() as i64;

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let coverage = bitmap[gy * metrics.width + gx];
                if coverage == 0 {
                    continue;
                }
                blend_pixel(canvas, left + gx as i64, top + gy as i64, color, coverage);
            }
        }
        pen_x += metrics.advance_width;
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: u8) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let src_a = (color.0[3] as f32 / 255.0) * (coverage as f32 / 255.0);
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    for i in 0..3 {
        let src_c = color.0[i] as f32 * src_a;
        let dst_c = dst.0[i] as f32 * dst_a * (1.0 - src_a);
        dst.0[i] = ((src_c + dst_c) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}
