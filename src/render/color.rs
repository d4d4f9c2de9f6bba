use image::Rgba;

use crate::error::AppError;

/// 解析 `#RRGGBB` / `#RRGGBBAA`。
pub fn parse_hex_color(value: &str) -> Result<Rgba<u8>, AppError> {
    let hex = value.trim().trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(|| AppError::Render(format!("无效的颜色值: {}", value)))
    };

    match hex.len() {
        6 => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
        8 => Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => Err(AppError::Render(format!("无效的颜色值: {}", value))),
    }
}
