//! 解析完成、可直接交给渲染器的图层列表。

use crate::config::{Align, TextConfig};

/// 背景填充方式。
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundFill {
    None,
    /// 背景名称（`assets/background` 下）。
    Image(String),
    /// `#RRGGBB` / `#RRGGBBAA` 纯色。
    Color(String),
}

/// 按组件类型区分的已解析参数。
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Character {
        character_name: String,
        emotion_index: u32,
        /// 角色基础缩放（已在缓存解码时应用，这里供渲染器参考）。
        character_scale: f32,
        /// 角色基础偏移 + 表情偏移。
        character_offset: (f32, f32),
    },
    Background(BackgroundFill),
    Textbox {
        overlay: String,
        align: Align,
    },
    Namebox {
        overlay: String,
        align: Align,
        display_name: String,
        text: TextConfig,
        font_name: String,
    },
    Extra {
        overlay: String,
        align: Align,
    },
}

/// 单个已解析组件。
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedComponent {
    pub layer: i32,
    pub scale: f32,
    pub offset: (f32, f32),
    /// 静态图层可被渲染器缓存，并在下一帧以 `ReuseCache` 代替。
    pub is_static: bool,
    pub kind: ResolvedKind,
}

/// 渲染器输入的一项。
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedLayer {
    /// 复用上一帧中对应位置的静态图层段，跳过重新合成。
    ReuseCache,
    Component(ResolvedComponent),
}

impl ResolvedLayer {
    pub fn is_reuse_marker(&self) -> bool {
        matches!(self, Self::ReuseCache)
    }

    pub fn component(&self) -> Option<&ResolvedComponent> {
        match self {
            Self::Component(c) => Some(c),
            Self::ReuseCache => None,
        }
    }
}
