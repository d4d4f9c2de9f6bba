//! 上一帧静态图层的“指纹”。
//!
//! 只有当本帧的静态组件与上一帧完全一致时，解析器才允许输出 `ReuseCache`；
//! 任何静态组件参数变化（包括情感匹配写入的强制表情）都会让指纹不同，
//! 从而退回完整合成。

use std::collections::BTreeMap;

use super::resolve::is_static_component;
use crate::config::{AppConfig, CharacterProfile, VisualComponent};

/// 静态图层指纹，按值比较。
#[derive(Debug, Clone, PartialEq)]
pub struct FrameKey {
    aspect_ratio: String,
    active_character: String,
    /// 启用组件按 `layer` 排序；静态组件保留完整参数，动态组件只占位。
    slots: Vec<Option<VisualComponent>>,
    profiles: BTreeMap<String, CharacterProfile>,
}

impl FrameKey {
    pub fn capture(components: &[VisualComponent], config: &AppConfig) -> Self {
        let mut ordered: Vec<&VisualComponent> = components.iter().filter(|c| c.enabled).collect();
        ordered.sort_by_key(|c| c.layer);

        let slots = ordered
            .into_iter()
            .map(|c| is_static_component(c).then(|| c.clone()))
            .collect();

        Self {
            aspect_ratio: config.style.aspect_ratio.clone(),
            active_character: config.active_character(),
            slots,
            profiles: config.characters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComponentKind;

    #[test]
    fn dynamic_choices_do_not_change_key() {
        let config = AppConfig::default();
        let mut components = config.sorted_components();
        let before = FrameKey::capture(&components, &config);

        for component in components.iter_mut() {
            if let Some(layer) = component.as_character_mut() {
                layer.emotion_index = Some(5);
            }
        }
        assert_eq!(before, FrameKey::capture(&components, &config));
    }

    #[test]
    fn forced_emotion_changes_key() {
        let config = AppConfig::default();
        let mut components = config.sorted_components();
        for component in components.iter_mut() {
            if let Some(layer) = component.as_character_mut() {
                layer.use_fixed_character = true;
                layer.emotion_index = Some(2);
            }
        }
        let before = FrameKey::capture(&components, &config);

        for component in components.iter_mut() {
            if let Some(layer) = component.as_character_mut() {
                layer.force_use = true;
            }
        }
        assert_ne!(before, FrameKey::capture(&components, &config));
    }

    #[test]
    fn style_overlay_change_changes_key() {
        let config = AppConfig::default();
        let mut components = config.sorted_components();
        let before = FrameKey::capture(&components, &config);
        for component in components.iter_mut() {
            if let ComponentKind::Textbox(overlay) = &mut component.kind {
                overlay.overlay = "other.png".to_string();
            }
        }
        assert_ne!(before, FrameKey::capture(&components, &config));
    }
}
