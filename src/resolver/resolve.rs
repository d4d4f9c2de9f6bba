//! # 帧参数解析
//!
//! ## 设计思路
//!
//! 输入：按 `layer` 排好序的组件工作副本 + 当前配置快照 + “上一帧是否可复用”。
//! 输出：不含任何随机性的图层列表。
//!
//! ## 实现思路
//!
//! 1. 跳过未启用组件。
//! 2. 判断组件是否静态：文本框/名字框/额外贴图总是静态；
//!    固定表情且已有表情序号、且没有待消费的强制覆盖的角色是静态；
//!    固定背景且 overlay 非空的背景是静态。
//! 3. 上一帧可复用时，连续的静态组件压缩成一个 `ReuseCache` 标记。
//! 4. 其余组件按类型解析，并把结果写回工作副本，保证同一会话内重复解析幂等。
//!
//! 随机源是可注入种子的 `StdRng`，固定种子时结果可复现。

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::layer::{BackgroundFill, ResolvedComponent, ResolvedKind, ResolvedLayer};
use crate::config::{
    AppConfig, BackgroundLayer, CharacterLayer, CharacterProfile, ComponentKind, TextConfig,
    VisualComponent,
};

/// 名字框固定使用的字体。
pub const NAMEBOX_FONT: &str = "font3";

/// 一次解析的结果。
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub layers: Vec<ResolvedLayer>,
    pub character_info: String,
    pub background_info: String,
}

impl Resolution {
    /// 没有任何启用组件时的结果。
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 是否压缩过静态图层。
    pub fn uses_cached_frame(&self) -> bool {
        self.layers.iter().any(ResolvedLayer::is_reuse_marker)
    }

    pub fn summary(&self) -> String {
        format!("{} | {}", self.character_info, self.background_info)
    }
}

/// 情感匹配为某个角色图层选定的表情。
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentPick {
    pub layer: i32,
    pub character_name: String,
    pub display_name: String,
    pub emotion_index: u32,
}

/// 帧参数解析器。
pub struct FrameResolver {
    rng: StdRng,
}

impl Default for FrameResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameResolver {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// 固定种子，便于复现。
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 解析组件列表为图层列表，同时写回工作副本。
    pub fn resolve(
        &mut self,
        components: &mut [VisualComponent],
        config: &AppConfig,
        reuse_cached_frame: bool,
    ) -> Resolution {
        let active_character = config.active_character();
        let mut layers = Vec::new();
        let mut character_info = String::new();
        let mut background_info = String::new();
        let mut compressing = false;

        let mut order: Vec<usize> = (0..components.len()).collect();
        order.sort_by_key(|&i| components[i].layer);

        for index in order {
            let component = &mut components[index];
            if !component.enabled {
                continue;
            }

            let is_static = is_static_component(component);
            if reuse_cached_frame && is_static {
                if !compressing {
                    layers.push(ResolvedLayer::ReuseCache);
                    compressing = true;
                }
                continue;
            }
            compressing = false;

            let layer = component.layer;
            let scale = component.scale;
            let offset = (component.offset_x, component.offset_y);

            let kind = match &mut component.kind {
                ComponentKind::Character(character) => {
                    let (kind, info) = self.resolve_character(character, config, &active_character);
                    character_info = info;
                    kind
                }
                ComponentKind::Background(background) => {
                    let (kind, info) = self.resolve_background(background, config);
                    if let Some(info) = info {
                        background_info = info;
                    }
                    kind
                }
                ComponentKind::Textbox(overlay) => ResolvedKind::Textbox {
                    overlay: overlay.overlay.clone(),
                    align: overlay.align,
                },
                ComponentKind::Namebox(overlay) => {
                    let profile = config.character(&active_character);
                    ResolvedKind::Namebox {
                        overlay: overlay.overlay.clone(),
                        align: overlay.align,
                        display_name: profile
                            .map(|p| p.display_name(&active_character).to_string())
                            .unwrap_or_else(|| active_character.clone()),
                        text: profile.map(|p| p.text.clone()).unwrap_or_else(TextConfig::default),
                        font_name: NAMEBOX_FONT.to_string(),
                    }
                }
                ComponentKind::Extra(overlay) => ResolvedKind::Extra {
                    overlay: overlay.overlay.clone(),
                    align: overlay.align,
                },
            };

            // 解析后再判定一次：渲染器据此划分可复用的静态段
            let cacheable = is_static_component(component);
            layers.push(ResolvedLayer::Component(ResolvedComponent {
                layer,
                scale,
                offset,
                is_static: cacheable,
                kind,
            }));
        }

        if character_info.is_empty() {
            character_info = "角色: 无".to_string();
        }
        if background_info.is_empty() {
            background_info = "背景: 无".to_string();
        }

        Resolution {
            layers,
            character_info,
            background_info,
        }
    }

    /// 在筛选范围内随机挑选表情；筛选结果为空时在 `1..=emotion_count` 内均匀挑选。
    pub fn pick_emotion(&mut self, profile: Option<&CharacterProfile>, filter: &str) -> u32 {
        let filtered = profile.map(|p| p.filtered_emotions(filter)).unwrap_or_default();
        if let Some(choice) = filtered.choose(&mut self.rng) {
            return *choice;
        }
        let count = profile.map(|p| p.emotion_count).unwrap_or(1).max(1);
        self.rng.gen_range(1..=count)
    }

    /// 情感匹配：为每个启用的角色图层挑选与情感词对应的表情，并标记强制使用。
    ///
    /// 筛选后没有可用表情的图层保持不变。
    pub fn apply_sentiment(
        &mut self,
        components: &mut [VisualComponent],
        config: &AppConfig,
        sentiment: &str,
    ) -> Vec<SentimentPick> {
        let active_character = config.active_character();
        let mut picks = Vec::new();

        for component in components.iter_mut().filter(|c| c.enabled) {
            let layer = component.layer;
            let Some(character) = component.as_character_mut() else {
                continue;
            };
            let name = character
                .character_name
                .clone()
                .unwrap_or_else(|| active_character.clone());
            let Some(profile) = config.character(&name) else {
                continue;
            };

            let available = profile.sentiment_emotions(sentiment, &character.emotion_filter);
            let Some(&emotion_index) = available.choose(&mut self.rng) else {
                continue;
            };

            character.emotion_index = Some(emotion_index);
            character.force_use = true;
            picks.push(SentimentPick {
                layer,
                display_name: profile.display_name(&name).to_string(),
                character_name: name,
                emotion_index,
            });
        }

        picks
    }

    fn resolve_character(
        &mut self,
        character: &mut CharacterLayer,
        config: &AppConfig,
        active_character: &str,
    ) -> (ResolvedKind, String) {
        let name = character
            .character_name
            .clone()
            .unwrap_or_else(|| active_character.to_string());
        let profile = config.character(&name);
        let display_name = profile
            .map(|p| p.display_name(&name).to_string())
            .unwrap_or_else(|| name.clone());

        let forced = if character.force_use {
            character.force_use = false;
            character.emotion_index
        } else {
            None
        };

        let (emotion_index, info) = match forced {
            Some(index) => (index, format!("角色: {}, 表情: {}(强制)", display_name, index)),
            None if character.use_fixed_character => {
                let index = match character.emotion_index {
                    Some(index) => index,
                    None => self.pick_emotion(profile, &character.emotion_filter),
                };
                (index, format!("角色: {}, 表情: {}", display_name, index))
            }
            None => {
                let index = self.pick_emotion(profile, &character.emotion_filter);
                (index, format!("角色: {}, 表情: 随机({})", display_name, index))
            }
        };

        character.emotion_index = Some(emotion_index);

        let character_scale = profile.map(|p| p.scale).unwrap_or(1.0);
        let character_offset = profile
            .map(|p| p.emotion_offset(emotion_index))
            .unwrap_or((0.0, 0.0));

        (
            ResolvedKind::Character {
                character_name: name,
                emotion_index,
                character_scale,
                character_offset,
            },
            info,
        )
    }

    fn resolve_background(
        &mut self,
        background: &mut BackgroundLayer,
        config: &AppConfig,
    ) -> (ResolvedKind, Option<String>) {
        if background.use_fixed_background && !background.overlay.is_empty() {
            let overlay = background.overlay.clone();
            if overlay.starts_with('#') {
                let info = format!("背景: 纯色({})", overlay);
                return (ResolvedKind::Background(BackgroundFill::Color(overlay)), Some(info));
            }
            let info = format!("背景: 图片({})", overlay);
            return (ResolvedKind::Background(BackgroundFill::Image(overlay)), Some(info));
        }

        match config.background_list.choose(&mut self.rng) {
            Some(choice) => {
                background.overlay = choice.clone();
                let info = format!("背景: 随机({})", choice);
                (ResolvedKind::Background(BackgroundFill::Image(choice.clone())), Some(info))
            }
            None => {
                background.overlay.clear();
                (ResolvedKind::Background(BackgroundFill::None), None)
            }
        }
    }
}

/// 静态组件在上一帧可复用时会被压缩为 `ReuseCache`。
pub(crate) fn is_static_component(component: &VisualComponent) -> bool {
    match &component.kind {
        ComponentKind::Character(c) => c.use_fixed_character && !c.force_use && c.emotion_index.is_some(),
        ComponentKind::Background(b) => b.use_fixed_background && !b.overlay.is_empty(),
        ComponentKind::Textbox(_) | ComponentKind::Namebox(_) | ComponentKind::Extra(_) => true,
    }
}

/// 把工作副本中需要持久化的用户覆盖（表情序号、强制标记）写回原组件，按 `layer` 匹配。
pub fn write_back_overrides(persisted: &mut [VisualComponent], working: &[VisualComponent]) {
    for resolved in working {
        let Some(source) = resolved.as_character() else {
            continue;
        };
        let target = persisted
            .iter_mut()
            .find(|c| c.layer == resolved.layer)
            .and_then(VisualComponent::as_character_mut);
        if let Some(target) = target {
            target.emotion_index = source.emotion_index;
            target.force_use = source.force_use;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ALL_EMOTIONS_FILTER, OverlayLayer};
    use proptest::prelude::*;

    fn config() -> AppConfig {
        let mut config = AppConfig {
            current_character: "ema".to_string(),
            background_list: vec!["c1".to_string(), "c2".to_string(), "c3".to_string()],
            ..Default::default()
        };
        let mut profile = CharacterProfile {
            full_name: "樱羽艾玛".to_string(),
            emotion_count: 8,
            scale: 0.8,
            offset: (100.0, 20.0),
            ..Default::default()
        };
        profile.offset_y.insert("2".to_string(), -15.0);
        profile.emotion_filters.insert("笑".to_string(), vec![2, 4]);
        profile.sentiments.insert("开心".to_string(), vec![2, 6]);
        config.characters.insert("ema".to_string(), profile);
        config
    }

    fn character(fixed: bool, emotion: Option<u32>, filter: &str) -> VisualComponent {
        VisualComponent::new(
            1,
            ComponentKind::Character(CharacterLayer {
                character_name: None,
                emotion_index: emotion,
                emotion_filter: filter.to_string(),
                use_fixed_character: fixed,
                force_use: false,
            }),
        )
    }

    fn background(fixed: bool, overlay: &str) -> VisualComponent {
        VisualComponent::new(
            0,
            ComponentKind::Background(BackgroundLayer {
                overlay: overlay.to_string(),
                use_fixed_background: fixed,
            }),
        )
    }

    fn textbox(layer: i32) -> VisualComponent {
        VisualComponent::new(layer, ComponentKind::Textbox(OverlayLayer::default()))
    }

    fn emotion_of(resolution: &Resolution) -> Option<u32> {
        resolution.layers.iter().find_map(|l| match l.component().map(|c| &c.kind) {
            Some(ResolvedKind::Character { emotion_index, .. }) => Some(*emotion_index),
            _ => None,
        })
    }

    #[test]
    fn same_seed_gives_same_choices() {
        let cfg = config();
        let mut a = vec![background(false, ""), character(false, None, ALL_EMOTIONS_FILTER)];
        let mut b = a.clone();

        let first = FrameResolver::with_seed(42).resolve(&mut a, &cfg, false);
        let second = FrameResolver::with_seed(42).resolve(&mut b, &cfg, false);

        assert_eq!(first, second);
        assert_eq!(a, b);
    }

    #[test]
    fn character_offset_combines_base_and_emotion_lookup() {
        let cfg = config();
        let mut components = vec![character(true, Some(2), ALL_EMOTIONS_FILTER)];
        let resolution = FrameResolver::with_seed(1).resolve(&mut components, &cfg, false);

        match &resolution.layers[0].component().expect("component").kind {
            ResolvedKind::Character {
                emotion_index,
                character_scale,
                character_offset,
                ..
            } => {
                assert_eq!(*emotion_index, 2);
                assert_eq!(*character_scale, 0.8);
                assert_eq!(*character_offset, (100.0, 5.0));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn fixed_character_keeps_first_choice_across_calls() {
        let cfg = config();
        let mut components = vec![character(true, None, "笑")];
        let mut resolver = FrameResolver::with_seed(7);

        let first = emotion_of(&resolver.resolve(&mut components, &cfg, false));
        for _ in 0..10 {
            let again = emotion_of(&resolver.resolve(&mut components, &cfg, false));
            assert_eq!(first, again);
        }
        assert!(matches!(first, Some(2) | Some(4)));
    }

    #[test]
    fn forced_emotion_is_used_once_and_cleared() {
        let cfg = config();
        let mut components = vec![character(false, None, ALL_EMOTIONS_FILTER)];
        if let Some(layer) = components[0].as_character_mut() {
            layer.emotion_index = Some(6);
            layer.force_use = true;
        }

        let resolution = FrameResolver::with_seed(3).resolve(&mut components, &cfg, true);
        assert_eq!(emotion_of(&resolution), Some(6));
        assert!(resolution.character_info.contains("强制"));
        assert!(!components[0].as_character().expect("character").force_use);
    }

    #[test]
    fn unknown_filter_falls_back_to_full_range() {
        let cfg = config();
        let mut resolver = FrameResolver::with_seed(9);
        for _ in 0..50 {
            let idx = resolver.pick_emotion(cfg.character("ema"), "不存在");
            assert!((1..=8).contains(&idx));
        }
        assert_eq!(resolver.pick_emotion(None, ALL_EMOTIONS_FILTER), 1);
    }

    #[test]
    fn fixed_color_background_is_used_verbatim() {
        let cfg = config();
        let mut components = vec![background(true, "#112233")];
        let resolution = FrameResolver::with_seed(1).resolve(&mut components, &cfg, false);
        assert_eq!(
            resolution.layers[0].component().expect("component").kind,
            ResolvedKind::Background(BackgroundFill::Color("#112233".to_string()))
        );
        assert_eq!(resolution.background_info, "背景: 纯色(#112233)");
    }

    #[test]
    fn empty_background_list_gives_empty_overlay() {
        let mut cfg = config();
        cfg.background_list.clear();
        let mut components = vec![background(false, "stale")];
        let resolution = FrameResolver::with_seed(1).resolve(&mut components, &cfg, false);
        assert_eq!(
            resolution.layers[0].component().expect("component").kind,
            ResolvedKind::Background(BackgroundFill::None)
        );
        match &components[0].kind {
            ComponentKind::Background(b) => assert!(b.overlay.is_empty()),
            _ => unreachable!(),
        }
        assert_eq!(resolution.background_info, "背景: 无");
    }

    #[test]
    fn reuse_compresses_static_runs_only() {
        let cfg = config();
        let mut components = vec![
            background(false, ""),
            character(true, Some(3), ALL_EMOTIONS_FILTER),
            textbox(2),
            textbox(3),
        ];
        components[1].layer = 1;

        let resolution = FrameResolver::with_seed(5).resolve(&mut components, &cfg, true);
        assert_eq!(resolution.layers.len(), 2);
        assert!(resolution.layers[0].component().is_some());
        assert!(resolution.layers[1].is_reuse_marker());
    }

    #[test]
    fn changed_components_are_never_compressed() {
        let cfg = config();
        let mut components = vec![character(true, None, ALL_EMOTIONS_FILTER), textbox(2)];
        let resolution = FrameResolver::with_seed(5).resolve(&mut components, &cfg, true);
        assert!(resolution.layers[0].component().is_some());
        assert!(resolution.layers[1].is_reuse_marker());

        let mut forced = vec![character(true, Some(1), ALL_EMOTIONS_FILTER)];
        if let Some(layer) = forced[0].as_character_mut() {
            layer.force_use = true;
        }
        let resolution = FrameResolver::with_seed(5).resolve(&mut forced, &cfg, true);
        assert!(!resolution.uses_cached_frame());
    }

    #[test]
    fn no_enabled_components_gives_empty_resolution() {
        let cfg = config();
        let mut components = vec![textbox(1)];
        components[0].enabled = false;
        let resolution = FrameResolver::with_seed(1).resolve(&mut components, &cfg, false);
        assert!(resolution.is_empty());
        assert_eq!(resolution.summary(), "角色: 无 | 背景: 无");
    }

    #[test]
    fn apply_sentiment_marks_force_use() {
        let cfg = config();
        let mut components = vec![character(false, None, ALL_EMOTIONS_FILTER)];
        let picks = FrameResolver::with_seed(2).apply_sentiment(&mut components, &cfg, "开心");
        assert_eq!(picks.len(), 1);
        assert!(matches!(picks[0].emotion_index, 2 | 6));
        let layer = components[0].as_character().expect("character");
        assert!(layer.force_use);
        assert_eq!(layer.emotion_index, Some(picks[0].emotion_index));
    }

    #[test]
    fn apply_sentiment_skips_layers_without_candidates() {
        let cfg = config();
        let mut components = vec![character(false, None, "笑")];
        let picks = FrameResolver::with_seed(2).apply_sentiment(&mut components, &cfg, "生气");
        assert!(picks.is_empty());
        assert!(!components[0].as_character().expect("character").force_use);
    }

    #[test]
    fn write_back_only_touches_override_fields() {
        let cfg = config();
        let mut persisted = vec![background(false, ""), character(true, None, ALL_EMOTIONS_FILTER)];
        let mut working = persisted.clone();
        FrameResolver::with_seed(11).resolve(&mut working, &cfg, false);

        write_back_overrides(&mut persisted, &working);

        match &persisted[0].kind {
            ComponentKind::Background(b) => assert!(b.overlay.is_empty()),
            _ => unreachable!(),
        }
        let layer = persisted[1].as_character().expect("character");
        assert!(layer.emotion_index.is_some());
        assert!(layer.character_name.is_none());
    }

    proptest! {
        #[test]
        fn chosen_emotion_stays_inside_filter(
            emotion_count in 1u32..30,
            filter in proptest::collection::vec(1u32..40, 0..10),
            seed in any::<u64>(),
        ) {
            let mut profile = CharacterProfile { emotion_count, ..Default::default() };
            profile.emotion_filters.insert("f".to_string(), filter);
            let allowed = profile.filtered_emotions("f");

            let idx = FrameResolver::with_seed(seed).pick_emotion(Some(&profile), "f");
            if allowed.is_empty() {
                prop_assert!((1..=emotion_count).contains(&idx));
            } else {
                prop_assert!(allowed.contains(&idx));
            }
        }
    }
}
