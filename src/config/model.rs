//! # 配置数据模型
//!
//! 只定义核心消费/产出的数据形状，文件格式解析交给 `serde`。
//! 所有结构体都带 `#[serde(default)]`，便于部分字段缺失的 JSON 直接加载。

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 画布固定宽度（像素）。
pub const CANVAS_WIDTH: u32 = 2560;

/// 表情筛选器中表示“不过滤”的名称。
pub const ALL_EMOTIONS_FILTER: &str = "全部";

fn default_true() -> bool {
    true
}

fn default_scale() -> f32 {
    1.0
}

fn default_emotion_filter() -> String {
    ALL_EMOTIONS_FILTER.to_string()
}

/// 画布尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// 固定宽度 2560，按画面比例推导高度；未知比例按 `3:1` 处理。
    pub fn for_aspect_ratio(ratio: &str) -> Self {
        let height = match ratio.trim() {
            "5:4" => 2048,
            "16:9" => 1440,
            _ => 854,
        };
        Self {
            width: CANVAS_WIDTH,
            height,
        }
    }
}

/// 图层对齐方式，对应 `top-left` / `center` / `bottom-right` 等字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Align {
    /// 计算 `source` 在 `target` 内按对齐方式摆放并叠加偏移后的左上角坐标。
    pub fn position(self, target: (u32, u32), source: (u32, u32), offset: (f32, f32)) -> (i64, i64) {
        let free_w = target.0 as i64 - source.0 as i64;
        let free_h = target.1 as i64 - source.1 as i64;

        let x = match self {
            Self::TopLeft | Self::MiddleLeft | Self::BottomLeft => 0,
            Self::TopCenter | Self::Center | Self::BottomCenter => free_w / 2,
            Self::TopRight | Self::MiddleRight | Self::BottomRight => free_w,
        };
        let y = match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => 0,
            Self::MiddleLeft | Self::Center | Self::MiddleRight => free_h / 2,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => free_h,
        };

        (x + offset.0.round() as i64, y + offset.1.round() as i64)
    }
}

/// 角色图层字段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterLayer {
    /// 为空时使用当前激活角色。
    #[serde(default)]
    pub character_name: Option<String>,
    /// 已选定的表情序号（从 1 开始）。
    #[serde(default)]
    pub emotion_index: Option<u32>,
    #[serde(default = "default_emotion_filter")]
    pub emotion_filter: String,
    #[serde(default)]
    pub use_fixed_character: bool,
    /// 一次性强制使用 `emotion_index`（情感匹配写入），消费后清除。
    #[serde(default)]
    pub force_use: bool,
}

impl Default for CharacterLayer {
    fn default() -> Self {
        Self {
            character_name: None,
            emotion_index: None,
            emotion_filter: default_emotion_filter(),
            use_fixed_character: false,
            force_use: false,
        }
    }
}

/// 背景图层字段。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundLayer {
    /// 背景名称；以 `#` 开头表示纯色填充。
    #[serde(default)]
    pub overlay: String,
    #[serde(default)]
    pub use_fixed_background: bool,
}

/// 文本框 / 名字框 / 额外贴图共用的字段。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayer {
    /// `assets/shader` 下的文件名，为空表示不绘制图片。
    #[serde(default)]
    pub overlay: String,
    #[serde(default)]
    pub align: Align,
}

/// 按组件类型区分的字段（闭合集合）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentKind {
    Character(CharacterLayer),
    Background(BackgroundLayer),
    Textbox(OverlayLayer),
    Namebox(OverlayLayer),
    Extra(OverlayLayer),
}

impl ComponentKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Character(_) => "character",
            Self::Background(_) => "background",
            Self::Textbox(_) => "textbox",
            Self::Namebox(_) => "namebox",
            Self::Extra(_) => "extra",
        }
    }
}

/// 一个可视图层描述。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualComponent {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 叠放顺序，数值越大越靠上。
    #[serde(default)]
    pub layer: i32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(flatten)]
    pub kind: ComponentKind,
}

impl VisualComponent {
    pub fn new(layer: i32, kind: ComponentKind) -> Self {
        Self {
            enabled: true,
            layer,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            kind,
        }
    }

    pub fn as_character(&self) -> Option<&CharacterLayer> {
        match &self.kind {
            ComponentKind::Character(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut CharacterLayer> {
        match &mut self.kind {
            ComponentKind::Character(layer) => Some(layer),
            _ => None,
        }
    }
}

/// 角色文字配置（名字框使用）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub color: String,
    pub font_size: u32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            color: "#FFFFFF".to_string(),
            font_size: 92,
        }
    }
}

/// 角色静态资料。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterProfile {
    pub full_name: String,
    pub emotion_count: u32,
    pub scale: f32,
    pub offset: (f32, f32),
    /// 表情序号（字符串）→ X 方向额外偏移。
    #[serde(rename = "offsetX")]
    pub offset_x: HashMap<String, f32>,
    #[serde(rename = "offsetY")]
    pub offset_y: HashMap<String, f32>,
    pub text: TextConfig,
    /// 情感词 → 可用表情序号列表。
    pub sentiments: HashMap<String, Vec<u32>>,
    /// 筛选器名称 → 表情序号列表。
    pub emotion_filters: HashMap<String, Vec<u32>>,
}

impl Default for CharacterProfile {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            emotion_count: 1,
            scale: 1.0,
            offset: (0.0, 0.0),
            offset_x: HashMap::new(),
            offset_y: HashMap::new(),
            text: TextConfig::default(),
            sentiments: HashMap::new(),
            emotion_filters: HashMap::new(),
        }
    }
}

impl CharacterProfile {
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.full_name.is_empty() {
            fallback
        } else {
            &self.full_name
        }
    }

    /// `1..=emotion_count` 全部表情。
    pub fn all_emotions(&self) -> Vec<u32> {
        (1..=self.emotion_count.max(1)).collect()
    }

    /// 按筛选器名称取表情列表，结果总在 `1..=emotion_count` 内。
    ///
    /// 未知筛选器返回空列表，由调用方决定回退策略。
    pub fn filtered_emotions(&self, filter: &str) -> Vec<u32> {
        if filter.is_empty() || filter == ALL_EMOTIONS_FILTER {
            return self.all_emotions();
        }
        let count = self.emotion_count.max(1);
        match self.emotion_filters.get(filter) {
            Some(list) => list
                .iter()
                .copied()
                .filter(|idx| (1..=count).contains(idx))
                .collect(),
            None => Vec::new(),
        }
    }

    /// 情感词对应、且落在筛选范围内的表情。
    pub fn sentiment_emotions(&self, sentiment: &str, filter: &str) -> Vec<u32> {
        let filtered = self.filtered_emotions(filter);
        self.sentiments
            .get(sentiment)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|idx| filtered.contains(idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 基础偏移 + 表情偏移；查不到的表情偏移按 0 处理。
    pub fn emotion_offset(&self, emotion_index: u32) -> (f32, f32) {
        let key = emotion_index.to_string();
        let extra_x = self.offset_x.get(&key).copied().unwrap_or(0.0);
        let extra_y = self.offset_y.get(&key).copied().unwrap_or(0.0);
        (self.offset.0 + extra_x, self.offset.1 + extra_y)
    }
}

/// 矩形区域。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// 样式配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub aspect_ratio: String,
    pub components: Vec<VisualComponent>,
    pub font_family: String,
    pub font_size: u32,
    pub text_color: String,
    pub text_region: Region,
    pub paste_region: Region,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            components: vec![
                VisualComponent::new(0, ComponentKind::Background(BackgroundLayer::default())),
                VisualComponent::new(1, ComponentKind::Character(CharacterLayer::default())),
                VisualComponent::new(
                    2,
                    ComponentKind::Textbox(OverlayLayer {
                        overlay: "textbox_bg.png".to_string(),
                        align: Align::BottomLeft,
                    }),
                ),
                VisualComponent::new(
                    3,
                    ComponentKind::Namebox(OverlayLayer {
                        overlay: "namebox.png".to_string(),
                        align: Align::BottomLeft,
                    }),
                ),
            ],
            font_family: "font3".to_string(),
            font_size: 55,
            text_color: "#FFFFFF".to_string(),
            text_region: Region {
                x: 470,
                y: 1080,
                width: 1579,
                height: 245,
            },
            paste_region: Region {
                x: 1500,
                y: 200,
                width: 800,
                height: 800,
            },
        }
    }
}

/// 剪切模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutMode {
    /// 全选后剪切。
    #[default]
    Full,
    /// 选中当前行后剪切。
    SingleLine,
    /// 只发送剪切键，假定用户已选中内容。
    Direct,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutSettings {
    pub cut_mode: CutMode,
}

/// 单个 AI 后端的连接参数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "http://localhost:11434/v1/".to_string(),
            model: String::new(),
        }
    }
}

/// 情感分析客户端配置快照，可比较是否变化。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SentimentClientConfig {
    pub client_type: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSettings {
    pub enabled: bool,
    pub ai_model: String,
    pub model_configs: BTreeMap<String, ModelConfig>,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ai_model: "ollama".to_string(),
            model_configs: BTreeMap::new(),
        }
    }
}

impl SentimentSettings {
    /// 当前选中后端的客户端配置。
    pub fn client_config(&self) -> SentimentClientConfig {
        let model = self
            .model_configs
            .get(&self.ai_model)
            .cloned()
            .unwrap_or_default();
        SentimentClientConfig {
            client_type: self.ai_model.clone(),
            model: model.model,
            base_url: model.base_url,
            api_key: model.api_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadSettings {
    pub preload_character: bool,
    pub preload_background: bool,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            preload_character: true,
            preload_background: true,
        }
    }
}

/// 核心消费的完整配置快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub assets_path: PathBuf,
    pub style: StyleConfig,
    pub characters: BTreeMap<String, CharacterProfile>,
    pub current_character: String,
    pub background_list: Vec<String>,
    /// 情感词表（闭合集合）。
    pub emotion_list: Vec<String>,
    pub process_whitelist: Vec<String>,
    pub cut: CutSettings,
    pub auto_paste_image: bool,
    pub auto_send_image: bool,
    pub sentiment: SentimentSettings,
    pub preloading: PreloadSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets_path: PathBuf::from("assets"),
            style: StyleConfig::default(),
            characters: BTreeMap::new(),
            current_character: String::new(),
            background_list: Vec::new(),
            emotion_list: ["平静", "开心", "生气", "无语", "害羞", "难过", "惊讶", "害怕", "疑惑", "得意"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            process_whitelist: Vec::new(),
            cut: CutSettings::default(),
            auto_paste_image: true,
            auto_send_image: true,
            sentiment: SentimentSettings::default(),
            preloading: PreloadSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize::for_aspect_ratio(&self.style.aspect_ratio)
    }

    pub fn character(&self, name: &str) -> Option<&CharacterProfile> {
        self.characters.get(name)
    }

    /// 按 `layer` 升序排列的组件（稳定排序）。
    pub fn sorted_components(&self) -> Vec<VisualComponent> {
        let mut components = self.style.components.clone();
        components.sort_by_key(|c| c.layer);
        components
    }

    /// 当前激活角色：优先取第一个启用且指定了角色名的角色图层。
    pub fn active_character(&self) -> String {
        self.sorted_components()
            .iter()
            .filter(|c| c.enabled)
            .filter_map(|c| c.as_character())
            .find_map(|layer| layer.character_name.clone())
            .unwrap_or_else(|| self.current_character.clone())
    }

    /// 前台进程是否在白名单内；空白名单允许全部。
    pub fn is_process_allowed(&self, process_name: Option<&str>) -> bool {
        if self.process_whitelist.is_empty() {
            return true;
        }
        match process_name {
            Some(name) => {
                let name = name.to_lowercase();
                self.process_whitelist
                    .iter()
                    .any(|allowed| allowed.to_lowercase() == name)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CharacterProfile {
        let mut profile = CharacterProfile {
            full_name: "樱羽艾玛".to_string(),
            emotion_count: 8,
            offset: (10.0, -5.0),
            ..Default::default()
        };
        profile.offset_x.insert("3".to_string(), 4.0);
        profile.emotion_filters.insert("微笑".to_string(), vec![2, 3, 42]);
        profile.sentiments.insert("开心".to_string(), vec![1, 3, 5]);
        profile
    }

    #[test]
    fn canvas_size_follows_aspect_ratio() {
        assert_eq!(CanvasSize::for_aspect_ratio("5:4").height, 2048);
        assert_eq!(CanvasSize::for_aspect_ratio("16:9").height, 1440);
        assert_eq!(CanvasSize::for_aspect_ratio("3:1").height, 854);
        assert_eq!(CanvasSize::for_aspect_ratio("4:3").height, 854);
        assert_eq!(CanvasSize::for_aspect_ratio("4:3").width, CANVAS_WIDTH);
    }

    #[test]
    fn filtered_emotions_drop_out_of_range_indices() {
        let p = profile();
        assert_eq!(p.filtered_emotions(ALL_EMOTIONS_FILTER).len(), 8);
        assert_eq!(p.filtered_emotions("微笑"), vec![2, 3]);
        assert!(p.filtered_emotions("不存在").is_empty());
    }

    #[test]
    fn sentiment_emotions_respect_filter() {
        let p = profile();
        assert_eq!(p.sentiment_emotions("开心", "微笑"), vec![3]);
        assert_eq!(p.sentiment_emotions("开心", ALL_EMOTIONS_FILTER), vec![1, 3, 5]);
        assert!(p.sentiment_emotions("生气", ALL_EMOTIONS_FILTER).is_empty());
    }

    #[test]
    fn emotion_offset_defaults_missing_lookup_to_zero() {
        let p = profile();
        assert_eq!(p.emotion_offset(3), (14.0, -5.0));
        assert_eq!(p.emotion_offset(7), (10.0, -5.0));
    }

    #[test]
    fn align_positions_relative_to_target() {
        let target = (100, 50);
        let source = (20, 10);
        assert_eq!(Align::TopLeft.position(target, source, (0.0, 0.0)), (0, 0));
        assert_eq!(Align::Center.position(target, source, (0.0, 0.0)), (40, 20));
        assert_eq!(Align::BottomRight.position(target, source, (5.0, -5.0)), (85, 35));
    }

    #[test]
    fn empty_whitelist_allows_everything() {
        let mut cfg = AppConfig::default();
        assert!(cfg.is_process_allowed(None));
        cfg.process_whitelist = vec!["EditorX.exe".to_string()];
        assert!(cfg.is_process_allowed(Some("editorx.exe")));
        assert!(!cfg.is_process_allowed(Some("editory.exe")));
        assert!(!cfg.is_process_allowed(None));
    }

    #[test]
    fn component_json_uses_type_tag() {
        let json = r#"{"type":"character","layer":2,"character_name":"ema","use_fixed_character":true}"#;
        let component: VisualComponent = serde_json::from_str(json).expect("valid component json");
        assert_eq!(component.layer, 2);
        assert!(component.enabled);
        let layer = component.as_character().expect("character layer");
        assert_eq!(layer.character_name.as_deref(), Some("ema"));
        assert_eq!(layer.emotion_filter, ALL_EMOTIONS_FILTER);
    }

    #[test]
    fn active_character_prefers_layer_name() {
        let mut cfg = AppConfig {
            current_character: "hiro".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.active_character(), "hiro");
        for component in cfg.style.components.iter_mut() {
            if let Some(layer) = component.as_character_mut() {
                layer.character_name = Some("ema".to_string());
            }
        }
        assert_eq!(cfg.active_character(), "ema");
    }
}
