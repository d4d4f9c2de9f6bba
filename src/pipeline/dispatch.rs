//! # 剪贴板捕获 / 调度流水线
//!
//! ## 设计思路
//!
//! 一次调用严格按顺序执行以下步骤，每条出口都返回一条状态字符串：
//!
//! ```text
//! 白名单检查 ──► 清空剪贴板 ──► 剪切按键 ──► 轮询内容 ──► (情感匹配)
//!      │                                                     │
//!      └─► 拒绝                                               ▼
//!                           空内容 ◄── 内容检查 ──► 合成 ──► 写回剪贴板 ──► 确认
//!                                                                │
//!                                                      自动粘贴 / 发送 ──► 报告
//! ```
//!
//! 中止点：白名单拒绝、内容为空、合成失败、写回剪贴板失败。
//! 其余超时与失败都降级处理并继续。
//!
//! ## 实现思路
//!
//! - 预览图（解析 + 合成，不含文字）在合成阶段按需生成，生成后被本次调度消费；
//!   下一次调度重新解析，随机表情 / 背景因此每次都会变化。
//! - 上一帧的静态图层指纹（`FrameKey`）与缓存的帧标志同时满足时，
//!   才允许解析器输出 `ReuseCache`。
//! - 解析对工作副本的修改（表情序号、强制标记）按 `layer` 回写到配置存储。
//! - 预览合成失败时不保留透明画布，本次调度以“生成图像失败”结束，不写回剪贴板。
//! - 剪贴板、按键注入、前台进程查询与合成都是阻塞调用，统一放进
//!   `spawn_blocking`，异步线程只负责等待与计时。
//! - 流水线不可重入，调用方负责串行化；内部锁从不跨 `.await` 持有。

use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::RgbaImage;

use super::collab::{ClipboardAccess, ForegroundProcess, KeyInjector};
use super::keys::{self, Batch, Key, KeyStep};
use super::session::{AutomationSession, PipelineTimings};
use crate::cache::CacheManager;
use crate::config::{AppConfig, ConfigStore, VisualComponent};
use crate::error::AppError;
use crate::render::Renderer;
use crate::resolver::{FrameKey, FrameResolver, Resolution, write_back_overrides};
use crate::sentiment::SentimentClientManager;
use crate::status::StatusCallback;

pub const MSG_NOT_ALLOWED: &str = "前台应用不在白名单内";
pub const MSG_NO_CONTENT: &str = "错误: 没有文本或图像";
pub const MSG_COPY_FAILED: &str = "复制到剪贴板失败";
pub const MSG_NO_COMPONENTS: &str = "没有找到组件配置";

/// 在阻塞线程池中执行一次调用。
async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Task(e.to_string()))?
}

/// 解析完成、等待合成的一帧。
struct PreparedFrame {
    config: AppConfig,
    working: Vec<VisualComponent>,
    resolution: Resolution,
}

enum FrameStep {
    Ready(PreparedFrame),
    /// 没有启用的组件，直接给出空白画布。
    Blank(PreviewOutcome),
}

/// 一次预览合成的结果；失败时 `image` 为透明画布。
struct PreviewOutcome {
    image: RgbaImage,
    info: String,
    error: Option<AppError>,
}

/// 剪贴板捕获与调度流水线。
pub struct DispatchPipeline {
    store: ConfigStore,
    cache: Arc<CacheManager>,
    renderer: Arc<dyn Renderer>,
    clipboard: Arc<dyn ClipboardAccess>,
    keyboard: Arc<dyn KeyInjector>,
    foreground: Arc<dyn ForegroundProcess>,
    sentiment: Option<Arc<SentimentClientManager>>,
    status: StatusCallback,
    resolver: Mutex<FrameResolver>,
    preview: Mutex<Option<RgbaImage>>,
    last_frame: Mutex<Option<FrameKey>>,
    timings: PipelineTimings,
    modifier: Key,
}

impl DispatchPipeline {
    pub fn new(
        store: ConfigStore,
        cache: Arc<CacheManager>,
        renderer: Arc<dyn Renderer>,
        clipboard: Arc<dyn ClipboardAccess>,
        keyboard: Arc<dyn KeyInjector>,
        foreground: Arc<dyn ForegroundProcess>,
        status: StatusCallback,
    ) -> Self {
        Self {
            store,
            cache,
            renderer,
            clipboard,
            keyboard,
            foreground,
            sentiment: None,
            status,
            resolver: Mutex::new(FrameResolver::new()),
            preview: Mutex::new(None),
            last_frame: Mutex::new(None),
            timings: PipelineTimings::default(),
            modifier: Key::platform_modifier(),
        }
    }

    pub fn with_sentiment(mut self, manager: Arc<SentimentClientManager>) -> Self {
        self.sentiment = Some(manager);
        self
    }

    /// 固定随机种子，便于复现。
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.resolver = Mutex::new(FrameResolver::with_seed(seed));
        self
    }

    pub fn with_timings(mut self, timings: PipelineTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_modifier(mut self, modifier: Key) -> Self {
        self.modifier = modifier;
        self
    }

    /// 当前保存的预览图副本。
    pub fn preview(&self) -> Option<RgbaImage> {
        self.preview.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn report(&self, message: &str) {
        (self.status)(message);
    }

    /// 白名单检查；前台进程查询可能启动子进程，放在阻塞线程中执行。
    async fn process_allowed(&self, config: &AppConfig) -> bool {
        if config.process_whitelist.is_empty() || !self.foreground.is_supported() {
            return true;
        }
        let foreground = Arc::clone(&self.foreground);
        let name = match blocking(move || Ok(foreground.active_process_name())).await {
            Ok(name) => name,
            Err(err) => {
                log::warn!("⚠️ 获取前台进程失败: {}", err);
                None
            }
        };
        let allowed = config.is_process_allowed(name.as_deref());
        if !allowed {
            log::info!("🚫 前台进程不在白名单内 process={:?}", name);
        }
        allowed
    }

    /// 解析并合成一张不含文字的预览图，返回预览图与说明。
    ///
    /// 合成失败时返回透明画布，说明以“生成失败”结尾，且不保留为待用预览。
    pub fn generate_preview(&self) -> (RgbaImage, String) {
        let outcome = match self.prepare_frame() {
            FrameStep::Blank(outcome) => outcome,
            FrameStep::Ready(frame) => {
                let started = Instant::now();
                let composed = self
                    .renderer
                    .compose(frame.config.canvas_size(), &frame.resolution.layers);
                self.finish_frame(frame, composed, started)
            }
        };
        (outcome.image, outcome.info)
    }

    /// 调度用的预览合成：合成在阻塞线程中完成。
    async fn render_preview(&self) -> PreviewOutcome {
        match self.prepare_frame() {
            FrameStep::Blank(outcome) => outcome,
            FrameStep::Ready(frame) => {
                let started = Instant::now();
                let renderer = Arc::clone(&self.renderer);
                let canvas = frame.config.canvas_size();
                let layers = frame.resolution.layers.clone();
                let composed = blocking(move || renderer.compose(canvas, &layers)).await;
                self.finish_frame(frame, composed, started)
            }
        }
    }

    /// 解析工作副本并回写覆盖项；上一帧指纹与帧标志同时有效时允许复用。
    fn prepare_frame(&self) -> FrameStep {
        let config = self.store.snapshot();
        let mut working = config.sorted_components();

        let reuse = {
            let last_frame = self.last_frame.lock().unwrap_or_else(|e| e.into_inner());
            let before = FrameKey::capture(&working, &config);
            self.cache.frame_valid() && last_frame.as_ref() == Some(&before)
        };

        let resolution = {
            let mut resolver = self.resolver.lock().unwrap_or_else(|e| e.into_inner());
            resolver.resolve(&mut working, &config, reuse)
        };

        if resolution.is_empty() {
            self.forget_frame();
            let canvas = config.canvas_size();
            let blank = RgbaImage::new(canvas.width, canvas.height);
            self.store_preview(blank.clone());
            return FrameStep::Blank(PreviewOutcome {
                image: blank,
                info: MSG_NO_COMPONENTS.to_string(),
                error: None,
            });
        }

        self.store
            .update(|cfg| write_back_overrides(&mut cfg.style.components, &working));

        FrameStep::Ready(PreparedFrame {
            config,
            working,
            resolution,
        })
    }

    fn finish_frame(
        &self,
        frame: PreparedFrame,
        composed: Result<RgbaImage, AppError>,
        started: Instant,
    ) -> PreviewOutcome {
        let summary = frame.resolution.summary();
        match composed {
            Ok(image) => {
                self.cache.mark_frame_rendered();
                *self.last_frame.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(FrameKey::capture(&frame.working, &frame.config));
                log::info!(
                    "⏱️ 预览生成完成 elapsed_ms={} reuse={}",
                    started.elapsed().as_millis(),
                    frame.resolution.uses_cached_frame()
                );
                self.store_preview(image.clone());
                PreviewOutcome {
                    image,
                    info: format!("{} | 生成成功", summary),
                    error: None,
                }
            }
            Err(err) => {
                log::warn!("⚠️ 预览图生成失败，使用透明画布: {}", err);
                self.forget_frame();
                self.take_preview();
                let canvas = frame.config.canvas_size();
                PreviewOutcome {
                    image: RgbaImage::new(canvas.width, canvas.height),
                    info: format!("{} | 生成失败", summary),
                    error: Some(err),
                }
            }
        }
    }

    fn forget_frame(&self) {
        self.cache.invalidate_frame();
        *self.last_frame.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn store_preview(&self, image: RgbaImage) {
        *self.preview.lock().unwrap_or_else(|e| e.into_inner()) = Some(image);
    }

    fn take_preview(&self) -> Option<RgbaImage> {
        self.preview.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// 执行一次完整调度，返回人类可读的结果。
    pub async fn generate_image(&self) -> String {
        let config = self.store.snapshot();

        if !self.process_allowed(&config).await {
            return MSG_NOT_ALLOWED.to_string();
        }

        let mut session = AutomationSession::start();
        session.stage("开始生成图片");

        let clipboard = Arc::clone(&self.clipboard);
        if let Err(err) = blocking(move || clipboard.clear()).await {
            log::warn!("⚠️ 清空剪贴板失败: {}", err);
        }
        tokio::time::sleep(self.timings.after_clear).await;

        let cut = keys::cut_plan(config.cut.cut_mode, self.modifier, self.timings.line_select_pause);
        self.run_keys(&cut, "剪切").await;

        session.stage("开始读取剪切板");
        let (text, image) = self.poll_clipboard().await;
        session.stage("剪切板读取结束");

        if config.sentiment.enabled && !text.trim().is_empty() {
            self.match_sentiment(&config, &text, &mut session).await;
        }

        if text.is_empty() && image.is_none() {
            return MSG_NO_CONTENT.to_string();
        }

        session.stage("开始图像合成");
        // 预览只服务一次调度
        let base = match self.take_preview() {
            Some(preview) => preview,
            None => {
                let outcome = self.render_preview().await;
                self.take_preview();
                if let Some(err) = outcome.error {
                    log::error!("❌ 预览图合成失败: {}", err);
                    return format!("生成图像失败: {}", err);
                }
                outcome.image
            }
        };

        let renderer = Arc::clone(&self.renderer);
        let drawn = blocking(move || renderer.draw_content(&base, &text, image.as_ref())).await;
        let composed = match drawn {
            Ok(composed) => composed,
            Err(err) => {
                log::error!("❌ 图像合成失败: {}", err);
                return format!("生成图像失败: {}", err);
            }
        };
        session.stage("图片合成完成");

        let clipboard = Arc::clone(&self.clipboard);
        if let Err(err) = blocking(move || clipboard.copy_image(&composed)).await {
            log::error!("❌ 写回剪贴板失败: {}", err);
            return MSG_COPY_FAILED.to_string();
        }
        session.stage("图片复制到剪切板完成");

        self.confirm_clipboard().await;
        session.stage("剪切板确认完成");

        if config.auto_paste_image {
            self.run_keys(&keys::paste_plan(self.modifier), "粘贴").await;

            if !self.process_allowed(&config).await {
                return MSG_NOT_ALLOWED.to_string();
            }
            if config.auto_send_image {
                tokio::time::sleep(self.timings.before_send).await;
                self.run_keys(&keys::enter_plan(), "发送").await;
                session.stage("自动发送完成");
            }
        }

        session.report(&config.active_character())
    }

    /// 按批次发送按键；注入失败只记录日志。
    async fn run_keys(&self, steps: &[KeyStep], label: &str) {
        for batch in keys::batches(steps) {
            match batch {
                Batch::Keys(strokes) => {
                    let keyboard = Arc::clone(&self.keyboard);
                    if let Err(err) = blocking(move || keyboard.send(&strokes)).await {
                        log::warn!("⚠️ {}按键注入失败: {}", label, err);
                    }
                }
                Batch::Pause(pause) => tokio::time::sleep(pause).await,
            }
        }
    }

    /// 轮询剪贴板直到出现非空文本或图片；超时返回空文本、无图片。
    async fn poll_clipboard(&self) -> (String, Option<RgbaImage>) {
        let deadline = tokio::time::Instant::now() + self.timings.poll_deadline;
        let mut last_text = String::new();

        while tokio::time::Instant::now() < deadline {
            let clipboard = Arc::clone(&self.clipboard);
            match blocking(move || clipboard.text_and_image()).await {
                Ok((text, image)) => {
                    let text = text.unwrap_or_default();
                    if !text.trim().is_empty() || image.is_some() {
                        return (text, image);
                    }
                    last_text = text;
                }
                Err(err) => log::debug!("剪贴板读取失败，继续轮询: {}", err),
            }
            tokio::time::sleep(self.timings.poll_interval).await;
        }

        log::warn!(
            "⚠️ 剪贴板轮询超时 deadline_ms={}",
            self.timings.poll_deadline.as_millis()
        );
        (last_text, None)
    }

    async fn clipboard_has_image(&self) -> bool {
        let clipboard = Arc::clone(&self.clipboard);
        blocking(move || Ok(clipboard.has_image())).await.unwrap_or(false)
    }

    /// 等待剪贴板报告图片存在；超时不影响后续流程。
    async fn confirm_clipboard(&self) {
        for wait in self.timings.confirm_waits() {
            if self.clipboard_has_image().await {
                return;
            }
            tokio::time::sleep(wait).await;
        }
        if !self.clipboard_has_image().await {
            log::warn!("⚠️ 剪贴板图片确认超时，继续执行");
        }
    }

    /// 情感匹配：分类一次，为每个可用的角色图层写入强制表情，有更新时重新生成预览。
    async fn match_sentiment(&self, config: &AppConfig, text: &str, session: &mut AutomationSession) {
        let Some(manager) = &self.sentiment else {
            return;
        };
        if manager.is_initializing() {
            self.report("情感分析器正在初始化，跳过情感分析");
            return;
        }

        let Some(sentiment) = manager.classify(text).await else {
            session.stage("情感分析失败");
            return;
        };

        let mut working = config.sorted_components();
        let picks = {
            let mut resolver = self.resolver.lock().unwrap_or_else(|e| e.into_inner());
            resolver.apply_sentiment(&mut working, config, &sentiment)
        };
        if picks.is_empty() {
            session.stage("情感分析没有可用表情");
            return;
        }

        self.store
            .update(|cfg| write_back_overrides(&mut cfg.style.components, &working));
        for pick in &picks {
            let note = format!(
                "角色 {} 表情({}): {} |",
                pick.display_name, sentiment, pick.emotion_index
            );
            log::info!("🧠 {}", note);
            session.note(note);
        }

        let outcome = self.render_preview().await;
        if outcome.error.is_some() {
            session.stage("情感表情预览生成失败");
            return;
        }
        session.stage("情感分析完成");
    }
}
