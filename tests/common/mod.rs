//! 场景测试共用的假协作者与配置构造。

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use image::RgbaImage;

use manosaba_textbox::config::{
    AppConfig, CanvasSize, CharacterProfile, ComponentKind, VisualComponent,
};
use manosaba_textbox::error::AppError;
use manosaba_textbox::pipeline::{ClipboardAccess, ForegroundProcess, KeyInjector, KeyStroke};
use manosaba_textbox::render::Renderer;
use manosaba_textbox::resolver::ResolvedLayer;
use manosaba_textbox::status::StatusCallback;

/// 前 `empty_reads` 次读取返回空，之后返回预设内容。
pub struct FakeClipboard {
    content: (Option<String>, Option<RgbaImage>),
    empty_reads: usize,
    fail_copy: bool,
    pub reads: AtomicUsize,
    pub clears: AtomicUsize,
    pub copies: Mutex<Vec<RgbaImage>>,
    pub threads: Mutex<Vec<ThreadId>>,
}

impl FakeClipboard {
    pub fn with_text(text: &str, empty_reads: usize) -> Arc<Self> {
        Arc::new(Self::build(Some(text.to_string()), None, empty_reads, false))
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::build(None, None, 0, false))
    }

    pub fn failing_copy(text: &str) -> Arc<Self> {
        Arc::new(Self::build(Some(text.to_string()), None, 0, true))
    }

    fn build(text: Option<String>, image: Option<RgbaImage>, empty_reads: usize, fail_copy: bool) -> Self {
        Self {
            content: (text, image),
            empty_reads,
            fail_copy,
            reads: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
            copies: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// 所有读写调用次数之和。
    pub fn touches(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
            + self.clears.load(Ordering::SeqCst)
            + self.copies.lock().expect("copies").len()
    }

    pub fn copy_count(&self) -> usize {
        self.copies.lock().expect("copies").len()
    }
}

impl ClipboardAccess for FakeClipboard {
    fn clear(&self) -> Result<(), AppError> {
        record_thread(&self.threads);
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn text_and_image(&self) -> Result<(Option<String>, Option<RgbaImage>), AppError> {
        record_thread(&self.threads);
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if read < self.empty_reads {
            return Ok((None, None));
        }
        Ok(self.content.clone())
    }

    fn copy_image(&self, image: &RgbaImage) -> Result<(), AppError> {
        record_thread(&self.threads);
        if self.fail_copy {
            return Err(AppError::Clipboard("busy".to_string()));
        }
        self.copies.lock().expect("copies").push(image.clone());
        Ok(())
    }

    fn has_image(&self) -> bool {
        !self.copies.lock().expect("copies").is_empty()
    }
}

#[derive(Default)]
pub struct FakeKeyboard {
    pub sent: Mutex<Vec<KeyStroke>>,
    pub threads: Mutex<Vec<ThreadId>>,
}

impl FakeKeyboard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn strokes(&self) -> Vec<KeyStroke> {
        self.sent.lock().expect("sent").clone()
    }
}

impl KeyInjector for FakeKeyboard {
    fn send(&self, strokes: &[KeyStroke]) -> Result<(), AppError> {
        record_thread(&self.threads);
        self.sent.lock().expect("sent").extend_from_slice(strokes);
        Ok(())
    }
}

/// 依次返回预设的前台进程名，用完后重复最后一个。
pub struct FakeForeground {
    names: Mutex<VecDeque<Option<String>>>,
    last: Mutex<Option<String>>,
}

impl FakeForeground {
    pub fn fixed(name: &str) -> Arc<Self> {
        Self::sequence(&[name])
    }

    pub fn sequence(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            names: Mutex::new(names.iter().map(|n| Some(n.to_string())).collect()),
            last: Mutex::new(None),
        })
    }
}

impl ForegroundProcess for FakeForeground {
    fn active_process_name(&self) -> Option<String> {
        let next = self.names.lock().expect("names").pop_front();
        let mut last = self.last.lock().expect("last");
        if let Some(name) = next {
            *last = name;
        }
        last.clone()
    }
}

/// 记录每次合成收到的图层，输出透明画布。
#[derive(Default)]
pub struct RecordingRenderer {
    pub composed: Mutex<Vec<Vec<ResolvedLayer>>>,
    pub drawn: Mutex<Vec<String>>,
    pub threads: Mutex<Vec<ThreadId>>,
}

impl RecordingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn compose_count(&self) -> usize {
        self.composed.lock().expect("composed").len()
    }

    pub fn draw_count(&self) -> usize {
        self.drawn.lock().expect("drawn").len()
    }

    pub fn last_layers(&self) -> Vec<ResolvedLayer> {
        self.composed.lock().expect("composed").last().cloned().unwrap_or_default()
    }
}

impl Renderer for RecordingRenderer {
    fn compose(&self, canvas: CanvasSize, layers: &[ResolvedLayer]) -> Result<RgbaImage, AppError> {
        record_thread(&self.threads);
        self.composed.lock().expect("composed").push(layers.to_vec());
        Ok(RgbaImage::new(canvas.width, canvas.height))
    }

    fn draw_content(
        &self,
        base: &RgbaImage,
        text: &str,
        _image: Option<&RgbaImage>,
    ) -> Result<RgbaImage, AppError> {
        record_thread(&self.threads);
        self.drawn.lock().expect("drawn").push(text.to_string());
        Ok(base.clone())
    }
}

fn record_thread(threads: &Mutex<Vec<ThreadId>>) {
    threads.lock().expect("threads").push(thread::current().id());
}

/// 收集到的调用线程。
pub fn threads_of(threads: &Mutex<Vec<ThreadId>>) -> Vec<ThreadId> {
    threads.lock().expect("threads").clone()
}

/// 收集状态消息。
pub fn collecting_status() -> (StatusCallback, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let callback: StatusCallback = Arc::new(move |m: &str| {
        sink.lock().expect("status").push(m.to_string());
    });
    (callback, messages)
}

/// 角色 `ema`（5 个表情，“开心”对应 3 号）作为当前角色的配置。
pub fn ema_config(assets: &Path) -> AppConfig {
    let mut profile = CharacterProfile {
        full_name: "樱羽艾玛".to_string(),
        emotion_count: 5,
        ..Default::default()
    };
    profile.sentiments.insert("开心".to_string(), vec![3]);

    let mut characters = BTreeMap::new();
    characters.insert("ema".to_string(), profile);

    AppConfig {
        assets_path: assets.to_path_buf(),
        characters,
        current_character: "ema".to_string(),
        background_list: vec!["c1".to_string(), "c2".to_string()],
        ..Default::default()
    }
}

/// 在 `assets/chara/<name>/<name> (<i>).png` 写入小图片。
pub fn write_character_assets(assets: &Path, name: &str, count: u32) {
    let dir = assets.join("chara").join(name);
    std::fs::create_dir_all(&dir).expect("create chara dir");
    for i in 1..=count {
        RgbaImage::new(4, 4)
            .save(dir.join(format!("{} ({}).png", name, i)))
            .expect("write character png");
    }
}

pub fn character_layer(components: &[VisualComponent]) -> Option<&VisualComponent> {
    components
        .iter()
        .find(|c| matches!(c.kind, ComponentKind::Character(_)))
}
