use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::cache::CacheManager;
use crate::config::ConfigStore;
use crate::error::AppError;
use crate::status::StatusCallback;

/// 预加载进度快照。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadProgress {
    pub current: Option<String>,
    pub loaded: u32,
    pub total: u32,
    pub complete: bool,
}

impl PreloadProgress {
    /// 0.0 ~ 1.0；总数为 0 时为 0。
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.loaded as f64 / self.total as f64).min(1.0)
    }
}

fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (done as f64 / total as f64 * 100.0).round() as u32
}

struct Inner {
    cache: Arc<CacheManager>,
    store: ConfigStore,
    status: StatusCallback,
    /// 深度为 1 的待处理槽位，新请求直接覆盖。
    pending: Mutex<Option<String>>,
    wakeup: Condvar,
    /// 每次提交递增，工作线程据此判断手上的任务是否已过期。
    generation: AtomicU64,
    busy: AtomicBool,
    shutdown: AtomicBool,
    progress: Mutex<PreloadProgress>,
}

impl Inner {
    fn report(&self, message: &str) {
        (self.status)(message);
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.shutdown.load(Ordering::SeqCst) || self.generation.load(Ordering::SeqCst) != generation
    }

    fn set_progress(&self, f: impl FnOnce(&mut PreloadProgress)) {
        let mut guard = self.progress.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }

    fn worker_loop(&self) {
        loop {
            let (name, generation) = {
                let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
                loop {
                    if self.shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Some(name) = pending.take() {
                        self.busy.store(true, Ordering::SeqCst);
                        break (name, self.generation.load(Ordering::SeqCst));
                    }
                    pending = self.wakeup.wait(pending).unwrap_or_else(|e| e.into_inner());
                }
            };

            self.preload_character(&name, generation);
            self.busy.store(false, Ordering::SeqCst);
        }
    }

    fn preload_character(&self, name: &str, generation: u64) {
        let config = self.store.snapshot();
        if !config.preloading.preload_character {
            self.report(&format!("角色预加载已禁用，跳过 {} 的预加载", name));
            return;
        }

        let Some(profile) = config.character(name) else {
            log::warn!("⚠️ 预加载失败，角色不存在: {}", name);
            self.report(&format!("角色 {} 配置不存在", name));
            return;
        };
        let total = profile.emotion_count;

        self.set_progress(|p| {
            *p = PreloadProgress {
                current: Some(name.to_string()),
                loaded: 0,
                total,
                complete: false,
            }
        });
        self.report(&format!("开始预加载角色 {}", name));
        let started = Instant::now();

        for emotion_index in 1..=total {
            if self.is_stale(generation) {
                log::info!("⏹️ 角色预加载中断 name={} loaded={}/{}", name, emotion_index - 1, total);
                self.report(&format!("角色 {} 预加载被新任务中断", name));
                return;
            }

            self.cache.character(name, emotion_index);
            self.set_progress(|p| p.loaded = emotion_index);
            self.report(&format!(
                "预加载角色 {}: {}/{} ({}%)",
                name,
                emotion_index,
                total,
                percent(emotion_index as usize, total as usize)
            ));
        }

        self.set_progress(|p| p.complete = true);
        log::info!(
            "✅ 角色预加载完成 name={} count={} elapsed_ms={}",
            name,
            total,
            started.elapsed().as_millis()
        );
        self.report(&format!("角色 {} 预加载完成", name));
    }
}

/// 角色图片预加载调度器。
///
/// 单个常驻工作线程 + 深度为 1 的待处理槽位：`submit` 立即返回，
/// 尚未开始的旧请求会被新请求覆盖；正在执行的请求在每个表情之间检查是否过期。
pub struct PreloadScheduler {
    inner: Arc<Inner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PreloadScheduler {
    /// 创建调度器但不启动工作线程。
    pub fn new(cache: Arc<CacheManager>, store: ConfigStore, status: StatusCallback) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                store,
                status,
                pending: Mutex::new(None),
                wakeup: Condvar::new(),
                generation: AtomicU64::new(0),
                busy: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                progress: Mutex::new(PreloadProgress::default()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// 创建并立即启动。
    pub fn spawn(
        cache: Arc<CacheManager>,
        store: ConfigStore,
        status: StatusCallback,
    ) -> Result<Self, AppError> {
        let scheduler = Self::new(cache, store, status);
        scheduler.start()?;
        Ok(scheduler)
    }

    /// 启动常驻工作线程；重复调用无副作用。
    pub fn start(&self) -> Result<(), AppError> {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.is_some() {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("preload-worker".to_string())
            .spawn(move || inner.worker_loop())?;
        *worker = Some(handle);
        log::debug!("✅ 预加载工作线程已启动");
        Ok(())
    }

    /// 提交角色预加载请求，立即返回。
    pub fn submit(&self, character_name: &str) {
        {
            let mut pending = self.inner.pending.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = pending.replace(character_name.to_string()) {
                log::debug!("🔁 覆盖未开始的预加载请求: {} -> {}", previous, character_name);
            }
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.wakeup.notify_one();
        self.inner.report(&format!("已提交角色 {} 预加载任务", character_name));
    }

    /// 一次性后台线程预加载全部背景，每 5 张与结束时报告进度。
    pub fn preload_backgrounds(&self) -> Option<JoinHandle<()>> {
        let config = self.inner.store.snapshot();
        if !config.preloading.preload_background {
            self.inner.report("背景预加载已禁用，跳过");
            return None;
        }

        let inner = Arc::clone(&self.inner);
        let backgrounds = config.background_list;
        let spawned = thread::Builder::new()
            .name("preload-background".to_string())
            .spawn(move || {
                inner.report("正在预加载背景图片...");
                let total = backgrounds.len();
                for (i, name) in backgrounds.iter().enumerate() {
                    inner.cache.background(name);
                    let done = i + 1;
                    if done % 5 == 0 || done == total {
                        inner.report(&format!(
                            "预加载背景: {}/{} ({}%)",
                            done,
                            total,
                            percent(done, total)
                        ));
                    }
                }
                inner.report("背景图片预加载完成");
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("❌ 背景预加载线程启动失败: {}", err);
                self.inner.report(&format!("背景图片预加载失败: {}", err));
                None
            }
        }
    }

    pub fn status(&self) -> PreloadProgress {
        self.inner.progress.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn progress(&self) -> f64 {
        self.status().ratio()
    }

    /// 没有待处理请求且工作线程空闲。
    pub fn is_idle(&self) -> bool {
        let pending = self.inner.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.is_none() && !self.inner.busy.load(Ordering::SeqCst)
    }

    /// 轮询等待空闲，超时返回 `false`。
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.is_idle() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        self.is_idle()
    }
}

impl Drop for PreloadScheduler {
    fn drop(&mut self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        {
            // 持锁通知，避免与工作线程的 wait 之间丢失唤醒
            let _pending = self.inner.pending.lock().unwrap_or_else(|e| e.into_inner());
            self.inner.wakeup.notify_all();
        }
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::warn!("⚠️ 预加载工作线程异常退出");
            }
        }
    }
}
