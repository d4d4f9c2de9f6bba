//! # 情感分析客户端管理器
//!
//! ## 设计思路
//!
//! ```text
//! Uninitialized ──initialize_async──► Initializing ──握手成功──► Ready
//!        ▲                                  │
//!        │                                  └──任何失败──► Disabled（并持久化 enabled=false）
//!        └── 配置被关闭 / 客户端配置变化（重新初始化）
//! ```
//!
//! 初始化在 tokio 任务中进行，`initialize_async` 返回 `JoinHandle<bool>`，
//! 调用方可以等待结果，也可以丢弃句柄（后台完成，结果通过生命周期回调通知）。
//! 宿主在启动时调用 `start`；生成流程中的分类从不等待首次初始化。
//!
//! ## 实现思路
//!
//! - 状态放在 `std::sync::Mutex` 中，锁从不跨 `.await` 持有。
//! - 每次初始化递增代次，过期任务的结果直接丢弃，避免旧配置覆盖新配置。
//! - 每次分类前比较当前 `SentimentClientConfig` 与上次初始化所用配置，不同则重新初始化并等待。
//! - 任务派发到构造时所在的 tokio 运行时；GUI 线程等运行时之外的调用方用 `with_runtime` 构造。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::analyzer::SentimentAnalyzer;
use super::backend::BackendFactory;
use super::error::SentimentError;
use crate::config::{ConfigStore, SentimentClientConfig};
use crate::status::{LifecycleCallback, SentimentStatus, StatusCallback};

/// 客户端状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Disabled,
}

struct Shared {
    state: ClientState,
    analyzer: Option<Arc<SentimentAnalyzer>>,
    /// 上次初始化所用配置。
    active_config: Option<SentimentClientConfig>,
}

pub struct SentimentClientManager {
    store: ConfigStore,
    factory: BackendFactory,
    status: StatusCallback,
    lifecycle: LifecycleCallback,
    shared: Mutex<Shared>,
    generation: AtomicU64,
    runtime: Option<Handle>,
}

impl SentimentClientManager {
    pub fn new(
        store: ConfigStore,
        factory: BackendFactory,
        status: StatusCallback,
        lifecycle: LifecycleCallback,
    ) -> Arc<Self> {
        Self::build(store, factory, status, lifecycle, Handle::try_current().ok())
    }

    /// 指定派发初始化任务的运行时，供运行时之外的线程（如 GUI 线程）调用 `toggle`。
    pub fn with_runtime(
        store: ConfigStore,
        factory: BackendFactory,
        status: StatusCallback,
        lifecycle: LifecycleCallback,
        runtime: Handle,
    ) -> Arc<Self> {
        Self::build(store, factory, status, lifecycle, Some(runtime))
    }

    fn build(
        store: ConfigStore,
        factory: BackendFactory,
        status: StatusCallback,
        lifecycle: LifecycleCallback,
        runtime: Option<Handle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            factory,
            status,
            lifecycle,
            shared: Mutex::new(Shared {
                state: ClientState::Uninitialized,
                analyzer: None,
                active_config: None,
            }),
            generation: AtomicU64::new(0),
            runtime,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn report(&self, message: &str) {
        (self.status)(message);
    }

    fn notify(&self, status: SentimentStatus) {
        (self.lifecycle)(status);
    }

    pub fn state(&self) -> ClientState {
        self.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ClientState::Ready
    }

    pub fn is_initializing(&self) -> bool {
        self.state() == ClientState::Initializing
    }

    /// 在后台初始化，返回可等待的句柄。
    ///
    /// 构造时不在 tokio 运行时内且未提供 `with_runtime` 时会 panic。
    pub fn initialize_async(self: &Arc<Self>) -> JoinHandle<bool> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut shared = self.lock();
            shared.state = ClientState::Initializing;
            shared.analyzer = None;
        }
        self.notify(SentimentStatus::INITIALIZING);

        let this = Arc::clone(self);
        let task = async move { this.run_initialize(generation).await };
        match &self.runtime {
            Some(runtime) => runtime.spawn(task),
            None => tokio::spawn(task),
        }
    }

    /// 启动时调用：功能已启用且尚未初始化时开始后台初始化。
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<bool>> {
        if !self.store.snapshot().sentiment.enabled {
            return None;
        }
        match self.state() {
            ClientState::Uninitialized | ClientState::Disabled => Some(self.initialize_async()),
            ClientState::Initializing | ClientState::Ready => None,
        }
    }

    async fn run_initialize(&self, generation: u64) -> bool {
        let config = self.store.snapshot();
        if !config.sentiment.enabled {
            {
                let mut shared = self.lock();
                if self.generation.load(Ordering::SeqCst) == generation {
                    shared.state = ClientState::Uninitialized;
                }
            }
            self.report("情感匹配功能未启用，跳过初始化");
            self.notify(SentimentStatus::DISABLED);
            return false;
        }

        let client = config.sentiment.client_config();
        self.lock().active_config = Some(client.clone());
        log::info!(
            "🧠 开始初始化情感分析器 client={} model={} base_url={}",
            client.client_type,
            client.model,
            client.base_url
        );

        let result = match (self.factory)(&client) {
            Ok(backend) => {
                let analyzer = SentimentAnalyzer::new(backend, client.model.clone(), config.emotion_list);
                analyzer.connect().await.map(|_| analyzer)
            }
            Err(err) => Err(err),
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("⏹️ 丢弃过期的初始化结果 generation={}", generation);
            return false;
        }

        match result {
            Ok(analyzer) => {
                {
                    let mut shared = self.lock();
                    shared.state = ClientState::Ready;
                    shared.analyzer = Some(Arc::new(analyzer));
                }
                self.report("情感分析器初始化完成，功能已启用");
                self.notify(SentimentStatus::READY);
                true
            }
            Err(err) => {
                self.fail(&format!("情感分析器初始化失败: {}，功能已禁用", err));
                false
            }
        }
    }

    /// 任何失败：禁用、持久化、报告原因。
    fn fail(&self, message: &str) {
        log::warn!("⚠️ {}", message);
        {
            let mut shared = self.lock();
            shared.state = ClientState::Disabled;
            shared.analyzer = None;
        }
        self.store.disable_sentiment();
        self.report(message);
        self.notify(SentimentStatus::DISABLED);
    }

    /// 对文本做一次情感分类。
    ///
    /// 功能关闭时返回 `None`。尚未初始化时只在后台开始初始化，本次返回 `None`；
    /// 已就绪但客户端配置与上次初始化不同时，先重新初始化并等待完成。
    /// 请求失败会禁用子系统并返回 `None`。
    pub async fn classify(self: &Arc<Self>, text: &str) -> Option<String> {
        let config = self.store.snapshot();
        if !config.sentiment.enabled {
            let was_ready = {
                let mut shared = self.lock();
                let was_ready = shared.state == ClientState::Ready;
                if was_ready {
                    shared.state = ClientState::Uninitialized;
                    shared.analyzer = None;
                }
                was_ready
            };
            if was_ready {
                self.report("情感匹配已禁用，重置分析器状态");
                self.notify(SentimentStatus::DISABLED);
            }
            return None;
        }

        let client = config.sentiment.client_config();
        let (state, changed) = {
            let shared = self.lock();
            (shared.state, shared.active_config.as_ref() != Some(&client))
        };

        if state == ClientState::Initializing {
            log::debug!("⏳ 情感分析器正在初始化，本次跳过");
            return None;
        }

        if state != ClientState::Ready {
            log::info!("⏳ 情感分析器尚未初始化，后台初始化，本次跳过");
            drop(self.initialize_async());
            return None;
        }

        if changed {
            self.report("AI配置已更改，重新初始化情感分析器");
            self.notify(SentimentStatus::DISABLED);
            let ready = match self.initialize_async().await {
                Ok(ready) => ready,
                Err(err) => {
                    log::error!("❌ 初始化任务异常结束: {}", err);
                    false
                }
            };
            if !ready {
                return None;
            }
        }

        let analyzer = self.lock().analyzer.clone()?;
        match analyzer.classify(text).await {
            Ok(emotion) => emotion,
            Err(err) => {
                self.fail(&format!("情感分析请求失败: {}，功能已禁用", err));
                None
            }
        }
    }

    /// 从给定选项中挑选，分析器未就绪时返回 `None`。
    pub async fn classify_with_options(&self, text: &str, options: &[String]) -> Option<String> {
        let analyzer = self.lock().analyzer.clone()?;
        analyzer.classify_with_options(text, options).await
    }

    /// GUI 开关：初始化中忽略；开启时按需初始化；关闭时持久化并通知。
    ///
    /// 可在运行时之外的线程调用，前提是管理器由 `with_runtime` 构造。
    pub fn toggle(self: &Arc<Self>) -> Option<JoinHandle<bool>> {
        if self.is_initializing() {
            return None;
        }

        let enabled = self.store.snapshot().sentiment.enabled;
        if !enabled {
            self.store.set_sentiment_enabled(true);
            if self.is_ready() {
                self.report("已启用情感匹配功能");
                self.notify(SentimentStatus::READY);
                None
            } else {
                self.report("正在初始化情感分析器...");
                Some(self.initialize_async())
            }
        } else {
            self.store.set_sentiment_enabled(false);
            self.report("已禁用情感匹配功能");
            self.notify(SentimentStatus {
                initialized: self.is_ready(),
                enabled: false,
                initializing: false,
            });
            None
        }
    }

    /// 用临时分析器测试连接；成功后替换当前分析器，失败不影响现有状态。
    pub async fn test_connection(&self, client: SentimentClientConfig) -> bool {
        let emotions = self.store.snapshot().emotion_list;
        let result: Result<SentimentAnalyzer, SentimentError> = match (self.factory)(&client) {
            Ok(backend) => {
                let analyzer = SentimentAnalyzer::new(backend, client.model.clone(), emotions);
                analyzer.connect().await.map(|_| analyzer)
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(analyzer) => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                {
                    let mut shared = self.lock();
                    shared.state = ClientState::Ready;
                    shared.analyzer = Some(Arc::new(analyzer));
                    shared.active_config = Some(client.clone());
                }
                self.report(&format!("AI连接测试成功: {}", client.client_type));
                self.notify(SentimentStatus::READY);
                true
            }
            Err(err) => {
                log::warn!("⚠️ AI连接测试失败 client={} error={}", client.client_type, err);
                self.report(&format!("AI连接测试失败: {}: {}", client.client_type, err));
                self.notify(SentimentStatus::DISABLED);
                false
            }
        }
    }
}
