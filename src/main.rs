//! # 魔裁文本框：命令行入口
//!
//! 本文件只负责日志初始化、参数解析与组件装配，
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use manosaba_textbox::cache::CacheManager;
use manosaba_textbox::config::ConfigStore;
use manosaba_textbox::error::AppError;
use manosaba_textbox::pipeline::DispatchPipeline;
use manosaba_textbox::platform::{ArboardClipboard, EnigoKeyboard, SystemForeground};
use manosaba_textbox::preload::PreloadScheduler;
use manosaba_textbox::render::BasicRenderer;
use manosaba_textbox::sentiment::{SentimentClientManager, openai_factory};
use manosaba_textbox::status::{StatusCallback, log_lifecycle, log_status};

const PRELOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Parser)]
#[command(name = "manosaba-textbox", version, about = "把剪贴板文字合成为角色对话框图片")]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 执行一次完整调度：剪切、合成、写回剪贴板并按配置粘贴发送
    Generate,
    /// 生成不含文字的预览图
    Preview {
        #[arg(long, default_value = "preview.png")]
        out: PathBuf,
    },
    /// 预加载指定角色的全部表情并等待完成
    Preload { character: String },
    /// 测试当前配置的 AI 后端连接
    TestAi,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let store = ConfigStore::load(&cli.config)?;
    let cache = Arc::new(CacheManager::new(store.clone()));
    let status = log_status();

    match cli.command {
        Command::Generate => {
            let manager = SentimentClientManager::new(
                store.clone(),
                openai_factory(),
                status.clone(),
                log_lifecycle(),
            );
            // 启动阶段完成初始化，生成流程不再等待握手
            if let Some(startup) = manager.start() {
                if let Err(err) = startup.await {
                    log::error!("❌ 情感分析器初始化任务异常结束: {}", err);
                }
            }
            let pipeline = build_pipeline(&store, &cache, status).with_sentiment(manager);
            let result = pipeline.generate_image().await;
            println!("{}", result);
        }
        Command::Preview { out } => {
            let pipeline = build_pipeline(&store, &cache, status);
            let (image, info) = pipeline.generate_preview();
            image
                .save(&out)
                .map_err(|e| AppError::Image(format!("保存预览图失败: {}", e)))?;
            println!("{}", info);
            log::info!("✅ 预览图已保存: {}", out.display());
        }
        Command::Preload { character } => {
            let scheduler = PreloadScheduler::spawn(Arc::clone(&cache), store.clone(), status)?;
            scheduler.submit(&character);
            let (done, progress) = tokio::task::spawn_blocking(move || {
                let done = scheduler.wait_idle(PRELOAD_TIMEOUT);
                (done, scheduler.status())
            })
            .await
            .map_err(|e| AppError::Config(format!("预加载等待任务失败: {}", e)))?;

            if !done {
                log::warn!("⚠️ 预加载等待超时");
            }
            println!("{}: {}/{}", character, progress.loaded, progress.total);
        }
        Command::TestAi => {
            let manager = SentimentClientManager::new(
                store.clone(),
                openai_factory(),
                status,
                log_lifecycle(),
            );
            let client = store.snapshot().sentiment.client_config();
            let ok = manager.test_connection(client).await;
            println!("{}", if ok { "连接成功" } else { "连接失败" });
        }
    }

    Ok(())
}

fn build_pipeline(
    store: &ConfigStore,
    cache: &Arc<CacheManager>,
    status: StatusCallback,
) -> DispatchPipeline {
    let renderer = Arc::new(BasicRenderer::new(Arc::clone(cache), store.clone()));
    DispatchPipeline::new(
        store.clone(),
        Arc::clone(cache),
        renderer,
        Arc::new(ArboardClipboard::new()),
        Arc::new(EnigoKeyboard::new()),
        Arc::new(SystemForeground::new()),
        status,
    )
}
