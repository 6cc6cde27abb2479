use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use weblens_progress::{
    events::{ClientAction, TimestampedEvent},
    logging, AppConfig, ManualClock, ProgressHub,
};

/// 回放事件日志，输出跟踪器最终快照
#[derive(Debug, Parser)]
#[command(name = "weblens-replay", version, about, long_about = None)]
struct Cli {
    /// JSON Lines 事件文件，每行一个带时间戳的事件
    #[arg(long, env = "WEBLENS_EVENTS")]
    events: PathBuf,

    /// 配置文件
    #[arg(long, env = "WEBLENS_CONFIG", default_value = "config/progress.toml")]
    config: String,

    /// 快照中包含已隐藏的任务
    #[arg(long)]
    include_hidden: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config).await;
    let _log_guard = logging::init_logging(&config.log);

    info!("weblens-replay v{} 启动: events={:?}", env!("CARGO_PKG_VERSION"), cli.events);

    let content = tokio::fs::read_to_string(&cli.events)
        .await
        .with_context(|| format!("读取事件文件失败: {:?}", cli.events))?;

    let clock = ManualClock::new(0);
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientAction>();
    let mut hub = ProgressHub::new(&config, Arc::new(clock.clone()), tx);

    let mut applied = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event: TimestampedEvent = serde_json::from_str(line)
            .with_context(|| format!("第 {} 行事件解析失败", line_no + 1))?;

        clock.set(event.timestamp);
        match hub.dispatch(&event.event) {
            Ok(outcome) if outcome.is_applied() => applied += 1,
            Ok(_) => skipped += 1,
            Err(e) => {
                warn!("第 {} 行事件被拒绝 (event_id={}): {}", line_no + 1, event.event_id, e);
                failed += 1;
            }
        }
    }

    info!(
        "回放完成: 应用={}, 忽略={}, 拒绝={}",
        applied, skipped, failed
    );

    let mut cancellations = Vec::new();
    while let Ok(action) = rx.try_recv() {
        cancellations.push(action);
    }

    let output = serde_json::json!({
        "snapshot": hub.snapshot(cli.include_hidden),
        "cancellations": cancellations,
        "stats": {
            "applied": applied,
            "skipped": skipped,
            "rejected": failed,
        },
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("序列化快照失败")?
    );

    Ok(())
}
