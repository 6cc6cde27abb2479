// 配置管理模块

use crate::uploader::{SampleWindow, DEFAULT_UPLOAD_CHUNK_SIZE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
    /// 上传跟踪配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 任务跟踪配置
    #[serde(default)]
    pub task: TaskConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
        }
    }
}

/// 上传跟踪配置
///
/// 控制吞吐采样窗口与客户端分片大小
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 计算瞬时速度时回看的样本数
    #[serde(default = "default_speed_window_samples")]
    pub speed_window_samples: usize,
    /// 展示速度取平均的样本数
    #[serde(default = "default_rolling_average_samples")]
    pub rolling_average_samples: usize,
    /// 目录采样最小间隔（毫秒）
    #[serde(default = "default_directory_sample_interval_ms")]
    pub directory_sample_interval_ms: i64,
    /// 每条记录保留的样本上限
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// 分片大小（字节）
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: u64,
}

fn default_speed_window_samples() -> usize {
    6
}

fn default_rolling_average_samples() -> usize {
    20
}

fn default_directory_sample_interval_ms() -> i64 {
    250
}

fn default_max_samples() -> usize {
    20
}

fn default_chunk_size_bytes() -> u64 {
    DEFAULT_UPLOAD_CHUNK_SIZE
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            speed_window_samples: default_speed_window_samples(),
            rolling_average_samples: default_rolling_average_samples(),
            directory_sample_interval_ms: default_directory_sample_interval_ms(),
            max_samples: default_max_samples(),
            chunk_size_bytes: default_chunk_size_bytes(),
        }
    }
}

impl UploadConfig {
    /// 校验采样参数
    pub fn validate(&self) -> Result<()> {
        if self.speed_window_samples == 0 || self.rolling_average_samples == 0 {
            anyhow::bail!(
                "采样窗口必须大于 0: speed_window_samples={}, rolling_average_samples={}",
                self.speed_window_samples,
                self.rolling_average_samples
            );
        }
        if self.chunk_size_bytes == 0 {
            anyhow::bail!("分片大小必须大于 0");
        }
        if self.directory_sample_interval_ms < 0 {
            anyhow::bail!(
                "目录采样间隔不能为负数: {}",
                self.directory_sample_interval_ms
            );
        }
        Ok(())
    }

    /// 转换为记录使用的采样窗口
    ///
    /// 样本上限不低于两个窗口中较大的一个
    pub fn sample_window(&self) -> SampleWindow {
        let floor = self.speed_window_samples.max(self.rolling_average_samples);
        SampleWindow {
            speed_window: self.speed_window_samples,
            rolling_average: self.rolling_average_samples,
            directory_interval_ms: self.directory_sample_interval_ms,
            max_samples: self.max_samples.max(floor),
        }
    }
}

/// 任务跟踪配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// 移除未结束的任务前是否需要二次确认
    #[serde(default = "default_cancel_confirm_required")]
    pub cancel_confirm_required: bool,
}

fn default_cancel_confirm_required() -> bool {
    true
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            cancel_confirm_required: default_cancel_confirm_required(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        config
            .upload
            .validate()
            .context("配置文件中的上传采样参数无效")?;

        Ok(config)
    }

    /// 加载配置，失败时使用默认配置
    pub async fn load_or_default(path: &str) -> Self {
        match Self::load_from_file(path).await {
            Ok(config) => {
                tracing::info!("配置文件加载成功: {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("配置文件加载失败，使用默认配置: {:#}", e);
                Self::default()
            }
        }
    }
}
