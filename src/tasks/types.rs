//! 任务类型、阶段与进度更新参数

use crate::error::TrackerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 服务端任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    /// 目录扫描
    #[serde(rename = "scan_directory")]
    ScanDirectory,
    /// 创建压缩包
    #[serde(rename = "create_zip")]
    CreateZip,
    /// 文件下载准备
    #[serde(rename = "download_file")]
    DownloadFile,
    /// 备份
    #[serde(rename = "do_backup")]
    Backup,
}

impl TaskType {
    /// 线上标签
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ScanDirectory => "scan_directory",
            TaskType::CreateZip => "create_zip",
            TaskType::DownloadFile => "download_file",
            TaskType::Backup => "do_backup",
        }
    }

    /// 展示用短名称
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::ScanDirectory => "Scan",
            TaskType::CreateZip => "Zip",
            TaskType::DownloadFile => "Download",
            TaskType::Backup => "Backup",
        }
    }

    /// 是否按子单元计数（完成/失败/总数 + 正在处理列表）
    pub fn is_counted(&self) -> bool {
        match self {
            TaskType::ScanDirectory | TaskType::CreateZip => true,
            TaskType::DownloadFile | TaskType::Backup => false,
        }
    }
}

impl FromStr for TaskType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(TrackerError::MissingIdentity { field: "task_type" }),
            "scan_directory" => Ok(TaskType::ScanDirectory),
            "create_zip" => Ok(TaskType::CreateZip),
            "download_file" => Ok(TaskType::DownloadFile),
            "do_backup" => Ok(TaskType::Backup),
            other => Err(TrackerError::UnknownTaskType(other.to_string())),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务阶段
///
/// Queued -> InProgress -> Complete；Cancelled / Failure 只能从前两个阶段进入。
/// 三个终态之间互斥，进入终态后不再变化
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    Queued,
    InProgress,
    Complete,
    Cancelled,
    Failure,
}

impl TaskStage {
    pub fn priority(&self) -> u8 {
        match self {
            TaskStage::Queued => 0,
            TaskStage::InProgress => 1,
            TaskStage::Complete => 2,
            TaskStage::Cancelled | TaskStage::Failure => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStage::Complete | TaskStage::Cancelled | TaskStage::Failure
        )
    }

    /// 乱序到达的低优先级阶段不能覆盖高优先级阶段
    pub fn can_transition_to(&self, next: TaskStage) -> bool {
        !self.is_terminal() && next.priority() >= self.priority()
    }
}

/// 正在处理的子项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingOnItem {
    pub item_id: String,
    pub item_name: String,
    /// 开始时间（Unix 毫秒）
    pub start_time_epoch_ms: i64,
}

impl WorkingOnItem {
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.start_time_epoch_ms).max(0)
    }
}

/// 进度更新参数
///
/// 计数字段是服务端给出的绝对值。`working_on` 存在表示 `item_id` 开始处理，
/// 缺省表示 `item_id` 处理结束
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub tasks_complete: Option<u64>,
    #[serde(default)]
    pub tasks_total: Option<u64>,
    #[serde(default)]
    pub tasks_failed: Option<u64>,
    #[serde(default)]
    pub working_on: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    /// 刚完成的子项名称（没有子项 ID 时用于匹配处理列表）
    #[serde(default)]
    pub finished: Option<String>,
    /// 任务尚未登记时用于创建任务
    #[serde(default)]
    pub task_type: Option<TaskType>,
}

impl ProgressUpdate {
    pub fn new(progress: f64) -> Self {
        Self {
            progress,
            ..Default::default()
        }
    }

    pub fn counts(mut self, complete: u64, total: u64, failed: u64) -> Self {
        self.tasks_complete = Some(complete);
        self.tasks_total = Some(total);
        self.tasks_failed = Some(failed);
        self
    }

    pub fn started(mut self, item_id: impl Into<String>, item_name: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self.working_on = Some(item_name.into());
        self
    }

    pub fn finished(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self.working_on = None;
        self
    }
}

/// 创建任务的可选参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTaskOptions {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub initial_progress: Option<f64>,
    #[serde(default)]
    pub pool_id: Option<String>,
}
