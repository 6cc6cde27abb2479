//! 跟踪器事件类型定义
//!
//! 入站事件来自两个来源：
//! - 客户端分片上传循环（上传注册、分片创建/推进/完成、上传错误）
//! - 服务端 WebSocket 推送（任务创建/进度/完成/失败/取消）

use crate::tasks::{NewTaskOptions, ProgressUpdate, TaskType};
use serde::{Deserialize, Serialize};

/// 入站事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// 上传登记（任何字节传输之前）
    UploadRegistered {
        key: String,
        upload_task_id: String,
        name: String,
        #[serde(default)]
        is_directory: bool,
        #[serde(default)]
        total_bytes: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_key: Option<String>,
    },
    /// 分片创建
    ChunkRegistered {
        key: String,
        chunk_index: usize,
        chunk_size: u64,
    },
    /// 分片进度（分片内累计字节）
    ChunkProgress {
        key: String,
        chunk_index: usize,
        bytes_so_far: u64,
    },
    /// 分片完成
    ChunkComplete { key: String, chunk_index: usize },
    /// 上传失败
    UploadError { key: String, error: String },
    /// 任务创建
    TaskCreated {
        task_id: String,
        /// 线上类型标签，解析失败时为硬错误
        task_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pool_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_progress: Option<f64>,
    },
    /// 任务进度
    TaskProgress {
        task_id: String,
        #[serde(default)]
        progress: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tasks_complete: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tasks_total: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tasks_failed: Option<u64>,
        /// 存在表示 `item_id` 开始处理，缺省表示 `item_id` 处理结束
        #[serde(default, skip_serializing_if = "Option::is_none")]
        working_on: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finished: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_type: Option<TaskType>,
    },
    /// 任务完成
    TaskComplete {
        task_id: String,
        #[serde(default)]
        elapsed_ns: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// 任务失败
    TaskFailed { task_id: String, error: String },
    /// 任务被取消（含整个任务池被取消）
    TaskCancelled { task_id: String },
}

impl TrackerEvent {
    /// 事件所属记录的 ID（上传 key 或任务 ID）
    pub fn subject_id(&self) -> &str {
        match self {
            TrackerEvent::UploadRegistered { key, .. } => key,
            TrackerEvent::ChunkRegistered { key, .. } => key,
            TrackerEvent::ChunkProgress { key, .. } => key,
            TrackerEvent::ChunkComplete { key, .. } => key,
            TrackerEvent::UploadError { key, .. } => key,
            TrackerEvent::TaskCreated { task_id, .. } => task_id,
            TrackerEvent::TaskProgress { task_id, .. } => task_id,
            TrackerEvent::TaskComplete { task_id, .. } => task_id,
            TrackerEvent::TaskFailed { task_id, .. } => task_id,
            TrackerEvent::TaskCancelled { task_id } => task_id,
        }
    }

    /// 获取事件类型名称
    pub fn event_type_name(&self) -> &'static str {
        match self {
            TrackerEvent::UploadRegistered { .. } => "upload_registered",
            TrackerEvent::ChunkRegistered { .. } => "chunk_registered",
            TrackerEvent::ChunkProgress { .. } => "chunk_progress",
            TrackerEvent::ChunkComplete { .. } => "chunk_complete",
            TrackerEvent::UploadError { .. } => "upload_error",
            TrackerEvent::TaskCreated { .. } => "task_created",
            TrackerEvent::TaskProgress { .. } => "task_progress",
            TrackerEvent::TaskComplete { .. } => "task_complete",
            TrackerEvent::TaskFailed { .. } => "task_failed",
            TrackerEvent::TaskCancelled { .. } => "task_cancelled",
        }
    }

    /// 是否为高频进度事件（日志使用 debug 级别）
    pub fn is_progress(&self) -> bool {
        matches!(
            self,
            TrackerEvent::ChunkProgress { .. } | TrackerEvent::TaskProgress { .. }
        )
    }

    /// 任务进度事件转换为进度更新参数
    pub fn progress_update(&self) -> Option<ProgressUpdate> {
        match self {
            TrackerEvent::TaskProgress {
                progress,
                tasks_complete,
                tasks_total,
                tasks_failed,
                working_on,
                item_id,
                finished,
                task_type,
                ..
            } => Some(ProgressUpdate {
                progress: *progress,
                tasks_complete: *tasks_complete,
                tasks_total: *tasks_total,
                tasks_failed: *tasks_failed,
                working_on: working_on.clone(),
                item_id: item_id.clone(),
                finished: finished.clone(),
                task_type: *task_type,
            }),
            _ => None,
        }
    }

    /// 任务创建事件的可选参数
    pub fn new_task_options(&self) -> Option<NewTaskOptions> {
        match self {
            TrackerEvent::TaskCreated {
                target,
                pool_id,
                initial_progress,
                ..
            } => Some(NewTaskOptions {
                target: target.clone(),
                initial_progress: *initial_progress,
                pool_id: pool_id.clone(),
            }),
            _ => None,
        }
    }
}

/// 带时间戳的事件包装器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedEvent {
    /// 事件 ID（递增）
    pub event_id: u64,
    /// 时间戳（Unix 毫秒）
    pub timestamp: i64,
    /// 事件内容
    #[serde(flatten)]
    pub event: TrackerEvent,
}

impl TimestampedEvent {
    pub fn new(event_id: u64, event: TrackerEvent) -> Self {
        Self {
            event_id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            event,
        }
    }
}

/// 客户端发往服务端的请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// 取消任务（任务池 ID 优先，否则为任务 ID / 上传任务 ID）
    CancelTask { target_id: String },
}

impl ClientAction {
    pub fn target_id(&self) -> &str {
        match self {
            ClientAction::CancelTask { target_id } => target_id,
        }
    }
}
