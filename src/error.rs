//! 跟踪器错误与操作结果
//!
//! 两类失败分开表达：
//! - `TrackerError`：调用方违反前置条件（身份字段缺失、字节回退），直接返回 `Err`
//! - `Outcome::Skipped`：事件与注册之间的竞争导致的一致性警告，记录日志后不改变状态

use serde::Serialize;
use thiserror::Error;

/// 硬错误：调用方逻辑错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// 必填身份字段为空
    #[error("必填字段为空: {field}")]
    MissingIdentity { field: &'static str },

    /// 无法识别的任务类型
    #[error("未知任务类型: {0}")]
    UnknownTaskType(String),

    /// 分片进度回退（传输层应保证单调不减）
    #[error(
        "分片进度回退: key={key}, chunk={chunk_index}, 之前={previous}, 上报={reported}"
    )]
    NegativeDelta {
        key: String,
        chunk_index: usize,
        previous: u64,
        reported: u64,
    },

    /// 分片进度超过分片大小
    #[error(
        "分片进度超出分片大小: key={key}, chunk={chunk_index}, 上报={reported}, 容量={capacity}"
    )]
    ChunkOverflow {
        key: String,
        chunk_index: usize,
        reported: u64,
        capacity: u64,
    },
}

/// 一致性警告的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownUpload,
    UnknownParent,
    ParentNotDirectory,
    DuplicateUpload,
    UnknownChunk,
    NotAFile,
    UploadFrozen,
    ChunkAlreadyRegistered,
    ChunkAlreadyComplete,
    ErrorAlreadySet,
    UnknownTask,
    TaskTerminal,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnknownUpload => "unknown_upload",
            SkipReason::UnknownParent => "unknown_parent",
            SkipReason::ParentNotDirectory => "parent_not_directory",
            SkipReason::DuplicateUpload => "duplicate_upload",
            SkipReason::UnknownChunk => "unknown_chunk",
            SkipReason::NotAFile => "not_a_file",
            SkipReason::UploadFrozen => "upload_frozen",
            SkipReason::ChunkAlreadyRegistered => "chunk_already_registered",
            SkipReason::ChunkAlreadyComplete => "chunk_already_complete",
            SkipReason::ErrorAlreadySet => "error_already_set",
            SkipReason::UnknownTask => "unknown_task",
            SkipReason::TaskTerminal => "task_terminal",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 变更操作的结果：已应用，或被跳过（已记录警告）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    Applied(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
        }
    }
}

/// 跟踪器操作的返回类型
pub type TrackerResult<T = ()> = Result<Outcome<T>, TrackerError>;
