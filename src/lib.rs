// Weblens progress tracking library
// Weblens 客户端上传/任务进度跟踪核心库

// 错误与操作结果
pub mod error;

// 🔥 公共模块（时钟）
pub mod common;

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// 进度计算与格式化
pub mod progress;

// 上传跟踪模块
pub mod uploader;

// 任务跟踪模块
pub mod tasks;

// 事件模块
pub mod events;

// 进度中心
pub mod hub;

// 导出常用类型
pub use common::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{Outcome, SkipReason, TrackerError, TrackerResult};
pub use events::{ClientAction, TimestampedEvent, TrackerEvent};
pub use hub::{HubSnapshot, ProgressHub};
pub use tasks::{
    NewTaskOptions, ProgressUpdate, RemovalStep, TaskRecord, TaskStage, TaskTracker, TaskType,
    TaskView, WorkingOnItem,
};
pub use uploader::{
    plan_chunks, ClearReport, UploadChunk, UploadRecord, UploadTracker, UploadView,
    UPLOAD_CANCELLED,
};
