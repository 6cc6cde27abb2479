// 任务跟踪模块
//
// 镜像服务端异步任务（扫描、压缩、下载准备、备份）的进度，
// 由 WebSocket 推送的任务事件驱动。

pub mod record;
pub mod tracker;
pub mod types;

pub use record::TaskRecord;
pub use tracker::{RemovalStep, TaskTracker, TaskView};
pub use types::{NewTaskOptions, ProgressUpdate, TaskStage, TaskType, WorkingOnItem};
