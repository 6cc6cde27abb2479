// 上传跟踪模块
//
// 客户端分片上传循环（HTTP 传输不在本模块内）在分片创建、推进、完成时
// 同步调用 `UploadTracker`，跟踪器据此维护每个文件/目录的进度与吞吐。

pub mod chunk;
pub mod record;
pub mod tracker;

pub use chunk::{plan_chunks, UploadChunk, DEFAULT_UPLOAD_CHUNK_SIZE};
pub use record::{SampleWindow, ThroughputSample, UploadRecord};
pub use tracker::{ClearReport, UploadTracker, UploadView, UPLOAD_CANCELLED};
