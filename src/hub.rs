// 进度中心
//
// 持有上传跟踪器与任务跟踪器，把入站事件分发到对应跟踪器，
// 并把用户触发的取消请求转发到出站通道（由传输层发送给服务端）。

use crate::common::Clock;
use crate::config::AppConfig;
use crate::error::{Outcome, TrackerResult};
use crate::events::{ClientAction, TrackerEvent};
use crate::tasks::{RemovalStep, TaskTracker, TaskView};
use crate::uploader::{ClearReport, UploadTracker, UploadView};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// 全量快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubSnapshot {
    pub uploads: Vec<UploadView>,
    pub tasks: Vec<TaskView>,
}

/// 进度中心
pub struct ProgressHub {
    uploads: UploadTracker,
    tasks: TaskTracker,
    outbound: mpsc::UnboundedSender<ClientAction>,
    chunk_size: u64,
}

impl ProgressHub {
    pub fn new(
        config: &AppConfig,
        clock: Arc<dyn Clock>,
        outbound: mpsc::UnboundedSender<ClientAction>,
    ) -> Self {
        Self {
            uploads: UploadTracker::new(config.upload.sample_window(), Arc::clone(&clock)),
            tasks: TaskTracker::new(clock, config.task.cancel_confirm_required),
            outbound,
            chunk_size: config.upload.chunk_size_bytes,
        }
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut UploadTracker {
        &mut self.uploads
    }

    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskTracker {
        &mut self.tasks
    }

    /// 分发一个入站事件
    ///
    /// 硬错误记录 error 日志后原样返回，跟踪器状态不变
    pub fn dispatch(&mut self, event: &TrackerEvent) -> TrackerResult {
        if event.is_progress() {
            debug!("分发事件: type={}, id={}", event.event_type_name(), event.subject_id());
        } else {
            info!("分发事件: type={}, id={}", event.event_type_name(), event.subject_id());
        }

        let result = self.route(event);
        if let Err(e) = &result {
            error!(
                "事件处理失败: type={}, id={}, 错误: {}",
                event.event_type_name(),
                event.subject_id(),
                e
            );
        }
        result
    }

    fn route(&mut self, event: &TrackerEvent) -> TrackerResult {
        match event {
            TrackerEvent::UploadRegistered {
                key,
                upload_task_id,
                name,
                is_directory,
                total_bytes,
                parent_key,
            } => self.uploads.register_upload(
                key,
                upload_task_id,
                name,
                *is_directory,
                *total_bytes,
                parent_key.as_deref(),
            ),
            TrackerEvent::ChunkRegistered {
                key,
                chunk_index,
                chunk_size,
            } => self.uploads.register_chunk(key, *chunk_index, *chunk_size),
            TrackerEvent::ChunkProgress {
                key,
                chunk_index,
                bytes_so_far,
            } => Ok(self
                .uploads
                .apply_chunk_progress(key, *chunk_index, *bytes_so_far)?
                .map(|_| ())),
            TrackerEvent::ChunkComplete { key, chunk_index } => {
                Ok(self.uploads.mark_chunk_complete(key, *chunk_index).map(|_| ()))
            }
            TrackerEvent::UploadError { key, error } => Ok(self.uploads.set_error(key, error)),
            TrackerEvent::TaskCreated {
                task_id, task_type, ..
            } => {
                let options = event.new_task_options().unwrap_or_default();
                self.tasks.create_task_from_wire(task_id, task_type, options)
            }
            TrackerEvent::TaskProgress { task_id, .. } => {
                let update = event.progress_update().unwrap_or_default();
                self.tasks.update_progress(task_id, &update)
            }
            TrackerEvent::TaskComplete {
                task_id,
                elapsed_ns,
                note,
            } => Ok(self.tasks.handle_complete(task_id, *elapsed_ns, note.clone())),
            TrackerEvent::TaskFailed { task_id, error } => {
                Ok(self.tasks.handle_failure(task_id, error))
            }
            TrackerEvent::TaskCancelled { task_id } => Ok(self.tasks.handle_cancel(task_id)),
        }
    }

    /// 按配置的分片大小为文件登记全部分片
    pub fn register_file_chunks(&mut self, key: &str) -> TrackerResult<usize> {
        self.uploads.register_file_chunks(key, self.chunk_size)
    }

    /// 清空上传列表，并为每个在途上传发送取消请求
    pub fn clear_uploads(&mut self) -> ClearReport {
        let report = self.uploads.clear_uploads();
        for target_id in &report.cancel_targets {
            self.send(ClientAction::CancelTask {
                target_id: target_id.clone(),
            });
        }
        report
    }

    /// 用户取消任务
    pub fn cancel_task(&mut self, task_id: &str) -> Outcome<String> {
        let outcome = self.tasks.cancel_task(task_id);
        if let Outcome::Applied(target_id) = &outcome {
            self.send(ClientAction::CancelTask {
                target_id: target_id.clone(),
            });
        }
        outcome
    }

    /// 用户请求移除任务（未结束的任务走两步确认）
    pub fn request_task_removal(&mut self, task_id: &str) -> Outcome<RemovalStep> {
        let outcome = self.tasks.request_removal(task_id);
        if let Outcome::Applied(RemovalStep::Cancelled { target_id }) = &outcome {
            self.send(ClientAction::CancelTask {
                target_id: target_id.clone(),
            });
        }
        outcome
    }

    pub fn snapshot(&self, include_hidden: bool) -> HubSnapshot {
        HubSnapshot {
            uploads: self.uploads.snapshot(),
            tasks: self.tasks.snapshot(include_hidden),
        }
    }

    fn send(&self, action: ClientAction) {
        let target_id = action.target_id().to_string();
        if self.outbound.send(action).is_err() {
            warn!("出站通道已关闭，取消请求未发送: target={}", target_id);
        } else {
            info!("已发送取消请求: target={}", target_id);
        }
    }
}
