//! 任务记录

use crate::error::{Outcome, SkipReason};
use crate::progress;
use crate::tasks::types::{ProgressUpdate, TaskStage, TaskType, WorkingOnItem};
use tracing::{debug, warn};

/// 一个服务端异步任务在客户端的镜像
#[derive(Debug, Clone)]
pub struct TaskRecord {
    task_id: String,
    pool_id: Option<String>,
    task_type: TaskType,
    target: Option<String>,
    stage: TaskStage,

    /// 服务端上报的原始百分比（不计数的任务类型使用）
    progress_percent: f64,
    tasks_complete: u64,
    tasks_failed: u64,
    tasks_total: u64,

    time_ns: u64,
    note: Option<String>,
    error: Option<String>,
    working_on: Vec<WorkingOnItem>,

    hidden: bool,
    created_at_ms: i64,
}

impl TaskRecord {
    pub(crate) fn new(task_id: String, task_type: TaskType, now_ms: i64) -> Self {
        Self {
            task_id,
            pool_id: None,
            task_type,
            target: None,
            stage: TaskStage::Queued,
            progress_percent: 0.0,
            tasks_complete: 0,
            tasks_failed: 0,
            tasks_total: 0,
            time_ns: 0,
            note: None,
            error: None,
            working_on: Vec::new(),
            hidden: false,
            created_at_ms: now_ms,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn pool_id(&self) -> Option<&str> {
        self.pool_id.as_deref()
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn stage(&self) -> TaskStage {
        self.stage
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn tasks_complete(&self) -> u64 {
        self.tasks_complete
    }

    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed
    }

    pub fn tasks_total(&self) -> u64 {
        self.tasks_total
    }

    pub fn time_ns(&self) -> u64 {
        self.time_ns
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn working_on(&self) -> &[WorkingOnItem] {
        &self.working_on
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    /// 取消请求的目标：优先使用任务池 ID
    pub fn cancel_target(&self) -> &str {
        self.pool_id.as_deref().unwrap_or(&self.task_id)
    }

    /// 健康进度（百分比）
    ///
    /// 完成后恒为 100；有失败子单元时不计入失败部分；否则使用服务端原始百分比
    pub fn progress(&self) -> f64 {
        if self.stage == TaskStage::Complete {
            return 100.0;
        }
        if self.tasks_failed > 0 {
            return progress::healthy_progress(
                self.tasks_complete,
                self.tasks_failed,
                self.tasks_total,
            );
        }
        self.progress_percent
    }

    /// 含失败子单元的进度，作为错误色段叠在健康进度下方
    pub fn error_progress(&self) -> f64 {
        if self.stage == TaskStage::Complete {
            return 100.0;
        }
        if self.tasks_failed > 0 {
            return progress::attempted_progress(self.tasks_complete, self.tasks_total);
        }
        0.0
    }

    /// 展示名称，如 "Scan photos"、"Scan folder"、"Zip"
    pub fn display_name(&self) -> String {
        let label = self.task_type.label();
        match (&self.target, self.task_type) {
            (Some(target), _) => format!("{} {}", label, target),
            (None, TaskType::ScanDirectory) => format!("{} folder", label),
            (None, _) => label.to_string(),
        }
    }

    /// 耗时的人类可读形式
    pub fn time_display(&self) -> String {
        progress::ns_to_human_time(self.time_ns)
    }

    pub(crate) fn set_target(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
    }

    pub(crate) fn set_pool_id(&mut self, pool_id: impl Into<String>) {
        self.pool_id = Some(pool_id.into());
    }

    pub(crate) fn set_progress_percent(&mut self, percent: f64) {
        self.progress_percent = percent;
    }

    pub(crate) fn hide(&mut self) {
        self.hidden = true;
    }

    /// 按优先级推进阶段，返回是否发生变化
    pub(crate) fn set_stage(&mut self, next: TaskStage) -> bool {
        if !self.stage.can_transition_to(next) {
            return false;
        }
        let changed = self.stage != next;
        self.stage = next;
        changed
    }

    /// 应用进度事件
    pub(crate) fn apply_progress(&mut self, update: &ProgressUpdate, now_ms: i64) -> Outcome {
        if self.stage.is_terminal() {
            return Outcome::Skipped(SkipReason::TaskTerminal);
        }

        self.set_stage(TaskStage::InProgress);
        self.progress_percent = update.progress;

        if self.task_type.is_counted() {
            match &update.working_on {
                Some(item_name) => self.start_item(update.item_id.as_deref(), item_name, now_ms),
                None => self.finish_item(update.item_id.as_deref(), update.finished.as_deref()),
            }

            if let Some(complete) = update.tasks_complete {
                self.tasks_complete = complete;
            }
            if let Some(total) = update.tasks_total {
                self.tasks_total = total;
            }
            if let Some(failed) = update.tasks_failed {
                self.tasks_failed = failed;
            }
        }

        Outcome::Applied(())
    }

    pub(crate) fn complete(&mut self, elapsed_ns: u64, note: Option<String>) -> Outcome {
        if !self.set_stage(TaskStage::Complete) {
            return Outcome::Skipped(SkipReason::TaskTerminal);
        }
        self.time_ns = elapsed_ns;
        self.note = note;
        self.working_on.clear();
        Outcome::Applied(())
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>) -> Outcome {
        if !self.set_stage(TaskStage::Failure) {
            return Outcome::Skipped(SkipReason::TaskTerminal);
        }
        self.error = Some(error.into());
        self.working_on.clear();
        Outcome::Applied(())
    }

    pub(crate) fn cancel(&mut self) -> Outcome {
        if !self.set_stage(TaskStage::Cancelled) {
            return Outcome::Skipped(SkipReason::TaskTerminal);
        }
        self.working_on.clear();
        Outcome::Applied(())
    }

    fn start_item(&mut self, item_id: Option<&str>, item_name: &str, now_ms: i64) {
        let item_id = item_id.unwrap_or_default();
        if !item_id.is_empty() && self.working_on.iter().any(|w| w.item_id == item_id) {
            warn!(
                "子项已在处理列表中，忽略重复开始: task={}, item={}",
                self.task_id, item_id
            );
            return;
        }
        self.working_on.push(WorkingOnItem {
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            start_time_epoch_ms: now_ms,
        });
    }

    fn finish_item(&mut self, item_id: Option<&str>, finished: Option<&str>) {
        let index = match (item_id, finished) {
            (Some(item_id), _) => self.working_on.iter().position(|w| w.item_id == item_id),
            // 没有子项 ID 时按名称匹配，找不到则移除最早开始的无 ID 子项
            (None, Some(name)) => self
                .working_on
                .iter()
                .position(|w| w.item_id.is_empty() && w.item_name == name)
                .or_else(|| self.working_on.iter().position(|w| w.item_id.is_empty())),
            // 只有百分比的进度事件（如扫描整体进度）
            (None, None) => return,
        };

        match index {
            Some(index) => {
                let item = self.working_on.remove(index);
                debug!(
                    "子项处理完成: task={}, item={}, name={}",
                    self.task_id,
                    item.item_id,
                    finished.unwrap_or(item.item_name.as_str())
                );
            }
            None => {
                warn!(
                    "处理列表中找不到已完成的子项: task={}, item={:?}, name={:?}",
                    self.task_id, item_id, finished
                );
            }
        }
    }
}
