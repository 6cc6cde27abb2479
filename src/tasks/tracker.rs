// 任务跟踪器
//
// 按服务端分配的 task_id 持有任务记录，应用任务生命周期事件。
// 阶段单调推进：终态之后到达的进度/完成/取消事件只记录日志，不改变状态。

use crate::common::{Clock, SystemClock};
use crate::error::{Outcome, SkipReason, TrackerError, TrackerResult};
use crate::tasks::record::TaskRecord;
use crate::tasks::types::{NewTaskOptions, ProgressUpdate, TaskStage, TaskType, WorkingOnItem};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 移除请求的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalStep {
    /// 任务已处于终态，直接移除
    Removed,
    /// 未结束的任务：已进入待确认状态，再次请求才会取消
    Armed,
    /// 已标记取消并移除，需要向服务端发送取消请求
    Cancelled { target_id: String },
}

/// 任务记录的只读快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub task_id: String,
    pub pool_id: Option<String>,
    pub task_type: TaskType,
    pub name: String,
    pub target: Option<String>,
    pub stage: TaskStage,
    pub progress: f64,
    pub error_progress: f64,
    pub tasks_complete: u64,
    pub tasks_failed: u64,
    pub tasks_total: u64,
    pub working_on: Vec<WorkingOnItem>,
    pub time: Option<String>,
    pub note: Option<String>,
    pub error: Option<String>,
    pub hidden: bool,
    /// 是否处于移除待确认状态
    pub removal_armed: bool,
}

/// 任务跟踪器
pub struct TaskTracker {
    tasks: HashMap<String, TaskRecord>,
    order: Vec<String>,
    armed: HashSet<String>,
    clock: Arc<dyn Clock>,
    confirm_required: bool,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), true)
    }
}

impl TaskTracker {
    pub fn new(clock: Arc<dyn Clock>, confirm_required: bool) -> Self {
        Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            armed: HashSet::new(),
            clock,
            confirm_required,
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskRecord> {
        self.tasks.get(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 按创建顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// 创建任务
    ///
    /// 已存在的任务只合并 target / pool_id，不重置进度
    pub fn create_task(
        &mut self,
        task_id: &str,
        task_type: TaskType,
        options: NewTaskOptions,
    ) -> TrackerResult {
        if task_id.is_empty() {
            return Err(TrackerError::MissingIdentity { field: "task_id" });
        }

        if let Some(existing) = self.tasks.get_mut(task_id) {
            if let Some(target) = options.target {
                existing.set_target(target);
            }
            if let Some(pool_id) = options.pool_id {
                existing.set_pool_id(pool_id);
            }
            debug!("任务已存在，合并创建参数: task={}", task_id);
            return Ok(Outcome::Applied(()));
        }

        let mut record = TaskRecord::new(task_id.to_string(), task_type, self.clock.now_ms());
        if let Some(target) = options.target {
            record.set_target(target);
        }
        if let Some(pool_id) = options.pool_id {
            record.set_pool_id(pool_id);
        }
        if let Some(progress) = options.initial_progress {
            record.set_progress_percent(progress);
        }

        info!("创建任务: task={}, type={}", task_id, task_type);
        self.tasks.insert(task_id.to_string(), record);
        self.order.push(task_id.to_string());
        Ok(Outcome::Applied(()))
    }

    /// 使用线上类型标签创建任务
    pub fn create_task_from_wire(
        &mut self,
        task_id: &str,
        task_type: &str,
        options: NewTaskOptions,
    ) -> TrackerResult {
        if task_id.is_empty() {
            return Err(TrackerError::MissingIdentity { field: "task_id" });
        }
        let task_type: TaskType = task_type.parse()?;
        self.create_task(task_id, task_type, options)
    }

    /// 应用进度事件
    pub fn update_progress(&mut self, task_id: &str, update: &ProgressUpdate) -> TrackerResult {
        if task_id.is_empty() {
            return Err(TrackerError::MissingIdentity { field: "task_id" });
        }

        if !self.tasks.contains_key(task_id) {
            match update.task_type {
                Some(task_type) => {
                    self.create_task(task_id, task_type, NewTaskOptions::default())?;
                }
                None => return Ok(skip("update_progress", task_id, SkipReason::UnknownTask)),
            }
        }

        let now = self.clock.now_ms();
        match self.tasks.get_mut(task_id) {
            Some(task) => Ok(log_skip("update_progress", task_id, task.apply_progress(update, now))),
            None => Ok(skip("update_progress", task_id, SkipReason::UnknownTask)),
        }
    }

    /// 任务完成
    pub fn handle_complete(&mut self, task_id: &str, elapsed_ns: u64, note: Option<String>) -> Outcome {
        let Some(task) = self.tasks.get_mut(task_id) else {
            return skip("handle_complete", task_id, SkipReason::UnknownTask);
        };
        let outcome = task.complete(elapsed_ns, note);
        if outcome.is_applied() {
            info!("✓ 任务完成: task={}, 耗时={}", task_id, task.time_display());
            self.armed.remove(task_id);
        }
        log_skip("handle_complete", task_id, outcome)
    }

    /// 任务失败
    pub fn handle_failure(&mut self, task_id: &str, error: &str) -> Outcome {
        let Some(task) = self.tasks.get_mut(task_id) else {
            return skip("handle_failure", task_id, SkipReason::UnknownTask);
        };
        let outcome = task.fail(error);
        if outcome.is_applied() {
            info!("✗ 任务失败: task={}, error={}", task_id, error);
            self.armed.remove(task_id);
        }
        log_skip("handle_failure", task_id, outcome)
    }

    /// 任务被取消
    pub fn handle_cancel(&mut self, task_id: &str) -> Outcome {
        let Some(task) = self.tasks.get_mut(task_id) else {
            return skip("handle_cancel", task_id, SkipReason::UnknownTask);
        };
        let outcome = task.cancel();
        if outcome.is_applied() {
            info!("任务已取消: task={}", task_id);
            self.armed.remove(task_id);
        }
        log_skip("handle_cancel", task_id, outcome)
    }

    /// 无条件移除任务
    pub fn remove_task(&mut self, task_id: &str) -> Option<TaskRecord> {
        self.armed.remove(task_id);
        let removed = self.tasks.remove(task_id);
        if removed.is_some() {
            self.order.retain(|id| id != task_id);
            debug!("移除任务: task={}", task_id);
        }
        removed
    }

    /// 清空所有任务，返回移除数量
    pub fn clear_all_tasks(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        self.order.clear();
        self.armed.clear();
        info!("清空任务列表: {} 个", count);
        count
    }

    pub fn hide_task(&mut self, task_id: &str) -> Outcome {
        match self.tasks.get_mut(task_id) {
            Some(task) => {
                task.hide();
                Outcome::Applied(())
            }
            None => skip("hide_task", task_id, SkipReason::UnknownTask),
        }
    }

    /// 用户取消任务：本地标记为取消，返回需要发往服务端的取消目标（pool_id 优先）
    pub fn cancel_task(&mut self, task_id: &str) -> Outcome<String> {
        let Some(task) = self.tasks.get_mut(task_id) else {
            return skip("cancel_task", task_id, SkipReason::UnknownTask);
        };
        let target = task.cancel_target().to_string();
        match task.cancel() {
            Outcome::Applied(()) => {
                info!("请求取消任务: task={}, target={}", task_id, target);
                self.armed.remove(task_id);
                Outcome::Applied(target)
            }
            Outcome::Skipped(reason) => skip("cancel_task", task_id, reason),
        }
    }

    /// 用户请求移除任务
    ///
    /// 终态任务直接移除；未结束的任务需要两次请求：第一次只进入待确认状态，
    /// 第二次取消并移除
    pub fn request_removal(&mut self, task_id: &str) -> Outcome<RemovalStep> {
        let Some(task) = self.tasks.get(task_id) else {
            return skip("request_removal", task_id, SkipReason::UnknownTask);
        };

        if task.stage().is_terminal() {
            self.remove_task(task_id);
            return Outcome::Applied(RemovalStep::Removed);
        }

        if self.confirm_required && self.armed.insert(task_id.to_string()) {
            debug!("移除请求待确认: task={}", task_id);
            return Outcome::Applied(RemovalStep::Armed);
        }

        match self.cancel_task(task_id) {
            Outcome::Applied(target_id) => {
                self.remove_task(task_id);
                Outcome::Applied(RemovalStep::Cancelled { target_id })
            }
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
        }
    }

    pub fn is_removal_armed(&self, task_id: &str) -> bool {
        self.armed.contains(task_id)
    }

    /// 按创建顺序生成快照
    pub fn snapshot(&self, include_hidden: bool) -> Vec<TaskView> {
        self.iter()
            .filter(|task| include_hidden || !task.is_hidden())
            .map(|task| TaskView {
                task_id: task.task_id().to_string(),
                pool_id: task.pool_id().map(str::to_string),
                task_type: task.task_type(),
                name: task.display_name(),
                target: task.target().map(str::to_string),
                stage: task.stage(),
                progress: task.progress(),
                error_progress: task.error_progress(),
                tasks_complete: task.tasks_complete(),
                tasks_failed: task.tasks_failed(),
                tasks_total: task.tasks_total(),
                working_on: task.working_on().to_vec(),
                time: (task.stage() == TaskStage::Complete).then(|| task.time_display()),
                note: task.note().map(str::to_string),
                error: task.error().map(str::to_string),
                hidden: task.is_hidden(),
                removal_armed: self.armed.contains(task.task_id()),
            })
            .collect()
    }
}

fn skip<T>(op: &str, task_id: &str, reason: SkipReason) -> Outcome<T> {
    warn!("任务操作被忽略: op={}, task={}, reason={}", op, task_id, reason);
    Outcome::Skipped(reason)
}

fn log_skip<T>(op: &str, task_id: &str, outcome: Outcome<T>) -> Outcome<T> {
    if let Outcome::Skipped(reason) = &outcome {
        warn!("任务操作被忽略: op={}, task={}, reason={}", op, task_id, reason);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ManualClock;
    use proptest::prelude::*;

    fn tracker() -> (TaskTracker, ManualClock) {
        let clock = ManualClock::new(1_000);
        (TaskTracker::new(Arc::new(clock.clone()), true), clock)
    }

    fn scan_options(target: &str) -> NewTaskOptions {
        NewTaskOptions {
            target: Some(target.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_task_requires_identity() {
        let (mut tracker, _) = tracker();
        assert_eq!(
            tracker.create_task("", TaskType::ScanDirectory, NewTaskOptions::default()),
            Err(TrackerError::MissingIdentity { field: "task_id" })
        );
        assert_eq!(
            tracker.create_task_from_wire("t1", "", NewTaskOptions::default()),
            Err(TrackerError::MissingIdentity { field: "task_type" })
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_monotonic_stage() {
        let (mut tracker, _) = tracker();
        tracker
            .create_task("t1", TaskType::ScanDirectory, scan_options("photos"))
            .unwrap();
        let _ = tracker.update_progress("t1", &ProgressUpdate::new(40.0)).unwrap();
        assert_eq!(tracker.get("t1").unwrap().stage(), TaskStage::InProgress);

        assert!(tracker.handle_complete("t1", 1_000_000, None).is_applied());

        let late = ProgressUpdate::new(10.0).counts(1, 10, 0);
        assert_eq!(
            tracker.update_progress("t1", &late).unwrap(),
            Outcome::Skipped(SkipReason::TaskTerminal)
        );
        assert_eq!(tracker.handle_cancel("t1"), Outcome::Skipped(SkipReason::TaskTerminal));

        let task = tracker.get("t1").unwrap();
        assert_eq!(task.stage(), TaskStage::Complete);
        assert_eq!(task.progress(), 100.0);
        assert_eq!(task.tasks_complete(), 0);
    }

    #[test]
    fn test_progress_with_partial_failures() {
        let (mut tracker, _) = tracker();
        tracker
            .create_task("t2", TaskType::CreateZip, NewTaskOptions::default())
            .unwrap();
        let update = ProgressUpdate::new(0.0).counts(10, 20, 3);
        assert!(tracker.update_progress("t2", &update).unwrap().is_applied());

        let task = tracker.get("t2").unwrap();
        assert_eq!(task.progress(), 35.0);
        assert_eq!(task.error_progress(), 50.0);
    }

    #[test]
    fn test_working_on_list_balance() {
        let (mut tracker, clock) = tracker();
        tracker
            .create_task("scan", TaskType::ScanDirectory, NewTaskOptions::default())
            .unwrap();

        let _ = tracker.update_progress("scan", &ProgressUpdate::new(0.0).started("A", "a.jpg"));
        clock.advance(50);
        let _ = tracker.update_progress("scan", &ProgressUpdate::new(0.0).started("B", "b.jpg"));
        clock.advance(50);
        let _ = tracker.update_progress("scan", &ProgressUpdate::new(10.0).finished("A"));

        let task = tracker.get("scan").unwrap();
        assert_eq!(task.working_on().len(), 1);
        assert_eq!(task.working_on()[0].item_id, "B");
        assert_eq!(task.working_on()[0].start_time_epoch_ms, 1_050);
    }

    #[test]
    fn test_progress_for_unknown_task() {
        let (mut tracker, _) = tracker();
        assert_eq!(
            tracker.update_progress("ghost", &ProgressUpdate::new(5.0)).unwrap(),
            Outcome::Skipped(SkipReason::UnknownTask)
        );
        assert!(tracker.is_empty());

        let mut update = ProgressUpdate::new(5.0);
        update.task_type = Some(TaskType::DownloadFile);
        assert!(tracker.update_progress("dl", &update).unwrap().is_applied());
        assert_eq!(tracker.get("dl").unwrap().progress(), 5.0);
    }

    #[test]
    fn test_complete_unknown_task_is_warning() {
        let (mut tracker, _) = tracker();
        assert_eq!(
            tracker.handle_complete("nope", 1, None),
            Outcome::Skipped(SkipReason::UnknownTask)
        );
    }

    #[test]
    fn test_create_existing_task_merges_options() {
        let (mut tracker, _) = tracker();
        tracker
            .create_task("t1", TaskType::ScanDirectory, NewTaskOptions::default())
            .unwrap();
        let _ = tracker.update_progress("t1", &ProgressUpdate::new(30.0));
        tracker
            .create_task(
                "t1",
                TaskType::ScanDirectory,
                NewTaskOptions {
                    target: Some("docs".to_string()),
                    initial_progress: Some(0.0),
                    pool_id: Some("pool".to_string()),
                },
            )
            .unwrap();

        let task = tracker.get("t1").unwrap();
        assert_eq!(task.progress(), 30.0);
        assert_eq!(task.display_name(), "Scan docs");
        assert_eq!(task.cancel_target(), "pool");
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_cancel_uses_pool_id() {
        let (mut tracker, _) = tracker();
        tracker
            .create_task(
                "t1",
                TaskType::CreateZip,
                NewTaskOptions {
                    pool_id: Some("pool-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        tracker
            .create_task("t2", TaskType::CreateZip, NewTaskOptions::default())
            .unwrap();

        assert_eq!(tracker.cancel_task("t1"), Outcome::Applied("pool-1".to_string()));
        assert_eq!(tracker.cancel_task("t2"), Outcome::Applied("t2".to_string()));
        assert_eq!(tracker.get("t1").unwrap().stage(), TaskStage::Cancelled);
        assert_eq!(tracker.cancel_task("t1"), Outcome::Skipped(SkipReason::TaskTerminal));
    }

    #[test]
    fn test_two_step_removal() {
        let (mut tracker, _) = tracker();
        tracker
            .create_task("t1", TaskType::ScanDirectory, NewTaskOptions::default())
            .unwrap();
        let _ = tracker.update_progress("t1", &ProgressUpdate::new(20.0));

        assert_eq!(tracker.request_removal("t1"), Outcome::Applied(RemovalStep::Armed));
        assert!(tracker.is_removal_armed("t1"));
        assert!(tracker.get("t1").is_some());

        assert_eq!(
            tracker.request_removal("t1"),
            Outcome::Applied(RemovalStep::Cancelled {
                target_id: "t1".to_string()
            })
        );
        assert!(tracker.get("t1").is_none());
        assert!(!tracker.is_removal_armed("t1"));
    }

    #[test]
    fn test_terminal_task_removed_at_once() {
        let (mut tracker, _) = tracker();
        tracker
            .create_task("t1", TaskType::Backup, NewTaskOptions::default())
            .unwrap();
        let _ = tracker.handle_failure("t1", "disk full");
        assert_eq!(tracker.request_removal("t1"), Outcome::Applied(RemovalStep::Removed));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_removal_without_confirmation() {
        let mut tracker = TaskTracker::new(Arc::new(ManualClock::new(0)), false);
        tracker
            .create_task("t1", TaskType::CreateZip, NewTaskOptions::default())
            .unwrap();
        assert_eq!(
            tracker.request_removal("t1"),
            Outcome::Applied(RemovalStep::Cancelled {
                target_id: "t1".to_string()
            })
        );
    }

    #[test]
    fn test_snapshot_filters_hidden() {
        let (mut tracker, _) = tracker();
        for id in ["a", "b", "c"] {
            tracker
                .create_task(id, TaskType::ScanDirectory, NewTaskOptions::default())
                .unwrap();
        }
        assert!(tracker.hide_task("b").is_applied());
        let _ = tracker.handle_complete("c", 2_000_000, Some("ok".to_string()));

        let visible: Vec<String> = tracker.snapshot(false).into_iter().map(|v| v.task_id).collect();
        assert_eq!(visible, vec!["a", "c"]);
        assert_eq!(tracker.snapshot(true).len(), 3);

        let done = &tracker.snapshot(false)[1];
        assert_eq!(done.time.as_deref(), Some("2ms"));
        assert_eq!(done.progress, 100.0);
    }

    #[test]
    fn test_remove_and_clear() {
        let (mut tracker, _) = tracker();
        for id in ["a", "b"] {
            tracker
                .create_task(id, TaskType::CreateZip, NewTaskOptions::default())
                .unwrap();
        }
        assert!(tracker.remove_task("a").is_some());
        assert!(tracker.remove_task("a").is_none());
        assert_eq!(tracker.clear_all_tasks(), 1);
        assert!(tracker.snapshot(true).is_empty());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Progress(f64),
        Complete,
        Fail,
        Cancel,
    }

    fn step_strategy() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0.0f64..100.0).prop_map(Step::Progress),
            Just(Step::Complete),
            Just(Step::Fail),
            Just(Step::Cancel),
        ]
    }

    proptest! {
        #[test]
        fn test_stage_never_leaves_terminal(steps in prop::collection::vec(step_strategy(), 1..40)) {
            let (mut tracker, _) = tracker();
            tracker
                .create_task("t", TaskType::ScanDirectory, NewTaskOptions::default())
                .unwrap();

            let mut terminal: Option<TaskStage> = None;
            for step in steps {
                match step {
                    Step::Progress(p) => {
                        let _ = tracker.update_progress("t", &ProgressUpdate::new(p).counts(1, 2, 0));
                    }
                    Step::Complete => {
                        let _ = tracker.handle_complete("t", 1, None);
                    }
                    Step::Fail => {
                        let _ = tracker.handle_failure("t", "boom");
                    }
                    Step::Cancel => {
                        let _ = tracker.handle_cancel("t");
                    }
                }

                let stage = tracker.get("t").unwrap().stage();
                match terminal {
                    Some(expected) => {
                        prop_assert_eq!(stage, expected);
                    }
                    None if stage.is_terminal() => terminal = Some(stage),
                    None => {}
                }
            }
        }
    }
}
