// 上传跟踪器
//
// 独占所有上传记录：
// - 扁平的 key -> 记录 映射
// - 父目录 key -> 子 key 集合 的索引（只建模一层嵌套）
// - 子文件的字节增量和完成计数只通过本跟踪器转发给父目录

use crate::common::{Clock, SystemClock};
use crate::error::{Outcome, SkipReason, TrackerError, TrackerResult};
use crate::uploader::chunk::plan_chunks;
use crate::uploader::record::{SampleWindow, UploadRecord};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 用户清空列表时写入在途上传的错误
pub const UPLOAD_CANCELLED: &str = "Upload cancelled";

/// 清空上传列表的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    /// 已移除的记录 key（含子记录）
    pub removed: Vec<String>,
    /// 被标记为取消的顶层记录 key
    pub cancelled: Vec<String>,
    /// 需要通知服务端取消的上传任务 ID（已去重）
    pub cancel_targets: Vec<String>,
}

/// 上传记录的只读快照（供展示层使用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadView {
    pub key: String,
    pub upload_task_id: String,
    pub name: String,
    pub is_directory: bool,
    pub parent_key: Option<String>,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
    pub files_transferred: u64,
    pub files_total: u64,
    pub complete: bool,
    pub error: Option<String>,
    pub percent: f64,
    /// 字节/秒
    pub speed: f64,
    pub remaining_secs: Option<u64>,
    pub elapsed_ms: i64,
}

/// 上传跟踪器
pub struct UploadTracker {
    records: HashMap<String, UploadRecord>,
    children: HashMap<String, BTreeSet<String>>,
    /// 注册顺序
    order: Vec<String>,
    window: SampleWindow,
    clock: Arc<dyn Clock>,
}

impl Default for UploadTracker {
    fn default() -> Self {
        Self::new(SampleWindow::default(), Arc::new(SystemClock))
    }
}

impl UploadTracker {
    pub fn new(window: SampleWindow, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: HashMap::new(),
            children: HashMap::new(),
            order: Vec::new(),
            window,
            clock,
        }
    }

    /// 生成客户端上传 key
    pub fn new_upload_key() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn get(&self, key: &str) -> Option<&UploadRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按注册顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &UploadRecord> {
        self.order.iter().filter_map(|key| self.records.get(key))
    }

    /// 目录的子记录 key
    pub fn children_of(&self, key: &str) -> impl Iterator<Item = &str> {
        self.children
            .get(key)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// 注册新上传
    ///
    /// 带 `parent_key` 时父目录的文件总数加一、字节总数加上 `total_bytes`
    pub fn register_upload(
        &mut self,
        key: &str,
        upload_task_id: &str,
        name: &str,
        is_directory: bool,
        total_bytes: u64,
        parent_key: Option<&str>,
    ) -> TrackerResult {
        if key.is_empty() {
            return Err(TrackerError::MissingIdentity { field: "key" });
        }
        if self.records.contains_key(key) {
            return Ok(skip("register_upload", key, SkipReason::DuplicateUpload));
        }

        let now = self.clock.now_ms();

        if let Some(parent_key) = parent_key {
            let parent = match self.records.get_mut(parent_key) {
                Some(parent) => parent,
                None => return Ok(skip("register_upload", parent_key, SkipReason::UnknownParent)),
            };
            if !parent.is_directory() || parent.parent_key().is_some() {
                return Ok(skip("register_upload", parent_key, SkipReason::ParentNotDirectory));
            }
            if parent.is_complete() {
                return Ok(skip("register_upload", parent_key, SkipReason::UploadFrozen));
            }
            parent.add_child(total_bytes);
            self.children
                .entry(parent_key.to_string())
                .or_default()
                .insert(key.to_string());
        }

        let record = UploadRecord::new(
            key.to_string(),
            upload_task_id.to_string(),
            name.to_string(),
            is_directory,
            total_bytes,
            parent_key.map(str::to_string),
            self.window,
            now,
        );
        self.records.insert(key.to_string(), record);
        self.order.push(key.to_string());

        debug!(
            "注册上传: key={}, name={}, dir={}, bytes={}, parent={:?}",
            key, name, is_directory, total_bytes, parent_key
        );
        Ok(Outcome::Applied(()))
    }

    /// 注册分片
    pub fn register_chunk(&mut self, key: &str, chunk_index: usize, chunk_size: u64) -> TrackerResult {
        match self.records.get_mut(key) {
            Some(record) => Ok(log_skip("register_chunk", key, record.add_chunk(chunk_index, chunk_size)?)),
            None => Ok(skip("register_chunk", key, SkipReason::UnknownUpload)),
        }
    }

    /// 按固定分片大小切分文件并注册全部分片，返回分片数量
    pub fn register_file_chunks(&mut self, key: &str, chunk_size: u64) -> TrackerResult<usize> {
        let record = match self.records.get_mut(key) {
            Some(record) => record,
            None => return Ok(skip("register_file_chunks", key, SkipReason::UnknownUpload)),
        };

        let plan = plan_chunks(record.bytes_total(), chunk_size);
        for (index, size) in plan.iter().enumerate() {
            if let Outcome::Skipped(reason) = record.add_chunk(index, *size)? {
                return Ok(skip("register_file_chunks", key, reason));
            }
        }
        Ok(Outcome::Applied(plan.len()))
    }

    /// 应用分片进度，并把字节增量转发给父目录
    ///
    /// 返回本次增量
    pub fn apply_chunk_progress(
        &mut self,
        key: &str,
        chunk_index: usize,
        bytes_so_far: u64,
    ) -> TrackerResult<u64> {
        let now = self.clock.now_ms();

        let record = match self.records.get_mut(key) {
            Some(record) => record,
            None => return Ok(skip("apply_chunk_progress", key, SkipReason::UnknownUpload)),
        };

        let delta = match record.update_chunk(chunk_index, bytes_so_far, now)? {
            Outcome::Applied(delta) => delta,
            Outcome::Skipped(reason) => return Ok(skip("apply_chunk_progress", key, reason)),
        };

        let parent_key = record.parent_key().map(str::to_string);
        if delta > 0 {
            if let Some(parent_key) = parent_key {
                match self.records.get_mut(&parent_key) {
                    Some(parent) => {
                        log_skip("forward_bytes", &parent_key, parent.add_directory_bytes(delta, now));
                    }
                    None => {
                        warn!("找不到父目录，字节增量未转发: key={}, parent={}", key, parent_key);
                    }
                }
            }
        }

        Ok(Outcome::Applied(delta))
    }

    /// 标记分片完成
    ///
    /// 文件全部分片完成后，父目录已完成文件数加一。返回文件是否在本次调用中完成
    pub fn mark_chunk_complete(&mut self, key: &str, chunk_index: usize) -> Outcome<bool> {
        let now = self.clock.now_ms();

        let record = match self.records.get_mut(key) {
            Some(record) => record,
            None => return skip("mark_chunk_complete", key, SkipReason::UnknownUpload),
        };

        let finished = match record.chunk_complete(chunk_index, now) {
            Outcome::Applied(finished) => finished,
            Outcome::Skipped(SkipReason::ChunkAlreadyComplete) => {
                debug!("分片已完成，忽略重复信号: key={}, chunk={}", key, chunk_index);
                return Outcome::Skipped(SkipReason::ChunkAlreadyComplete);
            }
            Outcome::Skipped(reason) => return skip("mark_chunk_complete", key, reason),
        };

        let parent_key = record.parent_key().map(str::to_string);
        if finished {
            if let Some(parent_key) = parent_key {
                match self.records.get_mut(&parent_key) {
                    Some(parent) => {
                        log_skip("inc_files", &parent_key, parent.inc_files(now));
                    }
                    None => {
                        warn!("找不到父目录，完成计数未转发: key={}, parent={}", key, parent_key);
                    }
                }
            }
        }

        Outcome::Applied(finished)
    }

    /// 设置错误
    ///
    /// 子记录的错误写到父目录上，且只保留第一个错误
    pub fn set_error(&mut self, key: &str, message: &str) -> Outcome {
        let target = match self.top_level_key(key) {
            Some(target) => target,
            None => return skip("set_error", key, SkipReason::UnknownUpload),
        };

        match self.records.get_mut(&target) {
            Some(record) => {
                let outcome = record.set_error(message);
                if outcome.is_applied() {
                    info!("上传失败: key={}, error={}", target, message);
                }
                outcome
            }
            None => skip("set_error", &target, SkipReason::UnknownUpload),
        }
    }

    /// 读取错误（同样解析到顶层记录）
    pub fn read_error(&self, key: &str) -> Option<&str> {
        let target = self.top_level_key(key)?;
        self.records.get(&target).and_then(UploadRecord::error)
    }

    /// 清空上传列表
    ///
    /// - 有错误的顶层记录保留，让用户看到失败原因
    /// - 已完成的顶层记录（目录要求所有子记录也已完成）连同子记录一起移除
    /// - 仍在进行中的记录标记为取消，并返回需要通知服务端的任务 ID
    pub fn clear_uploads(&mut self) -> ClearReport {
        let mut report = ClearReport::default();

        let top_level: Vec<String> = self
            .iter()
            .filter(|r| r.parent_key().is_none())
            .map(|r| r.key().to_string())
            .collect();

        for key in top_level {
            let Some(record) = self.records.get(&key) else {
                continue;
            };

            if record.error().is_some() {
                continue;
            }

            let children_complete = self
                .children_of(&key)
                .all(|child| self.records.get(child).map_or(true, UploadRecord::is_complete));

            if record.is_complete() && children_complete {
                report.removed.extend(self.remove_with_children(&key));
                continue;
            }

            let upload_task_id = record.upload_task_id().to_string();
            if let Some(record) = self.records.get_mut(&key) {
                log_skip("clear_uploads", &key, record.set_error(UPLOAD_CANCELLED));
            }
            info!("取消上传: key={}, upload_task_id={}", key, upload_task_id);
            report.cancelled.push(key);
            if !report.cancel_targets.contains(&upload_task_id) {
                report.cancel_targets.push(upload_task_id);
            }
        }

        report
    }

    /// 所有记录的只读快照，按注册顺序
    pub fn snapshot(&self) -> Vec<UploadView> {
        let now = self.clock.now_ms();
        self.iter()
            .map(|r| UploadView {
                key: r.key().to_string(),
                upload_task_id: r.upload_task_id().to_string(),
                name: r.friendly_name().to_string(),
                is_directory: r.is_directory(),
                parent_key: r.parent_key().map(str::to_string),
                bytes_transferred: r.bytes_transferred(),
                bytes_total: r.bytes_total(),
                files_transferred: r.files_transferred(),
                files_total: r.files_total(),
                complete: r.is_complete(),
                error: r.error().map(str::to_string),
                percent: r.percent_complete(),
                speed: r.speed(),
                remaining_secs: r.remaining_secs(),
                elapsed_ms: r.elapsed_ms(now),
            })
            .collect()
    }

    fn top_level_key(&self, key: &str) -> Option<String> {
        let record = self.records.get(key)?;
        match record.parent_key() {
            Some(parent) if self.records.contains_key(parent) => Some(parent.to_string()),
            Some(_) => None,
            None => Some(key.to_string()),
        }
    }

    fn remove_with_children(&mut self, key: &str) -> Vec<String> {
        let mut removed: Vec<String> = self
            .children
            .remove(key)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        removed.push(key.to_string());

        for k in &removed {
            self.records.remove(k);
        }
        self.order.retain(|k| !removed.contains(k));

        debug!("移除上传记录: {:?}", removed);
        removed
    }
}

fn skip<T>(op: &str, key: &str, reason: SkipReason) -> Outcome<T> {
    warn!("上传操作被忽略: op={}, key={}, reason={}", op, key, reason);
    Outcome::Skipped(reason)
}

fn log_skip<T>(op: &str, key: &str, outcome: Outcome<T>) -> Outcome<T> {
    if let Outcome::Skipped(reason) = &outcome {
        warn!("上传操作被忽略: op={}, key={}, reason={}", op, key, reason);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ManualClock;

    fn tracker() -> (UploadTracker, ManualClock) {
        let clock = ManualClock::new(0);
        let tracker = UploadTracker::new(SampleWindow::default(), Arc::new(clock.clone()));
        (tracker, clock)
    }

    #[test]
    fn test_chunked_upload_conserves_bytes() {
        let (mut tracker, clock) = tracker();
        let n = 4usize;
        let size = 1_000u64;

        tracker
            .register_upload("u1", "task-1", "video.mp4", false, n as u64 * size, None)
            .unwrap();
        for i in 0..n {
            tracker.register_chunk("u1", i, size).unwrap();
        }
        for i in 0..n {
            clock.advance(100);
            assert_eq!(
                tracker.apply_chunk_progress("u1", i, size / 2).unwrap(),
                Outcome::Applied(size / 2)
            );
            clock.advance(100);
            assert_eq!(
                tracker.apply_chunk_progress("u1", i, size).unwrap(),
                Outcome::Applied(size / 2)
            );
            let _ = tracker.mark_chunk_complete("u1", i);
        }

        let record = tracker.get("u1").unwrap();
        assert_eq!(record.bytes_transferred(), n as u64 * size);
        assert!(record.is_complete());
        assert_eq!(record.percent_complete(), 100.0);
    }

    #[test]
    fn test_parent_aggregation() {
        let (mut tracker, clock) = tracker();
        tracker.register_upload("d", "task-1", "photos", true, 0, None).unwrap();
        tracker
            .register_upload("f1", "task-1", "a.jpg", false, 1000, Some("d"))
            .unwrap();

        let dir = tracker.get("d").unwrap();
        assert_eq!(dir.files_total(), 1);
        assert_eq!(dir.bytes_total(), 1000);

        tracker.register_chunk("f1", 0, 1000).unwrap();
        clock.advance(500);
        tracker.apply_chunk_progress("f1", 0, 1000).unwrap();
        assert_eq!(tracker.mark_chunk_complete("f1", 0), Outcome::Applied(true));

        let dir = tracker.get("d").unwrap();
        assert_eq!(dir.bytes_transferred(), 1000);
        assert_eq!(dir.files_transferred(), 1);
        assert!(dir.is_complete());
        assert_eq!(tracker.children_of("d").collect::<Vec<_>>(), vec!["f1"]);
    }

    #[test]
    fn test_unknown_parent_is_warning() {
        let (mut tracker, _) = tracker();
        let outcome = tracker
            .register_upload("f1", "task-1", "a.jpg", false, 10, Some("missing"))
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::UnknownParent));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_parent_must_be_top_level_directory() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("f0", "task-1", "a.jpg", false, 10, None).unwrap();
        assert_eq!(
            tracker
                .register_upload("f1", "task-1", "b.jpg", false, 10, Some("f0"))
                .unwrap(),
            Outcome::Skipped(SkipReason::ParentNotDirectory)
        );
    }

    #[test]
    fn test_empty_key_is_error() {
        let (mut tracker, _) = tracker();
        let err = tracker
            .register_upload("", "task-1", "a.jpg", false, 10, None)
            .unwrap_err();
        assert_eq!(err, TrackerError::MissingIdentity { field: "key" });
    }

    #[test]
    fn test_zero_total_directory_percent() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("d", "task-1", "empty", true, 0, None).unwrap();
        let percent = tracker.get("d").unwrap().percent_complete();
        assert_eq!(percent, 0.0);
        assert!(percent.is_finite());
    }

    #[test]
    fn test_first_error_wins_on_parent() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("d", "task-1", "photos", true, 0, None).unwrap();
        tracker
            .register_upload("f1", "task-1", "a.jpg", false, 10, Some("d"))
            .unwrap();

        assert!(tracker.set_error("f1", "disk full").is_applied());
        assert_eq!(
            tracker.set_error("d", "timeout"),
            Outcome::Skipped(SkipReason::ErrorAlreadySet)
        );
        assert_eq!(tracker.get("d").unwrap().error(), Some("disk full"));
        assert_eq!(tracker.get("f1").unwrap().error(), None);
        assert_eq!(tracker.read_error("f1"), Some("disk full"));
    }

    #[test]
    fn test_idempotent_chunk_completion() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("u1", "task-1", "a.bin", false, 200, None).unwrap();
        tracker.register_chunk("u1", 0, 100).unwrap();
        tracker.register_chunk("u1", 1, 100).unwrap();

        assert_eq!(tracker.mark_chunk_complete("u1", 0), Outcome::Applied(false));
        let before = tracker.snapshot();
        assert_eq!(
            tracker.mark_chunk_complete("u1", 0),
            Outcome::Skipped(SkipReason::ChunkAlreadyComplete)
        );
        assert_eq!(tracker.snapshot(), before);
    }

    #[test]
    fn test_reregistered_chunk_does_not_double_count() {
        let (mut tracker, clock) = tracker();
        tracker.register_upload("d", "task-1", "photos", true, 0, None).unwrap();
        tracker.register_upload("f", "task-1", "a.bin", false, 100, Some("d")).unwrap();
        tracker.register_chunk("f", 0, 100).unwrap();
        clock.advance(100);
        assert_eq!(tracker.apply_chunk_progress("f", 0, 100).unwrap(), Outcome::Applied(100));

        assert_eq!(
            tracker.register_chunk("f", 0, 100).unwrap(),
            Outcome::Skipped(SkipReason::ChunkAlreadyRegistered)
        );
        assert_eq!(
            tracker.register_file_chunks("f", 100).unwrap(),
            Outcome::Skipped(SkipReason::ChunkAlreadyRegistered)
        );
        clock.advance(100);
        assert_eq!(tracker.apply_chunk_progress("f", 0, 100).unwrap(), Outcome::Applied(0));

        let file = tracker.get("f").unwrap();
        assert_eq!(file.bytes_transferred(), 100);
        assert_eq!(file.percent_complete(), 100.0);
        assert_eq!(tracker.get("d").unwrap().bytes_transferred(), 100);
    }

    #[test]
    fn test_negative_delta_surfaces_error() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("u1", "task-1", "a.bin", false, 100, None).unwrap();
        tracker.register_chunk("u1", 0, 100).unwrap();
        tracker.apply_chunk_progress("u1", 0, 60).unwrap();

        assert!(matches!(
            tracker.apply_chunk_progress("u1", 0, 10),
            Err(TrackerError::NegativeDelta { .. })
        ));
    }

    #[test]
    fn test_register_file_chunks() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("u1", "task-1", "a.bin", false, 2_500, None).unwrap();
        assert_eq!(
            tracker.register_file_chunks("u1", 1_000).unwrap(),
            Outcome::Applied(3)
        );
        let sizes: Vec<u64> = tracker
            .get("u1")
            .unwrap()
            .chunks()
            .iter()
            .map(|c| c.as_ref().unwrap().bytes_total)
            .collect();
        assert_eq!(sizes, vec![1_000, 1_000, 500]);
    }

    #[test]
    fn test_clear_uploads() {
        let (mut tracker, _) = tracker();

        // 已完成
        tracker.register_upload("done", "task-a", "a.bin", false, 10, None).unwrap();
        tracker.register_chunk("done", 0, 10).unwrap();
        tracker.apply_chunk_progress("done", 0, 10).unwrap();
        let _ = tracker.mark_chunk_complete("done", 0);

        // 失败
        tracker.register_upload("failed", "task-b", "b.bin", false, 10, None).unwrap();
        let _ = tracker.set_error("failed", "disk full");

        // 进行中的目录
        tracker.register_upload("dir", "task-c", "photos", true, 0, None).unwrap();
        tracker
            .register_upload("child", "task-c", "c.jpg", false, 10, Some("dir"))
            .unwrap();

        let report = tracker.clear_uploads();
        assert_eq!(report.removed, vec!["done".to_string()]);
        assert_eq!(report.cancelled, vec!["dir".to_string()]);
        assert_eq!(report.cancel_targets, vec!["task-c".to_string()]);

        assert!(tracker.get("done").is_none());
        assert_eq!(tracker.get("failed").unwrap().error(), Some("disk full"));
        assert_eq!(tracker.get("dir").unwrap().error(), Some(UPLOAD_CANCELLED));
        assert!(tracker.get("child").is_some());

        // 再次清空：取消的和失败的都保留
        let report = tracker.clear_uploads();
        assert!(report.removed.is_empty());
        assert!(report.cancel_targets.is_empty());
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_clear_removes_completed_directory_with_children() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("d", "task-1", "photos", true, 0, None).unwrap();
        tracker.register_upload("f1", "task-1", "a.jpg", false, 5, Some("d")).unwrap();
        tracker.register_chunk("f1", 0, 5).unwrap();
        tracker.apply_chunk_progress("f1", 0, 5).unwrap();
        let _ = tracker.mark_chunk_complete("f1", 0);

        let report = tracker.clear_uploads();
        assert_eq!(report.removed, vec!["f1".to_string(), "d".to_string()]);
        assert!(tracker.is_empty());
        assert_eq!(tracker.children_of("d").count(), 0);
    }

    #[test]
    fn test_child_registration_after_directory_complete() {
        let (mut tracker, _) = tracker();
        tracker.register_upload("d", "task-1", "photos", true, 0, None).unwrap();
        tracker.register_upload("f1", "task-1", "a.jpg", false, 0, Some("d")).unwrap();
        tracker.register_file_chunks("f1", 0).unwrap();
        let _ = tracker.mark_chunk_complete("f1", 0);
        assert!(tracker.get("d").unwrap().is_complete());

        assert_eq!(
            tracker
                .register_upload("f2", "task-1", "b.jpg", false, 10, Some("d"))
                .unwrap(),
            Outcome::Skipped(SkipReason::UploadFrozen)
        );
    }

    #[test]
    fn test_snapshot_order_and_derived_values() {
        let (mut tracker, clock) = tracker();
        tracker.register_upload("b", "task-1", "b.bin", false, 100, None).unwrap();
        tracker.register_upload("a", "task-1", "a.bin", false, 100, None).unwrap();
        tracker.register_chunk("a", 0, 100).unwrap();
        clock.advance(1_000);
        tracker.apply_chunk_progress("a", 0, 25).unwrap();

        let views = tracker.snapshot();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].key, "b");
        assert_eq!(views[1].percent, 25.0);
        assert_eq!(views[1].elapsed_ms, 1_000);
    }

    #[test]
    fn test_new_upload_key_unique() {
        assert_ne!(UploadTracker::new_upload_key(), UploadTracker::new_upload_key());
    }

    proptest::proptest! {
        #[test]
        fn test_random_partitions_conserve_bytes(
            chunks in proptest::collection::vec(
                (1u64..10_000, proptest::collection::vec(0u64..=100, 0..4)),
                1..6,
            )
        ) {
            let (mut tracker, clock) = tracker();
            let total: u64 = chunks.iter().map(|(size, _)| size).sum();

            tracker.register_upload("d", "task-1", "dir", true, 0, None).unwrap();
            tracker
                .register_upload("f", "task-1", "file.bin", false, total, Some("d"))
                .unwrap();
            for (index, (size, _)) in chunks.iter().enumerate() {
                tracker.register_chunk("f", index, *size).unwrap();
            }

            for (index, (size, checkpoints)) in chunks.iter().enumerate() {
                let mut checkpoints = checkpoints.clone();
                checkpoints.sort_unstable();
                for percent in checkpoints {
                    clock.advance(10);
                    tracker.apply_chunk_progress("f", index, size * percent / 100).unwrap();
                }
                clock.advance(10);
                tracker.apply_chunk_progress("f", index, *size).unwrap();
                let _ = tracker.mark_chunk_complete("f", index);
            }

            let file = tracker.get("f").unwrap();
            proptest::prop_assert_eq!(file.bytes_transferred(), total);
            proptest::prop_assert!(file.is_complete());

            let dir = tracker.get("d").unwrap();
            proptest::prop_assert_eq!(dir.bytes_transferred(), total);
            proptest::prop_assert_eq!(dir.bytes_total(), total);
            proptest::prop_assert!(dir.is_complete());
        }
    }
}
