// 上传记录
//
// 一条记录对应一个正在上传的文件或目录。
// 文件按分片累计字节；目录只接收子文件转发过来的字节增量和完成计数。

use crate::error::{Outcome, SkipReason, TrackerError, TrackerResult};
use crate::progress;
use crate::uploader::chunk::UploadChunk;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// 吞吐采样
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThroughputSample {
    /// 采样时间（Unix 毫秒）
    pub timestamp_ms: i64,
    /// 采样时的累计字节数
    pub cumulative_bytes: u64,
    /// 采样时计算出的窗口速度（字节/秒）
    pub speed: f64,
}

/// 采样窗口参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    /// 计算瞬时速度时回看的样本数
    pub speed_window: usize,
    /// 展示速度取平均的样本数
    pub rolling_average: usize,
    /// 目录采样的最小间隔（毫秒）
    pub directory_interval_ms: i64,
    /// 保留的样本上限
    pub max_samples: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self {
            speed_window: 6,
            rolling_average: 20,
            directory_interval_ms: 250,
            max_samples: 20,
        }
    }
}

/// 上传记录
#[derive(Debug, Clone)]
pub struct UploadRecord {
    key: String,
    upload_task_id: String,
    friendly_name: String,
    is_directory: bool,
    parent_key: Option<String>,

    bytes_transferred: u64,
    bytes_total: u64,
    files_transferred: u64,
    files_total: u64,

    complete: bool,
    error: Option<String>,

    /// 按索引排列，未注册的索引为空位
    chunks: Vec<Option<UploadChunk>>,
    samples: VecDeque<ThroughputSample>,
    window: SampleWindow,

    registered_at_ms: i64,
    completed_at_ms: Option<i64>,
}

impl UploadRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        key: String,
        upload_task_id: String,
        friendly_name: String,
        is_directory: bool,
        bytes_total: u64,
        parent_key: Option<String>,
        window: SampleWindow,
        now_ms: i64,
    ) -> Self {
        Self {
            key,
            upload_task_id,
            friendly_name,
            is_directory,
            parent_key,
            bytes_transferred: 0,
            bytes_total,
            files_transferred: 0,
            files_total: 0,
            complete: false,
            error: None,
            chunks: Vec::new(),
            samples: VecDeque::with_capacity(window.max_samples),
            window,
            registered_at_ms: now_ms,
            completed_at_ms: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn upload_task_id(&self) -> &str {
        &self.upload_task_id
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total
    }

    pub fn files_transferred(&self) -> u64 {
        self.files_transferred
    }

    pub fn files_total(&self) -> u64 {
        self.files_total
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn chunks(&self) -> &[Option<UploadChunk>] {
        &self.chunks
    }

    pub fn samples(&self) -> impl Iterator<Item = &ThroughputSample> {
        self.samples.iter()
    }

    pub fn registered_at_ms(&self) -> i64 {
        self.registered_at_ms
    }

    pub fn completed_at_ms(&self) -> Option<i64> {
        self.completed_at_ms
    }

    /// 完成百分比，总量为 0 时为 0
    pub fn percent_complete(&self) -> f64 {
        progress::percent(self.bytes_transferred, self.bytes_total)
    }

    /// 展示速度（字节/秒）：最近若干样本速度的平均值，完成后为 0
    pub fn speed(&self) -> f64 {
        if self.samples.is_empty() || self.complete {
            return 0.0;
        }
        let speeds: Vec<f64> = self.samples.iter().map(|s| s.speed).collect();
        progress::rolling_average(&speeds, self.window.rolling_average)
    }

    /// 估算剩余时间（秒）
    pub fn remaining_secs(&self) -> Option<u64> {
        progress::remaining_secs(self.bytes_transferred, self.bytes_total, self.speed())
    }

    /// 从注册到现在（或完成时）经过的毫秒数
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        let end = self.completed_at_ms.unwrap_or(now_ms);
        (end - self.registered_at_ms).max(0)
    }

    /// 所有分片槽位都已填充且完成
    pub fn are_chunks_complete(&self) -> bool {
        !self.chunks.is_empty()
            && self
                .chunks
                .iter()
                .all(|c| c.as_ref().is_some_and(|c| c.complete))
    }

    /// 目录发现一个新的子文件
    pub(crate) fn add_child(&mut self, child_bytes: u64) {
        self.files_total += 1;
        self.bytes_total += child_bytes;
    }

    /// 安装分片，必要时用空位补齐到 `index`
    ///
    /// 已占用的槽位不会被覆盖，否则已计入的字节会被重复累加
    pub(crate) fn add_chunk(&mut self, index: usize, size: u64) -> TrackerResult {
        if self.is_directory {
            return Ok(Outcome::Skipped(SkipReason::NotAFile));
        }
        if self.complete {
            return Ok(Outcome::Skipped(SkipReason::UploadFrozen));
        }
        if self.chunks.get(index).is_some_and(Option::is_some) {
            return Ok(Outcome::Skipped(SkipReason::ChunkAlreadyRegistered));
        }

        let planned: u64 = self.chunks.iter().flatten().map(|c| c.bytes_total).sum();
        if planned + size > self.bytes_total {
            return Err(TrackerError::ChunkOverflow {
                key: self.key.clone(),
                chunk_index: index,
                reported: size,
                capacity: self.bytes_total.saturating_sub(planned),
            });
        }

        if index >= self.chunks.len() {
            self.chunks.resize(index + 1, None);
        }
        self.chunks[index] = Some(UploadChunk::new(size));
        Ok(Outcome::Applied(()))
    }

    /// 更新分片进度
    ///
    /// `bytes_so_far` 是该分片累计已传输字节数，返回相对上次的增量
    pub(crate) fn update_chunk(
        &mut self,
        index: usize,
        bytes_so_far: u64,
        now_ms: i64,
    ) -> TrackerResult<u64> {
        if self.is_directory {
            return Ok(Outcome::Skipped(SkipReason::NotAFile));
        }
        if self.complete {
            return Ok(Outcome::Skipped(SkipReason::UploadFrozen));
        }

        let chunk = match self.chunks.get_mut(index).and_then(Option::as_mut) {
            Some(chunk) => chunk,
            None => return Ok(Outcome::Skipped(SkipReason::UnknownChunk)),
        };

        if bytes_so_far < chunk.bytes_transferred {
            return Err(TrackerError::NegativeDelta {
                key: self.key.clone(),
                chunk_index: index,
                previous: chunk.bytes_transferred,
                reported: bytes_so_far,
            });
        }
        if bytes_so_far > chunk.bytes_total {
            return Err(TrackerError::ChunkOverflow {
                key: self.key.clone(),
                chunk_index: index,
                reported: bytes_so_far,
                capacity: chunk.bytes_total,
            });
        }

        let delta = bytes_so_far - chunk.bytes_transferred;
        chunk.bytes_transferred = bytes_so_far;
        self.bytes_transferred += delta;
        self.push_sample(now_ms);

        debug!(
            "分片进度: key={}, chunk={}, +{} bytes, 累计={}/{}",
            self.key, index, delta, self.bytes_transferred, self.bytes_total
        );

        Ok(Outcome::Applied(delta))
    }

    /// 目录接收子文件转发的字节增量（整文件哨兵路径，不按分片跟踪）
    pub(crate) fn add_directory_bytes(&mut self, delta: u64, now_ms: i64) -> Outcome {
        if self.complete {
            return Outcome::Skipped(SkipReason::UploadFrozen);
        }
        self.bytes_transferred = (self.bytes_transferred + delta).min(self.bytes_total);

        // 目录字节更新远比采样需要的频繁，按时间间隔节流
        let gated = self.samples.back().is_some_and(|last| {
            now_ms - last.timestamp_ms < self.window.directory_interval_ms
        });
        if !gated {
            self.push_sample(now_ms);
        }
        Outcome::Applied(())
    }

    /// 标记分片完成
    ///
    /// 返回值表示本次调用是否使记录变为完成
    pub(crate) fn chunk_complete(&mut self, index: usize, now_ms: i64) -> Outcome<bool> {
        if self.is_directory {
            return Outcome::Skipped(SkipReason::NotAFile);
        }
        let chunk = match self.chunks.get_mut(index).and_then(Option::as_mut) {
            Some(chunk) => chunk,
            None => return Outcome::Skipped(SkipReason::UnknownChunk),
        };
        if chunk.complete {
            return Outcome::Skipped(SkipReason::ChunkAlreadyComplete);
        }
        chunk.complete = true;

        if !self.complete && self.are_chunks_complete() {
            self.mark_complete(now_ms);
            return Outcome::Applied(true);
        }
        Outcome::Applied(false)
    }

    /// 目录的已完成文件数加一
    ///
    /// 返回值表示本次调用是否使目录变为完成
    pub(crate) fn inc_files(&mut self, now_ms: i64) -> Outcome<bool> {
        if self.complete {
            return Outcome::Skipped(SkipReason::UploadFrozen);
        }
        if self.files_transferred >= self.files_total {
            warn!(
                "目录完成文件数已达上限: key={}, files={}/{}",
                self.key, self.files_transferred, self.files_total
            );
            return Outcome::Skipped(SkipReason::UploadFrozen);
        }
        self.files_transferred += 1;

        if self.files_total > 0 && self.files_transferred == self.files_total {
            self.mark_complete(now_ms);
            return Outcome::Applied(true);
        }
        Outcome::Applied(false)
    }

    /// 设置错误，只保留第一个
    pub(crate) fn set_error(&mut self, error: impl Into<String>) -> Outcome {
        let error = error.into();
        if let Some(existing) = &self.error {
            warn!(
                "上传已有错误，忽略新的错误: key={}, 已有={}, 新={}",
                self.key, existing, error
            );
            return Outcome::Skipped(SkipReason::ErrorAlreadySet);
        }
        self.error = Some(error);
        Outcome::Applied(())
    }

    fn mark_complete(&mut self, now_ms: i64) {
        self.complete = true;
        self.completed_at_ms = Some(now_ms);
        info!(
            "上传完成: key={}, name={}, bytes={}",
            self.key, self.friendly_name, self.bytes_transferred
        );
    }

    fn push_sample(&mut self, now_ms: i64) {
        self.samples.push_back(ThroughputSample {
            timestamp_ms: now_ms,
            cumulative_bytes: self.bytes_transferred,
            speed: 0.0,
        });
        while self.samples.len() > self.window.max_samples.max(1) {
            self.samples.pop_front();
        }

        let points: Vec<(i64, u64)> = self
            .samples
            .iter()
            .map(|s| (s.timestamp_ms, s.cumulative_bytes))
            .collect();
        let speed = progress::windowed_speed(&points, self.window.speed_window);
        if let Some(latest) = self.samples.back_mut() {
            latest.speed = speed;
        }
    }
}
