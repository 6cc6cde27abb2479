// 上传分片
//
// 文件在传输开始前按固定大小切分，分片索引在整个上传过程中不变。
// 最后一个分片可能小于分片大小；空文件对应一个 0 字节分片。

use serde::Serialize;

/// 默认分片大小: 25.6MB（客户端单分片上限）
pub const DEFAULT_UPLOAD_CHUNK_SIZE: u64 = 25_600_000;

/// 单个分片的进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadChunk {
    /// 已传输字节数
    pub bytes_transferred: u64,
    /// 分片大小
    pub bytes_total: u64,
    /// 是否已完成
    pub complete: bool,
}

impl UploadChunk {
    pub fn new(bytes_total: u64) -> Self {
        Self {
            bytes_transferred: 0,
            bytes_total,
            complete: false,
        }
    }
}

/// 计算文件的分片计划
///
/// # 参数
/// * `total_bytes` - 文件大小
/// * `chunk_size` - 分片大小（0 时使用默认值）
///
/// # 返回
/// 每个分片的大小，按索引排列
pub fn plan_chunks(total_bytes: u64, chunk_size: u64) -> Vec<u64> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_UPLOAD_CHUNK_SIZE
    } else {
        chunk_size
    };

    if total_bytes == 0 {
        return vec![0];
    }

    let mut sizes = Vec::with_capacity(total_bytes.div_ceil(chunk_size) as usize);
    let mut offset = 0u64;
    while offset < total_bytes {
        let end = std::cmp::min(offset + chunk_size, total_bytes);
        sizes.push(end - offset);
        offset = end;
    }
    sizes
}
