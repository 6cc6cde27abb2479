//! 进度聚合计算
//!
//! 上传与任务两个跟踪器共用的纯函数：百分比、窗口速度、滚动平均、剩余时间，
//! 以及给展示层用的人类可读格式化

/// 完成百分比
///
/// 总量为 0 时返回 0（新注册的目录尚未发现任何文件）
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64) * 100.0
}

/// 按子单元计数的百分比，允许分子为负（失败数超过完成数时）
pub fn ratio_percent(numerator: i64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (numerator as f64 * 100.0) / total as f64
}

/// 健康进度：失败的子单元不计入
pub fn healthy_progress(complete: u64, failed: u64, total: u64) -> f64 {
    ratio_percent(complete as i64 - failed as i64, total)
}

/// 尝试进度：包含失败的子单元
pub fn attempted_progress(complete: u64, total: u64) -> f64 {
    ratio_percent(complete as i64, total)
}

/// 窗口平均速度（字节/秒）
///
/// `points` 为按时间排序的 (时间戳毫秒, 累计字节) 序列，
/// 取最后 `window` 个点中最早与最新的一对计算
pub fn windowed_speed(points: &[(i64, u64)], window: usize) -> f64 {
    if points.len() < 2 || window < 2 {
        return 0.0;
    }
    let tail = points[points.len().saturating_sub(window)];
    let head = points[points.len() - 1];

    let time_diff = head.0 - tail.0;
    if time_diff <= 0 {
        return 0.0;
    }
    let bytes_diff = head.1.saturating_sub(tail.1);
    (bytes_diff as f64 / time_diff as f64) * 1000.0
}

/// 最近 `window` 个速度样本的平均值
pub fn rolling_average(speeds: &[f64], window: usize) -> f64 {
    if speeds.is_empty() || window == 0 {
        return 0.0;
    }
    let count = speeds.len().min(window);
    let sum: f64 = speeds[speeds.len() - count..].iter().sum();
    sum / count as f64
}

/// 估算剩余时间（秒）
pub fn remaining_secs(done: u64, total: u64, speed: f64) -> Option<u64> {
    if speed <= 0.0 || !speed.is_finite() || done >= total {
        return None;
    }
    Some(((total - done) as f64 / speed).ceil() as u64)
}

const NS_IN_MILLISECOND: u64 = 1000 * 1000;
const NS_IN_SECOND: u64 = NS_IN_MILLISECOND * 1000;
const NS_IN_MINUTE: u64 = NS_IN_SECOND * 60;
const NS_IN_HOUR: u64 = NS_IN_MINUTE * 60;

/// 纳秒转人类可读时间，如 "1h 2m 3s"、"15ms"、"<1ms"
pub fn ns_to_human_time(ns: u64) -> String {
    let mut parts = Vec::new();
    let mut rest = ns;

    let hours = rest / NS_IN_HOUR;
    if hours >= 1 {
        parts.push(format!("{}h", hours));
        rest %= NS_IN_HOUR;
    }

    let minutes = rest / NS_IN_MINUTE;
    if minutes >= 1 {
        parts.push(format!("{}m", minutes));
        rest %= NS_IN_MINUTE;
    }

    let seconds = rest / NS_IN_SECOND;
    if seconds >= 1 {
        parts.push(format!("{}s", seconds));
        rest %= NS_IN_SECOND;
    }

    // 不足一秒时才显示毫秒
    if hours == 0 && minutes == 0 && seconds == 0 {
        let millis = rest / NS_IN_MILLISECOND;
        if millis >= 1 {
            parts.push(format!("{}ms", millis));
        }
    }

    if parts.is_empty() {
        return "<1ms".to_string();
    }
    parts.join(" ")
}

/// 字节数转人类可读大小（SI 单位，保留一位小数）
pub fn human_file_size(bytes: u64) -> String {
    const THRESH: f64 = 1000.0;
    const UNITS: [&str; 6] = ["kB", "MB", "GB", "TB", "PB", "EB"];

    if (bytes as f64) < THRESH {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    value /= THRESH;
    while (value * 10.0).round() / 10.0 >= THRESH && unit < UNITS.len() - 1 {
        value /= THRESH;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
