//! 事件模块
//!
//! 定义跟踪器的线上事件格式
//! - `types.rs`: 入站事件（上传/任务）与出站取消请求

mod types;

pub use types::*;
