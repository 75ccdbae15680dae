// crates/af_io/src/error.rs

//! IO 层错误类型

use thiserror::Error;

/// IO 操作结果
pub type IoResult<T> = Result<T, IoError>;

/// IO 层错误
#[derive(Debug, Error)]
pub enum IoError {
    /// 底层 IO 失败
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析失败
    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    /// 文件格式错误
    #[error("格式错误: {0}")]
    Format(String),

    /// 版本不兼容
    #[error("版本不兼容: 文件版本 {file}, 当前版本 {current}")]
    Version {
        /// 文件中的版本
        file: u32,
        /// 当前支持的版本
        current: u32,
    },

    /// 字节序不匹配
    #[error("字节序不匹配: 标记 {0:#010x}")]
    Endianness(u32),

    /// 维度或单元数不匹配
    #[error("快照不匹配: 期望 {expected}, 文件 {found} ({what})")]
    Mismatch {
        /// 不匹配的量
        what: &'static str,
        /// 期望值
        expected: usize,
        /// 文件值
        found: usize,
    },

    /// 校验和错误
    #[error("CRC 校验失败: 期望 {expected:#010x}, 实际 {found:#010x}")]
    Checksum {
        /// 期望值
        expected: u32,
        /// 实际值
        found: u32,
    },
}
