// crates/af_foundation/src/error.rs

//! 基础错误类型
//!
//! 定义整个工作区的基础错误类型，仅包含与基础设施相关的错误。
//! 本模块是 Layer 1 的核心组件，禁止引入网格、物理、求解等高层概念。
//!
//! # 错误分层
//!
//! ```text
//! 求解层错误 (af_physics::SolverError)
//!        ↓ (转换)
//! 网格/配置错误 (af_mesh::MeshError, af_config::ConfigError)
//!        ↓ (转换)
//! 基础错误 ← 你在这里 (af_foundation::FoundationError)
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型别名
pub type FoundationResult<T> = Result<T, FoundationError>;

/// Layer 1 基础错误
///
/// 包含 IO、索引、输入校验等基础设施级别的错误。
/// 高层错误通过转换为 [`FoundationError::Internal`] 向下兼容。
#[derive(Debug, Error)]
pub enum FoundationError {
    /// IO 操作失败
    #[error("IO 错误: {message}")]
    Io {
        /// 人类可读的错误描述
        message: String,
        /// 可选的底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {0}")]
    FileNotFound(PathBuf),

    /// 索引越界
    #[error("索引越界: {kind} 索引 {index} 超出范围 {len}")]
    IndexOutOfBounds {
        /// 索引种类（cell / edge / node 等）
        kind: &'static str,
        /// 请求的索引
        index: usize,
        /// 有效范围上界
        len: usize,
    },

    /// 无效输入
    #[error("无效输入: {0}")]
    InvalidInput(String),

    /// 数值无效（NaN / Inf）
    #[error("数值无效: {0}")]
    InvalidNumber(String),

    /// 内部错误（高层错误的降级载体）
    #[error("内部错误: {0}")]
    Internal(String),
}

impl FoundationError {
    /// 构造 IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 构造带底层来源的 IO 错误
    pub fn io_with(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 构造无效输入错误
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// 构造内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<std::io::Error> for FoundationError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
            source: Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = FoundationError::IndexOutOfBounds {
            kind: "cell",
            index: 10,
            len: 8,
        };
        let msg = format!("{err}");
        assert!(msg.contains("cell"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FoundationError = io.into();
        assert!(matches!(err, FoundationError::Io { .. }));
    }
}
