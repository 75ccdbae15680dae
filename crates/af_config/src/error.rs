// crates/af_config/src/error.rs

//! 配置错误类型

use af_foundation::FoundationError;
use thiserror::Error;

/// 配置操作结果
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("配置文件读取失败: {0}")]
    Read(#[from] std::io::Error),

    /// JSON 解析失败
    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 参数超出有效范围
    #[error("参数 `{key}` 无效: {reason} (当前值 {value})")]
    OutOfRange {
        /// 参数名
        key: &'static str,
        /// 当前值
        value: f64,
        /// 原因描述
        reason: &'static str,
    },

    /// 选项组合不兼容
    #[error("选项组合不兼容: {0}")]
    Incompatible(String),

    /// 边界标记重复定义
    #[error("边界标记 `{0}` 重复定义")]
    DuplicateMarker(String),

    /// 基础层错误
    #[error(transparent)]
    Foundation(#[from] FoundationError),
}
