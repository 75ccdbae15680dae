// crates/af_foundation/src/lib.rs

//! AeroFVM 基础层 (Layer 1)
//!
//! 提供整个工作区共享的基础设施，不含任何网格、物理或求解概念：
//! - 索引类型与无效索引约定 (index)
//! - 浮点容差比较 (tolerance)
//! - Kahan 补偿求和 (kahan)
//! - 基础错误类型 (error)
//!
//! # 设计原则
//!
//! 1. **纯净性**: 仅依赖 serde/thiserror，可独立使用
//! 2. **零成本**: 所有工具均为内联的小函数或新类型
//! 3. **可转换性**: 高层错误通过 `#[from]` 向下兼容 [`FoundationError`]

pub mod error;
pub mod index;
pub mod kahan;
pub mod tolerance;

pub use error::{FoundationError, FoundationResult};
pub use index::{BoundaryIndex, CellIndex, EdgeIndex, MarkerIndex, NodeIndex, INVALID_INDEX};
pub use kahan::{kahan_sum, KahanAccumulator};
pub use tolerance::{approx_eq, approx_zero, Tolerance};
