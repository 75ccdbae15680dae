// crates/af_mesh/src/error.rs

//! 网格错误类型

use af_foundation::FoundationError;
use thiserror::Error;

/// 网格操作结果
pub type MeshResult<T> = Result<T, MeshError>;

/// 网格错误
#[derive(Debug, Error)]
pub enum MeshError {
    /// 单元引用了不存在的节点
    #[error("单元 {element} 引用了不存在的节点 {node} (节点总数 {n_nodes})")]
    NodeOutOfRange {
        /// 单元索引
        element: usize,
        /// 节点索引
        node: usize,
        /// 节点总数
        n_nodes: usize,
    },

    /// 单元节点数与拓扑不符
    #[error("单元 {element} 为 {kind}，期望 {expected} 个节点，实际 {found} 个")]
    BadElementArity {
        /// 单元索引
        element: usize,
        /// 单元类型名
        kind: &'static str,
        /// 期望节点数
        expected: usize,
        /// 实际节点数
        found: usize,
    },

    /// 单元维数与网格维数不符
    #[error("单元 {element} 为 {kind}，与网格维数 {n_dim} 不符")]
    DimensionMismatch {
        /// 单元索引
        element: usize,
        /// 单元类型名
        kind: &'static str,
        /// 网格维数
        n_dim: usize,
    },

    /// 对偶体积非正
    #[error("单元 {cell} 的对偶体积非正: {volume:.6e}")]
    NonPositiveVolume {
        /// 单元（节点）索引
        cell: usize,
        /// 体积值
        volume: f64,
    },

    /// 对偶面法向退化为零向量
    #[error("边 ({i}, {j}) 的对偶面法向退化为零向量")]
    DegenerateNormal {
        /// 低索引单元
        i: usize,
        /// 高索引单元
        j: usize,
    },

    /// 边界面未被任何单元拥有
    #[error("边界面 {face} (标记 `{marker}`) 不属于任何原始单元")]
    OrphanBoundaryFace {
        /// 边界面序号（标记内）
        face: usize,
        /// 标记名
        marker: String,
    },

    /// 引用了不存在的标记
    #[error("标记 `{0}` 不存在于网格中")]
    UnknownMarker(String),

    /// 网格为空
    #[error("网格为空: {0}")]
    Empty(&'static str),

    /// 基础层错误
    #[error(transparent)]
    Foundation(#[from] FoundationError),
}
