// crates/af_mesh/src/lib.rs

//! AeroFVM 网格层 (Layer 3)
//!
//! 以节点为中心的中位对偶 (median-dual) 有限体积网格：
//! - 原始网格描述 (raw): 节点坐标 + 原始单元 + 边界标记面
//! - 单元拓扑表 (element): 三角形/四边形/四面体/六面体/三棱柱/金字塔
//! - 对偶几何 (geometry): 对偶体积、边法向、边界顶点、壁面距离
//! - 边着色 (coloring): 并行装配的无冲突调度
//! - 网格生成 (generation): 测试与验证用结构化网格
//!
//! # 不变量
//!
//! - 每条对偶边只出现一次，法向由低索引单元指向高索引单元
//! - 单元对偶面闭合：内部边与边界面贡献的法向量和为零向量
//! - 全部对偶体积之和等于网格总体积
//! - 构造完成后 [`DualGeometry`] 不可变

pub mod coloring;
pub mod element;
pub mod error;
pub mod generation;
pub mod geometry;
pub mod raw;

mod dual;

pub use coloring::EdgeColoring;
pub use element::ElementKind;
pub use error::{MeshError, MeshResult};
pub use geometry::{BoundaryFace, DualGeometry, Edge, Marker};
pub use raw::{RawElement, RawMarker, RawMesh};
