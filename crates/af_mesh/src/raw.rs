// crates/af_mesh/src/raw.rs

//! 原始网格描述
//!
//! [`RawMesh`] 是网格加载器与几何层之间的契约：
//! 节点坐标（双精度，d 分量）、原始单元表（类型 + 有序节点索引）、
//! 边界面表（标记名 + 有序节点索引）。
//! 加载器负责基本校验（无重复节点、单元 Jacobian 为正）；
//! 本层在对偶构造前做索引范围与元数校验。

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::element::ElementKind;
use crate::error::{MeshError, MeshResult};

/// 原始单元：类型 + 有序节点索引
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawElement {
    /// 单元类型
    pub kind: ElementKind,
    /// 节点索引（按参考单元编号约定排列）
    pub nodes: Vec<usize>,
}

/// 边界标记：名字 + 该标记下的边界面（有序节点索引列表）
///
/// 2D 下每个面是线段（2 节点），3D 下是三角形或四边形。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMarker {
    /// 标记名
    pub name: String,
    /// 面节点表
    pub faces: Vec<Vec<usize>>,
}

/// 原始网格
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMesh {
    /// 空间维数（2 或 3）
    pub n_dim: usize,
    /// 节点坐标（2D 下 z 分量为 0）
    pub points: Vec<[f64; 3]>,
    /// 原始单元
    pub elements: Vec<RawElement>,
    /// 边界标记
    pub markers: Vec<RawMarker>,
}

impl RawMesh {
    /// 节点数
    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// 取节点坐标
    #[inline]
    pub fn point(&self, i: usize) -> DVec3 {
        DVec3::from_array(self.points[i])
    }

    /// 基本一致性校验
    ///
    /// 检查单元元数、节点索引范围与维数一致性。
    /// 对偶体积正性等几何校验在 [`DualGeometry`](crate::DualGeometry) 构造时进行。
    pub fn validate(&self) -> MeshResult<()> {
        if self.points.is_empty() {
            return Err(MeshError::Empty("无节点"));
        }
        if self.elements.is_empty() {
            return Err(MeshError::Empty("无单元"));
        }

        let n_nodes = self.points.len();
        for (idx, elem) in self.elements.iter().enumerate() {
            if elem.nodes.len() != elem.kind.n_nodes() {
                return Err(MeshError::BadElementArity {
                    element: idx,
                    kind: elem.kind.name(),
                    expected: elem.kind.n_nodes(),
                    found: elem.nodes.len(),
                });
            }
            if elem.kind.n_dim() != self.n_dim {
                return Err(MeshError::DimensionMismatch {
                    element: idx,
                    kind: elem.kind.name(),
                    n_dim: self.n_dim,
                });
            }
            for &node in &elem.nodes {
                if node >= n_nodes {
                    return Err(MeshError::NodeOutOfRange {
                        element: idx,
                        node,
                        n_nodes,
                    });
                }
            }
        }

        for marker in &self.markers {
            for face in &marker.faces {
                for &node in face {
                    if node >= n_nodes {
                        return Err(MeshError::NodeOutOfRange {
                            element: usize::MAX,
                            node,
                            n_nodes,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// 查找标记索引
    pub fn marker_index(&self, name: &str) -> MeshResult<usize> {
        self.markers
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| MeshError::UnknownMarker(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> RawMesh {
        RawMesh {
            n_dim: 2,
            points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            elements: vec![RawElement {
                kind: ElementKind::Triangle,
                nodes: vec![0, 1, 2],
            }],
            markers: vec![RawMarker {
                name: "outer".into(),
                faces: vec![vec![0, 1], vec![1, 2], vec![2, 0]],
            }],
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(single_triangle().validate().is_ok());
    }

    #[test]
    fn test_validate_arity() {
        let mut mesh = single_triangle();
        mesh.elements[0].nodes.pop();
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::BadElementArity { .. })
        ));
    }

    #[test]
    fn test_validate_range() {
        let mut mesh = single_triangle();
        mesh.elements[0].nodes[2] = 99;
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::NodeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_marker_lookup() {
        let mesh = single_triangle();
        assert_eq!(mesh.marker_index("outer").unwrap(), 0);
        assert!(matches!(
            mesh.marker_index("missing"),
            Err(MeshError::UnknownMarker(_))
        ));
    }
}
