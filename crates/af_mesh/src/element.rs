// crates/af_mesh/src/element.rs

//! 原始单元拓扑表
//!
//! 每种单元类型携带参考单元的边表与面表，用于推导对偶网格。
//! 节点编号约定与 VTK 一致：
//! - 六面体：底面 0-3 逆时针，顶面 4-7 与之对应
//! - 三棱柱：底三角 0-2，顶三角 3-5
//! - 金字塔：四边形底 0-3，塔尖 4

use serde::{Deserialize, Serialize};

/// 原始单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// 三角形（2D）
    Triangle,
    /// 四边形（2D）
    Quadrilateral,
    /// 四面体
    Tetrahedron,
    /// 六面体
    Hexahedron,
    /// 三棱柱
    Prism,
    /// 金字塔
    Pyramid,
}

/// 单元面（最多 4 个节点；三角形面第 4 位为 usize::MAX）
pub type LocalFace = [usize; 4];

const NO_NODE: usize = usize::MAX;

impl ElementKind {
    /// 类型名
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Triangle => "triangle",
            ElementKind::Quadrilateral => "quadrilateral",
            ElementKind::Tetrahedron => "tetrahedron",
            ElementKind::Hexahedron => "hexahedron",
            ElementKind::Prism => "prism",
            ElementKind::Pyramid => "pyramid",
        }
    }

    /// 节点数
    pub fn n_nodes(self) -> usize {
        match self {
            ElementKind::Triangle => 3,
            ElementKind::Quadrilateral => 4,
            ElementKind::Tetrahedron => 4,
            ElementKind::Hexahedron => 8,
            ElementKind::Prism => 6,
            ElementKind::Pyramid => 5,
        }
    }

    /// 空间维数
    pub fn n_dim(self) -> usize {
        match self {
            ElementKind::Triangle | ElementKind::Quadrilateral => 2,
            _ => 3,
        }
    }

    /// 参考单元边表（局部节点索引对）
    pub fn edges(self) -> &'static [(usize, usize)] {
        match self {
            ElementKind::Triangle => &[(0, 1), (1, 2), (2, 0)],
            ElementKind::Quadrilateral => &[(0, 1), (1, 2), (2, 3), (3, 0)],
            ElementKind::Tetrahedron => &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)],
            ElementKind::Hexahedron => &[
                (0, 1),
                (1, 2),
                (2, 3),
                (3, 0),
                (4, 5),
                (5, 6),
                (6, 7),
                (7, 4),
                (0, 4),
                (1, 5),
                (2, 6),
                (3, 7),
            ],
            ElementKind::Prism => &[
                (0, 1),
                (1, 2),
                (2, 0),
                (3, 4),
                (4, 5),
                (5, 3),
                (0, 3),
                (1, 4),
                (2, 5),
            ],
            ElementKind::Pyramid => &[
                (0, 1),
                (1, 2),
                (2, 3),
                (3, 0),
                (0, 4),
                (1, 4),
                (2, 4),
                (3, 4),
            ],
        }
    }

    /// 参考单元面表（仅 3D 单元；面节点逆时针朝外）
    ///
    /// 2D 单元的"面"即其边，由 [`edges`](Self::edges) 给出。
    pub fn faces(self) -> &'static [LocalFace] {
        match self {
            ElementKind::Triangle | ElementKind::Quadrilateral => &[],
            ElementKind::Tetrahedron => &[
                [0, 2, 1, NO_NODE],
                [0, 1, 3, NO_NODE],
                [0, 3, 2, NO_NODE],
                [1, 2, 3, NO_NODE],
            ],
            ElementKind::Hexahedron => &[
                [0, 3, 2, 1],
                [4, 5, 6, 7],
                [0, 1, 5, 4],
                [1, 2, 6, 5],
                [2, 3, 7, 6],
                [3, 0, 4, 7],
            ],
            ElementKind::Prism => &[
                [0, 2, 1, NO_NODE],
                [3, 4, 5, NO_NODE],
                [0, 1, 4, 3],
                [1, 2, 5, 4],
                [2, 0, 3, 5],
            ],
            ElementKind::Pyramid => &[
                [0, 3, 2, 1],
                [0, 1, 4, NO_NODE],
                [1, 2, 4, NO_NODE],
                [2, 3, 4, NO_NODE],
                [3, 0, 4, NO_NODE],
            ],
        }
    }

    /// 面的有效节点数
    pub fn face_arity(face: &LocalFace) -> usize {
        if face[3] == NO_NODE {
            3
        } else {
            4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_counts() {
        assert_eq!(ElementKind::Triangle.edges().len(), 3);
        assert_eq!(ElementKind::Quadrilateral.edges().len(), 4);
        assert_eq!(ElementKind::Tetrahedron.edges().len(), 6);
        assert_eq!(ElementKind::Hexahedron.edges().len(), 12);
        assert_eq!(ElementKind::Prism.edges().len(), 9);
        assert_eq!(ElementKind::Pyramid.edges().len(), 8);
    }

    #[test]
    fn test_face_counts() {
        assert_eq!(ElementKind::Tetrahedron.faces().len(), 4);
        assert_eq!(ElementKind::Hexahedron.faces().len(), 6);
        assert_eq!(ElementKind::Prism.faces().len(), 5);
        assert_eq!(ElementKind::Pyramid.faces().len(), 5);
    }

    #[test]
    fn test_each_3d_edge_in_exactly_two_faces() {
        // 对偶面构造依赖：3D 单元的任一边恰好被两个面共享
        for kind in [
            ElementKind::Tetrahedron,
            ElementKind::Hexahedron,
            ElementKind::Prism,
            ElementKind::Pyramid,
        ] {
            for &(a, b) in kind.edges() {
                let count = kind
                    .faces()
                    .iter()
                    .filter(|face| {
                        let arity = ElementKind::face_arity(face);
                        let nodes = &face[..arity];
                        nodes.contains(&a) && nodes.contains(&b)
                    })
                    .count();
                assert_eq!(count, 2, "{:?} edge ({a},{b})", kind);
            }
        }
    }

    #[test]
    fn test_edge_endpoints_distinct() {
        for kind in [
            ElementKind::Triangle,
            ElementKind::Quadrilateral,
            ElementKind::Tetrahedron,
            ElementKind::Hexahedron,
            ElementKind::Prism,
            ElementKind::Pyramid,
        ] {
            for &(a, b) in kind.edges() {
                assert_ne!(a, b);
                assert!(a < kind.n_nodes() && b < kind.n_nodes());
            }
        }
    }
}
