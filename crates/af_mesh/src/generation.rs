// crates/af_mesh/src/generation.rs

//! 网格生成模块
//!
//! 提供简单的结构化网格生成工具，用于测试与验证：
//!
//! - [`RectMeshGenerator`]: 矩形四边形网格（可选节点扰动）
//! - [`BoxMeshGenerator`]: 长方体六面体网格（可选节点扰动）
//!
//! 默认四个/六个边界标记：`left` / `right` / `bottom` / `top`
//! （3D 另加 `front` / `back`）。
//!
//! # 使用示例
//!
//! ```
//! use af_mesh::generation::RectMeshGenerator;
//! use af_mesh::DualGeometry;
//!
//! let raw = RectMeshGenerator::new(4, 4, 1.0, 1.0).build();
//! let geometry = DualGeometry::build(&raw, &[]).unwrap();
//! assert_eq!(geometry.n_cells(), 25);
//! ```

use crate::element::ElementKind;
use crate::raw::{RawElement, RawMarker, RawMesh};

/// 矩形结构化网格生成器
pub struct RectMeshGenerator {
    /// x 方向单元数
    nx: usize,
    /// y 方向单元数
    ny: usize,
    /// x 方向域长度 [m]
    lx: f64,
    /// y 方向域长度 [m]
    ly: f64,
    /// 内部节点扰动幅度（相对于网格步长，0 表示规则网格）
    distortion: f64,
}

impl RectMeshGenerator {
    /// 创建矩形网格生成器
    pub fn new(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        Self {
            nx,
            ny,
            lx,
            ly,
            distortion: 0.0,
        }
    }

    /// 设置内部节点扰动（确定性伪随机，用于非正交网格测试）
    pub fn with_distortion(mut self, amplitude: f64) -> Self {
        self.distortion = amplitude;
        self
    }

    /// 生成原始网格
    pub fn build(&self) -> RawMesh {
        let (nx, ny) = (self.nx, self.ny);
        let dx = self.lx / nx as f64;
        let dy = self.ly / ny as f64;

        let mut points = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                let mut x = i as f64 * dx;
                let mut y = j as f64 * dy;
                // 仅扰动内部节点，保持边界直线
                if self.distortion > 0.0 && i > 0 && i < nx && j > 0 && j < ny {
                    let (sx, sy) = hash_offset(i, j, 0);
                    x += self.distortion * dx * sx;
                    y += self.distortion * dy * sy;
                }
                points.push([x, y, 0.0]);
            }
        }

        let node = |i: usize, j: usize| j * (nx + 1) + i;

        let mut elements = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                elements.push(RawElement {
                    kind: ElementKind::Quadrilateral,
                    nodes: vec![node(i, j), node(i + 1, j), node(i + 1, j + 1), node(i, j + 1)],
                });
            }
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut bottom = Vec::new();
        let mut top = Vec::new();
        for j in 0..ny {
            left.push(vec![node(0, j), node(0, j + 1)]);
            right.push(vec![node(nx, j), node(nx, j + 1)]);
        }
        for i in 0..nx {
            bottom.push(vec![node(i, 0), node(i + 1, 0)]);
            top.push(vec![node(i, ny), node(i + 1, ny)]);
        }

        RawMesh {
            n_dim: 2,
            points,
            elements,
            markers: vec![
                RawMarker {
                    name: "left".into(),
                    faces: left,
                },
                RawMarker {
                    name: "right".into(),
                    faces: right,
                },
                RawMarker {
                    name: "bottom".into(),
                    faces: bottom,
                },
                RawMarker {
                    name: "top".into(),
                    faces: top,
                },
            ],
        }
    }
}

/// 长方体六面体网格生成器
pub struct BoxMeshGenerator {
    nx: usize,
    ny: usize,
    nz: usize,
    lx: f64,
    ly: f64,
    lz: f64,
    distortion: f64,
}

impl BoxMeshGenerator {
    /// 创建长方体网格生成器
    pub fn new(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Self {
        Self {
            nx,
            ny,
            nz,
            lx,
            ly,
            lz,
            distortion: 0.0,
        }
    }

    /// 设置内部节点扰动
    pub fn with_distortion(mut self, amplitude: f64) -> Self {
        self.distortion = amplitude;
        self
    }

    /// 生成原始网格
    pub fn build(&self) -> RawMesh {
        let (nx, ny, nz) = (self.nx, self.ny, self.nz);
        let dx = self.lx / nx as f64;
        let dy = self.ly / ny as f64;
        let dz = self.lz / nz as f64;

        let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    let mut x = i as f64 * dx;
                    let mut y = j as f64 * dy;
                    let mut z = k as f64 * dz;
                    let interior =
                        i > 0 && i < nx && j > 0 && j < ny && k > 0 && k < nz;
                    if self.distortion > 0.0 && interior {
                        let (sx, sy) = hash_offset(i, j, k);
                        let (sz, _) = hash_offset(k, i, j);
                        x += self.distortion * dx * sx;
                        y += self.distortion * dy * sy;
                        z += self.distortion * dz * sz;
                    }
                    points.push([x, y, z]);
                }
            }
        }

        let node = |i: usize, j: usize, k: usize| (k * (ny + 1) + j) * (nx + 1) + i;

        let mut elements = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    elements.push(RawElement {
                        kind: ElementKind::Hexahedron,
                        nodes: vec![
                            node(i, j, k),
                            node(i + 1, j, k),
                            node(i + 1, j + 1, k),
                            node(i, j + 1, k),
                            node(i, j, k + 1),
                            node(i + 1, j, k + 1),
                            node(i + 1, j + 1, k + 1),
                            node(i, j + 1, k + 1),
                        ],
                    });
                }
            }
        }

        let mut markers: Vec<RawMarker> = ["left", "right", "bottom", "top", "front", "back"]
            .iter()
            .map(|name| RawMarker {
                name: (*name).into(),
                faces: Vec::new(),
            })
            .collect();

        for k in 0..nz {
            for j in 0..ny {
                markers[0]
                    .faces
                    .push(vec![node(0, j, k), node(0, j + 1, k), node(0, j + 1, k + 1), node(0, j, k + 1)]);
                markers[1].faces.push(vec![
                    node(nx, j, k),
                    node(nx, j, k + 1),
                    node(nx, j + 1, k + 1),
                    node(nx, j + 1, k),
                ]);
            }
        }
        for k in 0..nz {
            for i in 0..nx {
                markers[2]
                    .faces
                    .push(vec![node(i, 0, k), node(i, 0, k + 1), node(i + 1, 0, k + 1), node(i + 1, 0, k)]);
                markers[3].faces.push(vec![
                    node(i, ny, k),
                    node(i + 1, ny, k),
                    node(i + 1, ny, k + 1),
                    node(i, ny, k + 1),
                ]);
            }
        }
        for j in 0..ny {
            for i in 0..nx {
                markers[4]
                    .faces
                    .push(vec![node(i, j, 0), node(i + 1, j, 0), node(i + 1, j + 1, 0), node(i, j + 1, 0)]);
                markers[5].faces.push(vec![
                    node(i, j, nz),
                    node(i, j + 1, nz),
                    node(i + 1, j + 1, nz),
                    node(i + 1, j, nz),
                ]);
            }
        }

        RawMesh {
            n_dim: 3,
            points,
            elements,
            markers,
        }
    }
}

/// 确定性伪随机扰动，幅度位于 [-0.3, 0.3]
fn hash_offset(i: usize, j: usize, k: usize) -> (f64, f64) {
    let mut h = (i as u64)
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        .wrapping_add((j as u64).wrapping_mul(0xbf58_476d_1ce4_e5b9))
        .wrapping_add((k as u64).wrapping_mul(0x94d0_49bb_1331_11eb));
    h ^= h >> 31;
    h = h.wrapping_mul(0xd6e8_feb8_6659_fd93);
    h ^= h >> 27;
    let a = ((h & 0xffff) as f64 / 65535.0 - 0.5) * 0.6;
    let b = (((h >> 16) & 0xffff) as f64 / 65535.0 - 0.5) * 0.6;
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_counts() {
        let raw = RectMeshGenerator::new(3, 2, 3.0, 2.0).build();
        assert_eq!(raw.points.len(), 12);
        assert_eq!(raw.elements.len(), 6);
        assert_eq!(raw.markers.len(), 4);
        assert!(raw.validate().is_ok());
    }

    #[test]
    fn test_box_counts() {
        let raw = BoxMeshGenerator::new(2, 2, 2, 1.0, 1.0, 1.0).build();
        assert_eq!(raw.points.len(), 27);
        assert_eq!(raw.elements.len(), 8);
        assert_eq!(raw.markers.len(), 6);
        assert!(raw.validate().is_ok());
    }

    #[test]
    fn test_distortion_keeps_boundary() {
        let raw = RectMeshGenerator::new(4, 4, 1.0, 1.0)
            .with_distortion(0.2)
            .build();
        // 边界节点不动
        for j in 0..=4usize {
            let p = raw.points[j * 5];
            assert_eq!(p[0], 0.0);
        }
    }

    #[test]
    fn test_distortion_deterministic() {
        let a = RectMeshGenerator::new(4, 4, 1.0, 1.0)
            .with_distortion(0.2)
            .build();
        let b = RectMeshGenerator::new(4, 4, 1.0, 1.0)
            .with_distortion(0.2)
            .build();
        assert_eq!(a.points, b.points);
    }
}
