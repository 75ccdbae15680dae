// crates/af_mesh/src/geometry.rs

//! 对偶控制体几何
//!
//! [`DualGeometry`] 是预处理完成后的静态网格描述：对偶体积、
//! 边法向、边界顶点、壁面距离与连接表。构造一次，之后只读共享。
//!
//! # 约定
//!
//! - 单元与原始网格节点一一对应（节点中心格式）
//! - 边 (i, j) 满足 i < j，面积加权法向由 i 指向 j
//! - 边界面按标记分组连续存放，`Marker` 持有其区间

use glam::DVec3;
use rayon::prelude::*;
use rstar::RTree;
use std::ops::Range;

use af_foundation::KahanAccumulator;

use crate::dual;
use crate::error::{MeshError, MeshResult};
use crate::raw::RawMesh;

/// 对偶边：相邻单元对及其共享对偶面
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// 低索引单元
    pub cell_i: usize,
    /// 高索引单元
    pub cell_j: usize,
    /// 面积加权法向，方向 i -> j
    pub normal: DVec3,
    /// 对偶面中点（面积加权）
    pub midpoint: DVec3,
}

impl Edge {
    /// 对偶面面积
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal.length()
    }

    /// 单位法向
    #[inline]
    pub fn unit_normal(&self) -> DVec3 {
        self.normal / self.area()
    }

    /// 给定一端单元，返回另一端
    #[inline]
    pub fn other(&self, cell: usize) -> usize {
        self.cell_i + self.cell_j - cell
    }

    /// 给定一端单元，返回出流方向符号（+1 表示法向离开该单元）
    #[inline]
    pub fn sign_for(&self, cell: usize) -> f64 {
        if cell == self.cell_i {
            1.0
        } else {
            -1.0
        }
    }
}

/// 边界面：边界上某单元的对偶面片
#[derive(Debug, Clone, Copy)]
pub struct BoundaryFace {
    /// 拥有单元
    pub cell: usize,
    /// 标记索引
    pub marker: usize,
    /// 面积加权外法向
    pub normal: DVec3,
    /// 面中点（面积加权）
    pub midpoint: DVec3,
}

impl BoundaryFace {
    /// 面积
    #[inline]
    pub fn area(&self) -> f64 {
        self.normal.length()
    }

    /// 单位外法向
    #[inline]
    pub fn unit_normal(&self) -> DVec3 {
        self.normal / self.area()
    }
}

/// 边界标记：名字 + 边界面区间
#[derive(Debug, Clone)]
pub struct Marker {
    /// 标记名
    pub name: String,
    /// 在 `boundary_faces` 中的区间
    pub faces: Range<usize>,
}

/// 预处理完成的对偶网格几何（不可变）
#[derive(Debug)]
pub struct DualGeometry {
    pub(crate) n_dim: usize,
    pub(crate) points: Vec<DVec3>,
    pub(crate) volumes: Vec<f64>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) boundary_faces: Vec<BoundaryFace>,
    pub(crate) markers: Vec<Marker>,

    /// 单元 -> 边 CSR
    pub(crate) cell_edge_offsets: Vec<u32>,
    pub(crate) cell_edge_indices: Vec<u32>,

    /// 单元 -> 边界面 CSR
    pub(crate) cell_bface_offsets: Vec<u32>,
    pub(crate) cell_bface_indices: Vec<u32>,

    /// 壁面距离（无壁面时为 1e30）
    pub(crate) wall_distance: Vec<f64>,

    /// 壁面节点标志
    pub(crate) wall_flags: Vec<bool>,

    pub(crate) total_volume: f64,
}

impl DualGeometry {
    /// 从原始网格构造对偶几何
    ///
    /// `wall_markers` 指定参与壁面距离计算的标记名。
    ///
    /// # 失败条件
    ///
    /// - 任一对偶体积非正
    /// - 任一对偶面法向退化为零向量
    /// - `wall_markers` 引用了不存在的标记
    pub fn build(raw: &RawMesh, wall_markers: &[String]) -> MeshResult<Self> {
        let mut geometry = dual::construct(raw)?;
        geometry.compute_wall_distance(wall_markers)?;
        geometry.verify()?;
        tracing::debug!(
            n_cells = geometry.n_cells(),
            n_edges = geometry.n_edges(),
            n_boundary_faces = geometry.n_boundary_faces(),
            total_volume = geometry.total_volume,
            "对偶几何构造完成"
        );
        Ok(geometry)
    }

    // =========================================================================
    // 基本统计
    // =========================================================================

    /// 空间维数
    #[inline]
    pub fn n_dim(&self) -> usize {
        self.n_dim
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.volumes.len()
    }

    /// 边数
    #[inline]
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// 边界面数
    #[inline]
    pub fn n_boundary_faces(&self) -> usize {
        self.boundary_faces.len()
    }

    /// 网格总体积
    #[inline]
    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    // =========================================================================
    // 单元访问
    // =========================================================================

    /// 单元中心（即原始节点坐标）
    #[inline]
    pub fn cell_center(&self, cell: usize) -> DVec3 {
        self.points[cell]
    }

    /// 对偶体积
    #[inline]
    pub fn volume(&self, cell: usize) -> f64 {
        self.volumes[cell]
    }

    /// 壁面距离
    #[inline]
    pub fn wall_distance(&self, cell: usize) -> f64 {
        self.wall_distance[cell]
    }

    /// 单元是否位于壁面上
    #[inline]
    pub fn is_wall_cell(&self, cell: usize) -> bool {
        self.wall_flags[cell]
    }

    /// 单元的关联边索引
    #[inline]
    pub fn edges_of_cell(&self, cell: usize) -> &[u32] {
        let start = self.cell_edge_offsets[cell] as usize;
        let end = self.cell_edge_offsets[cell + 1] as usize;
        &self.cell_edge_indices[start..end]
    }

    /// 单元的关联边界面索引
    #[inline]
    pub fn boundary_faces_of_cell(&self, cell: usize) -> &[u32] {
        let start = self.cell_bface_offsets[cell] as usize;
        let end = self.cell_bface_offsets[cell + 1] as usize;
        &self.cell_bface_indices[start..end]
    }

    /// 遍历单元的相邻单元
    pub fn neighbors_of_cell(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges_of_cell(cell)
            .iter()
            .map(move |&e| self.edges[e as usize].other(cell))
    }

    // =========================================================================
    // 边与边界面访问
    // =========================================================================

    /// 取边
    #[inline]
    pub fn edge(&self, e: usize) -> &Edge {
        &self.edges[e]
    }

    /// 所有边
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// 边法向（面积加权，i -> j）
    #[inline]
    pub fn normal(&self, e: usize) -> DVec3 {
        self.edges[e].normal
    }

    /// 取边界面
    #[inline]
    pub fn boundary_face(&self, f: usize) -> &BoundaryFace {
        &self.boundary_faces[f]
    }

    /// 所有边界面
    #[inline]
    pub fn boundary_faces(&self) -> &[BoundaryFace] {
        &self.boundary_faces
    }

    /// 标记列表
    #[inline]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// 按名字查找标记索引
    pub fn marker_index(&self, name: &str) -> MeshResult<usize> {
        self.markers
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| MeshError::UnknownMarker(name.to_string()))
    }

    /// 某标记下的边界面切片
    pub fn marker_faces(&self, marker: usize) -> &[BoundaryFace] {
        &self.boundary_faces[self.markers[marker].faces.clone()]
    }

    // =========================================================================
    // 构造期内部步骤
    // =========================================================================

    /// 壁面距离：对壁面标记的边界面中点与壁面节点做一次性最近点查询
    fn compute_wall_distance(&mut self, wall_markers: &[String]) -> MeshResult<()> {
        let n_cells = self.n_cells();
        self.wall_distance = vec![1e30; n_cells];
        self.wall_flags = vec![false; n_cells];
        if wall_markers.is_empty() {
            return Ok(());
        }

        let mut sites: Vec<[f64; 3]> = Vec::new();
        for name in wall_markers {
            let marker = self.marker_index(name)?;
            let range = self.markers[marker].faces.clone();
            for f in range {
                let (midpoint, cell) = {
                    let face = &self.boundary_faces[f];
                    (face.midpoint, face.cell)
                };
                sites.push(midpoint.to_array());
                sites.push(self.points[cell].to_array());
                self.wall_flags[cell] = true;
            }
        }
        if sites.is_empty() {
            return Ok(());
        }

        let tree = RTree::bulk_load(sites);
        let points = &self.points;
        self.wall_distance = (0..n_cells)
            .into_par_iter()
            .map(|c| {
                let query = points[c].to_array();
                let d2 = tree
                    .nearest_neighbor(&query)
                    .map(|site| {
                        let dx = site[0] - query[0];
                        let dy = site[1] - query[1];
                        let dz = site[2] - query[2];
                        dx * dx + dy * dy + dz * dz
                    })
                    .unwrap_or(1e60);
                d2.sqrt()
            })
            .collect();
        Ok(())
    }

    /// 构造后校验：体积正性、法向非退化、体积闭合
    fn verify(&self) -> MeshResult<()> {
        for (cell, &v) in self.volumes.iter().enumerate() {
            if !(v > 0.0) || !v.is_finite() {
                return Err(MeshError::NonPositiveVolume { cell, volume: v });
            }
        }
        for edge in &self.edges {
            if edge.normal.length_squared() < 1e-24 {
                return Err(MeshError::DegenerateNormal {
                    i: edge.cell_i,
                    j: edge.cell_j,
                });
            }
        }
        Ok(())
    }

    /// 全部对偶体积之和（Kahan 求和，用于闭合性诊断）
    pub fn volume_sum(&self) -> f64 {
        let mut acc = KahanAccumulator::new();
        for &v in &self.volumes {
            acc.add(v);
        }
        acc.value()
    }
}
