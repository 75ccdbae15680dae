// crates/af_mesh/src/dual.rs

//! 中位对偶网格构造
//!
//! 规则（对每条原始边 (i, j) 唯一）：对偶面是所有同时关联 i、j 的
//! 原始单元贡献之并——连接单元形心、触及 i 和 j 的单元边中点、
//! （3D 下）触及 i 和 j 的单元面形心所成的多边形。
//! 对偶面法向为这些面片的有向面积矢量之和。
//!
//! 体积由散度定理逐面片累加：V = (1/d) ∮ x·n dS，
//! 内部面片向低索引单元为正、向高索引单元为负；
//! 边界面片按节点拆分计入拥有单元。该构造保证每个对偶体闭合，
//! 因此体积之和严格等于网格总体积。

use glam::DVec3;
use std::collections::BTreeMap;

use af_foundation::KahanAccumulator;

use crate::element::ElementKind;
use crate::error::{MeshError, MeshResult};
use crate::geometry::{BoundaryFace, DualGeometry, Edge, Marker};
use crate::raw::RawMesh;

/// 平面内逆时针旋转 90 度（2D 面片法向）
#[inline]
fn perp(v: DVec3) -> DVec3 {
    DVec3::new(-v.y, v.x, 0.0)
}

/// 三角形 (a, b, c) 的有向面积矢量
#[inline]
fn triangle_area_vector(a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    0.5 * (b - a).cross(c - a)
}

/// 边法向/中点累加器
#[derive(Default, Clone, Copy)]
struct FaceAccumulator {
    normal: DVec3,
    midpoint_weighted: DVec3,
    weight: f64,
}

impl FaceAccumulator {
    fn push(&mut self, area_vector: DVec3, centroid: DVec3) {
        let w = area_vector.length();
        self.normal += area_vector;
        self.midpoint_weighted += w * centroid;
        self.weight += w;
    }

    fn midpoint(&self) -> DVec3 {
        if self.weight > 0.0 {
            self.midpoint_weighted / self.weight
        } else {
            DVec3::ZERO
        }
    }
}

pub(crate) fn construct(raw: &RawMesh) -> MeshResult<DualGeometry> {
    raw.validate()?;
    let n_dim = raw.n_dim;
    let n_cells = raw.n_points();
    let inv_dim = 1.0 / n_dim as f64;

    // ------------------------------------------------------------------
    // 原始边编号：(低, 高) -> 边索引，BTreeMap 保证确定性排序
    // ------------------------------------------------------------------
    let mut edge_ids: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for elem in &raw.elements {
        for &(a, b) in elem.kind.edges() {
            let (i, j) = ordered(elem.nodes[a], elem.nodes[b]);
            let next = edge_ids.len();
            edge_ids.entry((i, j)).or_insert(next);
        }
    }
    // 重编号为排序后的连续索引
    for (rank, (_, id)) in edge_ids.iter_mut().enumerate() {
        *id = rank;
    }
    let n_edges = edge_ids.len();

    let mut face_acc = vec![FaceAccumulator::default(); n_edges];
    let mut volumes = vec![0.0_f64; n_cells];

    // ------------------------------------------------------------------
    // 内部对偶面片：逐单元、逐单元边
    // ------------------------------------------------------------------
    for elem in &raw.elements {
        let centroid = polygon_centroid(raw, &elem.nodes);

        for &(a, b) in elem.kind.edges() {
            let (ga, gb) = (elem.nodes[a], elem.nodes[b]);
            let (i, j) = ordered(ga, gb);
            let e = edge_ids[&(i, j)];
            // 低 -> 高方向，用于定向面片
            let direction = raw.point(j) - raw.point(i);
            let edge_mid = 0.5 * (raw.point(ga) + raw.point(gb));

            if n_dim == 2 {
                // 面片：边中点 -> 单元形心 的线段
                let mut area_vector = perp(centroid - edge_mid);
                if area_vector.dot(direction) < 0.0 {
                    area_vector = -area_vector;
                }
                let piece_centroid = 0.5 * (edge_mid + centroid);
                face_acc[e].push(area_vector, piece_centroid);
                let dv = inv_dim * piece_centroid.dot(area_vector);
                volumes[i] += dv;
                volumes[j] -= dv;
            } else {
                // 面片：对每个同时触及 a、b 的单元面，
                // 三角形 (边中点, 面形心, 单元形心)
                for face in elem.kind.faces() {
                    let arity = ElementKind::face_arity(face);
                    let local = &face[..arity];
                    if !(local.contains(&a) && local.contains(&b)) {
                        continue;
                    }
                    let face_nodes: Vec<usize> = local.iter().map(|&l| elem.nodes[l]).collect();
                    let face_centroid = polygon_centroid(raw, &face_nodes);

                    let mut area_vector =
                        triangle_area_vector(edge_mid, face_centroid, centroid);
                    if area_vector.dot(direction) < 0.0 {
                        area_vector = -area_vector;
                    }
                    let piece_centroid = (edge_mid + face_centroid + centroid) / 3.0;
                    face_acc[e].push(area_vector, piece_centroid);
                    let dv = inv_dim * piece_centroid.dot(area_vector);
                    volumes[i] += dv;
                    volumes[j] -= dv;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // 边界面片：按 (标记, 节点) 聚合
    // ------------------------------------------------------------------
    let node_elements = build_node_elements(raw);
    let mut bface_acc: BTreeMap<(usize, usize), FaceAccumulator> = BTreeMap::new();

    for (marker_idx, marker) in raw.markers.iter().enumerate() {
        for (face_idx, face_nodes) in marker.faces.iter().enumerate() {
            let owner = find_adjacent_element(raw, &node_elements, face_nodes).ok_or_else(|| {
                MeshError::OrphanBoundaryFace {
                    face: face_idx,
                    marker: marker.name.clone(),
                }
            })?;
            let elem_centroid = polygon_centroid(raw, &raw.elements[owner].nodes);

            if n_dim == 2 {
                debug_assert_eq!(face_nodes.len(), 2, "2D 边界面必须是线段");
                let (na, nb) = (face_nodes[0], face_nodes[1]);
                let (pa, pb) = (raw.point(na), raw.point(nb));
                let mid = 0.5 * (pa + pb);
                // 整面法向，外向：背离拥有单元形心
                let mut full_normal = perp(pb - pa);
                if full_normal.dot(mid - elem_centroid) < 0.0 {
                    full_normal = -full_normal;
                }
                for (node, end) in [(na, pa), (nb, pb)] {
                    let piece_centroid = 0.5 * (end + mid);
                    let area_vector = 0.5 * full_normal;
                    bface_acc
                        .entry((marker_idx, node))
                        .or_default()
                        .push(area_vector, piece_centroid);
                    volumes[node] += inv_dim * piece_centroid.dot(area_vector);
                }
            } else {
                let k = face_nodes.len();
                debug_assert!(k == 3 || k == 4, "3D 边界面必须是三角形或四边形");
                let face_centroid = polygon_centroid(raw, face_nodes);
                for v in 0..k {
                    let node = face_nodes[v];
                    let p = raw.point(node);
                    let mid_next = 0.5 * (p + raw.point(face_nodes[(v + 1) % k]));
                    let mid_prev = 0.5 * (p + raw.point(face_nodes[(v + k - 1) % k]));
                    // 节点份额：两个三角形 (p, m_next, cf) 和 (p, cf, m_prev)
                    for (b, c) in [(mid_next, face_centroid), (face_centroid, mid_prev)] {
                        let mut area_vector = triangle_area_vector(p, b, c);
                        let piece_centroid = (p + b + c) / 3.0;
                        if area_vector.dot(piece_centroid - elem_centroid) < 0.0 {
                            area_vector = -area_vector;
                        }
                        bface_acc
                            .entry((marker_idx, node))
                            .or_default()
                            .push(area_vector, piece_centroid);
                        volumes[node] += inv_dim * piece_centroid.dot(area_vector);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // 组装边表与边界面表
    // ------------------------------------------------------------------
    let mut edges = Vec::with_capacity(n_edges);
    for (&(i, j), &e) in &edge_ids {
        debug_assert_eq!(e, edges.len());
        let acc = &face_acc[e];
        edges.push(Edge {
            cell_i: i,
            cell_j: j,
            normal: acc.normal,
            midpoint: acc.midpoint(),
        });
    }

    // BTreeMap 迭代保证按 (标记, 节点) 升序，边界面按标记分组连续
    let mut boundary_faces = Vec::with_capacity(bface_acc.len());
    for (&(marker_idx, node), acc) in &bface_acc {
        boundary_faces.push(BoundaryFace {
            cell: node,
            marker: marker_idx,
            normal: acc.normal,
            midpoint: acc.midpoint(),
        });
    }
    let mut markers = Vec::with_capacity(raw.markers.len());
    for (m, raw_marker) in raw.markers.iter().enumerate() {
        let start = boundary_faces.partition_point(|f| f.marker < m);
        let end = boundary_faces.partition_point(|f| f.marker <= m);
        markers.push(Marker {
            name: raw_marker.name.clone(),
            faces: start..end,
        });
    }

    // ------------------------------------------------------------------
    // 单元 -> 边 / 边界面 CSR
    // ------------------------------------------------------------------
    let (cell_edge_offsets, cell_edge_indices) = build_csr(
        n_cells,
        edges
            .iter()
            .enumerate()
            .flat_map(|(e, edge)| [(edge.cell_i, e as u32), (edge.cell_j, e as u32)]),
    );
    let (cell_bface_offsets, cell_bface_indices) = build_csr(
        n_cells,
        boundary_faces
            .iter()
            .enumerate()
            .map(|(f, face)| (face.cell, f as u32)),
    );

    let mut total = KahanAccumulator::new();
    for &v in &volumes {
        total.add(v);
    }

    let points = (0..n_cells).map(|i| raw.point(i)).collect();

    Ok(DualGeometry {
        n_dim,
        points,
        volumes,
        edges,
        boundary_faces,
        markers,
        cell_edge_offsets,
        cell_edge_indices,
        cell_bface_offsets,
        cell_bface_indices,
        wall_distance: Vec::new(),
        wall_flags: Vec::new(),
        total_volume: total.value(),
    })
}

#[inline]
fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 节点集合的算术形心
fn polygon_centroid(raw: &RawMesh, nodes: &[usize]) -> DVec3 {
    let mut sum = DVec3::ZERO;
    for &n in nodes {
        sum += raw.point(n);
    }
    sum / nodes.len() as f64
}

/// 节点 -> 关联单元 倒排表
fn build_node_elements(raw: &RawMesh) -> Vec<Vec<u32>> {
    let mut table = vec![Vec::new(); raw.n_points()];
    for (idx, elem) in raw.elements.iter().enumerate() {
        for &node in &elem.nodes {
            table[node].push(idx as u32);
        }
    }
    table
}

/// 查找包含全部面节点的原始单元
fn find_adjacent_element(
    raw: &RawMesh,
    node_elements: &[Vec<u32>],
    face_nodes: &[usize],
) -> Option<usize> {
    for &candidate in &node_elements[face_nodes[0]] {
        let elem = &raw.elements[candidate as usize];
        if face_nodes.iter().all(|n| elem.nodes.contains(n)) {
            return Some(candidate as usize);
        }
    }
    None
}

/// 由 (单元, 条目索引) 流构建 CSR
///
/// 每个单元桶内的条目按流中出现顺序排列（边流按边索引升序）。
fn build_csr(
    n_cells: usize,
    entries: impl Iterator<Item = (usize, u32)> + Clone,
) -> (Vec<u32>, Vec<u32>) {
    let mut counts = vec![0u32; n_cells + 1];
    for (cell, _) in entries.clone() {
        counts[cell + 1] += 1;
    }
    for i in 0..n_cells {
        counts[i + 1] += counts[i];
    }
    let offsets = counts.clone();
    let mut cursor = counts;
    let total = offsets[n_cells] as usize;
    let mut indices = vec![0u32; total];
    for (cell, index) in entries {
        indices[cursor[cell] as usize] = index;
        cursor[cell] += 1;
    }
    (offsets, indices)
}
