// crates/af_physics/src/numerics/gradient.rs

//! 梯度重构
//!
//! 对 n_fields 个单元标量场一次性计算梯度，写入
//! `out[cell * n_fields + k]`。两种方法同一接口：
//!
//! - Green-Gauss: ∇φ_i ≈ (1/V_i) ∮ φ_f n dS，面值取算术平均，
//!   边界面取单元自身值
//! - 加权最小二乘: 权重 1/|dx|²，法方程逐单元 3x3 求解，
//!   对线性场在任意网格上精确

use glam::DVec3;
use rayon::prelude::*;

use af_config::GradientKind;
use af_mesh::DualGeometry;

/// 按配置选择方法计算梯度
pub fn compute_gradients<F>(
    kind: GradientKind,
    geometry: &DualGeometry,
    n_fields: usize,
    value: F,
    out: &mut [DVec3],
) where
    F: Fn(usize, usize) -> f64 + Sync,
{
    match kind {
        GradientKind::GreenGauss => green_gauss(geometry, n_fields, value, out),
        GradientKind::LeastSquares => least_squares(geometry, n_fields, value, out),
    }
}

/// Green-Gauss 梯度
pub fn green_gauss<F>(geometry: &DualGeometry, n_fields: usize, value: F, out: &mut [DVec3])
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    debug_assert_eq!(out.len(), geometry.n_cells() * n_fields);

    out.par_chunks_mut(n_fields)
        .enumerate()
        .for_each(|(cell, grads)| {
            let inv_volume = 1.0 / geometry.volume(cell);
            for k in 0..n_fields {
                let own = value(cell, k);
                let mut acc = DVec3::ZERO;
                for &e in geometry.edges_of_cell(cell) {
                    let edge = geometry.edge(e as usize);
                    let other = edge.other(cell);
                    let face_value = 0.5 * (own + value(other, k));
                    acc += edge.sign_for(cell) * face_value * edge.normal;
                }
                for &f in geometry.boundary_faces_of_cell(cell) {
                    let face = geometry.boundary_face(f as usize);
                    acc += own * face.normal;
                }
                grads[k] = acc * inv_volume;
            }
        });
}

/// 加权最小二乘梯度（权重 1/|dx|²）
pub fn least_squares<F>(geometry: &DualGeometry, n_fields: usize, value: F, out: &mut [DVec3])
where
    F: Fn(usize, usize) -> f64 + Sync,
{
    debug_assert_eq!(out.len(), geometry.n_cells() * n_fields);
    let two_d = geometry.n_dim() == 2;

    out.par_chunks_mut(n_fields)
        .enumerate()
        .for_each(|(cell, grads)| {
            let center = geometry.cell_center(cell);

            // 法方程 M = Σ w dx dxᵀ（对称 3x3；2D 下 z 行列置单位）
            let mut m = [[0.0_f64; 3]; 3];
            for &e in geometry.edges_of_cell(cell) {
                let edge = geometry.edge(e as usize);
                let dx = geometry.cell_center(edge.other(cell)) - center;
                let w = 1.0 / dx.length_squared().max(1e-300);
                for r in 0..3 {
                    for c in 0..3 {
                        m[r][c] += w * dx[r] * dx[c];
                    }
                }
            }
            if two_d {
                m[2] = [0.0, 0.0, 1.0];
                m[0][2] = 0.0;
                m[1][2] = 0.0;
            }
            let inv = invert_3x3(&m);

            for k in 0..n_fields {
                let own = value(cell, k);
                let mut rhs = DVec3::ZERO;
                for &e in geometry.edges_of_cell(cell) {
                    let edge = geometry.edge(e as usize);
                    let other = edge.other(cell);
                    let dx = geometry.cell_center(other) - center;
                    let w = 1.0 / dx.length_squared().max(1e-300);
                    rhs += w * (value(other, k) - own) * dx;
                }
                grads[k] = DVec3::new(
                    inv[0][0] * rhs.x + inv[0][1] * rhs.y + inv[0][2] * rhs.z,
                    inv[1][0] * rhs.x + inv[1][1] * rhs.y + inv[1][2] * rhs.z,
                    inv[2][0] * rhs.x + inv[2][1] * rhs.y + inv[2][2] * rhs.z,
                );
            }
        });
}

/// 3x3 对称矩阵求逆（伴随矩阵法，行列式保护）
fn invert_3x3(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-300 {
        // 退化模板（孤立单元），梯度置零
        return [[0.0; 3]; 3];
    }
    let inv_det = 1.0 / det;
    let mut inv = [[0.0; 3]; 3];
    inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
    inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
    inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
    inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
    inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
    inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
    inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
    inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
    inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_mesh::generation::RectMeshGenerator;

    /// 线性场 φ = 3x - 2y + 1 的梯度必须被最小二乘精确重构
    #[test]
    fn test_least_squares_exact_on_linear_field() {
        let raw = RectMeshGenerator::new(6, 5, 1.0, 1.0)
            .with_distortion(0.2)
            .build();
        let geometry = DualGeometry::build(&raw, &[]).unwrap();
        let mut out = vec![DVec3::ZERO; geometry.n_cells()];
        let centers: Vec<DVec3> = (0..geometry.n_cells())
            .map(|c| geometry.cell_center(c))
            .collect();
        least_squares(
            &geometry,
            1,
            |c, _| 3.0 * centers[c].x - 2.0 * centers[c].y + 1.0,
            &mut out,
        );
        for g in &out {
            assert!((g.x - 3.0).abs() < 1e-12);
            assert!((g.y + 2.0).abs() < 1e-12);
            assert!(g.z.abs() < 1e-12);
        }
    }

    /// Green-Gauss 在规则正交网格的内部单元上对线性场精确
    #[test]
    fn test_green_gauss_linear_interior() {
        let raw = RectMeshGenerator::new(8, 8, 1.0, 1.0).build();
        let geometry = DualGeometry::build(&raw, &[]).unwrap();
        let mut out = vec![DVec3::ZERO; geometry.n_cells()];
        let centers: Vec<DVec3> = (0..geometry.n_cells())
            .map(|c| geometry.cell_center(c))
            .collect();
        green_gauss(
            &geometry,
            1,
            |c, _| 2.0 * centers[c].x + centers[c].y,
            &mut out,
        );
        for c in 0..geometry.n_cells() {
            // 只检查内部单元（边界单元的单侧闭合引入 O(h) 偏差）
            if geometry.boundary_faces_of_cell(c).is_empty() {
                assert!((out[c].x - 2.0).abs() < 1e-10, "cell {c}: {:?}", out[c]);
                assert!((out[c].y - 1.0).abs() < 1e-10);
            }
        }
    }

    /// 常值场梯度为零（两种方法）
    #[test]
    fn test_constant_field_zero_gradient() {
        let raw = RectMeshGenerator::new(5, 5, 1.0, 1.0)
            .with_distortion(0.15)
            .build();
        let geometry = DualGeometry::build(&raw, &[]).unwrap();
        let mut gg = vec![DVec3::ZERO; geometry.n_cells()];
        let mut ls = vec![DVec3::ZERO; geometry.n_cells()];
        green_gauss(&geometry, 1, |_, _| 7.25, &mut gg);
        least_squares(&geometry, 1, |_, _| 7.25, &mut ls);
        for c in 0..geometry.n_cells() {
            assert!(gg[c].length() < 1e-9 * geometry.volume(c).recip().max(1.0));
            assert!(ls[c].length() < 1e-12);
        }
    }
}
