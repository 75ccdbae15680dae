// crates/af_physics/src/numerics/limiter.rs

//! 坡度限制器
//!
//! 对每个单元、每个原始变量计算标量 φ ∈ [0,1]，乘在重构坡度上
//! 抑制新极值。外推点取边弦中点（与 MUSCL 重构一致）。
//!
//! - Venkatakrishnan: 光滑限制函数，ε² = (K·h)³，h = V^(1/d)。
//!   K 大 → 弱限制（光滑流动），K 小 → 强限制（激波）
//! - Barth-Jespersen: min(1, Δ⁺/Δ₂)，线性场上恒为 1

use rayon::prelude::*;

use af_config::LimiterKind;
use af_mesh::DualGeometry;

use crate::state::FlowField;

/// 计算全部原始变量的限制器，写入 `state.limiters`
///
/// 先做一遍邻域极值扫描（`prim_min` / `prim_max`），
/// 再按限制器类型逐面求最小 φ。
pub fn compute_limiters(
    kind: LimiterKind,
    venkat_k: f64,
    geometry: &DualGeometry,
    state: &mut FlowField,
) {
    let n_prim = state.n_prim();

    if kind == LimiterKind::None {
        state.limiters.fill(1.0);
        return;
    }

    // 邻域极值
    {
        let field = &*state;
        let mut min_buf = vec![0.0; field.prim_min.len()];
        let mut max_buf = vec![0.0; field.prim_max.len()];
        min_buf
            .par_chunks_mut(n_prim)
            .zip(max_buf.par_chunks_mut(n_prim))
            .enumerate()
            .for_each(|(cell, (mins, maxs))| {
                for k in 0..n_prim {
                    let own = field.primitive(cell, k);
                    let mut lo = own;
                    let mut hi = own;
                    for other in geometry.neighbors_of_cell(cell) {
                        let v = field.primitive(other, k);
                        lo = lo.min(v);
                        hi = hi.max(v);
                    }
                    mins[k] = lo;
                    maxs[k] = hi;
                }
            });
        state.prim_min = min_buf;
        state.prim_max = max_buf;
    }

    // 逐面最小 φ
    let inv_dim = 1.0 / geometry.n_dim() as f64;
    let field = &*state;
    let mut limiters = vec![1.0; field.limiters.len()];
    limiters
        .par_chunks_mut(n_prim)
        .enumerate()
        .for_each(|(cell, phis)| {
            let center = geometry.cell_center(cell);
            let h = geometry.volume(cell).powf(inv_dim);
            let eps2 = match kind {
                LimiterKind::Venkat => {
                    let kh = venkat_k * h;
                    kh * kh * kh
                }
                _ => 0.0,
            };

            for k in 0..n_prim {
                let own = field.primitive(cell, k);
                let du_max = field.prim_max[cell * n_prim + k] - own;
                let du_min = field.prim_min[cell * n_prim + k] - own;
                let grad = field.gradient(cell, k);

                let mut phi: f64 = 1.0;
                for &e in geometry.edges_of_cell(cell) {
                    let edge = geometry.edge(e as usize);
                    let other = edge.other(cell);
                    let to_face = 0.5 * (geometry.cell_center(other) - center);
                    let delta2 = grad.dot(to_face);
                    if delta2.abs() < 1e-300 {
                        continue;
                    }
                    let delta1 = if delta2 > 0.0 { du_max } else { du_min };
                    let phi_face = match kind {
                        LimiterKind::Venkat => venkat_function(delta1, delta2, eps2),
                        LimiterKind::Barth => (delta1 / delta2).min(1.0).max(0.0),
                        LimiterKind::None => 1.0,
                    };
                    phi = phi.min(phi_face);
                }
                phis[k] = phi.clamp(0.0, 1.0);
            }
        });
    state.limiters = limiters;
}

/// Venkatakrishnan 光滑限制函数
///
/// ψ(Δ₁, Δ₂) = (Δ₁² + ε² + 2Δ₂Δ₁) / (Δ₁² + 2Δ₂² + Δ₁Δ₂ + ε²)
#[inline]
fn venkat_function(delta1: f64, delta2: f64, eps2: f64) -> f64 {
    let num = (delta1 * delta1 + eps2) * delta2 + 2.0 * delta2 * delta2 * delta1;
    let den = delta2 * (delta1 * delta1 + 2.0 * delta2 * delta2 + delta1 * delta2 + eps2);
    if den.abs() < 1e-300 {
        1.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::gradient::least_squares;
    use crate::types::{FaceState, GasModel};
    use af_config::GasConfig;
    use af_mesh::generation::RectMeshGenerator;
    use glam::DVec3;

    fn setup(nx: usize, ny: usize, distortion: f64) -> (DualGeometry, FlowField, GasModel) {
        let raw = RectMeshGenerator::new(nx, ny, 1.0, 1.0)
            .with_distortion(distortion)
            .build();
        let geometry = DualGeometry::build(&raw, &[]).unwrap();
        let gas = GasModel::new(&GasConfig::default());
        let mut field = FlowField::new(2, geometry.n_cells());
        field.initialize_uniform(
            &FaceState {
                density: 1.2,
                velocity: DVec3::new(50.0, 0.0, 0.0),
                pressure: 1e5,
            },
            &gas,
        );
        (geometry, field, gas)
    }

    #[test]
    fn test_uniform_field_unlimited() {
        let (geometry, mut field, _) = setup(6, 6, 0.1);
        compute_limiters(LimiterKind::Venkat, 5.0, &geometry, &mut field);
        for &phi in &field.limiters {
            assert!((phi - 1.0).abs() < 1e-12);
        }
    }

    /// 线性压力场：Barth-Jespersen 不截断（梯度精确，重构值恰在邻域包络内）
    #[test]
    fn test_barth_linear_field_no_clipping() {
        let (geometry, mut field, gas) = setup(7, 6, 0.2);
        let n_prim = field.n_prim();
        // 施加线性压力扰动并同步守恒量
        for c in 0..geometry.n_cells() {
            let p = geometry.cell_center(c);
            let state = FaceState {
                density: 1.2,
                velocity: DVec3::new(50.0, 0.0, 0.0),
                pressure: 1e5 + 2000.0 * p.x + 500.0 * p.y,
            };
            let u = state.to_conservative(&gas, 2);
            field.set_cons(c, &u[..4]);
        }
        field.refresh_primitives(&gas);
        let field_ref = &field;
        let mut grads = vec![DVec3::ZERO; geometry.n_cells() * n_prim];
        least_squares(
            &geometry,
            n_prim,
            |c, k| field_ref.primitive(c, k),
            &mut grads,
        );
        field.gradients = grads;
        compute_limiters(LimiterKind::Barth, 5.0, &geometry, &mut field);
        for c in 0..geometry.n_cells() {
            let phi = field.limiter(c, n_prim - 1);
            assert!(phi > 1.0 - 1e-9, "cell {c}: phi = {phi}");
        }
    }

    #[test]
    fn test_venkat_bounded() {
        let (geometry, mut field, gas) = setup(8, 8, 0.0);
        // 阶跃压力场
        for c in 0..geometry.n_cells() {
            let p = geometry.cell_center(c);
            let pressure = if p.x < 0.5 { 2e5 } else { 1e5 };
            let state = FaceState {
                density: 1.2,
                velocity: DVec3::ZERO,
                pressure,
            };
            let u = state.to_conservative(&gas, 2);
            field.set_cons(c, &u[..4]);
        }
        field.refresh_primitives(&gas);
        let n_prim = field.n_prim();
        let field_ref = &field;
        let mut grads = vec![DVec3::ZERO; geometry.n_cells() * n_prim];
        least_squares(
            &geometry,
            n_prim,
            |c, k| field_ref.primitive(c, k),
            &mut grads,
        );
        field.gradients = grads;
        compute_limiters(LimiterKind::Venkat, 0.3, &geometry, &mut field);
        for &phi in &field.limiters {
            assert!((0.0..=1.0).contains(&phi));
        }
        // 间断附近必须发生限制
        let min_phi = field
            .limiters
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        assert!(min_phi < 0.9);
    }
}
