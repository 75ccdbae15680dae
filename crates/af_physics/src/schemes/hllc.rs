// crates/af_physics/src/schemes/hllc.rs

//! HLLC 近似黎曼求解器
//!
//! 三波模型（左行波 S_L、接触波 S_M、右行波 S_R），
//! 波速估计用 Roe 平均加界（Einfeldt）。星区状态按
//! Toro 的标准构造，接触波两侧压力连续。
//!
//! Jacobian 取一阶标量耗散近似。

use glam::DVec3;

use crate::types::{var_zero, EdgeFlux, FaceState, GasModel, VarVec};

use super::{scalar_dissipation_jacobian, EdgeStencil};

/// HLLC 格式
#[derive(Debug, Clone, Copy, Default)]
pub struct HllcScheme;

impl HllcScheme {
    /// 计算通量与（可选）标量 Jacobian
    pub fn evaluate(
        &self,
        gas: &GasModel,
        n_dim: usize,
        stencil: &EdgeStencil,
        normal: DVec3,
        need_jacobian: bool,
        out: &mut EdgeFlux,
    ) {
        let n_var = n_dim + 2;
        let area = normal.length();
        let unit_normal = normal / area;
        let left = &stencil.left;
        let right = &stencil.right;

        let vn_left = left.velocity.dot(unit_normal);
        let vn_right = right.velocity.dot(unit_normal);
        let a_left = left.sound_speed(gas);
        let a_right = right.sound_speed(gas);

        // Roe 平均波速界
        let rl = left.density.sqrt();
        let rr = right.density.sqrt();
        let w = rl / (rl + rr);
        let vn_roe = w * vn_left + (1.0 - w) * vn_right;
        let h_roe = w * left.total_enthalpy(gas) + (1.0 - w) * right.total_enthalpy(gas);
        let u_roe = w * left.velocity + (1.0 - w) * right.velocity;
        let a_roe = ((gas.gamma - 1.0) * (h_roe - 0.5 * u_roe.length_squared()))
            .max(1e-300)
            .sqrt();

        let s_left = (vn_left - a_left).min(vn_roe - a_roe);
        let s_right = (vn_right + a_right).max(vn_roe + a_roe);

        // 接触波速
        let s_m = (right.pressure - left.pressure
            + left.density * vn_left * (s_left - vn_left)
            - right.density * vn_right * (s_right - vn_right))
            / (left.density * (s_left - vn_left) - right.density * (s_right - vn_right));

        let flux = if s_left >= 0.0 {
            left.euler_flux(gas, n_dim, unit_normal)
        } else if s_right <= 0.0 {
            right.euler_flux(gas, n_dim, unit_normal)
        } else if s_m >= 0.0 {
            star_flux(gas, n_dim, left, vn_left, s_left, s_m, unit_normal)
        } else {
            star_flux(gas, n_dim, right, vn_right, s_right, s_m, unit_normal)
        };

        for k in 0..n_var {
            out.flux[k] = flux[k] * area;
        }
        out.lambda = 0.5 * (vn_left + vn_right).abs() * area
            + 0.5 * (a_left + a_right) * area;

        if need_jacobian {
            scalar_dissipation_jacobian(gas, n_dim, left, right, normal, out.lambda, out);
        }
    }
}

/// 星区通量 F* = F_k + S_k (U* − U_k)（k 侧，单位法向）
fn star_flux(
    gas: &GasModel,
    n_dim: usize,
    state: &FaceState,
    vn: f64,
    s_k: f64,
    s_m: f64,
    unit_normal: DVec3,
) -> VarVec {
    let ie = n_dim + 1;
    let f_k = state.euler_flux(gas, n_dim, unit_normal);
    let u_k = state.to_conservative(gas, n_dim);

    // 星区守恒状态（Toro 10.73）
    let factor = state.density * (s_k - vn) / (s_k - s_m);
    let mut u_star = var_zero();
    u_star[0] = factor;
    let v = state.velocity.to_array();
    let n = unit_normal.to_array();
    for d in 0..n_dim {
        u_star[1 + d] = factor * (v[d] + (s_m - vn) * n[d]);
    }
    u_star[ie] = factor
        * (u_k[ie] / state.density
            + (s_m - vn) * (s_m + state.pressure / (state.density * (s_k - vn))));

    let mut f = var_zero();
    for k in 0..=ie {
        f[k] = f_k[k] + s_k * (u_star[k] - u_k[k]);
    }
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemes::stencil_from_states;
    use af_config::GasConfig;

    fn gas() -> GasModel {
        GasModel::new(&GasConfig::default())
    }

    #[test]
    fn test_contact_preservation() {
        // 静止接触间断（等压、零速、密度跳）：质量与动量通量为压力项
        let gas = gas();
        let left = FaceState {
            density: 1.0,
            velocity: DVec3::ZERO,
            pressure: 1e5,
        };
        let right = FaceState {
            density: 0.125,
            velocity: DVec3::ZERO,
            pressure: 1e5,
        };
        let scheme = HllcScheme;
        let normal = DVec3::new(1.0, 0.0, 0.0);
        let stencil = stencil_from_states(left, right);
        let mut out = EdgeFlux::default();
        scheme.evaluate(&gas, 2, &stencil, normal, false, &mut out);
        // HLLC 精确保持静止接触：无质量/能量通量
        assert!(out.flux[0].abs() < 1e-10);
        assert!((out.flux[1] - 1e5).abs() < 1e-6);
        assert!(out.flux[3].abs() < 1e-10);
    }

    #[test]
    fn test_symmetry() {
        // 翻转左右与法向，通量反号
        let gas = gas();
        let left = FaceState {
            density: 1.2,
            velocity: DVec3::new(80.0, 15.0, 0.0),
            pressure: 1.1e5,
        };
        let right = FaceState {
            density: 0.9,
            velocity: DVec3::new(60.0, -10.0, 0.0),
            pressure: 0.9e5,
        };
        let scheme = HllcScheme;
        let normal = DVec3::new(0.6, 0.8, 0.0) * 1.7;

        let mut forward = EdgeFlux::default();
        scheme.evaluate(&gas, 2, &stencil_from_states(left, right), normal, false, &mut forward);
        let mut backward = EdgeFlux::default();
        scheme.evaluate(&gas, 2, &stencil_from_states(right, left), -normal, false, &mut backward);

        for k in 0..4 {
            assert!(
                (forward.flux[k] + backward.flux[k]).abs()
                    < 1e-9 * (forward.flux[k].abs() + 1.0),
                "分量 {k}"
            );
        }
    }
}
