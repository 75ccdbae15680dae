// crates/af_physics/src/schemes/jst.rs

//! JST 中心格式
//!
//! 中心通量加二阶/四阶混合人工耗散：
//!
//! ```text
//! F = ½(F_i + F_j) − ε₂ λ_f (U_j − U_i) + ε₄ λ_f (L_j − L_i)
//! ε₂ = k₂ · max(s_i, s_j)        ε₄ = max(0, k₄ − ε₂)
//! ```
//!
//! s 为压力传感器（无除数压力 Laplacian 归一化），
//! L 为守恒变量的无除数 Laplacian，λ_f 为面谱半径。
//! 使用单元中心状态，不做 MUSCL 重构。
//!
//! Jacobian 取一阶标量耗散近似。

use glam::DVec3;

use crate::types::{EdgeFlux, GasModel};

use super::{scalar_dissipation_jacobian, EdgeStencil};

/// JST 格式
#[derive(Debug, Clone, Copy)]
pub struct JstScheme {
    /// 二阶耗散系数 k2
    pub k2: f64,
    /// 四阶耗散系数 k4
    pub k4: f64,
}

impl JstScheme {
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
        let state_i = &stencil.state_i;
        let state_j = &stencil.state_j;

        // 面谱半径
        let vn = 0.5 * (state_i.velocity + state_j.velocity).dot(normal);
        let a = 0.5 * (state_i.sound_speed(gas) + state_j.sound_speed(gas));
        let lambda = vn.abs() + a * area;
        out.lambda = lambda;

        // 混合耗散系数
        let eps2 = self.k2 * stencil.sensor_i.max(stencil.sensor_j);
        let eps4 = (self.k4 - eps2).max(0.0);

        let f_i = state_i.euler_flux(gas, n_dim, normal);
        let f_j = state_j.euler_flux(gas, n_dim, normal);
        let u_i = state_i.to_conservative(gas, n_dim);
        let u_j = state_j.to_conservative(gas, n_dim);

        for k in 0..n_var {
            let second = eps2 * (u_j[k] - u_i[k]);
            let fourth = eps4 * (stencil.lapl_j[k] - stencil.lapl_i[k]);
            out.flux[k] = 0.5 * (f_i[k] + f_j[k]) - lambda * (second - fourth);
        }

        if need_jacobian {
            scalar_dissipation_jacobian(gas, n_dim, state_i, state_j, normal, lambda, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemes::stencil_from_states;
    use crate::types::FaceState;
    use af_config::GasConfig;

    #[test]
    fn test_uniform_no_dissipation() {
        // 均匀流：传感器与 Laplacian 均为零，通量等于解析通量
        let gas = GasModel::new(&GasConfig::default());
        let state = FaceState {
            density: 1.1,
            velocity: DVec3::new(60.0, -20.0, 0.0),
            pressure: 9.5e4,
        };
        let scheme = JstScheme { k2: 0.5, k4: 0.02 };
        let normal = DVec3::new(0.0, 1.0, 0.0) * 3.0;
        let stencil = stencil_from_states(state, state);
        let mut out = EdgeFlux::default();
        scheme.evaluate(&gas, 2, &stencil, normal, false, &mut out);
        let exact = state.euler_flux(&gas, 2, normal);
        for k in 0..4 {
            assert!((out.flux[k] - exact[k]).abs() < 1e-9 * (exact[k].abs() + 1.0));
        }
    }

    #[test]
    fn test_sensor_activates_second_difference() {
        // 强压力传感器下二阶耗散压制四阶项
        let gas = GasModel::new(&GasConfig::default());
        let left = FaceState {
            density: 1.0,
            velocity: DVec3::new(50.0, 0.0, 0.0),
            pressure: 2.0e5,
        };
        let right = FaceState {
            density: 0.5,
            velocity: DVec3::new(50.0, 0.0, 0.0),
            pressure: 1.0e5,
        };
        let scheme = JstScheme { k2: 0.5, k4: 0.02 };
        let normal = DVec3::new(1.0, 0.0, 0.0);
        let mut stencil = stencil_from_states(left, right);
        stencil.sensor_i = 0.5;
        stencil.sensor_j = 0.3;
        let mut out = EdgeFlux::default();
        scheme.evaluate(&gas, 2, &stencil, normal, false, &mut out);

        // 耗散项对密度分量的贡献为 -λ ε₂ Δρ，Δρ < 0 故通量增大
        let central = 0.5
            * (left.euler_flux(&gas, 2, normal)[0] + right.euler_flux(&gas, 2, normal)[0]);
        assert!(out.flux[0] > central);
    }
}
