// crates/af_physics/src/schemes/viscous.rs

//! 粘性通量
//!
//! 面梯度取两侧算术平均并沿边方向修正（Mathur-Murthy）：
//!
//! ```text
//! ∇φ_f ← ∇φ_f − ((∇φ_f · t̂) − (φ_j − φ_i)/L) t̂
//! ```
//!
//! 应力张量 τ = μ_tot(∇v + ∇vᵀ) − ⅔μ_tot(∇·v)I，
//! 热流 q = −k_tot ∇T，k_tot = cp(μ/Pr + μ_t/Pr_t)。
//!
//! Jacobian 取薄剪切层简化：只保留沿边方向的一阶差分项，
//! 动量行经 ∂v/∂U、能量行经 ∂T/∂U 线化。
//!
//! 返回的通量约定为"离开 i 单元"的粘性通量贡献，
//! 装配时从对流通量中减去。

use glam::DVec3;

use crate::types::{mat_zero, var_zero, EdgeFlux, FaceState, GasModel};

/// 粘性通量核输入
#[derive(Debug, Clone, Copy)]
pub struct ViscousContext {
    /// i 单元状态
    pub state_i: FaceState,
    /// j 单元状态
    pub state_j: FaceState,
    /// i 单元温度
    pub temperature_i: f64,
    /// j 单元温度
    pub temperature_j: f64,
    /// 面平均层流粘性
    pub mu_laminar: f64,
    /// 面平均涡粘
    pub mu_eddy: f64,
    /// 单元中心连线 x_j − x_i
    pub chord: DVec3,
}

/// 计算一条边的粘性通量与薄剪切层 Jacobian
///
/// `grad_i` / `grad_j`: 原始变量梯度切片，布局 [T, u, v, (w), p]。
pub fn evaluate_viscous(
    gas: &GasModel,
    n_dim: usize,
    ctx: &ViscousContext,
    grad_i: &[DVec3],
    grad_j: &[DVec3],
    normal: DVec3,
    need_jacobian: bool,
    out: &mut EdgeFlux,
) {
    let ie = n_dim + 1;
    let area = normal.length();
    let unit_normal = normal / area;
    let length = ctx.chord.length();
    let tangent = ctx.chord / length;

    let mu_total = ctx.mu_laminar + ctx.mu_eddy;
    let k_total = gas.thermal_conductivity(ctx.mu_laminar, ctx.mu_eddy);

    // 面平均梯度 + 边方向修正
    let mut grad_t = 0.5 * (grad_i[0] + grad_j[0]);
    let dt_dl = (ctx.temperature_j - ctx.temperature_i) / length;
    grad_t -= (grad_t.dot(tangent) - dt_dl) * tangent;

    let mut grad_v = [DVec3::ZERO; 3];
    for d in 0..n_dim {
        let mut g = 0.5 * (grad_i[1 + d] + grad_j[1 + d]);
        let dv_dl = (ctx.state_j.velocity[d] - ctx.state_i.velocity[d]) / length;
        g -= (g.dot(tangent) - dv_dl) * tangent;
        grad_v[d] = g;
    }

    // 应力张量 τ·n
    let divergence: f64 = (0..n_dim).map(|d| grad_v[d][d]).sum();
    let mut tau_n = DVec3::ZERO;
    for m in 0..n_dim {
        let mut sum = 0.0;
        for d in 0..n_dim {
            let mut tau_md = mu_total * (grad_v[m][d] + grad_v[d][m]);
            if m == d {
                tau_md -= 2.0 / 3.0 * mu_total * divergence;
            }
            sum += tau_md * unit_normal[d];
        }
        tau_n[m] = sum;
    }

    let velocity_face = 0.5 * (ctx.state_i.velocity + ctx.state_j.velocity);

    out.flux = var_zero();
    for m in 0..n_dim {
        out.flux[1 + m] = tau_n[m] * area;
    }
    out.flux[ie] = (tau_n.dot(velocity_face) + k_total * grad_t.dot(unit_normal)) * area;

    // 粘性谱半径（时间步用）
    let rho_face = 0.5 * (ctx.state_i.density + ctx.state_j.density);
    out.lambda = (mu_total / rho_face) * area;

    if need_jacobian {
        out.jac_i = mat_zero();
        out.jac_j = mat_zero();
        let coeff_v = mu_total * area / length;
        let coeff_t = k_total * area / length;

        // 动量行: F_m ≈ (μA/L)(v_j − v_i)
        //   ∂v/∂ρ = −v/ρ, ∂v/∂(ρv_k) = δ/ρ
        for m in 0..n_dim {
            out.jac_i[1 + m][0] = coeff_v * ctx.state_i.velocity[m] / ctx.state_i.density;
            out.jac_i[1 + m][1 + m] = -coeff_v / ctx.state_i.density;
            out.jac_j[1 + m][0] = -coeff_v * ctx.state_j.velocity[m] / ctx.state_j.density;
            out.jac_j[1 + m][1 + m] = coeff_v / ctx.state_j.density;
        }

        // 能量行: F_E ≈ (kA/L)(T_j − T_i)
        //   ∂T/∂ρ = (q² − E)/ (ρ cv), ∂T/∂(ρv) = −v/(ρ cv), ∂T/∂(ρE) = 1/(ρ cv)
        let cv = gas.cv();
        for (state, jac, sign) in [
            (&ctx.state_i, &mut out.jac_i, -1.0),
            (&ctx.state_j, &mut out.jac_j, 1.0),
        ] {
            let rho = state.density;
            let q2 = state.velocity.length_squared();
            let e_total = state.total_energy(gas);
            let factor = sign * coeff_t / (rho * cv);
            jac[ie][0] = factor * (q2 - e_total);
            for d in 0..n_dim {
                jac[ie][1 + d] = -factor * state.velocity[d];
            }
            jac[ie][ie] = factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_config::GasConfig;

    fn gas() -> GasModel {
        GasModel::new(&GasConfig::default())
    }

    fn uniform_ctx() -> ViscousContext {
        let state = FaceState {
            density: 1.0,
            velocity: DVec3::new(50.0, 0.0, 0.0),
            pressure: 1e5,
        };
        ViscousContext {
            state_i: state,
            state_j: state,
            temperature_i: 300.0,
            temperature_j: 300.0,
            mu_laminar: 1.8e-5,
            mu_eddy: 0.0,
            chord: DVec3::new(0.1, 0.0, 0.0),
        }
    }

    #[test]
    fn test_uniform_field_zero_flux() {
        let gas = gas();
        let ctx = uniform_ctx();
        let grads = [DVec3::ZERO; 4];
        let mut out = EdgeFlux::default();
        evaluate_viscous(
            &gas,
            2,
            &ctx,
            &grads,
            &grads,
            DVec3::new(1.0, 0.2, 0.0),
            false,
            &mut out,
        );
        for k in 0..4 {
            assert!(out.flux[k].abs() < 1e-14);
        }
    }

    /// 纯剪切 Couette 流：du/dy 已知，剪应力 τ_xy = μ du/dy
    #[test]
    fn test_couette_shear() {
        let gas = gas();
        let du_dy = 100.0;
        let mu = 2.0e-5;
        let mut ctx = uniform_ctx();
        ctx.mu_laminar = mu;
        ctx.chord = DVec3::new(0.0, 0.01, 0.0);
        ctx.state_j.velocity = DVec3::new(50.0 + du_dy * 0.01, 0.0, 0.0);

        let mut grads_i = [DVec3::ZERO; 4];
        grads_i[1] = DVec3::new(0.0, du_dy, 0.0);
        let grads_j = grads_i;

        // 面法向沿 y，面积 2.0
        let normal = DVec3::new(0.0, 2.0, 0.0);
        let mut out = EdgeFlux::default();
        evaluate_viscous(&gas, 2, &ctx, &grads_i, &grads_j, normal, false, &mut out);

        // τ_xy = μ du/dy; F_x = τ_xy * A
        let expected = mu * du_dy * 2.0;
        assert!((out.flux[1] - expected).abs() < 1e-12);
        // 能量通量包含 τ·v（v_face.x 约 50.5）
        let v_face = 0.5 * (ctx.state_i.velocity.x + ctx.state_j.velocity.x);
        assert!((out.flux[3] - expected * v_face).abs() < 1e-9);
    }

    /// 边方向修正：梯度平均与差分不一致时以差分为准
    #[test]
    fn test_edge_correction_overrides_average() {
        let gas = gas();
        let mut ctx = uniform_ctx();
        ctx.temperature_j = 310.0;
        ctx.chord = DVec3::new(0.1, 0.0, 0.0);
        // 平均梯度声称 dT/dx = 0，但沿边差分为 100 K/m
        let grads = [DVec3::ZERO; 4];
        let normal = DVec3::new(1.0, 0.0, 0.0);
        let mut out = EdgeFlux::default();
        evaluate_viscous(&gas, 2, &ctx, &grads, &grads, normal, false, &mut out);
        let k_total = gas.thermal_conductivity(ctx.mu_laminar, 0.0);
        let expected = k_total * (310.0 - 300.0) / 0.1;
        assert!((out.flux[3] - expected).abs() < 1e-9 * expected.abs());
    }

    #[test]
    fn test_tsl_jacobian_sign() {
        // 动量对角 Jacobian：dF/dv_i < 0（阻尼）
        let gas = gas();
        let ctx = uniform_ctx();
        let grads = [DVec3::ZERO; 4];
        let mut out = EdgeFlux::default();
        evaluate_viscous(
            &gas,
            2,
            &ctx,
            &grads,
            &grads,
            DVec3::new(1.0, 0.0, 0.0),
            true,
            &mut out,
        );
        assert!(out.jac_i[1][1] < 0.0);
        assert!(out.jac_j[1][1] > 0.0);
        assert!(out.jac_i[3][3] < 0.0);
    }
}
