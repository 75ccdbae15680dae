// crates/af_physics/src/schemes/roe.rs

//! Roe 近似黎曼求解器
//!
//! F = ½(F_L + F_R) − ½|Ã|(U_R − U_L)
//!
//! |Ã| 按特征波分解作用在 ΔU 上，Roe 平均保证 ΔF = Ã ΔU。
//! 特征值用 Harten-Hyman 熵修正（系数可配，默认 0.1）。
//! 可选 Weiss-Smith 低马赫修正，只作用于声学特征值的耗散。
//!
//! Jacobian 取冻结耗散近似：中心部分精确线化，|Ã| 视为常数，
//! 其矩阵列由耗散线性映射作用在单位向量上得到。

use glam::DVec3;

use crate::types::{
    euler_flux_jacobian, var_zero, EdgeFlux, FaceState, GasModel, VarVec,
};

use super::EdgeStencil;

/// Roe 格式
#[derive(Debug, Clone, Copy)]
pub struct RoeScheme {
    /// Harten-Hyman 熵修正系数
    pub entropy_fix_coeff: f64,
    /// 是否启用低马赫修正
    pub low_mach: bool,
    /// 低马赫截断马赫数
    pub low_mach_cutoff: f64,
}

impl Default for RoeScheme {
    fn default() -> Self {
        Self {
            entropy_fix_coeff: 0.1,
            low_mach: false,
            low_mach_cutoff: 0.0,
        }
    }
}

/// 冻结的 Roe 平均状态
struct RoeAverage {
    density: f64,
    velocity: DVec3,
    enthalpy: f64,
    sound_speed: f64,
    vn: f64,
    /// 熵修正后的特征值绝对值 |vn - a|, |vn|, |vn + a|
    abs_lambda: [f64; 3],
}

impl RoeScheme {
    /// 计算通量与（可选）冻结耗散 Jacobian
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

        let avg = self.average(gas, left, right, unit_normal);

        // 中心部分
        let f_left = left.euler_flux(gas, n_dim, normal);
        let f_right = right.euler_flux(gas, n_dim, normal);

        // 耗散部分作用在守恒差上
        let u_left = left.to_conservative(gas, n_dim);
        let u_right = right.to_conservative(gas, n_dim);
        let mut du = var_zero();
        for k in 0..n_var {
            du[k] = u_right[k] - u_left[k];
        }
        let dissipation = dissipation_apply(gas, n_dim, &avg, unit_normal, &du);

        for k in 0..n_var {
            out.flux[k] = 0.5 * (f_left[k] + f_right[k]) - 0.5 * area * dissipation[k];
        }
        out.lambda = avg.vn.abs() * area + avg.sound_speed * area;

        if need_jacobian {
            out.jac_i = euler_flux_jacobian(left, gas, n_dim, normal);
            out.jac_j = euler_flux_jacobian(right, gas, n_dim, normal);
            // |Ã| 的列：耗散映射作用于单位向量
            for col in 0..n_var {
                let mut e = var_zero();
                e[col] = 1.0;
                let d_col = dissipation_apply(gas, n_dim, &avg, unit_normal, &e);
                for row in 0..n_var {
                    out.jac_i[row][col] = 0.5 * out.jac_i[row][col] + 0.5 * area * d_col[row];
                    out.jac_j[row][col] = 0.5 * out.jac_j[row][col] - 0.5 * area * d_col[row];
                }
            }
        }
    }

    /// Roe 平均 + 熵修正特征值
    fn average(
        &self,
        gas: &GasModel,
        left: &FaceState,
        right: &FaceState,
        unit_normal: DVec3,
    ) -> RoeAverage {
        let rl = left.density.sqrt();
        let rr = right.density.sqrt();
        let w = rl / (rl + rr);

        let density = rl * rr;
        let velocity = w * left.velocity + (1.0 - w) * right.velocity;
        let enthalpy = w * left.total_enthalpy(gas) + (1.0 - w) * right.total_enthalpy(gas);
        let q2 = velocity.length_squared();
        let sound_speed = ((gas.gamma - 1.0) * (enthalpy - 0.5 * q2)).max(1e-300).sqrt();
        let vn = velocity.dot(unit_normal);

        // 声学特征值（可选低马赫缩放）
        let (lambda_minus, lambda_plus) = if self.low_mach {
            let mach = (q2.sqrt() / sound_speed).max(self.low_mach_cutoff).min(1.0);
            let beta2 = mach * mach;
            let vn_prime = 0.5 * (1.0 + beta2) * vn;
            let a_prime =
                0.5 * (((1.0 - beta2) * vn).powi(2) + 4.0 * beta2 * sound_speed * sound_speed).sqrt();
            (vn_prime - a_prime, vn_prime + a_prime)
        } else {
            (vn - sound_speed, vn + sound_speed)
        };

        let delta = self.entropy_fix_coeff * (vn.abs() + sound_speed);
        let fix = |lambda: f64| -> f64 {
            let al = lambda.abs();
            if al < delta && delta > 0.0 {
                (lambda * lambda + delta * delta) / (2.0 * delta)
            } else {
                al
            }
        };

        RoeAverage {
            density,
            velocity,
            enthalpy,
            sound_speed,
            vn,
            abs_lambda: [fix(lambda_minus), fix(vn), fix(lambda_plus)],
        }
    }
}

/// 耗散线性映射 |Ã| du（Roe 平均冻结）
///
/// du 的原始增量按 Roe 线化关系由守恒增量导出，
/// 保证 ΔF = Ã ΔU 的 Roe 性质。
fn dissipation_apply(
    gas: &GasModel,
    n_dim: usize,
    avg: &RoeAverage,
    unit_normal: DVec3,
    du: &VarVec,
) -> VarVec {
    let g1 = gas.gamma - 1.0;
    let a = avg.sound_speed;
    let a2 = a * a;
    let rho = avg.density;
    let u = avg.velocity;
    let q2 = u.length_squared();
    let ie = n_dim + 1;

    // 守恒增量 -> 原始增量（在 Roe 状态线化）
    let d_rho = du[0];
    let mut d_mom = DVec3::ZERO;
    for d in 0..n_dim {
        d_mom[d] = du[1 + d];
    }
    let d_vel = (d_mom - u * d_rho) / rho;
    let d_p = g1 * (du[ie] - u.dot(d_mom) + 0.5 * q2 * d_rho);
    let d_vn = d_vel.dot(unit_normal);

    // 波强度
    let alpha_minus = (d_p - rho * a * d_vn) / (2.0 * a2);
    let alpha_contact = d_rho - d_p / a2;
    let alpha_plus = (d_p + rho * a * d_vn) / (2.0 * a2);
    let shear = d_vel - d_vn * unit_normal;

    let [l_minus, l_contact, l_plus] = avg.abs_lambda;
    let vn = avg.vn;

    let mut out = var_zero();
    // 声学波 K∓ = [1, u ∓ a n, H ∓ a vn]
    out[0] += l_minus * alpha_minus + l_plus * alpha_plus;
    out[ie] += l_minus * alpha_minus * (avg.enthalpy - a * vn)
        + l_plus * alpha_plus * (avg.enthalpy + a * vn);
    // 熵波 K = [1, u, q²/2] 与剪切波 [0, Δv − Δvn n, u·Δv − vn Δvn]
    out[0] += l_contact * alpha_contact;
    out[ie] += l_contact * (alpha_contact * 0.5 * q2 + rho * u.dot(shear));
    for d in 0..n_dim {
        out[1 + d] += l_minus * alpha_minus * (u[d] - a * unit_normal[d])
            + l_plus * alpha_plus * (u[d] + a * unit_normal[d])
            + l_contact * (alpha_contact * u[d] + rho * shear[d]);
    }
    out
}
