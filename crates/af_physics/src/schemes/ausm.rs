// crates/af_physics/src/schemes/ausm.rs

//! AUSM+-up 通量分裂
//!
//! Liou (2006) 的全速域版本：四阶马赫数/压力分裂多项式，
//! 加低速压力耗散 (Mp) 与速度耗散 (Pu) 修正项。
//!
//! Jacobian 取一阶标量耗散近似（面谱半径）。

use glam::DVec3;

use crate::types::{EdgeFlux, GasModel};

use super::{scalar_dissipation_jacobian, EdgeStencil};

/// AUSM+-up 格式
#[derive(Debug, Clone, Copy)]
pub struct AusmScheme {
    /// 压力耗散系数 Kp
    pub kp: f64,
    /// 速度耗散系数 Ku
    pub ku: f64,
    /// 低速缩放参数 sigma
    pub sigma: f64,
}

impl Default for AusmScheme {
    fn default() -> Self {
        Self {
            kp: 0.25,
            ku: 0.75,
            sigma: 1.0,
        }
    }
}

/// 四阶马赫数分裂 M⁺₄ / M⁻₄（β = 1/8）
///
/// M±₂ = ±¼(M ± 1)²；亚声速段
/// M⁺₄ = M⁺₂(1 − 16β M⁻₂)，M⁻₄ = M⁻₂(1 + 16β M⁺₂)。
#[inline]
fn mach_split(m: f64, positive: bool) -> f64 {
    const BETA: f64 = 1.0 / 8.0;
    if m.abs() >= 1.0 {
        return if positive {
            0.5 * (m + m.abs())
        } else {
            0.5 * (m - m.abs())
        };
    }
    let m2_plus = 0.25 * (m + 1.0) * (m + 1.0);
    let m2_minus = -0.25 * (m - 1.0) * (m - 1.0);
    if positive {
        m2_plus * (1.0 - 16.0 * BETA * m2_minus)
    } else {
        m2_minus * (1.0 + 16.0 * BETA * m2_plus)
    }
}

/// 五阶压力分裂 P⁺₅ / P⁻₅（α = 3/16）
#[inline]
fn pressure_split(m: f64, positive: bool) -> f64 {
    const ALPHA: f64 = 3.0 / 16.0;
    let sign = if positive { 1.0 } else { -1.0 };
    if m.abs() >= 1.0 {
        0.5 * (1.0 + sign * m.signum())
    } else {
        0.25 * (m + sign).powi(2) * (2.0 - sign * m)
            + sign * ALPHA * m * (m * m - 1.0).powi(2)
    }
}

impl AusmScheme {
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
        let area = normal.length();
        let unit_normal = normal / area;
        let left = &stencil.left;
        let right = &stencil.right;

        let vn_left = left.velocity.dot(unit_normal);
        let vn_right = right.velocity.dot(unit_normal);
        let a_half = 0.5 * (left.sound_speed(gas) + right.sound_speed(gas));
        let rho_half = 0.5 * (left.density + right.density);

        let m_left = vn_left / a_half;
        let m_right = vn_right / a_half;
        let m_bar2 = 0.5 * (vn_left * vn_left + vn_right * vn_right) / (a_half * a_half);

        // 低速缩放因子
        let m_o2 = m_bar2.min(1.0).max(1e-8);
        let m_o = m_o2.sqrt();
        let fa = m_o * (2.0 - m_o);

        // 界面马赫数 + 压力耗散项 Mp
        let mp = -self.kp / fa * (1.0 - self.sigma * m_bar2).max(0.0)
            * (right.pressure - left.pressure)
            / (rho_half * a_half * a_half);
        let m_half = mach_split(m_left, true) + mach_split(m_right, false) + mp;

        // 界面压力 + 速度耗散项 Pu
        let p_plus = pressure_split(m_left, true);
        let p_minus = pressure_split(m_right, false);
        let pu = -self.ku * p_plus * p_minus * 2.0 * rho_half * fa * a_half
            * (vn_right - vn_left);
        let p_half = p_plus * left.pressure + p_minus * right.pressure + pu;

        // 质量通量与迎风状态
        let mass = a_half
            * if m_half > 0.0 {
                m_half * left.density
            } else {
                m_half * right.density
            };

        let upwind = if mass > 0.0 { left } else { right };
        let psi_h = upwind.total_enthalpy(gas);
        let v = upwind.velocity.to_array();
        let n = unit_normal.to_array();

        out.flux[0] = mass * area;
        for d in 0..n_dim {
            out.flux[1 + d] = (mass * v[d] + p_half * n[d]) * area;
        }
        out.flux[n_dim + 1] = mass * psi_h * area;

        out.lambda = 0.5 * (vn_left + vn_right).abs() * area + a_half * area;

        if need_jacobian {
            scalar_dissipation_jacobian(gas, n_dim, left, right, normal, out.lambda, out);
        }
    }
}
