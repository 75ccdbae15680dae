// crates/af_physics/src/turbulence/sa.rs

//! Spalart-Allmaras 一方程模型
//!
//! 工作变量 ν̃（运动量纲），标准版（无转捩项）：
//!
//! ```text
//! Dν̃/Dt = cb1 S̃ ν̃ − cw1 fw (ν̃/d)² + (1/σ)[∇·((ν+ν̃)∇ν̃) + cb2|∇ν̃|²]
//! ```
//!
//! 隐式对角只保留破坏项的负线化，保证对角占优。
//!
//! 参考: Spalart & Allmaras (1994), "A one-equation turbulence model
//! for aerodynamic flows". La Recherche Aérospatiale.

use crate::freestream::Freestream;
use crate::types::GasModel;

use super::{TurbCellContext, TurbSource, MAX_NTURB};

/// SA 模型常数
#[derive(Debug, Clone, Copy)]
pub struct SaModel {
    /// 生成项系数
    pub cb1: f64,
    /// 交叉扩散系数
    pub cb2: f64,
    /// 扩散 Prandtl 数 σ
    pub sigma: f64,
    /// Karman 常数
    pub kappa: f64,
    /// 破坏项系数 cw2
    pub cw2: f64,
    /// 破坏项系数 cw3
    pub cw3: f64,
    /// 粘性阻尼系数 cv1
    pub cv1: f64,
}

impl Default for SaModel {
    fn default() -> Self {
        Self {
            cb1: 0.1355,
            cb2: 0.622,
            sigma: 2.0 / 3.0,
            kappa: 0.41,
            cw2: 0.3,
            cw3: 2.0,
            cv1: 7.1,
        }
    }
}

impl SaModel {
    /// cw1 = cb1/κ² + (1+cb2)/σ
    #[inline]
    fn cw1(&self) -> f64 {
        self.cb1 / (self.kappa * self.kappa) + (1.0 + self.cb2) / self.sigma
    }

    /// 来流值 ν̃∞ = 3 ν∞
    pub fn freestream_values(&self, freestream: &Freestream, _gas: &GasModel) -> [f64; MAX_NTURB] {
        let nu = freestream.viscosity / freestream.state.density;
        [3.0 * nu, 0.0]
    }

    /// μ_t = ρ ν̃ fv1
    pub fn eddy_viscosity(&self, ctx: &TurbCellContext) -> f64 {
        let nu_tilde = ctx.vars[0];
        if nu_tilde <= 0.0 {
            return 0.0;
        }
        let nu = ctx.mu_laminar / ctx.density;
        let chi = nu_tilde / nu;
        let chi3 = chi * chi * chi;
        let fv1 = chi3 / (chi3 + self.cv1.powi(3));
        ctx.density * nu_tilde * fv1
    }

    /// 源项（生成 − 破坏 + 交叉扩散）
    pub fn source(&self, ctx: &TurbCellContext) -> TurbSource {
        let mut out = TurbSource::default();
        let nu_tilde = ctx.vars[0];
        if nu_tilde <= 0.0 {
            return out;
        }

        let d = ctx.wall_distance.max(1e-10);
        let nu = ctx.mu_laminar / ctx.density;
        let chi = nu_tilde / nu;
        let chi3 = chi * chi * chi;
        let fv1 = chi3 / (chi3 + self.cv1.powi(3));
        let fv2 = 1.0 - chi / (1.0 + chi * fv1);

        let omega = ctx.vorticity_magnitude();
        let kd2 = self.kappa * self.kappa * d * d;
        // S̃ 保持正值（Spalart 建议的下限）
        let s_tilde = (omega + nu_tilde / kd2 * fv2).max(0.3 * omega).max(1e-16);

        let production = self.cb1 * s_tilde * nu_tilde;

        let r = (nu_tilde / (s_tilde * kd2)).min(10.0);
        let g = r + self.cw2 * (r.powi(6) - r);
        let cw3_6 = self.cw3.powi(6);
        let fw = g * ((1.0 + cw3_6) / (g.powi(6) + cw3_6)).powf(1.0 / 6.0);
        let destruction = self.cw1() * fw * (nu_tilde / d) * (nu_tilde / d);

        let cross = self.cb2 / self.sigma * ctx.var_gradients[0].length_squared();

        out.value[0] = production - destruction + cross;
        // 对角线化：破坏项负贡献
        out.jacobian[0][0] = -2.0 * self.cw1() * fw * nu_tilde / (d * d);
        out
    }

    /// 面扩散系数 (ν + ν̃)/σ
    pub fn diffusivity(&self, nu_tilde_face: f64, mu_laminar: f64, density: f64) -> f64 {
        let nu = mu_laminar / density;
        (nu + nu_tilde_face.max(0.0)) / self.sigma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn context(nu_tilde: f64, omega: f64, distance: f64) -> TurbCellContext {
        let mut velocity_gradients = [DVec3::ZERO; 3];
        // 2D 剪切产生涡量 |dv/dx − du/dy| = omega
        velocity_gradients[0] = DVec3::new(0.0, -omega, 0.0);
        TurbCellContext {
            n_dim: 2,
            density: 1.2,
            mu_laminar: 1.8e-5,
            wall_distance: distance,
            velocity_gradients,
            vars: [nu_tilde, 0.0],
            var_gradients: [DVec3::ZERO; 2],
            f1: 1.0,
        }
    }

    #[test]
    fn test_eddy_viscosity_limits() {
        let model = SaModel::default();
        // χ -> 0: fv1 -> 0, μ_t -> 0
        let small = model.eddy_viscosity(&context(1e-12, 100.0, 0.1));
        assert!(small < 1e-12);
        // χ 大: fv1 -> 1, μ_t -> ρ ν̃
        let ctx = context(1.0, 100.0, 0.1);
        let big = model.eddy_viscosity(&ctx);
        assert!((big - ctx.density * 1.0).abs() / big < 0.01);
        // 负 ν̃ 被截为零
        assert_eq!(model.eddy_viscosity(&context(-1.0, 100.0, 0.1)), 0.0);
    }

    #[test]
    fn test_production_grows_with_vorticity() {
        let model = SaModel::default();
        let s1 = model.source(&context(1e-4, 10.0, 0.05));
        let s2 = model.source(&context(1e-4, 100.0, 0.05));
        assert!(s2.value[0] > s1.value[0]);
    }

    #[test]
    fn test_destruction_dominates_near_wall() {
        // 贴壁处 (ν̃/d)² 破坏项压过生成项，源为负
        let model = SaModel::default();
        let source = model.source(&context(1e-3, 1.0, 1e-4));
        assert!(source.value[0] < 0.0);
        assert!(source.jacobian[0][0] < 0.0);
    }

    #[test]
    fn test_diffusivity_positive() {
        let model = SaModel::default();
        let d = model.diffusivity(2e-5, 1.8e-5, 1.2);
        assert!(d > 0.0);
        // 负 ν̃ 下仍然为正（只剩分子粘性）
        let d_neg = model.diffusivity(-1e-5, 1.8e-5, 1.2);
        assert!(d_neg > 0.0);
    }
}
