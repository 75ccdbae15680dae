// crates/af_physics/src/turbulence/sst.rs

//! Menter SST k-ω 两方程模型
//!
//! 变量 (k, ω)，常数集经 F1 在 k-ω（近壁）与 k-ε（外区）之间混合。
//! 生成项按 Menter 限制 min(P_k, 10 β* ρ k ω)，
//! 涡粘 μ_t = ρ a1 k / max(a1 ω, S F2)。
//!
//! F1 / F2 由 (k, ω, 壁面距离, ρ, μ) 在每个湍流子迭代重算并缓存。
//!
//! 参考: Menter (1994), "Two-equation eddy-viscosity turbulence models
//! for engineering applications". AIAA Journal 32(8).

use crate::freestream::Freestream;
use crate::types::GasModel;

use super::{TurbCellContext, TurbSource, MAX_NTURB};

/// SST 模型常数
#[derive(Debug, Clone, Copy)]
pub struct SstModel {
    /// β* （k 方程破坏）
    pub beta_star: f64,
    /// 内区常数集 (σk1, σω1, β1)
    pub sigma_k1: f64,
    /// σω1
    pub sigma_w1: f64,
    /// β1
    pub beta_1: f64,
    /// 外区常数集 (σk2, σω2, β2)
    pub sigma_k2: f64,
    /// σω2
    pub sigma_w2: f64,
    /// β2
    pub beta_2: f64,
    /// 结构参数 a1
    pub a1: f64,
    /// Karman 常数
    pub kappa: f64,
    /// 来流湍流强度
    pub intensity: f64,
    /// 来流涡粘比 μ_t/μ
    pub viscosity_ratio: f64,
}

impl Default for SstModel {
    fn default() -> Self {
        Self {
            beta_star: 0.09,
            sigma_k1: 0.85,
            sigma_w1: 0.5,
            beta_1: 0.075,
            sigma_k2: 1.0,
            sigma_w2: 0.856,
            beta_2: 0.0828,
            a1: 0.31,
            kappa: 0.41,
            intensity: 0.05,
            viscosity_ratio: 10.0,
        }
    }
}

impl SstModel {
    /// γ = β/β* − σω κ²/√β*（按集合）
    fn gamma(&self, f1: f64) -> f64 {
        let gamma1 = self.beta_1 / self.beta_star
            - self.sigma_w1 * self.kappa * self.kappa / self.beta_star.sqrt();
        let gamma2 = self.beta_2 / self.beta_star
            - self.sigma_w2 * self.kappa * self.kappa / self.beta_star.sqrt();
        f1 * gamma1 + (1.0 - f1) * gamma2
    }

    /// 来流值：k = 3/2 (I·V)²，ω = ρk/(μ · ratio)
    pub fn freestream_values(&self, freestream: &Freestream, _gas: &GasModel) -> [f64; MAX_NTURB] {
        let k = 1.5 * (self.intensity * freestream.speed).powi(2);
        let omega = freestream.state.density * k / (freestream.viscosity * self.viscosity_ratio);
        [k, omega]
    }

    /// μ_t = ρ a1 k / max(a1 ω, S F2)
    pub fn eddy_viscosity(&self, ctx: &TurbCellContext, f2: f64) -> f64 {
        let k = ctx.vars[0].max(0.0);
        let omega = ctx.vars[1].max(1e-20);
        let strain = ctx.strain_magnitude();
        ctx.density * self.a1 * k / (self.a1 * omega).max(strain * f2)
    }

    /// 混合函数 (F1, F2)
    pub fn blending(&self, ctx: &TurbCellContext) -> (f64, f64) {
        let k = ctx.vars[0].max(1e-20);
        let omega = ctx.vars[1].max(1e-20);
        let d = ctx.wall_distance.max(1e-10);
        let nu = ctx.mu_laminar / ctx.density;

        let sqrt_k = k.sqrt();
        let term_wall = sqrt_k / (self.beta_star * omega * d);
        let term_visc = 500.0 * nu / (d * d * omega);

        let cd_kw = (2.0 * ctx.density * self.sigma_w2 / omega
            * ctx.var_gradients[0].dot(ctx.var_gradients[1]))
        .max(1e-10);
        let term_cross = 4.0 * ctx.density * self.sigma_w2 * k / (cd_kw * d * d);

        let arg1 = term_wall.max(term_visc).min(term_cross);
        let arg2 = (2.0 * term_wall).max(term_visc);
        (arg1.powi(4).tanh(), (arg2 * arg2).tanh())
    }

    /// 源项（单位质量形式）：
    /// k: P_k/ρ − β* k ω；ω: γ S² − β ω² + 交叉扩散
    pub fn source(&self, ctx: &TurbCellContext) -> TurbSource {
        let mut out = TurbSource::default();
        let k = ctx.vars[0].max(0.0);
        let omega = ctx.vars[1].max(1e-20);
        let f1 = ctx.f1;

        let strain = ctx.strain_magnitude();
        let mu_t = self.eddy_viscosity(ctx, 1.0);

        // k 方程：Menter 生成限制
        let production_k =
            (mu_t * strain * strain).min(10.0 * self.beta_star * ctx.density * k * omega);
        let destruction_k = self.beta_star * k * omega;
        out.value[0] = production_k / ctx.density - destruction_k;

        // ω 方程
        let gamma = self.gamma(f1);
        let beta = f1 * self.beta_1 + (1.0 - f1) * self.beta_2;
        let production_w = gamma * strain * strain;
        let destruction_w = beta * omega * omega;
        let cross = (1.0 - f1) * 2.0 * self.sigma_w2 / omega
            * ctx.var_gradients[0].dot(ctx.var_gradients[1]);
        out.value[1] = production_w - destruction_w + cross;

        // 对角线化（破坏项）
        out.jacobian[0][0] = -self.beta_star * omega;
        out.jacobian[1][1] = -2.0 * beta * omega;
        out
    }

    /// 面扩散系数 (μ + σ μ_t)/ρ
    pub fn diffusivity(
        &self,
        equation: usize,
        mu_laminar: f64,
        mu_eddy: f64,
        density: f64,
        f1: f64,
    ) -> f64 {
        let sigma = if equation == 0 {
            f1 * self.sigma_k1 + (1.0 - f1) * self.sigma_k2
        } else {
            f1 * self.sigma_w1 + (1.0 - f1) * self.sigma_w2
        };
        (mu_laminar + sigma * mu_eddy) / density
    }

    /// 壁面值：k = 0，ω = 60 ν / (β1 Δd²)（Menter 壁面条件）
    pub fn wall_values(&self, mu_laminar: f64, density: f64, wall_spacing: f64) -> [f64; MAX_NTURB] {
        let nu = mu_laminar / density;
        let d1 = wall_spacing.max(1e-10);
        [0.0, 60.0 * nu / (self.beta_1 * d1 * d1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn context(k: f64, omega: f64, distance: f64, strain: f64) -> TurbCellContext {
        let mut velocity_gradients = [DVec3::ZERO; 3];
        // 纯剪切 du/dy = strain 对应 S = strain
        velocity_gradients[0] = DVec3::new(0.0, strain, 0.0);
        TurbCellContext {
            n_dim: 2,
            density: 1.2,
            mu_laminar: 1.8e-5,
            wall_distance: distance,
            velocity_gradients,
            vars: [k, omega],
            var_gradients: [DVec3::ZERO; 2],
            f1: 1.0,
        }
    }

    #[test]
    fn test_blending_bounds() {
        let model = SstModel::default();
        for &(k, w, d) in &[(1.0, 1e3, 1e-4), (0.1, 1e2, 0.5), (10.0, 1e5, 2.0)] {
            let (f1, f2) = model.blending(&context(k, w, d, 100.0));
            assert!((0.0..=1.0).contains(&f1));
            assert!((0.0..=1.0).contains(&f2));
        }
    }

    #[test]
    fn test_blending_near_wall_is_one() {
        // 贴壁极限 F1 -> 1（k-ω 分支）
        let model = SstModel::default();
        let (f1, f2) = model.blending(&context(1e-6, 1e6, 1e-6, 10.0));
        assert!(f1 > 0.99);
        assert!(f2 > 0.99);
    }

    #[test]
    fn test_eddy_viscosity_strain_limiter() {
        let model = SstModel::default();
        // 小应变：μ_t = ρ k/ω
        let low = model.eddy_viscosity(&context(1.0, 100.0, 0.1, 1.0), 1.0);
        assert!((low - 1.2 * 1.0 / 100.0).abs() / low < 1e-10);
        // 大应变触发 Bradshaw 限制：μ_t < ρ k/ω
        let high = model.eddy_viscosity(&context(1.0, 100.0, 0.1, 1e5), 1.0);
        assert!(high < low);
    }

    #[test]
    fn test_source_jacobian_negative() {
        let model = SstModel::default();
        let source = model.source(&context(0.5, 200.0, 0.1, 50.0));
        assert!(source.jacobian[0][0] < 0.0);
        assert!(source.jacobian[1][1] < 0.0);
    }

    #[test]
    fn test_equilibrium_sign() {
        // 无应变：k 源为纯破坏（负）
        let model = SstModel::default();
        let source = model.source(&context(1.0, 100.0, 0.5, 0.0));
        assert!(source.value[0] < 0.0);
        assert!(source.value[1] < 0.0);
    }

    #[test]
    fn test_wall_omega_scales_inverse_square() {
        let model = SstModel::default();
        let w1 = model.wall_values(1.8e-5, 1.2, 1e-3)[1];
        let w2 = model.wall_values(1.8e-5, 1.2, 2e-3)[1];
        assert!((w1 / w2 - 4.0).abs() < 1e-10);
    }
}
