// crates/af_physics/src/turbulence/mod.rs

//! 湍流闭合模型
//!
//! 一方程 Spalart-Allmaras 与两方程 Menter SST k-ω。
//! 两个模型共享同一套单元上下文与源项接口，
//! 湍流求解器（engine::turb）据此装配残差。
//!
//! 平均流与湍流每个子迭代单向耦合：平均流用上一迭代的 μ_t，
//! 湍流方程看到当前平均流原始变量。

pub mod sa;
pub mod sst;

use glam::DVec3;

use af_config::TurbulenceModelKind;

use crate::freestream::Freestream;
use crate::types::GasModel;

pub use sa::SaModel;
pub use sst::SstModel;

/// 湍流变量个数上限
pub const MAX_NTURB: usize = 2;

/// 源项计算的单元上下文
#[derive(Debug, Clone, Copy)]
pub struct TurbCellContext {
    /// 空间维数
    pub n_dim: usize,
    /// 密度
    pub density: f64,
    /// 层流动力粘性
    pub mu_laminar: f64,
    /// 壁面距离
    pub wall_distance: f64,
    /// 速度分量梯度 ∇u, ∇v, (∇w)
    pub velocity_gradients: [DVec3; 3],
    /// 湍流变量
    pub vars: [f64; MAX_NTURB],
    /// 湍流变量梯度
    pub var_gradients: [DVec3; MAX_NTURB],
    /// SST 混合函数 F1（SA 不用）
    pub f1: f64,
}

impl TurbCellContext {
    /// 涡量模 |∇×v|
    pub fn vorticity_magnitude(&self) -> f64 {
        let g = &self.velocity_gradients;
        if self.n_dim == 2 {
            (g[1].x - g[0].y).abs()
        } else {
            let wx = g[2].y - g[1].z;
            let wy = g[0].z - g[2].x;
            let wz = g[1].x - g[0].y;
            (wx * wx + wy * wy + wz * wz).sqrt()
        }
    }

    /// 应变率模 sqrt(2 S_ij S_ij)
    pub fn strain_magnitude(&self) -> f64 {
        let g = &self.velocity_gradients;
        let mut sum = 0.0;
        for i in 0..self.n_dim {
            for j in 0..self.n_dim {
                let s_ij = 0.5 * (g[i][j] + g[j][i]);
                sum += 2.0 * s_ij * s_ij;
            }
        }
        sum.sqrt()
    }
}

/// 源项输出：值（单位体积）与对角 Jacobian ∂S/∂φ
#[derive(Debug, Clone, Copy, Default)]
pub struct TurbSource {
    /// 源项
    pub value: [f64; MAX_NTURB],
    /// 对角线化（只保留使系统对角占优的负贡献）
    pub jacobian: [[f64; MAX_NTURB]; MAX_NTURB],
}

/// 湍流模型（装配期单次分派）
#[derive(Debug, Clone, Copy)]
pub enum TurbulenceModel {
    /// Spalart-Allmaras
    Sa(SaModel),
    /// Menter SST k-ω
    Sst(SstModel),
}

impl TurbulenceModel {
    /// 按配置构造；`None` 返回 None
    pub fn from_kind(kind: TurbulenceModelKind) -> Option<Self> {
        match kind {
            TurbulenceModelKind::None => None,
            TurbulenceModelKind::Sa => Some(TurbulenceModel::Sa(SaModel::default())),
            TurbulenceModelKind::Sst => Some(TurbulenceModel::Sst(SstModel::default())),
        }
    }

    /// 湍流变量个数
    pub fn n_var(&self) -> usize {
        match self {
            TurbulenceModel::Sa(_) => 1,
            TurbulenceModel::Sst(_) => 2,
        }
    }

    /// 来流湍流变量
    pub fn freestream_values(&self, freestream: &Freestream, gas: &GasModel) -> [f64; MAX_NTURB] {
        match self {
            TurbulenceModel::Sa(m) => m.freestream_values(freestream, gas),
            TurbulenceModel::Sst(m) => m.freestream_values(freestream, gas),
        }
    }

    /// 涡粘 μ_t
    pub fn eddy_viscosity(&self, ctx: &TurbCellContext, f2: f64) -> f64 {
        match self {
            TurbulenceModel::Sa(m) => m.eddy_viscosity(ctx),
            TurbulenceModel::Sst(m) => m.eddy_viscosity(ctx, f2),
        }
    }

    /// 源项
    pub fn source(&self, ctx: &TurbCellContext) -> TurbSource {
        match self {
            TurbulenceModel::Sa(m) => m.source(ctx),
            TurbulenceModel::Sst(m) => m.source(ctx),
        }
    }

    /// 第 k 个方程的面有效扩散系数（运动量纲 m²/s）
    #[allow(clippy::too_many_arguments)]
    pub fn diffusivity(
        &self,
        k: usize,
        var_face: f64,
        mu_laminar: f64,
        mu_eddy: f64,
        density: f64,
        f1: f64,
    ) -> f64 {
        match self {
            TurbulenceModel::Sa(m) => m.diffusivity(var_face, mu_laminar, density),
            TurbulenceModel::Sst(m) => m.diffusivity(k, mu_laminar, mu_eddy, density, f1),
        }
    }

    /// 壁面上湍流变量的强施加值
    ///
    /// `wall_spacing` 为壁面节点到最近邻的距离（SST ω 壁值需要）。
    pub fn wall_values(
        &self,
        mu_laminar: f64,
        density: f64,
        wall_spacing: f64,
    ) -> [f64; MAX_NTURB] {
        match self {
            TurbulenceModel::Sa(_) => [0.0, 0.0],
            TurbulenceModel::Sst(m) => m.wall_values(mu_laminar, density, wall_spacing),
        }
    }
}
