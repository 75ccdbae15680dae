// crates/af_physics/src/schemes/mod.rs

//! 对流与粘性通量核
//!
//! 所有核都是模板局部的纯函数：输入一条边的左右状态与法向，
//! 输出通量向量、两侧近似 Jacobian 块与面谱半径。
//! 方程组集合封闭（Roe / JST / AUSM+-up / HLLC），
//! 分派用枚举在装配期解决一次，边循环内单态。
//!
//! # Jacobian 近似
//!
//! - Roe: 冻结耗散（中心部分精确线化，|Ã| 视为常数）
//! - JST / AUSM / HLLC: 一阶标量耗散 J = A/2 ± λ/2·I
//! - 粘性: 薄剪切层简化（viscous 模块）
//!
//! 这些近似给出谱正确的左端阵，避免精确 Roe Jacobian 的代价。

pub mod ausm;
pub mod hllc;
pub mod jst;
pub mod roe;
pub mod viscous;

use glam::DVec3;

use af_config::NumericsConfig;

use crate::types::{
    euler_flux_jacobian, EdgeFlux, FaceState, GasModel, VarVec,
};

pub use ausm::AusmScheme;
pub use hllc::HllcScheme;
pub use jst::JstScheme;
pub use roe::RoeScheme;
pub use viscous::{evaluate_viscous, ViscousContext};

/// 一条边上的通量模板输入
#[derive(Debug, Clone, Copy)]
pub struct EdgeStencil {
    /// 左侧（i 侧）重构状态
    pub left: FaceState,
    /// 右侧（j 侧）重构状态
    pub right: FaceState,
    /// i 单元中心状态（JST 中心通量与耗散用）
    pub state_i: FaceState,
    /// j 单元中心状态
    pub state_j: FaceState,
    /// i 单元无除数 Laplacian
    pub lapl_i: VarVec,
    /// j 单元无除数 Laplacian
    pub lapl_j: VarVec,
    /// i 单元压力传感器
    pub sensor_i: f64,
    /// j 单元压力传感器
    pub sensor_j: f64,
}

/// 对流通量格式（装配期单次分派）
#[derive(Debug, Clone)]
pub enum ConvectiveFluxScheme {
    /// Roe 近似黎曼求解器
    Roe(RoeScheme),
    /// JST 中心格式
    Jst(JstScheme),
    /// AUSM+-up
    Ausm(AusmScheme),
    /// HLLC
    Hllc(HllcScheme),
}

impl ConvectiveFluxScheme {
    /// 按配置构造（低马赫截断按来流马赫数解析）
    pub fn from_config(numerics: &NumericsConfig, freestream_mach: f64) -> Self {
        match numerics.convective_scheme {
            af_config::ConvectiveSchemeKind::Roe => {
                let cutoff = if numerics.low_mach_cutoff > 0.0 {
                    numerics.low_mach_cutoff
                } else {
                    3.0 * freestream_mach
                };
                ConvectiveFluxScheme::Roe(RoeScheme {
                    entropy_fix_coeff: numerics.entropy_fix_coeff,
                    low_mach: numerics.roe_low_mach,
                    low_mach_cutoff: cutoff,
                })
            }
            af_config::ConvectiveSchemeKind::Jst => ConvectiveFluxScheme::Jst(JstScheme {
                k2: numerics.jst_k2,
                k4: numerics.jst_k4,
            }),
            af_config::ConvectiveSchemeKind::Ausm => ConvectiveFluxScheme::Ausm(AusmScheme::default()),
            af_config::ConvectiveSchemeKind::Hllc => ConvectiveFluxScheme::Hllc(HllcScheme),
        }
    }

    /// 计算一条边的对流通量
    ///
    /// `normal` 为面积加权法向（i -> j）。
    pub fn evaluate(
        &self,
        gas: &GasModel,
        n_dim: usize,
        stencil: &EdgeStencil,
        normal: DVec3,
        need_jacobian: bool,
        out: &mut EdgeFlux,
    ) {
        match self {
            ConvectiveFluxScheme::Roe(s) => s.evaluate(gas, n_dim, stencil, normal, need_jacobian, out),
            ConvectiveFluxScheme::Jst(s) => s.evaluate(gas, n_dim, stencil, normal, need_jacobian, out),
            ConvectiveFluxScheme::Ausm(s) => s.evaluate(gas, n_dim, stencil, normal, need_jacobian, out),
            ConvectiveFluxScheme::Hllc(s) => s.evaluate(gas, n_dim, stencil, normal, need_jacobian, out),
        }
    }

    /// 是否使用单元中心值（JST 不做 MUSCL 重构）
    pub fn is_central(&self) -> bool {
        matches!(self, ConvectiveFluxScheme::Jst(_))
    }
}

/// 两侧单元状态直接构成的模板（无重构 / 边界）
pub fn stencil_from_states(left: FaceState, right: FaceState) -> EdgeStencil {
    EdgeStencil {
        left,
        right,
        state_i: left,
        state_j: right,
        lapl_i: [0.0; crate::types::MAX_NVAR],
        lapl_j: [0.0; crate::types::MAX_NVAR],
        sensor_i: 0.0,
        sensor_j: 0.0,
    }
}

/// 面谱半径 |v·n| + a|n|（按算术平均状态）
pub fn face_spectral_radius(gas: &GasModel, left: &FaceState, right: &FaceState, normal: DVec3) -> f64 {
    let area = normal.length();
    let vn = 0.5 * (left.velocity + right.velocity).dot(normal);
    let a = 0.5 * (left.sound_speed(gas) + right.sound_speed(gas));
    vn.abs() + a * area
}

/// 一阶标量耗散 Jacobian：J_i = A(U_L)/2 + (λ/2)I，J_j = A(U_R)/2 − (λ/2)I
///
/// JST / AUSM / HLLC 的谱正确左端阵。
pub fn scalar_dissipation_jacobian(
    gas: &GasModel,
    n_dim: usize,
    left: &FaceState,
    right: &FaceState,
    normal: DVec3,
    lambda: f64,
    out: &mut EdgeFlux,
) {
    let n_var = n_dim + 2;
    out.jac_i = euler_flux_jacobian(left, gas, n_dim, normal);
    out.jac_j = euler_flux_jacobian(right, gas, n_dim, normal);
    for r in 0..n_var {
        for c in 0..n_var {
            out.jac_i[r][c] *= 0.5;
            out.jac_j[r][c] *= 0.5;
        }
        out.jac_i[r][r] += 0.5 * lambda;
        out.jac_j[r][r] -= 0.5 * lambda;
    }
}
