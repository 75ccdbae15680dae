// crates/af_physics/src/types.rs

//! 核心类型：气体模型、面状态与通量核输出
//!
//! 守恒变量布局（固定，2D 下尾部空位不用）：
//! ```text
//! [rho, rho*u, rho*v, (rho*w), rho*E]
//!   0     1      2       3      n_dim+1
//! ```
//! 原始变量梯度/限制器布局：`[T, u, v, (w), p]`，共 n_dim+2 项。

use glam::DVec3;
use serde::{Deserialize, Serialize};

use af_config::GasConfig;

/// 守恒变量个数上限（3D）
pub const MAX_NVAR: usize = 5;

/// 守恒变量向量（定长，有效长度 n_var = n_dim + 2）
pub type VarVec = [f64; MAX_NVAR];

/// 稠密 Jacobian 块（定长，有效子块 n_var x n_var）
pub type VarMat = [[f64; MAX_NVAR]; MAX_NVAR];

/// 零向量
#[inline]
pub fn var_zero() -> VarVec {
    [0.0; MAX_NVAR]
}

/// 零矩阵
#[inline]
pub fn mat_zero() -> VarMat {
    [[0.0; MAX_NVAR]; MAX_NVAR]
}

// ============================================================
// 气体模型
// ============================================================

/// 量热完全气体模型 + Sutherland 粘性律
///
/// `viscosity_scale` 用于按目标雷诺数重标定来流粘性（见 freestream）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GasModel {
    /// 比热比
    pub gamma: f64,
    /// 气体常数 R [J/(kg·K)]
    pub gas_constant: f64,
    /// 层流 Prandtl 数
    pub prandtl_laminar: f64,
    /// 湍流 Prandtl 数
    pub prandtl_turbulent: f64,
    /// Sutherland 参考粘性 [Pa·s]
    pub mu_ref: f64,
    /// Sutherland 参考温度 [K]
    pub t_ref: f64,
    /// Sutherland 常数 [K]
    pub sutherland_s: f64,
    /// 粘性整体缩放（雷诺数匹配用，默认 1）
    pub viscosity_scale: f64,
}

impl GasModel {
    /// 从配置构造
    pub fn new(config: &GasConfig) -> Self {
        Self {
            gamma: config.gamma,
            gas_constant: config.gas_constant,
            prandtl_laminar: config.prandtl_laminar,
            prandtl_turbulent: config.prandtl_turbulent,
            mu_ref: 1.716e-5,
            t_ref: 273.15,
            sutherland_s: 110.4,
            viscosity_scale: 1.0,
        }
    }

    /// 定压比热 cp
    #[inline]
    pub fn cp(&self) -> f64 {
        self.gamma * self.gas_constant / (self.gamma - 1.0)
    }

    /// 定容比热 cv
    #[inline]
    pub fn cv(&self) -> f64 {
        self.gas_constant / (self.gamma - 1.0)
    }

    /// 声速 a = sqrt(gamma * p / rho)
    #[inline]
    pub fn sound_speed(&self, pressure: f64, density: f64) -> f64 {
        (self.gamma * pressure / density).sqrt()
    }

    /// 温度 T = p / (rho R)
    #[inline]
    pub fn temperature(&self, pressure: f64, density: f64) -> f64 {
        pressure / (density * self.gas_constant)
    }

    /// Sutherland 层流动力粘性 [Pa·s]
    #[inline]
    pub fn laminar_viscosity(&self, temperature: f64) -> f64 {
        let t = temperature;
        self.viscosity_scale
            * self.mu_ref
            * (t / self.t_ref).powf(1.5)
            * (self.t_ref + self.sutherland_s)
            / (t + self.sutherland_s)
    }

    /// 有效导热系数 k = cp * (mu/Pr + mu_t/Pr_t)
    #[inline]
    pub fn thermal_conductivity(&self, mu_laminar: f64, mu_eddy: f64) -> f64 {
        self.cp() * (mu_laminar / self.prandtl_laminar + mu_eddy / self.prandtl_turbulent)
    }
}

// ============================================================
// 面状态与通量核输出
// ============================================================

/// 面上的原始状态（通量核输入）
#[derive(Debug, Clone, Copy)]
pub struct FaceState {
    /// 密度 [kg/m^3]
    pub density: f64,
    /// 速度 [m/s]
    pub velocity: DVec3,
    /// 压力 [Pa]
    pub pressure: f64,
}

impl FaceState {
    /// 声速
    #[inline]
    pub fn sound_speed(&self, gas: &GasModel) -> f64 {
        gas.sound_speed(self.pressure, self.density)
    }

    /// 总焓 H = h + q^2/2
    #[inline]
    pub fn total_enthalpy(&self, gas: &GasModel) -> f64 {
        gas.gamma / (gas.gamma - 1.0) * self.pressure / self.density
            + 0.5 * self.velocity.length_squared()
    }

    /// 单位质量总能 E
    #[inline]
    pub fn total_energy(&self, gas: &GasModel) -> f64 {
        self.pressure / ((gas.gamma - 1.0) * self.density)
            + 0.5 * self.velocity.length_squared()
    }

    /// 转守恒变量
    pub fn to_conservative(&self, gas: &GasModel, n_dim: usize) -> VarVec {
        let mut u = var_zero();
        u[0] = self.density;
        let v = self.velocity.to_array();
        for d in 0..n_dim {
            u[1 + d] = self.density * v[d];
        }
        u[n_dim + 1] = self.density * self.total_energy(gas);
        u
    }

    /// 从守恒变量恢复（调用方保证可容许）
    pub fn from_conservative(u: &VarVec, gas: &GasModel, n_dim: usize) -> Self {
        let density = u[0];
        let mut velocity = DVec3::ZERO;
        for d in 0..n_dim {
            velocity[d] = u[1 + d] / density;
        }
        let kinetic = 0.5 * density * velocity.length_squared();
        let pressure = (gas.gamma - 1.0) * (u[n_dim + 1] - kinetic);
        Self {
            density,
            velocity,
            pressure,
        }
    }

    /// 解析 Euler 通量 F(U)·n（n 为面积加权法向）
    pub fn euler_flux(&self, gas: &GasModel, n_dim: usize, normal: DVec3) -> VarVec {
        let mut flux = var_zero();
        let vn = self.velocity.dot(normal);
        let mass = self.density * vn;
        flux[0] = mass;
        let v = self.velocity.to_array();
        let n = normal.to_array();
        for d in 0..n_dim {
            flux[1 + d] = mass * v[d] + self.pressure * n[d];
        }
        flux[n_dim + 1] = mass * self.total_enthalpy(gas);
        flux
    }
}

/// 通量核输出：通量 + 两侧 Jacobian 块 + 面谱半径
#[derive(Debug, Clone, Copy)]
pub struct EdgeFlux {
    /// 通量向量（加到 R_i，减自 R_j）
    pub flux: VarVec,
    /// dF/dU_i
    pub jac_i: VarMat,
    /// dF/dU_j
    pub jac_j: VarMat,
    /// 面谱半径 (|v·n| + a|n|)，供时间步与 JST 缩放
    pub lambda: f64,
}

impl Default for EdgeFlux {
    fn default() -> Self {
        Self {
            flux: var_zero(),
            jac_i: mat_zero(),
            jac_j: mat_zero(),
            lambda: 0.0,
        }
    }
}

/// Euler 通量 Jacobian A = dF(U)·n / dU（解析）
///
/// 布局与守恒变量一致；用于中心部分的精确线化。
pub fn euler_flux_jacobian(
    state: &FaceState,
    gas: &GasModel,
    n_dim: usize,
    normal: DVec3,
) -> VarMat {
    let mut a = mat_zero();
    let g1 = gas.gamma - 1.0;
    let v = state.velocity.to_array();
    let n = normal.to_array();
    let vn: f64 = (0..n_dim).map(|d| v[d] * n[d]).sum();
    let q2: f64 = (0..n_dim).map(|d| v[d] * v[d]).sum();
    let h = state.total_enthalpy(gas);
    let ie = n_dim + 1;

    // 连续方程行
    for d in 0..n_dim {
        a[0][1 + d] = n[d];
    }

    // 动量行
    for m in 0..n_dim {
        a[1 + m][0] = 0.5 * g1 * q2 * n[m] - v[m] * vn;
        for k in 0..n_dim {
            a[1 + m][1 + k] = v[m] * n[k] - g1 * v[k] * n[m];
            if m == k {
                a[1 + m][1 + k] += vn;
            }
        }
        a[1 + m][ie] = g1 * n[m];
    }

    // 能量行
    a[ie][0] = (0.5 * g1 * q2 - h) * vn;
    for k in 0..n_dim {
        a[ie][1 + k] = h * n[k] - g1 * v[k] * vn;
    }
    a[ie][ie] = gas.gamma * vn;

    a
}

/// 压力对守恒变量的导数 dp/dU
pub fn pressure_derivative(state: &FaceState, gas: &GasModel, n_dim: usize) -> VarVec {
    let g1 = gas.gamma - 1.0;
    let v = state.velocity.to_array();
    let q2: f64 = (0..n_dim).map(|d| v[d] * v[d]).sum();
    let mut dp = var_zero();
    dp[0] = 0.5 * g1 * q2;
    for d in 0..n_dim {
        dp[1 + d] = -g1 * v[d];
    }
    dp[n_dim + 1] = g1;
    dp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gas() -> GasModel {
        GasModel::new(&af_config::GasConfig::default())
    }

    fn state() -> FaceState {
        FaceState {
            density: 1.2,
            velocity: DVec3::new(100.0, 30.0, 0.0),
            pressure: 101325.0,
        }
    }

    #[test]
    fn test_conservative_roundtrip() {
        let gas = gas();
        let s = state();
        let u = s.to_conservative(&gas, 2);
        let back = FaceState::from_conservative(&u, &gas, 2);
        assert!((back.density - s.density).abs() < 1e-12);
        assert!((back.pressure - s.pressure).abs() < 1e-7);
        assert!((back.velocity - s.velocity).length() < 1e-12);
    }

    #[test]
    fn test_jacobian_matches_flux_fd() {
        // 有限差分验证解析 Jacobian
        let gas = gas();
        let s = state();
        let n_dim = 2;
        let n_var = n_dim + 2;
        let normal = DVec3::new(0.6, 0.8, 0.0);
        let u0 = s.to_conservative(&gas, n_dim);
        let f0 = s.euler_flux(&gas, n_dim, normal);
        let a = euler_flux_jacobian(&s, &gas, n_dim, normal);

        for k in 0..n_var {
            let mut u = u0;
            let h = 1e-6 * u0[k].abs().max(1.0);
            u[k] += h;
            let sp = FaceState::from_conservative(&u, &gas, n_dim);
            let f = sp.euler_flux(&gas, n_dim, normal);
            for m in 0..n_var {
                let fd = (f[m] - f0[m]) / h;
                let tol = 1e-3 * (a[m][k].abs() + 1.0);
                assert!(
                    (a[m][k] - fd).abs() < tol,
                    "A[{m}][{k}] = {} vs FD {}",
                    a[m][k],
                    fd
                );
            }
        }
    }

    #[test]
    fn test_sutherland_reference() {
        let gas = gas();
        let mu = gas.laminar_viscosity(273.15);
        assert!((mu - 1.716e-5).abs() < 1e-9);
        // 粘性随温度上升
        assert!(gas.laminar_viscosity(400.0) > mu);
    }

    #[test]
    fn test_pressure_derivative_fd() {
        let gas = gas();
        let s = state();
        let n_dim = 2;
        let u0 = s.to_conservative(&gas, n_dim);
        let dp = pressure_derivative(&s, &gas, n_dim);
        for k in 0..n_dim + 2 {
            let mut u = u0;
            let h = 1e-6 * u0[k].abs().max(1.0);
            u[k] += h;
            let sp = FaceState::from_conservative(&u, &gas, n_dim);
            let fd = (sp.pressure - s.pressure) / h;
            assert!((dp[k] - fd).abs() < 1e-3 * (dp[k].abs() + 1.0));
        }
    }
}
