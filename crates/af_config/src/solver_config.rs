// crates/af_config/src/solver_config.rs

//! SolverConfig - 求解器配置（全 f64）
//!
//! 定义求解器的所有配置参数，使用纯 f64 存储以便 JSON 序列化。
//! 每个字段带 `#[serde(default)]`，缺失的键落到默认值；
//! `validate()` 在构建求解器之前做一次完整的范围与组合检查。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::boundary::MarkerConfig;
use crate::error::{ConfigError, ConfigResult};

// ============================================================
// 枚举选项
// ============================================================

/// 空间维数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Dimension {
    /// 二维（4 个守恒变量）
    #[serde(rename = "2d")]
    #[default]
    Two,
    /// 三维（5 个守恒变量）
    #[serde(rename = "3d")]
    Three,
}

impl Dimension {
    /// 空间维数
    #[inline]
    pub fn n_dim(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }

    /// 平均流守恒变量个数（rho, rho*u_i, rho*E）
    #[inline]
    pub fn n_var(self) -> usize {
        self.n_dim() + 2
    }
}

/// 控制方程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowRegime {
    /// 无粘 Euler 方程
    Euler,
    /// 层流 Navier-Stokes
    NavierStokes,
    /// 雷诺平均 Navier-Stokes（需配合湍流模型）
    #[default]
    Rans,
}

impl FlowRegime {
    /// 是否包含粘性通量
    #[inline]
    pub fn is_viscous(self) -> bool {
        !matches!(self, FlowRegime::Euler)
    }
}

/// 湍流闭合模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TurbulenceModelKind {
    /// 无湍流模型
    None,
    /// Spalart-Allmaras 一方程模型
    #[default]
    Sa,
    /// Menter SST k-omega 两方程模型
    Sst,
}

impl TurbulenceModelKind {
    /// 湍流变量个数
    #[inline]
    pub fn n_var(self) -> usize {
        match self {
            TurbulenceModelKind::None => 0,
            TurbulenceModelKind::Sa => 1,
            TurbulenceModelKind::Sst => 2,
        }
    }
}

/// 对流通量格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConvectiveSchemeKind {
    /// Roe 近似黎曼求解器
    #[default]
    Roe,
    /// JST 中心格式 + 标量人工耗散
    Jst,
    /// AUSM+-up 通量分裂
    Ausm,
    /// HLLC 近似黎曼求解器
    Hllc,
}

/// 梯度重构方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GradientKind {
    /// Green-Gauss 面积分
    #[default]
    GreenGauss,
    /// 加权最小二乘
    LeastSquares,
}

/// 坡度限制器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LimiterKind {
    /// 不限制（光滑流动）
    None,
    /// Venkatakrishnan 光滑限制器
    #[default]
    Venkat,
    /// Barth-Jespersen 限制器
    Barth,
}

/// 时间推进方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeIntegrationKind {
    /// 显式多级 Runge-Kutta
    ExplicitRk,
    /// 隐式 Euler（伪时间）
    #[default]
    ImplicitEuler,
    /// 双时间步 BDF2（非定常）
    DualTimeBdf2,
}

/// Krylov 求解器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    /// 重启 GMRES(m)
    #[default]
    Gmres,
    /// BiCGStab
    Bicgstab,
}

/// 预条件器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerKind {
    /// 块 Jacobi（逐行块逆）
    Jacobi,
    /// 块 ILU(0)
    #[default]
    Ilu0,
    /// 对称块 Gauss-Seidel
    Sgs,
}

// ============================================================
// 配置结构
// ============================================================

/// 求解器顶层配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SolverConfig {
    /// 空间维数
    #[serde(default)]
    pub dimension: Dimension,

    /// 控制方程
    #[serde(default)]
    pub regime: FlowRegime,

    /// 湍流模型
    #[serde(default)]
    pub turbulence: TurbulenceModelKind,

    /// 网格来源
    #[serde(default)]
    pub mesh: MeshConfig,

    /// 数值格式
    #[serde(default)]
    pub numerics: NumericsConfig,

    /// 时间推进
    #[serde(default)]
    pub time: TimeConfig,

    /// 线性求解器
    #[serde(default)]
    pub linear_solver: LinearSolverConfig,

    /// 来流条件
    #[serde(default)]
    pub freestream: FreestreamConfig,

    /// 气体模型
    #[serde(default)]
    pub gas: GasConfig,

    /// 参考量（力系数归一化）
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// 边界标记配置
    #[serde(default)]
    pub markers: Vec<MarkerConfig>,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,
}

impl SolverConfig {
    /// 从 JSON 文件加载
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SolverConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// 平均流守恒变量个数
    #[inline]
    pub fn n_var(&self) -> usize {
        self.dimension.n_var()
    }

    /// 有效湍流模型（Euler/NS 下强制为 None）
    pub fn effective_turbulence(&self) -> TurbulenceModelKind {
        match self.regime {
            FlowRegime::Rans => self.turbulence,
            _ => TurbulenceModelKind::None,
        }
    }

    /// 完整校验
    pub fn validate(&self) -> ConfigResult<()> {
        self.numerics.validate()?;
        self.time.validate()?;
        self.linear_solver.validate()?;
        self.freestream.validate()?;
        self.gas.validate()?;
        self.reference.validate()?;

        if self.regime == FlowRegime::Rans && self.turbulence == TurbulenceModelKind::None {
            return Err(ConfigError::Incompatible(
                "RANS 求解需要指定湍流模型 (sa / sst)".into(),
            ));
        }

        // 标记名去重
        for (i, m) in self.markers.iter().enumerate() {
            if self.markers[..i].iter().any(|other| other.name == m.name) {
                return Err(ConfigError::DuplicateMarker(m.name.clone()));
            }
        }
        Ok(())
    }
}

/// 网格来源配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeshConfig {
    /// 网格文件路径（JSON 原始网格格式）
    #[serde(default)]
    pub path: String,
}

/// 数值格式配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericsConfig {
    /// 对流通量格式
    #[serde(default)]
    pub convective_scheme: ConvectiveSchemeKind,

    /// 是否启用 MUSCL 二阶重构
    #[serde(default = "default_true")]
    pub muscl: bool,

    /// 梯度方法
    #[serde(default)]
    pub gradient: GradientKind,

    /// 限制器
    #[serde(default)]
    pub limiter: LimiterKind,

    /// Venkatakrishnan 限制器系数 K
    #[serde(default = "default_limiter_coefficient")]
    pub limiter_coefficient: f64,

    /// Roe 熵修正系数（Harten-Hyman）
    #[serde(default = "default_entropy_fix")]
    pub entropy_fix_coeff: f64,

    /// 是否启用 Weiss-Smith 低马赫预处理（仅作用于 Roe 耗散）
    #[serde(default)]
    pub roe_low_mach: bool,

    /// 低马赫预处理截断马赫数（<=0 时取 3*M_inf）
    #[serde(default)]
    pub low_mach_cutoff: f64,

    /// JST 二阶耗散系数 k2
    #[serde(default = "default_jst_k2")]
    pub jst_k2: f64,

    /// JST 四阶耗散系数 k4
    #[serde(default = "default_jst_k4")]
    pub jst_k4: f64,
}

fn default_true() -> bool {
    true
}
fn default_limiter_coefficient() -> f64 {
    5.0
}
fn default_entropy_fix() -> f64 {
    0.1
}
fn default_jst_k2() -> f64 {
    0.5
}
fn default_jst_k4() -> f64 {
    0.02
}

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            convective_scheme: ConvectiveSchemeKind::default(),
            muscl: true,
            gradient: GradientKind::default(),
            limiter: LimiterKind::default(),
            limiter_coefficient: default_limiter_coefficient(),
            entropy_fix_coeff: default_entropy_fix(),
            roe_low_mach: false,
            low_mach_cutoff: 0.0,
            jst_k2: default_jst_k2(),
            jst_k4: default_jst_k4(),
        }
    }
}

impl NumericsConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.limiter_coefficient <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "limiter_coefficient",
                value: self.limiter_coefficient,
                reason: "必须为正",
            });
        }
        if !(0.0..1.0).contains(&self.entropy_fix_coeff) {
            return Err(ConfigError::OutOfRange {
                key: "entropy_fix_coeff",
                value: self.entropy_fix_coeff,
                reason: "必须位于 [0, 1)",
            });
        }
        if self.jst_k2 < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "jst_k2",
                value: self.jst_k2,
                reason: "必须非负",
            });
        }
        if self.jst_k4 < 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "jst_k4",
                value: self.jst_k4,
                reason: "必须非负",
            });
        }
        Ok(())
    }
}

/// 时间推进配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// 推进方式
    #[serde(default)]
    pub integration: TimeIntegrationKind,

    /// 初始 CFL 数
    #[serde(default = "default_cfl_init")]
    pub cfl_init: f64,

    /// CFL 上限
    #[serde(default = "default_cfl_max")]
    pub cfl_max: f64,

    /// 成功迭代后的 CFL 增长因子
    #[serde(default = "default_cfl_growth")]
    pub cfl_growth: f64,

    /// 发散检测后的 CFL 回退因子
    #[serde(default = "default_cfl_cutback")]
    pub cfl_cutback: f64,

    /// CFL 下限（低于此值判定发散）
    #[serde(default = "default_cfl_floor")]
    pub cfl_floor: f64,

    /// 最大外层迭代数
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// 收敛目标：密度残差 l2 范数相对初值的下降量级
    #[serde(default = "default_convergence_target")]
    pub convergence_order: f64,

    /// 隐式更新欠松弛因子
    #[serde(default = "default_relaxation")]
    pub relaxation: f64,

    /// 显式 RK 级系数（为空时按 3 级标准系数）
    #[serde(default)]
    pub rk_coefficients: Vec<f64>,

    /// 物理时间步长 [s]（双时间步）
    #[serde(default = "default_dt_physical")]
    pub dt_physical: f64,

    /// 物理时间步数（双时间步）
    #[serde(default = "default_n_physical_steps")]
    pub n_physical_steps: usize,

    /// 每个物理步的内迭代数（双时间步）
    #[serde(default = "default_inner_iterations")]
    pub inner_iterations: usize,

    /// 非可容许状态连续出现上限（超过即中止）
    #[serde(default = "default_max_retries")]
    pub max_admissibility_retries: usize,
}

fn default_cfl_init() -> f64 {
    5.0
}
fn default_cfl_max() -> f64 {
    100.0
}
fn default_cfl_growth() -> f64 {
    1.2
}
fn default_cfl_cutback() -> f64 {
    0.5
}
fn default_cfl_floor() -> f64 {
    1e-3
}
fn default_max_iterations() -> usize {
    10000
}
fn default_convergence_target() -> f64 {
    6.0
}
fn default_relaxation() -> f64 {
    1.0
}
fn default_dt_physical() -> f64 {
    1e-3
}
fn default_n_physical_steps() -> usize {
    100
}
fn default_inner_iterations() -> usize {
    50
}
fn default_max_retries() -> usize {
    10
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            integration: TimeIntegrationKind::default(),
            cfl_init: default_cfl_init(),
            cfl_max: default_cfl_max(),
            cfl_growth: default_cfl_growth(),
            cfl_cutback: default_cfl_cutback(),
            cfl_floor: default_cfl_floor(),
            max_iterations: default_max_iterations(),
            convergence_order: default_convergence_target(),
            relaxation: default_relaxation(),
            rk_coefficients: Vec::new(),
            dt_physical: default_dt_physical(),
            n_physical_steps: default_n_physical_steps(),
            inner_iterations: default_inner_iterations(),
            max_admissibility_retries: default_max_retries(),
        }
    }
}

impl TimeConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.cfl_init <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "cfl_init",
                value: self.cfl_init,
                reason: "必须为正",
            });
        }
        if self.cfl_max < self.cfl_init {
            return Err(ConfigError::OutOfRange {
                key: "cfl_max",
                value: self.cfl_max,
                reason: "不得小于 cfl_init",
            });
        }
        if self.cfl_growth < 1.0 {
            return Err(ConfigError::OutOfRange {
                key: "cfl_growth",
                value: self.cfl_growth,
                reason: "必须 >= 1",
            });
        }
        if self.cfl_cutback <= 0.0 || self.cfl_cutback >= 1.0 {
            return Err(ConfigError::OutOfRange {
                key: "cfl_cutback",
                value: self.cfl_cutback,
                reason: "必须位于 (0, 1)",
            });
        }
        if !(0.0..=1.0).contains(&self.relaxation) || self.relaxation == 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "relaxation",
                value: self.relaxation,
                reason: "必须位于 (0, 1]",
            });
        }
        if self.dt_physical <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "dt_physical",
                value: self.dt_physical,
                reason: "必须为正",
            });
        }
        Ok(())
    }

    /// 显式 RK 级系数（缺省为标准 3 级格式）
    pub fn rk_stages(&self) -> Vec<f64> {
        if self.rk_coefficients.is_empty() {
            vec![0.1481, 0.4, 1.0]
        } else {
            self.rk_coefficients.clone()
        }
    }
}

/// 线性求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolverConfig {
    /// Krylov 方法
    #[serde(default)]
    pub kind: LinearSolverKind,

    /// 预条件器
    #[serde(default)]
    pub preconditioner: PreconditionerKind,

    /// 相对收敛容差
    #[serde(default = "default_linear_tol")]
    pub tolerance: f64,

    /// 绝对收敛容差
    #[serde(default = "default_linear_atol")]
    pub abs_tolerance: f64,

    /// 最大迭代次数
    #[serde(default = "default_linear_max_iter")]
    pub max_iterations: usize,

    /// GMRES 重启长度 m
    #[serde(default = "default_gmres_restart")]
    pub gmres_restart: usize,
}

fn default_linear_tol() -> f64 {
    1e-2
}
fn default_linear_atol() -> f64 {
    1e-14
}
fn default_linear_max_iter() -> usize {
    100
}
fn default_gmres_restart() -> usize {
    30
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self {
            kind: LinearSolverKind::default(),
            preconditioner: PreconditionerKind::default(),
            tolerance: default_linear_tol(),
            abs_tolerance: default_linear_atol(),
            max_iterations: default_linear_max_iter(),
            gmres_restart: default_gmres_restart(),
        }
    }
}

impl LinearSolverConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(0.0..1.0).contains(&self.tolerance) {
            return Err(ConfigError::OutOfRange {
                key: "linear_tol",
                value: self.tolerance,
                reason: "必须位于 (0, 1)",
            });
        }
        if self.gmres_restart < 2 {
            return Err(ConfigError::OutOfRange {
                key: "gmres_restart",
                value: self.gmres_restart as f64,
                reason: "必须 >= 2",
            });
        }
        Ok(())
    }
}

/// 来流条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreestreamConfig {
    /// 来流马赫数
    #[serde(default = "default_mach")]
    pub mach: f64,

    /// 迎角 [deg]
    #[serde(default)]
    pub aoa: f64,

    /// 侧滑角 [deg]
    #[serde(default)]
    pub sideslip: f64,

    /// 静温 [K]
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// 静压 [Pa]
    #[serde(default = "default_pressure")]
    pub pressure: f64,

    /// 目标雷诺数（>0 时重标定来流粘性）
    #[serde(default)]
    pub reynolds: f64,
}

fn default_mach() -> f64 {
    0.3
}
fn default_temperature() -> f64 {
    288.15
}
fn default_pressure() -> f64 {
    101325.0
}

impl Default for FreestreamConfig {
    fn default() -> Self {
        Self {
            mach: default_mach(),
            aoa: 0.0,
            sideslip: 0.0,
            temperature: default_temperature(),
            pressure: default_pressure(),
            reynolds: 0.0,
        }
    }
}

impl FreestreamConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.mach <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "freestream_mach",
                value: self.mach,
                reason: "必须为正",
            });
        }
        if self.temperature <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "freestream_temperature",
                value: self.temperature,
                reason: "必须为正",
            });
        }
        if self.pressure <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "freestream_pressure",
                value: self.pressure,
                reason: "必须为正",
            });
        }
        Ok(())
    }
}

/// 气体模型参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// 比热比 gamma
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// 气体常数 R [J/(kg·K)]
    #[serde(default = "default_gas_constant")]
    pub gas_constant: f64,

    /// 层流 Prandtl 数
    #[serde(default = "default_prandtl_laminar")]
    pub prandtl_laminar: f64,

    /// 湍流 Prandtl 数
    #[serde(default = "default_prandtl_turbulent")]
    pub prandtl_turbulent: f64,
}

fn default_gamma() -> f64 {
    1.4
}
fn default_gas_constant() -> f64 {
    287.058
}
fn default_prandtl_laminar() -> f64 {
    0.72
}
fn default_prandtl_turbulent() -> f64 {
    0.9
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            gas_constant: default_gas_constant(),
            prandtl_laminar: default_prandtl_laminar(),
            prandtl_turbulent: default_prandtl_turbulent(),
        }
    }
}

impl GasConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.gamma <= 1.0 {
            return Err(ConfigError::OutOfRange {
                key: "gamma",
                value: self.gamma,
                reason: "必须 > 1",
            });
        }
        if self.gas_constant <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "gas_constant",
                value: self.gas_constant,
                reason: "必须为正",
            });
        }
        if self.prandtl_laminar <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "prandtl_laminar",
                value: self.prandtl_laminar,
                reason: "必须为正",
            });
        }
        Ok(())
    }
}

/// 参考量配置（力/力矩系数归一化）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// 参考长度 [m]
    #[serde(default = "default_ref_length")]
    pub length: f64,

    /// 参考面积 [m^2]（2D 下取参考长度）
    #[serde(default = "default_ref_area")]
    pub area: f64,

    /// 力矩参考点
    #[serde(default)]
    pub moment_origin: [f64; 3],
}

fn default_ref_length() -> f64 {
    1.0
}
fn default_ref_area() -> f64 {
    1.0
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            length: default_ref_length(),
            area: default_ref_area(),
            moment_origin: [0.25, 0.0, 0.0],
        }
    }
}

impl ReferenceConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.length <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "reference_length",
                value: self.length,
                reason: "必须为正",
            });
        }
        if self.area <= 0.0 {
            return Err(ConfigError::OutOfRange {
                key: "reference_area",
                value: self.area,
                reason: "必须为正",
            });
        }
        Ok(())
    }
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 流场输出路径（VTK）
    #[serde(default = "default_field_path")]
    pub field_path: String,

    /// 收敛历史 CSV 路径
    #[serde(default = "default_history_path")]
    pub history_path: String,

    /// 重启文件路径
    #[serde(default = "default_restart_path")]
    pub restart_path: String,

    /// 每多少次迭代写一次流场（0 表示只在结束时写）
    #[serde(default)]
    pub field_interval: usize,

    /// 每多少次迭代写一次重启文件
    #[serde(default = "default_restart_interval")]
    pub restart_interval: usize,
}

fn default_field_path() -> String {
    "flow.vtk".into()
}
fn default_history_path() -> String {
    "history.csv".into()
}
fn default_restart_path() -> String {
    "restart.afrs".into()
}
fn default_restart_interval() -> usize {
    500
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            field_path: default_field_path(),
            history_path: default_history_path(),
            restart_path: default_restart_path(),
            field_interval: 0,
            restart_interval: default_restart_interval(),
        }
    }
}
