// crates/af_physics/src/error.rs

//! 求解器错误分类
//!
//! 行为导向的错误分层（见外层循环的处理约定）：
//! - `InputInvalid` / `GeometryDegenerate`: 迭代开始前中止
//! - `NonAdmissible` / `LinearSolverDiverged`: 回退 CFL 重试
//! - `Diverged`: 终止运行并携带诊断
//!
//! 任何数值错误都经返回值上浮并累积诊断字符串，
//! 不跨外层迭代边界静默恢复。

use af_config::ConfigError;
use af_mesh::MeshError;
use thiserror::Error;

/// 求解操作结果
pub type SolverResult<T> = Result<T, SolverError>;

/// 求解器错误
#[derive(Debug, Error)]
pub enum SolverError {
    /// 配置或网格输入无效
    #[error("输入无效: {0}")]
    InputInvalid(String),

    /// 几何退化（非正对偶体积、零法向）
    #[error("几何退化: {0}")]
    GeometryDegenerate(String),

    /// 更新后出现非物理状态（负密度/负压）
    #[error("非可容许状态: {n_cells} 个单元出现负密度或负压 (首个单元 {first_cell})")]
    NonAdmissible {
        /// 违规单元数
        n_cells: usize,
        /// 首个违规单元
        first_cell: usize,
    },

    /// 线性求解器发散或停滞
    #[error("线性求解器未达到要求的残差下降: {0}")]
    LinearSolverDiverged(String),

    /// 运行发散（CFL 跌破下限或残差 NaN）
    #[error("运行发散: {reason} (迭代 {iteration}, CFL {cfl:.3e})")]
    Diverged {
        /// 诊断描述
        reason: String,
        /// 发散时的迭代号
        iteration: usize,
        /// 发散时的 CFL
        cfl: f64,
    },

    /// IO 错误（重启/输出委托层上浮）
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for SolverError {
    fn from(e: ConfigError) -> Self {
        SolverError::InputInvalid(e.to_string())
    }
}

impl From<MeshError> for SolverError {
    fn from(e: MeshError) -> Self {
        match e {
            MeshError::NonPositiveVolume { .. } | MeshError::DegenerateNormal { .. } => {
                SolverError::GeometryDegenerate(e.to_string())
            }
            other => SolverError::InputInvalid(other.to_string()),
        }
    }
}
