// crates/af_physics/src/engine/mod.rs

//! 求解引擎
//!
//! - 平均流求解器 (mean): 残差/Jacobian 装配与隐式/显式更新
//! - 湍流求解器 (turb): SA / SST 子迭代，松耦合
//! - 时间步 (timestep): 局部 Δt 与 CFL 控制器
//! - 外层推进 (integrator): 定常伪时间与双时间步 BDF2
//! - 监视 (monitor) 与气动力 (forces)

pub mod forces;
pub mod integrator;
pub mod mean;
pub mod monitor;
pub mod timestep;
pub mod turb;

pub use forces::{compute_force_coefficients, ForceCoefficients};
pub use integrator::{Integration, RunReport};
pub use mean::{IterationOutcome, MeanFlowSolver};
pub use monitor::{IterationRecord, MonitorSink, NullMonitor, TracingMonitor};
pub use timestep::{compute_local_time_steps, CflController};
pub use turb::{TurbOutcome, TurbulenceSolver};
