// crates/af_physics/src/lib.rs

//! AeroFVM 物理求解层 (Layer 4)
//!
//! 可压缩 RANS 有限体积求解器的数值核心：
//! - 气体模型与来流构造 (types / freestream)
//! - 守恒状态与原始变量派生视图 (state)
//! - 梯度、限制器、MUSCL 重构与块稀疏线性代数 (numerics / linalg)
//! - 对流/粘性通量核与近似 Jacobian (schemes)
//! - 湍流闭合 SA / SST (turbulence)
//! - 边界条件的残差级施加 (boundary)
//! - 非线性迭代与外层时间推进 (engine)
//!
//! # 状态约定
//!
//! 守恒变量是唯一的真值；原始变量是相边界处重算的派生视图，
//! 不单独修改。热循环一律面向扁平数组，分派只在装配期发生一次。

pub mod boundary;
pub mod engine;
pub mod error;
pub mod freestream;
pub mod linalg;
pub mod numerics;
pub mod schemes;
pub mod state;
pub mod turbulence;
pub mod types;

pub use error::{SolverError, SolverResult};
pub use freestream::Freestream;
pub use state::{FlowField, TurbField};
pub use types::{EdgeFlux, FaceState, GasModel, VarMat, VarVec, MAX_NVAR};
