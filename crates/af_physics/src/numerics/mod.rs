// crates/af_physics/src/numerics/mod.rs

//! 模板局部数值工具
//!
//! - 梯度重构 (gradient): Green-Gauss 面积分 / 加权最小二乘
//! - 坡度限制器 (limiter): Venkatakrishnan / Barth-Jespersen
//! - MUSCL 面外推 (reconstruction)

pub mod gradient;
pub mod limiter;
pub mod reconstruction;

pub use gradient::{compute_gradients, green_gauss, least_squares};
pub use limiter::compute_limiters;
pub use reconstruction::reconstruct_edge_states;
