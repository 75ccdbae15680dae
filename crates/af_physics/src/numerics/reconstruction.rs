// crates/af_physics/src/numerics/reconstruction.rs

//! MUSCL 面外推
//!
//! 左右状态取单元值加限制后的线性外推，外推点为边弦中点：
//!
//! ```text
//! V_L = V_i + φ_i · (∇V_i · (x_j - x_i) / 2)
//! V_R = V_j + φ_j · (∇V_j · (x_i - x_j) / 2)
//! ```
//!
//! 外推在原始变量 [T, u, v, (w), p] 上进行，密度由状态方程派生。
//! 外推若产生非物理温度/压力则退回一阶（单元值）。

use glam::DVec3;

use af_mesh::{DualGeometry, Edge};

use crate::state::FlowField;
use crate::types::{FaceState, GasModel};

/// 重构一条边的左右面状态
///
/// `muscl = false` 时直接返回两侧单元状态（一阶）。
pub fn reconstruct_edge_states(
    geometry: &DualGeometry,
    state: &FlowField,
    gas: &GasModel,
    edge: &Edge,
    muscl: bool,
) -> (FaceState, FaceState) {
    let (i, j) = (edge.cell_i, edge.cell_j);
    if !muscl {
        return (state.face_state(i), state.face_state(j));
    }

    let half_chord = 0.5 * (geometry.cell_center(j) - geometry.cell_center(i));
    let left = extrapolate(state, gas, i, half_chord);
    let right = extrapolate(state, gas, j, -half_chord);
    (left, right)
}

/// 单侧外推；失败（负温/负压）退回单元值
fn extrapolate(state: &FlowField, gas: &GasModel, cell: usize, offset: DVec3) -> FaceState {
    let n_dim = state.n_dim();

    let t = state.temperature[cell]
        + state.limiter(cell, 0) * state.gradient(cell, 0).dot(offset);
    let p = state.pressure[cell]
        + state.limiter(cell, n_dim + 1) * state.gradient(cell, n_dim + 1).dot(offset);
    if t <= 0.0 || p <= 0.0 {
        return state.face_state(cell);
    }

    let mut velocity = DVec3::ZERO;
    for d in 0..n_dim {
        velocity[d] = state.velocity[cell][d]
            + state.limiter(cell, 1 + d) * state.gradient(cell, 1 + d).dot(offset);
    }

    FaceState {
        density: p / (gas.gas_constant * t),
        velocity,
        pressure: p,
    }
}
