// crates/af_physics/src/engine/timestep.rs

//! 时间步长与 CFL 控制
//!
//! 局部时间步 Δt_i = CFL · V_i / (λ_inv + 4 λ_visc)，
//! 谱半径逐面累加：λ_inv 累加 |v·n| + a|n|，
//! λ_visc 累加 (μ_tot/ρ)_f |n|² / V。
//!
//! CFL 控制器：成功迭代乘增长因子（封顶 cfl_max），
//! 发散检测（非可容许更新、线性求解停滞、残差 NaN）乘回退因子，
//! 跌破下限判定运行发散。

use rayon::prelude::*;

use af_config::TimeConfig;
use af_mesh::DualGeometry;

use crate::state::FlowField;

/// 逐单元谱半径与局部时间步
///
/// 结果写入 `state.lambda_conv` / `state.lambda_visc` / `state.dt`。
pub fn compute_local_time_steps(
    geometry: &DualGeometry,
    state: &mut FlowField,
    cfl: f64,
    viscous: bool,
) {
    let n_cells = geometry.n_cells();

    // 谱半径（逐单元 gather，无写冲突）
    let field = &*state;
    let spectral: Vec<(f64, f64)> = (0..n_cells)
        .into_par_iter()
        .map(|cell| {
            let mut lambda_conv = 0.0;
            let mut lambda_visc = 0.0;
            let volume = geometry.volume(cell);

            let mut accumulate =
                |normal_len2: f64, vn: f64, a_face: f64, rho_face: f64, mu_face: f64| {
                    lambda_conv += vn.abs() + a_face * normal_len2.sqrt();
                    if viscous {
                        lambda_visc += mu_face / rho_face * normal_len2 / volume;
                    }
                };

            for &e in geometry.edges_of_cell(cell) {
                let edge = geometry.edge(e as usize);
                let other = edge.other(cell);
                let vn = 0.5
                    * (field.velocity[cell] + field.velocity[other]).dot(edge.normal);
                let a_face = 0.5 * (field.sound_speed[cell] + field.sound_speed[other]);
                let rho_face = 0.5 * (field.density[cell] + field.density[other]);
                let mu_face = 0.5
                    * (field.mu_laminar[cell]
                        + field.mu_eddy[cell]
                        + field.mu_laminar[other]
                        + field.mu_eddy[other]);
                accumulate(edge.normal.length_squared(), vn, a_face, rho_face, mu_face);
            }
            for &f in geometry.boundary_faces_of_cell(cell) {
                let face = geometry.boundary_face(f as usize);
                let vn = field.velocity[cell].dot(face.normal);
                accumulate(
                    face.normal.length_squared(),
                    vn,
                    field.sound_speed[cell],
                    field.density[cell],
                    field.mu_laminar[cell] + field.mu_eddy[cell],
                );
            }
            (lambda_conv, lambda_visc)
        })
        .collect();

    for (cell, (lc, lv)) in spectral.into_iter().enumerate() {
        state.lambda_conv[cell] = lc;
        state.lambda_visc[cell] = lv;
        let denom = lc + 4.0 * lv;
        state.dt[cell] = if denom > 0.0 {
            cfl * geometry.volume(cell) / denom
        } else {
            f64::MAX
        };
    }
}

/// CFL 自适应控制器
#[derive(Debug, Clone)]
pub struct CflController {
    cfl: f64,
    cfl_max: f64,
    growth: f64,
    cutback: f64,
    floor: f64,
}

impl CflController {
    /// 由时间推进配置构造
    pub fn new(config: &TimeConfig) -> Self {
        Self {
            cfl: config.cfl_init,
            cfl_max: config.cfl_max,
            growth: config.cfl_growth,
            cutback: config.cfl_cutback,
            floor: config.cfl_floor,
        }
    }

    /// 当前 CFL
    #[inline]
    pub fn cfl(&self) -> f64 {
        self.cfl
    }

    /// 成功迭代：增长并封顶
    pub fn on_success(&mut self) {
        self.cfl = (self.cfl * self.growth).min(self.cfl_max);
    }

    /// 发散检测：回退
    pub fn on_failure(&mut self) {
        self.cfl *= self.cutback;
        tracing::warn!(cfl = self.cfl, "CFL 回退");
    }

    /// 是否已跌破下限（运行发散）
    pub fn collapsed(&self) -> bool {
        self.cfl < self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaceState, GasModel};
    use af_config::GasConfig;
    use af_mesh::generation::RectMeshGenerator;
    use af_mesh::DualGeometry;
    use glam::DVec3;

    #[test]
    fn test_dt_scales_with_cfl() {
        let raw = RectMeshGenerator::new(4, 4, 1.0, 1.0).build();
        let geometry = DualGeometry::build(&raw, &[]).unwrap();
        let gas = GasModel::new(&GasConfig::default());
        let mut state = FlowField::new(2, geometry.n_cells());
        state.initialize_uniform(
            &FaceState {
                density: 1.2,
                velocity: DVec3::new(100.0, 0.0, 0.0),
                pressure: 1e5,
            },
            &gas,
        );
        compute_local_time_steps(&geometry, &mut state, 1.0, false);
        let dt1: Vec<f64> = state.dt.clone();
        compute_local_time_steps(&geometry, &mut state, 2.0, false);
        for (a, b) in dt1.iter().zip(state.dt.iter()) {
            assert!((2.0 * a - b).abs() < 1e-15 * b.abs());
            assert!(*a > 0.0 && a.is_finite());
        }
    }

    #[test]
    fn test_viscous_reduces_dt() {
        let raw = RectMeshGenerator::new(4, 4, 0.01, 0.01).build();
        let geometry = DualGeometry::build(&raw, &[]).unwrap();
        let gas = GasModel::new(&GasConfig::default());
        let mut state = FlowField::new(2, geometry.n_cells());
        state.initialize_uniform(
            &FaceState {
                density: 1.2,
                velocity: DVec3::new(10.0, 0.0, 0.0),
                pressure: 1e5,
            },
            &gas,
        );
        compute_local_time_steps(&geometry, &mut state, 1.0, false);
        let inviscid_dt = state.dt[5];
        compute_local_time_steps(&geometry, &mut state, 1.0, true);
        assert!(state.dt[5] < inviscid_dt);
    }

    #[test]
    fn test_cfl_controller() {
        let mut config = TimeConfig::default();
        config.cfl_init = 10.0;
        config.cfl_max = 40.0;
        config.cfl_growth = 2.0;
        config.cfl_cutback = 0.5;
        config.cfl_floor = 1.0;
        let mut controller = CflController::new(&config);

        controller.on_success();
        assert_eq!(controller.cfl(), 20.0);
        controller.on_success();
        controller.on_success();
        assert_eq!(controller.cfl(), 40.0); // 封顶

        for _ in 0..6 {
            controller.on_failure();
        }
        assert!(controller.collapsed());
    }
}
