// crates/af_physics/src/engine/mean.rs

//! 平均流求解器
//!
//! 一次非线性迭代的八个步骤：
//! 1. 由 U 重算原始变量
//! 2. 梯度、邻域极值与限制器（JST 路径改算无除数 Laplacian 与传感器）
//! 3. 残差与 Jacobian 清零
//! 4. 边循环：对流 + 粘性通量与 Jacobian 块，守恒地散入两侧
//! 5. 边界面循环：按虚状态/弱壁/强施加规则
//! 6. 局部时间步 Δt_i = CFL·V_i/(λ_inv + 4λ_visc)
//! 7. 隐式：M += V/Δt·I，解 M ΔU = −R，欠松弛更新并检查可容许性
//! 8. 显式：多级 RK 由外层 Integration 驱动（stage 更新在本模块）
//!
//! # 并行策略
//!
//! 边通量先并行算进逐边工作区，再按单元 gather（每单元只读
//! 关联边的结果，无写冲突，结果与边序无关）。Jacobian 散布与
//! 边界面循环串行，保证逐位可复现。

use glam::DVec3;
use rayon::prelude::*;

use af_config::{GradientKind, LimiterKind, SolverConfig, TimeIntegrationKind};
use af_foundation::KahanAccumulator;
use af_mesh::DualGeometry;

use crate::boundary::{resolve_markers, BoundaryCondition, ResolvedMarker};
use crate::error::SolverResult;
use crate::freestream::Freestream;
use crate::linalg::{BlockCsrMatrix, BlockPreconditioner, KrylovSolver, LinearSolveReport};
use crate::numerics::{compute_gradients, compute_limiters, reconstruct_edge_states};
use crate::schemes::{
    evaluate_viscous, ConvectiveFluxScheme, EdgeStencil, ViscousContext,
};
use crate::state::FlowField;
use crate::types::{pressure_derivative, var_zero, EdgeFlux, GasModel, MAX_NVAR};

use super::timestep::compute_local_time_steps;

/// 一次迭代的结果
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    /// 更新是否可容许（false 时状态已回滚）
    pub admissible: bool,
    /// 残差中出现 NaN
    pub nan: bool,
    /// 平均流残差 l2 范数（按变量）
    pub residuals: Vec<f64>,
    /// 线性求解报告（隐式）
    pub linear: Option<LinearSolveReport>,
}

/// 平均流求解器
pub struct MeanFlowSolver {
    gas: GasModel,
    n_dim: usize,
    scheme: ConvectiveFluxScheme,
    viscous: bool,
    muscl: bool,
    gradient_kind: GradientKind,
    limiter_kind: LimiterKind,
    venkat_k: f64,
    relaxation: f64,
    implicit: bool,
    freestream: Freestream,
    markers: Vec<ResolvedMarker>,
    /// (单元, 条件)：无滑移壁面节点
    strong_walls: Vec<(usize, BoundaryCondition)>,
    /// 双时间步的物理步长（BDF2 内迭代时为 Some）
    pub dual_time_dt: Option<f64>,

    /// 残差向量（R_i 累积离开单元 i 的通量）
    pub residual: Vec<f64>,
    edge_fluxes: Vec<EdgeFlux>,
    matrix: Option<BlockCsrMatrix>,
    preconditioner: BlockPreconditioner,
    krylov: KrylovSolver,
    delta_u: Vec<f64>,
    rhs: Vec<f64>,
    backup: Vec<f64>,
}

impl MeanFlowSolver {
    /// 构建求解器（标记解析、模式分配、缓冲准备）
    pub fn new(
        geometry: &DualGeometry,
        config: &SolverConfig,
        gas: GasModel,
        freestream: Freestream,
    ) -> SolverResult<Self> {
        let n_dim = geometry.n_dim();
        let n_var = n_dim + 2;
        let n_cells = geometry.n_cells();
        let markers = resolve_markers(geometry, &config.markers)?;
        let viscous = config.regime.is_viscous();

        let mut strong_walls = Vec::new();
        if viscous {
            for marker in &markers {
                if marker.condition.is_viscous_wall() {
                    for face in geometry.marker_faces(marker.marker) {
                        if !strong_walls.iter().any(|(c, _)| *c == face.cell) {
                            strong_walls.push((face.cell, marker.condition));
                        }
                    }
                }
            }
        }

        let implicit = matches!(
            config.time.integration,
            TimeIntegrationKind::ImplicitEuler | TimeIntegrationKind::DualTimeBdf2
        );
        let matrix = implicit.then(|| {
            BlockCsrMatrix::from_edges(
                n_cells,
                n_var,
                geometry.edges().iter().map(|e| (e.cell_i, e.cell_j)),
            )
        });

        Ok(Self {
            gas,
            n_dim,
            scheme: ConvectiveFluxScheme::from_config(&config.numerics, config.freestream.mach),
            viscous,
            muscl: config.numerics.muscl,
            gradient_kind: config.numerics.gradient,
            limiter_kind: config.numerics.limiter,
            venkat_k: config.numerics.limiter_coefficient,
            relaxation: config.time.relaxation,
            implicit,
            freestream,
            markers,
            strong_walls,
            dual_time_dt: None,
            residual: vec![0.0; n_cells * n_var],
            edge_fluxes: vec![EdgeFlux::default(); geometry.n_edges()],
            matrix,
            preconditioner: BlockPreconditioner::from_kind(config.linear_solver.preconditioner),
            krylov: KrylovSolver::new(config.linear_solver.clone()),
            delta_u: vec![0.0; n_cells * n_var],
            rhs: vec![0.0; n_cells * n_var],
            backup: vec![0.0; n_cells * n_var],
        })
    }

    /// 气体模型
    pub fn gas(&self) -> &GasModel {
        &self.gas
    }

    /// 来流
    pub fn freestream(&self) -> &Freestream {
        &self.freestream
    }

    /// 解析后的标记
    pub fn markers(&self) -> &[ResolvedMarker] {
        &self.markers
    }

    /// 是否含粘性通量
    pub fn is_viscous(&self) -> bool {
        self.viscous
    }

    /// 是否隐式推进
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// 是否需要 MUSCL 重构（JST 用中心值）
    fn muscl_active(&self) -> bool {
        self.muscl && !self.scheme.is_central()
    }

    // =========================================================================
    // 阶段 1-2: 原始变量、梯度、限制器、传感器
    // =========================================================================

    /// 相边界刷新：原始变量 + 重构所需派生场
    pub fn prepare(&mut self, geometry: &DualGeometry, state: &mut FlowField) {
        state.refresh_primitives(&self.gas);
        self.apply_strong_wall_state(state);

        let need_gradients = self.muscl_active() || self.viscous;
        if need_gradients {
            let n_prim = state.n_prim();
            let mut gradients = std::mem::take(&mut state.gradients);
            {
                let field = &*state;
                compute_gradients(
                    self.gradient_kind,
                    geometry,
                    n_prim,
                    |cell, k| field.primitive(cell, k),
                    &mut gradients,
                );
            }
            state.gradients = gradients;

            if self.muscl_active() {
                compute_limiters(self.limiter_kind, self.venkat_k, geometry, state);
            }
        }

        if self.scheme.is_central() {
            self.compute_undivided_laplacian(geometry, state);
        }
    }

    /// JST: 守恒变量的无除数 Laplacian 与压力传感器
    fn compute_undivided_laplacian(&self, geometry: &DualGeometry, state: &mut FlowField) {
        let n_var = state.n_var();
        let mut und_lapl = std::mem::take(&mut state.und_lapl);
        let mut sensor = std::mem::take(&mut state.sensor);
        let field = &*state;

        und_lapl
            .par_chunks_mut(n_var)
            .zip(sensor.par_iter_mut())
            .enumerate()
            .for_each(|(cell, (lapl, sens))| {
                lapl.fill(0.0);
                let own = field.cons(cell);
                let p_own = field.pressure[cell];
                let mut num = 0.0;
                let mut den = 0.0;
                for other in geometry.neighbors_of_cell(cell) {
                    let u_other = field.cons(other);
                    for k in 0..n_var {
                        lapl[k] += u_other[k] - own[k];
                    }
                    num += field.pressure[other] - p_own;
                    den += field.pressure[other] + p_own;
                }
                *sens = if den > 0.0 { num.abs() / den } else { 0.0 };
            });

        state.und_lapl = und_lapl;
        state.sensor = sensor;
    }

    // =========================================================================
    // 阶段 3-5: 残差与 Jacobian 装配
    // =========================================================================

    /// 装配残差（与可选的 Jacobian）
    pub fn compute_residual(
        &mut self,
        geometry: &DualGeometry,
        state: &FlowField,
        need_jacobian: bool,
    ) {
        let n_var = self.n_dim + 2;
        let n_prim = state.n_prim();
        self.residual.fill(0.0);
        let need_jacobian = need_jacobian && self.implicit;
        if need_jacobian {
            if let Some(matrix) = &mut self.matrix {
                matrix.clear();
            }
        }

        // ---- 逐边通量（并行） ----
        let mut edge_fluxes = std::mem::take(&mut self.edge_fluxes);
        {
            let gas = self.gas;
            let n_dim = self.n_dim;
            let scheme = &self.scheme;
            let viscous = self.viscous;
            let muscl = self.muscl_active();

            edge_fluxes.par_iter_mut().enumerate().for_each(|(e, out)| {
                let edge = geometry.edge(e);
                let (i, j) = (edge.cell_i, edge.cell_j);

                let (left, right) = reconstruct_edge_states(geometry, state, &gas, edge, muscl);
                let mut lapl_i = var_zero();
                let mut lapl_j = var_zero();
                lapl_i[..n_var].copy_from_slice(&state.und_lapl[i * n_var..(i + 1) * n_var]);
                lapl_j[..n_var].copy_from_slice(&state.und_lapl[j * n_var..(j + 1) * n_var]);
                let stencil = EdgeStencil {
                    left,
                    right,
                    state_i: state.face_state(i),
                    state_j: state.face_state(j),
                    lapl_i,
                    lapl_j,
                    sensor_i: state.sensor[i],
                    sensor_j: state.sensor[j],
                };
                scheme.evaluate(&gas, n_dim, &stencil, edge.normal, need_jacobian, out);

                if viscous {
                    let ctx = ViscousContext {
                        state_i: state.face_state(i),
                        state_j: state.face_state(j),
                        temperature_i: state.temperature[i],
                        temperature_j: state.temperature[j],
                        mu_laminar: 0.5 * (state.mu_laminar[i] + state.mu_laminar[j]),
                        mu_eddy: 0.5 * (state.mu_eddy[i] + state.mu_eddy[j]),
                        chord: geometry.cell_center(j) - geometry.cell_center(i),
                    };
                    let mut visc = EdgeFlux::default();
                    evaluate_viscous(
                        &gas,
                        n_dim,
                        &ctx,
                        &state.gradients[i * n_prim..(i + 1) * n_prim],
                        &state.gradients[j * n_prim..(j + 1) * n_prim],
                        edge.normal,
                        need_jacobian,
                        &mut visc,
                    );
                    for k in 0..n_var {
                        out.flux[k] -= visc.flux[k];
                    }
                    if need_jacobian {
                        for r in 0..n_var {
                            for c in 0..n_var {
                                out.jac_i[r][c] -= visc.jac_i[r][c];
                                out.jac_j[r][c] -= visc.jac_j[r][c];
                            }
                        }
                    }
                }
            });
        }

        // ---- 残差 gather（并行，逐单元只读关联边） ----
        self.residual
            .par_chunks_mut(n_var)
            .enumerate()
            .for_each(|(cell, r)| {
                for &e in geometry.edges_of_cell(cell) {
                    let edge = geometry.edge(e as usize);
                    let sign = edge.sign_for(cell);
                    let flux = &edge_fluxes[e as usize].flux;
                    for k in 0..n_var {
                        r[k] += sign * flux[k];
                    }
                }
            });

        // ---- Jacobian 散布（串行，确定性） ----
        if need_jacobian {
            let matrix = self.matrix.as_mut().expect("隐式模式必有矩阵");
            let sz = n_var * n_var;
            let mut flat = vec![0.0; sz];
            for (e, out) in edge_fluxes.iter().enumerate() {
                let edge = geometry.edge(e);
                let (i, j) = (edge.cell_i, edge.cell_j);
                flatten(&out.jac_i, n_var, &mut flat);
                matrix.add_block(i, i, &flat, 1.0);
                matrix.add_block(j, i, &flat, -1.0);
                flatten(&out.jac_j, n_var, &mut flat);
                matrix.add_block(i, j, &flat, 1.0);
                matrix.add_block(j, j, &flat, -1.0);
            }
        }
        self.edge_fluxes = edge_fluxes;

        // ---- 边界面 ----
        self.apply_boundary_conditions(geometry, state, need_jacobian);

        // ---- 双时间步 BDF2 源项 ----
        if let Some(dt_phys) = self.dual_time_dt {
            self.add_dual_time_source(geometry, state, dt_phys, need_jacobian);
        }

        // ---- 强施加行清零 ----
        self.clear_strong_wall_rows(need_jacobian);
    }

    /// 边界面通量（串行）
    fn apply_boundary_conditions(
        &mut self,
        geometry: &DualGeometry,
        state: &FlowField,
        need_jacobian: bool,
    ) {
        let n_var = self.n_dim + 2;
        let gas = self.gas;
        let n_dim = self.n_dim;
        let sz = n_var * n_var;
        let mut flat = vec![0.0; sz];

        for marker_idx in 0..self.markers.len() {
            let marker = self.markers[marker_idx].clone();
            for face in geometry.marker_faces(marker.marker) {
                let cell = face.cell;
                let interior = state.face_state(cell);

                match marker.condition {
                    BoundaryCondition::InviscidWall | BoundaryCondition::Symmetry => {
                        // 零质量通量，动量取压力项
                        let pressure = interior.pressure;
                        for d in 0..n_dim {
                            self.residual[cell * n_var + 1 + d] += pressure * face.normal[d];
                        }
                        if need_jacobian {
                            let dp = pressure_derivative(&interior, &gas, n_dim);
                            let mut jac = [[0.0; MAX_NVAR]; MAX_NVAR];
                            for d in 0..n_dim {
                                for k in 0..n_var {
                                    jac[1 + d][k] = dp[k] * face.normal[d];
                                }
                            }
                            flatten(&jac, n_var, &mut flat);
                            self.matrix
                                .as_mut()
                                .expect("隐式模式必有矩阵")
                                .add_block(cell, cell, &flat, 1.0);
                        }
                    }

                    BoundaryCondition::WallHeatflux { heat_flux } => {
                        // 无滑移下对流通量为零；能量方程加给定热流
                        self.residual[cell * n_var + n_var - 1] -= heat_flux * face.area();
                    }

                    BoundaryCondition::WallIsothermal { .. } => {
                        // 动量与能量行均强施加，此处无通量贡献
                    }

                    _ => {
                        // 虚状态 + 对流格式
                        let ghost = marker
                            .condition
                            .ghost_state(&interior, &gas, &self.freestream)
                            .expect("虚状态类边界");
                        let stencil = crate::schemes::stencil_from_states(interior, ghost);
                        let mut out = EdgeFlux::default();
                        self.scheme.evaluate(
                            &gas,
                            n_dim,
                            &stencil,
                            face.normal,
                            need_jacobian,
                            &mut out,
                        );
                        for k in 0..n_var {
                            self.residual[cell * n_var + k] += out.flux[k];
                        }
                        if need_jacobian {
                            flatten(&out.jac_i, n_var, &mut flat);
                            self.matrix
                                .as_mut()
                                .expect("隐式模式必有矩阵")
                                .add_block(cell, cell, &flat, 1.0);
                        }
                    }
                }
            }
        }
    }

    /// BDF2: R += V/Δt (3/2 U − 2 Uⁿ + 1/2 Uⁿ⁻¹)，对角 += 3/2 V/Δt
    fn add_dual_time_source(
        &mut self,
        geometry: &DualGeometry,
        state: &FlowField,
        dt_phys: f64,
        need_jacobian: bool,
    ) {
        let n_var = self.n_dim + 2;
        for cell in 0..geometry.n_cells() {
            let factor = geometry.volume(cell) / dt_phys;
            for k in 0..n_var {
                let idx = cell * n_var + k;
                self.residual[idx] += factor
                    * (1.5 * state.conservative[idx] - 2.0 * state.time_n[idx]
                        + 0.5 * state.time_n1[idx]);
            }
            if need_jacobian {
                self.matrix
                    .as_mut()
                    .expect("隐式模式必有矩阵")
                    .add_diag_scalar(cell, 1.5 * factor);
            }
        }
    }

    /// 无滑移壁面的强施加：清残差行，Jacobian 行置单位
    fn clear_strong_wall_rows(&mut self, need_jacobian: bool) {
        let n_var = self.n_dim + 2;
        for &(cell, condition) in &self.strong_walls {
            let isothermal = matches!(condition, BoundaryCondition::WallIsothermal { .. });
            let row_end = if isothermal { n_var } else { n_var - 1 };
            for k in 1..row_end {
                self.residual[cell * n_var + k] = 0.0;
            }
            if need_jacobian {
                if let Some(matrix) = &mut self.matrix {
                    let start = matrix.row_ptr()[cell];
                    let end = matrix.row_ptr()[cell + 1];
                    let diag = matrix.diag_idx()[cell];
                    for idx in start..end {
                        let block = matrix.block_mut(idx);
                        for k in 1..row_end {
                            for c in 0..n_var {
                                block[k * n_var + c] = 0.0;
                            }
                        }
                        if idx == diag {
                            for k in 1..row_end {
                                block[k * n_var + k] = 1.0;
                            }
                        }
                    }
                }
            }
        }
    }

    /// 无滑移壁面的状态强施加（速度清零，等温壁固定温度）
    pub fn apply_strong_wall_state(&self, state: &mut FlowField) {
        let n_dim = self.n_dim;
        let n_var = n_dim + 2;
        let gas = self.gas;
        for &(cell, condition) in &self.strong_walls {
            let density = state.conservative[cell * n_var];
            for d in 0..n_dim {
                state.conservative[cell * n_var + 1 + d] = 0.0;
            }
            state.velocity[cell] = DVec3::ZERO;
            match condition {
                BoundaryCondition::WallIsothermal { temperature } => {
                    // v = 0: ρE = ρ cv T
                    state.conservative[cell * n_var + n_var - 1] =
                        density * gas.cv() * temperature;
                    state.temperature[cell] = temperature;
                    state.pressure[cell] = density * gas.gas_constant * temperature;
                    state.sound_speed[cell] = gas.sound_speed(state.pressure[cell], density);
                    state.mu_laminar[cell] = gas.laminar_viscosity(temperature);
                }
                _ => {
                    // 绝热壁：能量保持，压力/温度按 v=0 重算
                    let energy = state.conservative[cell * n_var + n_var - 1];
                    let pressure = (gas.gamma - 1.0) * energy;
                    state.pressure[cell] = pressure;
                    state.temperature[cell] = gas.temperature(pressure, density);
                    state.sound_speed[cell] = gas.sound_speed(pressure, density);
                    state.mu_laminar[cell] = gas.laminar_viscosity(state.temperature[cell]);
                }
            }
        }
    }

    // =========================================================================
    // 阶段 6-8: 时间推进
    // =========================================================================

    /// 一次完整的隐式迭代
    pub fn iterate(
        &mut self,
        geometry: &DualGeometry,
        state: &mut FlowField,
        cfl: f64,
    ) -> IterationOutcome {
        self.prepare(geometry, state);
        compute_local_time_steps(geometry, state, cfl, self.viscous);
        self.compute_residual(geometry, state, true);

        let residuals = self.residual_norms();
        let nan = residuals.iter().any(|r| !r.is_finite());
        if nan {
            return IterationOutcome {
                admissible: false,
                nan: true,
                residuals,
                linear: None,
            };
        }

        let linear = self.implicit_solve(geometry, state);
        let admissible = self.try_update(state);
        IterationOutcome {
            admissible,
            nan: false,
            residuals,
            linear: Some(linear),
        }
    }

    /// 隐式系统装配收尾与线性求解
    fn implicit_solve(
        &mut self,
        geometry: &DualGeometry,
        state: &FlowField,
    ) -> LinearSolveReport {
        let matrix = self.matrix.as_mut().expect("隐式模式必有矩阵");

        // 对角时间项 V/Δt
        for cell in 0..geometry.n_cells() {
            matrix.add_diag_scalar(cell, geometry.volume(cell) / state.dt[cell]);
        }

        self.preconditioner.setup(matrix);
        for (rhs, r) in self.rhs.iter_mut().zip(self.residual.iter()) {
            *rhs = -r;
        }
        self.delta_u.fill(0.0);
        self.krylov
            .solve(matrix, &self.preconditioner, &self.rhs, &mut self.delta_u)
    }

    /// 欠松弛更新 + 可容许性检查（违规则折半重试，最终回滚）
    fn try_update(&mut self, state: &mut FlowField) -> bool {
        let n_var = self.n_dim + 2;
        self.backup.copy_from_slice(&state.conservative);

        let mut omega = self.relaxation;
        for _attempt in 0..3 {
            for (u, (&u0, &du)) in state
                .conservative
                .iter_mut()
                .zip(self.backup.iter().zip(self.delta_u.iter()))
            {
                *u = u0 + omega * du;
            }
            let gas = self.gas;
            let bad = state
                .conservative
                .par_chunks(n_var)
                .filter(|u| !state.is_admissible(u, &gas))
                .count();
            if bad == 0 {
                self.apply_strong_wall_state(state);
                return true;
            }
            tracing::debug!(omega, bad, "非可容许更新，折半欠松弛");
            omega *= 0.5;
        }

        state.conservative.copy_from_slice(&self.backup);
        false
    }

    /// 显式 RK 的一级更新：U = U_old − α Δt/V · R（逐单元可容许性截断）
    pub fn explicit_stage_update(
        &mut self,
        geometry: &DualGeometry,
        state: &mut FlowField,
        alpha: f64,
    ) -> usize {
        let n_var = self.n_dim + 2;
        let gas = self.gas;
        let mut clipped = 0usize;
        for cell in 0..geometry.n_cells() {
            let factor = alpha * state.dt[cell] / geometry.volume(cell);
            let mut candidate = [0.0_f64; MAX_NVAR];
            for k in 0..n_var {
                candidate[k] = state.conservative_old[cell * n_var + k]
                    - factor * self.residual[cell * n_var + k];
            }
            if state.is_admissible(&candidate[..n_var], &gas) {
                state.conservative[cell * n_var..(cell + 1) * n_var]
                    .copy_from_slice(&candidate[..n_var]);
            } else {
                // 截断：保持旧状态
                let old = &state.conservative_old[cell * n_var..(cell + 1) * n_var];
                let dst_range = cell * n_var..(cell + 1) * n_var;
                state.conservative[dst_range].copy_from_slice(old);
                clipped += 1;
            }
        }
        self.apply_strong_wall_state(state);
        clipped
    }

    /// 残差 l2 范数（按变量，Kahan 归约）
    pub fn residual_norms(&self) -> Vec<f64> {
        let n_var = self.n_dim + 2;
        let mut acc = vec![KahanAccumulator::new(); n_var];
        for chunk in self.residual.chunks(n_var) {
            for (k, &r) in chunk.iter().enumerate() {
                acc[k].add(r * r);
            }
        }
        acc.into_iter().map(|a| a.value().sqrt()).collect()
    }
}

/// VarMat -> 行主序扁平块
fn flatten(jac: &[[f64; MAX_NVAR]; MAX_NVAR], n_var: usize, out: &mut [f64]) {
    for r in 0..n_var {
        for c in 0..n_var {
            out[r * n_var + c] = jac[r][c];
        }
    }
}
