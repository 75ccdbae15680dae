// crates/af_physics/src/engine/turb.rs

//! 湍流方程求解器
//!
//! 与平均流同构的非线性迭代，块大小 1（SA）或 2（SST）。
//! 每个子迭代单向耦合：湍流方程看到当前平均流原始变量与梯度，
//! 平均流下一迭代才看到更新后的 μ_t。
//!
//! 离散：一阶迎风对流（按平均流法向速度）、
//! 带边方向修正的扩散、逐单元源项（破坏项对角线化）。
//! 始终隐式推进，局部时间步与平均流共享。

use glam::DVec3;

use af_config::{GradientKind, SolverConfig};
use af_foundation::KahanAccumulator;
use af_mesh::DualGeometry;

use crate::boundary::ResolvedMarker;
use crate::error::SolverResult;
use crate::freestream::Freestream;
use crate::linalg::{BlockCsrMatrix, BlockPreconditioner, KrylovSolver, LinearSolveReport};
use crate::numerics::compute_gradients;
use crate::state::{FlowField, TurbField};
use crate::turbulence::{TurbCellContext, TurbulenceModel, MAX_NTURB};
use crate::types::GasModel;

/// 湍流迭代结果
#[derive(Debug, Clone)]
pub struct TurbOutcome {
    /// 残差 l2 范数（按变量）
    pub residuals: Vec<f64>,
    /// 线性求解报告
    pub linear: LinearSolveReport,
}

/// 湍流求解器
pub struct TurbulenceSolver {
    model: TurbulenceModel,
    n_dim: usize,
    n_var: usize,
    gas: GasModel,
    gradient_kind: GradientKind,
    freestream_values: [f64; MAX_NTURB],
    /// 变量下限（来流值的小数倍，保持正性）
    floors: [f64; MAX_NTURB],
    markers: Vec<ResolvedMarker>,
    /// 无滑移壁面单元与其最近邻距离（SST ω 壁值）
    wall_cells: Vec<(usize, f64)>,

    /// 残差
    pub residual: Vec<f64>,
    matrix: BlockCsrMatrix,
    preconditioner: BlockPreconditioner,
    krylov: KrylovSolver,
    delta: Vec<f64>,
    rhs: Vec<f64>,
}

impl TurbulenceSolver {
    /// 构建（`markers` 来自平均流的解析结果）
    pub fn new(
        geometry: &DualGeometry,
        config: &SolverConfig,
        gas: GasModel,
        freestream: &Freestream,
        model: TurbulenceModel,
        markers: &[ResolvedMarker],
    ) -> SolverResult<Self> {
        let n_var = model.n_var();
        let n_cells = geometry.n_cells();
        let freestream_values = model.freestream_values(freestream, &gas);
        let mut floors = [0.0; MAX_NTURB];
        for k in 0..n_var {
            floors[k] = 1e-8 * freestream_values[k].abs();
        }

        let mut wall_cells = Vec::new();
        for marker in markers {
            if marker.condition.is_viscous_wall() {
                for face in geometry.marker_faces(marker.marker) {
                    let cell = face.cell;
                    if wall_cells.iter().any(|(c, _)| *c == cell) {
                        continue;
                    }
                    let spacing = geometry
                        .neighbors_of_cell(cell)
                        .map(|n| (geometry.cell_center(n) - geometry.cell_center(cell)).length())
                        .fold(f64::MAX, f64::min);
                    wall_cells.push((cell, spacing));
                }
            }
        }

        Ok(Self {
            model,
            n_dim: geometry.n_dim(),
            n_var,
            gas,
            gradient_kind: config.numerics.gradient,
            freestream_values,
            floors,
            markers: markers.to_vec(),
            wall_cells,
            residual: vec![0.0; n_cells * n_var],
            matrix: BlockCsrMatrix::from_edges(
                n_cells,
                n_var,
                geometry.edges().iter().map(|e| (e.cell_i, e.cell_j)),
            ),
            preconditioner: BlockPreconditioner::from_kind(config.linear_solver.preconditioner),
            krylov: KrylovSolver::new(config.linear_solver.clone()),
            delta: vec![0.0; n_cells * n_var],
            rhs: vec![0.0; n_cells * n_var],
        })
    }

    /// 模型
    pub fn model(&self) -> &TurbulenceModel {
        &self.model
    }

    /// 按来流初始化并回写 μ_t
    pub fn initialize(&self, geometry: &DualGeometry, flow: &mut FlowField, turb: &mut TurbField) {
        let n_var = self.n_var;
        for cell in 0..geometry.n_cells() {
            for k in 0..n_var {
                turb.set_var(cell, k, self.freestream_values[k]);
            }
        }
        self.apply_wall_values(flow, turb);
        turb.push_old();
        self.update_eddy_viscosity(geometry, flow, turb);
    }

    /// 单元上下文
    fn cell_context(&self, flow: &FlowField, turb: &TurbField, geometry: &DualGeometry, cell: usize) -> TurbCellContext {
        let n_prim = flow.n_prim();
        let mut velocity_gradients = [DVec3::ZERO; 3];
        for d in 0..self.n_dim {
            velocity_gradients[d] = flow.gradients[cell * n_prim + 1 + d];
        }
        let mut vars = [0.0; MAX_NTURB];
        let mut var_gradients = [DVec3::ZERO; MAX_NTURB];
        for k in 0..self.n_var {
            vars[k] = turb.var(cell, k);
            var_gradients[k] = turb.gradient(cell, k);
        }
        TurbCellContext {
            n_dim: self.n_dim,
            density: flow.density[cell],
            mu_laminar: flow.mu_laminar[cell],
            wall_distance: geometry.wall_distance(cell),
            velocity_gradients,
            vars,
            var_gradients,
            f1: turb.f1[cell],
        }
    }

    /// 一次隐式湍流子迭代
    pub fn iterate(
        &mut self,
        geometry: &DualGeometry,
        flow: &mut FlowField,
        turb: &mut TurbField,
    ) -> TurbOutcome {
        let n_var = self.n_var;
        let n_cells = geometry.n_cells();

        // 梯度
        {
            let mut gradients = std::mem::take(&mut turb.gradients);
            let field = &*turb;
            compute_gradients(
                self.gradient_kind,
                geometry,
                n_var,
                |cell, k| field.var(cell, k),
                &mut gradients,
            );
            turb.gradients = gradients;
        }

        // SST 混合函数缓存
        if let TurbulenceModel::Sst(model) = self.model {
            for cell in 0..n_cells {
                let ctx = self.cell_context(flow, turb, geometry, cell);
                let (f1, f2) = model.blending(&ctx);
                turb.f1[cell] = f1;
                turb.f2[cell] = f2;
            }
        }

        // 装配
        self.residual.fill(0.0);
        self.matrix.clear();
        self.assemble_edges(geometry, flow, turb);
        self.assemble_sources(geometry, flow, turb);
        self.assemble_boundary(geometry, flow, turb);
        self.clear_wall_rows();

        // 时间项（与平均流共享局部 Δt）
        for cell in 0..n_cells {
            self.matrix
                .add_diag_scalar(cell, geometry.volume(cell) / flow.dt[cell]);
        }

        let residuals = self.residual_norms();

        // 线性求解与正性截断更新
        self.preconditioner.setup(&self.matrix);
        for (rhs, r) in self.rhs.iter_mut().zip(self.residual.iter()) {
            *rhs = -r;
        }
        self.delta.fill(0.0);
        let linear = self
            .krylov
            .solve(&self.matrix, &self.preconditioner, &self.rhs, &mut self.delta);

        turb.push_old();
        for cell in 0..n_cells {
            for k in 0..n_var {
                let idx = cell * n_var + k;
                let candidate = turb.vars[idx] + self.delta[idx];
                turb.vars[idx] = candidate.max(self.floors[k]);
            }
        }
        self.apply_wall_values(flow, turb);
        self.update_eddy_viscosity(geometry, flow, turb);

        TurbOutcome { residuals, linear }
    }

    /// 边循环：一阶迎风对流 + 扩散
    fn assemble_edges(&mut self, geometry: &DualGeometry, flow: &FlowField, turb: &TurbField) {
        let n_var = self.n_var;
        let sz = n_var * n_var;
        let mut block_i = vec![0.0; sz];
        let mut block_j = vec![0.0; sz];

        for e in 0..geometry.n_edges() {
            let edge = geometry.edge(e);
            let (i, j) = (edge.cell_i, edge.cell_j);
            let area = edge.area();
            let chord = geometry.cell_center(j) - geometry.cell_center(i);
            let length = chord.length();
            let tangent = chord / length;

            // 平均流法向速度（对流）
            let vn = 0.5 * (flow.velocity[i] + flow.velocity[j]).dot(edge.normal);

            let mu_lam_face = 0.5 * (flow.mu_laminar[i] + flow.mu_laminar[j]);
            let mu_eddy_face = 0.5 * (flow.mu_eddy[i] + flow.mu_eddy[j]);
            let rho_face = 0.5 * (flow.density[i] + flow.density[j]);
            let f1_face = 0.5 * (turb.f1[i] + turb.f1[j]);

            block_i.fill(0.0);
            block_j.fill(0.0);

            for k in 0..n_var {
                let phi_i = turb.var(i, k);
                let phi_j = turb.var(j, k);

                // 迎风对流
                let convective = if vn >= 0.0 { vn * phi_i } else { vn * phi_j };

                // 扩散（面梯度沿边方向修正后的法向分量）
                let var_face = 0.5 * (phi_i + phi_j);
                let diffusivity = self.model.diffusivity(
                    k,
                    var_face,
                    mu_lam_face,
                    mu_eddy_face,
                    rho_face,
                    f1_face,
                );
                let mut grad_face = 0.5 * (turb.gradient(i, k) + turb.gradient(j, k));
                let dphi_dl = (phi_j - phi_i) / length;
                grad_face -= (grad_face.dot(tangent) - dphi_dl) * tangent;
                let diffusive = diffusivity * grad_face.dot(edge.normal);

                let flux = convective - diffusive;
                self.residual[i * n_var + k] += flux;
                self.residual[j * n_var + k] -= flux;

                // Jacobian: 迎风 + 标量 Laplacian
                let diff_coeff = diffusivity * area / length;
                block_i[k * n_var + k] = vn.max(0.0) + diff_coeff;
                block_j[k * n_var + k] = vn.min(0.0) - diff_coeff;
            }

            self.matrix.add_block(i, i, &block_i, 1.0);
            self.matrix.add_block(i, j, &block_j, 1.0);
            self.matrix.add_block(j, i, &block_i, -1.0);
            self.matrix.add_block(j, j, &block_j, -1.0);
        }
    }

    /// 源项：R -= S·V，对角 += −∂S/∂φ·V
    fn assemble_sources(&mut self, geometry: &DualGeometry, flow: &FlowField, turb: &TurbField) {
        let n_var = self.n_var;
        let sz = n_var * n_var;
        let mut block = vec![0.0; sz];
        for cell in 0..geometry.n_cells() {
            let volume = geometry.volume(cell);
            let ctx = self.cell_context(flow, turb, geometry, cell);
            let source = self.model.source(&ctx);
            for k in 0..n_var {
                self.residual[cell * n_var + k] -= source.value[k] * volume;
            }
            block.fill(0.0);
            for r in 0..n_var {
                for c in 0..n_var {
                    block[r * n_var + c] = -source.jacobian[r][c] * volume;
                }
            }
            self.matrix.add_block(cell, cell, &block, 1.0);
        }
    }

    /// 边界面：入流取来流值，出流外推（迎风）
    fn assemble_boundary(&mut self, geometry: &DualGeometry, flow: &FlowField, turb: &TurbField) {
        let n_var = self.n_var;
        for marker_idx in 0..self.markers.len() {
            let marker = &self.markers[marker_idx];
            if !marker.condition.uses_ghost_scheme() {
                // 壁面/对称面：无对流通量（法向速度弱为零），
                // 无滑移壁的变量行强施加
                continue;
            }
            let marker_id = marker.marker;
            for face in geometry.marker_faces(marker_id) {
                let cell = face.cell;
                let vn = flow.velocity[cell].dot(face.normal);
                for k in 0..n_var {
                    let flux = if vn >= 0.0 {
                        vn * turb.var(cell, k)
                    } else {
                        vn * self.freestream_values[k]
                    };
                    self.residual[cell * n_var + k] += flux;
                }
                if vn >= 0.0 {
                    let mut block = vec![0.0; n_var * n_var];
                    for k in 0..n_var {
                        block[k * n_var + k] = vn;
                    }
                    self.matrix.add_block(cell, cell, &block, 1.0);
                }
            }
        }
    }

    /// 无滑移壁面行清零，对角置单位
    fn clear_wall_rows(&mut self) {
        let n_var = self.n_var;
        for &(cell, _) in &self.wall_cells {
            for k in 0..n_var {
                self.residual[cell * n_var + k] = 0.0;
            }
            let start = self.matrix.row_ptr()[cell];
            let end = self.matrix.row_ptr()[cell + 1];
            let diag = self.matrix.diag_idx()[cell];
            for idx in start..end {
                let block = self.matrix.block_mut(idx);
                block.fill(0.0);
                if idx == diag {
                    for k in 0..n_var {
                        block[k * n_var + k] = 1.0;
                    }
                }
            }
        }
    }

    /// 壁面变量强施加
    fn apply_wall_values(&self, flow: &FlowField, turb: &mut TurbField) {
        for &(cell, spacing) in &self.wall_cells {
            let values =
                self.model
                    .wall_values(flow.mu_laminar[cell], flow.density[cell], spacing);
            for k in 0..self.n_var {
                turb.set_var(cell, k, values[k]);
            }
        }
    }

    /// 回写涡粘到平均流
    pub fn update_eddy_viscosity(
        &self,
        geometry: &DualGeometry,
        flow: &mut FlowField,
        turb: &TurbField,
    ) {
        for cell in 0..geometry.n_cells() {
            let ctx = self.cell_context(flow, turb, geometry, cell);
            flow.mu_eddy[cell] = self.model.eddy_viscosity(&ctx, turb.f2[cell]);
        }
    }

    /// 残差 l2 范数
    pub fn residual_norms(&self) -> Vec<f64> {
        let n_var = self.n_var;
        let mut acc = vec![KahanAccumulator::new(); n_var];
        for chunk in self.residual.chunks(n_var) {
            for (k, &r) in chunk.iter().enumerate() {
                acc[k].add(r * r);
            }
        }
        acc.into_iter().map(|a| a.value().sqrt()).collect()
    }
}
