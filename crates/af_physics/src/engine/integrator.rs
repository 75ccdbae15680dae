// crates/af_physics/src/engine/integrator.rs

//! 外层时间推进
//!
//! - 定常伪时间：反复调用平均流/湍流迭代，直到残差降到目标量级、
//!   达到迭代上限、或 CFL 跌破下限（发散）
//! - 非定常双时间步：外层物理步加 BDF2 时间导数，内层伪时间收敛
//! - CFL 自适应：成功迭代增长，发散检测（非可容许更新、线性求解
//!   停滞、残差 NaN）回退
//!
//! 取消：每个外层迭代边界协作式检查调用方提供的停止标志。

use std::sync::atomic::{AtomicBool, Ordering};

use af_config::{SolverConfig, TimeConfig, TimeIntegrationKind};
use af_mesh::DualGeometry;

use crate::engine::forces::compute_force_coefficients;
use crate::engine::mean::{IterationOutcome, MeanFlowSolver};
use crate::engine::monitor::{IterationRecord, MonitorSink};
use crate::engine::timestep::{compute_local_time_steps, CflController};
use crate::engine::turb::TurbulenceSolver;
use crate::error::{SolverError, SolverResult};
use crate::linalg::LinearSolveStatus;
use crate::state::{FlowField, TurbField};

/// 运行结束报告
#[derive(Debug, Clone)]
pub struct RunReport {
    /// 是否达到收敛目标
    pub converged: bool,
    /// 执行的外层迭代数
    pub iterations: usize,
    /// 最终残差范数
    pub final_residuals: Vec<f64>,
    /// 结束原因描述
    pub reason: String,
}

/// 外层推进器
pub struct Integration {
    time: TimeConfig,
    reference: af_config::ReferenceConfig,
    cfl: CflController,
    iteration: usize,
}

impl Integration {
    /// 由配置构造
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            time: config.time.clone(),
            reference: config.reference.clone(),
            cfl: CflController::new(&config.time),
            iteration: 0,
        }
    }

    /// 当前 CFL
    pub fn cfl(&self) -> f64 {
        self.cfl.cfl()
    }

    /// 已执行迭代数
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// 按配置模式运行到结束
    pub fn run(
        &mut self,
        geometry: &DualGeometry,
        mean: &mut MeanFlowSolver,
        mut turbulence: Option<(&mut TurbulenceSolver, &mut TurbField)>,
        state: &mut FlowField,
        monitor: &mut dyn MonitorSink,
        stop: Option<&AtomicBool>,
    ) -> SolverResult<RunReport> {
        match self.time.integration {
            TimeIntegrationKind::DualTimeBdf2 => {
                self.run_dual_time(geometry, mean, &mut turbulence, state, monitor, stop)
            }
            _ => self.run_steady(
                geometry,
                mean,
                &mut turbulence,
                state,
                monitor,
                stop,
                self.time.max_iterations,
                0.0,
            ),
        }
    }

    /// 定常伪时间推进（亦作双时间步的内迭代）
    #[allow(clippy::too_many_arguments)]
    fn run_steady(
        &mut self,
        geometry: &DualGeometry,
        mean: &mut MeanFlowSolver,
        turbulence: &mut Option<(&mut TurbulenceSolver, &mut TurbField)>,
        state: &mut FlowField,
        monitor: &mut dyn MonitorSink,
        stop: Option<&AtomicBool>,
        max_iterations: usize,
        physical_time: f64,
    ) -> SolverResult<RunReport> {
        let mut initial_density_residual: Option<f64> = None;
        let mut consecutive_failures = 0usize;
        let mut last_residuals = Vec::new();
        let monitored = mean.markers().iter().any(|m| m.monitored);

        for _ in 0..max_iterations {
            if let Some(flag) = stop {
                if flag.load(Ordering::Relaxed) {
                    return Ok(RunReport {
                        converged: false,
                        iterations: self.iteration,
                        final_residuals: last_residuals,
                        reason: "外部取消".into(),
                    });
                }
            }
            self.iteration += 1;

            let outcome = match self.time.integration {
                TimeIntegrationKind::ExplicitRk => self.explicit_step(geometry, mean, state),
                _ => mean.iterate(geometry, state, self.cfl.cfl()),
            };

            // ---- 发散检测 ----
            let linear_failed = outcome
                .linear
                .as_ref()
                .map(|l| {
                    matches!(
                        l.status,
                        LinearSolveStatus::Stagnated | LinearSolveStatus::Breakdown
                    )
                })
                .unwrap_or(false);

            if outcome.nan {
                consecutive_failures += 1;
                self.cfl.on_failure();
                if self.cfl.collapsed() {
                    return Err(SolverError::Diverged {
                        reason: "残差出现 NaN 且 CFL 跌破下限".into(),
                        iteration: self.iteration,
                        cfl: self.cfl.cfl(),
                    });
                }
                continue;
            }
            if !outcome.admissible {
                consecutive_failures += 1;
                self.cfl.on_failure();
                if self.cfl.collapsed() {
                    return Err(SolverError::Diverged {
                        reason: "非可容许状态反复出现，CFL 跌破下限".into(),
                        iteration: self.iteration,
                        cfl: self.cfl.cfl(),
                    });
                }
                if consecutive_failures > self.time.max_admissibility_retries {
                    return Err(SolverError::NonAdmissible {
                        n_cells: consecutive_failures,
                        first_cell: 0,
                    });
                }
                continue;
            }

            // 更新被接受；线性停滞只回退 CFL
            consecutive_failures = 0;
            if linear_failed {
                self.cfl.on_failure();
                if self.cfl.collapsed() {
                    return Err(SolverError::Diverged {
                        reason: "线性求解器反复停滞，CFL 跌破下限".into(),
                        iteration: self.iteration,
                        cfl: self.cfl.cfl(),
                    });
                }
            } else {
                self.cfl.on_success();
            }

            // ---- 湍流子迭代（松耦合：平均流已更新） ----
            let turb_residuals = if let Some((solver, field)) = turbulence.as_mut() {
                let turb_outcome = solver.iterate(geometry, state, field);
                turb_outcome.residuals
            } else {
                Vec::new()
            };

            last_residuals = outcome.residuals.clone();

            // ---- 监视 ----
            let forces = monitored.then(|| {
                compute_force_coefficients(
                    geometry,
                    state,
                    mean.markers(),
                    mean.freestream(),
                    &self.reference,
                    mean.is_viscous(),
                )
            });
            monitor.record(&IterationRecord {
                iteration: self.iteration,
                time: physical_time,
                cfl: self.cfl.cfl(),
                residuals: outcome.residuals.clone(),
                turb_residuals,
                linear_iterations: outcome.linear.as_ref().map(|l| l.iterations),
                forces,
            });

            // ---- 收敛判定（密度残差下降量级） ----
            let density_residual = outcome.residuals[0].max(1e-300);
            let reference = *initial_density_residual.get_or_insert(density_residual);
            if reference > 0.0
                && (reference / density_residual).log10() >= self.time.convergence_order
            {
                return Ok(RunReport {
                    converged: true,
                    iterations: self.iteration,
                    final_residuals: outcome.residuals,
                    reason: format!(
                        "密度残差下降 {:.1} 个量级",
                        (reference / density_residual).log10()
                    ),
                });
            }
        }

        Ok(RunReport {
            converged: false,
            iterations: self.iteration,
            final_residuals: last_residuals,
            reason: "达到迭代上限".into(),
        })
    }

    /// 显式多级 Runge-Kutta 一步
    fn explicit_step(
        &self,
        geometry: &DualGeometry,
        mean: &mut MeanFlowSolver,
        state: &mut FlowField,
    ) -> IterationOutcome {
        mean.prepare(geometry, state);
        compute_local_time_steps(geometry, state, self.cfl.cfl(), mean.is_viscous());
        state.push_old();

        let stages = self.time.rk_stages();
        let mut clipped = 0usize;
        for (stage, &alpha) in stages.iter().enumerate() {
            if stage > 0 {
                mean.prepare(geometry, state);
            }
            mean.compute_residual(geometry, state, false);
            clipped += mean.explicit_stage_update(geometry, state, alpha);
        }
        if clipped > 0 {
            tracing::debug!(clipped, "显式更新截断单元数");
        }

        let residuals = mean.residual_norms();
        let nan = residuals.iter().any(|r| !r.is_finite());
        IterationOutcome {
            admissible: true,
            nan,
            residuals,
            linear: None,
        }
    }

    /// 双时间步 BDF2 外层
    fn run_dual_time(
        &mut self,
        geometry: &DualGeometry,
        mean: &mut MeanFlowSolver,
        turbulence: &mut Option<(&mut TurbulenceSolver, &mut TurbField)>,
        state: &mut FlowField,
        monitor: &mut dyn MonitorSink,
        stop: Option<&AtomicBool>,
    ) -> SolverResult<RunReport> {
        let dt = self.time.dt_physical;
        state.enable_dual_time();
        mean.dual_time_dt = Some(dt);

        let mut last = RunReport {
            converged: true,
            iterations: 0,
            final_residuals: Vec::new(),
            reason: "无物理步".into(),
        };

        for step in 1..=self.time.n_physical_steps {
            if let Some(flag) = stop {
                if flag.load(Ordering::Relaxed) {
                    break;
                }
            }
            let physical_time = step as f64 * dt;
            last = self.run_steady(
                geometry,
                mean,
                turbulence,
                state,
                monitor,
                stop,
                self.time.inner_iterations,
                physical_time,
            )?;
            state.rotate_time_levels();
            tracing::debug!(
                step,
                time = physical_time,
                inner_converged = last.converged,
                "物理时间步完成"
            );
        }

        mean.dual_time_dt = None;
        Ok(RunReport {
            converged: last.converged,
            iterations: self.iteration,
            final_residuals: last.final_residuals,
            reason: "物理时间步推进完成".into(),
        })
    }
}
