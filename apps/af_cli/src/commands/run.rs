// apps/af_cli/src/commands/run.rs

//! run 子命令：读配置、建几何、推进到收敛、写输出

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{error, info, warn};

use af_config::SolverConfig;
use af_io::{read_raw_mesh, write_vtk, Checkpoint, CsvHistory};
use af_mesh::{DualGeometry, RawMesh};
use af_physics::boundary::wall_marker_names;
use af_physics::engine::{
    Integration, IterationRecord, MonitorSink, TracingMonitor, TurbulenceSolver,
};
use af_physics::engine::MeanFlowSolver;
use af_physics::turbulence::TurbulenceModel;
use af_physics::{FlowField, Freestream, GasModel, SolverError, TurbField};

use super::{EXIT_DIVERGED, EXIT_INPUT, EXIT_IO, EXIT_OK};

/// run 参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径（JSON）
    pub config: PathBuf,

    /// 从重启文件续算
    #[arg(long)]
    pub restart: bool,
}

/// 执行，返回退出码
pub fn execute(args: RunArgs) -> i32 {
    match run_inner(&args) {
        Ok(converged) => {
            if converged {
                info!("求解收敛");
            } else {
                warn!("达到迭代上限，未达到收敛目标");
            }
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "求解失败");
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(e: &SolverError) -> i32 {
    match e {
        SolverError::Diverged { .. }
        | SolverError::NonAdmissible { .. }
        | SolverError::LinearSolverDiverged(_) => EXIT_DIVERGED,
        SolverError::InputInvalid(_) | SolverError::GeometryDegenerate(_) => EXIT_INPUT,
        SolverError::Io(_) => EXIT_IO,
    }
}

fn load_inputs(args: &RunArgs) -> Result<(SolverConfig, RawMesh), SolverError> {
    let config = SolverConfig::from_file(&args.config)
        .map_err(|e| SolverError::InputInvalid(e.to_string()))?;
    if config.mesh.path.is_empty() {
        return Err(SolverError::InputInvalid(
            "配置缺少 mesh.path（网格文件路径）".into(),
        ));
    }
    let mesh_path = resolve_path(&args.config, &config.mesh.path);
    let raw = read_raw_mesh(&mesh_path).map_err(|e| match e {
        af_io::IoError::Io(inner) => SolverError::Io(inner),
        other => SolverError::InputInvalid(other.to_string()),
    })?;
    Ok((config, raw))
}

/// 相对路径按配置文件所在目录解析
fn resolve_path(config_path: &Path, relative: &str) -> PathBuf {
    let p = PathBuf::from(relative);
    if p.is_absolute() {
        p
    } else {
        config_path
            .parent()
            .map(|dir| dir.join(&p))
            .unwrap_or(p)
    }
}

/// 双通道监视：日志 + CSV 历史
struct TeeMonitor {
    log: TracingMonitor,
    csv: Option<CsvHistory>,
}

impl MonitorSink for TeeMonitor {
    fn record(&mut self, record: &IterationRecord) {
        self.log.record(record);
        if let Some(csv) = &mut self.csv {
            csv.record(record);
        }
    }
}

fn run_inner(args: &RunArgs) -> Result<bool, SolverError> {
    let (config, raw) = load_inputs(args)?;

    if raw.n_dim != config.dimension.n_dim() {
        return Err(SolverError::InputInvalid(format!(
            "网格维数 {} 与配置维数 {} 不符",
            raw.n_dim,
            config.dimension.n_dim()
        )));
    }

    // 几何
    let walls = wall_marker_names(&config.markers);
    let geometry = DualGeometry::build(&raw, &walls)?;
    info!(
        n_cells = geometry.n_cells(),
        n_edges = geometry.n_edges(),
        n_boundary_faces = geometry.n_boundary_faces(),
        "几何预处理完成"
    );

    // 来流与求解器
    let mut gas = GasModel::new(&config.gas);
    let freestream = Freestream::build(
        &config.freestream,
        &config.reference,
        &config.gas,
        config.dimension,
        &mut gas,
    );
    info!(
        mach = freestream.mach,
        aoa = config.freestream.aoa,
        regime = ?config.regime,
        scheme = ?config.numerics.convective_scheme,
        "来流构造完成"
    );

    let mut mean = MeanFlowSolver::new(&geometry, &config, gas, freestream)?;
    let mut state = FlowField::new(geometry.n_dim(), geometry.n_cells());
    state.initialize_uniform(&freestream.state, &gas);

    let model = TurbulenceModel::from_kind(config.effective_turbulence());
    let mut turb_pair = match model {
        Some(model) => {
            let solver = TurbulenceSolver::new(
                &geometry,
                &config,
                gas,
                &freestream,
                model,
                mean.markers(),
            )?;
            let mut field = TurbField::new(geometry.n_cells(), model.n_var());
            solver.initialize(&geometry, &mut state, &mut field);
            Some((solver, field))
        }
        None => None,
    };

    // 续算
    let restart_path = resolve_path(&args.config, &config.output.restart_path);
    if args.restart {
        let checkpoint = Checkpoint::load(&restart_path)
            .map_err(|e| SolverError::InputInvalid(e.to_string()))?;
        let n_turb = turb_pair.as_ref().map(|(_, f)| f.n_var()).unwrap_or(0);
        checkpoint
            .check_compatible(geometry.n_cells(), state.n_var(), n_turb)
            .map_err(|e| SolverError::InputInvalid(e.to_string()))?;
        state.conservative.copy_from_slice(&checkpoint.conservative);
        state.refresh_primitives(&gas);
        if let Some((solver, field)) = &mut turb_pair {
            field.vars.copy_from_slice(&checkpoint.turbulence);
            solver.update_eddy_viscosity(&geometry, &mut state, field);
        }
        info!(iteration = checkpoint.iteration, "从重启文件续算");
    }

    // 推进
    let history_path = resolve_path(&args.config, &config.output.history_path);
    let mut monitor = TeeMonitor {
        log: TracingMonitor::default(),
        csv: match CsvHistory::create(&history_path) {
            Ok(csv) => Some(csv),
            Err(e) => {
                warn!(error = %e, "无法创建收敛历史文件");
                None
            }
        },
    };

    let mut integration = Integration::new(&config);
    let report = integration.run(
        &geometry,
        &mut mean,
        turb_pair.as_mut().map(|(s, f)| (&mut *s, &mut *f)),
        &mut state,
        &mut monitor,
        None,
    )?;
    info!(
        iterations = report.iterations,
        converged = report.converged,
        reason = %report.reason,
        "推进结束"
    );

    // 输出
    let field_path = resolve_path(&args.config, &config.output.field_path);
    if let Err(e) = write_vtk(&field_path, &raw, &state) {
        return Err(SolverError::Io(std::io::Error::other(e.to_string())));
    }
    let n_turb = turb_pair.as_ref().map(|(_, f)| f.n_var()).unwrap_or(0);
    let checkpoint = Checkpoint {
        n_var: state.n_var(),
        n_turb,
        n_cells: geometry.n_cells(),
        iteration: report.iterations as u64,
        cfl: integration.cfl(),
        time: 0.0,
        conservative: state.conservative.clone(),
        turbulence: turb_pair
            .as_ref()
            .map(|(_, f)| f.vars.clone())
            .unwrap_or_default(),
    };
    if let Err(e) = checkpoint.save(&restart_path) {
        return Err(SolverError::Io(std::io::Error::other(e.to_string())));
    }

    Ok(report.converged)
}
