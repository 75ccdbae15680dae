// apps/af_cli/src/commands/info.rs

//! info 子命令：配置与网格摘要

use std::path::PathBuf;

use clap::Args;
use tracing::error;

use af_config::SolverConfig;
use af_io::read_raw_mesh;

use super::{EXIT_INPUT, EXIT_OK};

/// info 参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径（JSON）
    pub config: PathBuf,
}

/// 执行，返回退出码
pub fn execute(args: InfoArgs) -> i32 {
    let config = match SolverConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "配置读取失败");
            return EXIT_INPUT;
        }
    };

    println!("AeroFVM 配置摘要");
    println!("  维数:        {:?}", config.dimension);
    println!("  方程:        {:?}", config.regime);
    println!("  湍流模型:    {:?}", config.effective_turbulence());
    println!("  对流格式:    {:?}", config.numerics.convective_scheme);
    println!(
        "  重构:        MUSCL={} 梯度={:?} 限制器={:?} (K={})",
        config.numerics.muscl,
        config.numerics.gradient,
        config.numerics.limiter,
        config.numerics.limiter_coefficient
    );
    println!("  时间推进:    {:?}", config.time.integration);
    println!(
        "  CFL:         init={} max={} growth={} cutback={}",
        config.time.cfl_init, config.time.cfl_max, config.time.cfl_growth, config.time.cfl_cutback
    );
    println!(
        "  线性求解:    {:?} + {:?} (tol={}, restart={})",
        config.linear_solver.kind,
        config.linear_solver.preconditioner,
        config.linear_solver.tolerance,
        config.linear_solver.gmres_restart
    );
    println!(
        "  来流:        M={} aoa={}° T={}K p={}Pa Re={}",
        config.freestream.mach,
        config.freestream.aoa,
        config.freestream.temperature,
        config.freestream.pressure,
        config.freestream.reynolds
    );
    println!("  边界标记:    {}", config.markers.len());
    for m in &config.markers {
        println!("    {} -> {:?}{}", m.name, m.kind, if m.monitored { " [monitored]" } else { "" });
    }

    if !config.mesh.path.is_empty() {
        let mesh_path = args
            .config
            .parent()
            .map(|d| d.join(&config.mesh.path))
            .unwrap_or_else(|| PathBuf::from(&config.mesh.path));
        match read_raw_mesh(&mesh_path) {
            Ok(raw) => {
                println!("网格摘要 ({})", mesh_path.display());
                println!("  节点: {}", raw.n_points());
                println!("  单元: {}", raw.elements.len());
                for marker in &raw.markers {
                    println!("  标记 {}: {} 个面", marker.name, marker.faces.len());
                }
            }
            Err(e) => {
                error!(error = %e, "网格读取失败");
                return EXIT_INPUT;
            }
        }
    }
    EXIT_OK
}
