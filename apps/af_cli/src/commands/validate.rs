// apps/af_cli/src/commands/validate.rs

//! validate 子命令：只做配置与网格校验，不迭代

use std::path::PathBuf;

use clap::Args;
use tracing::{error, info};

use af_config::SolverConfig;
use af_io::read_raw_mesh;
use af_mesh::DualGeometry;
use af_physics::boundary::{resolve_markers, wall_marker_names};

use super::{EXIT_INPUT, EXIT_OK};

/// validate 参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径（JSON）
    pub config: PathBuf,
}

/// 执行，返回退出码
pub fn execute(args: ValidateArgs) -> i32 {
    let config = match SolverConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "配置无效");
            return EXIT_INPUT;
        }
    };
    info!("配置有效");

    if config.mesh.path.is_empty() {
        info!("未给出网格路径，跳过网格校验");
        return EXIT_OK;
    }

    let mesh_path = args
        .config
        .parent()
        .map(|d| d.join(&config.mesh.path))
        .unwrap_or_else(|| PathBuf::from(&config.mesh.path));
    let raw = match read_raw_mesh(&mesh_path) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "网格无效");
            return EXIT_INPUT;
        }
    };

    let walls = wall_marker_names(&config.markers);
    let geometry = match DualGeometry::build(&raw, &walls) {
        Ok(g) => g,
        Err(e) => {
            error!(error = %e, "对偶几何构造失败");
            return EXIT_INPUT;
        }
    };
    if let Err(e) = resolve_markers(&geometry, &config.markers) {
        error!(error = %e, "边界标记解析失败");
        return EXIT_INPUT;
    }

    info!(
        n_cells = geometry.n_cells(),
        n_edges = geometry.n_edges(),
        total_volume = geometry.total_volume(),
        "网格与边界配置有效"
    );
    EXIT_OK
}
