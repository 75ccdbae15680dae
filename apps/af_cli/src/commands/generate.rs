// apps/af_cli/src/commands/generate.rs

//! generate 子命令：生成测试用结构化网格

use std::path::PathBuf;

use clap::Args;
use tracing::{error, info};

use af_io::write_raw_mesh;
use af_mesh::generation::{BoxMeshGenerator, RectMeshGenerator};

use super::{EXIT_IO, EXIT_OK};

/// generate 参数
#[derive(Args)]
pub struct GenerateArgs {
    /// 输出路径（JSON）
    #[arg(short, long, default_value = "mesh.json")]
    pub output: PathBuf,

    /// x 方向单元数
    #[arg(long, default_value_t = 32)]
    pub nx: usize,

    /// y 方向单元数
    #[arg(long, default_value_t = 32)]
    pub ny: usize,

    /// z 方向单元数（>0 时生成 3D 六面体网格）
    #[arg(long, default_value_t = 0)]
    pub nz: usize,

    /// x 方向域长度 [m]
    #[arg(long, default_value_t = 1.0)]
    pub lx: f64,

    /// y 方向域长度 [m]
    #[arg(long, default_value_t = 1.0)]
    pub ly: f64,

    /// z 方向域长度 [m]
    #[arg(long, default_value_t = 1.0)]
    pub lz: f64,

    /// 内部节点扰动幅度（0 为规则网格）
    #[arg(long, default_value_t = 0.0)]
    pub distortion: f64,
}

/// 执行，返回退出码
pub fn execute(args: GenerateArgs) -> i32 {
    let mesh = if args.nz > 0 {
        BoxMeshGenerator::new(args.nx, args.ny, args.nz, args.lx, args.ly, args.lz)
            .with_distortion(args.distortion)
            .build()
    } else {
        RectMeshGenerator::new(args.nx, args.ny, args.lx, args.ly)
            .with_distortion(args.distortion)
            .build()
    };

    match write_raw_mesh(&args.output, &mesh) {
        Ok(()) => {
            info!(
                path = %args.output.display(),
                n_points = mesh.n_points(),
                n_elements = mesh.elements.len(),
                "网格已生成"
            );
            EXIT_OK
        }
        Err(e) => {
            error!(error = %e, "网格写出失败");
            EXIT_IO
        }
    }
}
