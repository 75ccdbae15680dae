// apps/af_cli/src/main.rs

//! AeroFVM 命令行界面
//!
//! 可压缩 RANS 有限体积求解器的命令行工具。
//!
//! # 退出码约定
//!
//! - 0: 收敛（或正常完成）
//! - 1: 发散
//! - 2: 输入错误（配置/网格）
//! - 3: IO 错误

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// AeroFVM 可压缩流求解器命令行工具
#[derive(Parser)]
#[command(name = "af_cli")]
#[command(author = "AeroFVM Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AeroFVM compressible RANS solver", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行求解
    Run(commands::run::RunArgs),
    /// 校验配置与网格
    Validate(commands::validate::ValidateArgs),
    /// 显示配置/网格摘要
    Info(commands::info::InfoArgs),
    /// 生成测试网格
    Generate(commands::generate::GenerateArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("日志初始化失败");
    }

    let code = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Generate(args) => commands::generate::execute(args),
    };
    std::process::exit(code);
}
