// apps/af_cli/src/commands/mod.rs

//! 子命令实现

pub mod generate;
pub mod info;
pub mod run;
pub mod validate;

/// 退出码：收敛 / 正常完成
pub const EXIT_OK: i32 = 0;
/// 退出码：发散
pub const EXIT_DIVERGED: i32 = 1;
/// 退出码：输入错误
pub const EXIT_INPUT: i32 = 2;
/// 退出码：IO 错误
pub const EXIT_IO: i32 = 3;
