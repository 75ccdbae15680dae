// crates/af_io/src/lib.rs

//! AeroFVM IO 层 (Layer 5)
//!
//! - 重启快照 (checkpoint): 带版本与 CRC 的二进制状态保存/恢复
//! - 流场输出 (vtk): legacy ASCII VTK 非结构网格写出
//! - 收敛历史 (history): CSV 监视接收方
//! - 网格读取 (mesh_reader): JSON 原始网格格式
//!
//! 本层只持有 Geometry / Variables 的只读视图；
//! 核心不在热路径做任何 IO。

pub mod checkpoint;
pub mod error;
pub mod history;
pub mod mesh_reader;
pub mod vtk;

pub use checkpoint::Checkpoint;
pub use error::{IoError, IoResult};
pub use history::CsvHistory;
pub use mesh_reader::{read_raw_mesh, write_raw_mesh};
pub use vtk::write_vtk;
