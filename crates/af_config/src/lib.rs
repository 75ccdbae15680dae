// crates/af_config/src/lib.rs

//! AeroFVM 配置层 (Layer 2)
//!
//! 定义求解器的全部配置参数，使用纯 f64 类型以便 JSON 序列化。
//! 所有字段带 serde 默认值，缺省配置即为一个可运行的亚声速 Roe 隐式算例。
//!
//! # 使用示例
//!
//! ```
//! use af_config::SolverConfig;
//!
//! let config = SolverConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod boundary;
pub mod error;
pub mod solver_config;

pub use boundary::{BoundaryKindConfig, MarkerConfig};
pub use error::{ConfigError, ConfigResult};
pub use solver_config::{
    ConvectiveSchemeKind, Dimension, FlowRegime, FreestreamConfig, GasConfig, GradientKind,
    LimiterKind, LinearSolverConfig, LinearSolverKind, MeshConfig, NumericsConfig, OutputConfig,
    PreconditionerKind, ReferenceConfig, SolverConfig, TimeConfig, TimeIntegrationKind,
    TurbulenceModelKind,
};
