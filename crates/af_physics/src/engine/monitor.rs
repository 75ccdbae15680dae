// crates/af_physics/src/engine/monitor.rs

//! 迭代监视
//!
//! 外层每次迭代产出一条 [`IterationRecord`]，推给实现
//! [`MonitorSink`] 的接收方（日志、CSV 历史等）。
//! 核心不持有输出通道，由调用方注入。

use super::forces::ForceCoefficients;

/// 单次外层迭代的监视记录
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// 外层迭代号
    pub iteration: usize,
    /// 物理时间（双时间步；定常为 0）
    pub time: f64,
    /// 当前 CFL
    pub cfl: f64,
    /// 平均流各守恒变量残差 l2 范数
    pub residuals: Vec<f64>,
    /// 湍流变量残差 l2 范数
    pub turb_residuals: Vec<f64>,
    /// 线性求解器迭代数（隐式）
    pub linear_iterations: Option<usize>,
    /// 气动力系数（有监视标记时）
    pub forces: Option<ForceCoefficients>,
}

impl IterationRecord {
    /// 密度残差的 log10（常用收敛指标）
    pub fn log_density_residual(&self) -> f64 {
        self.residuals.first().copied().unwrap_or(0.0).max(1e-300).log10()
    }
}

/// 监视接收方
pub trait MonitorSink {
    /// 接收一条记录
    fn record(&mut self, record: &IterationRecord);
}

/// tracing 日志监视器
#[derive(Debug)]
pub struct TracingMonitor {
    /// 每多少次迭代打一条 info
    pub interval: usize,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self { interval: 10 }
    }
}

impl MonitorSink for TracingMonitor {
    fn record(&mut self, record: &IterationRecord) {
        if self.interval == 0 || record.iteration % self.interval != 0 {
            return;
        }
        match record.forces {
            Some(forces) => tracing::info!(
                iter = record.iteration,
                cfl = record.cfl,
                log_rho = record.log_density_residual(),
                cl = forces.cl,
                cd = forces.cd,
                "iteration"
            ),
            None => tracing::info!(
                iter = record.iteration,
                cfl = record.cfl,
                log_rho = record.log_density_residual(),
                "iteration"
            ),
        }
    }
}

/// 丢弃一切的监视器（测试用）
#[derive(Debug, Default)]
pub struct NullMonitor;

impl MonitorSink for NullMonitor {
    fn record(&mut self, _record: &IterationRecord) {}
}
