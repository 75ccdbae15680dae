// crates/af_io/src/history.rs

//! CSV 收敛历史
//!
//! 实现 [`MonitorSink`]，把逐迭代残差范数与气动力系数追加到 CSV。
//! 写失败只告警不打断求解。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use af_physics::engine::{IterationRecord, MonitorSink};

use crate::error::IoResult;

/// CSV 历史写出器
pub struct CsvHistory {
    writer: BufWriter<File>,
    header_written: bool,
}

impl CsvHistory {
    /// 创建（覆盖已有文件）
    pub fn create(path: &Path) -> IoResult<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            header_written: false,
        })
    }

    fn write_record(&mut self, record: &IterationRecord) -> std::io::Result<()> {
        if !self.header_written {
            write!(self.writer, "iteration,time,cfl")?;
            for k in 0..record.residuals.len() {
                write!(self.writer, ",log_res_{k}")?;
            }
            for k in 0..record.turb_residuals.len() {
                write!(self.writer, ",log_turb_res_{k}")?;
            }
            writeln!(self.writer, ",linear_iters,cl,cd,cm")?;
            self.header_written = true;
        }

        write!(
            self.writer,
            "{},{:.6e},{:.3}",
            record.iteration, record.time, record.cfl
        )?;
        for r in &record.residuals {
            write!(self.writer, ",{:.6}", r.max(1e-300).log10())?;
        }
        for r in &record.turb_residuals {
            write!(self.writer, ",{:.6}", r.max(1e-300).log10())?;
        }
        let linear = record.linear_iterations.unwrap_or(0);
        match record.forces {
            Some(f) => writeln!(
                self.writer,
                ",{linear},{:.8e},{:.8e},{:.8e}",
                f.cl, f.cd, f.cm
            )?,
            None => writeln!(self.writer, ",{linear},,,")?,
        }
        self.writer.flush()
    }
}

impl MonitorSink for CsvHistory {
    fn record(&mut self, record: &IterationRecord) {
        if let Err(e) = self.write_record(record) {
            tracing::warn!(error = %e, "收敛历史写出失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_rows() {
        let dir = std::env::temp_dir().join("af_io_history_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("history.csv");

        {
            let mut history = CsvHistory::create(&path).unwrap();
            for iter in 1..=3 {
                history.record(&IterationRecord {
                    iteration: iter,
                    time: 0.0,
                    cfl: 5.0,
                    residuals: vec![1e-3 / iter as f64, 1e-4],
                    turb_residuals: vec![],
                    linear_iterations: Some(7),
                    forces: None,
                });
            }
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("iteration,time,cfl,log_res_0,log_res_1"));
        assert!(lines[1].starts_with("1,"));
    }
}
