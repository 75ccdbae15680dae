// crates/af_physics/src/linalg/krylov.rs

//! 预条件 Krylov 求解器
//!
//! 右预条件的重启 GMRES(m) 与 BiCGStab。隐式推进不要求完全收敛，
//! 每个非线性步常取 1e-2 的相对残差下降；GMRES 若在一个重启周期内
//! 残差下降不足 1%，判定停滞并返回当前最优迭代，由外层回退 CFL。

use af_config::{LinearSolverConfig, LinearSolverKind};

use crate::linalg::block_csr::BlockCsrMatrix;
use crate::linalg::preconditioner::BlockPreconditioner;

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearSolveStatus {
    /// 达到容差
    Converged,
    /// 迭代上限（返回当前迭代）
    MaxIterationsReached,
    /// 停滞（重启周期内下降 < 1%）
    Stagnated,
    /// 数值崩溃（NaN 或分母消失）
    Breakdown,
}

/// 求解报告
#[derive(Debug, Clone, Copy)]
pub struct LinearSolveReport {
    /// 状态
    pub status: LinearSolveStatus,
    /// 迭代次数
    pub iterations: usize,
    /// 初始残差范数
    pub initial_residual: f64,
    /// 最终残差范数
    pub final_residual: f64,
}

impl LinearSolveReport {
    /// 是否收敛
    pub fn converged(&self) -> bool {
        self.status == LinearSolveStatus::Converged
    }

    /// 残差下降比
    pub fn reduction(&self) -> f64 {
        if self.initial_residual > 0.0 {
            self.final_residual / self.initial_residual
        } else {
            0.0
        }
    }
}

/// Krylov 求解器
#[derive(Debug, Clone)]
pub struct KrylovSolver {
    config: LinearSolverConfig,
}

impl KrylovSolver {
    /// 创建
    pub fn new(config: LinearSolverConfig) -> Self {
        Self { config }
    }

    /// 求解 M x = b（x 为初值/输出）
    pub fn solve(
        &self,
        matrix: &BlockCsrMatrix,
        precond: &BlockPreconditioner,
        b: &[f64],
        x: &mut [f64],
    ) -> LinearSolveReport {
        match self.config.kind {
            LinearSolverKind::Gmres => self.gmres(matrix, precond, b, x),
            LinearSolverKind::Bicgstab => self.bicgstab(matrix, precond, b, x),
        }
    }

    /// 右预条件重启 GMRES(m)
    ///
    /// Arnoldi 过程用改进 Gram-Schmidt，最小二乘子问题用 Givens 旋转
    /// 增量求解。校正向量在预条件空间累积（z_j = M^{-1} v_j）。
    fn gmres(
        &self,
        matrix: &BlockCsrMatrix,
        precond: &BlockPreconditioner,
        b: &[f64],
        x: &mut [f64],
    ) -> LinearSolveReport {
        let n = matrix.n_scalar();
        let m = self.config.gmres_restart;
        let max_iter = self.config.max_iterations;

        let mut r = vec![0.0; n];
        matrix.residual(x, b, &mut r);
        let initial_residual = norm(&r);
        let target = (self.config.tolerance * initial_residual).max(self.config.abs_tolerance);

        if initial_residual <= self.config.abs_tolerance {
            return LinearSolveReport {
                status: LinearSolveStatus::Converged,
                iterations: 0,
                initial_residual,
                final_residual: initial_residual,
            };
        }

        let mut v: Vec<Vec<f64>> = vec![vec![0.0; n]; m + 1];
        let mut z: Vec<Vec<f64>> = vec![vec![0.0; n]; m];
        let mut h = vec![vec![0.0_f64; m]; m + 1];
        let mut cs = vec![0.0_f64; m];
        let mut sn = vec![0.0_f64; m];
        let mut g = vec![0.0_f64; m + 1];

        let mut iterations = 0usize;
        let mut residual = initial_residual;

        loop {
            let cycle_start_residual = residual;
            let beta = {
                matrix.residual(x, b, &mut r);
                norm(&r)
            };
            if !beta.is_finite() {
                return LinearSolveReport {
                    status: LinearSolveStatus::Breakdown,
                    iterations,
                    initial_residual,
                    final_residual: beta,
                };
            }
            if beta <= target {
                return LinearSolveReport {
                    status: LinearSolveStatus::Converged,
                    iterations,
                    initial_residual,
                    final_residual: beta,
                };
            }

            scale_into(&r, 1.0 / beta, &mut v[0]);
            g.fill(0.0);
            g[0] = beta;

            let mut k_used = 0;
            for j in 0..m {
                // w = A M^{-1} v_j
                precond.apply(matrix, &v[j], &mut z[j]);
                let (w_slot, prev) = {
                    let (head, tail) = v.split_at_mut(j + 1);
                    (&mut tail[0], head)
                };
                matrix.spmv(&z[j], w_slot);

                // 改进 Gram-Schmidt
                for (i, vi) in prev.iter().enumerate() {
                    let hij = dot(w_slot, vi);
                    h[i][j] = hij;
                    axpy(-hij, vi, w_slot);
                }
                let h_next = norm(w_slot);
                h[j + 1][j] = h_next;
                if h_next > 1e-300 {
                    scale_in_place(w_slot, 1.0 / h_next);
                }

                // 应用既有 Givens 旋转
                for i in 0..j {
                    let tmp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
                    h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
                    h[i][j] = tmp;
                }
                // 新旋转消去 h[j+1][j]
                let denom = (h[j][j] * h[j][j] + h[j + 1][j] * h[j + 1][j]).sqrt();
                if denom < 1e-300 {
                    k_used = j;
                    break;
                }
                cs[j] = h[j][j] / denom;
                sn[j] = h[j + 1][j] / denom;
                h[j][j] = denom;
                h[j + 1][j] = 0.0;
                g[j + 1] = -sn[j] * g[j];
                g[j] *= cs[j];

                iterations += 1;
                residual = g[j + 1].abs();
                k_used = j + 1;

                if residual <= target || iterations >= max_iter {
                    break;
                }
            }

            // 回代求 y，x += Σ y_j z_j
            if k_used > 0 {
                let mut y = vec![0.0_f64; k_used];
                for i in (0..k_used).rev() {
                    let mut sum = g[i];
                    for jj in (i + 1)..k_used {
                        sum -= h[i][jj] * y[jj];
                    }
                    y[i] = sum / h[i][i];
                }
                for (jj, yj) in y.iter().enumerate() {
                    axpy(*yj, &z[jj], x);
                }
            }

            matrix.residual(x, b, &mut r);
            residual = norm(&r);

            if !residual.is_finite() {
                return LinearSolveReport {
                    status: LinearSolveStatus::Breakdown,
                    iterations,
                    initial_residual,
                    final_residual: residual,
                };
            }
            if residual <= target {
                return LinearSolveReport {
                    status: LinearSolveStatus::Converged,
                    iterations,
                    initial_residual,
                    final_residual: residual,
                };
            }
            if iterations >= max_iter {
                return LinearSolveReport {
                    status: LinearSolveStatus::MaxIterationsReached,
                    iterations,
                    initial_residual,
                    final_residual: residual,
                };
            }
            // 停滞检测：一个重启周期下降不足 1%
            if residual > 0.99 * cycle_start_residual {
                return LinearSolveReport {
                    status: LinearSolveStatus::Stagnated,
                    iterations,
                    initial_residual,
                    final_residual: residual,
                };
            }
        }
    }

    /// 右预条件 BiCGStab
    fn bicgstab(
        &self,
        matrix: &BlockCsrMatrix,
        precond: &BlockPreconditioner,
        b: &[f64],
        x: &mut [f64],
    ) -> LinearSolveReport {
        let n = matrix.n_scalar();
        let max_iter = self.config.max_iterations;

        let mut r = vec![0.0; n];
        matrix.residual(x, b, &mut r);
        let initial_residual = norm(&r);
        let target = (self.config.tolerance * initial_residual).max(self.config.abs_tolerance);
        if initial_residual <= self.config.abs_tolerance {
            return LinearSolveReport {
                status: LinearSolveStatus::Converged,
                iterations: 0,
                initial_residual,
                final_residual: initial_residual,
            };
        }

        let r0 = r.clone();
        let mut rho = 1.0_f64;
        let mut alpha = 1.0_f64;
        let mut omega = 1.0_f64;
        let mut p = vec![0.0; n];
        let mut v_vec = vec![0.0; n];
        let mut p_hat = vec![0.0; n];
        let mut s = vec![0.0; n];
        let mut s_hat = vec![0.0; n];
        let mut t = vec![0.0; n];

        let mut residual = initial_residual;

        for iter in 1..=max_iter {
            let rho_new = dot(&r0, &r);
            if rho_new.abs() < 1e-300 {
                return LinearSolveReport {
                    status: LinearSolveStatus::Breakdown,
                    iterations: iter - 1,
                    initial_residual,
                    final_residual: residual,
                };
            }
            let beta = (rho_new / rho) * (alpha / omega);
            rho = rho_new;
            // p = r + beta (p - omega v)
            for k in 0..n {
                p[k] = r[k] + beta * (p[k] - omega * v_vec[k]);
            }

            precond.apply(matrix, &p, &mut p_hat);
            matrix.spmv(&p_hat, &mut v_vec);
            let denom = dot(&r0, &v_vec);
            if denom.abs() < 1e-300 {
                return LinearSolveReport {
                    status: LinearSolveStatus::Breakdown,
                    iterations: iter - 1,
                    initial_residual,
                    final_residual: residual,
                };
            }
            alpha = rho / denom;

            for k in 0..n {
                s[k] = r[k] - alpha * v_vec[k];
            }
            let s_norm = norm(&s);
            if s_norm <= target {
                axpy(alpha, &p_hat, x);
                return LinearSolveReport {
                    status: LinearSolveStatus::Converged,
                    iterations: iter,
                    initial_residual,
                    final_residual: s_norm,
                };
            }

            precond.apply(matrix, &s, &mut s_hat);
            matrix.spmv(&s_hat, &mut t);
            let tt = dot(&t, &t);
            if tt < 1e-300 {
                return LinearSolveReport {
                    status: LinearSolveStatus::Breakdown,
                    iterations: iter,
                    initial_residual,
                    final_residual: s_norm,
                };
            }
            omega = dot(&t, &s) / tt;

            for k in 0..n {
                x[k] += alpha * p_hat[k] + omega * s_hat[k];
                r[k] = s[k] - omega * t[k];
            }
            residual = norm(&r);

            if !residual.is_finite() {
                return LinearSolveReport {
                    status: LinearSolveStatus::Breakdown,
                    iterations: iter,
                    initial_residual,
                    final_residual: residual,
                };
            }
            if residual <= target {
                return LinearSolveReport {
                    status: LinearSolveStatus::Converged,
                    iterations: iter,
                    initial_residual,
                    final_residual: residual,
                };
            }
            if omega.abs() < 1e-300 {
                return LinearSolveReport {
                    status: LinearSolveStatus::Breakdown,
                    iterations: iter,
                    initial_residual,
                    final_residual: residual,
                };
            }
        }

        LinearSolveReport {
            status: LinearSolveStatus::MaxIterationsReached,
            iterations: max_iter,
            initial_residual,
            final_residual: residual,
        }
    }
}

// ============================================================
// 向量工具
// ============================================================

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

#[inline]
fn scale_into(x: &[f64], alpha: f64, out: &mut [f64]) {
    for (o, xi) in out.iter_mut().zip(x.iter()) {
        *o = alpha * xi;
    }
}

#[inline]
fn scale_in_place(x: &mut [f64], alpha: f64) {
    for xi in x.iter_mut() {
        *xi *= alpha;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_config::PreconditionerKind;

    /// 非对称的对角占优块系统
    fn test_system(n: usize, nb: usize) -> (BlockCsrMatrix, Vec<f64>, Vec<f64>) {
        let edges = (0..n - 1).map(|i| (i, i + 1));
        let mut m = BlockCsrMatrix::from_edges(n, nb, edges);
        let sz = nb * nb;
        for i in 0..n {
            let mut diag = vec![0.0; sz];
            for k in 0..nb {
                diag[k * nb + k] = 6.0 + 0.5 * (i as f64 % 3.0);
                if k + 1 < nb {
                    diag[k * nb + k + 1] = 1.0;
                }
            }
            m.add_block(i, i, &diag, 1.0);
            let mut off = vec![0.0; sz];
            for k in 0..nb {
                off[k * nb + k] = -1.0;
            }
            if i > 0 {
                m.add_block(i, i - 1, &off, 1.0);
            }
            if i + 1 < n {
                off[0] = -1.3;
                m.add_block(i, i + 1, &off, 1.0);
            }
        }
        let n_scalar = n * nb;
        let x_true: Vec<f64> = (0..n_scalar).map(|k| (k as f64 * 0.37).sin()).collect();
        let mut b = vec![0.0; n_scalar];
        m.spmv(&x_true, &mut b);
        (m, b, x_true)
    }

    fn config(kind: LinearSolverKind) -> LinearSolverConfig {
        LinearSolverConfig {
            kind,
            preconditioner: PreconditionerKind::Jacobi,
            tolerance: 1e-10,
            abs_tolerance: 1e-14,
            max_iterations: 500,
            gmres_restart: 20,
        }
    }

    fn check_solution(
        m: &BlockCsrMatrix,
        b: &[f64],
        x: &[f64],
        report: &LinearSolveReport,
        tol: f64,
    ) {
        assert!(report.converged(), "status = {:?}", report.status);
        // 收敛报告的正确性：||M x - b|| <= tol * ||b||
        let mut r = vec![0.0; b.len()];
        m.residual(x, b, &mut r);
        let res = norm(&r);
        let b_norm = norm(b);
        assert!(res <= tol * b_norm, "res = {res:.3e}, b = {b_norm:.3e}");
    }

    #[test]
    fn test_gmres_jacobi() {
        let (m, b, _) = test_system(12, 2);
        let mut precond = BlockPreconditioner::from_kind(PreconditionerKind::Jacobi);
        precond.setup(&m);
        let solver = KrylovSolver::new(config(LinearSolverKind::Gmres));
        let mut x = vec![0.0; m.n_scalar()];
        let report = solver.solve(&m, &precond, &b, &mut x);
        check_solution(&m, &b, &x, &report, 1e-9);
    }

    #[test]
    fn test_gmres_ilu0() {
        let (m, b, x_true) = test_system(15, 4);
        let mut precond = BlockPreconditioner::from_kind(PreconditionerKind::Ilu0);
        precond.setup(&m);
        let solver = KrylovSolver::new(config(LinearSolverKind::Gmres));
        let mut x = vec![0.0; m.n_scalar()];
        let report = solver.solve(&m, &precond, &b, &mut x);
        check_solution(&m, &b, &x, &report, 1e-9);
        // 块三对角 + ILU(0) 是精确分解，应当一两步收敛
        assert!(report.iterations <= 5);
        for k in 0..x.len() {
            assert!((x[k] - x_true[k]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_bicgstab_sgs() {
        let (m, b, _) = test_system(20, 2);
        let mut precond = BlockPreconditioner::from_kind(PreconditionerKind::Sgs);
        precond.setup(&m);
        let solver = KrylovSolver::new(config(LinearSolverKind::Bicgstab));
        let mut x = vec![0.0; m.n_scalar()];
        let report = solver.solve(&m, &precond, &b, &mut x);
        check_solution(&m, &b, &x, &report, 1e-8);
    }

    #[test]
    fn test_gmres_restart_path() {
        // 重启长度小于收敛所需维数，强制走重启分支
        let (m, b, _) = test_system(30, 1);
        let mut precond = BlockPreconditioner::from_kind(PreconditionerKind::Jacobi);
        precond.setup(&m);
        let mut cfg = config(LinearSolverKind::Gmres);
        cfg.gmres_restart = 4;
        let solver = KrylovSolver::new(cfg);
        let mut x = vec![0.0; m.n_scalar()];
        let report = solver.solve(&m, &precond, &b, &mut x);
        check_solution(&m, &b, &x, &report, 1e-8);
    }

    #[test]
    fn test_zero_rhs() {
        let (m, _, _) = test_system(6, 2);
        let precond = BlockPreconditioner::Identity;
        let solver = KrylovSolver::new(config(LinearSolverKind::Gmres));
        let b = vec![0.0; m.n_scalar()];
        let mut x = vec![0.0; m.n_scalar()];
        let report = solver.solve(&m, &precond, &b, &mut x);
        assert!(report.converged());
        assert_eq!(report.iterations, 0);
    }
}
