// crates/af_physics/src/linalg/preconditioner.rs

//! 块预条件器
//!
//! 三种标准预条件器，统一 `setup` / `apply` 接口：
//!
//! - 块 Jacobi: M = D，逐行块逆，完全并行
//! - 块 ILU(0): 无填充不完全 LU，块级 IKJ 消元，三角扫掠串行
//! - 对称块 Gauss-Seidel: M = (D+L) D^{-1} (D+U)，前向后向扫掠
//!
//! 奇异对角块以恒等替代并计数，不中断求解。

use rayon::prelude::*;

use crate::linalg::block;
use crate::linalg::block_csr::BlockCsrMatrix;

use af_config::PreconditionerKind;

/// 块预条件器（设置期单次分派）
#[derive(Debug)]
pub enum BlockPreconditioner {
    /// 恒等（调试用）
    Identity,
    /// 块 Jacobi
    Jacobi(BlockJacobi),
    /// 块 ILU(0)
    Ilu0(BlockIlu0),
    /// 对称块 Gauss-Seidel
    Sgs(BlockSgs),
}

impl BlockPreconditioner {
    /// 按配置创建
    pub fn from_kind(kind: PreconditionerKind) -> Self {
        match kind {
            PreconditionerKind::Jacobi => Self::Jacobi(BlockJacobi::default()),
            PreconditionerKind::Ilu0 => Self::Ilu0(BlockIlu0::default()),
            PreconditionerKind::Sgs => Self::Sgs(BlockSgs::default()),
        }
    }

    /// 矩阵重填后更新分解
    pub fn setup(&mut self, matrix: &BlockCsrMatrix) {
        match self {
            Self::Identity => {}
            Self::Jacobi(p) => p.setup(matrix),
            Self::Ilu0(p) => p.setup(matrix),
            Self::Sgs(p) => p.setup(matrix),
        }
    }

    /// y = M^{-1} x
    pub fn apply(&self, matrix: &BlockCsrMatrix, x: &[f64], y: &mut [f64]) {
        match self {
            Self::Identity => y.copy_from_slice(x),
            Self::Jacobi(p) => p.apply(matrix, x, y),
            Self::Ilu0(p) => p.apply(matrix, x, y),
            Self::Sgs(p) => p.apply(matrix, x, y),
        }
    }
}

// ============================================================
// 块 Jacobi
// ============================================================

/// 块 Jacobi 预条件器：存储逆对角块
#[derive(Debug, Default)]
pub struct BlockJacobi {
    inv_diag: Vec<f64>,
    /// 奇异对角块计数（诊断）
    pub singular_blocks: usize,
}

impl BlockJacobi {
    fn setup(&mut self, matrix: &BlockCsrMatrix) {
        let nb = matrix.nb();
        let sz = nb * nb;
        let n = matrix.n_rows();
        self.inv_diag.resize(n * sz, 0.0);
        self.singular_blocks = self
            .inv_diag
            .par_chunks_mut(sz)
            .enumerate()
            .map(|(row, inv)| {
                let diag = matrix.block(matrix.diag_idx()[row]);
                if block::invert(nb, diag, inv) {
                    0usize
                } else {
                    // 恒等退化
                    inv.fill(0.0);
                    for k in 0..nb {
                        inv[k * nb + k] = 1.0;
                    }
                    1usize
                }
            })
            .sum();
    }

    fn apply(&self, matrix: &BlockCsrMatrix, x: &[f64], y: &mut [f64]) {
        let nb = matrix.nb();
        let sz = nb * nb;
        y.par_chunks_mut(nb).enumerate().for_each(|(row, y_row)| {
            block::mat_vec(nb, &self.inv_diag[row * sz..(row + 1) * sz], &x[row * nb..(row + 1) * nb], y_row);
        });
    }
}

// ============================================================
// 块 ILU(0)
// ============================================================

/// 块 ILU(0) 预条件器
///
/// 分解后的块覆盖存储在矩阵模式的副本上；
/// L 的块吸收了 U 对角块的逆，前代时 L 具有单位块对角。
#[derive(Debug, Default)]
pub struct BlockIlu0 {
    /// 分解后的块值（与矩阵同模式）
    lu_blocks: Vec<f64>,
    /// 逆对角块
    inv_diag: Vec<f64>,
    /// 奇异对角块计数
    pub singular_blocks: usize,
}

impl BlockIlu0 {
    fn setup(&mut self, matrix: &BlockCsrMatrix) {
        let nb = matrix.nb();
        let sz = nb * nb;
        let n = matrix.n_rows();
        let row_ptr = matrix.row_ptr();
        let col_idx = matrix.col_idx();
        let diag_idx = matrix.diag_idx();

        self.lu_blocks.resize(matrix.nnz() * sz, 0.0);
        self.lu_blocks.copy_from_slice(matrix.blocks());
        self.inv_diag.resize(n * sz, 0.0);
        self.singular_blocks = 0;

        let mut tmp = vec![0.0_f64; sz];

        for i in 0..n {
            // 下三角部分：A_ik <- A_ik * inv(A_kk)，随后消去行 i 中的 A_ij
            for idx_ik in row_ptr[i]..diag_idx[i] {
                let k = col_idx[idx_ik];
                // A_ik * inv(A_kk)
                {
                    let (head, _) = self.lu_blocks.split_at_mut((idx_ik + 1) * sz);
                    let a_ik = &mut head[idx_ik * sz..];
                    tmp.copy_from_slice(a_ik);
                    block::mat_mul(nb, &tmp, &self.inv_diag[k * sz..(k + 1) * sz], a_ik);
                }
                let factor: Vec<f64> =
                    self.lu_blocks[idx_ik * sz..(idx_ik + 1) * sz].to_vec();

                // 对行 k 中 j > k 且 (i, j) 在模式内的块：A_ij -= factor * A_kj
                for idx_kj in (diag_idx[k] + 1)..row_ptr[k + 1] {
                    let j = col_idx[idx_kj];
                    if let Some(idx_ij) = matrix.find(i, j) {
                        let a_kj: Vec<f64> =
                            self.lu_blocks[idx_kj * sz..(idx_kj + 1) * sz].to_vec();
                        let a_ij = &mut self.lu_blocks[idx_ij * sz..(idx_ij + 1) * sz];
                        block::mat_mul_sub(nb, &factor, &a_kj, a_ij);
                    }
                }
            }

            // 逆对角块
            let diag = &self.lu_blocks[diag_idx[i] * sz..(diag_idx[i] + 1) * sz];
            let inv = &mut self.inv_diag[i * sz..(i + 1) * sz];
            if !block::invert(nb, diag, inv) {
                inv.fill(0.0);
                for k in 0..nb {
                    inv[k * nb + k] = 1.0;
                }
                self.singular_blocks += 1;
            }
        }
    }

    fn apply(&self, matrix: &BlockCsrMatrix, x: &[f64], y: &mut [f64]) {
        let nb = matrix.nb();
        let sz = nb * nb;
        let n = matrix.n_rows();
        let row_ptr = matrix.row_ptr();
        let col_idx = matrix.col_idx();
        let diag_idx = matrix.diag_idx();

        // 前代 L y = x（L 单位块对角）
        for i in 0..n {
            let (done, rest) = y.split_at_mut(i * nb);
            let y_i = &mut rest[..nb];
            y_i.copy_from_slice(&x[i * nb..(i + 1) * nb]);
            for idx in row_ptr[i]..diag_idx[i] {
                let j = col_idx[idx];
                block::mat_vec_sub(
                    nb,
                    &self.lu_blocks[idx * sz..(idx + 1) * sz],
                    &done[j * nb..(j + 1) * nb],
                    y_i,
                );
            }
        }

        // 回代 U y = y
        let mut rhs = vec![0.0_f64; nb];
        for i in (0..n).rev() {
            rhs.copy_from_slice(&y[i * nb..(i + 1) * nb]);
            for idx in (diag_idx[i] + 1)..row_ptr[i + 1] {
                let j = col_idx[idx];
                block::mat_vec_sub(
                    nb,
                    &self.lu_blocks[idx * sz..(idx + 1) * sz],
                    &y[j * nb..(j + 1) * nb],
                    &mut rhs,
                );
            }
            block::mat_vec(
                nb,
                &self.inv_diag[i * sz..(i + 1) * sz],
                &rhs,
                &mut y[i * nb..(i + 1) * nb],
            );
        }
    }
}

// ============================================================
// 对称块 Gauss-Seidel
// ============================================================

/// 对称块 Gauss-Seidel 预条件器
///
/// M = (D + L) D^{-1} (D + U)。应用即一次前向扫掠、
/// 对角缩放、一次后向扫掠。
#[derive(Debug, Default)]
pub struct BlockSgs {
    inv_diag: Vec<f64>,
    /// 奇异对角块计数
    pub singular_blocks: usize,
}

impl BlockSgs {
    fn setup(&mut self, matrix: &BlockCsrMatrix) {
        // 与块 Jacobi 相同的对角逆
        let nb = matrix.nb();
        let sz = nb * nb;
        let n = matrix.n_rows();
        self.inv_diag.resize(n * sz, 0.0);
        self.singular_blocks = self
            .inv_diag
            .par_chunks_mut(sz)
            .enumerate()
            .map(|(row, inv)| {
                let diag = matrix.block(matrix.diag_idx()[row]);
                if block::invert(nb, diag, inv) {
                    0usize
                } else {
                    inv.fill(0.0);
                    for k in 0..nb {
                        inv[k * nb + k] = 1.0;
                    }
                    1usize
                }
            })
            .sum();
    }

    fn apply(&self, matrix: &BlockCsrMatrix, x: &[f64], y: &mut [f64]) {
        let nb = matrix.nb();
        let sz = nb * nb;
        let n = matrix.n_rows();
        let row_ptr = matrix.row_ptr();
        let col_idx = matrix.col_idx();
        let diag_idx = matrix.diag_idx();
        let blocks = matrix.blocks();

        let mut rhs = vec![0.0_f64; nb];

        // 前向 (D + L) u = x
        for i in 0..n {
            rhs.copy_from_slice(&x[i * nb..(i + 1) * nb]);
            for idx in row_ptr[i]..diag_idx[i] {
                let j = col_idx[idx];
                block::mat_vec_sub(nb, &blocks[idx * sz..(idx + 1) * sz], &y[j * nb..(j + 1) * nb], &mut rhs);
            }
            let y_i_start = i * nb;
            block::mat_vec(
                nb,
                &self.inv_diag[i * sz..(i + 1) * sz],
                &rhs,
                &mut y[y_i_start..y_i_start + nb],
            );
        }

        // w = D u
        let mut w = vec![0.0_f64; n * nb];
        for i in 0..n {
            let diag = &blocks[diag_idx[i] * sz..(diag_idx[i] + 1) * sz];
            block::mat_vec(nb, diag, &y[i * nb..(i + 1) * nb], &mut w[i * nb..(i + 1) * nb]);
        }

        // 后向 (D + U) y = w
        for i in (0..n).rev() {
            rhs.copy_from_slice(&w[i * nb..(i + 1) * nb]);
            for idx in (diag_idx[i] + 1)..row_ptr[i + 1] {
                let j = col_idx[idx];
                block::mat_vec_sub(nb, &blocks[idx * sz..(idx + 1) * sz], &y[j * nb..(j + 1) * nb], &mut rhs);
            }
            let y_i_start = i * nb;
            block::mat_vec(
                nb,
                &self.inv_diag[i * sz..(i + 1) * sz],
                &rhs,
                &mut y[y_i_start..y_i_start + nb],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 对角占优 1x1 块三对角系统
    fn tridiag(n: usize) -> BlockCsrMatrix {
        let edges = (0..n - 1).map(|i| (i, i + 1));
        let mut m = BlockCsrMatrix::from_edges(n, 1, edges);
        for i in 0..n {
            m.add_block(i, i, &[4.0], 1.0);
            if i > 0 {
                m.add_block(i, i - 1, &[-1.0], 1.0);
            }
            if i + 1 < n {
                m.add_block(i, i + 1, &[-1.0], 1.0);
            }
        }
        m
    }

    #[test]
    fn test_jacobi_apply() {
        let m = tridiag(4);
        let mut p = BlockPreconditioner::from_kind(PreconditionerKind::Jacobi);
        p.setup(&m);
        let x = [4.0, 8.0, 12.0, 16.0];
        let mut y = [0.0; 4];
        p.apply(&m, &x, &mut y);
        assert_eq!(y, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ilu0_exact_on_tridiagonal() {
        // 三对角矩阵无填充，ILU(0) 即精确 LU：M^{-1} A x = x
        let m = tridiag(6);
        let mut p = BlockPreconditioner::from_kind(PreconditionerKind::Ilu0);
        p.setup(&m);

        let x_true = [1.0, -2.0, 3.0, 0.5, -1.5, 2.5];
        let mut b = vec![0.0; 6];
        m.spmv(&x_true, &mut b);
        let mut x = vec![0.0; 6];
        p.apply(&m, &b, &mut x);
        for k in 0..6 {
            assert!((x[k] - x_true[k]).abs() < 1e-12, "x[{k}] = {}", x[k]);
        }
    }

    #[test]
    fn test_sgs_improves_residual() {
        let m = tridiag(8);
        let mut p = BlockPreconditioner::from_kind(PreconditionerKind::Sgs);
        p.setup(&m);

        let b = vec![1.0; 8];
        let mut x = vec![0.0; 8];
        p.apply(&m, &b, &mut x);
        // 一次 SGS 作用后的残差应明显小于初始残差 ||b||
        let mut r = vec![0.0; 8];
        m.residual(&x, &b, &mut r);
        let res: f64 = r.iter().map(|v| v * v).sum::<f64>().sqrt();
        let b_norm: f64 = b.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!(res < 0.5 * b_norm);
    }

    #[test]
    fn test_ilu0_block2() {
        // 2x2 块系统上的一致性：M^{-1} 作用后残差下降
        let edges = [(0usize, 1usize), (1usize, 2usize)];
        let mut m = BlockCsrMatrix::from_edges(3, 2, edges.into_iter());
        for i in 0..3 {
            m.add_block(i, i, &[6.0, 1.0, -1.0, 5.0], 1.0);
        }
        m.add_block(0, 1, &[-1.0, 0.2, 0.1, -1.0], 1.0);
        m.add_block(1, 0, &[-0.8, 0.0, 0.3, -1.2], 1.0);
        m.add_block(1, 2, &[-1.1, 0.1, 0.0, -0.9], 1.0);
        m.add_block(2, 1, &[-1.0, 0.4, 0.2, -1.0], 1.0);

        let mut p = BlockPreconditioner::from_kind(PreconditionerKind::Ilu0);
        p.setup(&m);
        let x_true = [1.0, 2.0, -1.0, 0.5, 3.0, -2.0];
        let mut b = vec![0.0; 6];
        m.spmv(&x_true, &mut b);
        let mut x = vec![0.0; 6];
        p.apply(&m, &b, &mut x);
        // 块三对角同样无填充，ILU(0) 精确
        for k in 0..6 {
            assert!((x[k] - x_true[k]).abs() < 1e-10, "x[{k}] = {}", x[k]);
        }
    }
}
