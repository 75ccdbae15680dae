// crates/af_physics/src/linalg/block_csr.rs

//! 块 CSR 稀疏矩阵
//!
//! 固定模式的 nb x nb 稠密块 CSR 存储：
//! - `row_ptr` / `col_idx`: 块级稀疏结构，行内列索引升序
//! - `blocks`: 所有块连续存放，块内行主序
//! - `diag_idx`: 每行对角块位置缓存
//!
//! 模式由对偶图决定（对角块恒在，非对角块恰好对应边），
//! 装配期每次迭代清零重填，模式不再变化。

use rayon::prelude::*;

use crate::linalg::block;

/// 块 CSR 矩阵
#[derive(Debug, Clone)]
pub struct BlockCsrMatrix {
    n_rows: usize,
    nb: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    diag_idx: Vec<usize>,
    blocks: Vec<f64>,
}

impl BlockCsrMatrix {
    /// 由边表构建（对角 + 每条边 (i,j) 的两个非对角块）
    pub fn from_edges<I>(n_rows: usize, nb: usize, edges: I) -> Self
    where
        I: Iterator<Item = (usize, usize)>,
    {
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n_rows];
        for (i, j) in edges {
            neighbors[i].push(j);
            neighbors[j].push(i);
        }

        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for (row, mut cols) in neighbors.into_iter().enumerate() {
            cols.push(row);
            cols.sort_unstable();
            cols.dedup();
            col_idx.extend_from_slice(&cols);
            row_ptr.push(col_idx.len());
        }

        let diag_idx = (0..n_rows)
            .map(|row| {
                let start = row_ptr[row];
                let end = row_ptr[row + 1];
                start + col_idx[start..end].binary_search(&row).expect("对角块必须存在")
            })
            .collect();

        let nnz = col_idx.len();
        Self {
            n_rows,
            nb,
            row_ptr,
            col_idx,
            diag_idx,
            blocks: vec![0.0; nnz * nb * nb],
        }
    }

    /// 行数（块行）
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 块大小
    #[inline]
    pub fn nb(&self) -> usize {
        self.nb
    }

    /// 非零块数
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// 标量维度（未知量总数）
    #[inline]
    pub fn n_scalar(&self) -> usize {
        self.n_rows * self.nb
    }

    /// 行指针
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// 列索引
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// 对角块位置
    #[inline]
    pub fn diag_idx(&self) -> &[usize] {
        &self.diag_idx
    }

    /// 块数据
    #[inline]
    pub fn blocks(&self) -> &[f64] {
        &self.blocks
    }

    /// 取第 idx 个块
    #[inline]
    pub fn block(&self, idx: usize) -> &[f64] {
        let sz = self.nb * self.nb;
        &self.blocks[idx * sz..(idx + 1) * sz]
    }

    /// 可变取第 idx 个块
    #[inline]
    pub fn block_mut(&mut self, idx: usize) -> &mut [f64] {
        let sz = self.nb * self.nb;
        &mut self.blocks[idx * sz..(idx + 1) * sz]
    }

    /// 查找 (row, col) 的块位置
    #[inline]
    pub fn find(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        self.col_idx[start..end]
            .binary_search(&col)
            .ok()
            .map(|local| start + local)
    }

    /// 全部清零（模式保持）
    pub fn clear(&mut self) {
        self.blocks.fill(0.0);
    }

    /// 累加块：M[row, col] += a * scale
    ///
    /// 模式外位置 panic（装配逻辑错误，不属于可恢复情形）。
    pub fn add_block(&mut self, row: usize, col: usize, a: &[f64], scale: f64) {
        let idx = self
            .find(row, col)
            .unwrap_or_else(|| panic!("块 ({row}, {col}) 不在稀疏模式内"));
        let sz = self.nb * self.nb;
        let dst = &mut self.blocks[idx * sz..(idx + 1) * sz];
        for (d, &s) in dst.iter_mut().zip(a.iter()) {
            *d += scale * s;
        }
    }

    /// 对角块加标量：M[row, row] += s * I
    pub fn add_diag_scalar(&mut self, row: usize, s: f64) {
        let idx = self.diag_idx[row];
        let nb = self.nb;
        let base = idx * nb * nb;
        for k in 0..nb {
            self.blocks[base + k * nb + k] += s;
        }
    }

    /// 稀疏矩阵-向量乘 y = M x（按块行并行）
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n_scalar());
        debug_assert_eq!(y.len(), self.n_scalar());
        let nb = self.nb;
        let sz = nb * nb;

        y.par_chunks_mut(nb).enumerate().for_each(|(row, y_row)| {
            y_row.fill(0.0);
            let start = self.row_ptr[row];
            let end = self.row_ptr[row + 1];
            for idx in start..end {
                let col = self.col_idx[idx];
                let a = &self.blocks[idx * sz..(idx + 1) * sz];
                block::mat_vec_add(nb, a, &x[col * nb..(col + 1) * nb], y_row);
            }
        });
    }

    /// 残差 r = b - M x
    pub fn residual(&self, x: &[f64], b: &[f64], r: &mut [f64]) {
        self.spmv(x, r);
        for (ri, &bi) in r.iter_mut().zip(b.iter()) {
            *ri = bi - *ri;
        }
    }

    /// 块对角逆作用：y_r = D_r^{-1} x_r（全部行并行）
    ///
    /// 奇异对角块退化为恒等作用，返回奇异块计数。
    pub fn apply_diag_inverse(&self, x: &[f64], y: &mut [f64]) -> usize {
        let nb = self.nb;
        let sz = nb * nb;
        y.par_chunks_mut(nb)
            .enumerate()
            .map(|(row, y_row)| {
                let diag = self.block(self.diag_idx[row]);
                let mut inv = [0.0_f64; 64];
                if block::invert(nb, diag, &mut inv[..sz]) {
                    block::mat_vec(nb, &inv[..sz], &x[row * nb..(row + 1) * nb], y_row);
                    0usize
                } else {
                    y_row.copy_from_slice(&x[row * nb..(row + 1) * nb]);
                    1usize
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2 个单元 1 条边的最小系统
    fn small_matrix() -> BlockCsrMatrix {
        let mut m = BlockCsrMatrix::from_edges(2, 2, [(0usize, 1usize)].into_iter());
        // 对角占优
        m.add_block(0, 0, &[4.0, 1.0, 0.0, 4.0], 1.0);
        m.add_block(1, 1, &[5.0, 0.0, 1.0, 5.0], 1.0);
        m.add_block(0, 1, &[-1.0, 0.0, 0.0, -1.0], 1.0);
        m.add_block(1, 0, &[0.0, -1.0, -1.0, 0.0], 1.0);
        m
    }

    #[test]
    fn test_pattern() {
        let m = small_matrix();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.nnz(), 4);
        assert!(m.find(0, 1).is_some());
        assert_eq!(m.block(m.diag_idx()[0])[0], 4.0);
    }

    #[test]
    fn test_spmv() {
        let m = small_matrix();
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut y = [0.0; 4];
        m.spmv(&x, &mut y);
        // 行 0: [4 1; 0 4]*[1,2] + [-1 0; 0 -1]*[3,4] = [6,8] + [-3,-4] = [3,4]
        assert_eq!(y[0], 3.0);
        assert_eq!(y[1], 4.0);
        // 行 1: [0 -1; -1 0]*[1,2] + [5 0; 1 5]*[3,4] = [-2,-1] + [15,23] = [13,22]
        assert_eq!(y[2], 13.0);
        assert_eq!(y[3], 22.0);
    }

    #[test]
    fn test_clear_keeps_pattern() {
        let mut m = small_matrix();
        m.clear();
        assert_eq!(m.nnz(), 4);
        assert!(m.blocks().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_diag_inverse() {
        let m = small_matrix();
        let x = [4.0, 4.0, 5.0, 5.0];
        let mut y = [0.0; 4];
        let singular = m.apply_diag_inverse(&x, &mut y);
        assert_eq!(singular, 0);
        // D_0^{-1} [4,4]: [4 1; 0 4] y = [4,4] -> y = [0.75, 1]
        assert!((y[0] - 0.75).abs() < 1e-14);
        assert!((y[1] - 1.0).abs() < 1e-14);
    }

    #[test]
    #[should_panic]
    fn test_out_of_pattern_panics() {
        let mut m = BlockCsrMatrix::from_edges(3, 1, [(0usize, 1usize)].into_iter());
        m.add_block(0, 2, &[1.0], 1.0);
    }
}
