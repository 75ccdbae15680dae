// crates/af_physics/src/linalg/block.rs

//! 小块稠密运算
//!
//! 所有块为行主序 `nb x nb` 切片，nb ∈ {1, 2, 4, 5}。
//! LU 分解使用部分选主元的 Gauss 消元。

/// y = A x
#[inline]
pub fn mat_vec(nb: usize, a: &[f64], x: &[f64], y: &mut [f64]) {
    for r in 0..nb {
        let mut sum = 0.0;
        for c in 0..nb {
            sum += a[r * nb + c] * x[c];
        }
        y[r] = sum;
    }
}

/// y += A x
#[inline]
pub fn mat_vec_add(nb: usize, a: &[f64], x: &[f64], y: &mut [f64]) {
    for r in 0..nb {
        let mut sum = 0.0;
        for c in 0..nb {
            sum += a[r * nb + c] * x[c];
        }
        y[r] += sum;
    }
}

/// y -= A x
#[inline]
pub fn mat_vec_sub(nb: usize, a: &[f64], x: &[f64], y: &mut [f64]) {
    for r in 0..nb {
        let mut sum = 0.0;
        for c in 0..nb {
            sum += a[r * nb + c] * x[c];
        }
        y[r] -= sum;
    }
}

/// C = A B
#[inline]
pub fn mat_mul(nb: usize, a: &[f64], b: &[f64], c: &mut [f64]) {
    for r in 0..nb {
        for j in 0..nb {
            let mut sum = 0.0;
            for k in 0..nb {
                sum += a[r * nb + k] * b[k * nb + j];
            }
            c[r * nb + j] = sum;
        }
    }
}

/// C -= A B
#[inline]
pub fn mat_mul_sub(nb: usize, a: &[f64], b: &[f64], c: &mut [f64]) {
    for r in 0..nb {
        for j in 0..nb {
            let mut sum = 0.0;
            for k in 0..nb {
                sum += a[r * nb + k] * b[k * nb + j];
            }
            c[r * nb + j] -= sum;
        }
    }
}

/// 就地 LU 分解（部分选主元）
///
/// 返回 false 表示块奇异（消元遇到零主元）。
/// `perm[r]` 记录第 r 步选中的行。
pub fn lu_factor(nb: usize, a: &mut [f64], perm: &mut [usize]) -> bool {
    for r in 0..nb {
        perm[r] = r;
    }
    for k in 0..nb {
        // 选主元
        let mut pivot_row = k;
        let mut pivot_val = a[perm[k] * nb + k].abs();
        for r in (k + 1)..nb {
            let v = a[perm[r] * nb + k].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = r;
            }
        }
        if pivot_val < 1e-300 {
            return false;
        }
        perm.swap(k, pivot_row);

        let pk = perm[k];
        let inv_pivot = 1.0 / a[pk * nb + k];
        for r in (k + 1)..nb {
            let pr = perm[r];
            let factor = a[pr * nb + k] * inv_pivot;
            a[pr * nb + k] = factor;
            for c in (k + 1)..nb {
                a[pr * nb + c] -= factor * a[pk * nb + c];
            }
        }
    }
    true
}

/// LU 回代，解 A x = b（b 就地替换为 x）
pub fn lu_solve(nb: usize, lu: &[f64], perm: &[usize], b: &mut [f64]) {
    let mut y = [0.0_f64; 8];
    debug_assert!(nb <= 8);

    // 前代 L y = P b
    for r in 0..nb {
        let mut sum = b[perm[r]];
        for c in 0..r {
            sum -= lu[perm[r] * nb + c] * y[c];
        }
        y[r] = sum;
    }
    // 回代 U x = y
    for r in (0..nb).rev() {
        let mut sum = y[r];
        for c in (r + 1)..nb {
            sum -= lu[perm[r] * nb + c] * b[c];
        }
        b[r] = sum / lu[perm[r] * nb + r];
    }
}

/// 块求逆：out = A^{-1}
///
/// 返回 false 表示块奇异。
pub fn invert(nb: usize, a: &[f64], out: &mut [f64]) -> bool {
    let mut lu = [0.0_f64; 64];
    let mut perm = [0usize; 8];
    debug_assert!(nb <= 8);
    lu[..nb * nb].copy_from_slice(&a[..nb * nb]);
    if !lu_factor(nb, &mut lu[..nb * nb], &mut perm[..nb]) {
        return false;
    }
    let mut col = [0.0_f64; 8];
    for j in 0..nb {
        col[..nb].fill(0.0);
        col[j] = 1.0;
        lu_solve(nb, &lu[..nb * nb], &perm[..nb], &mut col[..nb]);
        for r in 0..nb {
            out[r * nb + j] = col[r];
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mat_vec() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let x = [1.0, -1.0];
        let mut y = [0.0; 2];
        mat_vec(2, &a, &x, &mut y);
        assert_eq!(y, [-1.0, -1.0]);
    }

    #[test]
    fn test_lu_solve() {
        // 需要选主元的系统
        let a = [0.0, 2.0, 1.0, 1.0, 3.0, 0.0, 0.0, 1.0, 1.0];
        let mut lu = a;
        let mut perm = [0usize; 3];
        assert!(lu_factor(3, &mut lu, &mut perm));
        // b = A * [1, 2, 3]
        let x_true = [1.0, 2.0, 3.0];
        let mut b = [0.0; 3];
        mat_vec(3, &a, &x_true, &mut b);
        lu_solve(3, &lu, &perm, &mut b);
        for k in 0..3 {
            assert!((b[k] - x_true[k]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invert() {
        let a = [4.0, 1.0, 0.0, 2.0, 5.0, 1.0, 1.0, 0.0, 3.0];
        let mut inv = [0.0; 9];
        assert!(invert(3, &a, &mut inv));
        let mut prod = [0.0; 9];
        mat_mul(3, &a, &inv, &mut prod);
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((prod[r * 3 + c] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_detected() {
        let a = [1.0, 2.0, 2.0, 4.0];
        let mut inv = [0.0; 4];
        assert!(!invert(2, &a, &mut inv));
    }

    #[test]
    fn test_scalar_block() {
        // nb = 1（SA 湍流）退化为标量运算
        let a = [2.5];
        let mut inv = [0.0];
        assert!(invert(1, &a, &mut inv));
        assert!((inv[0] - 0.4).abs() < 1e-15);
    }
}
