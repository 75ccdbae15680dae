// crates/af_foundation/src/kahan.rs

//! Kahan 补偿求和
//!
//! 残差范数、体积闭合等全局归约对舍入误差敏感，
//! 统一使用补偿求和以获得与求和顺序近似无关的结果。

/// Kahan 累加器
///
/// 经典 Kahan-Babuška 补偿求和，误差界 O(ε) 而非朴素求和的 O(nε)。
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanAccumulator {
    sum: f64,
    compensation: f64,
}

impl KahanAccumulator {
    /// 创建零初值累加器
    pub fn new() -> Self {
        Self::default()
    }

    /// 累加一个值
    #[inline]
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    /// 取当前和
    #[inline]
    pub fn value(&self) -> f64 {
        self.sum
    }

    /// 合并两个累加器（用于并行归约）
    pub fn merge(mut self, other: Self) -> Self {
        self.add(other.sum);
        self.add(other.compensation);
        self
    }
}

/// 对切片做 Kahan 求和
pub fn kahan_sum(values: &[f64]) -> f64 {
    let mut acc = KahanAccumulator::new();
    for &v in values {
        acc.add(v);
    }
    acc.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kahan_vs_naive() {
        // 构造朴素求和会丢失精度的序列
        let mut values = vec![1e16];
        values.extend(std::iter::repeat(1.0).take(1000));
        values.push(-1e16);

        let kahan = kahan_sum(&values);
        assert!((kahan - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_merge() {
        let mut a = KahanAccumulator::new();
        let mut b = KahanAccumulator::new();
        for i in 0..100 {
            a.add(i as f64 * 0.1);
            b.add(i as f64 * 0.2);
        }
        let merged = a.merge(b);
        let direct: f64 = (0..100).map(|i| i as f64 * 0.3).sum();
        assert!((merged.value() - direct).abs() < 1e-9);
    }
}
