// crates/af_physics/src/state.rs

//! 流场状态管理
//!
//! 采用 SoA (Structure of Arrays) 布局：守恒变量是唯一真值，
//! 原始变量、梯度、限制器均为派生缓冲，在相边界处整体重算。
//!
//! ```text
//! conservative: [U_0 | U_1 | ...]        每单元 n_var 个
//! gradients:    [∇V_0 | ∇V_1 | ...]      每单元 n_prim 个 DVec3
//! ```
//!
//! 旧解槽位支持多级 RK（`conservative_old`）与双时间步
//! （`time_n` / `time_n1`）。

use glam::DVec3;
use rayon::prelude::*;

use crate::types::{FaceState, GasModel, VarVec, MAX_NVAR};

/// 平均流状态（SoA）
#[derive(Debug, Clone)]
pub struct FlowField {
    n_dim: usize,
    n_cells: usize,

    /// 守恒变量（真值），n_cells * n_var
    pub conservative: Vec<f64>,
    /// RK 级基准 / 上一迭代解
    pub conservative_old: Vec<f64>,
    /// 物理时间层 n（双时间步）
    pub time_n: Vec<f64>,
    /// 物理时间层 n-1（双时间步）
    pub time_n1: Vec<f64>,

    // ------ 原始变量（派生视图） ------
    /// 密度
    pub density: Vec<f64>,
    /// 速度
    pub velocity: Vec<DVec3>,
    /// 压力
    pub pressure: Vec<f64>,
    /// 温度
    pub temperature: Vec<f64>,
    /// 声速
    pub sound_speed: Vec<f64>,
    /// 层流粘性
    pub mu_laminar: Vec<f64>,
    /// 涡粘（湍流求解器回写）
    pub mu_eddy: Vec<f64>,

    // ------ 重构缓冲 ------
    /// 原始变量梯度 [T, u, v, (w), p]，n_cells * n_prim
    pub gradients: Vec<DVec3>,
    /// 限制器 phi in [0,1]，n_cells * n_prim
    pub limiters: Vec<f64>,
    /// 邻域极小值（限制器工作区）
    pub prim_min: Vec<f64>,
    /// 邻域极大值（限制器工作区）
    pub prim_max: Vec<f64>,

    // ------ 时间推进缓冲 ------
    /// 局部时间步
    pub dt: Vec<f64>,
    /// 对流谱半径
    pub lambda_conv: Vec<f64>,
    /// 粘性谱半径
    pub lambda_visc: Vec<f64>,

    // ------ JST 缓冲 ------
    /// 守恒变量的无除数 Laplacian，n_cells * n_var
    pub und_lapl: Vec<f64>,
    /// 压力传感器
    pub sensor: Vec<f64>,
}

impl FlowField {
    /// 创建并按来流均匀初始化
    pub fn new(n_dim: usize, n_cells: usize) -> Self {
        let n_var = n_dim + 2;
        let n_prim = n_dim + 2;
        Self {
            n_dim,
            n_cells,
            conservative: vec![0.0; n_cells * n_var],
            conservative_old: vec![0.0; n_cells * n_var],
            time_n: Vec::new(),
            time_n1: Vec::new(),
            density: vec![0.0; n_cells],
            velocity: vec![DVec3::ZERO; n_cells],
            pressure: vec![0.0; n_cells],
            temperature: vec![0.0; n_cells],
            sound_speed: vec![0.0; n_cells],
            mu_laminar: vec![0.0; n_cells],
            mu_eddy: vec![0.0; n_cells],
            gradients: vec![DVec3::ZERO; n_cells * n_prim],
            limiters: vec![1.0; n_cells * n_prim],
            prim_min: vec![0.0; n_cells * n_prim],
            prim_max: vec![0.0; n_cells * n_prim],
            dt: vec![0.0; n_cells],
            lambda_conv: vec![0.0; n_cells],
            lambda_visc: vec![0.0; n_cells],
            und_lapl: vec![0.0; n_cells * n_var],
            sensor: vec![0.0; n_cells],
        }
    }

    /// 空间维数
    #[inline]
    pub fn n_dim(&self) -> usize {
        self.n_dim
    }

    /// 守恒变量个数
    #[inline]
    pub fn n_var(&self) -> usize {
        self.n_dim + 2
    }

    /// 原始变量个数（梯度/限制器布局）
    #[inline]
    pub fn n_prim(&self) -> usize {
        self.n_dim + 2
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// 单元守恒变量切片
    #[inline]
    pub fn cons(&self, cell: usize) -> &[f64] {
        let n_var = self.n_var();
        &self.conservative[cell * n_var..(cell + 1) * n_var]
    }

    /// 单元守恒变量定长拷贝
    #[inline]
    pub fn cons_vec(&self, cell: usize) -> VarVec {
        let mut u = [0.0; MAX_NVAR];
        u[..self.n_var()].copy_from_slice(self.cons(cell));
        u
    }

    /// 写单元守恒变量
    #[inline]
    pub fn set_cons(&mut self, cell: usize, u: &[f64]) {
        let n_var = self.n_var();
        self.conservative[cell * n_var..(cell + 1) * n_var].copy_from_slice(&u[..n_var]);
    }

    /// 单元面状态（从缓存原始变量）
    #[inline]
    pub fn face_state(&self, cell: usize) -> FaceState {
        FaceState {
            density: self.density[cell],
            velocity: self.velocity[cell],
            pressure: self.pressure[cell],
        }
    }

    /// 原始变量标量访问（梯度布局：0=T, 1..=n_dim 速度, n_dim+1=p）
    #[inline]
    pub fn primitive(&self, cell: usize, k: usize) -> f64 {
        if k == 0 {
            self.temperature[cell]
        } else if k <= self.n_dim {
            self.velocity[cell][k - 1]
        } else {
            self.pressure[cell]
        }
    }

    /// 单元原始变量梯度切片
    #[inline]
    pub fn gradient(&self, cell: usize, k: usize) -> DVec3 {
        self.gradients[cell * self.n_prim() + k]
    }

    /// 单元限制器
    #[inline]
    pub fn limiter(&self, cell: usize, k: usize) -> f64 {
        self.limiters[cell * self.n_prim() + k]
    }

    /// 按均匀状态初始化
    pub fn initialize_uniform(&mut self, state: &FaceState, gas: &GasModel) {
        let u = state.to_conservative(gas, self.n_dim);
        let n_var = self.n_var();
        for cell in 0..self.n_cells {
            self.conservative[cell * n_var..(cell + 1) * n_var].copy_from_slice(&u[..n_var]);
        }
        self.conservative_old.copy_from_slice(&self.conservative);
        self.refresh_primitives(gas);
    }

    /// 由守恒变量整体重算原始变量（相边界调用）
    ///
    /// 原始变量是守恒变量 + 状态方程的纯函数；U 变化后必须重算。
    pub fn refresh_primitives(&mut self, gas: &GasModel) {
        let n_dim = self.n_dim;
        let n_var = self.n_var();
        let gas = *gas;
        let conservative = &self.conservative;

        self.density
            .par_iter_mut()
            .zip(self.velocity.par_iter_mut())
            .zip(self.pressure.par_iter_mut())
            .zip(self.temperature.par_iter_mut())
            .zip(self.sound_speed.par_iter_mut())
            .zip(self.mu_laminar.par_iter_mut())
            .enumerate()
            .for_each(
                |(cell, (((((density, velocity), pressure), temperature), sound_speed), mu))| {
                    let u = &conservative[cell * n_var..(cell + 1) * n_var];
                    let rho = u[0];
                    let mut vel = DVec3::ZERO;
                    for d in 0..n_dim {
                        vel[d] = u[1 + d] / rho;
                    }
                    let p = (gas.gamma - 1.0) * (u[n_dim + 1] - 0.5 * rho * vel.length_squared());
                    let t = gas.temperature(p, rho);
                    *density = rho;
                    *velocity = vel;
                    *pressure = p;
                    *temperature = t;
                    *sound_speed = gas.sound_speed(p, rho);
                    *mu = gas.laminar_viscosity(t);
                },
            );
    }

    /// 保存当前解为 RK 级基准 / 上一迭代解
    pub fn push_old(&mut self) {
        self.conservative_old.copy_from_slice(&self.conservative);
    }

    /// 启用双时间步存储并以当前解填充两层
    pub fn enable_dual_time(&mut self) {
        self.time_n = self.conservative.clone();
        self.time_n1 = self.conservative.clone();
    }

    /// 物理时间层轮转：n -> n-1，当前 -> n
    pub fn rotate_time_levels(&mut self) {
        std::mem::swap(&mut self.time_n1, &mut self.time_n);
        self.time_n.copy_from_slice(&self.conservative);
    }

    /// 检查单元状态可容许性（正密度、正压）
    #[inline]
    pub fn is_admissible(&self, u: &[f64], gas: &GasModel) -> bool {
        let rho = u[0];
        if !(rho > 0.0) || !rho.is_finite() {
            return false;
        }
        let mut ke = 0.0;
        for d in 0..self.n_dim {
            ke += u[1 + d] * u[1 + d];
        }
        ke /= 2.0 * rho;
        let p = (gas.gamma - 1.0) * (u[self.n_dim + 1] - ke);
        p > 0.0 && p.is_finite()
    }
}

/// 湍流状态（SA: 1 变量；SST: 2 变量）
#[derive(Debug, Clone)]
pub struct TurbField {
    n_cells: usize,
    n_var: usize,

    /// 湍流工作变量，n_cells * n_var
    pub vars: Vec<f64>,
    /// 上一迭代解
    pub vars_old: Vec<f64>,
    /// 梯度，n_cells * n_var
    pub gradients: Vec<DVec3>,
    /// SST 混合函数 F1
    pub f1: Vec<f64>,
    /// SST 混合函数 F2
    pub f2: Vec<f64>,
}

impl TurbField {
    /// 创建
    pub fn new(n_cells: usize, n_var: usize) -> Self {
        Self {
            n_cells,
            n_var,
            vars: vec![0.0; n_cells * n_var],
            vars_old: vec![0.0; n_cells * n_var],
            gradients: vec![DVec3::ZERO; n_cells * n_var],
            f1: vec![1.0; n_cells],
            f2: vec![1.0; n_cells],
        }
    }

    /// 湍流变量个数
    #[inline]
    pub fn n_var(&self) -> usize {
        self.n_var
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// 取变量
    #[inline]
    pub fn var(&self, cell: usize, k: usize) -> f64 {
        self.vars[cell * self.n_var + k]
    }

    /// 写变量
    #[inline]
    pub fn set_var(&mut self, cell: usize, k: usize, value: f64) {
        self.vars[cell * self.n_var + k] = value;
    }

    /// 取梯度
    #[inline]
    pub fn gradient(&self, cell: usize, k: usize) -> DVec3 {
        self.gradients[cell * self.n_var + k]
    }

    /// 保存上一迭代解
    pub fn push_old(&mut self) {
        self.vars_old.copy_from_slice(&self.vars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_config::GasConfig;

    fn gas() -> GasModel {
        GasModel::new(&GasConfig::default())
    }

    #[test]
    fn test_primitives_idempotent() {
        // primitivesFrom(conservativesFrom(V)) = V 到机器精度
        let gas = gas();
        let mut field = FlowField::new(2, 4);
        let state = FaceState {
            density: 0.9,
            velocity: DVec3::new(120.0, -40.0, 0.0),
            pressure: 85000.0,
        };
        field.initialize_uniform(&state, &gas);
        for cell in 0..4 {
            assert!((field.density[cell] - 0.9).abs() < 1e-13);
            assert!((field.pressure[cell] - 85000.0).abs() < 1e-7);
            assert!((field.velocity[cell] - state.velocity).length() < 1e-12);
            let t_expected = gas.temperature(85000.0, 0.9);
            assert!((field.temperature[cell] - t_expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_admissibility() {
        let gas = gas();
        let field = FlowField::new(2, 1);
        let good = [1.0, 10.0, 0.0, 250000.0, 0.0];
        assert!(field.is_admissible(&good[..4], &gas));
        let negative_density = [-1.0, 0.0, 0.0, 250000.0, 0.0];
        assert!(!field.is_admissible(&negative_density[..4], &gas));
        // 动能超过总能 -> 负压
        let negative_pressure = [1.0, 1000.0, 0.0, 100.0, 0.0];
        assert!(!field.is_admissible(&negative_pressure[..4], &gas));
    }

    #[test]
    fn test_time_level_rotation() {
        let gas = gas();
        let mut field = FlowField::new(2, 2);
        let state = FaceState {
            density: 1.0,
            velocity: DVec3::ZERO,
            pressure: 1e5,
        };
        field.initialize_uniform(&state, &gas);
        field.enable_dual_time();
        let before = field.conservative.clone();
        field.conservative[0] += 0.5;
        field.rotate_time_levels();
        assert_eq!(field.time_n[0], before[0] + 0.5);
        assert_eq!(field.time_n1[0], before[0]);
    }
}
