// crates/af_physics/src/freestream.rs

//! 来流状态构造
//!
//! 由马赫数、迎角/侧滑角与静参数构造来流；当配置给定目标雷诺数时，
//! 重标定 Sutherland 粘性使参考长度下的来流雷诺数精确匹配。

use glam::DVec3;

use af_config::{Dimension, FreestreamConfig, GasConfig, ReferenceConfig};

use crate::types::{FaceState, GasModel};

/// 来流状态
#[derive(Debug, Clone, Copy)]
pub struct Freestream {
    /// 来流原始状态
    pub state: FaceState,
    /// 静温 [K]
    pub temperature: f64,
    /// 马赫数
    pub mach: f64,
    /// 速度模 [m/s]
    pub speed: f64,
    /// 流向单位向量
    pub direction: DVec3,
    /// 来流层流粘性 [Pa·s]
    pub viscosity: f64,
    /// 动压 q = rho V^2 / 2 [Pa]
    pub dynamic_pressure: f64,
}

impl Freestream {
    /// 由配置构造来流，并在需要时重标定气体模型的粘性缩放
    ///
    /// 方向约定（与风轴一致）：
    /// - 2D: (cos α, sin α)
    /// - 3D: (cos α·cos β, sin β, sin α·cos β)
    pub fn build(
        config: &FreestreamConfig,
        reference: &ReferenceConfig,
        gas_config: &GasConfig,
        dimension: Dimension,
        gas: &mut GasModel,
    ) -> Self {
        let alpha = config.aoa.to_radians();
        let beta = config.sideslip.to_radians();
        let direction = match dimension {
            Dimension::Two => DVec3::new(alpha.cos(), alpha.sin(), 0.0),
            Dimension::Three => DVec3::new(
                alpha.cos() * beta.cos(),
                beta.sin(),
                alpha.sin() * beta.cos(),
            ),
        };

        let temperature = config.temperature;
        let pressure = config.pressure;
        let density = pressure / (gas_config.gas_constant * temperature);
        let sound_speed = (gas_config.gamma * pressure / density).sqrt();
        let speed = config.mach * sound_speed;
        let velocity = speed * direction;

        // 雷诺数匹配：mu_inf = rho V L / Re
        if config.reynolds > 0.0 {
            let target_mu = density * speed * reference.length / config.reynolds;
            let sutherland_mu = {
                let unscaled = GasModel {
                    viscosity_scale: 1.0,
                    ..*gas
                };
                unscaled.laminar_viscosity(temperature)
            };
            gas.viscosity_scale = target_mu / sutherland_mu;
        }
        let viscosity = gas.laminar_viscosity(temperature);

        Self {
            state: FaceState {
                density,
                velocity,
                pressure,
            },
            temperature,
            mach: config.mach,
            speed,
            direction,
            viscosity,
            dynamic_pressure: 0.5 * density * speed * speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_config::SolverConfig;

    #[test]
    fn test_direction_2d() {
        let mut config = SolverConfig::default();
        config.freestream.aoa = 90.0;
        let mut gas = GasModel::new(&config.gas);
        let fs = Freestream::build(
            &config.freestream,
            &config.reference,
            &config.gas,
            config.dimension,
            &mut gas,
        );
        assert!(fs.direction.x.abs() < 1e-12);
        assert!((fs.direction.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_atmosphere() {
        let config = SolverConfig::default();
        let mut gas = GasModel::new(&config.gas);
        let fs = Freestream::build(
            &config.freestream,
            &config.reference,
            &config.gas,
            config.dimension,
            &mut gas,
        );
        // 海平面标准大气密度约 1.225 kg/m^3
        assert!((fs.state.density - 1.225).abs() < 1e-2);
        // M=0.3 对应约 102 m/s
        assert!((fs.speed - 0.3 * 340.3).abs() < 1.0);
    }

    #[test]
    fn test_reynolds_rescaling() {
        let mut config = SolverConfig::default();
        config.freestream.reynolds = 1e6;
        let mut gas = GasModel::new(&config.gas);
        let fs = Freestream::build(
            &config.freestream,
            &config.reference,
            &config.gas,
            config.dimension,
            &mut gas,
        );
        let re = fs.state.density * fs.speed * config.reference.length / fs.viscosity;
        assert!((re - 1e6).abs() / 1e6 < 1e-12);
    }
}
