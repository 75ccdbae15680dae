// crates/af_physics/src/boundary/mod.rs

//! 边界条件
//!
//! 边界条件在残差/通量层面施加，按三类处理：
//!
//! 1. **虚状态类**（远场 / 总参数入口 / 静压出口）：由内侧状态与
//!    边界参数构造虚状态，用配置的对流格式算通量，Jacobian 只取
//!    内侧块（虚状态冻结）
//! 2. **弱壁面类**（无粘壁 / 对称面）：零质量通量，动量取压力项
//! 3. **强施加类**（无滑移壁面）：节点中心格式下壁面节点位于边界上，
//!    速度（等温壁加温度）直接固定，动量（/能量）残差行清零、
//!    Jacobian 行置单位；给定热流的壁面能量方程保留并加热流项
//!
//! 条件是定义，面是几何实体，二者经标记名关联。

use glam::DVec3;

use af_config::{BoundaryKindConfig, MarkerConfig};
use af_mesh::DualGeometry;

use crate::error::{SolverError, SolverResult};
use crate::freestream::Freestream;
use crate::types::{FaceState, GasModel};

/// 运行期边界条件（参数已解析）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryCondition {
    /// 无粘滑移壁
    InviscidWall,
    /// 对称面
    Symmetry,
    /// 无滑移壁面，给定热流 [W/m^2]
    WallHeatflux {
        /// 热流，正值为流入流体
        heat_flux: f64,
    },
    /// 无滑移等温壁面
    WallIsothermal {
        /// 壁温 [K]
        temperature: f64,
    },
    /// 远场
    Farfield,
    /// 总参数入口
    InletTotal {
        /// 总压 [Pa]
        total_pressure: f64,
        /// 总温 [K]
        total_temperature: f64,
        /// 单位流向
        direction: DVec3,
    },
    /// 静压出口
    OutletPressure {
        /// 背压 [Pa]
        static_pressure: f64,
    },
}

impl BoundaryCondition {
    /// 是否为无滑移粘性壁面
    pub fn is_viscous_wall(&self) -> bool {
        matches!(
            self,
            BoundaryCondition::WallHeatflux { .. } | BoundaryCondition::WallIsothermal { .. }
        )
    }

    /// 是否为壁面类（滑移或无滑移）
    pub fn is_wall(&self) -> bool {
        self.is_viscous_wall() || matches!(self, BoundaryCondition::InviscidWall)
    }

    /// 是否经虚状态 + 对流格式求通量
    pub fn uses_ghost_scheme(&self) -> bool {
        matches!(
            self,
            BoundaryCondition::Farfield
                | BoundaryCondition::InletTotal { .. }
                | BoundaryCondition::OutletPressure { .. }
        )
    }

    /// 构造虚状态（仅虚状态类边界）
    pub fn ghost_state(
        &self,
        interior: &FaceState,
        gas: &GasModel,
        freestream: &Freestream,
    ) -> Option<FaceState> {
        match *self {
            BoundaryCondition::Farfield => Some(freestream.state),

            BoundaryCondition::InletTotal {
                total_pressure,
                total_temperature,
                direction,
            } => {
                // 静压由内侧带出，总温沿等熵关系给出静温与速度
                let p_static = interior.pressure.min(total_pressure);
                let exponent = (gas.gamma - 1.0) / gas.gamma;
                let t_static = total_temperature * (p_static / total_pressure).powf(exponent);
                let speed = (2.0 * gas.cp() * (total_temperature - t_static).max(0.0)).sqrt();
                Some(FaceState {
                    density: p_static / (gas.gas_constant * t_static),
                    velocity: speed * direction,
                    pressure: p_static,
                })
            }

            BoundaryCondition::OutletPressure { static_pressure } => {
                let a = interior.sound_speed(gas);
                if interior.velocity.length() >= a {
                    // 超声速出口：全部外推
                    Some(*interior)
                } else {
                    // 亚声速：背压 + 等熵密度修正，速度外推
                    let density = interior.density
                        * (static_pressure / interior.pressure).powf(1.0 / gas.gamma);
                    Some(FaceState {
                        density,
                        velocity: interior.velocity,
                        pressure: static_pressure,
                    })
                }
            }

            _ => None,
        }
    }
}

/// 解析完成的标记
#[derive(Debug, Clone)]
pub struct ResolvedMarker {
    /// 几何标记索引
    pub marker: usize,
    /// 标记名
    pub name: String,
    /// 条件
    pub condition: BoundaryCondition,
    /// 是否参与气动力积分
    pub monitored: bool,
}

/// 将配置标记解析到几何标记
///
/// 双向校验：配置引用的标记必须存在于网格；
/// 网格的每个标记必须有配置（缺条件的边界面无法装配）。
pub fn resolve_markers(
    geometry: &DualGeometry,
    configs: &[MarkerConfig],
) -> SolverResult<Vec<ResolvedMarker>> {
    let mut resolved = Vec::with_capacity(configs.len());
    for config in configs {
        let marker = geometry.marker_index(&config.name)?;
        let condition = match &config.kind {
            BoundaryKindConfig::WallHeatflux { heat_flux } => BoundaryCondition::WallHeatflux {
                heat_flux: *heat_flux,
            },
            BoundaryKindConfig::WallIsothermal { temperature } => {
                BoundaryCondition::WallIsothermal {
                    temperature: *temperature,
                }
            }
            BoundaryKindConfig::WallInviscid => BoundaryCondition::InviscidWall,
            BoundaryKindConfig::Farfield => BoundaryCondition::Farfield,
            BoundaryKindConfig::Symmetry => BoundaryCondition::Symmetry,
            BoundaryKindConfig::InletTotal {
                total_pressure,
                total_temperature,
                direction,
            } => BoundaryCondition::InletTotal {
                total_pressure: *total_pressure,
                total_temperature: *total_temperature,
                direction: DVec3::from_array(*direction).normalize(),
            },
            BoundaryKindConfig::OutletPressure { static_pressure } => {
                BoundaryCondition::OutletPressure {
                    static_pressure: *static_pressure,
                }
            }
        };
        resolved.push(ResolvedMarker {
            marker,
            name: config.name.clone(),
            condition,
            monitored: config.monitored,
        });
    }

    for geo_marker in geometry.markers() {
        if !resolved.iter().any(|r| r.name == geo_marker.name) {
            return Err(SolverError::InputInvalid(format!(
                "网格标记 `{}` 缺少边界条件配置",
                geo_marker.name
            )));
        }
    }
    Ok(resolved)
}

/// 壁面标记名列表（壁面距离计算用）
pub fn wall_marker_names(configs: &[MarkerConfig]) -> Vec<String> {
    configs
        .iter()
        .filter(|m| m.kind.is_wall())
        .map(|m| m.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use af_config::{FreestreamConfig, GasConfig, ReferenceConfig};

    fn setup() -> (GasModel, Freestream) {
        let mut gas = GasModel::new(&GasConfig::default());
        let freestream = Freestream::build(
            &FreestreamConfig::default(),
            &ReferenceConfig::default(),
            &GasConfig::default(),
            af_config::Dimension::Two,
            &mut gas,
        );
        (gas, freestream)
    }

    #[test]
    fn test_farfield_ghost_is_freestream() {
        let (gas, freestream) = setup();
        let interior = FaceState {
            density: 1.0,
            velocity: DVec3::new(50.0, 0.0, 0.0),
            pressure: 9e4,
        };
        let ghost = BoundaryCondition::Farfield
            .ghost_state(&interior, &gas, &freestream)
            .unwrap();
        assert_eq!(ghost.pressure, freestream.state.pressure);
    }

    #[test]
    fn test_inlet_total_consistency() {
        // 虚状态的总压/总温不超过给定值
        let (gas, freestream) = setup();
        let interior = FaceState {
            density: 1.1,
            velocity: DVec3::new(80.0, 0.0, 0.0),
            pressure: 9.5e4,
        };
        let bc = BoundaryCondition::InletTotal {
            total_pressure: 1.1e5,
            total_temperature: 300.0,
            direction: DVec3::new(1.0, 0.0, 0.0),
        };
        let ghost = bc.ghost_state(&interior, &gas, &freestream).unwrap();
        let t_static = gas.temperature(ghost.pressure, ghost.density);
        let t_total = t_static + ghost.velocity.length_squared() / (2.0 * gas.cp());
        assert!((t_total - 300.0).abs() < 1e-9);
        assert!(ghost.pressure <= 1.1e5);
    }

    #[test]
    fn test_outlet_subsonic_imposes_back_pressure() {
        let (gas, freestream) = setup();
        let interior = FaceState {
            density: 1.0,
            velocity: DVec3::new(100.0, 0.0, 0.0),
            pressure: 1.0e5,
        };
        let bc = BoundaryCondition::OutletPressure {
            static_pressure: 0.9e5,
        };
        let ghost = bc.ghost_state(&interior, &gas, &freestream).unwrap();
        assert_eq!(ghost.pressure, 0.9e5);
        // 等熵修正使密度随压力下降
        assert!(ghost.density < interior.density);
    }

    #[test]
    fn test_outlet_supersonic_extrapolates() {
        let (gas, freestream) = setup();
        let interior = FaceState {
            density: 1.0,
            velocity: DVec3::new(600.0, 0.0, 0.0),
            pressure: 1.0e5,
        };
        let bc = BoundaryCondition::OutletPressure {
            static_pressure: 0.5e5,
        };
        let ghost = bc.ghost_state(&interior, &gas, &freestream).unwrap();
        assert_eq!(ghost.pressure, interior.pressure);
    }

    #[test]
    fn test_classification() {
        assert!(BoundaryCondition::Farfield.uses_ghost_scheme());
        assert!(!BoundaryCondition::Symmetry.uses_ghost_scheme());
        assert!(BoundaryCondition::WallIsothermal { temperature: 300.0 }.is_viscous_wall());
        assert!(!BoundaryCondition::Symmetry.is_wall());
    }
}
