// crates/af_config/src/boundary.rs

//! 边界标记配置
//!
//! 每个网格标记 (marker) 关联一种边界条件及其参数。
//! 条件是定义，面是几何实体，二者通过标记名关联。

use serde::{Deserialize, Serialize};

/// 单个边界标记的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// 标记名（与网格文件中的标记对应）
    pub name: String,

    /// 边界条件种类与参数
    #[serde(flatten)]
    pub kind: BoundaryKindConfig,

    /// 是否参与气动力积分
    #[serde(default)]
    pub monitored: bool,
}

/// 边界条件种类与参数
///
/// serde 内部标签 `bc`，JSON 形如
/// `{ "name": "airfoil", "bc": "wall_heatflux", "heat_flux": 0.0 }`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "bc", rename_all = "snake_case")]
pub enum BoundaryKindConfig {
    /// 无滑移壁面，给定热流（默认绝热 q=0）
    WallHeatflux {
        /// 壁面热流 [W/m^2]，正值为流入流体
        #[serde(default)]
        heat_flux: f64,
    },

    /// 无滑移等温壁面
    WallIsothermal {
        /// 壁温 [K]
        temperature: f64,
    },

    /// 无粘滑移壁面（Euler 壁）
    WallInviscid,

    /// 远场（特征化，按来流状态）
    Farfield,

    /// 对称面
    Symmetry,

    /// 总参数入口
    InletTotal {
        /// 总压 [Pa]
        total_pressure: f64,
        /// 总温 [K]
        total_temperature: f64,
        /// 来流方向（归一化在求解器内完成）
        #[serde(default = "default_inlet_direction")]
        direction: [f64; 3],
    },

    /// 静压出口
    OutletPressure {
        /// 背压 [Pa]
        static_pressure: f64,
    },
}

fn default_inlet_direction() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

impl BoundaryKindConfig {
    /// 是否为无滑移粘性壁面
    pub fn is_viscous_wall(&self) -> bool {
        matches!(
            self,
            BoundaryKindConfig::WallHeatflux { .. } | BoundaryKindConfig::WallIsothermal { .. }
        )
    }

    /// 是否为壁面类边界（用于壁面距离计算）
    pub fn is_wall(&self) -> bool {
        self.is_viscous_wall() || matches!(self, BoundaryKindConfig::WallInviscid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let json = r#"{ "name": "airfoil", "bc": "wall_heatflux", "monitored": true }"#;
        let marker: MarkerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            marker.kind,
            BoundaryKindConfig::WallHeatflux { heat_flux: 0.0 }
        );
        assert!(marker.monitored);
        assert!(marker.kind.is_viscous_wall());
    }

    #[test]
    fn test_inlet_defaults() {
        let json = r#"{ "name": "in", "bc": "inlet_total",
                        "total_pressure": 120000.0, "total_temperature": 300.0 }"#;
        let marker: MarkerConfig = serde_json::from_str(json).unwrap();
        match marker.kind {
            BoundaryKindConfig::InletTotal { direction, .. } => {
                assert_eq!(direction, [1.0, 0.0, 0.0]);
            }
            _ => panic!("expected inlet_total"),
        }
    }

    #[test]
    fn test_wall_classification() {
        assert!(BoundaryKindConfig::WallInviscid.is_wall());
        assert!(!BoundaryKindConfig::WallInviscid.is_viscous_wall());
        assert!(!BoundaryKindConfig::Farfield.is_wall());
    }
}
