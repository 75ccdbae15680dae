// crates/af_physics/src/engine/forces.rs

//! 气动力与力矩系数
//!
//! 对被监视标记的边界面积分压力与粘性应力，
//! 经风轴旋转得到升力/阻力/侧力系数，
//! 力矩对参考点取矩并用参考长度归一化。

use glam::DVec3;

use af_config::ReferenceConfig;
use af_mesh::DualGeometry;

use crate::boundary::ResolvedMarker;
use crate::freestream::Freestream;
use crate::state::FlowField;

/// 力与力矩系数
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceCoefficients {
    /// 升力系数
    pub cl: f64,
    /// 阻力系数
    pub cd: f64,
    /// 侧力系数（3D）
    pub csf: f64,
    /// 力矩系数（2D 取 z 分量）
    pub cm: f64,
    /// 压差阻力分量
    pub cd_pressure: f64,
    /// 摩擦阻力分量
    pub cd_friction: f64,
}

/// 对监视标记积分气动力
pub fn compute_force_coefficients(
    geometry: &DualGeometry,
    state: &FlowField,
    markers: &[ResolvedMarker],
    freestream: &Freestream,
    reference: &ReferenceConfig,
    viscous: bool,
) -> ForceCoefficients {
    let n_dim = state.n_dim();
    let n_prim = state.n_prim();
    let origin = DVec3::from_array(reference.moment_origin);

    let mut force_pressure = DVec3::ZERO;
    let mut force_friction = DVec3::ZERO;
    let mut moment = DVec3::ZERO;

    for marker in markers.iter().filter(|m| m.monitored) {
        for face in geometry.marker_faces(marker.marker) {
            let cell = face.cell;
            let lever = face.midpoint - origin;

            // 压力贡献（减来流压力消除均匀分量）
            let dp = state.pressure[cell] - freestream.state.pressure;
            let f_p = dp * face.normal;
            force_pressure += f_p;
            moment += lever.cross(f_p);

            // 粘性贡献 −τ·n（壁面对流体的反作用）
            if viscous {
                let mu = state.mu_laminar[cell] + state.mu_eddy[cell];
                let grads = &state.gradients[cell * n_prim..(cell + 1) * n_prim];
                let mut divergence = 0.0;
                for d in 0..n_dim {
                    divergence += grads[1 + d][d];
                }
                let area = face.area();
                let unit_normal = face.normal / area;
                let mut tau_n = DVec3::ZERO;
                for m in 0..n_dim {
                    let mut sum = 0.0;
                    for d in 0..n_dim {
                        let mut tau_md = mu * (grads[1 + m][d] + grads[1 + d][m]);
                        if m == d {
                            tau_md -= 2.0 / 3.0 * mu * divergence;
                        }
                        sum += tau_md * unit_normal[d];
                    }
                    tau_n[m] = sum;
                }
                let f_v = -tau_n * area;
                force_friction += f_v;
                moment += lever.cross(f_v);
            }
        }
    }

    let q_ref = freestream.dynamic_pressure * reference.area;
    let inv_q = if q_ref > 0.0 { 1.0 / q_ref } else { 0.0 };

    // 风轴方向
    let drag_dir = freestream.direction;
    let alpha = freestream.direction.z.atan2(freestream.direction.x);
    let lift_dir = if n_dim == 2 {
        // 2D: 升力方向在 x-y 平面内垂直于来流
        DVec3::new(-freestream.direction.y, freestream.direction.x, 0.0)
    } else {
        DVec3::new(-alpha.sin(), 0.0, alpha.cos())
    };
    let side_dir = if n_dim == 2 {
        DVec3::ZERO
    } else {
        lift_dir.cross(drag_dir).normalize_or_zero()
    };

    let total = force_pressure + force_friction;
    ForceCoefficients {
        cl: total.dot(lift_dir) * inv_q,
        cd: total.dot(drag_dir) * inv_q,
        csf: total.dot(side_dir) * inv_q,
        cm: moment.z * inv_q / reference.length,
        cd_pressure: force_pressure.dot(drag_dir) * inv_q,
        cd_friction: force_friction.dot(drag_dir) * inv_q,
    }
}
