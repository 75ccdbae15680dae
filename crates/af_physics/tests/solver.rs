// crates/af_physics/tests/solver.rs

//! 求解器级不变量验证
//!
//! - 来流保持：均匀来流在任意网格上残差为舍入量级
//! - 守恒：封闭域内质量/能量残差总和为零
//! - 旋转不变性：网格与来流同旋，残差按同一旋转变换
//! - 对称性：对称网格 + 对称边界下解保持对称
//! - 端到端冒烟：隐式/显式/双时间步各推若干步不失稳

use std::f64::consts::PI;

use glam::DVec3;

use af_config::{
    BoundaryKindConfig, ConvectiveSchemeKind, Dimension, FlowRegime, MarkerConfig, SolverConfig,
    TimeIntegrationKind, TurbulenceModelKind,
};
use af_mesh::generation::{BoxMeshGenerator, RectMeshGenerator};
use af_mesh::{DualGeometry, RawMesh};
use af_physics::boundary::wall_marker_names;
use af_physics::engine::{
    compute_local_time_steps, Integration, MeanFlowSolver, NullMonitor, TurbulenceSolver,
};
use af_physics::turbulence::TurbulenceModel;
use af_physics::{FlowField, Freestream, GasModel, TurbField};

fn marker(name: &str, kind: BoundaryKindConfig) -> MarkerConfig {
    MarkerConfig {
        name: name.into(),
        kind,
        monitored: false,
    }
}

fn all_farfield() -> Vec<MarkerConfig> {
    ["left", "right", "bottom", "top"]
        .iter()
        .map(|n| marker(n, BoundaryKindConfig::Farfield))
        .collect()
}

fn euler_config(markers: Vec<MarkerConfig>) -> SolverConfig {
    let mut config = SolverConfig::default();
    config.regime = FlowRegime::Euler;
    config.turbulence = TurbulenceModelKind::None;
    config.markers = markers;
    config
}

struct Setup {
    geometry: DualGeometry,
    solver: MeanFlowSolver,
    state: FlowField,
    gas: GasModel,
    freestream: Freestream,
}

fn build(raw: &RawMesh, config: &SolverConfig) -> Setup {
    config.validate().unwrap();
    let walls = wall_marker_names(&config.markers);
    let geometry = DualGeometry::build(raw, &walls).unwrap();
    let mut gas = GasModel::new(&config.gas);
    let freestream = Freestream::build(
        &config.freestream,
        &config.reference,
        &config.gas,
        config.dimension,
        &mut gas,
    );
    let solver = MeanFlowSolver::new(&geometry, config, gas, freestream).unwrap();
    let mut state = FlowField::new(geometry.n_dim(), geometry.n_cells());
    state.initialize_uniform(&freestream.state, &gas);
    Setup {
        geometry,
        solver,
        state,
        gas,
        freestream,
    }
}

fn max_residual(solver: &MeanFlowSolver, n_cells: usize, n_var: usize) -> f64 {
    (0..n_cells * n_var)
        .map(|k| solver.residual[k].abs())
        .fold(0.0, f64::max)
}

// ============================================================
// 来流保持
// ============================================================

#[test]
fn test_freestream_preservation_distorted_2d() {
    let raw = RectMeshGenerator::new(8, 7, 1.0, 1.0)
        .with_distortion(0.25)
        .build();
    let config = euler_config(all_farfield());
    let mut setup = build(&raw, &config);

    setup.solver.prepare(&setup.geometry, &mut setup.state);
    compute_local_time_steps(&setup.geometry, &mut setup.state, 1.0, false);
    setup
        .solver
        .compute_residual(&setup.geometry, &setup.state, false);

    let worst = max_residual(&setup.solver, setup.geometry.n_cells(), 4);
    assert!(worst < 1e-7, "‖R‖_inf = {worst:.3e}");
}

#[test]
fn test_freestream_preservation_distorted_3d_hex() {
    // 扭曲六面体网格上的均匀流：一次装配后残差为舍入量级
    let raw = BoxMeshGenerator::new(4, 3, 3, 1.0, 1.0, 1.0)
        .with_distortion(0.2)
        .build();
    let mut config = euler_config(
        ["left", "right", "bottom", "top", "front", "back"]
            .iter()
            .map(|n| marker(n, BoundaryKindConfig::Farfield))
            .collect(),
    );
    config.dimension = Dimension::Three;
    let mut setup = build(&raw, &config);

    setup.solver.prepare(&setup.geometry, &mut setup.state);
    compute_local_time_steps(&setup.geometry, &mut setup.state, 1.0, false);
    setup
        .solver
        .compute_residual(&setup.geometry, &setup.state, false);

    let worst = max_residual(&setup.solver, setup.geometry.n_cells(), 5);
    assert!(worst < 1e-7, "‖R‖_inf = {worst:.3e}");
}

#[test]
fn test_freestream_preservation_all_schemes() {
    for scheme in [
        ConvectiveSchemeKind::Roe,
        ConvectiveSchemeKind::Jst,
        ConvectiveSchemeKind::Ausm,
        ConvectiveSchemeKind::Hllc,
    ] {
        let raw = RectMeshGenerator::new(6, 6, 1.0, 1.0)
            .with_distortion(0.15)
            .build();
        let mut config = euler_config(all_farfield());
        config.numerics.convective_scheme = scheme;
        let mut setup = build(&raw, &config);

        setup.solver.prepare(&setup.geometry, &mut setup.state);
        compute_local_time_steps(&setup.geometry, &mut setup.state, 1.0, false);
        setup
            .solver
            .compute_residual(&setup.geometry, &setup.state, false);
        let worst = max_residual(&setup.solver, setup.geometry.n_cells(), 4);
        assert!(worst < 1e-7, "{scheme:?}: ‖R‖_inf = {worst:.3e}");
    }
}

// ============================================================
// 守恒
// ============================================================

#[test]
fn test_global_conservation_closed_box() {
    // 全无粘壁封闭域 + 非均匀内部状态：
    // 内部边贡献严格抵消，壁面无质量/能量通量，
    // 故质量与能量残差总和为零（舍入量级）
    let raw = RectMeshGenerator::new(7, 5, 1.0, 1.0)
        .with_distortion(0.2)
        .build();
    let mut config = euler_config(
        ["left", "right", "bottom", "top"]
            .iter()
            .map(|n| marker(n, BoundaryKindConfig::WallInviscid))
            .collect(),
    );
    config.numerics.muscl = false;
    let mut setup = build(&raw, &config);

    // 制造非均匀但可容许的状态
    let n_cells = setup.geometry.n_cells();
    for c in 0..n_cells {
        let x = setup.geometry.cell_center(c);
        let state = af_physics::FaceState {
            density: 1.0 + 0.1 * (2.0 * PI * x.x).sin(),
            velocity: DVec3::new(30.0 * x.y, -20.0 * x.x, 0.0),
            pressure: 1e5 * (1.0 + 0.05 * (PI * x.y).cos()),
        };
        let u = state.to_conservative(&setup.gas, 2);
        setup.state.set_cons(c, &u[..4]);
    }

    setup.solver.prepare(&setup.geometry, &mut setup.state);
    compute_local_time_steps(&setup.geometry, &mut setup.state, 1.0, false);
    setup
        .solver
        .compute_residual(&setup.geometry, &setup.state, false);

    let mut mass_sum = 0.0;
    let mut energy_sum = 0.0;
    let mut mass_scale = 0.0_f64;
    for c in 0..n_cells {
        mass_sum += setup.solver.residual[c * 4];
        energy_sum += setup.solver.residual[c * 4 + 3];
        mass_scale = mass_scale.max(setup.solver.residual[c * 4].abs());
    }
    assert!(mass_sum.abs() < 1e-10 * mass_scale.max(1.0), "Σ R_mass = {mass_sum:.3e}");
    assert!(energy_sum.abs() < 1e-7, "Σ R_energy = {energy_sum:.3e}");
}

// ============================================================
// 旋转不变性
// ============================================================

#[test]
fn test_rotational_invariance() {
    let theta: f64 = PI / 6.0;
    let (sin_t, cos_t) = theta.sin_cos();
    let rotate = |p: DVec3| DVec3::new(cos_t * p.x - sin_t * p.y, sin_t * p.x + cos_t * p.y, 0.0);

    // 基准网格与旋转网格
    let raw1 = RectMeshGenerator::new(6, 5, 1.0, 1.0)
        .with_distortion(0.15)
        .build();
    let mut raw2 = raw1.clone();
    for p in &mut raw2.points {
        let r = rotate(DVec3::from_array(*p));
        *p = r.to_array();
    }

    let config1 = euler_config(all_farfield());
    let mut config2 = euler_config(all_farfield());
    config2.freestream.aoa = theta.to_degrees();

    let mut s1 = build(&raw1, &config1);
    let mut s2 = build(&raw2, &config2);

    // 同一制造场，第二个网格上按旋转后坐标采样并旋转速度
    let field = |x: DVec3| {
        af_physics::FaceState {
            density: 1.0 + 0.08 * (2.0 * x.x + x.y).sin(),
            velocity: DVec3::new(60.0 + 10.0 * x.y, 5.0 * x.x, 0.0),
            pressure: 1e5 + 3e3 * (x.x - 0.5 * x.y),
        }
    };
    for c in 0..s1.geometry.n_cells() {
        let x = s1.geometry.cell_center(c);
        let base = field(x);
        let u1 = base.to_conservative(&s1.gas, 2);
        s1.state.set_cons(c, &u1[..4]);

        let rotated = af_physics::FaceState {
            density: base.density,
            velocity: rotate(base.velocity),
            pressure: base.pressure,
        };
        let u2 = rotated.to_conservative(&s2.gas, 2);
        s2.state.set_cons(c, &u2[..4]);
    }

    for setup in [&mut s1, &mut s2] {
        setup.solver.prepare(&setup.geometry, &mut setup.state);
        setup
            .solver
            .compute_residual(&setup.geometry, &setup.state, false);
    }

    // R2 = Rot(R1)：质量/能量相等，动量分量旋转。
    // 几何量与来流方向各带一次舍入，再被通量尺度放大，
    // 容差取 1e-6（相对于逐变量残差尺度）。
    let mut scale = [0.0_f64; 4];
    for c in 0..s1.geometry.n_cells() {
        for k in 0..4 {
            scale[k] = scale[k].max(s1.solver.residual[c * 4 + k].abs());
        }
    }
    let mut worst_rel: f64 = 0.0;
    for c in 0..s1.geometry.n_cells() {
        let r1 = &s1.solver.residual[c * 4..(c + 1) * 4];
        let r2 = &s2.solver.residual[c * 4..(c + 1) * 4];
        let momentum_rotated = rotate(DVec3::new(r1[1], r1[2], 0.0));
        let expected = [r1[0], momentum_rotated.x, momentum_rotated.y, r1[3]];
        for k in 0..4 {
            worst_rel =
                worst_rel.max((r2[k] - expected[k]).abs() / scale[k].max(1e-300));
        }
    }
    assert!(worst_rel < 1e-6, "最大相对偏差 {worst_rel:.3e}");
}

// ============================================================
// 对称性与端到端冒烟
// ============================================================

#[test]
fn test_channel_symmetry_preserved() {
    // 上下壁 + 左右远场的水平来流：均匀解是精确定常解，
    // 隐式迭代后保持对称（且保持均匀）
    let raw = RectMeshGenerator::new(8, 6, 2.0, 1.0).build();
    let mut config = euler_config(vec![
        marker("left", BoundaryKindConfig::Farfield),
        marker("right", BoundaryKindConfig::Farfield),
        marker("bottom", BoundaryKindConfig::WallInviscid),
        marker("top", BoundaryKindConfig::WallInviscid),
    ]);
    config.time.integration = TimeIntegrationKind::ImplicitEuler;
    let mut setup = build(&raw, &config);

    for _ in 0..3 {
        let outcome = setup
            .solver
            .iterate(&setup.geometry, &mut setup.state, 10.0);
        assert!(outcome.admissible);
        assert!(!outcome.nan);
    }

    // 以 y=0.5 为镜像：密度场对称
    let ny = 6usize;
    let nx = 8usize;
    for j in 0..=(ny / 2) {
        for i in 0..=nx {
            let lower = j * (nx + 1) + i;
            let upper = (ny - j) * (nx + 1) + i;
            let diff = (setup.state.density[lower] - setup.state.density[upper]).abs();
            assert!(diff < 1e-10, "({i}, {j}): Δρ = {diff:.3e}");
        }
    }
}

#[test]
fn test_implicit_integration_smoke() {
    let raw = RectMeshGenerator::new(5, 5, 1.0, 1.0).build();
    let mut config = euler_config(all_farfield());
    config.time.max_iterations = 5;
    config.time.cfl_init = 5.0;
    let mut setup = build(&raw, &config);

    let mut integration = Integration::new(&config);
    let mut monitor = NullMonitor;
    let report = integration
        .run(
            &setup.geometry,
            &mut setup.solver,
            None,
            &mut setup.state,
            &mut monitor,
            None,
        )
        .unwrap();
    assert_eq!(report.iterations, 5);
    // 均匀来流保持均匀
    for c in 0..setup.geometry.n_cells() {
        assert!((setup.state.density[c] - setup.freestream.state.density).abs() < 1e-9);
    }
    // CFL 随成功迭代增长
    assert!(integration.cfl() > config.time.cfl_init);
}

#[test]
fn test_explicit_rk_smoke() {
    let raw = RectMeshGenerator::new(5, 5, 1.0, 1.0).build();
    let mut config = euler_config(all_farfield());
    config.time.integration = TimeIntegrationKind::ExplicitRk;
    config.time.max_iterations = 3;
    config.time.cfl_init = 0.8;
    config.time.cfl_max = 0.8;
    let mut setup = build(&raw, &config);

    let mut integration = Integration::new(&config);
    let mut monitor = NullMonitor;
    let report = integration
        .run(
            &setup.geometry,
            &mut setup.solver,
            None,
            &mut setup.state,
            &mut monitor,
            None,
        )
        .unwrap();
    assert_eq!(report.iterations, 3);
    for c in 0..setup.geometry.n_cells() {
        assert!((setup.state.pressure[c] - setup.freestream.state.pressure).abs() < 1e-6);
    }
}

#[test]
fn test_dual_time_smoke() {
    let raw = RectMeshGenerator::new(4, 4, 1.0, 1.0).build();
    let mut config = euler_config(all_farfield());
    config.time.integration = TimeIntegrationKind::DualTimeBdf2;
    config.time.n_physical_steps = 2;
    config.time.inner_iterations = 3;
    config.time.dt_physical = 1e-4;
    let mut setup = build(&raw, &config);

    let mut integration = Integration::new(&config);
    let mut monitor = NullMonitor;
    integration
        .run(
            &setup.geometry,
            &mut setup.solver,
            None,
            &mut setup.state,
            &mut monitor,
            None,
        )
        .unwrap();
    // 均匀流在物理推进下保持均匀
    for c in 0..setup.geometry.n_cells() {
        assert!((setup.state.density[c] - setup.freestream.state.density).abs() < 1e-9);
    }
}

#[test]
fn test_rans_sa_smoke() {
    // RANS-SA：湍流场初始化为来流值并保持正性
    let raw = RectMeshGenerator::new(6, 4, 1.0, 0.5).build();
    let mut config = SolverConfig::default();
    config.regime = FlowRegime::Rans;
    config.turbulence = TurbulenceModelKind::Sa;
    config.markers = vec![
        marker("left", BoundaryKindConfig::Farfield),
        marker("right", BoundaryKindConfig::Farfield),
        marker("top", BoundaryKindConfig::Farfield),
        marker("bottom", BoundaryKindConfig::WallHeatflux { heat_flux: 0.0 }),
    ];
    config.time.max_iterations = 3;
    let mut setup = build(&raw, &config);

    let model = TurbulenceModel::from_kind(config.effective_turbulence()).unwrap();
    let mut turb_solver = TurbulenceSolver::new(
        &setup.geometry,
        &config,
        setup.gas,
        &setup.freestream,
        model,
        setup.solver.markers(),
    )
    .unwrap();
    let mut turb = TurbField::new(setup.geometry.n_cells(), model.n_var());
    turb_solver.initialize(&setup.geometry, &mut setup.state, &mut turb);

    // 壁面 ν̃ = 0，内部为来流值
    let fs_value = model.freestream_values(&setup.freestream, &setup.gas)[0];
    assert!(fs_value > 0.0);
    for c in 0..setup.geometry.n_cells() {
        if setup.geometry.is_wall_cell(c) {
            assert_eq!(turb.var(c, 0), 0.0);
        } else {
            assert!((turb.var(c, 0) - fs_value).abs() < 1e-15);
        }
    }

    let mut integration = Integration::new(&config);
    let mut monitor = NullMonitor;
    integration
        .run(
            &setup.geometry,
            &mut setup.solver,
            Some((&mut turb_solver, &mut turb)),
            &mut setup.state,
            &mut monitor,
            None,
        )
        .unwrap();

    for c in 0..setup.geometry.n_cells() {
        assert!(turb.var(c, 0) >= 0.0);
        assert!(turb.var(c, 0).is_finite());
        assert!(setup.state.mu_eddy[c] >= 0.0);
    }
}
