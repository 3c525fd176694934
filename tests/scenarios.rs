mod common;

use approx::assert_relative_eq;
use nalgebra::Vector3;
use std::f64::consts::FRAC_PI_2;

use common::{flat_options, pacejka, point_mass_config};
use kestrel::config::{EngineConfig, EngineKind, SteerType};
use kestrel::{FdmExecutor, InitialConditions, Integrator, IntegratorSet, SimOptions};

#[test]
fn free_fall_over_flat_earth() {
    let config = point_mass_config(1.0, (1.0, 1.0, 1.0));
    let mut options = flat_options(0.01);
    options.integrators = IntegratorSet {
        rotational_rate: Integrator::RectEuler,
        translational_rate: Integrator::RectEuler,
        rotational_position: Integrator::Trapezoidal,
        translational_position: Integrator::Trapezoidal,
    };
    let mut executor = FdmExecutor::new(&config, options).unwrap();
    executor
        .initialize(&InitialConditions {
            altitude_asl: 10_000.0,
            ..Default::default()
        })
        .unwrap();

    for _ in 0..100 {
        executor.run().unwrap();
    }

    // One second of 32.174 ft/s^2: v = g*t, drop = g*t^2/2.
    let state = executor.state();
    assert_relative_eq!(state.core.v_uvw.z, 32.174, epsilon = 1e-4);
    assert_relative_eq!(state.altitude_asl(), 10_000.0 - 16.087, epsilon = 1e-3);
}

#[test]
fn pure_body_axis_spin() {
    let config = point_mass_config(1.0, (1.0, 1.0, 1.0));
    let mut executor = FdmExecutor::new(&config, flat_options(0.001)).unwrap();
    executor
        .initialize(&InitialConditions {
            altitude_asl: 10_000.0,
            v_pqr: Vector3::new(1.0, 0.0, 0.0),
            ..Default::default()
        })
        .unwrap();

    for _ in 0..1000 {
        executor.run().unwrap();
    }

    let state = executor.state();
    let euler = state.core.euler();
    assert_relative_eq!(euler.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(euler.y, 0.0, epsilon = 1e-9);
    assert_relative_eq!(euler.z, 0.0, epsilon = 1e-9);
    assert_relative_eq!(state.core.attitude.as_vector().norm(), 1.0, epsilon = 1e-10);
}

#[test]
fn static_weight_on_wheels() {
    // 100 slugs on a single 1000 lb/ft strut, dropped one foot into the
    // terrain. The strut must settle carrying the whole weight.
    let config = point_mass_config(100.0, (1000.0, 1000.0, 1000.0));
    let mut executor = FdmExecutor::new(&config, flat_options(0.01)).unwrap();
    executor
        .initialize(&InitialConditions {
            altitude_asl: -1.0,
            ..Default::default()
        })
        .unwrap();

    for _ in 0..3000 {
        executor.run().unwrap();
    }

    let state = executor.state();
    assert!(state.ground.wow);
    assert!(!executor.crashed());

    let weight = 100.0 * 32.174;
    assert_relative_eq!(state.ground.forces.z, -weight, max_relative = 0.005);
    assert_relative_eq!(
        state.ground.gear[0].compress_length,
        weight / 1000.0,
        max_relative = 0.005
    );
    // The strut only ever pushes, never pulls.
    assert!(state.ground.forces.z <= 0.0);
}

fn cornering_executor(v_body: Vector3<f64>) -> FdmExecutor {
    let mut config = point_mass_config(100.0, (1000.0, 1000.0, 1000.0));
    let gear = &mut config.gear[0];
    gear.static_friction = 0.8;
    gear.dynamic_friction = 0.5;
    gear.rolling_friction = 0.02;
    gear.steer_type = SteerType::Fixed;
    // Bypass the jitter filters so the first tick is the raw tire response.
    gear.rolling_force_lag = Some(0.0);
    gear.side_force_lag = Some(0.0);
    gear.wheel_slip_lag = Some(0.0);

    let mut executor = FdmExecutor::new(&config, flat_options(0.01)).unwrap();
    executor
        .initialize(&InitialConditions {
            altitude_asl: -0.5,
            psi: FRAC_PI_2,
            v_body,
            ..Default::default()
        })
        .unwrap();
    executor
}

#[test]
fn ground_cornering_side_force() {
    // Heading east, sliding due north: the wheel runs at -90 degrees slip
    // and the tire force opposes the motion.
    let mut executor = cornering_executor(Vector3::new(0.0, -30.0, 0.0));
    executor.run().unwrap();

    let state = executor.state();
    let report = &state.ground.gear[0];
    assert!(report.wow);
    assert_relative_eq!(report.slip_angle_deg, -90.0, epsilon = 1e-9);

    // Strut at 0.5 ft compression on a 1000 lb/ft spring.
    let strut = -500.0;
    let expected_side = strut * pacejka(0.8, -90.0);
    assert!(expected_side > 0.0);

    // Body +Y points north when heading east; the local north force is the
    // negative of it, opposing the slide.
    assert_relative_eq!(state.ground.forces.y, expected_side, max_relative = 1e-6);
    let force_ned = state.frames.tb2l * state.ground.forces;
    assert!(force_ned.x < 0.0);
}

#[test]
fn ground_cornering_sign_reverses_with_slip() {
    // Same geometry, sliding due south: slip and side force both flip.
    let mut executor = cornering_executor(Vector3::new(0.0, 30.0, 0.0));
    executor.run().unwrap();

    let state = executor.state();
    let report = &state.ground.gear[0];
    assert_relative_eq!(report.slip_angle_deg, 90.0, epsilon = 1e-9);
    let expected_side = -500.0 * pacejka(0.8, 90.0);
    assert!(expected_side < 0.0);
    assert_relative_eq!(state.ground.forces.y, expected_side, max_relative = 1e-6);
}

#[test]
fn mach_transition_total_pressure() {
    let config = point_mass_config(100.0, (1000.0, 1000.0, 1000.0));
    let mut executor = FdmExecutor::new(&config, flat_options(0.01)).unwrap();

    // High subsonic at sea level.
    executor
        .initialize(&InitialConditions {
            altitude_asl: 0.0,
            v_body: Vector3::new(1000.0, 0.0, 0.0),
            ..Default::default()
        })
        .unwrap();
    executor.run().unwrap();

    let aux = &executor.state().aux;
    assert_relative_eq!(aux.mach, 0.896, epsilon = 2e-3);
    let p = executor.state().atmosphere.pressure;
    let m2 = aux.mach_u * aux.mach_u;
    let expected_subsonic = p * (1.0 + 0.2 * m2).powf(3.5);
    assert_relative_eq!(aux.total_pressure, expected_subsonic, max_relative = 1e-9);

    // Supersonic: the Rayleigh pitot formula takes over.
    executor
        .initialize(&InitialConditions {
            altitude_asl: 0.0,
            v_body: Vector3::new(1300.0, 0.0, 0.0),
            ..Default::default()
        })
        .unwrap();
    executor.run().unwrap();

    let aux = &executor.state().aux;
    assert!(aux.mach > 1.0);
    let p = executor.state().atmosphere.pressure;
    let m2 = aux.mach_u * aux.mach_u;
    let b = 5.76 * m2 / (5.6 * m2 - 0.8);
    let d = (2.8 * m2 - 0.4) * 0.4167;
    let expected_rayleigh = p * b.powf(3.5) * d;
    assert_relative_eq!(aux.total_pressure, expected_rayleigh, max_relative = 1e-9);
}

#[test]
fn engine_trim_reaches_steady_state() {
    let mut config = point_mass_config(300.0, (5000.0, 8000.0, 9000.0));
    config.propulsion.engines = vec![
        EngineConfig {
            name: "turbine".into(),
            kind: EngineKind::Turbine {
                max_thrust: 4000.0,
                tsfc: 0.8,
            },
            location: Vector3::new(120.0, 0.0, 0.0),
            orientation: Vector3::zeros(),
            feed_tanks: Vec::new(),
        },
        EngineConfig {
            name: "piston".into(),
            kind: EngineKind::Piston {
                max_power_hp: 160.0,
                sfc: 0.45,
                efficiency: 0.75,
            },
            location: Vector3::new(60.0, 0.0, 0.0),
            orientation: Vector3::zeros(),
            feed_tanks: Vec::new(),
        },
    ];

    let mut executor = FdmExecutor::new(&config, SimOptions::default()).unwrap();
    executor
        .initialize(&InitialConditions {
            altitude_asl: 1000.0,
            ..Default::default()
        })
        .unwrap();

    // An arbitrary mid-range throttle state going in.
    executor.queue_double("fcs/throttle-cmd-norm[0]", 0.73);
    executor.queue_double("fcs/throttle-cmd-norm[1]", 0.73);
    executor.run().unwrap();

    let iterations = executor.trim_propulsion().unwrap();
    assert!(iterations[0] < 6000, "turbine took {} iterations", iterations[0]);
    assert!(iterations[1] < 1500, "piston took {} iterations", iterations[1]);

    // Converged thrust is genuinely steady.
    let thrust = executor.state().propulsion.engine_thrusts.clone();
    assert!(thrust[0] > 0.0 && thrust[1] > 0.0);
}

#[test]
fn crash_freezes_future_ticks() {
    // Slam into the ground hard enough to trip the sink-rate detector.
    let config = point_mass_config(100.0, (1000.0, 1000.0, 1000.0));
    let mut executor = FdmExecutor::new(&config, flat_options(0.01)).unwrap();
    executor
        .initialize(&InitialConditions {
            altitude_asl: 2.0,
            v_body: Vector3::new(0.0, 0.0, 80.0),
            ..Default::default()
        })
        .unwrap();

    for _ in 0..50 {
        executor.run().unwrap();
    }
    assert!(executor.crashed());

    // Further ticks are no-ops: time stops advancing.
    let frozen_time = executor.sim_time();
    executor.run().unwrap();
    assert_eq!(executor.sim_time(), frozen_time);
}

#[test]
fn excessive_rotation_rate_is_fatal() {
    let config = point_mass_config(1.0, (1.0, 1.0, 1.0));
    let mut executor = FdmExecutor::new(&config, flat_options(0.01)).unwrap();
    executor
        .initialize(&InitialConditions {
            altitude_asl: 10_000.0,
            v_pqr: Vector3::new(1500.0, 0.0, 0.0),
            ..Default::default()
        })
        .unwrap();

    // Beyond the 1000 rad/s sanity bound the tick aborts with a numeric
    // divergence the embedder may catch.
    assert!(matches!(
        executor.run(),
        Err(kestrel::SimError::NumericDivergence(_))
    ));
}

#[test]
fn engines_running_preset_skips_spool_up() {
    let mut config = point_mass_config(300.0, (5000.0, 8000.0, 9000.0));
    config.propulsion.engines = vec![EngineConfig {
        name: "turbine".into(),
        kind: EngineKind::Turbine {
            max_thrust: 4000.0,
            tsfc: 0.8,
        },
        location: Vector3::new(120.0, 0.0, 0.0),
        orientation: Vector3::zeros(),
        feed_tanks: Vec::new(),
    }];

    let mut executor = FdmExecutor::new(&config, SimOptions::default()).unwrap();
    executor.queue_double("fcs/throttle-cmd-norm[0]", 1.0);
    executor
        .initialize(&InitialConditions {
            altitude_asl: 1000.0,
            engines_running: true,
            ..Default::default()
        })
        .unwrap();

    // Full thrust (less the density lapse) from the very first tick.
    let thrust = executor.state().propulsion.engine_thrusts[0];
    assert!(thrust > 3500.0, "thrust was only {} lbf", thrust);
}
