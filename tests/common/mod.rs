use nalgebra::Vector3;

use kestrel::config::{
    AeroAxisSystem, AeroConfig, AircraftConfig, FcsConfig, GearConfig, MassConfig, MetricsConfig,
    PropulsionConfig,
};
use kestrel::utils::constants::SLUG_TO_LBS;
use kestrel::{EarthParams, IntegratorSet, SimOptions};

/// A bare rigid body: no aero coefficients, no engines, one probe gear at
/// the CG. The workhorse for the propagator scenarios.
pub fn point_mass_config(mass_slugs: f64, inertia_diag: (f64, f64, f64)) -> AircraftConfig {
    AircraftConfig {
        name: "point-mass".into(),
        metrics: MetricsConfig {
            wing_area: 174.0,
            wing_span: 36.0,
            chord: 4.9,
            wing_incidence: 0.0,
            aero_ref_point: Vector3::zeros(),
            eyepoint: Vector3::zeros(),
            visual_ref_point: Vector3::zeros(),
        },
        mass: MassConfig {
            empty_weight: mass_slugs * SLUG_TO_LBS,
            cg_location: Vector3::zeros(),
            ixx: inertia_diag.0,
            iyy: inertia_diag.1,
            izz: inertia_diag.2,
            ixy: 0.0,
            ixz: 0.0,
            iyz: 0.0,
            point_masses: Vec::new(),
        },
        aero: AeroConfig::inert(AeroAxisSystem::LiftDrag),
        gear: vec![GearConfig::simple_bogey(
            "probe",
            Vector3::zeros(),
            1000.0,
            50.0,
        )],
        propulsion: PropulsionConfig::default(),
        fcs: FcsConfig::default(),
        buoyancy: None,
        external_forces: Vec::new(),
    }
}

/// Non-rotating planet, uniform 32.174 ft/s^2 gravity.
pub fn flat_options(dt: f64) -> SimOptions {
    SimOptions {
        dt,
        earth: EarthParams::flat(),
        integrators: IntegratorSet::default(),
        seed: 0,
    }
}

/// The Pacejka magic formula with the built-in gear defaults, for checking
/// lateral tire forces from tests.
pub fn pacejka(static_friction: f64, slip_deg: f64) -> f64 {
    let x = 0.06 * slip_deg;
    static_friction * (2.8 * (x - 1.03 * (x - x.atan())).atan()).sin()
}
