use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::geodesy::{self, Location};
use crate::properties::PropertyBus;
use crate::utils::constants::EARTH_RADIUS_REFERENCE;

/// The integrated state quartet. Only the propagator mutates this; all other
/// models read the values integrated at the end of the previous tick.
#[derive(Debug, Clone, Copy)]
pub struct CoreState {
    pub location: Location,
    /// Velocity of the body origin w.r.t. ECEF, expressed in the body frame [ft/s]
    pub v_uvw: Vector3<f64>,
    /// Angular velocity of the body w.r.t. ECEF, expressed in the body frame [rad/s]
    pub v_pqr: Vector3<f64>,
    /// Body-to-local (NED) rotation
    pub attitude: UnitQuaternion<f64>,
}

impl Default for CoreState {
    fn default() -> Self {
        Self {
            location: Location::from_lon_lat_radius(0.0, 0.0, EARTH_RADIUS_REFERENCE + 4.0),
            v_uvw: Vector3::zeros(),
            v_pqr: Vector3::zeros(),
            attitude: UnitQuaternion::identity(),
        }
    }
}

impl CoreState {
    /// Euler angles (phi, theta, psi) as a derived view of the quaternion.
    pub fn euler(&self) -> Vector3<f64> {
        let (phi, theta, psi) = self.attitude.euler_angles();
        Vector3::new(phi, theta, psi)
    }
}

/// The frame transforms, all consistent with the integrated state.
#[derive(Debug, Clone, Copy)]
pub struct Frames {
    pub tl2b: Matrix3<f64>,
    pub tb2l: Matrix3<f64>,
    pub tec2l: Matrix3<f64>,
    pub tl2ec: Matrix3<f64>,
    pub tec2b: Matrix3<f64>,
    pub tb2ec: Matrix3<f64>,
    pub ti2ec: Matrix3<f64>,
    pub tec2i: Matrix3<f64>,
    pub ti2b: Matrix3<f64>,
    pub tb2i: Matrix3<f64>,
}

impl Default for Frames {
    fn default() -> Self {
        Self::compute(&CoreState::default(), 0.0)
    }
}

impl Frames {
    pub fn compute(core: &CoreState, earth_position_angle: f64) -> Self {
        let tb2l = *core.attitude.to_rotation_matrix().matrix();
        let tl2b = tb2l.transpose();
        let tec2l = core.location.tec2l();
        let tl2ec = tec2l.transpose();
        let tec2b = tl2b * tec2l;
        let tb2ec = tec2b.transpose();
        let ti2ec = geodesy::ti2ec(earth_position_angle);
        let tec2i = ti2ec.transpose();
        let ti2b = tec2b * ti2ec;
        let tb2i = ti2b.transpose();
        Self {
            tl2b,
            tb2l,
            tec2l,
            tl2ec,
            tec2b,
            tb2ec,
            ti2ec,
            tec2i,
            ti2b,
            tb2i,
        }
    }
}

/// Terrain sampled under the vehicle at the start of the tick.
#[derive(Debug, Clone, Copy)]
pub struct TerrainInfo {
    pub sea_level_radius: f64,
    pub local_terrain_radius: f64,
}

impl Default for TerrainInfo {
    fn default() -> Self {
        Self {
            sea_level_radius: EARTH_RADIUS_REFERENCE,
            local_terrain_radius: EARTH_RADIUS_REFERENCE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AtmosphereOutput {
    pub temperature: f64,
    pub pressure: f64,
    pub density: f64,
    pub soundspeed: f64,
    pub sl_temperature: f64,
    pub sl_pressure: f64,
    pub sl_density: f64,
    pub sl_soundspeed: f64,
    pub viscosity: f64,
    pub kinematic_viscosity: f64,
    /// Steady wind, NED [ft/s]
    pub wind_ned: Vector3<f64>,
    /// Turbulence velocity, NED [ft/s]
    pub turbulence_ned: Vector3<f64>,
    /// Turbulence body rates [rad/s]
    pub turbulence_pqr: Vector3<f64>,
}

impl AtmosphereOutput {
    pub fn total_wind_ned(&self) -> Vector3<f64> {
        self.wind_ned + self.turbulence_ned
    }
}

/// Effector positions produced by the flight-control system.
#[derive(Debug, Clone, Default)]
pub struct FcsOutput {
    pub aileron_pos: f64,
    pub elevator_pos: f64,
    pub rudder_pos: f64,
    pub flap_pos: f64,
    pub speedbrake_pos: f64,
    pub spoiler_pos: f64,
    pub throttle_pos: Vec<f64>,
    pub mixture_pos: Vec<f64>,
    pub advance_pos: Vec<f64>,
    pub feather: Vec<bool>,
    pub brake_left: f64,
    pub brake_right: f64,
    pub brake_center: f64,
    pub parking_brake: f64,
    pub steer_pos_norm: f64,
    pub gear_pos: f64,
    pub hook_pos: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PropulsionOutput {
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
    pub total_fuel_lbs: f64,
    pub fuel_flow_rate: f64,
    pub engine_thrusts: Vec<f64>,
    /// Current tank contents and structural locations for mass aggregation
    pub tank_masses: Vec<(f64, Vector3<f64>)>,
}

#[derive(Debug, Clone, Default)]
pub struct AeroOutput {
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
    /// Wind-axis forces (drag, side, lift) for L/D and load factor
    pub f_wind: Vector3<f64>,
    pub qbar_area: f64,
    pub cl_squared: f64,
    pub lift_over_drag: f64,
    pub impending_stall: f64,
    pub stall_hyst: f64,
    pub bi2vel: f64,
    pub ci2vel: f64,
    pub alpha_wing: f64,
}

/// Per-gear values surfaced for publication and reporting.
#[derive(Debug, Clone, Default)]
pub struct GearReport {
    pub wow: bool,
    pub compress_length: f64,
    pub compress_speed: f64,
    pub side_coeff: f64,
    pub wheel_speed: f64,
    pub slip_angle_deg: f64,
    pub steer_angle: f64,
    pub pos_norm: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GroundOutput {
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
    pub wow: bool,
    pub gear: Vec<GearReport>,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalOutput {
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct BuoyantOutput {
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
    /// Gas masses [slug] and structural locations [in] for mass aggregation
    pub gas_masses: Vec<(f64, Vector3<f64>)>,
}

#[derive(Debug, Clone)]
pub struct MassOutput {
    pub weight_lbs: f64,
    pub mass_slugs: f64,
    /// Current CG, structural frame [in]
    pub cg: Vector3<f64>,
    pub j: Matrix3<f64>,
    pub j_inv: Matrix3<f64>,
    /// Body-frame CG travel this tick, applied by the propagator [ft]
    pub delta_cg_body: Vector3<f64>,
}

impl Default for MassOutput {
    fn default() -> Self {
        Self {
            weight_lbs: 1.0,
            mass_slugs: 1.0,
            cg: Vector3::zeros(),
            j: Matrix3::identity(),
            j_inv: Matrix3::identity(),
            delta_cg_body: Vector3::zeros(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AircraftOutput {
    pub forces: Vector3<f64>,
    pub moments: Vector3<f64>,
    pub body_accel: Vector3<f64>,
    /// CG load factor, body axes [g]
    pub n_cg: Vector3<f64>,
    /// CG load factor, wind axes [g]
    pub n_wcg: Vector3<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PropagateOutput {
    /// NED velocity [ft/s]
    pub v_vel: Vector3<f64>,
    /// Body rates w.r.t. ECI, body frame [rad/s]
    pub v_pqr_i: Vector3<f64>,
    pub v_uvw_dot: Vector3<f64>,
    pub v_pqr_dot: Vector3<f64>,
    /// ECEF velocity [ft/s]
    pub v_location_dot: Vector3<f64>,
    pub inertial_velocity: Vector3<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct InertialOutput {
    pub earth_position_angle: f64,
    pub gravity: f64,
    pub rotation_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AuxOutput {
    pub vt: f64,
    pub alpha: f64,
    pub beta: f64,
    pub alpha_dot: f64,
    pub beta_dot: f64,
    pub qbar: f64,
    pub qbar_uw: f64,
    pub qbar_uv: f64,
    pub mach: f64,
    pub mach_u: f64,
    pub vcas: f64,
    pub veas: f64,
    pub vground: f64,
    pub ground_track: f64,
    pub flight_path_angle: f64,
    pub total_temperature: f64,
    pub total_pressure: f64,
    pub reynolds: f64,
    pub euler_rates: Vector3<f64>,
    pub v_aero_uvw: Vector3<f64>,
    pub v_aero_pqr: Vector3<f64>,
    pub pilot_accel: Vector3<f64>,
    pub pilot_accel_n: Vector3<f64>,
    pub n_z: f64,
    pub distance_north: f64,
    pub distance_east: f64,
    pub h_over_b_cg: f64,
    pub h_over_b_mac: f64,
}

/// Shared blackboard: the snapshot every model reads, plus each model's
/// output slot for the current tick. Within a tick, later models observe the
/// outputs of earlier ones; the propagator's new CoreState becomes visible
/// on the next tick.
#[derive(Debug, Clone, Default)]
pub struct SimState {
    pub sim_time: f64,
    pub dt: f64,
    pub crashed: bool,
    pub bus: PropertyBus,
    pub core: CoreState,
    pub frames: Frames,
    pub terrain: TerrainInfo,
    pub atmosphere: AtmosphereOutput,
    pub fcs: FcsOutput,
    pub propulsion: PropulsionOutput,
    pub aero: AeroOutput,
    pub ground: GroundOutput,
    pub external: ExternalOutput,
    pub buoyant: BuoyantOutput,
    pub mass: MassOutput,
    pub aircraft: AircraftOutput,
    pub propagate: PropagateOutput,
    pub inertial: InertialOutput,
    pub aux: AuxOutput,
}

impl SimState {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            ..Default::default()
        }
    }

    /// Refresh the transform set from the current core state. Called at the
    /// top of every tick so models 1..n observe transforms consistent with
    /// the state integrated on the previous step.
    pub fn refresh_frames(&mut self) {
        self.frames = Frames::compute(&self.core, self.inertial.earth_position_angle);
    }

    pub fn altitude_asl(&self) -> f64 {
        self.core.location.radius() - self.terrain.sea_level_radius
    }

    pub fn altitude_agl(&self) -> f64 {
        self.core.location.radius() - self.terrain.local_terrain_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frames_are_orthonormal() {
        let core = CoreState {
            attitude: UnitQuaternion::from_euler_angles(0.1, -0.2, 1.3),
            location: Location::from_lon_lat_radius(0.5, 0.7, EARTH_RADIUS_REFERENCE),
            ..Default::default()
        };
        let frames = Frames::compute(&core, 0.25);

        for t in [frames.tl2b, frames.tec2b, frames.ti2b] {
            assert_relative_eq!(t * t.transpose(), Matrix3::identity(), epsilon = 1e-12);
            assert_relative_eq!(t.determinant(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(frames.tb2l, frames.tl2b.transpose(), epsilon = 1e-15);
        assert_relative_eq!(
            frames.tec2b,
            frames.tl2b * frames.tec2l,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_euler_view_matches_quaternion() {
        let core = CoreState {
            attitude: UnitQuaternion::from_euler_angles(0.3, 0.1, -0.4),
            ..Default::default()
        };
        let euler = core.euler();
        assert_relative_eq!(euler.x, 0.3, epsilon = 1e-12);
        assert_relative_eq!(euler.y, 0.1, epsilon = 1e-12);
        assert_relative_eq!(euler.z, -0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_altitude_views() {
        let mut state = SimState::new(0.01);
        state.core.location =
            Location::from_lon_lat_radius(0.0, 0.0, EARTH_RADIUS_REFERENCE + 5000.0);
        state.terrain.local_terrain_radius = EARTH_RADIUS_REFERENCE + 1200.0;
        assert_relative_eq!(state.altitude_asl(), 5000.0, epsilon = 1e-6);
        assert_relative_eq!(state.altitude_agl(), 3800.0, epsilon = 1e-6);
    }
}
