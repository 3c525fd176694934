use std::any::Any;
use std::ops::{Add, Mul};
use std::sync::Arc;

use log::warn;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::geodesy::Location;
use crate::ground::GroundCallback;
use crate::models::{EarthParams, Model};
use crate::state::{Frames, SimState};
use crate::utils::errors::SimError;

// State sanity bounds; beyond these the simulation has diverged.
const MAX_ROTATION_RATE: f64 = 1000.0; // rad/s
const MAX_VELOCITY: f64 = 1.0e10; // ft/s
const MAX_AGL: f64 = 1.0e10; // ft
const UNDERGROUND_AGL: f64 = -100.0; // ft

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Freeze the stream
    None,
    RectEuler,
    Trapezoidal,
    AdamsBashforth2,
    AdamsBashforth3,
}

/// One integrator per state stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntegratorSet {
    pub rotational_rate: Integrator,
    pub translational_rate: Integrator,
    pub rotational_position: Integrator,
    pub translational_position: Integrator,
}

impl Default for IntegratorSet {
    fn default() -> Self {
        Self {
            rotational_rate: Integrator::AdamsBashforth2,
            translational_rate: Integrator::AdamsBashforth2,
            rotational_position: Integrator::Trapezoidal,
            translational_position: Integrator::Trapezoidal,
        }
    }
}

impl IntegratorSet {
    pub fn all(kind: Integrator) -> Self {
        Self {
            rotational_rate: kind,
            translational_rate: kind,
            rotational_position: kind,
            translational_position: kind,
        }
    }
}

/// Two past derivative samples for one integrated stream.
#[derive(Debug, Clone, Copy)]
struct History<T> {
    last: T,
    last2: T,
}

impl<T: Copy> History<T> {
    fn new(zero: T) -> Self {
        Self {
            last: zero,
            last2: zero,
        }
    }

    fn push(&mut self, dot: T) {
        self.last2 = self.last;
        self.last = dot;
    }
}

/// One multi-step update. Streams short on history fall back to the deepest
/// scheme their history supports.
fn integrate<T>(kind: Integrator, x: T, dot: T, history: &History<T>, dt: f64, ticks: u64) -> T
where
    T: Copy + Add<T, Output = T> + Mul<f64, Output = T>,
{
    let kind = match (kind, ticks) {
        (Integrator::Trapezoidal, 0)
        | (Integrator::AdamsBashforth2, 0)
        | (Integrator::AdamsBashforth3, 0) => Integrator::RectEuler,
        (Integrator::AdamsBashforth3, 1) => Integrator::AdamsBashforth2,
        (kind, _) => kind,
    };
    match kind {
        Integrator::None => x,
        Integrator::RectEuler => x + dot * dt,
        Integrator::Trapezoidal => x + (dot + history.last) * (0.5 * dt),
        Integrator::AdamsBashforth2 => x + (dot * 1.5 + history.last * -0.5) * dt,
        Integrator::AdamsBashforth3 => {
            x + (dot * 23.0 + history.last * -16.0 + history.last2 * 5.0) * (dt / 12.0)
        }
    }
}

/// Integrates the state quartet (location, vUVW, vPQR, attitude) over the
/// rotating oblate Earth.
///
/// The rate derivatives are evaluated on the snapshot everyone read this
/// tick; the position derivatives then use the freshly integrated rates, so
/// a constant acceleration integrates to the exact displacement.
pub struct PropagateModel {
    earth: EarthParams,
    ground: Arc<dyn GroundCallback>,
    integrators: IntegratorSet,
    hold: bool,
    pqr_history: History<Vector3<f64>>,
    uvw_history: History<Vector3<f64>>,
    quat_history: History<Quaternion<f64>>,
    location_history: History<Vector3<f64>>,
    ticks: u64,
}

impl PropagateModel {
    pub fn new(earth: EarthParams, ground: Arc<dyn GroundCallback>) -> Self {
        Self {
            earth,
            ground,
            integrators: IntegratorSet::default(),
            hold: false,
            pqr_history: History::new(Vector3::zeros()),
            uvw_history: History::new(Vector3::zeros()),
            quat_history: History::new(Quaternion::new(0.0, 0.0, 0.0, 0.0)),
            location_history: History::new(Vector3::zeros()),
            ticks: 0,
        }
    }

    pub fn set_integrators(&mut self, integrators: IntegratorSet) {
        self.integrators = integrators;
    }

    /// Derivatives keep being computed but the state freezes.
    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    fn recompute_terrain(&self, state: &mut SimState) {
        let contact = self
            .ground
            .contact(state.sim_time, &state.core.location, 0.0);
        state.terrain.local_terrain_radius = contact.contact.radius();
    }

    fn check_sane(&self, state: &SimState) -> Result<(), SimError> {
        let core = &state.core;
        if core.v_pqr.norm() > MAX_ROTATION_RATE {
            return Err(SimError::NumericDivergence(format!(
                "Vehicle rotation rate is excessive: {:.1} rad/s",
                core.v_pqr.norm()
            )));
        }
        if core.v_uvw.norm() > MAX_VELOCITY {
            return Err(SimError::NumericDivergence(format!(
                "Vehicle velocity is excessive: {:.3e} ft/s",
                core.v_uvw.norm()
            )));
        }
        if state.altitude_agl().abs() > MAX_AGL {
            return Err(SimError::NumericDivergence(
                "Vehicle altitude is excessive".into(),
            ));
        }
        let finite = core.v_pqr.iter().all(|v| v.is_finite())
            && core.v_uvw.iter().all(|v| v.is_finite())
            && core.location.ecef().iter().all(|v| v.is_finite())
            && core.attitude.as_vector().iter().all(|v| v.is_finite());
        if !finite {
            return Err(SimError::NumericDivergence(
                "State contains a non-finite component".into(),
            ));
        }
        if core.location.radius() < self.earth.semiminor {
            return Err(SimError::NumericDivergence(
                "Vehicle radius fell below the geoid".into(),
            ));
        }
        Ok(())
    }
}

impl Model for PropagateModel {
    fn name(&self) -> &str {
        "propagate"
    }

    fn init(&mut self, state: &mut SimState) -> Result<(), SimError> {
        self.recompute_terrain(state);
        state.refresh_frames();
        let frames = state.frames;

        // Seed the multi-step histories with the derivatives of the initial
        // state itself (no applied forces are known yet, only the field
        // terms). A stream whose true derivative starts at zero then
        // integrates its first step exactly, and one already in motion gets
        // a clean Euler-equivalent first step.
        let vehicle_radius = state.core.location.radius();
        let rad_inv = 1.0 / vehicle_radius;
        let omega = Vector3::new(0.0, 0.0, self.earth.rotation_rate);
        let v_uvw = state.core.v_uvw;
        let v_pqr = state.core.v_pqr;
        let v_vel = frames.tb2l * v_uvw;

        let v_pqr_i = v_pqr + frames.tec2b * omega;
        let pqr_dot = state.mass.j_inv * -v_pqr_i.cross(&(state.mass.j * v_pqr_i));

        let mut uvw_dot =
            -v_pqr.cross(&v_uvw) - 2.0 * (frames.ti2b * omega).cross(&v_uvw);
        let r_eci = frames.tec2i * state.core.location.ecef();
        uvw_dot -= frames.ti2b * omega.cross(&omega.cross(&r_eci));
        uvw_dot += frames.tl2b
            * Vector3::new(0.0, 0.0, self.earth.gravity_at(vehicle_radius));

        let v_omega_local = Vector3::new(
            rad_inv * v_vel.y,
            -rad_inv * v_vel.x,
            -rad_inv * v_vel.y * state.core.location.tan_latitude(),
        );
        let omega_rel = v_pqr - frames.tl2b * v_omega_local;
        let q = state.core.attitude.into_inner();
        let q_dot = q * Quaternion::from_imag(omega_rel) * 0.5;
        let location_dot = frames.tb2ec * v_uvw;

        self.pqr_history = History::new(pqr_dot);
        self.uvw_history = History::new(uvw_dot);
        self.quat_history = History::new(q_dot);
        self.location_history = History::new(location_dot);
        self.ticks = 1;

        state.propagate.v_vel = v_vel;
        state.propagate.v_pqr_i = v_pqr_i;
        Ok(())
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let dt = state.dt;

        // Keep integrating about the current CG: absorb the CG travel the
        // mass balance reported this tick.
        let delta_cg = state.mass.delta_cg_body;
        if delta_cg != Vector3::zeros() {
            let shift = state.frames.tb2ec * delta_cg;
            state.core.location.advance(-shift);
        }

        self.recompute_terrain(state);

        // Local transform copies consistent with the current state.
        let frames = Frames::compute(&state.core, state.inertial.earth_position_angle);
        state.frames = frames;

        let vehicle_radius = state.core.location.radius();
        let rad_inv = 1.0 / vehicle_radius;
        let omega = Vector3::new(0.0, 0.0, state.inertial.rotation_rate);

        let v_uvw = state.core.v_uvw;
        let v_pqr = state.core.v_pqr;

        // Vehicle velocity wrt ECEF, expressed in the local frame.
        let v_vel = frames.tb2l * v_uvw;

        // Inertial angular velocity in the body frame.
        let v_pqr_i = v_pqr + frames.tec2b * omega;

        // Rotational acceleration about the CG.
        let moments = state.aircraft.moments;
        let j = state.mass.j;
        let j_inv = state.mass.j_inv;
        let v_pqr_dot = j_inv * (moments - v_pqr_i.cross(&(j * v_pqr_i)));

        // Translational acceleration in the body frame: applied forces,
        // transport and Coriolis terms, then gravity. The centripetal term
        // is dropped on the ground where the gear carries it.
        let mut v_uvw_dot = state.aircraft.forces / state.mass.mass_slugs
            - v_pqr.cross(&v_uvw)
            - 2.0 * (frames.ti2b * omega).cross(&v_uvw);
        if !state.ground.wow {
            let r_eci = frames.tec2i * state.core.location.ecef();
            v_uvw_dot -= frames.ti2b * omega.cross(&omega.cross(&r_eci));
        }
        let gravity = self.earth.gravity_at(vehicle_radius);
        v_uvw_dot += frames.tl2b * Vector3::new(0.0, 0.0, gravity);

        // Propagate the rates.
        let (new_pqr, new_uvw) = if self.hold {
            (v_pqr, v_uvw)
        } else {
            (
                integrate(
                    self.integrators.rotational_rate,
                    v_pqr,
                    v_pqr_dot,
                    &self.pqr_history,
                    dt,
                    self.ticks,
                ),
                integrate(
                    self.integrators.translational_rate,
                    v_uvw,
                    v_uvw_dot,
                    &self.uvw_history,
                    dt,
                    self.ticks,
                ),
            )
        };

        // Position derivatives from the freshly integrated rates.
        let v_vel_new = frames.tb2l * new_uvw;
        let v_omega_local = Vector3::new(
            rad_inv * v_vel_new.y,
            -rad_inv * v_vel_new.x,
            -rad_inv * v_vel_new.y * state.core.location.tan_latitude(),
        );
        let omega_rel = new_pqr - frames.tl2b * v_omega_local;
        let q = state.core.attitude.into_inner();
        let q_dot = q * Quaternion::from_imag(omega_rel) * 0.5;

        let v_location_dot = frames.tb2ec * new_uvw;
        let inertial_velocity =
            frames.tec2i * v_location_dot + omega.cross(&(frames.tec2i * state.core.location.ecef()));

        if !self.hold {
            let new_q = integrate(
                self.integrators.rotational_position,
                q,
                q_dot,
                &self.quat_history,
                dt,
                self.ticks,
            );
            state.core.attitude = UnitQuaternion::from_quaternion(new_q);

            let new_ecef = integrate(
                self.integrators.translational_position,
                state.core.location.ecef(),
                v_location_dot,
                &self.location_history,
                dt,
                self.ticks,
            );
            state.core.location = Location::new(new_ecef);
            state.core.v_pqr = new_pqr;
            state.core.v_uvw = new_uvw;

            self.pqr_history.push(v_pqr_dot);
            self.uvw_history.push(v_uvw_dot);
            self.quat_history.push(q_dot);
            self.location_history.push(v_location_dot);
            self.ticks += 1;
        }

        state.propagate = crate::state::PropagateOutput {
            v_vel,
            v_pqr_i,
            v_uvw_dot,
            v_pqr_dot,
            v_location_dot,
            inertial_velocity,
        };

        self.check_sane(state)?;

        // Sinking far below the terrain is unrecoverable; treat it like a
        // gear-detected crash rather than a numeric failure.
        if state.altitude_agl() < UNDERGROUND_AGL && !state.crashed {
            warn!("Vehicle is underground: simulation freeze");
            state.crashed = true;
        }
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let core = &state.core;
        let out = &state.propagate;
        let euler = core.euler();
        let (geod_lat, geod_alt) = core.location.geodetic();

        let rows = [
            ("position/long-gc-rad", core.location.longitude()),
            ("position/lat-gc-rad", core.location.latitude()),
            ("position/lat-geod-rad", geod_lat),
            ("position/geod-alt-ft", geod_alt),
            ("position/h-sl-ft", state.altitude_asl()),
            ("position/h-agl-ft", state.altitude_agl()),
            (
                "position/terrain-elevation-asl-ft",
                state.terrain.local_terrain_radius - state.terrain.sea_level_radius,
            ),
            ("position/radius-to-vehicle-ft", core.location.radius()),
            ("attitude/phi-rad", euler.x),
            ("attitude/theta-rad", euler.y),
            ("attitude/psi-rad", euler.z),
            ("velocities/p-rad_sec", core.v_pqr.x),
            ("velocities/q-rad_sec", core.v_pqr.y),
            ("velocities/r-rad_sec", core.v_pqr.z),
            ("velocities/u-fps", core.v_uvw.x),
            ("velocities/v-fps", core.v_uvw.y),
            ("velocities/w-fps", core.v_uvw.z),
            ("velocities/v-north-fps", out.v_vel.x),
            ("velocities/v-east-fps", out.v_vel.y),
            ("velocities/v-down-fps", out.v_vel.z),
            ("velocities/pi-rad_sec", out.v_pqr_i.x),
            ("velocities/qi-rad_sec", out.v_pqr_i.y),
            ("velocities/ri-rad_sec", out.v_pqr_i.z),
            ("velocities/eci-velocity-mag-fps", out.inertial_velocity.norm()),
            ("accelerations/pdot-rad_sec2", out.v_pqr_dot.x),
            ("accelerations/qdot-rad_sec2", out.v_pqr_dot.y),
            ("accelerations/rdot-rad_sec2", out.v_pqr_dot.z),
            ("accelerations/udot-ft_sec2", out.v_uvw_dot.x),
            ("accelerations/vdot-ft_sec2", out.v_uvw_dot.y),
            ("accelerations/wdot-ft_sec2", out.v_uvw_dot.z),
        ];
        for (name, value) in rows {
            state.bus.set_double(name, value);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
