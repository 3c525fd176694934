use std::any::Any;

use nalgebra::Vector3;

use crate::config::MetricsConfig;
use crate::models::mass_balance::structural_to_body;
use crate::models::Model;
use crate::state::SimState;
use crate::utils::constants::FPS_TO_KTS;
use crate::utils::errors::SimError;

/// Derived flight data: flow angles, airspeeds, Mach, total conditions,
/// pilot-station accelerations, and position relative to the starting point.
pub struct AuxiliaryModel {
    chord: f64,
    wing_span: f64,
    eyepoint: Vector3<f64>,
    aero_ref_point: Vector3<f64>,
    start_lon: f64,
    start_lat: f64,
}

impl AuxiliaryModel {
    pub fn new(metrics: &MetricsConfig) -> Self {
        Self {
            chord: metrics.chord,
            wing_span: metrics.wing_span,
            eyepoint: metrics.eyepoint,
            aero_ref_point: metrics.aero_ref_point,
            start_lon: 0.0,
            start_lat: 0.0,
        }
    }
}

impl Model for AuxiliaryModel {
    fn name(&self) -> &str {
        "auxiliary"
    }

    fn init(&mut self, state: &mut SimState) -> Result<(), SimError> {
        self.start_lon = state.core.location.longitude();
        self.start_lat = state.core.location.latitude();
        Ok(())
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let v_pqr = state.core.v_pqr;
        let v_uvw = state.core.v_uvw;
        let v_uvw_dot = state.propagate.v_uvw_dot;
        let v_vel = state.propagate.v_vel;

        let pressure = state.atmosphere.pressure;
        let sl_pressure = state.atmosphere.sl_pressure;
        let sl_density = state.atmosphere.sl_density;
        let sat = state.atmosphere.temperature;

        // Euler angle rates from the body rates.
        let euler = state.core.euler();
        let (sin_phi, cos_phi) = euler.x.sin_cos();
        let (sin_theta, cos_theta) = euler.y.sin_cos();
        let mut euler_rates = Vector3::zeros();
        euler_rates.y = v_pqr.y * cos_phi - v_pqr.z * sin_phi;
        if cos_theta != 0.0 {
            euler_rates.z = (v_pqr.y * sin_phi + v_pqr.z * cos_phi) / cos_theta;
            euler_rates.x = v_pqr.x + euler_rates.z * sin_theta;
        }

        // Ground handling: ramp the wind and turbulence in between 10 and
        // 30 ft/s of forward speed while weight is on the wheels.
        let wind_body = state.frames.tl2b * state.atmosphere.total_wind_ned();
        let (v_aero_pqr, v_aero_uvw) = if state.ground.wow && v_uvw.x < 10.0 {
            (v_pqr, v_uvw)
        } else if state.ground.wow && v_uvw.x < 30.0 {
            let factor = (v_uvw.x - 10.0) / 20.0;
            (
                v_pqr - factor * state.atmosphere.turbulence_pqr,
                v_uvw - factor * wind_body,
            )
        } else {
            (v_pqr - state.atmosphere.turbulence_pqr, v_uvw - wind_body)
        };

        let vt = v_aero_uvw.norm();
        let (alpha, beta, alpha_dot, beta_dot) = if vt > 0.05 {
            let (u, v, w) = (v_aero_uvw.x, v_aero_uvw.y, v_aero_uvw.z);
            let m_uw = u * u + w * w;
            let alpha = if u * u > 0.0 { w.atan2(u) } else { 0.0 };
            let beta = if m_uw > 0.0 { v.atan2(m_uw.sqrt()) } else { 0.0 };
            if m_uw == 0.0 {
                (alpha, beta, 0.0, 0.0)
            } else {
                let sign_u = if u != 0.0 { u.signum() } else { 1.0 };
                let alpha_dot = (u * v_uvw_dot.z - w * v_uvw_dot.x) / m_uw;
                let beta_dot = (sign_u * m_uw * v_uvw_dot.y
                    - v * (u * v_uvw_dot.x + w * v_uvw_dot.z))
                    / (vt * vt * m_uw.sqrt());
                (alpha, beta, alpha_dot, beta_dot)
            }
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };

        let density = state.atmosphere.density;
        let qbar = 0.5 * density * vt * vt;
        let qbar_uw = 0.5 * density * (v_aero_uvw.x * v_aero_uvw.x + v_aero_uvw.z * v_aero_uvw.z);
        let qbar_uv = 0.5 * density * (v_aero_uvw.x * v_aero_uvw.x + v_aero_uvw.y * v_aero_uvw.y);
        let soundspeed = state.atmosphere.soundspeed;
        let mach = vt / soundspeed;
        let mach_u = v_aero_uvw.x / soundspeed;

        let reynolds = vt * self.chord / state.atmosphere.kinematic_viscosity.max(1e-12);

        let vground = (v_vel.x * v_vel.x + v_vel.y * v_vel.y).sqrt();
        let mut ground_track = v_vel.y.atan2(v_vel.x);
        if ground_track < 0.0 {
            ground_track += 2.0 * std::f64::consts::PI;
        }
        let flight_path_angle = (-v_vel.z).atan2(vground);

        // Total temperature from isentropic flow; total pressure switches to
        // the Rayleigh pitot form behind the normal shock above Mach 1.
        let total_temperature = sat * (1.0 + 0.2 * mach * mach);
        let total_pressure = if mach_u < 1.0 {
            pressure * (1.0 + 0.2 * mach_u * mach_u).powf(3.5)
        } else {
            let b = 5.76 * mach_u * mach_u / (5.6 * mach_u * mach_u - 0.8);
            let d = (2.8 * mach_u * mach_u - 0.4) * 0.4167;
            pressure * b.powf(3.5) * d
        };

        let (vcas, veas) = if mach_u > 0.0 {
            let a = ((total_pressure - pressure) / sl_pressure + 1.0).powf(0.28571);
            (
                (7.0 * sl_pressure / sl_density * (a - 1.0)).sqrt(),
                (2.0 * qbar / sl_density).sqrt(),
            )
        } else {
            (0.0, 0.0)
        };

        // Pilot-station specific force. At very low speed this reduces to
        // holding against gravity, which keeps gear jitter out of the value.
        let gravity = state.inertial.gravity.max(1e-9);
        let (pilot_accel, n_z) = if vt > 1.0 {
            let applied = state.aero.forces
                + state.propulsion.forces
                + state.ground.forces
                + state.external.forces
                + state.buoyant.forces;
            let accel = applied / state.mass.mass_slugs;
            let n_z = -accel.z / gravity;
            let to_eye = structural_to_body(self.eyepoint, state.mass.cg);
            let pilot = accel
                + state.propagate.v_pqr_dot.cross(&to_eye)
                + v_pqr.cross(&v_pqr.cross(&to_eye));
            (pilot, n_z)
        } else {
            let pilot = state.frames.tl2b * Vector3::new(0.0, 0.0, -gravity);
            (pilot, -pilot.z / gravity)
        };
        let pilot_accel_n = pilot_accel / gravity;

        let agl = state.altitude_agl();
        let h_over_b_cg = agl / self.wing_span;
        let mac_local = state.frames.tb2l * structural_to_body(self.aero_ref_point, state.mass.cg);
        let h_over_b_mac = (agl + mac_local.z) / self.wing_span;

        let radius = state.core.location.radius();
        let distance_north = (state.core.location.latitude() - self.start_lat) * radius;
        let distance_east = (state.core.location.longitude() - self.start_lon) * radius;

        state.aux = crate::state::AuxOutput {
            vt,
            alpha,
            beta,
            alpha_dot,
            beta_dot,
            qbar,
            qbar_uw,
            qbar_uv,
            mach,
            mach_u,
            vcas,
            veas,
            vground,
            ground_track,
            flight_path_angle,
            total_temperature,
            total_pressure,
            reynolds,
            euler_rates,
            v_aero_uvw,
            v_aero_pqr,
            pilot_accel,
            pilot_accel_n,
            n_z,
            distance_north,
            distance_east,
            h_over_b_cg,
            h_over_b_mac,
        };
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let aux = &state.aux;
        let rows = [
            ("velocities/vt-fps", aux.vt),
            ("velocities/mach", aux.mach),
            ("velocities/machU", aux.mach_u),
            ("velocities/vc-kts", aux.vcas * FPS_TO_KTS),
            ("velocities/ve-kts", aux.veas * FPS_TO_KTS),
            ("velocities/vc-fps", aux.vcas),
            ("velocities/ve-fps", aux.veas),
            ("velocities/vg-fps", aux.vground),
            ("aero/alpha-rad", aux.alpha),
            ("aero/beta-rad", aux.beta),
            ("aero/alphadot-rad_sec", aux.alpha_dot),
            ("aero/betadot-rad_sec", aux.beta_dot),
            ("aero/qbar-psf", aux.qbar),
            ("aero/qbarUW-psf", aux.qbar_uw),
            ("aero/qbarUV-psf", aux.qbar_uv),
            ("aero/Re", aux.reynolds),
            ("aero/h_b-cg-ft", aux.h_over_b_cg),
            ("aero/h_b-mac-ft", aux.h_over_b_mac),
            ("flight-path/gamma-rad", aux.flight_path_angle),
            ("flight-path/psi-gt-rad", aux.ground_track),
            ("atmosphere/total-temperature-R", aux.total_temperature),
            ("atmosphere/total-pressure-psf", aux.total_pressure),
            ("accelerations/a-pilot-x-ft_sec2", aux.pilot_accel.x),
            ("accelerations/a-pilot-y-ft_sec2", aux.pilot_accel.y),
            ("accelerations/a-pilot-z-ft_sec2", aux.pilot_accel.z),
            ("accelerations/n-pilot-x-norm", aux.pilot_accel_n.x),
            ("accelerations/n-pilot-y-norm", aux.pilot_accel_n.y),
            ("accelerations/n-pilot-z-norm", aux.pilot_accel_n.z),
            ("accelerations/Nz", aux.n_z),
            ("position/distance-from-start-lat-ft", aux.distance_north),
            ("position/distance-from-start-lon-ft", aux.distance_east),
            ("velocities/phidot-rad_sec", aux.euler_rates.x),
            ("velocities/thetadot-rad_sec", aux.euler_rates.y),
            ("velocities/psidot-rad_sec", aux.euler_rates.z),
        ];
        for (name, value) in rows {
            state.bus.set_double(name, value);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
