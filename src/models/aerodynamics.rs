use std::any::Any;

use nalgebra::{Matrix3, Vector3};

use crate::config::{AeroAxisSystem, AeroConfig, MetricsConfig};
use crate::models::mass_balance::structural_to_body;
use crate::models::Model;
use crate::state::SimState;
use crate::utils::constants::FT_TO_INCH;
use crate::utils::errors::SimError;

/// Body-to-wind rotation for the given flow angles.
pub fn tb2w(alpha: f64, beta: f64) -> Matrix3<f64> {
    let (sa, ca) = alpha.sin_cos();
    let (sb, cb) = beta.sin_cos();
    Matrix3::new(
        ca * cb, sb, sa * cb, //
        -ca * sb, cb, -sa * sb, //
        -sa, 0.0, ca,
    )
}

/// Wind-to-body rotation.
pub fn tw2b(alpha: f64, beta: f64) -> Matrix3<f64> {
    tb2w(alpha, beta).transpose()
}

/// Sums the coefficient polynomials into body-axis forces and moments per
/// the configured axis convention, shifts the aerodynamic reference point,
/// and maintains the stall state.
pub struct AerodynamicsModel {
    config: AeroConfig,
    wing_area: f64,
    wing_span: f64,
    chord: f64,
    wing_incidence: f64,
    aero_ref_point: Vector3<f64>,
    stall_hyst: f64,
}

impl AerodynamicsModel {
    pub fn new(config: AeroConfig, metrics: &MetricsConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            wing_area: metrics.wing_area,
            wing_span: metrics.wing_span,
            chord: metrics.chord,
            wing_incidence: metrics.wing_incidence,
            aero_ref_point: metrics.aero_ref_point,
            stall_hyst: 0.0,
        })
    }
}

impl Model for AerodynamicsModel {
    fn name(&self) -> &str {
        "aerodynamics"
    }

    fn init(&mut self, _state: &mut SimState) -> Result<(), SimError> {
        self.stall_hyst = 0.0;
        Ok(())
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let alpha = state.aux.alpha;
        let beta = state.aux.beta;
        let qbar_area = self.wing_area * state.aux.qbar;

        let twovel = 2.0 * state.aux.vt;
        let (bi2vel, ci2vel) = if twovel > 0.0 {
            (self.wing_span / twovel, self.chord / twovel)
        } else {
            (0.0, 0.0)
        };

        let impending_stall = if self.config.alpha_clmax != 0.0
            && alpha > 0.85 * self.config.alpha_clmax
        {
            10.0 * (alpha / self.config.alpha_clmax - 0.85)
        } else {
            0.0
        };

        if self.config.alpha_hyst_max != 0.0 && self.config.alpha_hyst_min != 0.0 {
            if alpha > self.config.alpha_hyst_max {
                self.stall_hyst = 1.0;
            } else if alpha < self.config.alpha_hyst_min {
                self.stall_hyst = 0.0;
            }
        }

        let p_hat = state.aux.v_aero_pqr.x * bi2vel;
        let q_hat = state.aux.v_aero_pqr.y * ci2vel;
        let r_hat = state.aux.v_aero_pqr.z * bi2vel;

        let elevator = state.fcs.elevator_pos;
        let aileron = state.fcs.aileron_pos;
        let rudder = state.fcs.rudder_pos;

        let c = &self.config;
        let c_force_x = c.drag.c_d_0
            + c.drag.c_d_alpha * alpha
            + c.drag.c_d_alpha2 * alpha * alpha
            + c.drag.c_d_beta2 * beta * beta
            + c.drag.c_d_deltae * elevator.abs();
        let c_force_y = c.side_force.c_y_beta * beta
            + c.side_force.c_y_p * p_hat
            + c.side_force.c_y_r * r_hat
            + c.side_force.c_y_deltaa * aileron
            + c.side_force.c_y_deltar * rudder;
        let c_force_z = c.lift.c_l_0
            + c.lift.c_l_alpha * alpha
            + c.lift.c_l_q * q_hat
            + c.lift.c_l_deltae * elevator;

        let native = Vector3::new(c_force_x, c_force_y, c_force_z) * qbar_area;

        // Axis convention switch; f_wind feeds L/D and the load factor.
        let (forces, f_wind) = match c.axis {
            AeroAxisSystem::LiftDrag => {
                let mut fw = native;
                fw.x = -fw.x;
                fw.z = -fw.z;
                (tw2b(alpha, beta) * fw, fw)
            }
            AeroAxisSystem::AxialNormal => {
                let fw = tb2w(alpha, beta) * native;
                let forces = Vector3::new(-native.x, native.y, -native.z);
                (forces, fw)
            }
            AeroAxisSystem::BodyXyz => (native, tb2w(alpha, beta) * native),
        };

        let cl_squared = if state.aux.qbar > 0.0 {
            let cl = f_wind.z / (self.wing_area * state.aux.qbar);
            cl * cl
        } else {
            0.0
        };
        let lift_over_drag = if f_wind.x.abs() > 0.0 {
            (f_wind.z / f_wind.x).abs()
        } else {
            0.0
        };

        // Reference-point shift, a function of Mach, in chords.
        let mut ref_point = self.aero_ref_point;
        if let Some(table) = &c.rp_shift_mach {
            ref_point.x += table.value(state.aux.mach) * self.chord * FT_TO_INCH;
        }
        let arm = structural_to_body(ref_point, state.mass.cg);

        let mut moments = arm.cross(&forces);
        moments.x += (c.roll.c_l_beta * beta
            + c.roll.c_l_p * p_hat
            + c.roll.c_l_r * r_hat
            + c.roll.c_l_deltaa * aileron
            + c.roll.c_l_deltar * rudder)
            * qbar_area
            * self.wing_span;
        moments.y += (c.pitch.c_m_0
            + c.pitch.c_m_alpha * alpha
            + c.pitch.c_m_q * q_hat
            + c.pitch.c_m_deltae * elevator)
            * qbar_area
            * self.chord;
        moments.z += (c.yaw.c_n_beta * beta
            + c.yaw.c_n_p * p_hat
            + c.yaw.c_n_r * r_hat
            + c.yaw.c_n_deltaa * aileron
            + c.yaw.c_n_deltar * rudder)
            * qbar_area
            * self.wing_span;

        state.aero = crate::state::AeroOutput {
            forces,
            moments,
            f_wind,
            qbar_area,
            cl_squared,
            lift_over_drag,
            impending_stall,
            stall_hyst: self.stall_hyst,
            bi2vel,
            ci2vel,
            alpha_wing: alpha + self.wing_incidence,
        };
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let aero = &state.aero;
        state.bus.set_double("forces/fbx-aero-lbs", aero.forces.x);
        state.bus.set_double("forces/fby-aero-lbs", aero.forces.y);
        state.bus.set_double("forces/fbz-aero-lbs", aero.forces.z);
        state.bus.set_double("moments/l-aero-lbsft", aero.moments.x);
        state.bus.set_double("moments/m-aero-lbsft", aero.moments.y);
        state.bus.set_double("moments/n-aero-lbsft", aero.moments.z);
        state.bus.set_double("aero/cl-squared", aero.cl_squared);
        state.bus.set_double("aero/l-over-d", aero.lift_over_drag);
        state
            .bus
            .set_double("aero/stall-warn-norm", aero.impending_stall);
        state.bus.set_double("aero/stall-hyst-norm", aero.stall_hyst);
        state.bus.set_double("aero/alpha-wing-rad", aero.alpha_wing);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AircraftConfig;
    use approx::assert_relative_eq;

    fn model() -> AerodynamicsModel {
        let config = AircraftConfig::light_single();
        AerodynamicsModel::new(config.aero.clone(), &config.metrics).unwrap()
    }

    fn cruise_state() -> SimState {
        let mut state = SimState::new(0.01);
        state.aux.vt = 200.0;
        state.aux.qbar = 0.5 * 0.0023769 * 200.0 * 200.0;
        state.aux.alpha = 0.05;
        state.aux.beta = 0.0;
        state.aux.v_aero_pqr = Vector3::zeros();
        state
    }

    #[test]
    fn test_wind_axis_rotation_is_proper() {
        let t = tb2w(0.2, -0.1);
        assert_relative_eq!(t * t.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(t.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_wind_maps_to_wind_x() {
        // The aero-velocity unit vector expressed in wind axes is pure X.
        let (alpha, beta): (f64, f64) = (0.15, 0.08);
        let v_body = Vector3::new(
            alpha.cos() * beta.cos(),
            beta.sin(),
            alpha.sin() * beta.cos(),
        );
        let v_wind = tb2w(alpha, beta) * v_body;
        assert_relative_eq!(v_wind, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_lift_acts_up_drag_acts_aft() {
        let mut model = model();
        let mut state = cruise_state();
        model.run(&mut state).unwrap();

        // Positive lift: negative body Z. Drag: negative body X.
        assert!(state.aero.forces.z < 0.0);
        assert!(state.aero.forces.x < 0.0);
        assert!(state.aero.lift_over_drag > 1.0);
        assert!(state.aero.cl_squared > 0.0);
    }

    #[test]
    fn test_no_airspeed_no_forces() {
        let mut model = model();
        let mut state = SimState::new(0.01);
        model.run(&mut state).unwrap();
        assert_relative_eq!(state.aero.forces.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(state.aero.moments.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_elevator_produces_pitch_moment() {
        let mut model = model();
        let mut state = cruise_state();
        model.run(&mut state).unwrap();
        let baseline = state.aero.moments.y;

        state.fcs.elevator_pos = -0.5;
        model.run(&mut state).unwrap();
        // Nose-up command (negative elevator) pitches up
        assert!(state.aero.moments.y > baseline);
    }

    #[test]
    fn test_impending_stall_threshold() {
        let mut model = model();
        let mut state = cruise_state();

        state.aux.alpha = 0.84 * 0.28;
        model.run(&mut state).unwrap();
        assert_relative_eq!(state.aero.impending_stall, 0.0);

        state.aux.alpha = 0.95 * 0.28;
        model.run(&mut state).unwrap();
        assert!(state.aero.impending_stall > 0.0);
    }

    #[test]
    fn test_stall_hysteresis_latches() {
        let mut model = model();
        let mut state = cruise_state();

        // Cross the upper threshold: stalled
        state.aux.alpha = 0.32;
        model.run(&mut state).unwrap();
        assert_relative_eq!(state.aero.stall_hyst, 1.0);

        // Between the thresholds: still stalled
        state.aux.alpha = 0.28;
        model.run(&mut state).unwrap();
        assert_relative_eq!(state.aero.stall_hyst, 1.0);

        // Below the lower threshold: recovered
        state.aux.alpha = 0.2;
        model.run(&mut state).unwrap();
        assert_relative_eq!(state.aero.stall_hyst, 0.0);
    }
}
