use std::any::Any;

use nalgebra::Vector3;

use crate::models::aerodynamics::tb2w;
use crate::models::Model;
use crate::state::SimState;
use crate::utils::errors::SimError;

/// Sums every contributor's body-frame force and moment and derives the
/// load factors. A hold-down clamp zeroes the sums for static engine runs.
pub struct AircraftModel;

impl AircraftModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AircraftModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for AircraftModel {
    fn name(&self) -> &str {
        "aircraft"
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let hold_down = state.bus.get_bool("forces/hold-down");

        let (forces, moments) = if hold_down {
            (Vector3::zeros(), Vector3::zeros())
        } else {
            (
                state.aero.forces
                    + state.propulsion.forces
                    + state.ground.forces
                    + state.external.forces
                    + state.buoyant.forces,
                state.aero.moments
                    + state.propulsion.moments
                    + state.ground.moments
                    + state.external.moments
                    + state.buoyant.moments,
            )
        };

        let body_accel = forces / state.mass.mass_slugs;
        let gravity = state.inertial.gravity.max(1e-9);
        let n_cg = body_accel / gravity;
        let mut n_wcg = tb2w(state.aux.alpha, state.aux.beta) * n_cg;
        n_wcg.z = -n_wcg.z + 1.0;

        state.aircraft = crate::state::AircraftOutput {
            forces,
            moments,
            body_accel,
            n_cg,
            n_wcg,
        };
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let aircraft = &state.aircraft;
        state.bus.set_double("forces/fbx-total-lbs", aircraft.forces.x);
        state.bus.set_double("forces/fby-total-lbs", aircraft.forces.y);
        state.bus.set_double("forces/fbz-total-lbs", aircraft.forces.z);
        state
            .bus
            .set_double("moments/l-total-lbsft", aircraft.moments.x);
        state
            .bus
            .set_double("moments/m-total-lbsft", aircraft.moments.y);
        state
            .bus
            .set_double("moments/n-total-lbsft", aircraft.moments.z);
        state.bus.set_double("forces/load-factor", aircraft.n_wcg.z);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sums_all_contributors() {
        let mut model = AircraftModel::new();
        let mut state = SimState::new(0.01);
        state.mass.mass_slugs = 2.0;
        state.inertial.gravity = 32.174;
        state.aero.forces = Vector3::new(-10.0, 0.0, -100.0);
        state.propulsion.forces = Vector3::new(50.0, 0.0, 0.0);
        state.ground.forces = Vector3::new(0.0, 0.0, -5.0);
        state.external.moments = Vector3::new(0.0, 7.0, 0.0);

        model.run(&mut state).unwrap();

        assert_relative_eq!(
            state.aircraft.forces,
            Vector3::new(40.0, 0.0, -105.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            state.aircraft.moments,
            Vector3::new(0.0, 7.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            state.aircraft.body_accel,
            Vector3::new(20.0, 0.0, -52.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_hold_down_zeroes_sums() {
        let mut model = AircraftModel::new();
        let mut state = SimState::new(0.01);
        state.mass.mass_slugs = 1.0;
        state.inertial.gravity = 32.174;
        state.propulsion.forces = Vector3::new(5000.0, 0.0, 0.0);
        state.bus.set_bool("forces/hold-down", true);

        model.run(&mut state).unwrap();
        assert_relative_eq!(state.aircraft.forces.norm(), 0.0);
    }

    #[test]
    fn test_wind_axis_load_factor_flip() {
        // Lift exactly canceling weight: n_cg z is -1 g, and the wind-axis
        // view flips the sign and adds the 1-g datum.
        let mut model = AircraftModel::new();
        let mut state = SimState::new(0.01);
        state.mass.mass_slugs = 100.0;
        state.inertial.gravity = 32.174;
        state.aero.forces = Vector3::new(0.0, 0.0, -100.0 * 32.174);

        model.run(&mut state).unwrap();
        assert_relative_eq!(state.aircraft.n_wcg.z, 2.0, epsilon = 1e-12);
        assert_relative_eq!(state.aircraft.n_cg.z, -1.0, epsilon = 1e-12);
    }
}
