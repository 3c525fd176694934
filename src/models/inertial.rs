use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::models::Model;
use crate::state::SimState;
use crate::utils::constants::{
    EARTH_GM, EARTH_RADIUS_REFERENCE, EARTH_ROTATION_RATE, EARTH_SEMIMAJOR, EARTH_SEMIMINOR,
    STANDARD_GRAVITY,
};
use crate::utils::errors::SimError;

/// Planet constants. Defaults to the WGS-84 Earth; tests use `flat()` for a
/// non-rotating planet with a fixed gravity field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EarthParams {
    /// Gravitational parameter [ft^3/s^2]
    pub gm: f64,
    pub rotation_rate: f64,
    pub semimajor: f64,
    pub semiminor: f64,
    pub reference_radius: f64,
    /// Fixed gravity magnitude [ft/s^2] instead of GM/r^2
    pub gravity_override: Option<f64>,
}

impl Default for EarthParams {
    fn default() -> Self {
        Self {
            gm: EARTH_GM,
            rotation_rate: EARTH_ROTATION_RATE,
            semimajor: EARTH_SEMIMAJOR,
            semiminor: EARTH_SEMIMINOR,
            reference_radius: EARTH_RADIUS_REFERENCE,
            gravity_override: None,
        }
    }
}

impl EarthParams {
    /// Non-rotating planet with uniform standard gravity.
    pub fn flat() -> Self {
        Self {
            rotation_rate: 0.0,
            gravity_override: Some(STANDARD_GRAVITY),
            ..Default::default()
        }
    }

    pub fn gravity_at(&self, radius: f64) -> f64 {
        match self.gravity_override {
            Some(g) => g,
            None => self.gm / (radius * radius),
        }
    }
}

/// Advances the Earth rotation angle and evaluates the gravity magnitude at
/// the vehicle radius.
pub struct InertialModel {
    params: EarthParams,
    earth_position_angle: f64,
}

impl InertialModel {
    pub fn new(params: EarthParams) -> Self {
        Self {
            params,
            earth_position_angle: 0.0,
        }
    }
}

impl Model for InertialModel {
    fn name(&self) -> &str {
        "inertial"
    }

    fn init(&mut self, state: &mut SimState) -> Result<(), SimError> {
        self.earth_position_angle = 0.0;
        state.inertial.earth_position_angle = 0.0;
        state.inertial.rotation_rate = self.params.rotation_rate;
        state.inertial.gravity = self.params.gravity_at(state.core.location.radius());
        Ok(())
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let radius = state.core.location.radius();
        self.earth_position_angle += state.dt * self.params.rotation_rate;

        state.inertial.earth_position_angle = self.earth_position_angle;
        state.inertial.rotation_rate = self.params.rotation_rate;
        state.inertial.gravity = self.params.gravity_at(radius);
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        state
            .bus
            .set_double("position/epa-rad", state.inertial.earth_position_angle);
        state
            .bus
            .set_double("inertial/gravity-ft_sec2", state.inertial.gravity);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
