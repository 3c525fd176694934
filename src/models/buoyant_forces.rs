use std::any::Any;

use nalgebra::Vector3;

use crate::config::{BuoyancyConfig, GasCellConfig, GasType};
use crate::models::mass_balance::structural_to_body;
use crate::models::Model;
use crate::state::SimState;
use crate::utils::constants::{
    MOLECULAR_WEIGHT_AIR, MOLECULAR_WEIGHT_HELIUM, MOLECULAR_WEIGHT_HYDROGEN,
};
use crate::utils::errors::SimError;

fn gas_molecular_weight(gas: GasType) -> f64 {
    match gas {
        GasType::Air => MOLECULAR_WEIGHT_AIR,
        GasType::Helium => MOLECULAR_WEIGHT_HELIUM,
        GasType::Hydrogen => MOLECULAR_WEIGHT_HYDROGEN,
    }
}

/// Gas-cell lift for lighter-than-air craft. Each cell displaces air at the
/// ambient density; the contained gas mass feeds the mass aggregation.
pub struct BuoyantForcesModel {
    cells: Vec<GasCellConfig>,
}

impl BuoyantForcesModel {
    pub fn new(config: Option<&BuoyancyConfig>) -> Result<Self, SimError> {
        let cells = match config {
            Some(c) => {
                c.validate()?;
                c.cells.clone()
            }
            None => Vec::new(),
        };
        Ok(Self { cells })
    }
}

impl Model for BuoyantForcesModel {
    fn name(&self) -> &str {
        "buoyant-forces"
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let mut forces = Vector3::zeros();
        let mut moments = Vector3::zeros();
        let mut gas_masses = Vec::with_capacity(self.cells.len());

        let air_density = state.atmosphere.density;
        let gravity = state.inertial.gravity;

        for cell in &self.cells {
            let volume = cell.max_volume * cell.fullness;
            let buoyancy = volume * air_density * gravity;

            // Lift acts straight up in the local frame at the cell center.
            let body_force = state.frames.tl2b * Vector3::new(0.0, 0.0, -buoyancy);
            let arm = structural_to_body(cell.location, state.mass.cg);
            forces += body_force;
            moments += arm.cross(&body_force);

            let gas_density =
                air_density * gas_molecular_weight(cell.gas) / MOLECULAR_WEIGHT_AIR;
            gas_masses.push((volume * gas_density, cell.location));
        }

        state.buoyant = crate::state::BuoyantOutput {
            forces,
            moments,
            gas_masses,
        };
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let buoyant = &state.buoyant;
        state.bus.set_double("forces/fbx-buoyancy-lbs", buoyant.forces.x);
        state.bus.set_double("forces/fby-buoyancy-lbs", buoyant.forces.y);
        state.bus.set_double("forces/fbz-buoyancy-lbs", buoyant.forces.z);
        state
            .bus
            .set_double("moments/l-buoyancy-lbsft", buoyant.moments.x);
        state
            .bus
            .set_double("moments/m-buoyancy-lbsft", buoyant.moments.y);
        state
            .bus
            .set_double("moments/n-buoyancy-lbsft", buoyant.moments.z);
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
    fn test_helium_cell_lifts() {
        let config = BuoyancyConfig {
            cells: vec![GasCellConfig {
                gas: GasType::Helium,
                location: Vector3::zeros(),
                max_volume: 100_000.0,
                fullness: 1.0,
            }],
        };
        let mut model = BuoyantForcesModel::new(Some(&config)).unwrap();
        let mut state = SimState::new(0.01);
        state.atmosphere.density = 0.0023769;
        state.inertial.gravity = 32.174;

        model.run(&mut state).unwrap();

        // Displaced air weight: V * rho * g
        let expected = 100_000.0 * 0.0023769 * 32.174;
        assert_relative_eq!(state.buoyant.forces.z, -expected, epsilon = 1e-6);

        // Helium mass is about 14% of the displaced air mass
        let (gas_slugs, _) = state.buoyant.gas_masses[0];
        assert_relative_eq!(
            gas_slugs,
            100_000.0 * 0.0023769 * MOLECULAR_WEIGHT_HELIUM / MOLECULAR_WEIGHT_AIR,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_no_cells_no_output() {
        let mut model = BuoyantForcesModel::new(None).unwrap();
        let mut state = SimState::new(0.01);
        model.run(&mut state).unwrap();
        assert_relative_eq!(state.buoyant.forces.norm(), 0.0);
        assert!(state.buoyant.gas_masses.is_empty());
    }
}
