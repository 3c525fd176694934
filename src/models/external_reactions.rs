use std::any::Any;

use nalgebra::Vector3;

use crate::config::{ExternalForceConfig, ForceFrame};
use crate::models::aerodynamics::tw2b;
use crate::models::mass_balance::structural_to_body;
use crate::models::Model;
use crate::state::SimState;
use crate::utils::errors::SimError;

struct ExternalForce {
    name: String,
    location: Vector3<f64>,
    direction: Vector3<f64>,
    frame: ForceFrame,
    default_magnitude: f64,
}

/// User-declared point forces (arrester hook, winch line). The magnitude of
/// each is driven through `external_reactions/<name>/magnitude`.
pub struct ExternalReactionsModel {
    forces: Vec<ExternalForce>,
}

impl ExternalReactionsModel {
    pub fn new(configs: &[ExternalForceConfig]) -> Result<Self, SimError> {
        let forces = configs
            .iter()
            .map(|c| {
                c.validate()?;
                Ok(ExternalForce {
                    name: c.name.clone(),
                    location: c.location,
                    direction: c.direction.normalize(),
                    frame: c.frame,
                    default_magnitude: c.magnitude,
                })
            })
            .collect::<Result<Vec<_>, SimError>>()?;
        Ok(Self { forces })
    }
}

impl Model for ExternalReactionsModel {
    fn name(&self) -> &str {
        "external-reactions"
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let mut total_force = Vector3::zeros();
        let mut total_moment = Vector3::zeros();

        for force in &self.forces {
            let magnitude = state.bus.get_double_or(
                &format!("external_reactions/{}/magnitude", force.name),
                force.default_magnitude,
            );
            let body_dir = match force.frame {
                ForceFrame::Body => force.direction,
                ForceFrame::Local => state.frames.tl2b * force.direction,
                ForceFrame::Wind => {
                    tw2b(state.aux.alpha, state.aux.beta) * force.direction
                }
            };
            let body_force = body_dir * magnitude;
            let arm = structural_to_body(force.location, state.mass.cg);
            total_force += body_force;
            total_moment += arm.cross(&body_force);
        }

        state.external = crate::state::ExternalOutput {
            forces: total_force,
            moments: total_moment,
        };
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let ext = &state.external;
        state.bus.set_double("forces/fbx-external-lbs", ext.forces.x);
        state.bus.set_double("forces/fby-external-lbs", ext.forces.y);
        state.bus.set_double("forces/fbz-external-lbs", ext.forces.z);
        state
            .bus
            .set_double("moments/l-external-lbsft", ext.moments.x);
        state
            .bus
            .set_double("moments/m-external-lbsft", ext.moments.y);
        state
            .bus
            .set_double("moments/n-external-lbsft", ext.moments.z);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
