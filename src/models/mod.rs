mod aerodynamics;
mod aircraft;
mod atmosphere;
mod auxiliary;
mod buoyant_forces;
mod engine;
mod external_reactions;
mod fcs;
mod gear;
mod ground_reactions;
mod input;
mod inertial;
mod mass_balance;
mod propagate;
mod propulsion;

pub use aerodynamics::AerodynamicsModel;
pub use aircraft::AircraftModel;
pub use atmosphere::{AtmosphereCurves, AtmosphereModel, StandardAtmosphere};
pub use auxiliary::AuxiliaryModel;
pub use buoyant_forces::BuoyantForcesModel;
pub use engine::{Engine, EngineContext, Thruster};
pub use external_reactions::ExternalReactionsModel;
pub use fcs::FcsModel;
pub use gear::LandingGear;
pub use ground_reactions::GroundReactionsModel;
pub use inertial::{EarthParams, InertialModel};
pub use input::InputModel;
pub use mass_balance::{body_to_structural, structural_to_body, MassBalanceModel};
pub use propagate::{Integrator, IntegratorSet, PropagateModel};
pub use propulsion::PropulsionModel;

use std::any::Any;

use crate::state::SimState;
use crate::utils::errors::SimError;

/// A physical submodel in the execution pipeline.
///
/// The executor owns one instance of each, ordered as in the pipeline table,
/// and drives them once per tick. Models communicate only through the
/// blackboard: each reads the snapshot and earlier models' outputs, and
/// writes its own output slot.
pub trait Model: Send + Sync {
    fn name(&self) -> &str;

    /// Execute every Nth tick; 1 runs every tick.
    fn rate(&self) -> usize {
        1
    }

    fn init(&mut self, _state: &mut SimState) -> Result<(), SimError> {
        Ok(())
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError>;

    /// Republish this model's outputs onto the property bus.
    fn publish(&self, _state: &mut SimState) {}

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
