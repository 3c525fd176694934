pub mod config;
mod executor;
pub mod geodesy;
mod ground;
pub mod models;
mod output;
mod properties;
mod state;
pub mod utils;

pub use executor::{FdmExecutor, InitialConditions, SimOptions};
pub use geodesy::Location;
pub use ground::{FlatTerrain, GroundCallback, GroundContact};
pub use models::{EarthParams, Integrator, IntegratorSet, Model};
pub use output::{Recorder, SimRecord};
pub use properties::{Property, PropertyBus};
pub use state::{CoreState, Frames, SimState};
pub use utils::SimError;
