use std::sync::Arc;

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::AircraftConfig;
use crate::geodesy::Location;
use crate::ground::{FlatTerrain, GroundCallback};
use crate::models::{
    AerodynamicsModel, AircraftModel, AtmosphereModel, AuxiliaryModel, BuoyantForcesModel,
    EarthParams, ExternalReactionsModel, FcsModel, GroundReactionsModel, InertialModel,
    InputModel, IntegratorSet, MassBalanceModel, Model, PropagateModel, PropulsionModel,
};
use crate::state::SimState;
use crate::utils::errors::SimError;
use crate::utils::rng::RngManager;

const INPUT_INDEX: usize = 0;
const PROPULSION_INDEX: usize = 3;
const PROPAGATE_INDEX: usize = 10;

/// Run-time options independent of the aircraft definition.
#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    /// Fixed step [s]
    pub dt: f64,
    pub earth: EarthParams,
    pub integrators: IntegratorSet,
    /// Master seed for the stochastic models (turbulence)
    pub seed: u64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1.0 / 120.0,
            earth: EarthParams::default(),
            integrators: IntegratorSet::default(),
            seed: 0,
        }
    }
}

/// Starting state handed to [`FdmExecutor::initialize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialConditions {
    pub longitude: f64,
    /// Geocentric latitude [rad]
    pub latitude: f64,
    /// Altitude above sea level [ft]
    pub altitude_asl: f64,
    /// Body-frame velocity [ft/s]
    pub v_body: Vector3<f64>,
    /// Body rates [rad/s]
    pub v_pqr: Vector3<f64>,
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
    /// Start with the engines already spooled to their commanded throttles
    pub engines_running: bool,
}

/// The model executive: owns the blackboard and the ordered submodels, and
/// advances the simulation one fixed step per call.
///
/// The submodel order is the contract: within a tick later models observe
/// the outputs of earlier ones, and the propagator's new state becomes
/// visible to everyone on the next tick.
pub struct FdmExecutor {
    state: SimState,
    models: Vec<(Box<dyn Model>, usize)>,
    earth: EarthParams,
}

impl FdmExecutor {
    pub fn new(config: &AircraftConfig, options: SimOptions) -> Result<Self, SimError> {
        let ground: Arc<dyn GroundCallback> =
            Arc::new(FlatTerrain::new(options.earth.reference_radius));
        Self::with_ground(config, options, ground)
    }

    pub fn with_ground(
        config: &AircraftConfig,
        options: SimOptions,
        ground: Arc<dyn GroundCallback>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let rng = RngManager::new(options.seed);
        let n_engines = config.propulsion.engines.len();

        let mut propagate = PropagateModel::new(options.earth, ground.clone());
        propagate.set_integrators(options.integrators);

        // The pipeline, in execution order.
        let models: Vec<Box<dyn Model>> = vec![
            Box::new(InputModel::new()),
            Box::new(AtmosphereModel::new(config.metrics.wing_span, &rng)),
            Box::new(FcsModel::new(&config.fcs, n_engines, options.dt)?),
            Box::new(PropulsionModel::new(&config.propulsion)?),
            Box::new(AerodynamicsModel::new(config.aero.clone(), &config.metrics)?),
            Box::new(GroundReactionsModel::new(&config.gear, ground, options.dt)?),
            Box::new(ExternalReactionsModel::new(&config.external_forces)?),
            Box::new(BuoyantForcesModel::new(config.buoyancy.as_ref())?),
            Box::new(MassBalanceModel::new(&config.mass)?),
            Box::new(AircraftModel::new()),
            Box::new(propagate),
            Box::new(InertialModel::new(options.earth)),
            Box::new(AuxiliaryModel::new(&config.metrics)),
        ];

        let mut state = SimState::new(options.dt);
        state.terrain.sea_level_radius = options.earth.reference_radius;
        state.terrain.local_terrain_radius = options.earth.reference_radius;

        let mut executor = Self {
            state,
            models: models.into_iter().map(|m| (m, 0)).collect(),
            earth: options.earth,
        };
        executor.init_models()?;
        Ok(executor)
    }

    fn init_models(&mut self) -> Result<(), SimError> {
        for (model, counter) in self.models.iter_mut() {
            *counter = 0;
            model.init(&mut self.state)?;
        }
        self.state.refresh_frames();
        Ok(())
    }

    /// Reset the integrated state and re-initialize every submodel.
    pub fn initialize(&mut self, ic: &InitialConditions) -> Result<(), SimError> {
        // Make any already-queued commands and presets visible to the inits.
        self.state.bus.drain_pending();
        self.state.sim_time = 0.0;
        self.state.crashed = false;
        self.state.core.location = Location::from_lon_lat_radius(
            ic.longitude,
            ic.latitude,
            self.state.terrain.sea_level_radius + ic.altitude_asl,
        );
        self.state.core.attitude = UnitQuaternion::from_euler_angles(ic.phi, ic.theta, ic.psi);
        self.state.core.v_uvw = ic.v_body;
        self.state.core.v_pqr = ic.v_pqr;
        self.init_models()?;
        if ic.engines_running || self.state.bus.get_bool("/sim/presets/running") {
            let (model, _) = &mut self.models[PROPULSION_INDEX];
            model
                .as_any_mut()
                .downcast_mut::<PropulsionModel>()
                .expect("propulsion model at its pipeline slot")
                .init_running(&mut self.state);
        }
        Ok(())
    }

    /// Advance one tick. While holding, only the input model runs so
    /// external commands can still arrive.
    pub fn run_with_hold(&mut self, holding: bool) -> Result<(), SimError> {
        if self.state.crashed {
            // A detected crash freezes integration; ticks become no-ops.
            return Ok(());
        }
        self.state.refresh_frames();
        for (index, (model, counter)) in self.models.iter_mut().enumerate() {
            *counter += 1;
            if *counter < model.rate() {
                continue;
            }
            *counter = 0;
            if holding && index != INPUT_INDEX {
                continue;
            }
            model.run(&mut self.state)?;
            model.publish(&mut self.state);
        }
        self.state.sim_time += self.state.dt;
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), SimError> {
        self.run_with_hold(false)
    }

    /// Run the propulsion steady-state loop, as used by trim. Returns the
    /// iteration count each engine took to converge.
    pub fn trim_propulsion(&mut self) -> Result<Vec<usize>, SimError> {
        let (model, _) = &mut self.models[PROPULSION_INDEX];
        let propulsion = model
            .as_any_mut()
            .downcast_mut::<PropulsionModel>()
            .expect("propulsion model at its pipeline slot");
        propulsion.get_steady_state(&mut self.state)
    }

    /// Freeze or release the propagator. Derivatives keep being computed.
    pub fn set_propagate_hold(&mut self, hold: bool) {
        let (model, _) = &mut self.models[PROPAGATE_INDEX];
        model
            .as_any_mut()
            .downcast_mut::<PropagateModel>()
            .expect("propagate model at its pipeline slot")
            .set_hold(hold);
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn sim_time(&self) -> f64 {
        self.state.sim_time
    }

    pub fn crashed(&self) -> bool {
        self.state.crashed
    }

    pub fn earth(&self) -> &EarthParams {
        &self.earth
    }

    /// Queue an external property write; it lands at the next tick.
    pub fn queue_double(&mut self, name: &str, value: f64) {
        self.state.bus.queue_double(name, value);
    }

    pub fn queue_bool(&mut self, name: &str, value: bool) {
        self.state.bus.queue_bool(name, value);
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.state.bus.get_double(name)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.state.bus.get_bool(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_builds_from_sample_config() {
        let config = AircraftConfig::light_single();
        let executor = FdmExecutor::new(&config, SimOptions::default()).unwrap();
        assert_eq!(executor.sim_time(), 0.0);
        assert!(!executor.crashed());
    }

    #[test]
    fn test_time_advances_per_tick() {
        let config = AircraftConfig::light_single();
        let mut executor = FdmExecutor::new(&config, SimOptions::default()).unwrap();
        executor
            .initialize(&InitialConditions {
                altitude_asl: 5000.0,
                ..Default::default()
            })
            .unwrap();

        for _ in 0..12 {
            executor.run().unwrap();
        }
        assert_relative_eq!(executor.sim_time(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_holding_runs_input_only() {
        let config = AircraftConfig::light_single();
        let mut executor = FdmExecutor::new(&config, SimOptions::default()).unwrap();
        executor
            .initialize(&InitialConditions {
                altitude_asl: 5000.0,
                ..Default::default()
            })
            .unwrap();

        let altitude_before = executor.state().altitude_asl();
        executor.queue_double("fcs/elevator-cmd-norm", -0.2);
        executor.run_with_hold(true).unwrap();

        // The command arrived but the state did not move.
        assert_eq!(executor.get_double("fcs/elevator-cmd-norm"), Some(-0.2));
        assert_relative_eq!(executor.state().altitude_asl(), altitude_before, epsilon = 1e-9);
    }

    #[test]
    fn test_queued_command_reaches_fcs() {
        let config = AircraftConfig::light_single();
        let mut executor = FdmExecutor::new(&config, SimOptions::default()).unwrap();
        executor
            .initialize(&InitialConditions {
                altitude_asl: 5000.0,
                ..Default::default()
            })
            .unwrap();

        executor.queue_double("fcs/throttle-cmd-norm[0]", 0.75);
        executor.run().unwrap();
        assert_relative_eq!(executor.state().fcs.throttle_pos[0], 0.75);
    }
}
