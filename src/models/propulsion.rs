use std::any::Any;

use log::{info, warn};
use nalgebra::Vector3;

use crate::config::{PropulsionConfig, TankKind};
use crate::models::engine::{build_engine, Engine, EngineContext, Thruster};
use crate::models::Model;
use crate::state::SimState;
use crate::utils::errors::SimError;

/// Refuel rate while the refuel flag is set [lbs/s per vehicle].
const REFUEL_RATE: f64 = 100.0;
/// Internal step for the steady-state trim loop [s].
const TRIM_DT: f64 = 0.05;
/// Thrust convergence tolerance for trim [lbf].
const TRIM_TOLERANCE: f64 = 1e-4;
const TRIM_STEADY_COUNT: usize = 120;
const TRIM_MAX_ITERATIONS: usize = 6000;

struct Tank {
    kind: TankKind,
    location: Vector3<f64>,
    capacity: f64,
    contents: f64,
    standpipe: f64,
}

impl Tank {
    /// Remove up to `amount` lbs; returns the shortage if the tank ran dry.
    fn drain(&mut self, amount: f64) -> f64 {
        let drained = amount.min(self.contents);
        self.contents -= drained;
        amount - drained
    }

    /// Add up to `amount` lbs; returns the overage past capacity.
    fn fill(&mut self, amount: f64) -> f64 {
        let space = self.capacity - self.contents;
        let added = amount.min(space);
        self.contents += added;
        amount - added
    }

    fn pct_full(&self) -> f64 {
        if self.capacity > 0.0 {
            100.0 * self.contents / self.capacity
        } else {
            100.0
        }
    }
}

/// Engines, thrusters, and tanks. Produces the summed body force/moment and
/// keeps the fuel bookkeeping: burn, transfer to engines, refuel and dump.
pub struct PropulsionModel {
    engines: Vec<Box<dyn Engine>>,
    thrusters: Vec<Thruster>,
    feed_tanks: Vec<Vec<usize>>,
    tanks: Vec<Tank>,
    dump_rate: f64,
}

impl PropulsionModel {
    pub fn new(config: &PropulsionConfig) -> Result<Self, SimError> {
        config.validate()?;
        let tanks = config
            .tanks
            .iter()
            .map(|t| {
                Ok(Tank {
                    kind: t.kind,
                    location: t.location,
                    capacity: t.capacity_lbs()?,
                    contents: t.contents_lbs()?,
                    standpipe: t.standpipe,
                })
            })
            .collect::<Result<Vec<_>, SimError>>()?;
        Ok(Self {
            engines: config.engines.iter().map(|e| build_engine(e)).collect(),
            thrusters: config
                .engines
                .iter()
                .map(|e| Thruster::new(e.location, e.orientation))
                .collect(),
            feed_tanks: config.engines.iter().map(|e| e.feed_tanks.clone()).collect(),
            tanks,
            dump_rate: config.dump_rate,
        })
    }

    pub fn num_engines(&self) -> usize {
        self.engines.len()
    }

    fn engine_context(&self, state: &SimState, index: usize) -> EngineContext {
        let fuel_available = self.feed_tanks[index].is_empty()
            || self.feed_tanks[index]
                .iter()
                .any(|&t| self.tanks[t].contents > 0.0);
        EngineContext {
            throttle: state.fcs.throttle_pos.get(index).copied().unwrap_or(0.0),
            mixture: state.fcs.mixture_pos.get(index).copied().unwrap_or(1.0),
            density_ratio: if state.atmosphere.sl_density > 0.0 {
                state.atmosphere.density / state.atmosphere.sl_density
            } else {
                1.0
            },
            airspeed: state.aux.vt,
            mach: state.aux.mach,
            fuel_available,
        }
    }

    fn burn_fuel(&mut self, engine_index: usize, amount: f64) {
        let feeds = &self.feed_tanks[engine_index];
        let wet: Vec<usize> = feeds
            .iter()
            .copied()
            .filter(|&t| self.tanks[t].contents > 0.0)
            .collect();
        if wet.is_empty() {
            return;
        }
        let share = amount / wet.len() as f64;
        for t in wet {
            self.tanks[t].drain(share);
        }
    }

    fn do_refuel(&mut self, time_slice: f64) {
        let fill = REFUEL_RATE * time_slice;
        let not_full: Vec<usize> = (0..self.tanks.len())
            .filter(|&t| self.tanks[t].pct_full() < 99.99)
            .collect();
        if not_full.is_empty() {
            return;
        }
        let share = fill / not_full.len() as f64;
        for t in not_full {
            self.tanks[t].fill(share);
        }
    }

    fn dump_fuel(&mut self, time_slice: f64) {
        let dumping: Vec<usize> = (0..self.tanks.len())
            .filter(|&t| self.tanks[t].contents > self.tanks[t].standpipe)
            .collect();
        if dumping.is_empty() {
            return;
        }
        let share = self.dump_rate / 60.0 * time_slice / dumping.len() as f64;
        for t in dumping {
            let floor = self.tanks[t].standpipe;
            let available = self.tanks[t].contents - floor;
            self.tanks[t].drain(share.min(available));
        }
    }

    fn collect_outputs(&self, state: &mut SimState) {
        let mut forces = Vector3::zeros();
        let mut moments = Vector3::zeros();
        let mut thrusts = Vec::with_capacity(self.engines.len());
        let mut fuel_flow = 0.0;
        for (engine, thruster) in self.engines.iter().zip(self.thrusters.iter()) {
            let (force, moment) = thruster.body_force_moment(engine.thrust(), state.mass.cg);
            forces += force;
            moments += moment;
            thrusts.push(engine.thrust());
            fuel_flow += engine.fuel_flow();
        }
        state.propulsion = crate::state::PropulsionOutput {
            forces,
            moments,
            total_fuel_lbs: self
                .tanks
                .iter()
                .filter(|t| t.kind == TankKind::Fuel)
                .map(|t| t.contents)
                .sum(),
            fuel_flow_rate: fuel_flow,
            engine_thrusts: thrusts,
            tank_masses: self.tanks.iter().map(|t| (t.contents, t.location)).collect(),
        };
    }

    /// Start every engine already spooled up, then run one calculation so
    /// the outputs reflect the running state. Uses the commanded throttle
    /// off the bus, full throttle when none has been commanded yet.
    pub fn init_running(&mut self, state: &mut SimState) {
        for index in 0..self.engines.len() {
            let mut ctx = self.engine_context(state, index);
            ctx.throttle = state
                .bus
                .get_double_or(&format!("fcs/throttle-cmd-norm[{}]", index), 1.0)
                .clamp(0.0, 1.0);
            self.engines[index].init_running(ctx.throttle);
            self.engines[index].calculate(&ctx, 0.0);
        }
        self.collect_outputs(state);
    }

    /// Iterate each engine to its steady-state thrust, as used by trim.
    /// Convergence is thrust movement below 1e-4 lbf for 120 consecutive
    /// iterations, capped at 6000. Returns the iteration count per engine.
    pub fn get_steady_state(&mut self, state: &mut SimState) -> Result<Vec<usize>, SimError> {
        let mut iteration_counts = Vec::with_capacity(self.engines.len());
        for index in 0..self.engines.len() {
            let ctx = self.engine_context(state, index);
            let mut last_thrust = self.engines[index].thrust();
            let mut steady_count = 0;
            let mut iterations = 0;
            while steady_count <= TRIM_STEADY_COUNT && iterations < TRIM_MAX_ITERATIONS {
                let thrust = self.engines[index].calculate(&ctx, TRIM_DT);
                if (thrust - last_thrust).abs() < TRIM_TOLERANCE {
                    steady_count += 1;
                } else {
                    steady_count = 0;
                }
                last_thrust = thrust;
                iterations += 1;
            }
            if iterations >= TRIM_MAX_ITERATIONS {
                warn!(
                    "Engine {} did not reach steady state within {} iterations",
                    self.engines[index].name(),
                    TRIM_MAX_ITERATIONS
                );
            } else {
                info!(
                    "Engine {} steady at {:.1} lbf after {} iterations",
                    self.engines[index].name(),
                    last_thrust,
                    iterations
                );
            }
            iteration_counts.push(iterations);
        }
        self.collect_outputs(state);
        Ok(iteration_counts)
    }
}

impl Model for PropulsionModel {
    fn name(&self) -> &str {
        "propulsion"
    }

    fn init(&mut self, state: &mut SimState) -> Result<(), SimError> {
        self.collect_outputs(state);
        Ok(())
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let dt = state.dt;
        let fuel_frozen = state.bus.get_bool("/sim/freeze/fuel");

        for index in 0..self.engines.len() {
            let ctx = self.engine_context(state, index);
            self.engines[index].calculate(&ctx, dt);
            if !fuel_frozen {
                let burn = self.engines[index].fuel_flow() * dt;
                if burn > 0.0 {
                    self.burn_fuel(index, burn);
                }
            }
        }

        if state.bus.get_bool("propulsion/refuel") {
            self.do_refuel(dt);
        }
        if state.bus.get_bool("propulsion/fuel_dump") {
            self.dump_fuel(dt);
        }

        self.collect_outputs(state);
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let prop = &state.propulsion;
        state
            .bus
            .set_double("propulsion/total-fuel-lbs", prop.total_fuel_lbs);
        state.bus.set_double("forces/fbx-prop-lbs", prop.forces.x);
        state.bus.set_double("forces/fby-prop-lbs", prop.forces.y);
        state.bus.set_double("forces/fbz-prop-lbs", prop.forces.z);
        state.bus.set_double("moments/l-prop-lbsft", prop.moments.x);
        state.bus.set_double("moments/m-prop-lbsft", prop.moments.y);
        state.bus.set_double("moments/n-prop-lbsft", prop.moments.z);
        for (i, thrust) in prop.engine_thrusts.iter().enumerate() {
            state
                .bus
                .set_double(&format!("propulsion/engine[{}]/thrust-lbs", i), *thrust);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
