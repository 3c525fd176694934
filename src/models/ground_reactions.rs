use std::any::Any;
use std::sync::Arc;

use nalgebra::Vector3;

use crate::config::GearConfig;
use crate::ground::GroundCallback;
use crate::models::gear::LandingGear;
use crate::models::Model;
use crate::properties::PropertyBus;
use crate::state::SimState;
use crate::utils::errors::SimError;

/// The gear code only engages below this height; above it there is nothing
/// to hit and the terrain queries are skipped.
const GEAR_ENGAGE_AGL: f64 = 300.0; // ft

/// Sums the per-tick body force and moment over all contact units and owns
/// the crash detection path.
pub struct GroundReactionsModel {
    gear: Vec<LandingGear>,
    ground: Arc<dyn GroundCallback>,
}

impl GroundReactionsModel {
    pub fn new(
        configs: &[GearConfig],
        ground: Arc<dyn GroundCallback>,
        dt: f64,
    ) -> Result<Self, SimError> {
        if configs.is_empty() {
            return Err(SimError::InvalidConfig(
                "At least one ground contact unit is required".into(),
            ));
        }
        let gear = configs
            .iter()
            .map(|c| LandingGear::new(c, dt))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { gear, ground })
    }

    pub fn num_units(&self) -> usize {
        self.gear.len()
    }
}

impl Model for GroundReactionsModel {
    fn name(&self) -> &str {
        "ground-reactions"
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let mut forces = Vector3::zeros();
        let mut moments = Vector3::zeros();
        let mut crashed = false;

        if state.altitude_agl() < GEAR_ENGAGE_AGL {
            for gear in self.gear.iter_mut() {
                let update = gear.update(state, self.ground.as_ref());
                forces += update.force;
                moments += update.moment;
                crashed |= update.crashed;
            }
        }

        let reports: Vec<_> = self.gear.iter().map(|g| g.report()).collect();
        state.ground = crate::state::GroundOutput {
            forces,
            moments,
            wow: reports.iter().any(|r| r.wow),
            gear: reports,
        };

        if crashed {
            state.crashed = true;
        }
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let ground = &state.ground;
        state.bus.set_double("forces/fbx-gear-lbs", ground.forces.x);
        state.bus.set_double("forces/fby-gear-lbs", ground.forces.y);
        state.bus.set_double("forces/fbz-gear-lbs", ground.forces.z);
        state.bus.set_double("moments/l-gear-lbsft", ground.moments.x);
        state.bus.set_double("moments/m-gear-lbsft", ground.moments.y);
        state.bus.set_double("moments/n-gear-lbsft", ground.moments.z);
        state.bus.set_double("gear/num-units", self.gear.len() as f64);
        state.bus.set_bool("/sim/crashed", state.crashed);

        let reports = ground.gear.clone();
        for (i, report) in reports.iter().enumerate() {
            if !self.gear[i].is_bogey() {
                continue;
            }
            let rows = [
                ("compression-ft", report.compress_length),
                ("side-friction-coeff", report.side_coeff),
                ("wheel-speed-fps", report.wheel_speed),
                ("slip-angle-deg", report.slip_angle_deg),
                ("pos-norm", report.pos_norm),
            ];
            state
                .bus
                .set_bool(&PropertyBus::indexed("gear/unit", i, "WOW"), report.wow);
            for (suffix, value) in rows {
                state
                    .bus
                    .set_double(&PropertyBus::indexed("gear/unit", i, suffix), value);
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
