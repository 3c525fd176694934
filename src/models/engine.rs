use nalgebra::{UnitQuaternion, Vector3};

use crate::config::{EngineConfig, EngineKind};
use crate::models::mass_balance::structural_to_body;

/// Airspeed floor for the propeller thrust model, where P/V blows up.
const PROP_MIN_AIRSPEED: f64 = 44.0; // ft/s

/// Flight condition handed to each engine every tick.
#[derive(Debug, Clone, Copy)]
pub struct EngineContext {
    pub throttle: f64,
    pub mixture: f64,
    /// rho / rho_SL
    pub density_ratio: f64,
    /// True airspeed [ft/s]
    pub airspeed: f64,
    pub mach: f64,
    pub fuel_available: bool,
}

/// A thrust producer with internal dynamics. Thermodynamic detail lives in
/// the implementations; the pipeline only sees thrust and fuel flow.
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// Advance internal state by `dt` and return the thrust [lbf].
    fn calculate(&mut self, ctx: &EngineContext, dt: f64) -> f64;

    fn thrust(&self) -> f64;

    /// [lbs/s]
    fn fuel_flow(&self) -> f64;

    /// Snap the internal state to already-running at the given throttle,
    /// for in-air or engines-running starts.
    fn init_running(&mut self, _throttle: f64) {}
}

/// Gas turbine: thrust follows the throttle through a slow first-order spool.
pub struct Turbine {
    name: String,
    max_thrust: f64,
    tsfc: f64,
    spool_tau: f64,
    n2: f64,
    thrust: f64,
    fuel_flow: f64,
}

impl Turbine {
    pub fn new(name: &str, max_thrust: f64, tsfc: f64) -> Self {
        Self {
            name: name.to_owned(),
            max_thrust,
            tsfc,
            spool_tau: 3.0,
            n2: 0.0,
            thrust: 0.0,
            fuel_flow: 0.0,
        }
    }
}

impl Engine for Turbine {
    fn name(&self) -> &str {
        &self.name
    }

    fn calculate(&mut self, ctx: &EngineContext, dt: f64) -> f64 {
        let target = if ctx.fuel_available { ctx.throttle } else { 0.0 };
        self.n2 += (target - self.n2) * (1.0 - (-dt / self.spool_tau).exp());
        self.n2 = self.n2.clamp(0.0, 1.0);

        let ram = (1.0 - 0.1 * ctx.mach).max(0.0);
        self.thrust = self.max_thrust * self.n2 * ctx.density_ratio * ram;
        self.fuel_flow = self.tsfc * self.thrust / 3600.0;
        self.thrust
    }

    fn thrust(&self) -> f64 {
        self.thrust
    }

    fn fuel_flow(&self) -> f64 {
        self.fuel_flow
    }

    fn init_running(&mut self, throttle: f64) {
        self.n2 = throttle.clamp(0.0, 1.0);
    }
}

/// Reciprocating engine and fixed-pitch propeller, power-limited.
pub struct Piston {
    name: String,
    max_power_hp: f64,
    sfc: f64,
    efficiency: f64,
    response_tau: f64,
    power_frac: f64,
    thrust: f64,
    fuel_flow: f64,
}

impl Piston {
    pub fn new(name: &str, max_power_hp: f64, sfc: f64, efficiency: f64) -> Self {
        Self {
            name: name.to_owned(),
            max_power_hp,
            sfc,
            efficiency,
            response_tau: 0.5,
            power_frac: 0.0,
            thrust: 0.0,
            fuel_flow: 0.0,
        }
    }
}

impl Engine for Piston {
    fn name(&self) -> &str {
        &self.name
    }

    fn calculate(&mut self, ctx: &EngineContext, dt: f64) -> f64 {
        let target = if ctx.fuel_available && ctx.mixture > 0.01 {
            ctx.throttle
        } else {
            0.0
        };
        self.power_frac += (target - self.power_frac) * (1.0 - (-dt / self.response_tau).exp());
        self.power_frac = self.power_frac.clamp(0.0, 1.0);

        let power_hp = self.max_power_hp * self.power_frac * ctx.density_ratio;
        let power = power_hp * 550.0; // ft*lbf/s
        self.thrust = self.efficiency * power / ctx.airspeed.max(PROP_MIN_AIRSPEED);
        self.fuel_flow = self.sfc * power_hp / 3600.0;
        self.thrust
    }

    fn thrust(&self) -> f64 {
        self.thrust
    }

    fn fuel_flow(&self) -> f64 {
        self.fuel_flow
    }

    fn init_running(&mut self, throttle: f64) {
        self.power_frac = throttle.clamp(0.0, 1.0);
    }
}

/// Thrust tracks the throttle with no dynamics and no fuel burn.
pub struct DirectThrust {
    name: String,
    max_thrust: f64,
    thrust: f64,
}

impl DirectThrust {
    pub fn new(name: &str, max_thrust: f64) -> Self {
        Self {
            name: name.to_owned(),
            max_thrust,
            thrust: 0.0,
        }
    }
}

impl Engine for DirectThrust {
    fn name(&self) -> &str {
        &self.name
    }

    fn calculate(&mut self, ctx: &EngineContext, _dt: f64) -> f64 {
        self.thrust = self.max_thrust * ctx.throttle;
        self.thrust
    }

    fn thrust(&self) -> f64 {
        self.thrust
    }

    fn fuel_flow(&self) -> f64 {
        0.0
    }
}

pub fn build_engine(config: &EngineConfig) -> Box<dyn Engine> {
    match config.kind {
        EngineKind::Turbine { max_thrust, tsfc } => {
            Box::new(Turbine::new(&config.name, max_thrust, tsfc))
        }
        EngineKind::Piston {
            max_power_hp,
            sfc,
            efficiency,
        } => Box::new(Piston::new(&config.name, max_power_hp, sfc, efficiency)),
        EngineKind::Direct { max_thrust } => {
            Box::new(DirectThrust::new(&config.name, max_thrust))
        }
    }
}

/// Orientation and moment arm turning scalar thrust into a body-frame
/// force/moment pair.
#[derive(Debug, Clone, Copy)]
pub struct Thruster {
    /// Structural frame location [in]
    pub location: Vector3<f64>,
    /// (roll, pitch, yaw) [rad]; thrust acts along the rotated +X axis
    pub orientation: Vector3<f64>,
}

impl Thruster {
    pub fn new(location: Vector3<f64>, orientation: Vector3<f64>) -> Self {
        Self {
            location,
            orientation,
        }
    }

    pub fn body_force_moment(
        &self,
        thrust: f64,
        cg: Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let rotation = UnitQuaternion::from_euler_angles(
            self.orientation.x,
            self.orientation.y,
            self.orientation.z,
        );
        let force = rotation * Vector3::new(thrust, 0.0, 0.0);
        let arm = structural_to_body(self.location, cg);
        (force, arm.cross(&force))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sea_level_static(throttle: f64) -> EngineContext {
        EngineContext {
            throttle,
            mixture: 1.0,
            density_ratio: 1.0,
            airspeed: 0.0,
            mach: 0.0,
            fuel_available: true,
        }
    }

    #[test]
    fn test_turbine_spools_toward_commanded_thrust() {
        let mut turbine = Turbine::new("t", 4000.0, 0.8);
        let ctx = sea_level_static(1.0);

        turbine.calculate(&ctx, 1.0);
        let early = turbine.thrust();
        assert!(early > 0.0 && early < 4000.0);

        for _ in 0..300 {
            turbine.calculate(&ctx, 0.1);
        }
        assert_relative_eq!(turbine.thrust(), 4000.0, epsilon = 1.0);
        assert!(turbine.fuel_flow() > 0.0);
    }

    #[test]
    fn test_turbine_starves_without_fuel() {
        let mut turbine = Turbine::new("t", 4000.0, 0.8);
        let mut ctx = sea_level_static(1.0);
        for _ in 0..300 {
            turbine.calculate(&ctx, 0.1);
        }
        ctx.fuel_available = false;
        for _ in 0..300 {
            turbine.calculate(&ctx, 0.1);
        }
        assert_relative_eq!(turbine.thrust(), 0.0, epsilon = 1.0);
    }

    #[test]
    fn test_piston_thrust_decreases_with_airspeed() {
        let mut slow = Piston::new("p", 160.0, 0.45, 0.75);
        let mut fast = Piston::new("p", 160.0, 0.45, 0.75);
        let mut ctx = sea_level_static(1.0);
        for _ in 0..200 {
            ctx.airspeed = 60.0;
            slow.calculate(&ctx, 0.1);
            ctx.airspeed = 200.0;
            fast.calculate(&ctx, 0.1);
        }
        assert!(slow.thrust() > fast.thrust());
    }

    #[test]
    fn test_direct_thrust_is_instantaneous() {
        let mut engine = DirectThrust::new("d", 1000.0);
        assert_relative_eq!(engine.calculate(&sea_level_static(0.25), 0.01), 250.0);
    }

    #[test]
    fn test_thruster_moment_arm() {
        // Thruster one foot right of the CG pointing forward: pure yaw moment.
        let thruster = Thruster::new(Vector3::new(0.0, 12.0, 0.0), Vector3::zeros());
        let (force, moment) = thruster.body_force_moment(100.0, Vector3::zeros());
        assert_relative_eq!(force, Vector3::new(100.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(moment, Vector3::new(0.0, 0.0, -100.0), epsilon = 1e-12);
    }

    #[test]
    fn test_pitched_thruster_lifts() {
        let thruster = Thruster::new(
            Vector3::zeros(),
            Vector3::new(0.0, std::f64::consts::FRAC_PI_2, 0.0),
        );
        let (force, _) = thruster.body_force_moment(100.0, Vector3::zeros());
        assert_relative_eq!(force.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(force.z, -100.0, epsilon = 1e-9);
    }
}
