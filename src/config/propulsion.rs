use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;

/// Propulsion system: engines, tanks, and the fuel dump rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropulsionConfig {
    #[serde(default)]
    pub engines: Vec<EngineConfig>,
    #[serde(default)]
    pub tanks: Vec<TankConfig>,
    /// Fuel dump rate [lbs/min]
    #[serde(default)]
    pub dump_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub kind: EngineKind,
    /// Thruster location, structural frame [in]
    pub location: Vector3<f64>,
    /// Thruster orientation (roll, pitch, yaw) [rad]; thrust acts along the
    /// rotated +X axis
    #[serde(default)]
    pub orientation: Vector3<f64>,
    /// Indices into the tank list this engine draws from
    #[serde(default)]
    pub feed_tanks: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineKind {
    /// Gas turbine with slow spool dynamics
    Turbine {
        max_thrust: f64,
        /// Thrust-specific fuel consumption [lbs fuel / (lbf*hr)]
        tsfc: f64,
    },
    /// Reciprocating engine driving a fixed-pitch propeller
    Piston {
        max_power_hp: f64,
        /// Specific fuel consumption [lbs fuel / (hp*hr)]
        sfc: f64,
        /// Propeller efficiency at cruise
        efficiency: f64,
    },
    /// Thrust tracks the throttle directly; no internal dynamics
    Direct { max_thrust: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TankKind {
    Fuel,
    Oxidizer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CapacityUnit {
    Lbs,
    Gal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TankConfig {
    pub kind: TankKind,
    /// Structural frame location [in]
    pub location: Vector3<f64>,
    /// Capacity in `capacity_unit`
    pub capacity: f64,
    pub capacity_unit: CapacityUnit,
    /// Initial contents in `capacity_unit`
    pub contents: f64,
    /// Quantity below which the dump valve cannot drain [lbs]
    #[serde(default)]
    pub standpipe: f64,
    /// Fuel density [lbs/gal]; required when the capacity unit is GAL
    #[serde(default)]
    pub fuel_density: Option<f64>,
}

impl TankConfig {
    fn to_lbs(&self, quantity: f64) -> Result<f64, SimError> {
        match self.capacity_unit {
            CapacityUnit::Lbs => Ok(quantity),
            CapacityUnit::Gal => match self.fuel_density {
                Some(density) if density > 0.0 => Ok(quantity * density),
                _ => Err(SimError::InvalidConfig(
                    "Tank capacity in GAL requires an explicit positive fuel_density".into(),
                )),
            },
        }
    }

    pub fn capacity_lbs(&self) -> Result<f64, SimError> {
        self.to_lbs(self.capacity)
    }

    pub fn contents_lbs(&self) -> Result<f64, SimError> {
        self.to_lbs(self.contents)
    }
}

impl PropulsionConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        for engine in &self.engines {
            match engine.kind {
                EngineKind::Turbine { max_thrust, tsfc } => {
                    if max_thrust <= 0.0 || tsfc < 0.0 {
                        return Err(SimError::InvalidConfig(format!(
                            "Engine {}: turbine needs positive thrust and non-negative tsfc",
                            engine.name
                        )));
                    }
                }
                EngineKind::Piston {
                    max_power_hp,
                    sfc,
                    efficiency,
                } => {
                    if max_power_hp <= 0.0 || sfc < 0.0 {
                        return Err(SimError::InvalidConfig(format!(
                            "Engine {}: piston needs positive power and non-negative sfc",
                            engine.name
                        )));
                    }
                    if !(0.0..=1.0).contains(&efficiency) {
                        return Err(SimError::InvalidConfig(format!(
                            "Engine {}: propeller efficiency must be within [0, 1]",
                            engine.name
                        )));
                    }
                }
                EngineKind::Direct { max_thrust } => {
                    if max_thrust < 0.0 {
                        return Err(SimError::InvalidConfig(format!(
                            "Engine {}: thrust must not be negative",
                            engine.name
                        )));
                    }
                }
            }
            for &tank in &engine.feed_tanks {
                if tank >= self.tanks.len() {
                    return Err(SimError::InvalidConfig(format!(
                        "Engine {} feeds from tank {} which does not exist",
                        engine.name, tank
                    )));
                }
            }
        }
        for (i, tank) in self.tanks.iter().enumerate() {
            let capacity = tank.capacity_lbs()?;
            let contents = tank.contents_lbs()?;
            if capacity < 0.0 || contents < 0.0 || contents > capacity {
                return Err(SimError::InvalidConfig(format!(
                    "Tank {}: contents must lie within [0, capacity]",
                    i
                )));
            }
        }
        if self.dump_rate < 0.0 {
            return Err(SimError::InvalidConfig(
                "Fuel dump rate must not be negative".into(),
            ));
        }
        Ok(())
    }
}
