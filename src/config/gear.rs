use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContactKind {
    /// A wheeled gear unit
    Bogey,
    /// A structural contact point (tail skid, wingtip)
    Structure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BrakeGroup {
    None,
    Left,
    Right,
    Center,
    Nose,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SteerType {
    Fixed,
    Steerable,
    Castered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DampingType {
    Linear,
    Square,
}

fn default_relaxation_velocity() -> f64 {
    0.7
}

fn default_tire_pressure() -> f64 {
    1.0
}

/// One landing-gear or structural contact unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearConfig {
    pub name: String,
    pub kind: ContactKind,
    /// Structural frame location [in]
    pub location: Vector3<f64>,
    /// Strut spring constant [lbs/ft]
    pub spring_coeff: f64,
    /// Compression damping [lbs/ft/s] (linear) or [lbs/ft^2/s^2] (square)
    pub damping_coeff: f64,
    #[serde(default = "GearConfig::default_damping_type")]
    pub damping_type: DampingType,
    /// Rebound damping; defaults to the compression values
    #[serde(default)]
    pub damping_coeff_rebound: Option<f64>,
    #[serde(default)]
    pub damping_type_rebound: Option<DampingType>,
    #[serde(default)]
    pub static_friction: f64,
    #[serde(default)]
    pub dynamic_friction: f64,
    #[serde(default)]
    pub rolling_friction: f64,
    /// Maximum steering deflection [deg]
    #[serde(default)]
    pub max_steer: f64,
    #[serde(default = "GearConfig::default_steer_type")]
    pub steer_type: SteerType,
    #[serde(default = "GearConfig::default_brake_group")]
    pub brake_group: BrakeGroup,
    #[serde(default)]
    pub retractable: bool,
    /// Slip angle [deg] -> lateral force coefficient; Pacejka when absent
    #[serde(default)]
    pub cornering_table: Option<Vec<(f64, f64)>>,
    /// Rolling force relaxation velocity [ft/s]
    #[serde(default = "default_relaxation_velocity")]
    pub rolling_relaxation_velocity: f64,
    /// Side force relaxation velocity [ft/s]
    #[serde(default = "default_relaxation_velocity")]
    pub side_relaxation_velocity: f64,
    /// Per-axis force lag filter coefficients; default is the frame rate
    #[serde(default)]
    pub rolling_force_lag: Option<f64>,
    #[serde(default)]
    pub side_force_lag: Option<f64>,
    #[serde(default)]
    pub wheel_slip_lag: Option<f64>,
    #[serde(default = "default_tire_pressure")]
    pub tire_pressure_norm: f64,
}

impl GearConfig {
    fn default_damping_type() -> DampingType {
        DampingType::Linear
    }

    fn default_steer_type() -> SteerType {
        SteerType::Fixed
    }

    fn default_brake_group() -> BrakeGroup {
        BrakeGroup::None
    }

    /// A plain fixed bogey with linear damping, for tests and simple craft.
    pub fn simple_bogey(name: &str, location: Vector3<f64>, spring: f64, damping: f64) -> Self {
        Self {
            name: name.to_owned(),
            kind: ContactKind::Bogey,
            location,
            spring_coeff: spring,
            damping_coeff: damping,
            damping_type: DampingType::Linear,
            damping_coeff_rebound: None,
            damping_type_rebound: None,
            static_friction: 0.8,
            dynamic_friction: 0.5,
            rolling_friction: 0.02,
            max_steer: 0.0,
            steer_type: SteerType::Fixed,
            brake_group: BrakeGroup::None,
            retractable: false,
            cornering_table: None,
            rolling_relaxation_velocity: default_relaxation_velocity(),
            side_relaxation_velocity: default_relaxation_velocity(),
            rolling_force_lag: None,
            side_force_lag: None,
            wheel_slip_lag: None,
            tire_pressure_norm: default_tire_pressure(),
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.spring_coeff <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "Gear {}: spring coefficient must be positive",
                self.name
            )));
        }
        if self.damping_coeff < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "Gear {}: damping coefficient must not be negative",
                self.name
            )));
        }
        if self.steer_type == SteerType::Steerable && self.max_steer <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "Gear {}: steerable gear needs a positive max_steer",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.tire_pressure_norm) {
            return Err(SimError::InvalidConfig(format!(
                "Gear {}: tire pressure must be normalized to [0, 1]",
                self.name
            )));
        }
        Ok(())
    }
}
