mod aero;
mod buoyant;
mod external;
mod fcs;
mod gear;
mod mass;
mod propulsion;

pub use aero::{
    AeroAxisSystem, AeroConfig, DragCoefficients, LiftCoefficients, PitchCoefficients,
    RollCoefficients, SideForceCoefficients, YawCoefficients,
};
pub use buoyant::{BuoyancyConfig, GasCellConfig, GasType};
pub use external::{ExternalForceConfig, ForceFrame};
pub use fcs::{FcsChannelConfig, FcsComponentConfig, FcsConfig, FcsTarget, COMMAND_INPUTS};
pub use gear::{BrakeGroup, ContactKind, DampingType, GearConfig, SteerType};
pub use mass::{MassConfig, PointMassConfig, Shape, ShapeConfig};
pub use propulsion::{
    CapacityUnit, EngineConfig, EngineKind, PropulsionConfig, TankConfig, TankKind,
};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;

/// Geometric reference quantities. Lengths in feet except the structural
/// frame reference points, which are inches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Reference wing area [ft^2]
    pub wing_area: f64,
    /// Wing span [ft]
    pub wing_span: f64,
    /// Mean aerodynamic chord [ft]
    pub chord: f64,
    /// Wing incidence [rad]
    #[serde(default)]
    pub wing_incidence: f64,
    /// Aerodynamic reference point, structural frame [in]
    #[serde(default)]
    pub aero_ref_point: Vector3<f64>,
    /// Pilot eyepoint, structural frame [in]
    #[serde(default)]
    pub eyepoint: Vector3<f64>,
    /// Visual reference point, structural frame [in]
    #[serde(default)]
    pub visual_ref_point: Vector3<f64>,
}

/// Complete aircraft definition consumed by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftConfig {
    pub name: String,
    pub metrics: MetricsConfig,
    pub mass: MassConfig,
    pub aero: AeroConfig,
    pub gear: Vec<GearConfig>,
    #[serde(default)]
    pub propulsion: PropulsionConfig,
    #[serde(default)]
    pub fcs: FcsConfig,
    #[serde(default)]
    pub buoyancy: Option<BuoyancyConfig>,
    #[serde(default)]
    pub external_forces: Vec<ExternalForceConfig>,
}

impl AircraftConfig {
    /// Load an aircraft configuration from a YAML file
    pub fn from_yaml(path: &str) -> Result<Self, SimError> {
        let file = std::fs::File::open(path)?;
        let config: AircraftConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.metrics.wing_area <= 0.0 {
            return Err(SimError::InvalidConfig("Wing area must be positive".into()));
        }
        if self.metrics.wing_span <= 0.0 {
            return Err(SimError::InvalidConfig("Wing span must be positive".into()));
        }
        if self.metrics.chord <= 0.0 {
            return Err(SimError::InvalidConfig(
                "Mean aerodynamic chord must be positive".into(),
            ));
        }
        if self.gear.is_empty() {
            return Err(SimError::InvalidConfig(
                "At least one ground contact unit is required".into(),
            ));
        }
        self.mass.validate()?;
        self.aero.validate()?;
        self.fcs.validate()?;
        self.propulsion.validate()?;
        for gear in &self.gear {
            gear.validate()?;
        }
        if let Some(buoyancy) = &self.buoyancy {
            buoyancy.validate()?;
        }
        for force in &self.external_forces {
            force.validate()?;
        }
        Ok(())
    }

    /// A small single-engine taildragger-style sample, handy for tests.
    pub fn light_single() -> Self {
        Self {
            name: "light-single".into(),
            metrics: MetricsConfig {
                wing_area: 174.0,
                wing_span: 36.0,
                chord: 4.9,
                wing_incidence: 0.0,
                aero_ref_point: Vector3::new(41.0, 0.0, 36.5),
                eyepoint: Vector3::new(37.0, 0.0, 45.0),
                visual_ref_point: Vector3::zeros(),
            },
            mass: MassConfig {
                empty_weight: 1500.0,
                cg_location: Vector3::new(41.0, 0.0, 36.5),
                ixx: 948.0,
                iyy: 1346.0,
                izz: 1967.0,
                ixy: 0.0,
                ixz: 0.0,
                iyz: 0.0,
                point_masses: Vec::new(),
            },
            aero: AeroConfig {
                axis: AeroAxisSystem::LiftDrag,
                alpha_clmax: 0.28,
                alpha_clmin: -0.15,
                alpha_hyst_max: 0.31,
                alpha_hyst_min: 0.26,
                rp_shift_mach: None,
                drag: DragCoefficients {
                    c_d_0: 0.028,
                    c_d_alpha: 0.16,
                    c_d_alpha2: 1.4,
                    c_d_beta2: 0.17,
                    c_d_deltae: 0.02,
                },
                side_force: SideForceCoefficients {
                    c_y_beta: -0.31,
                    c_y_p: -0.037,
                    c_y_r: 0.21,
                    c_y_deltaa: 0.0,
                    c_y_deltar: 0.19,
                },
                lift: LiftCoefficients {
                    c_l_0: 0.31,
                    c_l_alpha: 5.14,
                    c_l_q: 3.9,
                    c_l_deltae: 0.43,
                },
                roll: RollCoefficients {
                    c_l_beta: -0.089,
                    c_l_p: -0.47,
                    c_l_r: 0.096,
                    c_l_deltaa: -0.178,
                    c_l_deltar: 0.0147,
                },
                pitch: PitchCoefficients {
                    c_m_0: -0.015,
                    c_m_alpha: -0.89,
                    c_m_q: -12.4,
                    c_m_deltae: -1.28,
                },
                yaw: YawCoefficients {
                    c_n_beta: 0.065,
                    c_n_p: -0.03,
                    c_n_r: -0.099,
                    c_n_deltaa: -0.0053,
                    c_n_deltar: -0.0657,
                },
            },
            gear: vec![
                GearConfig {
                    name: "nose".into(),
                    steer_type: SteerType::Steerable,
                    max_steer: 30.0,
                    brake_group: BrakeGroup::Nose,
                    ..GearConfig::simple_bogey(
                        "nose",
                        Vector3::new(6.0, 0.0, -6.5),
                        1800.0,
                        600.0,
                    )
                },
                GearConfig {
                    name: "left-main".into(),
                    brake_group: BrakeGroup::Left,
                    ..GearConfig::simple_bogey(
                        "left-main",
                        Vector3::new(58.0, -43.0, -6.5),
                        5400.0,
                        1600.0,
                    )
                },
                GearConfig {
                    name: "right-main".into(),
                    brake_group: BrakeGroup::Right,
                    ..GearConfig::simple_bogey(
                        "right-main",
                        Vector3::new(58.0, 43.0, -6.5),
                        5400.0,
                        1600.0,
                    )
                },
            ],
            propulsion: PropulsionConfig {
                engines: vec![EngineConfig {
                    name: "engine".into(),
                    kind: EngineKind::Piston {
                        max_power_hp: 160.0,
                        sfc: 0.45,
                        efficiency: 0.75,
                    },
                    location: Vector3::new(12.0, 0.0, 40.0),
                    orientation: Vector3::zeros(),
                    feed_tanks: vec![0, 1],
                }],
                tanks: vec![
                    TankConfig {
                        kind: TankKind::Fuel,
                        location: Vector3::new(48.0, -112.0, 59.4),
                        capacity: 28.0,
                        capacity_unit: CapacityUnit::Gal,
                        contents: 20.0,
                        standpipe: 0.0,
                        fuel_density: Some(6.0),
                    },
                    TankConfig {
                        kind: TankKind::Fuel,
                        location: Vector3::new(48.0, 112.0, 59.4),
                        capacity: 28.0,
                        capacity_unit: CapacityUnit::Gal,
                        contents: 20.0,
                        standpipe: 0.0,
                        fuel_density: Some(6.0),
                    },
                ],
                dump_rate: 0.0,
            },
            fcs: FcsConfig::default(),
            buoyancy: None,
            external_forces: Vec::new(),
        }
    }
}
