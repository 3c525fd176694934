use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;
use crate::utils::table::Table1D;

/// Which axis system the force coefficient sets are written in. Exactly one
/// convention applies to the whole aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AeroAxisSystem {
    /// Drag/side/lift in wind axes; drag and lift sign-flip before rotation
    LiftDrag,
    /// Axial/side/normal in body axes with X and Z sign-flipped
    AxialNormal,
    /// Body X/Y/Z directly
    BodyXyz,
}

/// Aerodynamic configuration: the axis convention, stall thresholds, and the
/// stability-derivative coefficient sets. Under `axial_normal` the drag and
/// lift slots carry the axial and normal coefficients; under `body_xyz` they
/// carry body X and Z.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AeroConfig {
    pub axis: AeroAxisSystem,
    /// Alpha of maximum lift [rad]; zero disables the impending-stall output
    #[serde(default)]
    pub alpha_clmax: f64,
    #[serde(default)]
    pub alpha_clmin: f64,
    /// Stall hysteresis thresholds [rad]; both zero disables the flag
    #[serde(default)]
    pub alpha_hyst_max: f64,
    #[serde(default)]
    pub alpha_hyst_min: f64,
    /// Aerodynamic reference point shift in chords as a function of Mach
    #[serde(default)]
    pub rp_shift_mach: Option<Table1D>,
    pub drag: DragCoefficients,
    pub side_force: SideForceCoefficients,
    pub lift: LiftCoefficients,
    pub roll: RollCoefficients,
    pub pitch: PitchCoefficients,
    pub yaw: YawCoefficients,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DragCoefficients {
    #[serde(default)]
    pub c_d_0: f64,
    #[serde(default)]
    pub c_d_alpha: f64,
    #[serde(default)]
    pub c_d_alpha2: f64,
    #[serde(default)]
    pub c_d_beta2: f64,
    #[serde(default)]
    pub c_d_deltae: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SideForceCoefficients {
    #[serde(default)]
    pub c_y_beta: f64,
    #[serde(default)]
    pub c_y_p: f64,
    #[serde(default)]
    pub c_y_r: f64,
    #[serde(default)]
    pub c_y_deltaa: f64,
    #[serde(default)]
    pub c_y_deltar: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LiftCoefficients {
    #[serde(default)]
    pub c_l_0: f64,
    #[serde(default)]
    pub c_l_alpha: f64,
    #[serde(default)]
    pub c_l_q: f64,
    #[serde(default)]
    pub c_l_deltae: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RollCoefficients {
    #[serde(default)]
    pub c_l_beta: f64,
    #[serde(default)]
    pub c_l_p: f64,
    #[serde(default)]
    pub c_l_r: f64,
    #[serde(default)]
    pub c_l_deltaa: f64,
    #[serde(default)]
    pub c_l_deltar: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PitchCoefficients {
    #[serde(default)]
    pub c_m_0: f64,
    #[serde(default)]
    pub c_m_alpha: f64,
    #[serde(default)]
    pub c_m_q: f64,
    #[serde(default)]
    pub c_m_deltae: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct YawCoefficients {
    #[serde(default)]
    pub c_n_beta: f64,
    #[serde(default)]
    pub c_n_p: f64,
    #[serde(default)]
    pub c_n_r: f64,
    #[serde(default)]
    pub c_n_deltaa: f64,
    #[serde(default)]
    pub c_n_deltar: f64,
}

impl AeroConfig {
    /// A coefficient-free set; every force and moment evaluates to zero.
    pub fn inert(axis: AeroAxisSystem) -> Self {
        Self {
            axis,
            alpha_clmax: 0.0,
            alpha_clmin: 0.0,
            alpha_hyst_max: 0.0,
            alpha_hyst_min: 0.0,
            rp_shift_mach: None,
            drag: DragCoefficients::default(),
            side_force: SideForceCoefficients::default(),
            lift: LiftCoefficients::default(),
            roll: RollCoefficients::default(),
            pitch: PitchCoefficients::default(),
            yaw: YawCoefficients::default(),
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if (self.alpha_hyst_max == 0.0) != (self.alpha_hyst_min == 0.0) {
            return Err(SimError::InvalidConfig(
                "Stall hysteresis needs both alpha thresholds".into(),
            ));
        }
        if self.alpha_hyst_max != 0.0 && self.alpha_hyst_min >= self.alpha_hyst_max {
            return Err(SimError::InvalidConfig(
                "Stall hysteresis lower threshold must be below the upper".into(),
            ));
        }
        Ok(())
    }
}
