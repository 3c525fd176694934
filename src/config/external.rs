use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;

/// Frame the declared force direction is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ForceFrame {
    Body,
    Local,
    Wind,
}

/// A user-declared point force, e.g. arrester hook tension. The magnitude is
/// driven at run time through `external_reactions/<name>/magnitude`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalForceConfig {
    pub name: String,
    /// Application point, structural frame [in]
    pub location: Vector3<f64>,
    /// Direction of action; normalized at load
    pub direction: Vector3<f64>,
    pub frame: ForceFrame,
    /// Initial magnitude [lbf]
    #[serde(default)]
    pub magnitude: f64,
}

impl ExternalForceConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.direction.norm() < 1e-9 {
            return Err(SimError::InvalidConfig(format!(
                "External force {}: direction must be non-zero",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_direction_rejected() {
        let force = ExternalForceConfig {
            name: "hook".into(),
            location: Vector3::new(200.0, 0.0, -10.0),
            direction: Vector3::zeros(),
            frame: ForceFrame::Body,
            magnitude: 0.0,
        };
        assert!(force.validate().is_err());
    }
}
