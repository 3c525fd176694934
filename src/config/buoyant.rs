use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::utils::errors::SimError;

/// Lifting-gas cells for lighter-than-air craft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuoyancyConfig {
    pub cells: Vec<GasCellConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GasType {
    Air,
    Helium,
    Hydrogen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasCellConfig {
    pub gas: GasType,
    /// Cell center, structural frame [in]
    pub location: Vector3<f64>,
    /// Envelope volume [ft^3]
    pub max_volume: f64,
    /// Fill fraction [0, 1]
    pub fullness: f64,
}

impl BuoyancyConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.max_volume <= 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "Gas cell {}: volume must be positive",
                    i
                )));
            }
            if !(0.0..=1.0).contains(&cell.fullness) {
                return Err(SimError::InvalidConfig(format!(
                    "Gas cell {}: fullness must be within [0, 1]",
                    i
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullness_bounds() {
        let config = BuoyancyConfig {
            cells: vec![GasCellConfig {
                gas: GasType::Helium,
                location: Vector3::zeros(),
                max_volume: 100_000.0,
                fullness: 1.2,
            }],
        };
        assert!(config.validate().is_err());
    }
}
