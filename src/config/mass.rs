use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::utils::constants::LBS_TO_SLUG;
use crate::utils::errors::SimError;

/// Mass and balance configuration. Locations are structural frame [in],
/// inertias slug*ft^2 about the empty CG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassConfig {
    /// Empty weight [lbs]
    pub empty_weight: f64,
    /// Empty CG, structural frame [in]
    pub cg_location: Vector3<f64>,
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    #[serde(default)]
    pub ixy: f64,
    #[serde(default)]
    pub ixz: f64,
    #[serde(default)]
    pub iyz: f64,
    #[serde(default)]
    pub point_masses: Vec<PointMassConfig>,
}

/// A discrete mass item fixed at load time. Tanks and gas cells are handled
/// separately because their weight changes in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointMassConfig {
    pub name: String,
    /// Weight [lbs]
    pub weight: f64,
    /// Structural frame location [in]
    pub location: Vector3<f64>,
    /// Optional solid shape adding its own inertia about its own CG
    #[serde(default)]
    pub form: Option<ShapeConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub shape: Shape,
    /// [ft]
    #[serde(default)]
    pub radius: f64,
    /// [ft]
    #[serde(default)]
    pub length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Thin-walled tube, axis along body X
    Tube,
    /// Solid cylinder, axis along body X
    Cylinder,
    /// Hollow sphere
    Sphere,
    /// Solid sphere
    Ball,
}

impl PointMassConfig {
    /// Inertia of the shape about its own CG, body axes [slug*ft^2].
    pub fn shape_inertia(&self) -> Matrix3<f64> {
        let Some(form) = self.form else {
            return Matrix3::zeros();
        };
        let m = self.weight * LBS_TO_SLUG;
        let r2 = form.radius * form.radius;
        let l2 = form.length * form.length;
        let (ixx, iyy, izz) = match form.shape {
            Shape::Tube => {
                let transverse = m * (6.0 * r2 + l2) / 12.0;
                (m * r2, transverse, transverse)
            }
            Shape::Cylinder => {
                let transverse = m * (3.0 * r2 + l2) / 12.0;
                (m * r2 / 2.0, transverse, transverse)
            }
            Shape::Sphere => {
                let i = 2.0 * m * r2 / 3.0;
                (i, i, i)
            }
            Shape::Ball => {
                let i = 2.0 * m * r2 / 5.0;
                (i, i, i)
            }
        };
        Matrix3::from_diagonal(&Vector3::new(ixx, iyy, izz))
    }
}

impl MassConfig {
    /// Empty inertia tensor with the sign convention for products of inertia.
    pub fn base_inertia(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.ixx, -self.ixy, self.ixz, //
            -self.ixy, self.iyy, -self.iyz, //
            self.ixz, -self.iyz, self.izz,
        )
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.empty_weight <= 0.0 {
            return Err(SimError::InvalidConfig(
                "Empty weight must be positive".into(),
            ));
        }
        if self.ixx <= 0.0 || self.iyy <= 0.0 || self.izz <= 0.0 {
            return Err(SimError::InvalidConfig(
                "Every diagonal moment of inertia must be positive".into(),
            ));
        }
        for pm in &self.point_masses {
            if pm.weight < 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "Point mass {} has negative weight",
                    pm.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn base_config() -> MassConfig {
        MassConfig {
            empty_weight: 1500.0,
            cg_location: Vector3::new(100.0, 0.0, 20.0),
            ixx: 1000.0,
            iyy: 2000.0,
            izz: 2500.0,
            ixy: 0.0,
            ixz: 50.0,
            iyz: 0.0,
            point_masses: Vec::new(),
        }
    }

    #[test]
    fn test_base_inertia_is_symmetric() {
        let j = base_config().base_inertia();
        assert_relative_eq!(j, j.transpose(), epsilon = 1e-15);
        assert_relative_eq!(j[(0, 2)], 50.0);
    }

    #[test]
    fn test_ball_shape_inertia() {
        let pm = PointMassConfig {
            name: "ballast".into(),
            weight: 32.174049,
            location: Vector3::zeros(),
            form: Some(ShapeConfig {
                shape: Shape::Ball,
                radius: 2.0,
                length: 0.0,
            }),
        };
        // One slug, solid sphere: 2/5 * m * r^2 = 1.6
        let j = pm.shape_inertia();
        assert_relative_eq!(j[(0, 0)], 1.6, epsilon = 1e-9);
        assert_relative_eq!(j[(1, 1)], 1.6, epsilon = 1e-9);
    }

    #[test]
    fn test_validate_rejects_nonpositive_inertia() {
        let mut config = base_config();
        config.iyy = 0.0;
        assert!(config.validate().is_err());
    }
}
