use std::any::Any;

use nalgebra::{Matrix3, Vector3};

use crate::config::MassConfig;
use crate::models::Model;
use crate::state::SimState;
use crate::utils::constants::{INCH_TO_FT, LBS_TO_SLUG, SLUG_TO_LBS};
use crate::utils::errors::SimError;

/// Convert a structural-frame point [in] to body frame [ft] about the given
/// CG. The structural frame has X aft and Z up, so the conversion is a 180
/// degree rotation about Y plus the inches-to-feet change of units.
pub fn structural_to_body(r: Vector3<f64>, cg: Vector3<f64>) -> Vector3<f64> {
    Vector3::new(
        (cg.x - r.x) * INCH_TO_FT,
        (r.y - cg.y) * INCH_TO_FT,
        (cg.z - r.z) * INCH_TO_FT,
    )
}

/// Inverse of [`structural_to_body`].
pub fn body_to_structural(r: Vector3<f64>, cg: Vector3<f64>) -> Vector3<f64> {
    Vector3::new(cg.x - r.x / INCH_TO_FT, cg.y + r.y / INCH_TO_FT, cg.z - r.z / INCH_TO_FT)
}

/// Parallel-axis inertia of a point mass [slug] at a body-frame offset [ft].
fn point_mass_inertia(slugs: f64, v: Vector3<f64>) -> Matrix3<f64> {
    let sv = slugs * v;
    Matrix3::new(
        v.y * sv.y + v.z * sv.z,
        -v.x * sv.y,
        -v.x * sv.z,
        -v.x * sv.y,
        v.x * sv.x + v.z * sv.z,
        -v.y * sv.z,
        -v.x * sv.z,
        -v.y * sv.z,
        v.x * sv.x + v.y * sv.y,
    )
}

/// Aggregates empty mass, point masses, tank contents, gas mass, and child
/// vehicle weights into the current mass, CG, and inertia tensor.
pub struct MassBalanceModel {
    empty_weight: f64,
    base_cg: Vector3<f64>,
    base_j: Matrix3<f64>,
    point_masses: Vec<(f64, Vector3<f64>, Matrix3<f64>)>,
    last_cg: Option<Vector3<f64>>,
}

impl MassBalanceModel {
    pub fn new(config: &MassConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            empty_weight: config.empty_weight,
            base_cg: config.cg_location,
            base_j: config.base_inertia(),
            point_masses: config
                .point_masses
                .iter()
                .map(|pm| (pm.weight, pm.location, pm.shape_inertia()))
                .collect(),
            last_cg: None,
        })
    }

    /// Symmetric-adjugate closed-form inverse of the inertia tensor.
    fn invert_inertia(j: &Matrix3<f64>) -> Result<Matrix3<f64>, SimError> {
        let (ixx, iyy, izz) = (j[(0, 0)], j[(1, 1)], j[(2, 2)]);
        let (ixy, ixz, iyz) = (-j[(0, 1)], -j[(0, 2)], -j[(1, 2)]);

        let k1 = iyy * izz - iyz * iyz;
        let k2 = iyz * ixz + ixy * izz;
        let k3 = ixy * iyz + iyy * ixz;

        let det = ixx * k1 - ixy * k2 - ixz * k3;
        if det.abs() < 1e-9 {
            return Err(SimError::NumericDivergence(
                "Inertia tensor is singular".into(),
            ));
        }
        let denom = 1.0 / det;
        let k1 = k1 * denom;
        let k2 = k2 * denom;
        let k3 = k3 * denom;
        let k4 = (izz * ixx - ixz * ixz) * denom;
        let k5 = (ixy * ixz + iyz * ixx) * denom;
        let k6 = (ixx * iyy - ixy * ixy) * denom;

        Ok(Matrix3::new(k1, k2, k3, k2, k4, k5, k3, k5, k6))
    }
}

impl Model for MassBalanceModel {
    fn name(&self) -> &str {
        "mass-balance"
    }

    fn init(&mut self, state: &mut SimState) -> Result<(), SimError> {
        self.last_cg = None;
        self.run(state)
    }

    fn run(&mut self, state: &mut SimState) -> Result<(), SimError> {
        let tank_weight: f64 = state.propulsion.tank_masses.iter().map(|(w, _)| w).sum();
        let pm_weight: f64 = self.point_masses.iter().map(|(w, _, _)| w).sum();
        let gas_weight: f64 = state
            .buoyant
            .gas_masses
            .iter()
            .map(|(slugs, _)| slugs * SLUG_TO_LBS)
            .sum();
        let child_weight = state.bus.get_double_or("inertia/child-weight-lbs", 0.0);

        let weight = self.empty_weight + tank_weight + pm_weight + gas_weight + child_weight;
        let mass = weight * LBS_TO_SLUG;
        if !(weight > 0.0) {
            return Err(SimError::NumericDivergence(
                "Total weight is not positive".into(),
            ));
        }

        // New CG in the structural frame. Child vehicles contribute weight
        // only; they ride the parent's CG.
        let mut moment = self.empty_weight * self.base_cg;
        for (w, loc, _) in &self.point_masses {
            moment += *w * *loc;
        }
        for (w, loc) in &state.propulsion.tank_masses {
            moment += *w * *loc;
        }
        for (slugs, loc) in &state.buoyant.gas_masses {
            moment += *slugs * SLUG_TO_LBS * *loc;
        }
        let cg = moment / weight;

        // Frame-to-frame CG travel, handed to the propagator so integration
        // stays about the current CG.
        let last_cg = self.last_cg.unwrap_or(cg);
        let delta_cg_body = structural_to_body(last_cg, cg);
        self.last_cg = Some(cg);

        // Inertia about the current CG.
        let mut j = self.base_j;
        j += point_mass_inertia(self.empty_weight * LBS_TO_SLUG, structural_to_body(self.base_cg, cg));
        for (w, loc, shape) in &self.point_masses {
            j += point_mass_inertia(*w * LBS_TO_SLUG, structural_to_body(*loc, cg));
            j += *shape;
        }
        for (w, loc) in &state.propulsion.tank_masses {
            j += point_mass_inertia(*w * LBS_TO_SLUG, structural_to_body(*loc, cg));
        }
        for (slugs, loc) in &state.buoyant.gas_masses {
            j += point_mass_inertia(*slugs, structural_to_body(*loc, cg));
        }

        let j_inv = Self::invert_inertia(&j)?;

        state.mass = crate::state::MassOutput {
            weight_lbs: weight,
            mass_slugs: mass,
            cg,
            j,
            j_inv,
            delta_cg_body,
        };
        Ok(())
    }

    fn publish(&self, state: &mut SimState) {
        let mass = &state.mass;
        state.bus.set_double("inertia/mass-slugs", mass.mass_slugs);
        state.bus.set_double("inertia/weight-lbs", mass.weight_lbs);
        state.bus.set_double("inertia/cg-x-in", mass.cg.x);
        state.bus.set_double("inertia/cg-y-in", mass.cg.y);
        state.bus.set_double("inertia/cg-z-in", mass.cg.z);
        state.bus.set_double("inertia/J-xx-slugft2", mass.j[(0, 0)]);
        state.bus.set_double("inertia/J-yy-slugft2", mass.j[(1, 1)]);
        state.bus.set_double("inertia/J-zz-slugft2", mass.j[(2, 2)]);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
