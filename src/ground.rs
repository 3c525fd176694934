use nalgebra::Vector3;

use crate::geodesy::Location;

/// Terrain answer for one query location.
#[derive(Debug, Clone, Copy)]
pub struct GroundContact {
    /// Contact point, ECEF [ft]
    pub contact: Location,
    /// Surface normal, ECEF
    pub normal: Vector3<f64>,
    /// Contact-point linear velocity, ECEF [ft/s]
    pub velocity: Vector3<f64>,
    /// Contact-point angular velocity, ECEF [rad/s]
    pub angular_velocity: Vector3<f64>,
    /// Height of the query point above the surface [ft]
    pub agl: f64,
}

/// Callback the core uses to ask the embedder about the terrain.
///
/// The radius hint bounds the neighborhood the embedder needs to consider:
/// the largest gear arm plus two timesteps of translation.
pub trait GroundCallback: Send + Sync {
    fn contact(&self, time: f64, location: &Location, radius_hint: f64) -> GroundContact;
}

/// Spherical terrain at a fixed geocentric radius. The default when the
/// embedder supplies nothing better.
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrain {
    terrain_radius: f64,
}

impl FlatTerrain {
    pub fn new(terrain_radius: f64) -> Self {
        Self { terrain_radius }
    }
}

impl GroundCallback for FlatTerrain {
    fn contact(&self, _time: f64, location: &Location, _radius_hint: f64) -> GroundContact {
        let radius = location.radius();
        let up = location.ecef() / radius;
        GroundContact {
            contact: Location::new(up * self.terrain_radius),
            normal: up,
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            agl: radius - self.terrain_radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::EARTH_RADIUS_REFERENCE;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_terrain_agl() {
        let terrain = FlatTerrain::new(EARTH_RADIUS_REFERENCE);
        let loc = Location::from_lon_lat_radius(0.2, 0.4, EARTH_RADIUS_REFERENCE + 150.0);
        let contact = terrain.contact(0.0, &loc, 10.0);

        assert_relative_eq!(contact.agl, 150.0, epsilon = 1e-6);
        assert_relative_eq!(contact.contact.radius(), EARTH_RADIUS_REFERENCE, epsilon = 1e-6);
        // Normal points away from the Earth center at the query point.
        assert_relative_eq!(
            contact.normal.dot(&loc.ecef().normalize()),
            1.0,
            epsilon = 1e-12
        );
    }
}
