use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::utils::constants::{EARTH_SEMIMAJOR, EARTH_SEMIMINOR};

/// Vehicle location on the rotating oblate Earth.
///
/// Stored as the ECEF Cartesian position in feet. Longitude, geocentric
/// latitude and radius are derived views; geodetic latitude and altitude are
/// computed against the WGS-84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    ecef: Vector3<f64>,
}

impl Location {
    pub fn new(ecef: Vector3<f64>) -> Self {
        Self { ecef }
    }

    pub fn from_lon_lat_radius(lon: f64, lat: f64, radius: f64) -> Self {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();
        Self {
            ecef: Vector3::new(
                radius * cos_lat * cos_lon,
                radius * cos_lat * sin_lon,
                radius * sin_lat,
            ),
        }
    }

    /// Build a location from geodetic latitude and altitude above the
    /// WGS-84 ellipsoid.
    pub fn from_geodetic(lon: f64, geod_lat: f64, alt: f64) -> Self {
        let a = EARTH_SEMIMAJOR;
        let b = EARTH_SEMIMINOR;
        let e2 = 1.0 - (b * b) / (a * a);
        let (sin_lat, cos_lat) = geod_lat.sin_cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let (sin_lon, cos_lon) = lon.sin_cos();
        Self {
            ecef: Vector3::new(
                (n + alt) * cos_lat * cos_lon,
                (n + alt) * cos_lat * sin_lon,
                (n * (1.0 - e2) + alt) * sin_lat,
            ),
        }
    }

    pub fn ecef(&self) -> Vector3<f64> {
        self.ecef
    }

    pub fn longitude(&self) -> f64 {
        self.ecef.y.atan2(self.ecef.x)
    }

    /// Geocentric latitude.
    pub fn latitude(&self) -> f64 {
        let p = (self.ecef.x * self.ecef.x + self.ecef.y * self.ecef.y).sqrt();
        self.ecef.z.atan2(p)
    }

    pub fn tan_latitude(&self) -> f64 {
        let p = (self.ecef.x * self.ecef.x + self.ecef.y * self.ecef.y).sqrt();
        if p == 0.0 {
            0.0
        } else {
            self.ecef.z / p
        }
    }

    pub fn radius(&self) -> f64 {
        self.ecef.norm()
    }

    /// Geodetic latitude and altitude above the ellipsoid, by Bowring's
    /// closed-form approximation.
    pub fn geodetic(&self) -> (f64, f64) {
        let a = EARTH_SEMIMAJOR;
        let b = EARTH_SEMIMINOR;
        let e2 = 1.0 - (b * b) / (a * a);
        let ep2 = (a * a) / (b * b) - 1.0;

        let z = self.ecef.z;
        let p = (self.ecef.x * self.ecef.x + self.ecef.y * self.ecef.y).sqrt();
        let theta = (z * a).atan2(p * b);
        let (sin_t, cos_t) = theta.sin_cos();
        let lat = (z + ep2 * b * sin_t.powi(3)).atan2(p - e2 * a * cos_t.powi(3));

        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt = if cos_lat.abs() > 1e-8 {
            p / cos_lat - n
        } else {
            z / sin_lat - n * (1.0 - e2)
        };
        (lat, alt)
    }

    /// ECEF-to-local (NED) rotation at this longitude/latitude.
    pub fn tec2l(&self) -> Matrix3<f64> {
        let (sin_lat, cos_lat) = self.latitude().sin_cos();
        let (sin_lon, cos_lon) = self.longitude().sin_cos();
        Matrix3::new(
            -sin_lat * cos_lon,
            -sin_lat * sin_lon,
            cos_lat,
            -sin_lon,
            cos_lon,
            0.0,
            -cos_lat * cos_lon,
            -cos_lat * sin_lon,
            -sin_lat,
        )
    }

    /// Local (NED) to ECEF rotation.
    pub fn tl2ec(&self) -> Matrix3<f64> {
        self.tec2l().transpose()
    }

    /// Offset this location by a vector expressed in the local NED frame.
    pub fn local_to_location(&self, ned: Vector3<f64>) -> Location {
        Location {
            ecef: self.ecef + self.tl2ec() * ned,
        }
    }

    /// Translate in ECEF, used by the integrators and the CG nudge.
    pub fn advance(&mut self, delta_ecef: Vector3<f64>) {
        self.ecef += delta_ecef;
    }
}

/// ECI-to-ECEF rotation for the given Earth position angle.
pub fn ti2ec(earth_position_angle: f64) -> Matrix3<f64> {
    let (sin_a, cos_a) = earth_position_angle.sin_cos();
    Matrix3::new(cos_a, sin_a, 0.0, -sin_a, cos_a, 0.0, 0.0, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_lon_lat_radius_round_trip() {
        let loc = Location::from_lon_lat_radius(0.3, -0.7, 20_930_000.0);
        assert_relative_eq!(loc.longitude(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(loc.latitude(), -0.7, epsilon = 1e-12);
        assert_relative_eq!(loc.radius(), 20_930_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_geodetic_round_trip() {
        for &(lon, lat, alt) in &[
            (0.0, 0.0, 0.0),
            (0.5, 0.8, 10_000.0),
            (-2.1, -1.2, 35_000.0),
            (3.0, 1.5, 250.0),
        ] {
            let loc = Location::from_geodetic(lon, lat, alt);
            let (lat_out, alt_out) = loc.geodetic();
            assert_relative_eq!(lat_out, lat, epsilon = 1e-6);
            assert_relative_eq!(alt_out, alt, epsilon = 1e-3);
            assert_relative_eq!(loc.longitude(), lon, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_geodetic_equals_geocentric_at_equator() {
        let loc = Location::from_lon_lat_radius(0.0, 0.0, EARTH_SEMIMAJOR);
        let (geod_lat, alt) = loc.geodetic();
        assert_relative_eq!(geod_lat, 0.0, epsilon = 1e-12);
        assert_relative_eq!(alt, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_tec2l_is_proper_rotation() {
        let loc = Location::from_lon_lat_radius(1.0, 0.6, 20_925_650.0);
        let t = loc.tec2l();
        let should_be_identity = t * t.transpose();
        assert_relative_eq!(should_be_identity, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(t.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_local_down_points_to_earth_center() {
        let loc = Location::from_lon_lat_radius(0.4, 0.9, 20_925_650.0);
        let down_ecef = loc.tl2ec() * Vector3::new(0.0, 0.0, 1.0);
        let to_center = -loc.ecef().normalize();
        assert_relative_eq!(down_ecef, to_center, epsilon = 1e-12);
    }

    #[test]
    fn test_ti2ec_rotates_about_z() {
        let t = ti2ec(PI / 2.0);
        let x_eci = Vector3::new(1.0, 0.0, 0.0);
        let x_ecef = t * x_eci;
        assert_relative_eq!(x_ecef, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_local_to_location_moves_north() {
        let loc = Location::from_lon_lat_radius(0.0, 0.0, EARTH_SEMIMAJOR);
        let moved = loc.local_to_location(Vector3::new(10_000.0, 0.0, 0.0));
        assert!(moved.latitude() > loc.latitude());
        assert_relative_eq!(moved.longitude(), 0.0, epsilon = 1e-9);
    }
}
