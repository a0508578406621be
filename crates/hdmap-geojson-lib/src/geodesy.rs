//! Spherical-earth geodesy
//!
//! All computations assume a sphere of radius [`EARTH_RADIUS_M`]. Angles are taken and returned
//! in degrees, distances in meters.

use crate::config::Tolerance;
use crate::geometry::Point2d;
use std::f64::consts::PI;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6371e3;

/// Precomputed constant: 2π
const TWO_PI: f64 = 2.0 * PI;

/// Distance, bearing and projection math on a spherical earth
#[derive(Debug, Clone, Copy, Default)]
pub struct Geodesy {
    tolerance: Tolerance,
}

/// Normalize a longitude in degrees to [-180, 180)
#[inline]
fn normalize_longitude(longitude: f64) -> f64 {
    ((longitude + 540.0) % 360.0) - 180.0
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Geodesy {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    #[inline]
    pub fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    /// Great-circle distance in meters (haversine formula)
    #[inline]
    pub fn distance(&self, p1: &Point2d, p2: &Point2d) -> f64 {
        let phi1 = p1.latitude.to_radians();
        let phi2 = p2.latitude.to_radians();
        let delta_phi = (p2.latitude - p1.latitude).to_radians();
        let delta_lambda = (p2.longitude - p1.longitude).to_radians();

        let a = (delta_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// Initial bearing from `p1` towards `p2` in degrees within [0, 360)
    #[inline]
    pub fn bearing(&self, p1: &Point2d, p2: &Point2d) -> f64 {
        let phi1 = p1.latitude.to_radians();
        let phi2 = p2.latitude.to_radians();
        let delta_lambda = (p2.longitude - p1.longitude).to_radians();
        let y = delta_lambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }

    /// Point reached from `point` after travelling `distance` meters on `bearing` degrees
    pub fn destination_point(&self, point: &Point2d, bearing: f64, distance: f64) -> Point2d {
        let phi = point.latitude.to_radians();
        let lambda = point.longitude.to_radians();
        let theta = bearing.to_radians();
        let delta = distance / EARTH_RADIUS_M;

        let phi2 = (phi.sin() * delta.cos() + phi.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda
            + (theta.sin() * delta.sin() * phi.cos()).atan2(delta.cos() - phi.sin() * phi2.sin());
        Point2d::new(phi2.to_degrees(), normalize_longitude(lambda2.to_degrees()))
    }

    /// Point `target` meters from `p1` on the great circle towards `p2`
    ///
    /// # Returns
    /// `p1` when the points coincide or `target <= 0`, `p2` when `target` reaches or exceeds the
    /// distance between them, an interpolated point otherwise.
    pub fn along(&self, p1: &Point2d, p2: &Point2d, target: f64) -> Point2d {
        let length = self.distance(p1, p2);
        if self.tolerance.is_equivalent(length, 0.0) || self.tolerance.is_less_or_equal(target, 0.0) {
            return Point2d::new(p1.latitude, p1.longitude);
        } else if self.tolerance.is_greater_or_equal(target, length) {
            return Point2d::new(p2.latitude, p2.longitude);
        }

        let (sin_phi1, cos_phi1) = p1.latitude.to_radians().sin_cos();
        let (sin_phi2, cos_phi2) = p2.latitude.to_radians().sin_cos();
        let (sin_lambda1, cos_lambda1) = p1.longitude.to_radians().sin_cos();
        let (sin_lambda2, cos_lambda2) = p2.longitude.to_radians().sin_cos();

        let f = target / length;
        let delta = length / EARTH_RADIUS_M;
        let sin_delta = delta.sin();
        let a = ((1.0 - f) * delta).sin() / sin_delta;
        let b = (f * delta).sin() / sin_delta;
        let x = a * cos_phi1 * cos_lambda1 + b * cos_phi2 * cos_lambda2;
        let y = a * cos_phi1 * sin_lambda1 + b * cos_phi2 * sin_lambda2;
        let z = a * sin_phi1 + b * sin_phi2;

        let phi = z.atan2((x * x + y * y).sqrt());
        let lambda = y.atan2(x);
        Point2d::new(phi.to_degrees(), lambda.to_degrees())
    }

    /// Intersection of two great-circle paths given by a start point and a bearing each
    ///
    /// # Returns
    /// `None` when the start points coincide, when both paths run along the line joining them
    /// (infinite solutions), or when the intersection is ambiguous.
    pub fn intersection(&self, p1: &Point2d, bearing1: f64, p2: &Point2d, bearing2: f64) -> Option<Point2d> {
        let phi1 = p1.latitude.to_radians();
        let phi2 = p2.latitude.to_radians();
        let lambda1 = p1.longitude.to_radians();
        let lambda2 = p2.longitude.to_radians();
        let theta13 = bearing1.to_radians();
        let theta23 = bearing2.to_radians();
        let delta_phi = phi2 - phi1;
        let delta_lambda = lambda2 - lambda1;

        let d12 = 2.0
            * ((delta_phi / 2.0).sin().powi(2)
                + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2))
            .sqrt()
            .asin();
        if self.tolerance.is_equivalent(d12, 0.0) {
            return None;
        }

        // Rounding can push the acos argument slightly past 1
        let theta_a = ((phi2.sin() - phi1.sin() * d12.cos()) / (d12.sin() * phi1.cos())).acos();
        let theta_a = if theta_a.is_nan() { 0.0 } else { theta_a };
        let theta_b = ((phi1.sin() - phi2.sin() * d12.cos()) / (d12.sin() * phi2.cos())).acos();
        let theta_b = if theta_b.is_nan() { 0.0 } else { theta_b };

        let (theta12, theta21) = if delta_lambda.sin() > 0.0 {
            (theta_a, TWO_PI - theta_b)
        } else {
            (TWO_PI - theta_a, theta_b)
        };

        let (alpha1_sin, alpha1_cos) = (theta13 - theta12).sin_cos();
        let (alpha2_sin, alpha2_cos) = (theta21 - theta23).sin_cos();

        if self.tolerance.is_equivalent(alpha1_sin, 0.0) && self.tolerance.is_equivalent(alpha2_sin, 0.0) {
            return None;
        }
        if alpha1_sin * alpha2_sin < 0.0 {
            return None;
        }

        let alpha3 = (-alpha1_cos * alpha2_cos + alpha1_sin * alpha2_sin * d12.cos()).acos();
        let d13 = (d12.sin() * alpha1_sin * alpha2_sin).atan2(alpha2_cos + alpha1_cos * alpha3.cos());
        let phi3 = (phi1.sin() * d13.cos() + phi1.cos() * d13.sin() * theta13.cos()).asin();
        let delta_lambda13 =
            (theta13.sin() * d13.sin() * phi1.cos()).atan2(d13.cos() - phi1.sin() * phi3.sin());
        let lambda3 = lambda1 + delta_lambda13;

        Some(Point2d::new(phi3.to_degrees(), normalize_longitude(lambda3.to_degrees())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn create_test_geodesy() -> Geodesy {
        Geodesy::default()
    }

    #[test]
    fn test_distance_one_degree_at_equator() {
        let geo = create_test_geodesy();
        let d = geo.distance(&Point2d::new(0.0, 0.0), &Point2d::new(0.0, 1.0));
        let expected = EARTH_RADIUS_M * PI / 180.0;
        assert!((d - expected).abs() < 1e-6);
        assert_eq!(geo.distance(&Point2d::new(10.0, 10.0), &Point2d::new(10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let geo = create_test_geodesy();
        let origin = Point2d::new(0.0, 0.0);
        assert!((geo.bearing(&origin, &Point2d::new(1.0, 0.0)) - 0.0).abs() < EPSILON);
        assert!((geo.bearing(&origin, &Point2d::new(0.0, 1.0)) - 90.0).abs() < EPSILON);
        assert!((geo.bearing(&origin, &Point2d::new(-1.0, 0.0)) - 180.0).abs() < EPSILON);
        assert!((geo.bearing(&origin, &Point2d::new(0.0, -1.0)) - 270.0).abs() < EPSILON);
    }

    #[test]
    fn test_destination_point_normalizes_longitude() {
        let geo = create_test_geodesy();
        let one_degree = EARTH_RADIUS_M * PI / 180.0;
        let p = geo.destination_point(&Point2d::new(0.0, 179.5), 90.0, one_degree);
        assert!((p.longitude + 179.5).abs() < 1e-9);
        assert!(p.latitude.abs() < 1e-9);
    }

    #[test]
    fn test_destination_and_distance_agree() {
        let geo = create_test_geodesy();
        let start = Point2d::new(52.52, 13.405);
        let end = geo.destination_point(&start, 37.0, 1234.5);
        assert!((geo.distance(&start, &end) - 1234.5).abs() < 1e-6);
        assert!((geo.bearing(&start, &end) - 37.0).abs() < 1e-6);
    }

    #[test]
    fn test_along_clamps_to_endpoints() {
        let geo = create_test_geodesy();
        let p1 = Point2d::new(0.0, 0.0);
        let p2 = Point2d::new(0.0, 1.0);
        assert_eq!(geo.along(&p1, &p2, 0.0), p1);
        assert_eq!(geo.along(&p1, &p2, -5.0), p1);
        assert_eq!(geo.along(&p1, &p2, 1e9), p2);
        // Coincident points
        assert_eq!(geo.along(&p2, &p2, 10.0), p2);
    }

    #[test]
    fn test_along_midpoint() {
        let geo = create_test_geodesy();
        let p1 = Point2d::new(0.0, 0.0);
        let p2 = Point2d::new(0.0, 1.0);
        let length = geo.distance(&p1, &p2);
        let middle = geo.along(&p1, &p2, length / 2.0);
        assert!((middle.longitude - 0.5).abs() < EPSILON);
        assert!(middle.latitude.abs() < EPSILON);
    }

    #[test]
    fn test_intersection_of_crossing_paths() {
        let geo = create_test_geodesy();
        // Heading east from (0, 0) and heading north from (-1, 1) meet near (0, 1)
        let p = geo
            .intersection(&Point2d::new(0.0, 0.0), 90.0, &Point2d::new(-1.0, 1.0), 0.0)
            .unwrap();
        assert!(p.latitude.abs() < 1e-9);
        assert!((p.longitude - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_degenerate_cases() {
        let geo = create_test_geodesy();
        let p = Point2d::new(10.0, 10.0);
        assert!(geo.intersection(&p, 0.0, &p, 90.0).is_none());
        // Both paths along the line joining the start points
        let geo = Geodesy::new(Tolerance::with_comparison(1e-12));
        assert!(
            geo.intersection(&Point2d::new(0.0, 0.0), 90.0, &Point2d::new(0.0, 1.0), 270.0)
                .is_none()
        );
        // Diverging paths
        assert!(
            geo.intersection(&Point2d::new(0.0, 0.0), 0.0, &Point2d::new(0.0, 1.0), 180.0)
                .is_none()
        );
    }
}
