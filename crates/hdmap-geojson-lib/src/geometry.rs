//! Decoded geographic primitives
//!
//! Points are stored latitude first, the way the map schema names them. Conversion to `geo`
//! coordinates (x = longitude, y = latitude) happens in one place, the `From` impls below, so
//! every GeoJSON output path flips the axes the same way.

use geo::Coord;

/// A WGS84 point in degrees with a z-level index
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point2d {
    pub latitude: f64,
    pub longitude: f64,
    pub z_level: i32,
}

/// A WGS84 point with elevation in centimeters from the ellipsoid
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point3d {
    pub lat_lon: Point2d,
    pub cm_from_wgs84: i64,
}

/// Ordered sequence of 2D points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineString2d {
    pub points: Vec<Point2d>,
}

/// Ordered sequence of 3D points
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineString3d {
    pub points: Vec<Point3d>,
}

impl Point2d {
    /// Create a point on z-level 0
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            z_level: 0,
        }
    }
}

impl From<&Point2d> for Coord<f64> {
    #[inline]
    fn from(point: &Point2d) -> Self {
        Coord {
            x: point.longitude,
            y: point.latitude,
        }
    }
}

impl From<Point2d> for geo::Point<f64> {
    #[inline]
    fn from(point: Point2d) -> Self {
        geo::Point(Coord::from(&point))
    }
}

impl LineString2d {
    pub fn new(points: Vec<Point2d>) -> Self {
        Self { points }
    }

    /// Lines with fewer than two points cannot be drawn
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    #[inline]
    pub fn first(&self) -> Option<&Point2d> {
        self.points.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&Point2d> {
        self.points.last()
    }

    /// Convert to a `geo` line string in lon/lat order
    pub fn to_geo(&self) -> geo::LineString<f64> {
        geo::LineString(self.points.iter().map(Coord::from).collect())
    }
}

impl LineString3d {
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    /// Drop the elevation component
    pub fn to_2d(&self) -> LineString2d {
        LineString2d::new(self.points.iter().map(|p| p.lat_lon).collect())
    }
}
