//! Coordinate decoding
//!
//! Tile geometry is stored as a chain of XOR deltas seeded by the tile center. Each absolute
//! fixed-point coordinate is then mapped to longitude/latitude by a [`CoordinateMapper`].

use crate::geometry::{LineString2d, LineString3d, Point2d, Point3d};
use crate::ids::{Coordinate2d, Elevation};
use crate::tiles::{LineString2dOffset, LineString3dOffset, Point3dOffset, TileCenter3d};
use std::sync::Arc;

/// Maps an absolute fixed-point 2D coordinate to `(longitude, latitude)` in degrees
pub trait CoordinateMapper: Send + Sync {
    fn to_lon_lat(&self, coordinate: u64) -> (f64, f64);
}

/// Morton (Z-order) coordinate mapping
///
/// Longitude occupies the even bits as a signed 32-bit value scaled by `360 / 2^32`.
/// Latitude occupies the odd bits as a signed 31-bit value scaled by `180 / 2^31`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MortonMapper;

/// Precomputed constant: 360 / 2^32
const LON_FACTOR: f64 = 360.0 / 4_294_967_296.0;

/// Precomputed constant: 180 / 2^31
const LAT_FACTOR: f64 = 180.0 / 2_147_483_648.0;

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MortonMapper {
    /// Encode degrees into a Morton code (inverse of [`CoordinateMapper::to_lon_lat`])
    pub fn encode(longitude: f64, latitude: f64) -> u64 {
        let x = (longitude / LON_FACTOR).round() as i64 as u32;
        let y = ((latitude / LAT_FACTOR).round() as i64 as u32) & 0x7FFF_FFFF;
        spread_bits(x) | (spread_bits(y) << 1)
    }
}

impl CoordinateMapper for MortonMapper {
    #[inline]
    fn to_lon_lat(&self, coordinate: u64) -> (f64, f64) {
        let x = compact_bits(coordinate) as i32;
        let y = compact_bits(coordinate >> 1) & 0x7FFF_FFFF;
        // Sign-extend the 31-bit latitude
        let y = ((y << 1) as i32) >> 1;
        (x as f64 * LON_FACTOR, y as f64 * LAT_FACTOR)
    }
}

/// Interleave zeros between the bits of `value`
#[inline(always)]
fn spread_bits(value: u32) -> u64 {
    let mut x = value as u64;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

/// Collect the even bits of `code`
#[inline(always)]
fn compact_bits(code: u64) -> u32 {
    let mut x = code & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x >> 16)) & 0x0000_0000_FFFF_FFFF;
    x as u32
}

/// Reconstructs absolute coordinates from XOR-delta sequences
#[derive(Clone)]
pub struct CoordinateDecoder {
    mapper: Arc<dyn CoordinateMapper>,
}

impl std::fmt::Debug for CoordinateDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateDecoder").finish_non_exhaustive()
    }
}

impl Default for CoordinateDecoder {
    fn default() -> Self {
        Self::new(Arc::new(MortonMapper))
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl CoordinateDecoder {
    /// Create a decoder backed by the given coordinate mapper
    pub fn new(mapper: Arc<dyn CoordinateMapper>) -> Self {
        Self { mapper }
    }

    /// Decode a delta sequence into absolute coordinates
    ///
    /// # Arguments
    /// * `anchor` - Tile center the first delta is applied to
    /// * `deltas` - XOR deltas, each relative to the previous absolute coordinate
    ///
    /// # Returns
    /// One absolute coordinate per delta. An empty sequence decodes to an empty output.
    pub fn decode_sequence(anchor: Coordinate2d, deltas: &[Coordinate2d]) -> Vec<u64> {
        let mut last = anchor.0;
        deltas
            .iter()
            .map(|delta| {
                last ^= delta.0;
                last
            })
            .collect()
    }

    /// Compute the delta sequence that decodes to `absolutes` from `anchor`
    pub fn encode_sequence(anchor: Coordinate2d, absolutes: &[u64]) -> Vec<Coordinate2d> {
        let mut last = anchor.0;
        absolutes
            .iter()
            .map(|&absolute| {
                let delta = Coordinate2d(last ^ absolute);
                last = absolute;
                delta
            })
            .collect()
    }

    /// Map an absolute coordinate to `(longitude, latitude)`
    #[inline]
    pub fn decode_coordinate_to_lon_lat(&self, coordinate: u64) -> (f64, f64) {
        self.mapper.to_lon_lat(coordinate)
    }

    /// Map an absolute coordinate to a point on the given z-level
    #[inline]
    pub fn point_2d(&self, coordinate: Coordinate2d, z_level: i32) -> Point2d {
        let (longitude, latitude) = self.decode_coordinate_to_lon_lat(coordinate.0);
        Point2d {
            latitude,
            longitude,
            z_level,
        }
    }

    /// Decode a 2D offset line string
    ///
    /// The z-level of point `i` is `z_level_indexes[i]`, or 0 when the list is shorter.
    pub fn line_string_2d(&self, offset: &LineString2dOffset, anchor: Coordinate2d) -> LineString2d {
        let absolutes = Self::decode_sequence(anchor, &offset.here_2d_coordinate_diffs);
        let points = absolutes
            .into_iter()
            .enumerate()
            .map(|(i, coordinate)| {
                let z_level = offset.z_level_indexes.get(i).copied().unwrap_or(0);
                self.point_2d(Coordinate2d(coordinate), z_level)
            })
            .collect();
        LineString2d::new(points)
    }

    /// Decode a 3D offset line string
    ///
    /// Elevations form their own XOR chain seeded by the anchor elevation. A missing elevation
    /// delta is treated as 0, which repeats the previous elevation.
    pub fn line_string_3d(&self, offset: &LineString3dOffset, anchor: &TileCenter3d) -> LineString3d {
        let absolutes = Self::decode_sequence(anchor.here_2d_coordinate, &offset.here_2d_coordinate_diffs);
        let mut last_elevation = anchor.cm_from_wgs84_ellipsoid.0;
        let points = absolutes
            .into_iter()
            .enumerate()
            .map(|(i, coordinate)| {
                let diff = offset
                    .cm_from_wgs84_ellipsoid_diffs
                    .get(i)
                    .copied()
                    .unwrap_or_default();
                last_elevation ^= diff.0;
                Point3d {
                    lat_lon: self.point_2d(Coordinate2d(coordinate), 0),
                    cm_from_wgs84: last_elevation,
                }
            })
            .collect();
        LineString3d { points }
    }

    /// Decode a single 3D point stored as an offset from the tile center
    pub fn point_3d(&self, offset: &Point3dOffset, anchor: &TileCenter3d) -> Point3d {
        let coordinate = anchor.here_2d_coordinate.0 ^ offset.here_2d_coordinate.unwrap_or_default().0;
        let elevation: Elevation = offset.cm_from_wgs84_ellipsoid.unwrap_or_default();
        Point3d {
            lat_lon: self.point_2d(Coordinate2d(coordinate), 0),
            cm_from_wgs84: anchor.cm_from_wgs84_ellipsoid.0 ^ elevation.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_offset(points: &[(f64, f64)], anchor: Coordinate2d) -> LineString2dOffset {
        let absolutes: Vec<u64> = points
            .iter()
            .map(|&(lon, lat)| MortonMapper::encode(lon, lat))
            .collect();
        LineString2dOffset {
            here_2d_coordinate_diffs: CoordinateDecoder::encode_sequence(anchor, &absolutes),
            z_level_indexes: Vec::new(),
        }
    }

    #[test]
    fn test_decode_sequence_running_xor() {
        let decoded = CoordinateDecoder::decode_sequence(
            Coordinate2d(0b1010),
            &[Coordinate2d(0b0001), Coordinate2d(0b0011)],
        );
        assert_eq!(decoded, vec![0b1011, 0b1000]);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(CoordinateDecoder::decode_sequence(Coordinate2d(123), &[]).is_empty());
        let line = CoordinateDecoder::default()
            .line_string_2d(&LineString2dOffset::default(), Coordinate2d(123));
        assert!(line.points.is_empty());
    }

    #[test]
    fn test_round_trip_law() {
        let anchor = Coordinate2d(0x1234_5678_9ABC_DEF0);
        let deltas = vec![Coordinate2d(7), Coordinate2d(0xFFFF), Coordinate2d(0), Coordinate2d(u64::MAX)];
        let absolutes = CoordinateDecoder::decode_sequence(anchor, &deltas);
        assert_eq!(CoordinateDecoder::encode_sequence(anchor, &absolutes), deltas);
        // Decoding is deterministic
        assert_eq!(CoordinateDecoder::decode_sequence(anchor, &deltas), absolutes);
    }

    #[test]
    fn test_morton_zero_is_origin() {
        assert_eq!(MortonMapper.to_lon_lat(0), (0.0, 0.0));
    }

    #[test]
    fn test_morton_round_trip() {
        for &(lon, lat) in &[(13.4050, 52.5200), (-122.4194, 37.7749), (151.2093, -33.8688), (-0.1278, 51.5074)] {
            let (decoded_lon, decoded_lat) = MortonMapper.to_lon_lat(MortonMapper::encode(lon, lat));
            assert!((decoded_lon - lon).abs() < 1e-6);
            assert!((decoded_lat - lat).abs() < 1e-6);
        }
    }

    #[test]
    fn test_line_string_2d_decodes_points_and_levels() {
        let anchor = Coordinate2d(MortonMapper::encode(13.0, 52.0));
        let mut offset = create_test_offset(&[(13.001, 52.001), (13.002, 52.0015)], anchor);
        offset.z_level_indexes = vec![2];

        let line = CoordinateDecoder::default().line_string_2d(&offset, anchor);
        assert_eq!(line.points.len(), 2);
        assert!((line.points[0].longitude - 13.001).abs() < 1e-6);
        assert!((line.points[1].latitude - 52.0015).abs() < 1e-6);
        assert_eq!(line.points[0].z_level, 2);
        assert_eq!(line.points[1].z_level, 0);
    }

    #[test]
    fn test_line_string_3d_missing_elevation_diffs() {
        let anchor = TileCenter3d {
            here_2d_coordinate: Coordinate2d(0),
            cm_from_wgs84_ellipsoid: Elevation(1000),
        };
        let offset = LineString3dOffset {
            here_2d_coordinate_diffs: vec![Coordinate2d(1), Coordinate2d(2), Coordinate2d(4)],
            cm_from_wgs84_ellipsoid_diffs: vec![Elevation(0b11)],
        };
        let line = CoordinateDecoder::default().line_string_3d(&offset, &anchor);
        let elevations: Vec<i64> = line.points.iter().map(|p| p.cm_from_wgs84).collect();
        assert_eq!(elevations, vec![1000 ^ 0b11; 3]);
    }

    #[test]
    fn test_point_3d_offsets_from_center() {
        let center = MortonMapper::encode(10.0, 45.0);
        let target = MortonMapper::encode(10.0005, 45.0005);
        let anchor = TileCenter3d {
            here_2d_coordinate: Coordinate2d(center),
            cm_from_wgs84_ellipsoid: Elevation(5000),
        };
        let offset = Point3dOffset {
            here_2d_coordinate: Some(Coordinate2d(center ^ target)),
            cm_from_wgs84_ellipsoid: None,
        };
        let point = CoordinateDecoder::default().point_3d(&offset, &anchor);
        assert!((point.lat_lon.longitude - 10.0005).abs() < 1e-6);
        assert!((point.lat_lon.latitude - 45.0005).abs() < 1e-6);
        assert_eq!(point.cm_from_wgs84, 5000);
    }

    #[test]
    fn test_custom_mapper() {
        struct Identity;
        impl CoordinateMapper for Identity {
            fn to_lon_lat(&self, coordinate: u64) -> (f64, f64) {
                (coordinate as f64, -(coordinate as f64))
            }
        }
        let decoder = CoordinateDecoder::new(Arc::new(Identity));
        let point = decoder.point_2d(Coordinate2d(5), 1);
        assert_eq!((point.longitude, point.latitude, point.z_level), (5.0, -5.0, 1));
    }
}
