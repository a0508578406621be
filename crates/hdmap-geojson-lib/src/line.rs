//! Line algebra on decoded line strings
//!
//! Length, along, cut and shift operate on [`LineString2d`] with spherical geodesy. Lines with
//! fewer than two points are degenerate: measurements return 0 or nothing and transformations
//! return empty results instead of failing.

use crate::geodesy::Geodesy;
use crate::geometry::{LineString2d, Point2d};
use crate::range::ParametricRange;

/// Side of a line, relative to the direction given by the order of its points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Bearing offset in degrees perpendicular to the line
    #[inline]
    fn bearing_offset(&self) -> f64 {
        match self {
            Direction::Left => -90.0,
            Direction::Right => 90.0,
        }
    }
}

/// A piece of a cut line
#[derive(Debug, Clone, PartialEq)]
pub struct CutSegment {
    /// Whether the piece lies inside one of the cutting ranges
    pub in_range: bool,
    pub line: LineString2d,
}

/// Pieces of a line after [`LineAlgebra::cut`], in line order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutResult {
    segments: Vec<CutSegment>,
}

impl CutResult {
    /// All pieces in line order
    #[inline]
    pub fn segments(&self) -> &[CutSegment] {
        &self.segments
    }

    /// Pieces inside the cutting ranges
    pub fn in_range(&self) -> impl Iterator<Item = &LineString2d> {
        self.segments.iter().filter(|s| s.in_range).map(|s| &s.line)
    }

    /// Pieces outside the cutting ranges
    pub fn out_range(&self) -> impl Iterator<Item = &LineString2d> {
        self.segments.iter().filter(|s| !s.in_range).map(|s| &s.line)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Middle of a sub-range of a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentMiddle {
    pub middle_point: Point2d,
    /// Straight distance between the sub-range end points in meters
    pub segment_length: f64,
}

/// Boundary between cutting ranges, as a fraction of the line length
#[derive(Debug, Clone, Copy)]
struct RangePoint {
    value: f64,
    in_range: bool,
}

/// Flatten ranges into boundary points, adding `min` and `max` when the ranges do not reach them
///
/// e.g. `[0.1, 0.5]` with `min = 0` and `max = 1` gives `0 (out), 0.1 (in), 0.5 (out), 1 (out)`
fn flat_ranges(ranges: &[ParametricRange], min: f64, max: f64) -> Vec<RangePoint> {
    let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
        return vec![
            RangePoint { value: min, in_range: false },
            RangePoint { value: max, in_range: false },
        ];
    };

    let mut values = Vec::with_capacity(ranges.len() * 2 + 2);
    if min < first.start {
        values.push(RangePoint { value: min, in_range: false });
    }
    for range in ranges {
        values.push(RangePoint { value: range.start, in_range: true });
        values.push(RangePoint { value: range.end, in_range: false });
    }
    if last.end < max {
        values.push(RangePoint { value: max, in_range: false });
    }
    values
}

/// Vertices turning less than this (sine of the turn angle) are shifted perpendicularly, the
/// intersection of nearly parallel rays being numerically unstable
const STRAIGHT_TURN_SIN: f64 = 1e-6;

/// Line string measurements and transformations
#[derive(Debug, Clone, Copy, Default)]
pub struct LineAlgebra {
    geodesy: Geodesy,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl LineAlgebra {
    pub fn new(geodesy: Geodesy) -> Self {
        Self { geodesy }
    }

    #[inline]
    pub fn geodesy(&self) -> &Geodesy {
        &self.geodesy
    }

    /// Sum of segment lengths in meters
    pub fn length(&self, line: &LineString2d) -> f64 {
        line.points
            .windows(2)
            .map(|w| self.geodesy.distance(&w[0], &w[1]))
            .sum()
    }

    /// Bearing of each segment in degrees
    pub fn bearings(&self, line: &LineString2d) -> Vec<f64> {
        line.points
            .windows(2)
            .map(|w| self.geodesy.bearing(&w[0], &w[1]))
            .collect()
    }

    /// Point `distance` meters along the line
    ///
    /// # Returns
    /// The last point when `distance` exceeds the line length, `None` for an empty line.
    pub fn along(&self, line: &LineString2d, distance: f64) -> Option<Point2d> {
        let mut current_length = 0.0;
        for w in line.points.windows(2) {
            let d = self.geodesy.distance(&w[0], &w[1]);
            let remaining = distance - current_length;
            if remaining < d {
                return Some(self.geodesy.along(&w[0], &w[1], remaining));
            }
            current_length += d;
        }
        line.points.last().copied()
    }

    /// Cut a line at the boundaries of the given ranges
    ///
    /// # Arguments
    /// * `line` - Line to cut
    /// * `ranges` - Sorted, non-overlapping ranges (see [`ParametricRange::merge_all`])
    /// * `length` - Total length of `line` in meters
    ///
    /// # Returns
    /// The pieces in line order, each tagged with whether it lies inside a range. Consecutive
    /// pieces share their boundary point, which is the vertex itself when a boundary falls on one,
    /// so after dropping shared points every original vertex appears exactly once.
    pub fn cut(&self, line: &LineString2d, ranges: &[ParametricRange], length: f64) -> CutResult {
        #[cfg(feature = "profiling")]
        profiling::scope!("cut");

        let points = &line.points;
        if line.is_degenerate() {
            return CutResult::default();
        }
        let range_points = flat_ranges(ranges, 0.0, 1.0);
        let tolerance = self.geodesy.tolerance();

        let mut segments = Vec::new();
        let mut point_index = 0;
        let mut start = points[0];
        let mut range_index = 0;
        let mut current_length = 0.0;
        let mut target_length = range_points[1].value * length;
        let mut segment = vec![start];

        while point_index < points.len() - 1 && range_index < range_points.len() - 1 {
            let end = points[point_index + 1];
            let in_range = range_points[range_index].in_range;
            if range_index < range_points.len() - 2 {
                let d = self.geodesy.distance(&start, &end);
                let remaining = target_length - current_length;
                let on_vertex = tolerance.is_equivalent(remaining, d);
                if remaining <= d || on_vertex {
                    if on_vertex {
                        // Boundary on a vertex: take the vertex itself so it is not repeated
                        segment.push(end);
                        start = end;
                        current_length += d;
                        point_index += 1;
                    } else {
                        let target_point = self.geodesy.along(&start, &end, remaining);
                        segment.push(target_point);
                        start = target_point;
                        current_length += remaining;
                    }
                    segments.push(CutSegment {
                        in_range,
                        line: LineString2d::new(std::mem::replace(&mut segment, vec![start])),
                    });

                    range_index += 1;
                    target_length = range_points[range_index + 1].value * length;
                } else {
                    segment.push(end);
                    current_length += d;
                    point_index += 1;
                    start = end;
                }
            } else {
                // The last range takes every remaining vertex
                segment.push(end);
                point_index += 1;
                start = end;
                if point_index == points.len() - 1 {
                    segments.push(CutSegment {
                        in_range,
                        line: LineString2d::new(std::mem::take(&mut segment)),
                    });
                    range_index += 1;
                }
            }
        }

        // Vertices left over when the ranges end short of the line length
        if segment.len() > 1 {
            let in_range = range_points[range_index.min(range_points.len() - 1)].in_range;
            tracing::trace!("Flushing trailing cut segment with {} points", segment.len());
            segments.push(CutSegment {
                in_range,
                line: LineString2d::new(segment),
            });
        }

        CutResult { segments }
    }

    /// Offset a line perpendicular to its direction
    ///
    /// # Arguments
    /// * `line` - Line to shift
    /// * `direction` - Side to shift towards
    /// * `distance` - Offset in meters
    /// * `bearings` - Precomputed [`LineAlgebra::bearings`] of `line`, computed when absent
    ///
    /// # Returns
    /// A line with the same number of points. Interior points are placed where the two shifted
    /// neighbouring segments meet. Degenerate lines, and lines with a zero-length segment, give an
    /// empty line.
    pub fn shift(
        &self,
        line: &LineString2d,
        direction: Direction,
        distance: f64,
        bearings: Option<&[f64]>,
    ) -> LineString2d {
        let points = &line.points;
        if line.is_degenerate() {
            return LineString2d::default();
        }
        let tolerance = self.geodesy.tolerance();
        if let Some(index) = points
            .windows(2)
            .position(|w| tolerance.is_less_or_equal(self.geodesy.distance(&w[0], &w[1]), 0.0))
        {
            tracing::trace!("Not shifting a line with a zero-length segment at {index}");
            return LineString2d::default();
        }
        let computed;
        let bearings = match bearings {
            Some(bearings) if bearings.len() + 1 == points.len() => bearings,
            given => {
                if let Some(given) = given {
                    tracing::debug!(
                        "Ignoring {} bearings for a line of {} points, recomputing",
                        given.len(),
                        points.len()
                    );
                }
                computed = self.bearings(line);
                computed.as_slice()
            }
        };
        let offset = direction.bearing_offset();
        let geo = &self.geodesy;

        let mut shifted = Vec::with_capacity(points.len());
        shifted.push(geo.destination_point(&points[0], bearings[0] + offset, distance));

        for i in 1..points.len() - 1 {
            let start_bearing = bearings[i - 1];
            let end_bearing = bearings[i];
            let start_shifted = geo.destination_point(&points[i - 1], start_bearing + offset, distance);
            let end_shifted = geo.destination_point(&points[i + 1], end_bearing + offset, distance);
            let straight = (end_bearing - start_bearing).to_radians().sin().abs() < STRAIGHT_TURN_SIN;
            let middle = if straight {
                None
            } else {
                geo.intersection(&start_shifted, start_bearing, &end_shifted, end_bearing + 180.0)
            }
            .unwrap_or_else(|| geo.destination_point(&points[i], start_bearing + offset, distance));
            shifted.push(middle);
        }

        let last_bearing = bearings[bearings.len() - 1];
        shifted.push(geo.destination_point(&points[points.len() - 1], last_bearing + offset, distance));

        LineString2d::new(shifted)
    }

    /// Middle point of the part of the line covered by `range`
    ///
    /// # Returns
    /// `None` for an empty line
    pub fn find_segment_middle_point(
        &self,
        line: &LineString2d,
        range: &ParametricRange,
        length: f64,
    ) -> Option<SegmentMiddle> {
        let segment_start = self.along(line, length * range.start)?;
        let segment_end = self.along(line, length * range.end)?;
        let segment_length = self.geodesy.distance(&segment_start, &segment_end);
        let middle_point = self.geodesy.along(&segment_start, &segment_end, segment_length / 2.0);
        Some(SegmentMiddle {
            middle_point,
            segment_length,
        })
    }
}
