//! Parametric ranges along a line, normalized to [0, 1]

use crate::config::Tolerance;
use serde::{Deserialize, Serialize};

/// A `[start, end]` sub-range of a line, as fractions of its length
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParametricRange {
    pub start: f64,
    pub end: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ParametricRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The range covering the whole line
    #[inline]
    pub fn full() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Build a range from offsets measured from each end of the line
    ///
    /// # Arguments
    /// * `from_start` - Offset of the range start from the line start (absent means 0)
    /// * `from_end` - Offset of the range end from the line end (absent means 0)
    /// * `tolerance` - Rounding used to drop floating point noise
    pub fn from_offsets(from_start: Option<f64>, from_end: Option<f64>, tolerance: &Tolerance) -> Self {
        Self {
            start: tolerance.round(from_start.unwrap_or(0.0)),
            end: tolerance.round(1.0 - from_end.unwrap_or(0.0)),
        }
    }

    /// Merge overlapping (or touching) ranges
    ///
    /// # Returns
    /// Ranges sorted by start where no two overlap. Inputs of zero or one range are returned as is.
    pub fn merge_all(mut ranges: Vec<ParametricRange>) -> Vec<ParametricRange> {
        if ranges.len() <= 1 {
            return ranges;
        }
        ranges.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut merged = Vec::with_capacity(ranges.len());
        let mut current = ranges[0];
        for range in &ranges[1..] {
            if range.start > current.end {
                merged.push(current);
                current = *range;
            }
            if range.end > current.end {
                current.end = range.end;
            }
        }
        merged.push(current);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_offsets_defaults() {
        let tolerance = Tolerance::default();
        assert_eq!(ParametricRange::from_offsets(None, None, &tolerance), ParametricRange::full());
        let range = ParametricRange::from_offsets(Some(0.25), Some(0.3), &tolerance);
        assert_eq!(range, ParametricRange::new(0.25, 0.7));
    }

    #[test]
    fn test_merge_overlapping() {
        let merged = ParametricRange::merge_all(vec![
            ParametricRange::new(0.6, 0.8),
            ParametricRange::new(0.0, 0.3),
            ParametricRange::new(0.2, 0.5),
            ParametricRange::new(0.7, 0.75),
        ]);
        assert_eq!(merged, vec![ParametricRange::new(0.0, 0.5), ParametricRange::new(0.6, 0.8)]);
    }

    #[test]
    fn test_merge_touching_ranges() {
        let merged =
            ParametricRange::merge_all(vec![ParametricRange::new(0.5, 1.0), ParametricRange::new(0.0, 0.5)]);
        assert_eq!(merged, vec![ParametricRange::full()]);
    }

    #[test]
    fn test_merge_trivial_inputs() {
        assert!(ParametricRange::merge_all(Vec::new()).is_empty());
        let single = vec![ParametricRange::new(0.1, 0.2)];
        assert_eq!(ParametricRange::merge_all(single.clone()), single);
    }
}
