//! Rendering configuration and floating point comparison helpers

use serde::{Deserialize, Serialize};

/// Tolerance used for floating point comparisons in the geodesy and line algebra code
///
/// Changing the defaults shifts rounding of parametric ranges and degenerate segment detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Maximum absolute difference for two values to be considered equal.
    /// Default: `f64::EPSILON`
    pub comparison: f64,
    /// Factor used by [`Tolerance::round`] to drop floating point noise.
    /// Default: 1e12
    pub round_decimal_factor: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            comparison: f64::EPSILON,
            round_decimal_factor: 1e12,
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Tolerance {
    /// Create a tolerance with a custom comparison threshold and the default rounding factor
    pub fn with_comparison(comparison: f64) -> Self {
        Self {
            comparison,
            ..Self::default()
        }
    }

    /// `a == b` within tolerance
    #[inline]
    pub fn is_equivalent(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.comparison
    }

    /// `a <= b` within tolerance
    #[inline]
    pub fn is_less_or_equal(&self, a: f64, b: f64) -> bool {
        self.is_equivalent(a, b) || a < b
    }

    /// `a >= b` within tolerance
    #[inline]
    pub fn is_greater_or_equal(&self, a: f64, b: f64) -> bool {
        self.is_equivalent(a, b) || a > b
    }

    /// `a < b` within tolerance
    #[inline]
    pub fn is_less(&self, a: f64, b: f64) -> bool {
        !self.is_equivalent(a, b) && a < b
    }

    /// `a > b` within tolerance
    #[inline]
    pub fn is_greater(&self, a: f64, b: f64) -> bool {
        !self.is_equivalent(a, b) && a > b
    }

    /// Round to the configured number of decimals
    #[inline]
    pub fn round(&self, n: f64) -> f64 {
        (n * self.round_decimal_factor).round() / self.round_decimal_factor
    }
}

/// Options for links drawn with direction arrows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowOptions {
    /// Radius of the start point marker
    pub point_radius: f64,
    /// Target distance between arrows in meters (adjusted to divide the line evenly)
    pub spacing: f64,
    /// Arrow head length in meters
    pub height: f64,
    /// Arrow head width in meters
    pub width: f64,
}

impl Default for ArrowOptions {
    fn default() -> Self {
        Self {
            point_radius: 0.8,
            spacing: 50.0,
            height: 2.0,
            width: 1.0,
        }
    }
}

/// Configuration for the layer renderers
///
/// Every field has a default, so a partial JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Tolerance used by most layers
    pub tolerance: Tolerance,
    /// Tolerance used by the routing attributes layer (default comparison 1e-12)
    pub routing_tolerance: Tolerance,
    /// Offset in meters of infrastructure separation polygons from their link
    pub infrastructure_separation_shift_m: f64,
    /// Arrow options for links carrying routing attributions
    pub link_arrows: ArrowOptions,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            routing_tolerance: Tolerance::with_comparison(1e-12),
            infrastructure_separation_shift_m: 2.0,
            link_arrows: ArrowOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance() {
        let tolerance = Tolerance::default();
        assert_eq!(tolerance.comparison, f64::EPSILON);
        assert_eq!(tolerance.round_decimal_factor, 1e12);
    }

    #[test]
    fn test_comparisons() {
        let tolerance = Tolerance::with_comparison(1e-6);
        assert!(tolerance.is_equivalent(1.0, 1.0 + 1e-7));
        assert!(!tolerance.is_equivalent(1.0, 1.0 + 1e-5));
        assert!(tolerance.is_less_or_equal(1.0 + 1e-7, 1.0));
        assert!(tolerance.is_greater_or_equal(1.0 - 1e-7, 1.0));
        assert!(!tolerance.is_less(1.0 - 1e-7, 1.0));
        assert!(tolerance.is_less(0.5, 1.0));
        assert!(!tolerance.is_greater(1.0 + 1e-7, 1.0));
        assert!(tolerance.is_greater(2.0, 1.0));
    }

    #[test]
    fn test_round_drops_noise() {
        let tolerance = Tolerance::default();
        assert_eq!(tolerance.round(1.0 - 0.7), 0.3);
        assert_eq!(tolerance.round(0.1 + 0.2), 0.3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "infrastructure_separation_shift_m": 3.5 }"#).unwrap();
        assert_eq!(config.infrastructure_separation_shift_m, 3.5);
        assert_eq!(config.tolerance, Tolerance::default());
        assert_eq!(config.routing_tolerance.comparison, 1e-12);
        assert_eq!(config.link_arrows, ArrowOptions::default());
    }
}
