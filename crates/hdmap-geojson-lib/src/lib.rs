//! HD Map GeoJSON Library - Geometry Toolkit and Layer Renderers for Decoded HD Map Tiles
//!
//! This library turns decoded HD map tiles into GeoJSON feature collections for map inspection.
//! Tiles store their geometry as XOR deltas against a fixed-point tile center, and several layers
//! reference entities that live in neighboring tiles, so rendering a single tile may require
//! fetching others.
//!
//! # Architecture
//!
//! - **[`CoordinateDecoder`]**: XOR-delta decoding and fixed-point to lon/lat mapping
//! - **[`Geodesy`]**: Spherical distance, bearing, projection and intersection math
//! - **[`LineAlgebra`]**: Length, along, cut by parametric ranges and perpendicular shift
//! - **[`FeatureBuilder`]**: GeoJSON feature construction in `[lon, lat]` order
//! - **[`resolver`]**: Cross-tile reference collection, fail-fast fetching and matching
//! - **[`layers`]**: Per-layer renderers behind a single [`layers::render`] entry point
//!
//! # Failure Model
//!
//! Degenerate geometry is skipped, fetch and input failures propagate as [`RenderError`] up to
//! [`layers::render`], which logs them and resolves to `None`.

pub mod catalog;
mod config;
mod coords;
mod feature;
mod geodesy;
mod geometry;
pub mod ids;
pub mod layers;
mod line;
mod range;
pub mod resolver;
pub mod tiles;

// Public API exports
pub use catalog::{CatalogDependency, CatalogRef, RenderContext};
pub use config::{ArrowOptions, RenderConfig, Tolerance};
pub use coords::{CoordinateDecoder, CoordinateMapper, MortonMapper};
pub use feature::{FeatureBuilder, GEOJSON_CONTENT_TYPE, RenderedTile, Style};
pub use geodesy::{EARTH_RADIUS_M, Geodesy};
pub use geometry::{LineString2d, LineString3d, Point2d, Point3d};
pub use ids::{EntityId, TileId};
pub use layers::{LayerKind, Toolkit};
pub use line::{CutResult, CutSegment, Direction, LineAlgebra, SegmentMiddle};
pub use range::ParametricRange;

/// Error types for tile rendering
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("Failed to fetch layer {layer} for partition {partition}: {reason}")]
    DependencyFetch {
        layer: String,
        partition: TileId,
        reason: String,
    },

    #[error("Catalog dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(RenderConfig) -> Toolkit = Toolkit::new;
        let _: fn() -> RenderConfig = RenderConfig::default;
        let _: fn() -> Tolerance = Tolerance::default;
    }

    #[test]
    fn test_error_messages() {
        let err = RenderError::DependencyFetch {
            layer: "localization-barrier".to_string(),
            partition: TileId(23618402),
            reason: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch layer localization-barrier for partition 23618402: not found"
        );
    }
}
