//! Layer renderers
//!
//! [`render`] is the single entry point: it dispatches on [`LayerKind`], runs the renderer with a
//! shared [`Toolkit`] and turns every failure into a logged `None`, so hosts only ever see a
//! rendered tile or nothing.

mod landmark;
mod lanes;
pub(crate) mod localization;
mod routing;
mod topology;

use crate::catalog::RenderContext;
use crate::config::RenderConfig;
use crate::coords::CoordinateDecoder;
use crate::feature::{FeatureBuilder, RenderedTile, Style};
use crate::geodesy::Geodesy;
use crate::geometry::LineString2d;
use crate::line::LineAlgebra;
use crate::{RenderError, Result};
use geojson::{Feature, JsonObject};
use std::fmt;
use std::str::FromStr;
use tracing::Instrument;

/// Tile layers with a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    TopologyGeometry,
    LaneTopology,
    LaneGeometryPolyline,
    LocalizationBarrier,
    LocalizationSign,
    LocalizationPole,
    LocalizationOverheadStructureFace,
    RoutingAttributes,
    LandmarkBarriers,
    LandmarkObstacles,
    LandmarkPoles,
    LandmarkSigns,
}

impl LayerKind {
    pub const ALL: [LayerKind; 12] = [
        LayerKind::TopologyGeometry,
        LayerKind::LaneTopology,
        LayerKind::LaneGeometryPolyline,
        LayerKind::LocalizationBarrier,
        LayerKind::LocalizationSign,
        LayerKind::LocalizationPole,
        LayerKind::LocalizationOverheadStructureFace,
        LayerKind::RoutingAttributes,
        LayerKind::LandmarkBarriers,
        LayerKind::LandmarkObstacles,
        LayerKind::LandmarkPoles,
        LayerKind::LandmarkSigns,
    ];

    /// Layer name as used in catalogs
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::TopologyGeometry => "topology-geometry",
            LayerKind::LaneTopology => "lane-topology",
            LayerKind::LaneGeometryPolyline => "lane-geometry-polyline",
            LayerKind::LocalizationBarrier => "localization-barrier",
            LayerKind::LocalizationSign => "localization-sign",
            LayerKind::LocalizationPole => "localization-pole",
            LayerKind::LocalizationOverheadStructureFace => "localization-overhead-structure-face",
            LayerKind::RoutingAttributes => "routing-attributes",
            LayerKind::LandmarkBarriers => "landmark-barriers",
            LayerKind::LandmarkObstacles => "landmark-obstacles",
            LayerKind::LandmarkPoles => "landmark-poles",
            LayerKind::LandmarkSigns => "landmark-signs",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayerKind {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| RenderError::MalformedInput(format!("unknown layer '{name}'")))
    }
}

/// Geometry capabilities shared by every renderer, built once per configuration
#[derive(Debug, Clone)]
pub struct Toolkit {
    pub decoder: CoordinateDecoder,
    pub geodesy: Geodesy,
    pub line: LineAlgebra,
    pub features: FeatureBuilder,
    /// Line algebra with the routing tolerance
    pub routing_line: LineAlgebra,
    pub routing_features: FeatureBuilder,
    pub config: RenderConfig,
}

impl Default for Toolkit {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl Toolkit {
    pub fn new(config: RenderConfig) -> Self {
        Self::with_decoder(config, CoordinateDecoder::default())
    }

    /// Create a toolkit with a custom coordinate decoder
    pub fn with_decoder(config: RenderConfig, decoder: CoordinateDecoder) -> Self {
        let geodesy = Geodesy::new(config.tolerance);
        let line = LineAlgebra::new(geodesy);
        let routing_line = LineAlgebra::new(Geodesy::new(config.routing_tolerance));
        Self {
            decoder,
            geodesy,
            line,
            features: FeatureBuilder::new(line),
            routing_line,
            routing_features: FeatureBuilder::new(routing_line),
            config,
        }
    }
}

/// Palette handed out in order, advancing before each use
#[derive(Debug, Clone)]
pub(crate) struct ColorRotation {
    colors: &'static [&'static str],
    index: usize,
}

impl ColorRotation {
    pub(crate) fn new(colors: &'static [&'static str]) -> Self {
        Self { colors, index: 0 }
    }

    pub(crate) fn next_color(&mut self) -> &'static str {
        self.index = (self.index + 1) % self.colors.len();
        self.colors[self.index]
    }
}

/// Start point, end point and line of a road link. Only the start point carries the tooltip.
pub(crate) fn link_features(
    features: &FeatureBuilder,
    line: &LineString2d,
    color: &str,
    width: f64,
    point_radius: f64,
    tooltip: &str,
) -> Vec<Feature> {
    let (Some(start), Some(end)) = (line.first(), line.last()) else {
        return Vec::new();
    };
    if line.is_degenerate() {
        return Vec::new();
    }
    let marker = Style::marker(color, color);
    let mut rendered = vec![
        features.point(start, point_radius, &marker, tooltip),
        features.point(end, point_radius, &marker, ""),
    ];
    rendered.extend(features.line_string(line, &Style::stroke(color, width), tooltip, None));
    rendered
}

/// Add properties to a built feature, replacing existing keys
pub(crate) fn with_properties(mut feature: Feature, extra: JsonObject) -> Feature {
    feature.properties.get_or_insert_with(JsonObject::new).extend(extra);
    feature
}

/// Name of a barrier type value
pub(crate) fn barrier_type_name(barrier_type: i32) -> &'static str {
    match barrier_type {
        1 => "JERSEY_BARRIER",
        2 => "GUARDRAIL",
        3 => "CURB",
        4 => "WALL",
        5 => "FENCE",
        6 => "TUNNEL_WALL",
        _ => "UNKNOWN",
    }
}

async fn render_layer<C: RenderContext>(
    toolkit: &Toolkit,
    kind: LayerKind,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    match kind {
        LayerKind::TopologyGeometry => topology::render(toolkit, decoded),
        LayerKind::LaneTopology => lanes::render_lane_topology(toolkit, decoded, context).await,
        LayerKind::LaneGeometryPolyline => lanes::render_lane_geometry_polyline(toolkit, decoded),
        LayerKind::LocalizationBarrier => localization::render_barriers(toolkit, decoded, context).await,
        LayerKind::LocalizationSign => localization::render_signs(toolkit, decoded, context).await,
        LayerKind::LocalizationPole => localization::render_poles(toolkit, decoded, context).await,
        LayerKind::LocalizationOverheadStructureFace => {
            localization::render_overhead_structure_faces(toolkit, decoded, context).await
        }
        LayerKind::RoutingAttributes => routing::render(toolkit, decoded, context).await,
        LayerKind::LandmarkBarriers => landmark::render_barriers(toolkit, decoded, context).await,
        LayerKind::LandmarkObstacles => landmark::render_obstacles(toolkit, decoded),
        LayerKind::LandmarkPoles => landmark::render_poles(toolkit, decoded, context).await,
        LayerKind::LandmarkSigns => landmark::render_signs(toolkit, decoded),
    }
}

/// Render a decoded tile of `kind` as GeoJSON
///
/// # Arguments
/// * `toolkit` - Shared geometry capabilities
/// * `kind` - Layer of the decoded tile
/// * `decoded` - Decoded tile as JSON
/// * `context` - Host services for cross-tile layers
///
/// # Returns
/// The rendered tile, or `None` when the tile has nothing to render or rendering failed. Failures
/// are logged, never returned.
pub async fn render<C: RenderContext>(
    toolkit: &Toolkit,
    kind: LayerKind,
    decoded: serde_json::Value,
    context: &C,
) -> Option<RenderedTile> {
    let span = tracing::info_span!("render", layer = %kind, partition = %context.partition());
    async move {
        match render_layer(toolkit, kind, decoded, context).await {
            Ok(Some(tile)) => {
                match tile.bounding_rect() {
                    Some(rect) => tracing::info!(
                        "Rendered {} features within ({:.6}, {:.6}) - ({:.6}, {:.6})",
                        tile.len(),
                        rect.min().x,
                        rect.min().y,
                        rect.max().x,
                        rect.max().y
                    ),
                    None => tracing::info!("Rendered {} features", tile.len()),
                }
                Some(tile)
            }
            Ok(None) => {
                tracing::info!("Tile has no feature lists to render");
                None
            }
            Err(e) => {
                tracing::error!("Failure rendering: {e}");
                None
            }
        }
    }
    .instrument(span)
    .await
}
