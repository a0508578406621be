//! GeoJSON feature construction
//!
//! Every feature carries presentation properties understood by the map inspector: a `style`
//! object, a `tooltip` string and, for points, a `radius`. Coordinates are emitted in
//! `[longitude, latitude]` order through the `geo` conversions in [`crate::geometry`].

use crate::config::ArrowOptions;
use crate::geometry::{LineString2d, Point2d};
use crate::line::LineAlgebra;
use geo::BoundingRect;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use serde::Serialize;

/// Media type of the rendered output
pub const GEOJSON_CONTENT_TYPE: &str = "application/vnd.geo+json; charset=utf-8";

/// Presentation style of a feature. Unset fields are omitted from the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

impl Style {
    /// Style for lines: stroke color and width
    pub fn stroke(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: Some(color.into()),
            fill: None,
            width: Some(width),
        }
    }

    /// Style for points: outline and fill colors
    pub fn marker(color: impl Into<String>, fill: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            fill: Some(fill.into()),
            width: None,
        }
    }

    /// Style for polygons: outline color, fill color and outline width
    pub fn area(color: impl Into<String>, fill: impl Into<String>, width: f64) -> Self {
        Self {
            color: Some(color.into()),
            fill: Some(fill.into()),
            width: Some(width),
        }
    }

    pub(crate) fn to_json(&self) -> JsonValue {
        let mut map = JsonObject::new();
        if let Some(color) = &self.color {
            map.insert("color".to_string(), JsonValue::from(color.as_str()));
        }
        if let Some(fill) = &self.fill {
            map.insert("fill".to_string(), JsonValue::from(fill.as_str()));
        }
        if let Some(width) = self.width {
            map.insert("width".to_string(), JsonValue::from(width));
        }
        JsonValue::Object(map)
    }
}

/// Output of a layer renderer, ready to hand to the host
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTile {
    pub content_type: &'static str,
    pub body: FeatureCollection,
}

impl RenderedTile {
    pub fn new(body: FeatureCollection) -> Self {
        Self {
            content_type: GEOJSON_CONTENT_TYPE,
            body,
        }
    }

    /// Number of features in the body
    #[inline]
    pub fn len(&self) -> usize {
        self.body.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.features.is_empty()
    }

    /// Bounding rectangle of every feature geometry, in lon/lat
    pub fn bounding_rect(&self) -> Option<geo::Rect<f64>> {
        let geometries: Vec<geo::Geometry<f64>> = self
            .body
            .features
            .iter()
            .filter_map(|f| f.geometry.clone())
            .filter_map(|g| geo::Geometry::<f64>::try_from(g).ok())
            .collect();
        geo::GeometryCollection(geometries).bounding_rect()
    }
}

/// Builds styled GeoJSON features from decoded geometry
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder {
    line: LineAlgebra,
}

fn make_feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn point_properties(radius: f64, style: &Style, tooltip: &str) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("radius".to_string(), JsonValue::from(radius));
    properties.insert("tooltip".to_string(), JsonValue::from(tooltip));
    properties.insert("style".to_string(), style.to_json());
    properties
}

fn shape_properties(style: &Style, tooltip: &str, extra: Option<JsonObject>) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("style".to_string(), style.to_json());
    properties.insert("tooltip".to_string(), JsonValue::from(tooltip));
    if let Some(extra) = extra {
        properties.extend(extra);
    }
    properties
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl FeatureBuilder {
    pub fn new(line: LineAlgebra) -> Self {
        Self { line }
    }

    /// Point feature with a radius
    pub fn point(&self, point: &Point2d, radius: f64, style: &Style, tooltip: &str) -> Feature {
        make_feature(
            Value::from(&geo::Point::from(*point)),
            point_properties(radius, style, tooltip),
        )
    }

    /// MultiPoint feature sharing one radius and style
    pub fn multi_point(&self, points: &[Point2d], radius: f64, style: &Style, tooltip: &str) -> Feature {
        let multi_point = geo::MultiPoint(points.iter().map(|p| geo::Point::from(*p)).collect());
        make_feature(Value::from(&multi_point), point_properties(radius, style, tooltip))
    }

    /// LineString feature
    ///
    /// # Returns
    /// `None` for degenerate lines
    pub fn line_string(
        &self,
        line: &LineString2d,
        style: &Style,
        tooltip: &str,
        extra_properties: Option<JsonObject>,
    ) -> Option<Feature> {
        if line.is_degenerate() {
            tracing::trace!("Skipping degenerate line with {} points", line.points.len());
            return None;
        }
        Some(make_feature(
            Value::from(&line.to_geo()),
            shape_properties(style, tooltip, extra_properties),
        ))
    }

    /// MultiLineString feature from the non-degenerate lines
    ///
    /// # Returns
    /// `None` when every line is degenerate
    pub fn multi_line_string(&self, lines: &[LineString2d], style: &Style, tooltip: &str) -> Option<Feature> {
        let lines: Vec<geo::LineString<f64>> = lines
            .iter()
            .filter(|l| !l.is_degenerate())
            .map(LineString2d::to_geo)
            .collect();
        if lines.is_empty() {
            return None;
        }
        Some(make_feature(
            Value::from(&geo::MultiLineString(lines)),
            shape_properties(style, tooltip, None),
        ))
    }

    /// Polygon feature with a single outer ring, closed if needed
    ///
    /// # Returns
    /// `None` when the ring has fewer than three points
    pub fn polygon(&self, ring: &LineString2d, style: &Style, tooltip: &str) -> Option<Feature> {
        if ring.points.len() < 3 {
            tracing::trace!("Skipping degenerate polygon with {} points", ring.points.len());
            return None;
        }
        let polygon = geo::Polygon::new(ring.to_geo(), Vec::new());
        Some(make_feature(Value::from(&polygon), shape_properties(style, tooltip, None)))
    }

    /// Polygon enclosed by two roughly parallel lines
    ///
    /// The ring is `left` in order, then `right` reversed, then back to the first point of `left`.
    pub fn closed_loop_polygon(
        &self,
        left: &LineString2d,
        right: &LineString2d,
        style: &Style,
        tooltip: &str,
    ) -> Option<Feature> {
        let first = left.first()?;
        let mut ring = Vec::with_capacity(left.points.len() + right.points.len() + 1);
        ring.extend(left.points.iter().copied());
        ring.extend(right.points.iter().rev().copied());
        ring.push(*first);
        self.polygon(&LineString2d::new(ring), style, tooltip)
    }

    /// Line with direction arrow heads at regular intervals
    ///
    /// # Arguments
    /// * `line` - Line to draw
    /// * `style` - Stroke color and width, the color is also used for the start point
    /// * `tooltip` - Tooltip of both features
    /// * `options` - Start point radius and arrow geometry
    ///
    /// # Returns
    /// A start point feature and a line feature embedding the arrow heads, nothing for
    /// degenerate lines.
    pub fn arrows(&self, line: &LineString2d, style: &Style, tooltip: &str, options: &ArrowOptions) -> Vec<Feature> {
        #[cfg(feature = "profiling")]
        profiling::scope!("arrows");

        let points = &line.points;
        if line.is_degenerate() {
            return Vec::new();
        }
        let color = style.color.clone().unwrap_or_default();
        let start_feature = self.point(&points[0], options.point_radius, &Style::marker(color.clone(), color), tooltip);

        let length = self.line.length(line);
        let arrow_spacing = length / ((length / options.spacing).floor() + 1.0);
        if !(arrow_spacing > 0.0 && arrow_spacing.is_finite()) {
            tracing::debug!("Invalid arrow spacing {arrow_spacing}, drawing the plain line");
            return [Some(start_feature), self.line_string(line, style, tooltip, None)]
                .into_iter()
                .flatten()
                .collect();
        }

        let geo = self.line.geodesy();
        let mut directed = Vec::with_capacity(points.len() * 2);
        let mut point_index = 0;
        let mut remaining_spacing = arrow_spacing;
        while point_index < points.len() - 1 {
            let is_last_segment = point_index == points.len() - 2;
            let mut segment_start = points[point_index];
            let segment_end = points[point_index + 1];
            directed.push(segment_start);

            loop {
                let distance_to_end = geo.distance(&segment_start, &segment_end);
                if is_last_segment && distance_to_end < remaining_spacing * 1.1 {
                    // Keep the last arrow head clear of the end point marker
                    let reverse = geo.bearing(&segment_end, &segment_start);
                    let adjusted_end = geo.destination_point(&segment_end, reverse, options.point_radius);
                    directed.extend(self.arrow_points(&segment_start, &adjusted_end, options));
                    directed.push(segment_end);
                    point_index += 1;
                    break;
                }

                if remaining_spacing < distance_to_end {
                    let intermediate = geo.along(&segment_start, &segment_end, remaining_spacing);
                    directed.extend(self.arrow_points(&segment_start, &intermediate, options));
                    segment_start = intermediate;
                    remaining_spacing = arrow_spacing;
                } else {
                    point_index += 1;
                    remaining_spacing -= distance_to_end;
                    break;
                }
            }
        }

        let mut features = vec![start_feature];
        features.extend(self.line_string(&LineString2d::new(directed), style, tooltip, None));
        features
    }

    /// Arrow head ending at `end` and pointing away from `start`
    ///
    /// The points are ordered foot, left, tip, right, foot, tip so that the head reads well
    /// when embedded in a line.
    fn arrow_points(&self, start: &Point2d, end: &Point2d, options: &ArrowOptions) -> [Point2d; 6] {
        let geo = self.line.geodesy();
        let half_width = options.width / 2.0;
        let bearing = geo.bearing(end, start);
        let foot = geo.destination_point(end, bearing, options.height);
        let left = geo.destination_point(&foot, ((bearing - 90.0) + 360.0) % 360.0, half_width);
        let right = geo.destination_point(&foot, ((bearing + 90.0) + 360.0) % 360.0, half_width);
        [foot, left, *end, right, foot, *end]
    }

    /// Wrap features into a collection
    pub fn collection(&self, features: Vec<Feature>) -> FeatureCollection {
        tracing::trace!("Collected {} features", features.len());
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_line(lon_lats: &[(f64, f64)]) -> LineString2d {
        LineString2d::new(lon_lats.iter().map(|&(lon, lat)| Point2d::new(lat, lon)).collect())
    }

    fn coordinates(feature: &Feature) -> JsonValue {
        let geometry = feature.geometry.as_ref().unwrap();
        serde_json::to_value(geometry).unwrap()["coordinates"].clone()
    }

    #[test]
    fn test_point_properties_and_order() {
        let builder = FeatureBuilder::default();
        let feature = builder.point(&Point2d::new(52.5, 13.4), 4.0, &Style::marker("#000", "#FFF"), "tip");
        assert_eq!(coordinates(&feature), serde_json::json!([13.4, 52.5]));
        let properties = feature.properties.unwrap();
        assert_eq!(properties["radius"], 4.0);
        assert_eq!(properties["tooltip"], "tip");
        assert_eq!(properties["style"], serde_json::json!({"color": "#000", "fill": "#FFF"}));
    }

    #[test]
    fn test_line_string_extra_properties() {
        let builder = FeatureBuilder::default();
        let mut extra = JsonObject::new();
        extra.insert("id".to_string(), JsonValue::from(7));
        let feature = builder
            .line_string(
                &create_test_line(&[(0.0, 0.0), (1.0, 1.0)]),
                &Style::stroke("blue", 2.0),
                "",
                Some(extra),
            )
            .unwrap();
        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties["id"], 7);
        assert_eq!(properties["style"], serde_json::json!({"color": "blue", "width": 2.0}));
        assert_eq!(coordinates(&feature), serde_json::json!([[0.0, 0.0], [1.0, 1.0]]));
    }

    #[test]
    fn test_degenerate_geometry_skipped() {
        let builder = FeatureBuilder::default();
        let style = Style::stroke("blue", 2.0);
        let single = create_test_line(&[(0.0, 0.0)]);
        assert!(builder.line_string(&single, &style, "", None).is_none());
        assert!(builder.multi_line_string(&[single.clone()], &style, "").is_none());
        assert!(builder.polygon(&single, &style, "").is_none());
        assert!(builder.closed_loop_polygon(&LineString2d::default(), &single, &style, "").is_none());
        assert!(builder.arrows(&single, &style, "", &ArrowOptions::default()).is_empty());
    }

    #[test]
    fn test_closed_loop_polygon_ring() {
        let builder = FeatureBuilder::default();
        let left = create_test_line(&[(0.0, 0.0), (1.0, 1.0)]);
        let right = create_test_line(&[(0.0, 1.0), (1.0, 0.0)]);
        let feature = builder
            .closed_loop_polygon(&left, &right, &Style::area("#777777", "#222222A0", 1.5), "")
            .unwrap();
        assert_eq!(
            coordinates(&feature),
            serde_json::json!([[[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]])
        );
    }

    #[test]
    fn test_polygon_is_closed() {
        let builder = FeatureBuilder::default();
        let ring = create_test_line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let feature = builder.polygon(&ring, &Style::area("a", "b", 1.0), "").unwrap();
        let coordinates = coordinates(&feature);
        let ring = coordinates[0].as_array().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_arrows_layout() {
        let builder = FeatureBuilder::default();
        // Roughly 222 m along the equator, spacing 50 m gives 5 intervals
        let line = create_test_line(&[(0.0, 0.0), (0.001, 0.0), (0.002, 0.0)]);
        let options = ArrowOptions::default();
        let features = builder.arrows(&line, &Style::stroke("#00CC00", 2.0), "link", &options);
        assert_eq!(features.len(), 2);

        let start = features[0].properties.as_ref().unwrap();
        assert_eq!(start["radius"], 0.8);
        assert_eq!(start["style"], serde_json::json!({"color": "#00CC00", "fill": "#00CC00"}));

        let coordinates = coordinates(&features[1]);
        let coordinates = coordinates.as_array().unwrap();
        // 3 vertices plus 5 arrow heads of 6 points each
        assert_eq!(coordinates.len(), 3 + 5 * 6);
        assert_eq!(coordinates[0], serde_json::json!([0.0, 0.0]));
        assert_eq!(coordinates[coordinates.len() - 1], serde_json::json!([0.002, 0.0]));
    }

    #[test]
    fn test_rendered_tile() {
        let builder = FeatureBuilder::default();
        let features = vec![
            builder.point(&Point2d::new(1.0, 2.0), 1.0, &Style::default(), ""),
            builder.point(&Point2d::new(-1.0, 4.0), 1.0, &Style::default(), ""),
        ];
        let tile = RenderedTile::new(builder.collection(features));
        assert_eq!(tile.len(), 2);
        let rect = tile.bounding_rect().unwrap();
        assert_eq!(rect.min(), geo::coord! { x: 2.0, y: -1.0 });
        assert_eq!(rect.max(), geo::coord! { x: 4.0, y: 1.0 });

        let json = serde_json::to_value(&tile).unwrap();
        assert_eq!(json["contentType"], GEOJSON_CONTENT_TYPE);
        assert_eq!(json["body"]["type"], "FeatureCollection");
    }
}
