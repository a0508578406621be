//! Lane layers: lane topology with specification compliance, and lane geometry polylines

use super::{Toolkit, with_properties};
use crate::catalog::{CatalogRef, LANE_ATTRIBUTES_LAYER, RenderContext};
use crate::feature::{RenderedTile, Style};
use crate::geometry::LineString2d;
use crate::ids::{Coordinate2d, EntityId};
use crate::tiles::{LaneAttributesTile, LaneGeometryPolylineTile, LaneGroup, LaneTopologyTile, LineString2dOffset};
use crate::{RenderError, Result};
use geojson::{Feature, JsonObject, JsonValue};
use rayon::prelude::*;
use std::collections::HashMap;

const CONNECTOR_COLOR: &str = "blue";
const CONNECTOR_WIDTH: f64 = 2.0;
const LANE_PATH_COLOR: &str = "gray";
const REFERENCE_COLOR: &str = "rgba(51,51,255,0.2)";
const REFERENCE_WIDTH: f64 = 6.0;

/// Compliance values of each lane group, keyed by lane group id
type ComplianceMap = HashMap<EntityId, Vec<Option<i64>>>;

/// `rgba(...)` color of a compliance level, darker for stricter specifications
fn compliance_color(compliance: Option<i64>, opacity: f64) -> String {
    let (rgb, opacity) = match compliance {
        Some(1) => ("50,255,50", opacity),
        Some(2) => ("17,147,19", opacity),
        Some(3) => ("2,68,5", opacity),
        _ => ("1,25,2", opacity - 0.4),
    };
    format!("rgba({rgb},{opacity})")
}

fn compliance_map(tile: LaneAttributesTile) -> ComplianceMap {
    tile.lane_group_attribution
        .into_iter()
        .filter_map(|attribution| {
            let compliance: Vec<Option<i64>> = attribution
                .parametric_attribution
                .iter()
                .flat_map(|p| p.lane_group_parametric_attribution.iter())
                .map(|a| a.specification_compliance.and_then(|c| c.compliant_with_specification_ref))
                .collect();
            (!compliance.is_empty()).then_some((attribution.lane_group_ref, compliance))
        })
        .collect()
}

/// Load compliance data for the current partition, `None` when it is unavailable
async fn load_compliance<C: RenderContext>(context: &C) -> Option<ComplianceMap> {
    let partition = context.partition();
    tracing::info!("Loading {LANE_ATTRIBUTES_LAYER} for partition {partition}, version {}", context.version());
    let loaded = context
        .fetch_partition(CatalogRef::Current, LANE_ATTRIBUTES_LAYER, partition)
        .await
        .and_then(|payload| serde_json::from_value::<LaneAttributesTile>(payload).map_err(RenderError::from));
    match loaded {
        Ok(tile) => {
            let map = compliance_map(tile);
            tracing::info!("Loaded compliance data for {} lane groups", map.len());
            Some(map)
        }
        Err(e) => {
            tracing::warn!("Failed to load {LANE_ATTRIBUTES_LAYER}, rendering without compliance data: {e}");
            None
        }
    }
}

fn lane_group_properties(lane_group_id: EntityId) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("laneGroupId".to_string(), JsonValue::from(lane_group_id.0.to_string()));
    properties
}

/// Polygon of a lane group, colored by its first compliance value when present
fn lane_group_polygon(
    toolkit: &Toolkit,
    left: &LineString2d,
    right: &LineString2d,
    lane_group_id: EntityId,
    compliance: Option<&[Option<i64>]>,
) -> Option<Feature> {
    let (style, tooltip) = match compliance {
        Some(compliance) => {
            let level = compliance.first().copied().flatten();
            let level_text = level.map_or_else(|| "unknown".to_string(), |l| l.to_string());
            (
                Style {
                    color: Some(compliance_color(level, 1.0)),
                    fill: Some(compliance_color(level, 0.7)),
                    width: None,
                },
                format!("Lane group {lane_group_id}\nCompliance level: {level_text}"),
            )
        }
        None => (
            Style {
                color: Some("rgba(128,128,128,1)".to_string()),
                fill: Some("rgba(128,128,128,0.7)".to_string()),
                width: None,
            },
            format!("Lane group {lane_group_id}"),
        ),
    };
    let mut properties = lane_group_properties(lane_group_id);
    properties.insert(
        "compliantWithSpecificationRef".to_string(),
        compliance.map_or(JsonValue::Null, |c| JsonValue::from(c.to_vec())),
    );
    let polygon = toolkit.features.closed_loop_polygon(left, right, &style, &tooltip)?;
    Some(with_properties(polygon, properties))
}

fn decode_boundaries(
    toolkit: &Toolkit,
    lane_group: &LaneGroup,
    center: Coordinate2d,
) -> Result<Option<(LineString2d, LineString2d)>> {
    let Some(boundary) = &lane_group.boundary_geometry else {
        return Ok(None);
    };
    let (Some(left), Some(right)) = (&boundary.left_boundary, &boundary.right_boundary) else {
        return Err(RenderError::MalformedGeometry(format!(
            "lane group {} is missing a boundary",
            lane_group.lane_group_id
        )));
    };
    Ok(Some((
        toolkit.decoder.line_string_2d(left, center),
        toolkit.decoder.line_string_2d(right, center),
    )))
}

pub(crate) async fn render_lane_topology<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    let tile: LaneTopologyTile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("lane-topology tile: {e}")))?;
    let (Some(lane_groups), Some(connectors)) = (tile.lane_groups_starting_in_tile, tile.lane_group_connectors_in_tile)
    else {
        return Ok(None);
    };
    let center = tile.tile_center_here_2d_coordinate.unwrap_or_default();
    let compliance = load_compliance(context).await;

    let boundaries = lane_groups
        .par_iter()
        .map(|lane_group| decode_boundaries(toolkit, lane_group, center))
        .collect::<Result<Vec<_>>>()?;

    let mut features = Vec::new();
    for (lane_group, boundaries) in lane_groups.iter().zip(boundaries) {
        let Some((left, right)) = boundaries else { continue };
        let id = lane_group.lane_group_id;
        match &compliance {
            None => features.extend(lane_group_polygon(toolkit, &left, &right, id, None)),
            Some(map) => match map.get(&id) {
                Some(values) => features.extend(lane_group_polygon(toolkit, &left, &right, id, Some(values))),
                None => {
                    let tooltip = format!("Lane group {id}");
                    for line in [&left, &right] {
                        features.extend(toolkit.features.line_string(
                            line,
                            &Style::default(),
                            &tooltip,
                            Some(lane_group_properties(id)),
                        ));
                    }
                }
            },
        }
    }

    let connector_style = Style::stroke(CONNECTOR_COLOR, CONNECTOR_WIDTH);
    for connector in &connectors {
        let Some(geometry) = &connector.boundary_geometry else { continue };
        let line = toolkit.decoder.line_string_2d(geometry, center);
        let id = connector.lane_group_connector_id;
        let mut properties = JsonObject::new();
        properties.insert("connectorId".to_string(), JsonValue::from(id.0.to_string()));
        features.extend(toolkit.features.line_string(
            &line,
            &connector_style,
            &format!("Lane connector {id}"),
            Some(properties),
        ));
    }
    tracing::debug!("Rendered {} lane groups and {} connectors", lane_groups.len(), connectors.len());

    Ok(Some(RenderedTile::new(toolkit.features.collection(features))))
}

pub(crate) fn render_lane_geometry_polyline(toolkit: &Toolkit, decoded: serde_json::Value) -> Result<Option<RenderedTile>> {
    let tile: LaneGeometryPolylineTile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("lane-geometry-polyline tile: {e}")))?;
    let (Some(center), Some(groups)) = (tile.tile_center_here_3d_coordinate, tile.lane_group_geometries) else {
        return Ok(None);
    };
    let anchor = center.here_2d_coordinate;

    let boundaries: Vec<&LineString2dOffset> = groups
        .iter()
        .flat_map(|g| g.lane_boundary_geometries.iter().filter_map(|b| b.geometry.as_ref()))
        .collect();
    let lane_paths: Vec<&LineString2dOffset> = groups
        .iter()
        .flat_map(|g| g.lane_geometries.iter().filter_map(|l| l.lane_path_geometry.as_ref()))
        .collect();
    let references: Vec<&LineString2dOffset> = groups.iter().filter_map(|g| g.reference_geometry.as_ref()).collect();

    let draw = |offsets: &[&LineString2dOffset], style: &Style| -> Vec<Feature> {
        offsets
            .par_iter()
            .filter_map(|offset| {
                let line = toolkit.decoder.line_string_2d(offset, anchor);
                toolkit.features.line_string(&line, style, "", None)
            })
            .collect()
    };

    let lane_path_style = Style {
        color: Some(LANE_PATH_COLOR.to_string()),
        ..Style::default()
    };
    let mut features = draw(&boundaries, &Style::default());
    features.extend(draw(&lane_paths, &lane_path_style));
    features.extend(draw(&references, &Style::stroke(REFERENCE_COLOR, REFERENCE_WIDTH)));
    tracing::debug!(
        "Rendered {} boundaries, {} lane paths and {} reference lines",
        boundaries.len(),
        lane_paths.len(),
        references.len()
    );

    Ok(Some(RenderedTile::new(toolkit.features.collection(features))))
}
