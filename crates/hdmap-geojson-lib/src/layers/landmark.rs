//! Landmark layers: barriers, obstacles, poles and sign faces
//!
//! Barriers and poles are drawn over the lane groups of the platform lanes catalog the current
//! catalog depends on. Pole and sign positions are absolute coordinates, not tile deltas.

use super::{Toolkit, barrier_type_name, with_properties};
use crate::catalog::{LANE_TOPOLOGY_LAYER, RenderContext, fetch_from_platform_lanes};
use crate::feature::{FeatureBuilder, RenderedTile, Style};
use crate::geometry::{LineString2d, Point2d};
use crate::ids::TileId;
use crate::tiles::{
    LandmarkBarriersTile, LandmarkObstaclesTile, LandmarkPole, LandmarkPolesTile, LandmarkSignsTile, PlatformLaneGroup,
    PlatformLaneTopologyTile, PlatformLineString,
};
use crate::{RenderError, Result};
use geojson::{Feature, JsonObject, JsonValue};

const BARRIER_COLORS: [&str; 2] = ["RGB(0, 0, 255)", "RGB(255, 100, 0)"];
const BARRIER_LINE_WIDTH: f64 = 3.0;

const OBSTACLE_COMPLIANT_COLORS: [&str; 3] = ["green", "blue", "purple"];
const OBSTACLE_NON_COMPLIANT_COLORS: [&str; 3] = ["RGB(50, 50, 50)", "RGB(100, 100, 100)", "RGB(150, 150, 150)"];

const POLE_GROUP_COLORS: [&str; 4] = [
    "rgba(0, 0, 255, 1.0)",
    "rgba(255, 0, 0, 1.0)",
    "rgba(0, 130, 25, 1.0)",
    "rgba(255, 0, 246, 1.0)",
];
const POLE_NON_COMPLIANT_COLOR: &str = "rgba(0,0,0,0.8)";
const POLE_NON_COMPLIANT_FILL: &str = "rgba(112,112,112,0.3)";
const POLE_LANE_GROUP_COLOR: &str = "rgba(112,112,112,0.5)";

const SIGN_POINT_RADIUS: f64 = 4.0;
const SIGN_LINE_WIDTH: f64 = 3.0;

/// Tile id check shared by the landmark layers, 0 counting as absent
fn has_tile_id(here_tile_id: Option<TileId>) -> bool {
    here_tile_id.is_some_and(|id| id.0 != 0)
}

/// Identifier as plain text, without quotes for strings
fn id_text(id: &JsonValue) -> String {
    match id {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn platform_line(line: &PlatformLineString) -> LineString2d {
    LineString2d::new(
        line.linestring_points
            .iter()
            .map(|p| Point2d::new(p.latitude_degrees, p.longitude_degrees))
            .collect(),
    )
}

/// Lane group polygon from platform boundaries, `None` without both boundaries
fn platform_lane_group(features: &FeatureBuilder, lane_group: &PlatformLaneGroup, style: &Style) -> Option<Feature> {
    let boundary = lane_group.boundary_geometry.as_ref()?;
    let (left, right) = (boundary.left_boundary.as_ref()?, boundary.right_boundary.as_ref()?);
    let id = lane_group.id.as_ref().map(|id| id.local_id()).unwrap_or_default();
    features.closed_loop_polygon(
        &platform_line(left),
        &platform_line(right),
        style,
        &format!("Lane group {id}"),
    )
}

async fn platform_lane_groups<C: RenderContext>(context: &C) -> Result<Vec<PlatformLaneGroup>> {
    let payload = fetch_from_platform_lanes(context, LANE_TOPOLOGY_LAYER).await?;
    let tile: PlatformLaneTopologyTile = serde_json::from_value(payload)
        .map_err(|e| RenderError::MalformedInput(format!("platform {LANE_TOPOLOGY_LAYER} tile: {e}")))?;
    tracing::info!("Loaded {} platform lane groups", tile.lane_groups_starting_in_tile.len());
    Ok(tile.lane_groups_starting_in_tile)
}

pub(crate) async fn render_barriers<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    let tile: LandmarkBarriersTile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("landmark-barriers tile: {e}")))?;
    if !has_tile_id(tile.here_tile_id) || tile.barriers_for_lane_groups.is_none() {
        return Ok(None);
    }
    let lane_groups = platform_lane_groups(context).await?;

    let builder = &toolkit.features;
    let lane_group_style = Style::marker("rgba(0,0,0,0.9)", "rgba(112,112,112,0.8)");
    let mut features: Vec<Feature> = lane_groups
        .iter()
        .filter_map(|lane_group| platform_lane_group(builder, lane_group, &lane_group_style))
        .collect();

    let anchor = tile
        .tile_center_here_3d_coordinate
        .map(|center| center.here_2d_coordinate)
        .unwrap_or_default();
    for (index, barrier) in tile.barriers.iter().enumerate() {
        let Some(geometry) = &barrier.barrier_geometry else { continue };
        let line = toolkit.decoder.line_string_2d(geometry, anchor);
        let type_name = format!("BarrierType_{}", barrier_type_name(barrier.barrier_type));
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), barrier.id.clone());
        properties.insert("type".to_string(), JsonValue::from(type_name.as_str()));
        let style = Style::stroke(BARRIER_COLORS[index % BARRIER_COLORS.len()], BARRIER_LINE_WIDTH);
        let tooltip = format!("Barrier {}: {type_name}", id_text(&barrier.id));
        features.extend(builder.line_string(&line, &style, &tooltip, Some(properties)));
    }
    tracing::debug!("Rendered {} lane groups and {} barriers", lane_groups.len(), tile.barriers.len());

    Ok(Some(RenderedTile::new(builder.collection(features))))
}

pub(crate) fn render_obstacles(toolkit: &Toolkit, decoded: serde_json::Value) -> Result<Option<RenderedTile>> {
    let tile: LandmarkObstaclesTile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("landmark-obstacles tile: {e}")))?;
    let Some(groups) = tile.obstacles_for_lane_groups else {
        return Ok(None);
    };
    let anchor = tile.tile_center_here_2d_coordinate.unwrap_or_default();

    let builder = &toolkit.features;
    let mut features = Vec::new();
    for group in &groups {
        for (index, obstacle) in group.obstacles.iter().enumerate() {
            let Some(geometry) = &obstacle.geometry else { continue };
            let palette = match obstacle.specification_compliance {
                Some(_) => &OBSTACLE_COMPLIANT_COLORS,
                None => &OBSTACLE_NON_COMPLIANT_COLORS,
            };
            let style = Style {
                color: Some(palette[index % palette.len()].to_string()),
                ..Style::default()
            };
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), obstacle.id.clone());
            if let Some(compliance) = obstacle
                .specification_compliance
                .and_then(|c| c.compliant_with_specification_ref)
            {
                properties.insert("compliance".to_string(), JsonValue::from(compliance));
            }
            let line = toolkit.decoder.line_string_2d(geometry, anchor);
            let tooltip = format!("Obstacle {}", id_text(&obstacle.id));
            features.extend(builder.line_string(&line, &style, &tooltip, Some(properties)));
        }
    }

    Ok(Some(RenderedTile::new(builder.collection(features))))
}

/// Outline and fill of a lane group's poles
#[derive(Debug, Clone, PartialEq)]
struct PoleColors {
    color: String,
    fill: String,
}

impl PoleColors {
    fn for_group(index: usize) -> Self {
        let color = POLE_GROUP_COLORS[index % POLE_GROUP_COLORS.len()];
        Self {
            color: color.to_string(),
            fill: color.replace("1.0)", "0.3)"),
        }
    }

    fn non_compliant() -> Self {
        Self {
            color: POLE_NON_COMPLIANT_COLOR.to_string(),
            fill: POLE_NON_COMPLIANT_FILL.to_string(),
        }
    }
}

/// Bottom and top points of a pole, skipping missing ones
fn pole_features(
    toolkit: &Toolkit,
    pole: &LandmarkPole,
    lane_group_id: &str,
    colors: &PoleColors,
) -> Vec<Feature> {
    let bottom_style = Style::area(
        colors.color.replace("1.0)", "0.8)"),
        colors.fill.replace("1.0)", "0.2)"),
        2.0,
    );
    let top_style = Style::area(colors.color.clone(), colors.fill.clone(), 1.0);
    let ends = [
        ("bottom", pole.bottom_center_point, pole.bottom_cross_section_diameter_cm, bottom_style),
        ("top", pole.top_center_point, pole.top_cross_section_diameter_cm, top_style),
    ];
    ends.into_iter()
        .filter_map(|(position, point, diameter, style)| {
            let point = toolkit.decoder.point_2d(point?.here_2d_coordinate, 0);
            let tooltip = format!("Pole {} ({position})", id_text(&pole.id));
            let mut properties = JsonObject::new();
            properties.insert("pole_id".to_string(), pole.id.clone());
            properties.insert("lane_group_id".to_string(), JsonValue::from(lane_group_id));
            properties.insert("diameter_cm".to_string(), JsonValue::from(diameter));
            properties.insert("point_position".to_string(), JsonValue::from(position));
            Some(with_properties(
                toolkit.features.point(&point, diameter / 20.0, &style, &tooltip),
                properties,
            ))
        })
        .collect()
}

pub(crate) async fn render_poles<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    let tile: LandmarkPolesTile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("landmark-poles tile: {e}")))?;
    let Some(groups) = tile.poles_for_lane_groups.filter(|_| has_tile_id(tile.here_tile_id)) else {
        return Ok(None);
    };
    let lane_groups = platform_lane_groups(context).await?;

    let builder = &toolkit.features;
    let lane_group_style = Style::marker(POLE_LANE_GROUP_COLOR, POLE_LANE_GROUP_COLOR);
    let mut lane_group_features: Vec<(String, Feature)> = lane_groups
        .iter()
        .filter_map(|lane_group| {
            let id = lane_group.id.as_ref().map(|id| id.local_id().to_string()).unwrap_or_default();
            let mut properties = JsonObject::new();
            properties.insert("lane_group_id".to_string(), JsonValue::from(id.as_str()));
            let feature = platform_lane_group(builder, lane_group, &lane_group_style)?;
            Some((id, with_properties(feature, properties)))
        })
        .collect();

    let mut pole_features_list = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        let lane_group_id = group.lane_group_ref.to_string();
        let mut colors = PoleColors::for_group(index);
        for pole in &group.poles {
            let compliant = pole
                .specification_compliance
                .is_some_and(|c| c.compliant_with_specification_ref.is_some());
            if !compliant {
                colors = PoleColors::non_compliant();
            }
            pole_features_list.extend(pole_features(toolkit, pole, &lane_group_id, &colors));
        }
        if let Some((_, feature)) = lane_group_features.iter_mut().find(|(id, _)| *id == lane_group_id) {
            let properties = feature.properties.get_or_insert_with(JsonObject::new);
            properties.insert("style".to_string(), Style::marker(colors.color, colors.fill).to_json());
        }
    }
    tracing::debug!("Rendered {} lane groups and {} pole points", lane_group_features.len(), pole_features_list.len());

    let mut features: Vec<Feature> = lane_group_features.into_iter().map(|(_, feature)| feature).collect();
    features.extend(pole_features_list);
    Ok(Some(RenderedTile::new(builder.collection(features))))
}

fn sign_shape_name(shape: i32) -> &'static str {
    match shape {
        1 => "RECTANGULAR",
        2 => "CIRCULAR",
        3 => "TRIANGULAR",
        4 => "DIAMOND",
        5 => "OTHER",
        _ => "UNKNOWN",
    }
}

pub(crate) fn render_signs(toolkit: &Toolkit, decoded: serde_json::Value) -> Result<Option<RenderedTile>> {
    let tile: LandmarkSignsTile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("landmark-signs tile: {e}")))?;
    if !has_tile_id(tile.here_tile_id) || (tile.sign_faces.is_none() && tile.rectangular_sign_boards.is_none()) {
        return Ok(None);
    }

    let builder = &toolkit.features;
    let mut features = Vec::new();
    for sign_face in tile.sign_faces.iter().flatten() {
        let Some(center) = sign_face.center_point else { continue };
        let point = toolkit.decoder.point_2d(center.here_2d_coordinate, 0);
        let shape = sign_shape_name(sign_face.shape);
        let color = if sign_face.shape == 0 { "red" } else { "blue" };
        let mut properties = JsonObject::new();
        properties.insert("signFaceId".to_string(), sign_face.id.clone());
        properties.insert("interiorShape".to_string(), JsonValue::from(shape));
        properties.insert(
            "heading".to_string(),
            sign_face.heading.map_or(JsonValue::Null, JsonValue::from),
        );
        if let Some(classification) = &sign_face.classification {
            properties.insert("classification".to_string(), classification.classification.clone());
        }
        let tooltip = format!("Sign face {}: {shape}", id_text(&sign_face.id));
        let feature = builder.point(&point, SIGN_POINT_RADIUS, &Style::stroke(color, SIGN_LINE_WIDTH), &tooltip);
        features.push(with_properties(feature, properties));
    }

    Ok(Some(RenderedTile::new(builder.collection(features))))
}
