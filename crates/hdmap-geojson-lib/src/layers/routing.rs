//! Routing attributes: infrastructure separation along links
//!
//! Link attributions only carry a link reference and parametric ranges, so the renderer pulls the
//! link geometry from topology, lane groups through the lane-road references, and the barriers of
//! every involved tile to show what actually separates the road.

use super::localization::{BARRIER_COLORS, barrier_features};
use super::{ColorRotation, Toolkit, barrier_type_name, link_features};
use crate::catalog::{
    CatalogRef, LANE_ROAD_REFERENCES_LAYER, LANE_TOPOLOGY_LAYER, LOCALIZATION_BARRIER_LAYER, RenderContext,
    TOPOLOGY_GEOMETRY_LAYER,
};
use crate::feature::{RenderedTile, Style};
use crate::geometry::LineString2d;
use crate::ids::{EntityId, TileId};
use crate::line::Direction;
use crate::range::ParametricRange;
use crate::resolver::{RenderStage, TiledRef, fetch_and_tag_entities};
use crate::tiles::{BarriersTile, LaneRoadReferencesTile, LaneTopologyTile, RoutingAttributesTile, TopologyGeometryTile};
use crate::{RenderError, Result};
use geojson::Feature;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

const LAYER: &str = "routing-attributes";

const LINK_WITH_ATTRIBUTIONS_COLOR: &str = "#00CC00";
const LINK_WITHOUT_ATTRIBUTIONS_COLOR: &str = "#A0A0A0";
const LINK_LINE_WIDTH: f64 = 4.0;
const LINK_POINT_RADIUS: f64 = 0.8;

const SIDE_LEFT: i32 = 1;
const SIDE_RIGHT: i32 = 2;
const SIDE_BOTH: i32 = 3;
const INFRA_SEP_LINE_WIDTH: f64 = 3.0;

const LANE_GROUP_BORDER_COLOR: &str = "#777777";
const LANE_GROUP_FILL_COLOR: &str = "#222222A0";
const LANE_GROUP_LINE_WIDTH: f64 = 1.5;

/// One infrastructure separation on a link
#[derive(Debug, Clone, Copy, PartialEq)]
struct SideAttribution {
    range: ParametricRange,
    present_on_side: i32,
}

/// Infrastructure separations of one link of the current tile, in tile order
#[derive(Debug, Clone)]
struct LinkAttributions {
    link_ref: EntityId,
    attributions: Vec<SideAttribution>,
}

fn side_name(present_on_side: i32) -> &'static str {
    match present_on_side {
        SIDE_LEFT => "LEFT",
        SIDE_RIGHT => "RIGHT",
        SIDE_BOTH => "BOTH",
        _ => "UNKNOWN",
    }
}

fn side_style(direction: Direction) -> Style {
    match direction {
        Direction::Left => Style::area("#008400EE", "#008400AA", INFRA_SEP_LINE_WIDTH),
        Direction::Right => Style::area("#006400EE", "#004400AA", INFRA_SEP_LINE_WIDTH),
    }
}

fn link_attributions(toolkit: &Toolkit, tile: RoutingAttributesTile) -> Vec<LinkAttributions> {
    let tolerance = &toolkit.config.routing_tolerance;
    tile.link_attribution
        .unwrap_or_default()
        .into_iter()
        .map(|attribution| LinkAttributions {
            link_ref: attribution.link_local_ref,
            attributions: attribution
                .parametric_attribution
                .iter()
                .flat_map(|parametric| {
                    let range = parametric.applies_to_range.as_ref().map_or_else(ParametricRange::full, |r| {
                        ParametricRange::from_offsets(r.range_offset_from_start, r.range_offset_from_end, tolerance)
                    });
                    parametric
                        .link_parametric_attribution
                        .iter()
                        .filter_map(|a| a.infrastructure_separation)
                        .map(move |separation| SideAttribution {
                            range,
                            present_on_side: separation.present_on_side,
                        })
                })
                .collect(),
        })
        .collect()
}

fn has_attributions(link_ref: EntityId, attributions: &[LinkAttributions]) -> bool {
    attributions
        .iter()
        .any(|a| a.link_ref == link_ref && !a.attributions.is_empty())
}

/// Merged ranges of every attribution present on `direction`
fn side_ranges(attributions: &[SideAttribution], direction: Direction) -> Vec<ParametricRange> {
    let side = match direction {
        Direction::Left => SIDE_LEFT,
        Direction::Right => SIDE_RIGHT,
    };
    ParametricRange::merge_all(
        attributions
            .iter()
            .filter(|a| a.present_on_side == side || a.present_on_side == SIDE_BOTH)
            .map(|a| a.range)
            .collect(),
    )
}

/// Polygons between the link and its shifted copy, one per separated range
fn separation_features(
    toolkit: &Toolkit,
    link: &LineString2d,
    link_id: EntityId,
    tile_id: TileId,
    attributions: &[SideAttribution],
) -> Vec<Feature> {
    let line = &toolkit.routing_line;
    let length = line.length(link);
    let mut features = Vec::new();
    for direction in [Direction::Left, Direction::Right] {
        let style = side_style(direction);
        let side = match direction {
            Direction::Left => side_name(SIDE_LEFT),
            Direction::Right => side_name(SIDE_RIGHT),
        };
        for range in side_ranges(attributions, direction) {
            let cut = line.cut(link, &[range], length);
            let Some(segment) = cut.in_range().next() else { continue };
            let shifted = line.shift(segment, direction, toolkit.config.infrastructure_separation_shift_m, None);
            if shifted.is_degenerate() {
                tracing::debug!("Skipping infrastructure separation of link {link_id}: zero-length segment");
                continue;
            }
            let ring: Vec<_> = segment.points.iter().chain(shifted.points.iter().rev()).copied().collect();
            let tooltip = format!(
                "Infrastructure separation\nLink {link_id} [{tile_id}]\nPresent on side: {side}\nParametric range: {} - {}",
                range.start, range.end
            );
            features.extend(
                toolkit
                    .routing_features
                    .polygon(&LineString2d::new(ring), &style, &tooltip),
            );
        }
    }
    features
}

/// Lane group tiles: the current tile plus those referenced from links with attributions
fn lane_group_tile_ids(
    partition: TileId,
    references: &LaneRoadReferencesTile,
    attributions: &[LinkAttributions],
) -> BTreeSet<TileId> {
    let mut tile_ids = BTreeSet::from([partition]);
    tile_ids.extend(
        references
            .link_lane_group_references
            .iter()
            .filter(|r| has_attributions(r.link_local_ref, attributions))
            .flat_map(|r| r.lane_group_references.iter())
            .filter_map(|r| r.lane_group_ref.map(|TiledRef { tile_id, .. }| tile_id)),
    );
    tile_ids
}

fn is_lane_group_referenced(tile_id: TileId, lane_group_id: EntityId, references: &LaneRoadReferencesTile) -> bool {
    references
        .link_lane_group_references
        .iter()
        .flat_map(|r| r.lane_group_references.iter())
        .filter_map(|r| r.lane_group_ref)
        .any(|r| r.tile_id == tile_id && r.id == lane_group_id)
}

pub(crate) async fn render<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    let tile: RoutingAttributesTile =
        serde_json::from_value(decoded).map_err(|e| RenderError::MalformedInput(format!("{LAYER} tile: {e}")))?;
    if tile.link_attribution.is_none() {
        return Ok(None);
    }
    let partition = context.partition();
    let attributions = link_attributions(toolkit, tile);

    RenderStage::CollectingReferences.enter(LAYER);
    let references: LaneRoadReferencesTile = serde_json::from_value(
        context
            .fetch_partition(CatalogRef::Current, LANE_ROAD_REFERENCES_LAYER, partition)
            .await?,
    )
    .map_err(|e| RenderError::MalformedInput(format!("{LANE_ROAD_REFERENCES_LAYER} tile: {e}")))?;
    tracing::info!(
        "Loaded {} link to lane group references",
        references.link_lane_group_references.len()
    );
    let entity_tile_ids = lane_group_tile_ids(partition, &references, &attributions);
    let link_tile_ids = BTreeSet::from([partition]);
    tracing::info!("Referenced tiles: {entity_tile_ids:?}");

    RenderStage::FetchingTiles.enter(LAYER);
    let (links, lane_groups, barriers) = futures::try_join!(
        fetch_and_tag_entities::<TopologyGeometryTile, _>(
            context,
            CatalogRef::Current,
            TOPOLOGY_GEOMETRY_LAYER,
            &link_tile_ids
        ),
        fetch_and_tag_entities::<LaneTopologyTile, _>(context, CatalogRef::Current, LANE_TOPOLOGY_LAYER, &entity_tile_ids),
        fetch_and_tag_entities::<BarriersTile, _>(
            context,
            CatalogRef::Current,
            LOCALIZATION_BARRIER_LAYER,
            &entity_tile_ids
        ),
    )
    .inspect_err(|_| RenderStage::Failed.enter(LAYER))?;
    tracing::info!(
        "Loaded {} attributions, {} links, {} lane groups and {} barriers",
        attributions.len(),
        links.len(),
        lane_groups.len(),
        barriers.len()
    );

    RenderStage::Merging.enter(LAYER);
    let decoder = &toolkit.decoder;
    let link_lines: Vec<Option<LineString2d>> = links
        .par_iter()
        .map(|link| {
            link.entity
                .geometry
                .as_ref()
                .map(|g| decoder.line_string_2d(g, link.tile_center))
                .filter(|line| !line.is_degenerate())
        })
        .collect();
    let lane_group_rings: Vec<Option<(LineString2d, LineString2d)>> = lane_groups
        .par_iter()
        .map(|tagged| {
            let boundary = tagged.entity.boundary_geometry.as_ref()?;
            let (left, right) = (boundary.left_boundary.as_ref()?, boundary.right_boundary.as_ref()?);
            Some((
                decoder.line_string_2d(left, tagged.tile_center),
                decoder.line_string_2d(right, tagged.tile_center),
            ))
        })
        .collect();
    let barrier_lines: Vec<Option<LineString2d>> = barriers
        .par_iter()
        .map(|tagged| {
            tagged
                .entity
                .top_geometry
                .as_ref()
                .map(|g| decoder.line_string_3d(g, &tagged.tile_center).to_2d())
                .filter(|line| !line.is_degenerate())
        })
        .collect();

    RenderStage::Rendering.enter(LAYER);
    let builder = &toolkit.routing_features;
    let mut features = Vec::new();

    let lane_group_style = Style::area(LANE_GROUP_BORDER_COLOR, LANE_GROUP_FILL_COLOR, LANE_GROUP_LINE_WIDTH);
    for (tagged, ring) in lane_groups.iter().zip(&lane_group_rings) {
        let Some((left, right)) = ring else { continue };
        let id = tagged.entity.lane_group_id;
        if !is_lane_group_referenced(tagged.tile_id, id, &references) && tagged.tile_id != partition {
            continue;
        }
        let tooltip = format!("Lane group {id} [{}]", tagged.tile_id);
        features.extend(builder.closed_loop_polygon(left, right, &lane_group_style, &tooltip));
    }

    let lines_by_id: HashMap<EntityId, (&LineString2d, TileId)> = links
        .iter()
        .zip(&link_lines)
        .filter(|(link, _)| link.tile_id == partition)
        .filter_map(|(link, line)| Some((link.entity.link_id, (line.as_ref()?, link.tile_id))))
        .collect();
    for attribution in &attributions {
        if let Some((line, tile_id)) = lines_by_id.get(&attribution.link_ref) {
            features.extend(separation_features(
                toolkit,
                line,
                attribution.link_ref,
                *tile_id,
                &attribution.attributions,
            ));
        }
    }

    let arrow_style = Style::stroke(LINK_WITH_ATTRIBUTIONS_COLOR, LINK_LINE_WIDTH);
    for (link, line) in links.iter().zip(&link_lines) {
        let Some(line) = line else { continue };
        let link_id = link.entity.link_id;
        let tooltip = format!("Link {link_id} [{}]", link.tile_id);
        if link.tile_id == partition && has_attributions(link_id, &attributions) {
            features.extend(builder.arrows(line, &arrow_style, &tooltip, &toolkit.config.link_arrows));
        } else {
            let tooltip = format!("{tooltip}\nNo infrastructure separation found");
            features.extend(link_features(
                builder,
                line,
                LINK_WITHOUT_ATTRIBUTIONS_COLOR,
                LINK_LINE_WIDTH,
                LINK_POINT_RADIUS,
                &tooltip,
            ));
        }
    }

    let mut rotation = ColorRotation::new(&BARRIER_COLORS);
    for (tagged, line) in barriers.iter().zip(&barrier_lines) {
        let Some(line) = line else { continue };
        let barrier = &tagged.entity;
        let tooltip = format!(
            "Barrier {} [{}]: {} ({})",
            barrier.barrier_id,
            tagged.tile_id,
            barrier_type_name(barrier.barrier_type),
            barrier.barrier_type
        );
        features.extend(barrier_features(builder, line, rotation.next_color(), &tooltip));
    }

    RenderStage::Done.enter(LAYER);
    Ok(Some(RenderedTile::new(builder.collection(features))))
}
