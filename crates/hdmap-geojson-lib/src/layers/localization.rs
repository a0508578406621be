//! Localization layers: barriers, signs, poles and overhead structure faces
//!
//! All four share one pipeline. The tile being rendered only contributes its road-to-entity
//! references: entities are fetched from the current tile and every referenced tile, links from
//! the current tile's topology geometry. Links referencing entities are highlighted, entities are
//! drawn when referenced or local to the current tile.

use super::{ColorRotation, Toolkit, barrier_type_name, link_features};
use crate::catalog::{
    CatalogRef, LOCALIZATION_BARRIER_LAYER, LOCALIZATION_OVERHEAD_STRUCTURE_FACE_LAYER, LOCALIZATION_POLE_LAYER,
    LOCALIZATION_SIGN_LAYER, RenderContext, TOPOLOGY_GEOMETRY_LAYER,
};
use crate::coords::CoordinateDecoder;
use crate::feature::{FeatureBuilder, RenderedTile, Style};
use crate::geometry::{LineString2d, Point2d};
use crate::ids::{EntityId, TileId};
use crate::resolver::{
    RenderStage, RoadToEntitiesReference, TiledEntities, collect_referenced_tile_ids, fetch_and_tag_entities,
    is_entity_referenced_by_links,
};
use crate::tiles::{
    Barrier, BarriersTile, OverheadStructureFace, OverheadStructureFacesTile, Point3dOffset, Pole, PolesTile, Sign,
    SignsTile, TileCenter3d, TopologyGeometryTile,
};
use crate::{RenderError, Result};
use geojson::Feature;
use rayon::prelude::*;
use std::collections::BTreeSet;

const LINK_POINT_RADIUS: f64 = 0.8;
const LINK_REFERENCED_COLOR: &str = "#00CC00";

const BARRIER_POINT_RADIUS: f64 = 0.5;
const BARRIER_LINE_WIDTH: f64 = 3.0;
const BARRIER_UNREFERENCED_COLOR: &str = "#DDDDDDBB";
pub(crate) const BARRIER_COLORS: [&str; 6] = [
    "#42D4F4BB", "#FF000DBB", "#FF0A16BB", "#FFA114BB", "#EB00A4BB", "#000EA8BB",
];

const SIGN_POINT_RADIUS: f64 = 4.0;
const SIGN_CENTER_POINT_RADIUS: f64 = 0.5;
const SIGN_UNREFERENCED_COLOR: &str = "#BABABA";

const POLE_POINT_RADIUS: f64 = 1.0;
const POLE_UNREFERENCED_COLOR: &str = "#BABABA";
const POLE_COLORS: [&str; 8] = [
    "#4F6BFF", "#DDD753", "#FA4348", "#6DFA65", "#A37F4F", "#A077C2", "#C28B05", "#99FFFF",
];

const OSF_LINE_WIDTH: f64 = 4.0;
const OSF_REFERENCED_COLOR: &str = "#FA0000";
const OSF_UNREFERENCED_COLOR: &str = "#FFFFFF";

/// A localization tile: entities around a 3D tile center plus link back-references
pub trait LocalizationTile: TiledEntities<Center = TileCenter3d> {
    /// Whether the entity list is present (possibly empty)
    fn has_entities(&self) -> bool;

    fn take_references(&mut self) -> Option<Vec<RoadToEntitiesReference>>;
}

/// Per-entity decisions drawn while rendering, in entity order
struct Paint<'a> {
    index: usize,
    referenced: bool,
    rotation: &'a mut ColorRotation,
}

/// How one localization layer decodes, colors and draws its entities
trait LocalizationLayer {
    type Entity: Send + Sync;
    type Tile: LocalizationTile<Entity = Self::Entity>;
    type Geometry: Send;

    const LAYER: &'static str;
    /// Entity name used in tooltips
    const LABEL: &'static str;
    const LINK_UNREFERENCED_COLOR: &'static str = "#BBBBBB";
    const LINK_REFERENCED_WIDTH: f64 = 4.0;
    const LINK_UNREFERENCED_WIDTH: f64 = 4.0;

    fn entity_id(entity: &Self::Entity) -> EntityId;

    /// Decode the entity geometry, `None` when there is nothing to draw
    fn decode(decoder: &CoordinateDecoder, entity: &Self::Entity, center: &TileCenter3d) -> Result<Option<Self::Geometry>>;

    fn describe(entity: &Self::Entity) -> String;

    fn draw(
        features: &FeatureBuilder,
        entity: &Self::Entity,
        geometry: &Self::Geometry,
        paint: Paint<'_>,
        tooltip: &str,
    ) -> Vec<Feature>;
}

struct BarrierLayer;

impl LocalizationLayer for BarrierLayer {
    type Entity = Barrier;
    type Tile = BarriersTile;
    type Geometry = LineString2d;

    const LAYER: &'static str = LOCALIZATION_BARRIER_LAYER;
    const LABEL: &'static str = "Barrier";

    fn entity_id(entity: &Barrier) -> EntityId {
        entity.barrier_id
    }

    fn decode(decoder: &CoordinateDecoder, entity: &Barrier, center: &TileCenter3d) -> Result<Option<LineString2d>> {
        Ok(entity
            .top_geometry
            .as_ref()
            .map(|g| decoder.line_string_3d(g, center).to_2d())
            .filter(|line| !line.is_degenerate()))
    }

    fn describe(entity: &Barrier) -> String {
        barrier_type_name(entity.barrier_type).to_string()
    }

    fn draw(features: &FeatureBuilder, _: &Barrier, line: &LineString2d, paint: Paint<'_>, tooltip: &str) -> Vec<Feature> {
        let color = if paint.referenced {
            paint.rotation.next_color()
        } else {
            BARRIER_UNREFERENCED_COLOR
        };
        barrier_features(features, line, color, tooltip)
    }
}

/// Both end points and the line of a barrier top geometry
pub(crate) fn barrier_features(features: &FeatureBuilder, line: &LineString2d, color: &str, tooltip: &str) -> Vec<Feature> {
    let (Some(start), Some(end)) = (line.first(), line.last()) else {
        return Vec::new();
    };
    let marker = Style::marker(color, color);
    let mut rendered = vec![
        features.point(start, BARRIER_POINT_RADIUS, &marker, tooltip),
        features.point(end, BARRIER_POINT_RADIUS, &marker, tooltip),
    ];
    rendered.extend(features.line_string(line, &Style::stroke(color, BARRIER_LINE_WIDTH), tooltip, None));
    rendered
}

struct SignLayer;

/// Display color of a sign dominant color value
fn sign_color(dominant_color: i32) -> Option<&'static str> {
    match dominant_color {
        0 => Some("#CE716F"),
        1 => Some("#E20AA2"),
        2 => Some("#FFFFFF"),
        3 => Some("#9F0007"),
        4 => Some("#129F03"),
        5 => Some("#0A169F"),
        6 => Some("#E2D651"),
        7 => Some("#000000"),
        8 => Some("#85551D"),
        _ => None,
    }
}

impl LocalizationLayer for SignLayer {
    type Entity = Sign;
    type Tile = SignsTile;
    type Geometry = Point2d;

    const LAYER: &'static str = LOCALIZATION_SIGN_LAYER;
    const LABEL: &'static str = "Sign";

    fn entity_id(entity: &Sign) -> EntityId {
        entity.sign_id
    }

    fn decode(decoder: &CoordinateDecoder, entity: &Sign, center: &TileCenter3d) -> Result<Option<Point2d>> {
        let offset = Point3dOffset {
            here_2d_coordinate: entity.here_2d_coordinate,
            cm_from_wgs84_ellipsoid: entity.cm_from_wgs84_ellipsoid,
        };
        Ok(Some(decoder.point_3d(&offset, center).lat_lon))
    }

    fn describe(entity: &Sign) -> String {
        let mut description = format!("color {}, shape {}", entity.dominant_color, entity.exterior_shape);
        if let Some(heading) = entity.heading_degrees {
            description.push_str(&format!(", heading {heading}°"));
        }
        if let (Some(width), Some(height)) = (entity.exterior_width_cm, entity.exterior_height_cm) {
            description.push_str(&format!(", {width}x{height} cm"));
        }
        if let Some(classification) = &entity.classification {
            description.push_str(&format!(", classification {}", classification.classification_type));
        }
        description
    }

    fn draw(features: &FeatureBuilder, entity: &Sign, center: &Point2d, paint: Paint<'_>, tooltip: &str) -> Vec<Feature> {
        let color = if paint.referenced {
            sign_color(entity.dominant_color).unwrap_or(SIGN_UNREFERENCED_COLOR)
        } else {
            SIGN_UNREFERENCED_COLOR
        };
        let fill = format!("{color}BB");
        vec![
            features.point(center, SIGN_POINT_RADIUS, &Style::marker(color, fill), tooltip),
            features.point(center, SIGN_CENTER_POINT_RADIUS, &Style::marker(color, color), tooltip),
        ]
    }
}

struct PoleLayer;

impl LocalizationLayer for PoleLayer {
    type Entity = Pole;
    type Tile = PolesTile;
    type Geometry = Point2d;

    const LAYER: &'static str = LOCALIZATION_POLE_LAYER;
    const LABEL: &'static str = "Pole";

    fn entity_id(entity: &Pole) -> EntityId {
        entity.id
    }

    fn decode(decoder: &CoordinateDecoder, entity: &Pole, center: &TileCenter3d) -> Result<Option<Point2d>> {
        let Some(bottom) = &entity.bottom_center_point else {
            return Err(RenderError::MalformedGeometry(format!(
                "pole {} has no bottom center point",
                entity.id
            )));
        };
        Ok(Some(decoder.point_3d(bottom, center).lat_lon))
    }

    fn describe(entity: &Pole) -> String {
        match entity.bottom_diameter_cm {
            Some(diameter) => format!("type {}, bottom diameter {diameter} cm", entity.pole_type),
            None => format!("type {}", entity.pole_type),
        }
    }

    fn draw(features: &FeatureBuilder, _: &Pole, bottom: &Point2d, paint: Paint<'_>, tooltip: &str) -> Vec<Feature> {
        let color = if paint.referenced {
            POLE_COLORS[paint.index % POLE_COLORS.len()]
        } else {
            POLE_UNREFERENCED_COLOR
        };
        let fill = format!("{color}CC");
        vec![features.point(bottom, POLE_POINT_RADIUS, &Style::marker(color, fill), tooltip)]
    }
}

struct OverheadStructureFaceLayer;

impl LocalizationLayer for OverheadStructureFaceLayer {
    type Entity = OverheadStructureFace;
    type Tile = OverheadStructureFacesTile;
    type Geometry = LineString2d;

    const LAYER: &'static str = LOCALIZATION_OVERHEAD_STRUCTURE_FACE_LAYER;
    const LABEL: &'static str = "Overhead structure face";
    const LINK_UNREFERENCED_COLOR: &'static str = "#BABABA";
    const LINK_UNREFERENCED_WIDTH: f64 = 2.0;

    fn entity_id(entity: &OverheadStructureFace) -> EntityId {
        entity.id
    }

    fn decode(
        decoder: &CoordinateDecoder,
        entity: &OverheadStructureFace,
        center: &TileCenter3d,
    ) -> Result<Option<LineString2d>> {
        Ok(entity
            .vertical_surface
            .as_ref()
            .and_then(|surface| surface.bottom.as_ref())
            .map(|bottom| decoder.line_string_3d(bottom, center).to_2d())
            .filter(|line| !line.is_degenerate()))
    }

    fn describe(_: &OverheadStructureFace) -> String {
        String::new()
    }

    fn draw(
        features: &FeatureBuilder,
        _: &OverheadStructureFace,
        bottom: &LineString2d,
        paint: Paint<'_>,
        tooltip: &str,
    ) -> Vec<Feature> {
        let color = if paint.referenced {
            OSF_REFERENCED_COLOR
        } else {
            OSF_UNREFERENCED_COLOR
        };
        features
            .line_string(bottom, &Style::stroke(color, OSF_LINE_WIDTH), tooltip, None)
            .into_iter()
            .collect()
    }
}

/// Tooltip of a link, listing the entities it references sorted by tile and id
fn link_tooltip<L: LocalizationLayer>(link_id: EntityId, tile_id: TileId, reference: Option<&RoadToEntitiesReference>) -> String {
    let mut tooltip = format!("Link {link_id} [{tile_id}]");
    match reference {
        Some(reference) => {
            let mut refs = reference.refs.clone();
            refs.sort();
            for r in refs {
                tooltip.push_str(&format!("\n{} {} [{}]", L::LABEL, r.id, r.tile_id));
            }
        }
        None => tooltip.push_str(&format!("\nNo {} reference found", L::LABEL.to_lowercase())),
    }
    tooltip
}

fn entity_tooltip<L: LocalizationLayer>(entity: &L::Entity, tile_id: TileId) -> String {
    let description = L::describe(entity);
    if description.is_empty() {
        format!("{} {} [{tile_id}]", L::LABEL, L::entity_id(entity))
    } else {
        format!("{} {} [{tile_id}]: {description}", L::LABEL, L::entity_id(entity))
    }
}

async fn render_localization<L: LocalizationLayer, C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    let mut tile: L::Tile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("{} tile: {e}", L::LAYER)))?;
    let references = tile.take_references();
    if !tile.has_entities() && references.is_none() {
        return Ok(None);
    }
    let references = references.unwrap_or_default();
    let partition = context.partition();

    RenderStage::CollectingReferences.enter(L::LAYER);
    let entity_tile_ids = collect_referenced_tile_ids(partition, &references);
    let link_tile_ids = BTreeSet::from([partition]);
    tracing::info!("Referenced tiles: {entity_tile_ids:?}");

    RenderStage::FetchingTiles.enter(L::LAYER);
    let (links, entities) = futures::try_join!(
        fetch_and_tag_entities::<TopologyGeometryTile, _>(
            context,
            CatalogRef::Current,
            TOPOLOGY_GEOMETRY_LAYER,
            &link_tile_ids
        ),
        fetch_and_tag_entities::<L::Tile, _>(context, CatalogRef::Current, L::LAYER, &entity_tile_ids),
    )
    .inspect_err(|_| RenderStage::Failed.enter(L::LAYER))?;
    tracing::info!("Loaded {} links and {} {} entities", links.len(), entities.len(), L::LAYER);

    RenderStage::Merging.enter(L::LAYER);
    let link_lines: Vec<Option<LineString2d>> = links
        .par_iter()
        .map(|link| {
            link.entity
                .geometry
                .as_ref()
                .map(|g| toolkit.decoder.line_string_2d(g, link.tile_center))
        })
        .collect();
    let geometries = entities
        .par_iter()
        .map(|tagged| L::decode(&toolkit.decoder, &tagged.entity, &tagged.tile_center))
        .collect::<Result<Vec<_>>>()
        .inspect_err(|_| RenderStage::Failed.enter(L::LAYER))?;

    RenderStage::Rendering.enter(L::LAYER);
    let builder = &toolkit.features;
    let mut features = Vec::new();
    for (link, line) in links.iter().zip(&link_lines) {
        let Some(line) = line else { continue };
        let reference = references.iter().find(|r| r.link_ref == link.entity.link_id);
        let (color, width) = match reference {
            Some(_) => (LINK_REFERENCED_COLOR, L::LINK_REFERENCED_WIDTH),
            None => (L::LINK_UNREFERENCED_COLOR, L::LINK_UNREFERENCED_WIDTH),
        };
        let tooltip = link_tooltip::<L>(link.entity.link_id, link.tile_id, reference);
        features.extend(link_features(builder, line, color, width, LINK_POINT_RADIUS, &tooltip));
    }

    let mut rotation = ColorRotation::new(&BARRIER_COLORS);
    for (index, (tagged, geometry)) in entities.iter().zip(&geometries).enumerate() {
        let Some(geometry) = geometry else { continue };
        let referenced = is_entity_referenced_by_links(tagged.tile_id, L::entity_id(&tagged.entity), &references);
        if !referenced && tagged.tile_id != partition {
            continue;
        }
        let tooltip = entity_tooltip::<L>(&tagged.entity, tagged.tile_id);
        let paint = Paint {
            index,
            referenced,
            rotation: &mut rotation,
        };
        features.extend(L::draw(builder, &tagged.entity, geometry, paint, &tooltip));
    }

    RenderStage::Done.enter(L::LAYER);
    Ok(Some(RenderedTile::new(builder.collection(features))))
}

pub(crate) async fn render_barriers<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    render_localization::<BarrierLayer, C>(toolkit, decoded, context).await
}

pub(crate) async fn render_signs<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    render_localization::<SignLayer, C>(toolkit, decoded, context).await
}

pub(crate) async fn render_poles<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    render_localization::<PoleLayer, C>(toolkit, decoded, context).await
}

pub(crate) async fn render_overhead_structure_faces<C: RenderContext>(
    toolkit: &Toolkit,
    decoded: serde_json::Value,
    context: &C,
) -> Result<Option<RenderedTile>> {
    render_localization::<OverheadStructureFaceLayer, C>(toolkit, decoded, context).await
}

#[cfg(test)]
mod tests {
    use super::super::tests::{MemoryContext, create_test_deltas, feature_types, property};
    use super::super::{LayerKind, render};
    use super::*;
    use serde_json::json;

    const CENTER: u64 = 0;

    fn create_test_topology(links: &[(u64, &[(f64, f64)])]) -> serde_json::Value {
        json!({
            "tile_center_here_2d_coordinate": CENTER,
            "links_starting_in_tile": links
                .iter()
                .map(|(id, points)| json!({
                    "link_id": id,
                    "geometry": { "here_2d_coordinate_diffs": create_test_deltas(CENTER, points) }
                }))
                .collect::<Vec<_>>()
        })
    }

    fn create_test_barriers(tile_id: u64, barriers: &[(u64, &[(f64, f64)])]) -> serde_json::Value {
        json!({
            "here_tile_id": tile_id,
            "tile_center_here_3d_coordinate": { "here_2d_coordinate": CENTER, "cm_from_WGS84_ellipsoid": 0 },
            "barriers": barriers
                .iter()
                .map(|(id, points)| json!({
                    "barrier_id": id,
                    "type": 2,
                    "top_geometry": { "here_2d_coordinate_diffs": create_test_deltas(CENTER, points) }
                }))
                .collect::<Vec<_>>()
        })
    }

    fn create_test_barrier_references(link: u64, refs: &[(u64, u64)]) -> serde_json::Value {
        json!([{
            "link_ref": link,
            "barrier_refs": refs
                .iter()
                .map(|(tile, id)| json!({ "barrier_here_tile_id": tile, "barrier_id": id }))
                .collect::<Vec<_>>()
        }])
    }

    #[tokio::test]
    async fn test_barriers_across_tiles() {
        let link_points: &[(f64, f64)] = &[(13.40, 52.50), (13.41, 52.50)];
        let barrier_points: &[(f64, f64)] = &[(13.40, 52.5001), (13.41, 52.5001)];
        let mut decoded = create_test_barriers(1, &[(5, barrier_points)]);
        decoded["road_to_barriers_references"] = create_test_barrier_references(100, &[(2, 7)]);

        let context = MemoryContext::new(1)
            .with_tile(TOPOLOGY_GEOMETRY_LAYER, 1, create_test_topology(&[(100, link_points), (101, link_points)]))
            .with_tile(LOCALIZATION_BARRIER_LAYER, 1, create_test_barriers(1, &[(5, barrier_points)]))
            .with_tile(
                LOCALIZATION_BARRIER_LAYER,
                2,
                create_test_barriers(2, &[(7, barrier_points), (8, barrier_points)]),
            );

        let tile = render(&Toolkit::default(), LayerKind::LocalizationBarrier, decoded, &context)
            .await
            .unwrap();

        // Exactly the current tile and the referenced one
        assert_eq!(
            context.requested(),
            vec![
                (String::new(), LOCALIZATION_BARRIER_LAYER.to_string(), 1),
                (String::new(), LOCALIZATION_BARRIER_LAYER.to_string(), 2),
                (String::new(), TOPOLOGY_GEOMETRY_LAYER.to_string(), 1),
            ]
        );

        // 2 links and 2 barriers (local 5, referenced 7), 3 features each. Barrier 8 is skipped.
        assert_eq!(tile.len(), 12);
        assert_eq!(
            feature_types(&tile),
            ["Point", "Point", "LineString"].repeat(4)
        );
        let features = &tile.body.features;
        assert_eq!(property(&features[2], "style")["color"], LINK_REFERENCED_COLOR);
        assert_eq!(property(&features[5], "style")["color"], "#BBBBBB");
        assert_eq!(property(&features[1], "tooltip"), "");
        assert_eq!(property(&features[8], "style")["color"], BARRIER_UNREFERENCED_COLOR);
        // First referenced barrier takes the second palette color
        assert_eq!(property(&features[11], "style")["color"], BARRIER_COLORS[1]);
        assert_eq!(property(&features[11], "style")["width"], BARRIER_LINE_WIDTH);
    }

    #[tokio::test]
    async fn test_failed_referenced_tile_fails_render() {
        let mut decoded = create_test_barriers(1, &[]);
        decoded["road_to_barriers_references"] = create_test_barrier_references(100, &[(2, 7)]);
        let context = MemoryContext::new(1)
            .with_tile(TOPOLOGY_GEOMETRY_LAYER, 1, create_test_topology(&[]))
            .with_tile(LOCALIZATION_BARRIER_LAYER, 1, create_test_barriers(1, &[]));

        let tile = render(&Toolkit::default(), LayerKind::LocalizationBarrier, decoded, &context).await;
        assert!(tile.is_none());
    }

    #[tokio::test]
    async fn test_missing_lists_render_nothing() {
        let context = MemoryContext::new(1);
        let tile = render(&Toolkit::default(), LayerKind::LocalizationSign, json!({}), &context).await;
        assert!(tile.is_none());
        assert!(context.requested().is_empty());
    }

    #[tokio::test]
    async fn test_signs_colored_by_dominant_color() {
        let center = crate::layers::tests::create_test_coordinate(13.4, 52.5);
        let signs_tile = |tile_id: u64| {
            json!({
                "here_tile_id": tile_id,
                "tile_center_here_3d_coordinate": { "here_2d_coordinate": center, "cm_from_WGS84_ellipsoid": 100 },
                "signs": [
                    { "sign_id": 1, "here_2d_coordinate": 0, "cm_from_WGS84_ellipsoid": 0, "dominant_color": 4 },
                    { "sign_id": 2, "here_2d_coordinate": 0, "cm_from_WGS84_ellipsoid": 0, "dominant_color": 5 }
                ]
            })
        };
        let mut decoded = signs_tile(1);
        decoded["road_to_signs_references"] = json!([{ "link_ref": 9, "sign_refs": [{ "sign_here_tile_id": 1, "sign_id": 1 }] }]);
        let context = MemoryContext::new(1)
            .with_tile(TOPOLOGY_GEOMETRY_LAYER, 1, json!({}))
            .with_tile(LOCALIZATION_SIGN_LAYER, 1, signs_tile(1));

        let tile = render(&Toolkit::default(), LayerKind::LocalizationSign, decoded, &context)
            .await
            .unwrap();
        assert_eq!(tile.len(), 4);
        let features = &tile.body.features;
        assert_eq!(property(&features[0], "style"), json!({ "color": "#129F03", "fill": "#129F03BB" }));
        assert_eq!(property(&features[0], "radius"), SIGN_POINT_RADIUS);
        assert_eq!(property(&features[1], "style"), json!({ "color": "#129F03", "fill": "#129F03" }));
        assert_eq!(property(&features[2], "style")["color"], SIGN_UNREFERENCED_COLOR);
        let coordinates = serde_json::to_value(features[0].geometry.as_ref().unwrap()).unwrap()["coordinates"].clone();
        assert!((coordinates[0].as_f64().unwrap() - 13.4).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_pole_without_bottom_point_is_malformed() {
        let poles = json!({
            "here_tile_id": 1,
            "tile_center_here_3d_coordinate": { "here_2d_coordinate": 0, "cm_from_WGS84_ellipsoid": 0 },
            "poles": [{ "id": 1 }]
        });
        let context = MemoryContext::new(1)
            .with_tile(TOPOLOGY_GEOMETRY_LAYER, 1, json!({}))
            .with_tile(LOCALIZATION_POLE_LAYER, 1, poles.clone());
        let result = render_poles(&Toolkit::default(), poles, &context).await;
        assert!(matches!(result, Err(RenderError::MalformedGeometry(_))));
    }

    #[test]
    fn test_link_tooltip_sorts_references() {
        let reference: RoadToEntitiesReference = serde_json::from_value(json!({
            "link_ref": 3,
            "pole_refs": [
                { "pole_here_tile_id": 2, "pole_id": 1 },
                { "pole_here_tile_id": 1, "pole_id": 9 }
            ]
        }))
        .unwrap();
        let tooltip = link_tooltip::<PoleLayer>(EntityId(3), TileId(1), Some(&reference));
        assert_eq!(tooltip, "Link 3 [1]\nPole 9 [1]\nPole 1 [2]");
        let tooltip = link_tooltip::<PoleLayer>(EntityId(3), TileId(1), None);
        assert_eq!(tooltip, "Link 3 [1]\nNo pole reference found");
    }
}
