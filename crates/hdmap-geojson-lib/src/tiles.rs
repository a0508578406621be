//! Decoded tile records
//!
//! Each layer payload arrives as the JSON form of its decoded binary tile. The records below
//! keep only the fields the renderers read. Optional top-level lists are `Option` so a renderer
//! can tell an absent list from an empty one; nested lists default to empty.

use crate::ids::{Coordinate2d, Elevation, EntityId, TileId};
use crate::resolver::{RoadToEntitiesReference, TiledEntities, TiledRef};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------------------------
// Shared geometry records
// ---------------------------------------------------------------------------------------------

/// 2D line string as XOR deltas from the tile center
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineString2dOffset {
    pub here_2d_coordinate_diffs: Vec<Coordinate2d>,
    pub z_level_indexes: Vec<i32>,
}

/// 3D line string as XOR deltas from the 3D tile center
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineString3dOffset {
    pub here_2d_coordinate_diffs: Vec<Coordinate2d>,
    #[serde(rename = "cm_from_WGS84_ellipsoid_diffs")]
    pub cm_from_wgs84_ellipsoid_diffs: Vec<Elevation>,
}

/// Single 3D point as an XOR offset from the 3D tile center
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Point3dOffset {
    pub here_2d_coordinate: Option<Coordinate2d>,
    #[serde(rename = "cm_from_WGS84_ellipsoid")]
    pub cm_from_wgs84_ellipsoid: Option<Elevation>,
}

/// Absolute 3D tile center
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCenter3d {
    pub here_2d_coordinate: Coordinate2d,
    #[serde(rename = "cm_from_WGS84_ellipsoid")]
    pub cm_from_wgs84_ellipsoid: Elevation,
}

/// Absolute 2D point, used by the landmark layers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsolutePoint {
    pub here_2d_coordinate: Coordinate2d,
}

/// Range given as offsets from both ends of a line
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametricRangeOffsets {
    pub range_offset_from_start: Option<f64>,
    pub range_offset_from_end: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecificationCompliance {
    pub compliant_with_specification_ref: Option<i64>,
}

// ---------------------------------------------------------------------------------------------
// topology-geometry
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopologyGeometryTile {
    pub here_tile_id: TileId,
    pub tile_center_here_2d_coordinate: Option<Coordinate2d>,
    pub nodes_in_tile: Option<Vec<Node>>,
    pub links_starting_in_tile: Option<Vec<Link>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Link {
    pub link_id: EntityId,
    pub geometry: Option<LineString2dOffset>,
    pub link_length_meters: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Node {
    pub node_id: EntityId,
    pub geometry: Option<AbsolutePoint>,
}

impl TiledEntities for TopologyGeometryTile {
    type Entity = Link;
    type Center = Coordinate2d;

    fn here_tile_id(&self) -> TileId {
        self.here_tile_id
    }

    fn center(&self) -> Option<Coordinate2d> {
        self.tile_center_here_2d_coordinate
    }

    fn into_entities(self) -> Vec<Link> {
        self.links_starting_in_tile.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------------------------
// lane-topology and lane-attributes
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneTopologyTile {
    pub here_tile_id: TileId,
    pub tile_center_here_2d_coordinate: Option<Coordinate2d>,
    pub lane_groups_starting_in_tile: Option<Vec<LaneGroup>>,
    pub lane_group_connectors_in_tile: Option<Vec<LaneGroupConnector>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroup {
    pub lane_group_id: EntityId,
    pub boundary_geometry: Option<LaneGroupBoundary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroupBoundary {
    pub left_boundary: Option<LineString2dOffset>,
    pub right_boundary: Option<LineString2dOffset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroupConnector {
    pub lane_group_connector_id: EntityId,
    pub boundary_geometry: Option<LineString2dOffset>,
}

impl TiledEntities for LaneTopologyTile {
    type Entity = LaneGroup;
    type Center = Coordinate2d;

    fn here_tile_id(&self) -> TileId {
        self.here_tile_id
    }

    fn center(&self) -> Option<Coordinate2d> {
        self.tile_center_here_2d_coordinate
    }

    fn into_entities(self) -> Vec<LaneGroup> {
        self.lane_groups_starting_in_tile.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneAttributesTile {
    pub lane_group_attribution: Vec<LaneGroupAttribution>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroupAttribution {
    pub lane_group_ref: EntityId,
    pub parametric_attribution: Vec<LaneGroupParametricAttributions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroupParametricAttributions {
    pub lane_group_parametric_attribution: Vec<LaneGroupParametricAttribution>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroupParametricAttribution {
    pub specification_compliance: Option<SpecificationCompliance>,
}

// ---------------------------------------------------------------------------------------------
// lane-geometry-polyline
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGeometryPolylineTile {
    pub tile_center_here_3d_coordinate: Option<TileCenter3d>,
    pub lane_group_geometries: Option<Vec<LaneGroupGeometry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroupGeometry {
    pub lane_boundary_geometries: Vec<LaneBoundaryGeometry>,
    pub lane_geometries: Vec<LaneGeometry>,
    pub reference_geometry: Option<LineString2dOffset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneBoundaryGeometry {
    pub geometry: Option<LineString2dOffset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGeometry {
    pub lane_path_geometry: Option<LineString2dOffset>,
}

// ---------------------------------------------------------------------------------------------
// localization-*
// ---------------------------------------------------------------------------------------------

/// Generates a localization tile record with its entity list and link back-references
macro_rules! localization_tile {
    ($(#[$meta:meta])* $name:ident, $entity:ty, $entities:ident, $references:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Deserialize)]
        #[serde(default)]
        pub struct $name {
            pub here_tile_id: TileId,
            pub tile_center_here_3d_coordinate: Option<TileCenter3d>,
            pub $entities: Option<Vec<$entity>>,
            pub $references: Option<Vec<RoadToEntitiesReference>>,
        }

        impl TiledEntities for $name {
            type Entity = $entity;
            type Center = TileCenter3d;

            fn here_tile_id(&self) -> TileId {
                self.here_tile_id
            }

            fn center(&self) -> Option<TileCenter3d> {
                self.tile_center_here_3d_coordinate
            }

            fn into_entities(self) -> Vec<$entity> {
                self.$entities.unwrap_or_default()
            }
        }

        impl crate::layers::localization::LocalizationTile for $name {
            fn has_entities(&self) -> bool {
                self.$entities.is_some()
            }

            fn take_references(&mut self) -> Option<Vec<RoadToEntitiesReference>> {
                self.$references.take()
            }
        }
    };
}

localization_tile!(
    /// `localization-barrier` tile
    BarriersTile, Barrier, barriers, road_to_barriers_references
);
localization_tile!(
    /// `localization-sign` tile
    SignsTile, Sign, signs, road_to_signs_references
);
localization_tile!(
    /// `localization-pole` tile
    PolesTile, Pole, poles, road_to_poles_references
);
localization_tile!(
    /// `localization-overhead-structure-face` tile
    OverheadStructureFacesTile,
    OverheadStructureFace,
    overhead_structure_faces,
    road_to_overhead_structure_faces_references
);

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Barrier {
    pub barrier_id: EntityId,
    #[serde(rename = "type")]
    pub barrier_type: i32,
    pub top_geometry: Option<LineString3dOffset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sign {
    pub sign_id: EntityId,
    pub here_2d_coordinate: Option<Coordinate2d>,
    #[serde(rename = "cm_from_WGS84_ellipsoid")]
    pub cm_from_wgs84_ellipsoid: Option<Elevation>,
    pub dominant_color: i32,
    pub exterior_shape: i32,
    pub heading_degrees: Option<f64>,
    pub exterior_width_cm: Option<f64>,
    pub exterior_height_cm: Option<f64>,
    pub classification: Option<SignClassification>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignClassification {
    #[serde(rename = "type")]
    pub classification_type: i32,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pole {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub pole_type: i32,
    pub bottom_center_point: Option<Point3dOffset>,
    pub bottom_diameter_cm: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OverheadStructureFace {
    pub id: EntityId,
    pub vertical_surface: Option<VerticalSurface>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerticalSurface {
    pub bottom: Option<LineString3dOffset>,
}

// ---------------------------------------------------------------------------------------------
// routing-attributes and lane-road-references
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingAttributesTile {
    pub here_tile_id: TileId,
    pub link_attribution: Option<Vec<LinkAttribution>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkAttribution {
    pub link_local_ref: EntityId,
    pub parametric_attribution: Vec<LinkParametricAttributions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkParametricAttributions {
    pub applies_to_range: Option<ParametricRangeOffsets>,
    pub link_parametric_attribution: Vec<LinkParametricAttribution>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkParametricAttribution {
    pub infrastructure_separation: Option<InfrastructureSeparation>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct InfrastructureSeparation {
    pub present_on_side: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneRoadReferencesTile {
    pub link_lane_group_references: Vec<LinkLaneGroupReferences>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkLaneGroupReferences {
    pub link_local_ref: EntityId,
    pub lane_group_references: Vec<LaneGroupReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaneGroupReference {
    pub lane_group_ref: Option<TiledRef>,
}

// ---------------------------------------------------------------------------------------------
// landmark-* and the platform lanes catalog
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LandmarkBarriersTile {
    pub here_tile_id: Option<TileId>,
    pub tile_center_here_3d_coordinate: Option<TileCenter3d>,
    pub barriers_for_lane_groups: Option<Vec<IgnoredAny>>,
    pub barriers: Vec<LandmarkBarrier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LandmarkBarrier {
    pub id: serde_json::Value,
    #[serde(rename = "type")]
    pub barrier_type: i32,
    pub barrier_geometry: Option<LineString2dOffset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LandmarkObstaclesTile {
    pub here_tile_id: Option<TileId>,
    pub tile_center_here_2d_coordinate: Option<Coordinate2d>,
    pub obstacles_for_lane_groups: Option<Vec<ObstaclesForLaneGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObstaclesForLaneGroup {
    pub obstacles: Vec<Obstacle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Obstacle {
    pub id: serde_json::Value,
    pub specification_compliance: Option<SpecificationCompliance>,
    pub geometry: Option<LineString2dOffset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LandmarkPolesTile {
    pub here_tile_id: Option<TileId>,
    pub poles_for_lane_groups: Option<Vec<PolesForLaneGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolesForLaneGroup {
    pub lane_group_ref: EntityId,
    pub poles: Vec<LandmarkPole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LandmarkPole {
    pub id: serde_json::Value,
    pub specification_compliance: Option<SpecificationCompliance>,
    pub bottom_center_point: Option<AbsolutePoint>,
    pub top_center_point: Option<AbsolutePoint>,
    pub bottom_cross_section_diameter_cm: f64,
    pub top_cross_section_diameter_cm: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LandmarkSignsTile {
    pub here_tile_id: Option<TileId>,
    pub sign_faces: Option<Vec<SignFace>>,
    pub rectangular_sign_boards: Option<Vec<IgnoredAny>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignFace {
    pub id: serde_json::Value,
    pub shape: i32,
    pub heading: Option<f64>,
    pub center_point: Option<AbsolutePoint>,
    pub classification: Option<SignFaceClassification>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignFaceClassification {
    pub classification: serde_json::Value,
}

/// `lane-topology` tile of the platform lanes catalog, with points already in degrees
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformLaneTopologyTile {
    pub lane_groups_starting_in_tile: Vec<PlatformLaneGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformLaneGroup {
    pub id: Option<PlatformId>,
    pub boundary_geometry: Option<PlatformBoundary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformId {
    pub uri: String,
}

impl PlatformId {
    /// Identifier part of the URI, after the last `:`
    pub fn local_id(&self) -> &str {
        self.uri.rsplit(':').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformBoundary {
    pub left_boundary: Option<PlatformLineString>,
    pub right_boundary: Option<PlatformLineString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformLineString {
    pub linestring_points: Vec<PlatformPoint>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PlatformPoint {
    pub latitude_degrees: f64,
    pub longitude_degrees: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_localization_tile_with_references() {
        let tile: BarriersTile = serde_json::from_value(json!({
            "here_tile_id": "23618402",
            "tile_center_here_3d_coordinate": {
                "here_2d_coordinate": 1234,
                "cm_from_WGS84_ellipsoid": -50
            },
            "barriers": [{
                "barrier_id": 7,
                "type": 2,
                "top_geometry": {
                    "here_2d_coordinate_diffs": [1, 2],
                    "cm_from_WGS84_ellipsoid_diffs": [3]
                }
            }],
            "road_to_barriers_references": [{
                "link_ref": 11,
                "barrier_refs": [{ "barrier_here_tile_id": 23618403, "barrier_id": "7" }]
            }]
        }))
        .unwrap();

        assert_eq!(tile.here_tile_id, TileId(23618402));
        let center = tile.tile_center_here_3d_coordinate.unwrap();
        assert_eq!(center.cm_from_wgs84_ellipsoid, Elevation(-50));
        let barrier = &tile.barriers.as_ref().unwrap()[0];
        assert_eq!(barrier.barrier_type, 2);
        assert_eq!(barrier.top_geometry.as_ref().unwrap().cm_from_wgs84_ellipsoid_diffs, vec![Elevation(3)]);
        let references = tile.road_to_barriers_references.as_ref().unwrap();
        assert_eq!(references[0].link_ref, EntityId(11));
        assert_eq!(
            references[0].refs,
            vec![TiledRef {
                tile_id: TileId(23618403),
                id: EntityId(7)
            }]
        );
    }

    #[test]
    fn test_reference_field_aliases() {
        let signs: RoadToEntitiesReference = serde_json::from_value(json!({
            "link_ref": 1,
            "sign_refs": [{ "sign_here_tile_id": 5, "sign_id": 6 }]
        }))
        .unwrap();
        assert_eq!(signs.refs[0], TiledRef { tile_id: TileId(5), id: EntityId(6) });

        let osf: RoadToEntitiesReference = serde_json::from_value(json!({
            "link_ref": 1,
            "overhead_structure_face_refs": [{
                "overhead_structure_face_here_tile_id": 8,
                "overhead_structure_face_id": 9
            }]
        }))
        .unwrap();
        assert_eq!(osf.refs[0], TiledRef { tile_id: TileId(8), id: EntityId(9) });
    }

    #[test]
    fn test_absent_lists_stay_absent() {
        let tile: TopologyGeometryTile = serde_json::from_value(json!({ "here_tile_id": 1 })).unwrap();
        assert!(tile.links_starting_in_tile.is_none());
        assert!(tile.nodes_in_tile.is_none());
        assert!(tile.into_entities().is_empty());
    }

    #[test]
    fn test_invalid_delta_rejected() {
        let result: Result<LineString2dOffset, _> =
            serde_json::from_value(json!({ "here_2d_coordinate_diffs": [1, "not a number"] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_platform_id_local_part() {
        let id = PlatformId {
            uri: "here:cmv:lanegroup:1234567".to_string(),
        };
        assert_eq!(id.local_id(), "1234567");
    }

    #[test]
    fn test_routing_attribution_records() {
        let tile: RoutingAttributesTile = serde_json::from_value(json!({
            "link_attribution": [{
                "link_local_ref": 3,
                "parametric_attribution": [{
                    "applies_to_range": { "range_offset_from_start": 0.25 },
                    "link_parametric_attribution": [
                        { "infrastructure_separation": { "present_on_side": 3 } },
                        {}
                    ]
                }]
            }]
        }))
        .unwrap();
        let attribution = &tile.link_attribution.unwrap()[0];
        let parametric = &attribution.parametric_attribution[0];
        assert_eq!(parametric.applies_to_range.unwrap().range_offset_from_start, Some(0.25));
        assert_eq!(parametric.link_parametric_attribution.len(), 2);
        assert_eq!(
            parametric.link_parametric_attribution[0]
                .infrastructure_separation
                .unwrap()
                .present_on_side,
            3
        );
    }
}
