//! Road topology: links as lines and nodes as small squares

use super::{Toolkit, with_properties};
use crate::feature::{RenderedTile, Style};
use crate::geometry::{LineString2d, Point2d};
use crate::ids::Coordinate2d;
use crate::tiles::TopologyGeometryTile;
use crate::{RenderError, Result};
use geojson::{Feature, JsonObject, JsonValue};
use rayon::prelude::*;

/// Half side of a node square in degrees
const NODE_HALF_SIDE_DEG: f64 = 0.000025;

fn id_properties(id: impl Into<JsonValue>) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), id.into());
    properties
}

/// Square ring around a point, clockwise from the north-west corner
fn node_square(center: &Point2d) -> LineString2d {
    let d = NODE_HALF_SIDE_DEG;
    LineString2d::new(vec![
        Point2d::new(center.latitude + d, center.longitude - d),
        Point2d::new(center.latitude + d, center.longitude + d),
        Point2d::new(center.latitude - d, center.longitude + d),
        Point2d::new(center.latitude - d, center.longitude - d),
    ])
}

pub(crate) fn render(toolkit: &Toolkit, decoded: serde_json::Value) -> Result<Option<RenderedTile>> {
    let tile: TopologyGeometryTile = serde_json::from_value(decoded)
        .map_err(|e| RenderError::MalformedInput(format!("topology-geometry tile: {e}")))?;
    let (Some(center), Some(nodes), Some(links)) = (
        tile.tile_center_here_2d_coordinate,
        tile.nodes_in_tile,
        tile.links_starting_in_tile,
    ) else {
        return Ok(None);
    };

    let style = Style::stroke("blue", 2.0);
    let link_features: Vec<Feature> = links
        .par_iter()
        .filter_map(|link| {
            let line = toolkit.decoder.line_string_2d(link.geometry.as_ref()?, center);
            toolkit
                .features
                .line_string(&line, &style, "", Some(id_properties(link.link_id.0)))
        })
        .collect();

    let node_style = Style::stroke("black", 2.0);
    let mut features = link_features;
    for node in &nodes {
        let Some(geometry) = &node.geometry else {
            return Err(RenderError::MalformedGeometry(format!("node {} has no geometry", node.node_id)));
        };
        let point = toolkit
            .decoder
            .point_2d(Coordinate2d(geometry.here_2d_coordinate.0 ^ center.0), 0);
        let square = toolkit.features.polygon(&node_square(&point), &node_style, "");
        features.extend(square.map(|f| with_properties(f, id_properties(node.node_id.0))));
    }
    tracing::debug!("Rendered {} links and {} nodes", links.len(), nodes.len());

    Ok(Some(RenderedTile::new(toolkit.features.collection(features))))
}
