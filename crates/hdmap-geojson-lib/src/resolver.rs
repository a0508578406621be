//! Cross-tile reference resolution
//!
//! Localization and routing layers reference entities stored in neighboring tiles. Resolution
//! collects the referenced tile ids, fetches every tile concurrently (all-or-nothing) and tags
//! each entity with the tile it came from, so geometry can be decoded against the right center.

use crate::catalog::{CatalogRef, RenderContext};
use crate::ids::{EntityId, TileId};
use crate::{RenderError, Result};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Reference to an entity in a (possibly different) tile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TiledRef {
    #[serde(
        default,
        alias = "barrier_here_tile_id",
        alias = "sign_here_tile_id",
        alias = "pole_here_tile_id",
        alias = "overhead_structure_face_here_tile_id",
        alias = "lane_group_here_tile_id",
        alias = "here_tile_id"
    )]
    pub tile_id: TileId,
    #[serde(
        default,
        alias = "barrier_id",
        alias = "sign_id",
        alias = "pole_id",
        alias = "overhead_structure_face_id",
        alias = "lane_group_id"
    )]
    pub id: EntityId,
}

/// Entities a road link refers to
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoadToEntitiesReference {
    #[serde(default)]
    pub link_ref: EntityId,
    #[serde(
        default,
        alias = "barrier_refs",
        alias = "sign_refs",
        alias = "pole_refs",
        alias = "overhead_structure_face_refs"
    )]
    pub refs: Vec<TiledRef>,
}

/// Stages of a cross-tile render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Idle,
    CollectingReferences,
    FetchingTiles,
    Merging,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Idle => "idle",
            RenderStage::CollectingReferences => "collecting-references",
            RenderStage::FetchingTiles => "fetching-tiles",
            RenderStage::Merging => "merging",
            RenderStage::Rendering => "rendering",
            RenderStage::Done => "done",
            RenderStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl RenderStage {
    /// Log entering this stage
    #[inline]
    pub fn enter(self, layer: &str) {
        tracing::debug!(stage = %self, layer, "Render stage");
    }
}

/// A tile record that holds a list of entities positioned relative to a tile center
pub trait TiledEntities: DeserializeOwned + Send {
    type Entity: Send;
    type Center: Clone + Send;

    /// Tile id stored in the payload, unset when 0
    fn here_tile_id(&self) -> TileId;

    fn center(&self) -> Option<Self::Center>;

    /// Consume the record, keeping only its entity list (empty when absent)
    fn into_entities(self) -> Vec<Self::Entity>;
}

/// An entity together with the tile it was loaded from
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<E, C> {
    pub tile_id: TileId,
    pub tile_center: C,
    pub entity: E,
}

/// Current tile plus every tile referenced from `references`
///
/// # Returns
/// A sorted set that always contains `current`
pub fn collect_referenced_tile_ids(current: TileId, references: &[RoadToEntitiesReference]) -> BTreeSet<TileId> {
    let mut tile_ids = BTreeSet::new();
    tile_ids.insert(current);
    tile_ids.extend(references.iter().flat_map(|r| r.refs.iter().map(|e| e.tile_id)));
    tile_ids
}

/// Whether any reference points at `(tile_id, entity_id)`. Unset ids never match.
pub fn is_entity_referenced_by_links(
    tile_id: TileId,
    entity_id: EntityId,
    references: &[RoadToEntitiesReference],
) -> bool {
    entity_id.is_set()
        && references
            .iter()
            .flat_map(|r| r.refs.iter())
            .any(|e| e.tile_id == tile_id && e.id == entity_id)
}

/// Decode one fetched payload into tagged entities
fn tag_payload<T: TiledEntities>(
    layer: &str,
    requested: TileId,
    payload: serde_json::Value,
) -> Result<Vec<Tagged<T::Entity, T::Center>>> {
    let record: T = serde_json::from_value(payload)
        .map_err(|e| RenderError::MalformedInput(format!("{layer} tile {requested}: {e}")))?;
    let tile_id = match record.here_tile_id() {
        TileId(0) => requested,
        tile_id => tile_id,
    };
    let center = record.center();
    let entities = record.into_entities();
    if entities.is_empty() {
        return Ok(Vec::new());
    }
    let Some(tile_center) = center else {
        return Err(RenderError::MalformedInput(format!(
            "{layer} tile {tile_id} has {} entities but no tile center",
            entities.len()
        )));
    };
    Ok(entities
        .into_iter()
        .map(|entity| Tagged {
            tile_id,
            tile_center: tile_center.clone(),
            entity,
        })
        .collect())
}

/// Fetch `layer` for every tile id and flatten the entities, tagged with their origin
///
/// # Arguments
/// * `context` - Host context used for fetching
/// * `catalog` - Catalog to fetch from
/// * `layer` - Layer name
/// * `tile_ids` - Tiles to fetch, one request each
///
/// # Returns
/// Entities in tile id order. The first failed fetch or malformed payload fails the whole call.
pub async fn fetch_and_tag_entities<T, C>(
    context: &C,
    catalog: CatalogRef<'_>,
    layer: &str,
    tile_ids: &BTreeSet<TileId>,
) -> Result<Vec<Tagged<T::Entity, T::Center>>>
where
    T: TiledEntities,
    C: RenderContext,
{
    tracing::debug!("Fetching {layer} for {} tiles", tile_ids.len());
    let payloads = try_join_all(tile_ids.iter().map(|&tile_id| async move {
        context
            .fetch_partition(catalog, layer, tile_id)
            .await
            .map(|payload| (tile_id, payload))
    }))
    .await?;

    let mut tagged = Vec::new();
    for (tile_id, payload) in payloads {
        tagged.extend(tag_payload::<T>(layer, tile_id, payload)?);
    }
    tracing::debug!("Loaded {} entities from {layer}", tagged.len());
    Ok(tagged)
}
