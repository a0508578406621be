//! Host context and catalog dependency resolution
//!
//! Renderers never fetch tiles themselves: the host implements [`RenderContext`] and decides how
//! a `(catalog, layer, partition)` triple turns into decoded tile JSON.

use crate::ids::TileId;
use crate::{RenderError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub const TOPOLOGY_GEOMETRY_LAYER: &str = "topology-geometry";
pub const LANE_TOPOLOGY_LAYER: &str = "lane-topology";
pub const LANE_ATTRIBUTES_LAYER: &str = "lane-attributes";
pub const LANE_ROAD_REFERENCES_LAYER: &str = "lane-road-references";
pub const LOCALIZATION_BARRIER_LAYER: &str = "localization-barrier";
pub const LOCALIZATION_SIGN_LAYER: &str = "localization-sign";
pub const LOCALIZATION_POLE_LAYER: &str = "localization-pole";
pub const LOCALIZATION_OVERHEAD_STRUCTURE_FACE_LAYER: &str = "localization-overhead-structure-face";

/// Platform road catalogs, e.g. `here-hdmap-platform-europe-12`
static PLATFORM_ROADS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^here(-\w+)?-hdmap-platform-(\w+)-(\d+)$").expect("valid platform roads regex"));

/// Platform lanes catalogs, e.g. `here-hdmap-platform-lanes-europe-12`
static PLATFORM_LANES_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^here(-\w+)?-hdmap-platform-lanes-(\w+)-(\d+)$").expect("valid platform lanes regex"));

/// A catalog the current catalog depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDependency {
    pub name: String,
    pub hrn: String,
    pub version: Option<u64>,
}

/// Catalog to fetch a partition from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRef<'a> {
    /// The catalog the rendered tile belongs to
    Current,
    Dependency(&'a CatalogDependency),
}

/// Services the host provides to a renderer
///
/// Fetches return the decoded tile as JSON. Any failure should be reported as
/// [`RenderError::DependencyFetch`].
pub trait RenderContext: Send + Sync {
    /// Partition (tile id) being rendered
    fn partition(&self) -> TileId;

    /// Version of the current catalog
    fn version(&self) -> u64;

    /// Catalogs the current catalog depends on
    fn dependencies(&self) -> impl Future<Output = Result<Vec<CatalogDependency>>> + Send;

    /// Fetch and decode one partition of a layer
    fn fetch_partition(
        &self,
        catalog: CatalogRef<'_>,
        layer: &str,
        partition: TileId,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;
}

/// The platform roads catalog among the dependencies, if any
pub fn platform_roads_dependency(dependencies: &[CatalogDependency]) -> Option<&CatalogDependency> {
    dependencies.iter().find(|d| {
        let name = d.name.trim();
        PLATFORM_ROADS_REGEX.is_match(name) && !PLATFORM_LANES_REGEX.is_match(name)
    })
}

/// The platform lanes catalog among the dependencies, if any
///
/// Falls back to the first dependency whose HRN mentions `lanes` when no name matches.
pub fn platform_lanes_dependency(dependencies: &[CatalogDependency]) -> Option<&CatalogDependency> {
    dependencies
        .iter()
        .find(|d| PLATFORM_LANES_REGEX.is_match(d.name.trim()))
        .or_else(|| dependencies.iter().find(|d| d.hrn.contains("lanes")))
}

/// Fetch `layer` for the current partition from the platform lanes catalog
///
/// # Returns
/// The decoded tile, [`RenderError::DependencyNotFound`] when no lanes catalog is declared
pub async fn fetch_from_platform_lanes<C: RenderContext>(context: &C, layer: &str) -> Result<serde_json::Value> {
    let dependencies = context.dependencies().await?;
    let Some(lanes) = platform_lanes_dependency(&dependencies) else {
        return Err(RenderError::DependencyNotFound(format!(
            "no platform lanes catalog among {} dependencies",
            dependencies.len()
        )));
    };
    tracing::debug!("Using platform lanes catalog {} ({})", lanes.name, lanes.hrn);
    context
        .fetch_partition(CatalogRef::Dependency(lanes), layer, context.partition())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dependency(name: &str, hrn: &str) -> CatalogDependency {
        CatalogDependency {
            name: name.to_string(),
            hrn: hrn.to_string(),
            version: Some(3),
        }
    }

    #[test]
    fn test_platform_regexes() {
        assert!(PLATFORM_ROADS_REGEX.is_match("here-hdmap-platform-europe-12"));
        assert!(PLATFORM_ROADS_REGEX.is_match("here-dev-hdmap-platform-europe-12"));
        assert!(PLATFORM_LANES_REGEX.is_match("here-hdmap-platform-lanes-europe-12"));
        assert!(!PLATFORM_LANES_REGEX.is_match("here-hdmap-platform-europe-12"));
        assert!(!PLATFORM_ROADS_REGEX.is_match("hdmap-platform-europe"));
    }

    #[test]
    fn test_platform_roads_dependency() {
        let dependencies = vec![
            create_test_dependency("here-hdmap-platform-lanes-europe-12", "hrn:here:data::olp-here-had:lanes"),
            create_test_dependency(" here-hdmap-platform-europe-12 ", "hrn:here:data::olp-here-had:roads"),
        ];
        let roads = platform_roads_dependency(&dependencies).unwrap();
        assert_eq!(roads.hrn, "hrn:here:data::olp-here-had:roads");
        assert!(platform_roads_dependency(&dependencies[..1]).is_none());
    }

    #[test]
    fn test_platform_lanes_dependency() {
        let dependencies = vec![
            create_test_dependency("here-hdmap-platform-europe-12", "hrn:roads"),
            create_test_dependency("here-dev-hdmap-platform-lanes-europe-3", "hrn:x"),
        ];
        assert_eq!(platform_lanes_dependency(&dependencies).unwrap().hrn, "hrn:x");
    }

    #[test]
    fn test_platform_lanes_falls_back_to_hrn() {
        let dependencies = vec![
            create_test_dependency("roads", "hrn:roads"),
            create_test_dependency("custom", "hrn:here:data::org:my-lanes"),
        ];
        assert_eq!(platform_lanes_dependency(&dependencies).unwrap().name, "custom");
        assert!(platform_lanes_dependency(&dependencies[..1]).is_none());
    }
}
