//! Catalog stored as decoded tiles in a directory
//!
//! Layout:
//! - `<root>/<layer>/<partition>.json` for the catalog itself
//! - `<root>/dependencies.json`, a list of `{ name, hrn, version }` (optional)
//! - `<root>/dependencies/<name>/<layer>/<partition>.json` for each dependency

use crate::error::{AppError, Result};
use hdmap_geojson_lib::{CatalogDependency, CatalogRef, RenderContext, RenderError, TileId};
use std::path::{Path, PathBuf};

const DEPENDENCIES_FILE: &str = "dependencies.json";
const DEPENDENCIES_DIR: &str = "dependencies";

/// Render context backed by a catalog directory
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
    partition: TileId,
    version: u64,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>, partition: TileId, version: u64) -> Self {
        Self {
            root: root.into(),
            partition,
            version,
        }
    }

    /// Path of a decoded partition
    pub fn partition_path(&self, catalog: CatalogRef<'_>, layer: &str, partition: TileId) -> PathBuf {
        let base = match catalog {
            CatalogRef::Current => self.root.clone(),
            CatalogRef::Dependency(dependency) => self.root.join(DEPENDENCIES_DIR).join(dependency.name.trim()),
        };
        base.join(layer).join(format!("{partition}.json"))
    }

    /// Read the decoded tile being rendered
    pub async fn read_current(&self, layer: &str) -> Result<serde_json::Value> {
        read_json(&self.partition_path(CatalogRef::Current, layer, self.partition)).await
    }
}

/// Read and parse a JSON file
pub async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

impl RenderContext for DirectoryCatalog {
    fn partition(&self) -> TileId {
        self.partition
    }

    fn version(&self) -> u64 {
        self.version
    }

    async fn dependencies(&self) -> hdmap_geojson_lib::Result<Vec<CatalogDependency>> {
        let path = self.root.join(DEPENDENCIES_FILE);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!("No {} in {}", DEPENDENCIES_FILE, self.root.display());
            return Ok(Vec::new());
        }
        read_json(&path)
            .await
            .map_err(|e| RenderError::MalformedInput(e.to_string()))
    }

    async fn fetch_partition(
        &self,
        catalog: CatalogRef<'_>,
        layer: &str,
        partition: TileId,
    ) -> hdmap_geojson_lib::Result<serde_json::Value> {
        let path = self.partition_path(catalog, layer, partition);
        tracing::debug!("Reading {}", path.display());
        read_json(&path).await.map_err(|e| RenderError::DependencyFetch {
            layer: layer.to_string(),
            partition,
            reason: e.to_string(),
        })
    }
}
