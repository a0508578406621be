use crate::cli::{get_env, parse_args};
use clap::Parser;
use hdmap_geojson_lib::{LayerKind, TileId};
use std::path::PathBuf;

/// Environment variable holding the catalog directory when `--catalog-dir` is absent
pub const CATALOG_DIR_ENV: &str = "HDMAP_CATALOG_DIR";

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// HD Map GeoJSON - Render decoded HD map tiles from a catalog directory as GeoJSON
pub struct Settings {
    /// Catalog directory with decoded tiles as <layer>/<partition>.json
    #[clap(short, long, value_name = "DIR")]
    pub catalog_dir: Option<PathBuf>,

    /// Layer of the tile to render (e.g. topology-geometry, localization-barrier)
    #[clap(short, long)]
    pub layer: LayerKind,

    /// Partition (HERE tile id) to render
    #[clap(short, long)]
    pub partition: TileId,

    /// Decoded tile to render instead of the catalog one
    #[clap(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write the rendered tile here instead of stdout
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Render configuration (JSON, every field optional)
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Version of the catalog, reported to the renderers
    #[clap(long, default_value = "1")]
    pub catalog_version: u64,

    /// Pretty-print the output JSON
    #[clap(long, default_value = "false")]
    pub pretty: bool,
}

impl Settings {
    /// Parse the command line, exiting with usage on errors
    pub fn from_cli() -> Self {
        match parse_args::<Settings>() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Catalog directory from the flag or the environment
    pub fn catalog_dir(&self) -> Option<PathBuf> {
        self.catalog_dir.clone().or_else(|| get_env(CATALOG_DIR_ENV))
    }
}
