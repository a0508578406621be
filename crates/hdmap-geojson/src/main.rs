//! HD Map GeoJSON - Command line host for the layer renderers
//!
//! Reads a decoded tile from a catalog directory (or a file), renders it with
//! [`hdmap_geojson_lib::layers::render`] and writes the GeoJSON result to stdout or a file.
//! Cross-tile layers fetch their neighbors from the same directory.

mod catalog;
mod cli;
mod error;
mod logging;
mod settings;

use catalog::{DirectoryCatalog, read_json};
use error::{AppError, Result};
use hdmap_geojson_lib::layers::render;
use hdmap_geojson_lib::{RenderConfig, Toolkit};
use settings::{CATALOG_DIR_ENV, Settings};
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;

async fn load_config(settings: &Settings) -> Result<RenderConfig> {
    match &settings.config {
        Some(path) => {
            let config: RenderConfig = read_json(path)
                .await
                .map_err(|e| AppError::Config(format!("invalid render configuration: {e}")))?;
            tracing::info!("Loaded render configuration from {}", path.display());
            Ok(config)
        }
        None => Ok(RenderConfig::default()),
    }
}

async fn run(settings: Settings) -> Result<()> {
    let Some(catalog_dir) = settings.catalog_dir() else {
        return Err(AppError::Config(format!(
            "no catalog directory, pass --catalog-dir or set {CATALOG_DIR_ENV}"
        )));
    };
    let config = load_config(&settings).await?;
    let catalog = DirectoryCatalog::new(catalog_dir, settings.partition, settings.catalog_version);

    let decoded = match &settings.input {
        Some(path) => read_json(path).await?,
        None => catalog.read_current(settings.layer.name()).await?,
    };

    let toolkit = Toolkit::new(config);
    let Some(tile) = render(&toolkit, settings.layer, decoded, &catalog).await else {
        return Err(AppError::NothingRendered {
            layer: settings.layer,
            partition: settings.partition,
        });
    };

    let output = if settings.pretty {
        serde_json::to_vec_pretty(&tile)?
    } else {
        serde_json::to_vec(&tile)?
    };
    match &settings.output {
        Some(path) => {
            tokio::fs::write(path, &output).await.map_err(|e| AppError::io(path, e))?;
            tracing::info!("Wrote {} features to {}", tile.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&output).await.map_err(|e| AppError::io("<stdout>", e))?;
            stdout.write_all(b"\n").await.map_err(|e| AppError::io("<stdout>", e))?;
            stdout.flush().await.map_err(|e| AppError::io("<stdout>", e))?;
        }
    }
    Ok(())
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    #[cfg(feature = "native")]
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    #[cfg(not(feature = "native"))]
    let mut builder = tokio::runtime::Builder::new_current_thread();
    builder.enable_all().build().map_err(AppError::Runtime)
}

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    logging::setup_logging();
    logging::log_version_info();

    let result = build_runtime().and_then(|rt| rt.block_on(run(settings)));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::catalog::tests::{create_test_dir, write_test_json};
    use super::*;
    use clap::Parser;
    use hdmap_geojson_lib::{LayerKind, MortonMapper, TileId};
    use serde_json::json;

    fn create_test_settings(catalog_dir: &std::path::Path, layer: &str, extra: &[&str]) -> Settings {
        let catalog_dir = catalog_dir.to_string_lossy().to_string();
        let mut args = vec!["hdmap-geojson", "--catalog-dir", catalog_dir.as_str(), "--layer", layer, "--partition", "7"];
        args.extend_from_slice(extra);
        Settings::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn test_run_writes_geojson() {
        let dir = create_test_dir("run");
        let start = MortonMapper::encode(13.4, 52.5);
        let end = MortonMapper::encode(13.41, 52.5);
        write_test_json(
            &dir.join("topology-geometry/7.json"),
            &json!({
                "here_tile_id": 7,
                "tile_center_here_2d_coordinate": 0,
                "nodes_in_tile": [],
                "links_starting_in_tile": [{
                    "link_id": 1,
                    "geometry": { "here_2d_coordinate_diffs": [start, start ^ end] }
                }]
            }),
        );
        let output = dir.join("out.geojson");
        let output_arg = output.to_string_lossy().to_string();
        let settings = create_test_settings(&dir, "topology-geometry", &["--output", output_arg.as_str(), "--pretty"]);
        run(settings).await.unwrap();

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["contentType"], hdmap_geojson_lib::GEOJSON_CONTENT_TYPE);
        assert_eq!(written["body"]["features"].as_array().unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_run_nothing_rendered() {
        let dir = create_test_dir("nothing");
        write_test_json(&dir.join("landmark-signs/7.json"), &json!({ "sign_faces": [] }));
        let settings = create_test_settings(&dir, "landmark-signs", &[]);
        let err = run(settings).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::NothingRendered {
                layer: LayerKind::LandmarkSigns,
                partition: TileId(7)
            }
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_invalid_config_is_reported() {
        let dir = create_test_dir("config");
        let config = dir.join("config.json");
        std::fs::write(&config, "{ not json").unwrap();
        let config_arg = config.to_string_lossy().to_string();
        let settings = create_test_settings(&dir, "topology-geometry", &["--config", config_arg.as_str()]);
        assert!(matches!(load_config(&settings).await, Err(AppError::Config(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
