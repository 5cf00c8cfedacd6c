// geodata-extractor - turns decoded world packages into per-map triangle
// geometry for the offline geodata builder.
//
// One map at a time: terrain (stitched against its neighbors), static-mesh
// actors, level BSP geometry and blocking volumes are extracted into placed
// entities, folded into a single flattened mesh, and exported.

use std::path::Path;

use clap::Parser;

mod bsp;
mod export;
mod extract;
mod map;
mod material;
mod math;
mod mesh;
mod scene;
mod statics;
mod terrain;

use geodata_shared::log::{initialize_logging, map_log_level};

use crate::export::{BuilderSettings, Exporter};
use crate::extract::Extractor;
use crate::map::Map;
use crate::scene::PackageStore;

#[derive(Parser, Debug)]
#[command(name = "geodata-extractor")]
#[command(about = "World geometry extractor for the geodata builder")]
#[command(version)]
struct Cli {
    /// Directory with decoded package files
    #[arg(short = 'r', long = "root", default_value = ".")]
    root_path: String,

    /// Output directory for exported map geometry
    #[arg(short = 'o', long = "output", default_value = "output")]
    output_path: String,

    /// Geodata builder settings (JSON); defaults apply without one
    #[arg(short = 'c', long = "config")]
    config_path: Option<String>,

    /// Console log level override (0=Error, 1=Warn, 2=Info, 3=Debug, 4=Trace)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<i32>,

    /// Map package names to extract (e.g. 22_22)
    #[arg(required = true)]
    maps: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    initialize_logging(None, map_log_level(cli.log_level.unwrap_or(2)));

    let settings = match &cli.config_path {
        Some(path) => BuilderSettings::load(Path::new(path))?,
        None => BuilderSettings::default(),
    };

    let store = PackageStore::new(&cli.root_path);
    let exporter = Exporter::new(&cli.output_path)?;
    let mut extractor = Extractor::new(&store);

    let mut missing = 0usize;

    for name in &cli.maps {
        tracing::info!("Extracting map: {}", name);

        let Some(loaded) = extractor.load_map(name)? else {
            tracing::warn!("Package not found for map: {}", name);
            missing += 1;
            continue;
        };

        let mut map = Map::new(&loaded.name, loaded.bounding_box);

        // Wireframe entities are viewer-only; the builder gets solids.
        for entity in loaded.entities.iter().filter(|entity| !entity.wireframe) {
            map.add(entity, extractor.arena().get(entity.mesh));
        }

        tracing::info!(
            "Map {}: {} entities, {} vertices, {} triangles",
            map.name(),
            loaded.entities.len(),
            map.vertices().len(),
            map.indices().len() / 3
        );

        exporter.export(&map, &settings)?;
    }

    if missing == cli.maps.len() {
        anyhow::bail!("No map packages found under: {}", cli.root_path);
    }

    tracing::info!("Extraction complete: {} unique meshes", extractor.arena().len());

    Ok(())
}
