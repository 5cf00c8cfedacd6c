// Builder settings and raw-geometry export.
//
// The geodata builder itself is a separate tool; this side only hands it a
// bounding box, the settings block, and the flattened geometry buffers,
// one binary artifact per map.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use byteorder::{LittleEndian, WriteBytesExt};

use crate::map::Map;

pub const GEOMESH_MAGIC: &[u8; 8] = b"GEOM001\0";

fn default_actor_height() -> f32 {
    48.0
}

fn default_actor_radius() -> f32 {
    12.0
}

fn default_max_walkable_angle() -> f32 {
    60.0
}

fn default_min_walkable_climb() -> f32 {
    8.0
}

fn default_max_walkable_climb() -> f32 {
    48.0
}

fn default_cell_size() -> f32 {
    16.0
}

fn default_cell_height() -> f32 {
    8.0
}

/// Geodata builder options. Forwarded verbatim in the export header; this
/// tool never interprets them.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSettings {
    #[serde(default = "default_actor_height")]
    pub actor_height: f32,
    #[serde(default = "default_actor_radius")]
    pub actor_radius: f32,
    #[serde(default = "default_max_walkable_angle")]
    pub max_walkable_angle: f32,
    #[serde(default = "default_min_walkable_climb")]
    pub min_walkable_climb: f32,
    #[serde(default = "default_max_walkable_climb")]
    pub max_walkable_climb: f32,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    #[serde(default = "default_cell_height")]
    pub cell_height: f32,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            actor_height: default_actor_height(),
            actor_radius: default_actor_radius(),
            max_walkable_angle: default_max_walkable_angle(),
            min_walkable_climb: default_min_walkable_climb(),
            max_walkable_climb: default_max_walkable_climb(),
            cell_size: default_cell_size(),
            cell_height: default_cell_height(),
        }
    }
}

impl BuilderSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read settings file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Malformed settings file {}", path.display()))
    }
}

/// Writes one `<map>.geomesh` artifact per map: magic, bounding box in the
/// export convention, settings, then the vertex and index buffers.
pub struct Exporter {
    root_path: PathBuf,
}

impl Exporter {
    pub fn new(root_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root_path = root_path.into();

        if !root_path.exists() {
            std::fs::create_dir_all(&root_path).with_context(|| {
                format!("Could not create output directory {}", root_path.display())
            })?;
        }

        Ok(Self { root_path })
    }

    pub fn export(&self, map: &Map, settings: &BuilderSettings) -> anyhow::Result<PathBuf> {
        let path = self.root_path.join(format!("{}.geomesh", map.name()));
        let mut out = BufWriter::new(
            File::create(&path)
                .with_context(|| format!("Could not create {}", path.display()))?,
        );

        out.write_all(GEOMESH_MAGIC)?;

        let bounding_box = map.bounding_box();
        for corner in [bounding_box.min, bounding_box.max] {
            out.write_f32::<LittleEndian>(corner.x)?;
            out.write_f32::<LittleEndian>(corner.y)?;
            out.write_f32::<LittleEndian>(corner.z)?;
        }

        for value in [
            settings.actor_height,
            settings.actor_radius,
            settings.max_walkable_angle,
            settings.min_walkable_climb,
            settings.max_walkable_climb,
            settings.cell_size,
            settings.cell_height,
        ] {
            out.write_f32::<LittleEndian>(value)?;
        }

        out.write_u32::<LittleEndian>(map.vertices().len() as u32)?;
        for vertex in map.vertices() {
            out.write_f32::<LittleEndian>(vertex.x)?;
            out.write_f32::<LittleEndian>(vertex.y)?;
            out.write_f32::<LittleEndian>(vertex.z)?;
        }

        out.write_u32::<LittleEndian>(map.indices().len() as u32)?;
        for index in map.indices() {
            out.write_u32::<LittleEndian>(*index)?;
        }

        out.flush()?;

        tracing::info!("Map geometry exported: {}", path.display());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Box3, Vec3};

    #[test]
    fn test_settings_defaults_from_empty_document() {
        let settings: BuilderSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.actor_height, default_actor_height());
        assert_eq!(settings.cell_size, default_cell_size());
    }

    #[test]
    fn test_settings_override() {
        let settings: BuilderSettings =
            serde_json::from_str(r#"{"cellSize": 8.0, "actorRadius": 20.0}"#).unwrap();
        assert_eq!(settings.cell_size, 8.0);
        assert_eq!(settings.actor_radius, 20.0);
        assert_eq!(settings.max_walkable_angle, default_max_walkable_angle());
    }

    #[test]
    fn test_export_layout() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path()).unwrap();

        let map = Map::new(
            "20_20",
            Box3::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0)),
        );

        let path = exporter.export(&map, &BuilderSettings::default()).unwrap();
        assert_eq!(path.file_name().unwrap(), "20_20.geomesh");

        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[..8], GEOMESH_MAGIC);

        // Bounding box is written in the export convention: (1, 2, 3)
        // becomes (1, 3, 2).
        let max_y = f32::from_le_bytes(data[24..28].try_into().unwrap());
        assert_eq!(max_y, 3.0);

        // magic + box + settings + two zero counts for an empty map.
        assert_eq!(data.len(), 8 + 24 + 28 + 4 + 4);
    }

    #[test]
    fn test_export_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("geodata").join("out");

        let exporter = Exporter::new(&nested).unwrap();
        let map = Map::new("21_21", Box3::default());
        exporter.export(&map, &BuilderSettings::default()).unwrap();

        assert!(nested.join("21_21.geomesh").exists());
    }
}
