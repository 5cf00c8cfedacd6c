// Decoded scene-object model.
//
// The package decoder is an external tool; it turns one source archive into
// one JSON document per package. This module is the typed boundary: a
// `Package` deserializes from that document and answers class queries
// without runtime type names.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::math::{Box3, Vec3};

/// BSP node flags
pub const NF_PASSABLE: u32 = 0x10;

/// Brush surface polygon flags
pub const PF_TWO_SIDED: u32 = 0x0000_0100;
pub const PF_PASSABLE: u32 = 0x2000_0000;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Package {
    pub name: String,
    pub objects: Vec<SceneObject>,
}

impl Package {
    /// All objects of one class, in package order.
    pub fn iter<'a, T: SceneClass + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.objects.iter().filter_map(T::from_object)
    }

    pub fn mesh_resource(&self, name: &str) -> Option<&StaticMeshResource> {
        self.iter::<StaticMeshResource>().find(|resource| resource.name == name)
    }

    pub fn material(&self, name: &str) -> Option<&NamedMaterial> {
        self.iter::<NamedMaterial>().find(|material| material.name == name)
    }
}

/// One class of scene object. The decoder folds engine subclasses into the
/// variant they behave as (all three static-mesh-actor subclasses land in
/// `MeshActor`).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum SceneObject {
    Terrain(TerrainInfo),
    MeshActor(StaticMeshActor),
    Level(Level),
    Volume(VolumeActor),
    MeshResource(StaticMeshResource),
    Material(NamedMaterial),
}

/// Typed class query over `SceneObject`.
pub trait SceneClass {
    fn from_object(object: &SceneObject) -> Option<&Self>;
}

macro_rules! scene_class {
    ($type:ty, $variant:ident) => {
        impl SceneClass for $type {
            fn from_object(object: &SceneObject) -> Option<&Self> {
                match object {
                    SceneObject::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

scene_class!(TerrainInfo, Terrain);
scene_class!(StaticMeshActor, MeshActor);
scene_class!(Level, Level);
scene_class!(VolumeActor, Volume);
scene_class!(StaticMeshResource, MeshResource);
scene_class!(NamedMaterial, Material);

/// Terrain heightmap texture: 16-bit elevation samples, mip 0 first.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Heightmap {
    pub u_size: usize,
    pub v_size: usize,
    pub mips: Vec<Vec<u16>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TerrainInfo {
    pub map_x: i32,
    pub map_y: i32,
    pub position: Vec3,
    pub scale: Vec3,
    pub bounding_box: Box3,
    #[serde(default)]
    pub broken_scale: bool,
    pub heightmap: Heightmap,
    /// One bit per grid cell, indexed x + y * u_size.
    pub quad_visibility_bitmap: Vec<bool>,
    /// Diagonal split selector, same indexing as the visibility bitmap.
    pub edge_turn_bitmap: Vec<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StaticMeshActor {
    pub name: String,
    /// Name of the shared mesh resource this actor places.
    pub static_mesh: Option<String>,
    #[serde(default)]
    pub movable: bool,
    #[serde(default)]
    pub delete_me: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub collide_actors: bool,
    #[serde(default)]
    pub block_actors: bool,
    #[serde(default)]
    pub block_players: bool,
    pub position: Vec3,
    /// Euler angles, radians.
    pub rotation: Vec3,
    pub scale: Vec3,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct MeshVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// One surface of a shared mesh resource: an index-stream range plus the
/// material it is drawn with.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MeshSurface {
    pub first_index: u32,
    pub triangle_count: u32,
    #[serde(default)]
    pub enable_collision: bool,
    pub material: Option<String>,
}

/// Immutable shared geometry referenced by many actors, identified by name.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StaticMeshResource {
    pub name: String,
    pub bounding_box: Box3,
    pub vertices: Vec<MeshVertex>,
    /// First UV stream; may be empty when the mesh carries no texturing.
    #[serde(default)]
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub surfaces: Vec<MeshSurface>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Level {
    pub model: BrushModel,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VolumeActor {
    pub name: String,
    pub brush: Option<BrushModel>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BrushSurface {
    pub material: Option<String>,
    pub polygon_flags: u32,
    /// Indices into `BrushModel::vectors` for the surface normal and the
    /// U/V texture basis, and into `points` for the projection base.
    pub normal_index: usize,
    pub u_index: usize,
    pub v_index: usize,
    pub base_index: usize,
}

/// A brush polygon: a run of vertex-pool entries plus its owning surface.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BspNode {
    pub vertex_pool_index: usize,
    pub vertex_count: usize,
    pub surface_index: usize,
    pub flags: u32,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct BrushVertex {
    pub vertex_index: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BrushModel {
    pub points: Vec<Vec3>,
    pub vectors: Vec<Vec3>,
    pub surfaces: Vec<BrushSurface>,
    pub nodes: Vec<BspNode>,
    /// Vertex pool; nodes reference runs of these.
    pub vertices: Vec<BrushVertex>,
}

/// Pixel encodings this pipeline understands. The decoder writes `unknown`
/// for anything else it met in the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Dxt1,
    Dxt3,
    Dxt5,
    Rgba8,
    Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Texture {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
}

/// The five material kinds; every non-texture kind references further
/// materials by name.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialKind {
    Texture(Texture),
    Shader { diffuse: Option<String> },
    FinalBlend { material: Option<String> },
    Modifier { material: Option<String> },
    Combiner { material1: Option<String>, material2: Option<String> },
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NamedMaterial {
    pub name: String,
    #[serde(flatten)]
    pub kind: MaterialKind,
}

/// Source of decoded packages. The directory-backed store is the production
/// implementation; tests provide in-memory ones.
pub trait PackageProvider {
    fn load_package(&self, name: &str) -> anyhow::Result<Option<Package>>;
}

pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PackageProvider for PackageStore {
    fn load_package(&self, name: &str) -> anyhow::Result<Option<Package>> {
        let path = self.root.join(format!("{name}.json"));
        if !path.exists() {
            return Ok(None);
        }

        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read package file {}", path.display()))?;
        let package = serde_json::from_str(&data)
            .with_context(|| format!("Malformed package file {}", path.display()))?;
        Ok(Some(package))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_query_filters_by_class() {
        let package = Package {
            name: "20_20".to_string(),
            objects: vec![
                SceneObject::Material(NamedMaterial {
                    name: "rock".to_string(),
                    kind: MaterialKind::Shader { diffuse: None },
                }),
                SceneObject::Volume(VolumeActor {
                    name: "volume0".to_string(),
                    brush: None,
                    position: Vec3::ZERO,
                    rotation: Vec3::ZERO,
                    scale: Vec3::ONE,
                }),
            ],
        };

        assert_eq!(package.iter::<VolumeActor>().count(), 1);
        assert_eq!(package.iter::<Level>().count(), 0);
        assert!(package.material("rock").is_some());
        assert!(package.material("dirt").is_none());
    }

    #[test]
    fn test_package_round_trip() {
        let json = r#"{
            "name": "21_19",
            "objects": [
                {
                    "class": "material",
                    "name": "wall",
                    "kind": "texture",
                    "format": "dxt1",
                    "width": 256,
                    "height": 128
                },
                {
                    "class": "material",
                    "name": "odd",
                    "kind": "texture",
                    "format": "unknown",
                    "width": 64,
                    "height": 64
                }
            ]
        }"#;

        let package: Package = serde_json::from_str(json).unwrap();
        assert_eq!(package.name, "21_19");

        let wall = package.material("wall").unwrap();
        match &wall.kind {
            MaterialKind::Texture(texture) => {
                assert_eq!(texture.format, TextureFormat::Dxt1);
                assert_eq!(texture.width, 256);
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        // Encodings the decoder did not recognize stay representable.
        let odd = package.material("odd").unwrap();
        match &odd.kind {
            MaterialKind::Texture(texture) => assert_eq!(texture.format, TextureFormat::Unknown),
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
