// Extracted mesh model shared by every extraction path.
//
// All meshes live in a per-run arena and are addressed by handle; the
// static-mesh caches map resource names to handles so any number of
// placements share one build.

use crate::math::{Affine, Box3, Vec3};
use crate::scene::Texture;

/// Surface type bits
pub const SURFACE_TERRAIN: u32 = 1;
pub const SURFACE_STATIC_MESH: u32 = 1 << 1;
pub const SURFACE_CSG: u32 = 1 << 2;
pub const SURFACE_BOUNDING_BOX: u32 = 1 << 3;
/// OR'd onto a base type for non-blocking geometry.
pub const SURFACE_PASSABLE: u32 = 1 << 4;

/// Classification colors
pub const COLOR_TERRAIN: [f32; 3] = [0.85, 0.85, 0.85];
pub const COLOR_BLOCKING: [f32; 3] = [1.0, 0.6, 0.6];
pub const COLOR_PASSABLE: [f32; 3] = [0.7, 1.0, 0.7];
pub const COLOR_CSG: [f32; 3] = [1.0, 1.0, 0.7];
pub const COLOR_BOUNDING_BOX: [f32; 3] = [1.0, 0.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: [f32; 2],
}

#[derive(Clone, Debug, Default)]
pub struct SurfaceMaterial {
    pub color: [f32; 3],
    pub texture: Option<Texture>,
}

/// A contiguous index range drawn with one material/classification.
#[derive(Clone, Debug)]
pub struct Surface {
    pub surface_type: u32,
    pub index_offset: usize,
    pub index_count: usize,
    pub material: SurfaceMaterial,
}

#[derive(Clone, Debug)]
pub struct EntityMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounding_box: Box3,
    pub surfaces: Vec<Surface>,
    /// Extra per-placement transforms for instanced resources; empty means
    /// the entity's own placement is the only instance.
    pub instance_transforms: Vec<Affine>,
}

impl Default for EntityMesh {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            bounding_box: Box3::EMPTY,
            surfaces: Vec::new(),
            instance_transforms: Vec::new(),
        }
    }
}

/// Stable handle into a `MeshArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(u32);

/// Owns every mesh extracted during one pipeline run.
#[derive(Default)]
pub struct MeshArena {
    meshes: Vec<EntityMesh>,
}

impl MeshArena {
    pub fn insert(&mut self, mesh: EntityMesh) -> MeshHandle {
        let handle = MeshHandle(self.meshes.len() as u32);
        self.meshes.push(mesh);
        handle
    }

    pub fn get(&self, handle: MeshHandle) -> &EntityMesh {
        &self.meshes[handle.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }
}

/// A placed mesh: arena handle plus placement transform.
#[derive(Clone, Copy, Debug)]
pub struct Entity {
    pub mesh: MeshHandle,
    pub position: Vec3,
    /// Euler angles, radians.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub wireframe: bool,
}

impl Entity {
    pub fn new(mesh: MeshHandle) -> Self {
        Self {
            mesh,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            wireframe: false,
        }
    }

    pub fn model_matrix(&self) -> Affine {
        Affine::from_parts(self.position, self.rotation, self.scale)
    }
}

/// Wireframe box used as a debug stand-in for any extracted mesh.
pub fn bounding_box_mesh(surface_type: u32, bounding_box: Box3) -> EntityMesh {
    let min = bounding_box.min;
    let max = bounding_box.max;

    let corner = |x: f32, y: f32, z: f32| Vertex {
        position: Vec3::new(x, y, z),
        normal: Vec3::ONE,
        uv: [0.0, 0.0],
    };

    let vertices = vec![
        corner(min.x, min.y, max.z),
        corner(max.x, min.y, max.z),
        corner(max.x, max.y, max.z),
        corner(min.x, max.y, max.z),
        corner(min.x, min.y, min.z),
        corner(max.x, min.y, min.z),
        corner(max.x, max.y, min.z),
        corner(min.x, max.y, min.z),
    ];

    let indices = vec![
        0, 1, 2, 2, 3, 0, // front
        1, 5, 6, 6, 2, 1, // right
        7, 6, 5, 5, 4, 7, // back
        4, 0, 3, 3, 7, 4, // left
        4, 5, 1, 1, 0, 4, // bottom
        3, 2, 6, 6, 7, 3, // top
    ];

    let surface = Surface {
        surface_type: surface_type | SURFACE_BOUNDING_BOX,
        index_offset: 0,
        index_count: indices.len(),
        material: SurfaceMaterial { color: COLOR_BOUNDING_BOX, texture: None },
    };

    EntityMesh {
        vertices,
        indices,
        bounding_box,
        surfaces: vec![surface],
        instance_transforms: Vec::new(),
    }
}
