// Static-mesh resource extraction.
//
// Builds the shared EntityMesh for one mesh resource. The caller caches the
// result by resource name; classification is decided here, by the first
// actor that forces the build, and travels with the cached mesh.

use crate::material::resolve_texture;
use crate::mesh::{
    EntityMesh, Surface, SurfaceMaterial, Vertex, COLOR_BLOCKING, COLOR_PASSABLE,
    SURFACE_PASSABLE, SURFACE_STATIC_MESH,
};
use crate::scene::{MeshSurface, Package, StaticMeshActor, StaticMeshResource};

/// Surface-level collision: the actor must block on every axis and the
/// surface material must have collision enabled.
pub fn collides(actor: &StaticMeshActor, surface: &MeshSurface) -> bool {
    if !actor.collide_actors || !actor.block_actors || !actor.block_players {
        return false;
    }

    surface.enable_collision
}

pub fn build_static_mesh(
    package: &Package,
    actor: &StaticMeshActor,
    resource: &StaticMeshResource,
) -> EntityMesh {
    let mut mesh = EntityMesh::default();

    mesh.bounding_box = resource.bounding_box;

    // Vertices; a mesh without texturing gets zero UVs.
    for (i, vertex) in resource.vertices.iter().enumerate() {
        mesh.vertices.push(Vertex {
            position: vertex.position,
            normal: vertex.normal,
            uv: resource.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
        });
    }

    // Surfaces
    for resource_surface in &resource.surfaces {
        if resource_surface.triangle_count == 0 {
            continue;
        }

        let index_offset = mesh.indices.len();

        // Source triangles are wound clockwise; reverse each one.
        for triangle in 0..resource_surface.triangle_count {
            let first = (resource_surface.first_index + triangle * 3) as usize;
            mesh.indices.push(resource.indices[first + 2]);
            mesh.indices.push(resource.indices[first + 1]);
            mesh.indices.push(resource.indices[first]);
        }

        let texture = resource_surface
            .material
            .as_deref()
            .and_then(|name| resolve_texture(package, name));

        let mut surface = Surface {
            surface_type: SURFACE_STATIC_MESH,
            index_offset,
            index_count: mesh.indices.len() - index_offset,
            material: SurfaceMaterial { color: COLOR_BLOCKING, texture: texture.copied() },
        };

        if !collides(actor, resource_surface) {
            surface.surface_type |= SURFACE_PASSABLE;
            surface.material.color = COLOR_PASSABLE;
        }

        mesh.surfaces.push(surface);
    }

    mesh
}
