// Brush model triangulation.
//
// Shared by level geometry (bounds-checked against the map box) and volume
// brushes (never bounds-checked). Each BSP node is a convex polygon over
// the model's vertex pool; solid nodes become a triangle fan, two-sided
// ones a mirrored pair of fans.

use crate::material::{resolve_texture, uv_size};
use crate::math::{Box3, Vec3};
use crate::mesh::{EntityMesh, Surface, SurfaceMaterial, Vertex, COLOR_CSG, SURFACE_CSG};
use crate::scene::{BrushModel, BspNode, Package, NF_PASSABLE, PF_PASSABLE, PF_TWO_SIDED};

/// Triangulate a brush model. `bounds` is the map bounding box for level
/// geometry; `None` skips the check (volumes). Returns `None` when nothing
/// solid is left - the caller treats that as "nothing to add".
pub fn build_brush_mesh(
    package: &Package,
    model: &BrushModel,
    bounds: Option<&Box3>,
) -> Option<EntityMesh> {
    if model.points.is_empty() {
        return None;
    }

    let mut mesh = EntityMesh::default();

    for node in &model.nodes {
        if (node.flags & NF_PASSABLE) != 0 {
            continue;
        }

        if let Some(bounds) = bounds {
            if node_outside_bounds(model, node, bounds) {
                continue;
            }
        }

        let brush_surface = &model.surfaces[node.surface_index];

        if (brush_surface.polygon_flags & PF_PASSABLE) != 0 {
            continue;
        }

        let normal = model.vectors[brush_surface.normal_index];
        let vertex_offset = mesh.vertices.len();
        let index_offset = mesh.indices.len();

        // UV projection basis
        let u_vector = model.vectors[brush_surface.u_index];
        let v_vector = model.vectors[brush_surface.v_index];
        let base = model.points[brush_surface.base_index];

        let texture = brush_surface
            .material
            .as_deref()
            .and_then(|name| resolve_texture(package, name));
        let (u_scale, v_scale) = uv_size(texture);

        let two_sided = (brush_surface.polygon_flags & PF_TWO_SIDED) != 0;

        // Vertices
        for i in 0..node.vertex_count {
            let point = node_point(model, node, i);
            let distance = point.sub(base);

            mesh.bounding_box.merge(point);
            mesh.vertices.push(Vertex {
                position: point,
                normal,
                uv: [distance.dot(u_vector) / u_scale, distance.dot(v_vector) / v_scale],
            });
        }

        if two_sided {
            // Back face: same run with the normal's Z flipped.
            let flipped = Vec3::new(normal.x, normal.y, -normal.z);
            for i in 0..node.vertex_count {
                let point = node_point(model, node, i);
                let distance = point.sub(base);

                mesh.vertices.push(Vertex {
                    position: point,
                    normal: flipped,
                    uv: [distance.dot(u_vector) / u_scale, distance.dot(v_vector) / v_scale],
                });
            }
        }

        // Indices: fan from the polygon's first vertex.
        for i in 2..node.vertex_count {
            mesh.indices.push(vertex_offset as u32);
            mesh.indices.push((vertex_offset + i - 1) as u32);
            mesh.indices.push((vertex_offset + i) as u32);
        }

        if two_sided {
            let mirror_offset = vertex_offset + node.vertex_count;
            for i in 2..node.vertex_count {
                mesh.indices.push(mirror_offset as u32);
                mesh.indices.push((mirror_offset + i) as u32);
                mesh.indices.push((mirror_offset + i - 1) as u32);
            }
        }

        // Surface
        mesh.surfaces.push(Surface {
            surface_type: SURFACE_CSG,
            index_offset,
            index_count: mesh.indices.len() - index_offset,
            material: SurfaceMaterial { color: COLOR_CSG, texture: texture.copied() },
        });
    }

    if mesh.vertices.is_empty() {
        return None;
    }

    Some(mesh)
}

fn node_point(model: &BrushModel, node: &BspNode, i: usize) -> Vec3 {
    model.points[model.vertices[node.vertex_pool_index + i].vertex_index]
}

fn node_outside_bounds(model: &BrushModel, node: &BspNode, bounds: &Box3) -> bool {
    (0..node.vertex_count).any(|i| !bounds.contains(node_point(model, node, i)))
}
