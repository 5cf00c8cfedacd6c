// Terrain tile extraction.
//
// One mesh per tile: a vertex per heightmap sample, two triangles per
// visible quad, and stitch geometry along the south/east/south-east borders
// sampled from the neighboring tiles' own heightmaps. Neighbors passed in
// here are already known to be usable (present, non-broken scale, mip 0
// loaded); a missing neighbor just leaves that border open.

use crate::math::Vec3;
use crate::mesh::{EntityMesh, Surface, SurfaceMaterial, Vertex, COLOR_TERRAIN, SURFACE_TERRAIN};
use crate::scene::TerrainInfo;

pub fn build_terrain_mesh(
    terrain: &TerrainInfo,
    south: Option<&TerrainInfo>,
    east: Option<&TerrainInfo>,
    southeast: Option<&TerrainInfo>,
) -> EntityMesh {
    let width = terrain.heightmap.u_size;
    let height = terrain.heightmap.v_size;

    // Grid size with stitch borders
    let full_width = width + 1;
    let full_height = height + 1;

    let mut mesh = EntityMesh::default();
    let mut heights = vec![0u16; full_width * full_height];

    let position = terrain.position;
    let scale = terrain.scale;

    mesh.bounding_box = terrain.bounding_box.scaled(scale, position);

    let heightmap = &terrain.heightmap.mips[0];

    // Vertices
    for y in 0..height {
        for x in 0..width {
            let sample = heightmap[y * width + x];
            mesh.vertices.push(grid_vertex(x, y, sample, scale, position));
            heights[y * full_width + x] = sample;
        }
    }

    // Indices
    for y in 0..height - 1 {
        for x in 0..width - 1 {
            if !terrain.quad_visibility_bitmap[x + y * width] {
                continue;
            }

            let corner = |dx: usize, dy: usize| ((x + dx) + (y + dy) * width) as u32;

            if !terrain.edge_turn_bitmap[x + y * width] {
                // Split along (x, y) - (x+1, y+1)
                mesh.indices.extend_from_slice(&[
                    corner(0, 0), corner(1, 0), corner(1, 1),
                    corner(0, 0), corner(1, 1), corner(0, 1),
                ]);
            } else {
                // Split along (x, y+1) - (x+1, y)
                mesh.indices.extend_from_slice(&[
                    corner(0, 1), corner(0, 0), corner(1, 0),
                    corner(0, 1), corner(1, 0), corner(1, 1),
                ]);
            }
        }
    }

    // South border: the neighbor's row 0 becomes this tile's row `height`,
    // under the neighbor's own vertical placement.
    let south_base = mesh.vertices.len();

    if let Some(south) = south {
        let position = Vec3::new(terrain.position.x, terrain.position.y, south.position.z);
        let scale = Vec3::new(terrain.scale.x, terrain.scale.y, south.scale.z);
        let neighbor_map = &south.heightmap.mips[0];
        let y = height;

        for x in 0..width {
            let sample = neighbor_map[x];
            mesh.vertices.push(grid_vertex(x, y, sample, scale, position));
            heights[y * full_width + x] = sample;

            let last = (mesh.vertices.len() - 1) as u32;

            // First part of quad
            if x != width - 1 {
                mesh.indices.extend_from_slice(&[
                    (x + (y - 1) * width) as u32,
                    ((x + 1) + (y - 1) * width) as u32,
                    last,
                ]);
            }

            // Second part of quad
            if x != 0 {
                mesh.indices.extend_from_slice(&[
                    (x + (y - 1) * width) as u32,
                    last,
                    last - 1,
                ]);
            }
        }
    }

    // East border: the neighbor's column 0 becomes this tile's column `width`.
    let east_base = mesh.vertices.len();

    if let Some(east) = east {
        let position = Vec3::new(terrain.position.x, terrain.position.y, east.position.z);
        let scale = Vec3::new(terrain.scale.x, terrain.scale.y, east.scale.z);
        let neighbor_map = &east.heightmap.mips[0];
        let neighbor_stride = east.heightmap.u_size;
        let x = width;

        for y in 0..height {
            let sample = neighbor_map[y * neighbor_stride];
            mesh.vertices.push(grid_vertex(x, y, sample, scale, position));
            heights[y * full_width + x] = sample;

            let last = (mesh.vertices.len() - 1) as u32;

            // First part of quad
            if y != height - 1 {
                mesh.indices.extend_from_slice(&[
                    ((x - 1) + y * width) as u32,
                    last,
                    ((x - 1) + (y + 1) * width) as u32,
                ]);
            }

            // Second part of quad
            if y != 0 {
                mesh.indices.extend_from_slice(&[
                    ((x - 1) + y * width) as u32,
                    last - 1,
                    last,
                ]);
            }
        }
    }

    // South-east corner: one vertex from the diagonal neighbor's sample
    // (0, 0), closing the last quad against the stitched row/column.
    let corner_index = mesh.vertices.len();

    if let Some(southeast) = southeast {
        let position = Vec3::new(terrain.position.x, terrain.position.y, southeast.position.z);
        let scale = Vec3::new(terrain.scale.x, terrain.scale.y, southeast.scale.z);
        let sample = southeast.heightmap.mips[0][0];

        mesh.vertices.push(grid_vertex(width, height, sample, scale, position));
        heights[height * full_width + width] = sample;

        let corner = corner_index as u32;
        let interior = ((width - 1) + (height - 1) * width) as u32;

        // First part of quad
        if east.is_some() {
            let east_last = (east_base + height - 1) as u32;
            mesh.indices.extend_from_slice(&[interior, east_last, corner]);
        }

        // Second part of quad
        if south.is_some() {
            let south_last = (south_base + width - 1) as u32;
            mesh.indices.extend_from_slice(&[interior, corner, south_last]);
        }
    }

    // Normals: central-difference gradient over the stitched grid, clamped
    // to the sample's own height where no neighbor sample exists. The 4.0
    // slope weight is a fixed shading constant, not the true Z scale.
    let south_limit = if south.is_some() { height } else { height - 1 };
    let east_limit = if east.is_some() { width } else { width - 1 };

    for y in 0..full_height {
        for x in 0..full_width {
            let z = heights[y * full_width + x] as f32;

            let top = if y > 0 { heights[(y - 1) * full_width + x] as f32 } else { z };
            let bottom = if y < south_limit { heights[(y + 1) * full_width + x] as f32 } else { z };
            let left = if x > 0 { heights[y * full_width + x - 1] as f32 } else { z };
            let right = if x < east_limit { heights[y * full_width + x + 1] as f32 } else { z };

            let normal = Vec3::new(
                (left - right) / (full_width as f32 * 2.0),
                (top - bottom) / (full_height as f32 * 2.0),
                4.0,
            )
            .normalize();

            if x < width && y < height {
                mesh.vertices[y * width + x].normal = normal;
            } else if x == width && y == height {
                // South-east
                if southeast.is_some() {
                    mesh.vertices[corner_index].normal = normal;
                }
            } else if y == height {
                // South
                if south.is_some() {
                    mesh.vertices[south_base + x].normal = normal;
                }
            } else if east.is_some() {
                // East
                mesh.vertices[east_base + y].normal = normal;
            }
        }
    }

    // Surface
    mesh.surfaces.push(Surface {
        surface_type: SURFACE_TERRAIN,
        index_offset: 0,
        index_count: mesh.indices.len(),
        material: SurfaceMaterial { color: COLOR_TERRAIN, texture: None },
    });

    mesh
}

fn grid_vertex(x: usize, y: usize, sample: u16, scale: Vec3, position: Vec3) -> Vertex {
    Vertex {
        position: Vec3::new(x as f32, y as f32, sample as f32).mul(scale).add(position),
        normal: Vec3::ZERO,
        uv: [0.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Box3;
    use crate::scene::Heightmap;

    fn tile(map_x: i32, map_y: i32, size: usize, level: u16) -> TerrainInfo {
        TerrainInfo {
            map_x,
            map_y,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            bounding_box: Box3::new(
                Vec3::ZERO,
                Vec3::new(size as f32, size as f32, f32::from(u16::MAX)),
            ),
            broken_scale: false,
            heightmap: Heightmap {
                u_size: size,
                v_size: size,
                mips: vec![vec![level; size * size]],
            },
            quad_visibility_bitmap: vec![true; size * size],
            edge_turn_bitmap: vec![false; size * size],
        }
    }

    fn triangles(mesh: &EntityMesh) -> Vec<[u32; 3]> {
        mesh.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect()
    }

    fn quad_pair(mesh: &EntityMesh, quad: usize) -> ([u32; 3], [u32; 3]) {
        let tris = triangles(mesh);
        (tris[quad * 2], tris[quad * 2 + 1])
    }

    fn shared_vertices(a: [u32; 3], b: [u32; 3]) -> Vec<u32> {
        let mut shared: Vec<u32> = a.iter().copied().filter(|i| b.contains(i)).collect();
        shared.sort_unstable();
        shared.dedup();
        shared
    }

    #[test]
    fn test_plain_grid_counts() {
        let mesh = build_terrain_mesh(&tile(20, 20, 4, 100), None, None, None);

        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.indices.len(), 2 * 3 * 3 * 3);
        assert_eq!(mesh.surfaces.len(), 1);
        assert_eq!(mesh.surfaces[0].index_count, mesh.indices.len());

        // Every quad pair shares the (x, y) - (x+1, y+1) diagonal.
        for quad_y in 0..3u32 {
            for quad_x in 0..3u32 {
                let quad = (quad_y * 3 + quad_x) as usize;
                let (first, second) = quad_pair(&mesh, quad);
                let diagonal = vec![quad_x + quad_y * 4, (quad_x + 1) + (quad_y + 1) * 4];
                assert_eq!(shared_vertices(first, second), diagonal);
            }
        }
    }

    #[test]
    fn test_flat_tile_normals_point_up() {
        let mesh = build_terrain_mesh(&tile(20, 20, 4, 500), None, None, None);
        for vertex in &mesh.vertices {
            assert!((vertex.normal.z - 1.0).abs() < 1e-6);
            assert!(vertex.normal.x.abs() < 1e-6);
        }
    }

    #[test]
    fn test_edge_turn_flips_only_the_diagonal() {
        let mut turned = tile(20, 20, 4, 100);
        turned.edge_turn_bitmap[1 + 4] = true; // quad (1, 1)

        let straight_mesh = build_terrain_mesh(&tile(20, 20, 4, 100), None, None, None);
        let turned_mesh = build_terrain_mesh(&turned, None, None, None);

        assert_eq!(straight_mesh.indices.len(), turned_mesh.indices.len());

        // Quad (1, 1) is the fourth quad. Corners are unchanged, the shared
        // diagonal moves to (x, y+1) - (x+1, y).
        let quad = 4;
        let (first, second) = quad_pair(&turned_mesh, quad);
        let mut corners: Vec<u32> = first.iter().chain(second.iter()).copied().collect();
        corners.sort_unstable();
        corners.dedup();
        assert_eq!(corners, vec![1 + 4, 2 + 4, 1 + 8, 2 + 8]);
        assert_eq!(shared_vertices(first, second), vec![2 + 4, 1 + 8]);

        // All other quads keep their original triangles.
        for other in 0..9 {
            if other == quad {
                continue;
            }
            assert_eq!(quad_pair(&straight_mesh, other), quad_pair(&turned_mesh, other));
        }
    }

    #[test]
    fn test_hidden_quad_is_skipped() {
        let mut holed = tile(20, 20, 4, 100);
        holed.quad_visibility_bitmap[0] = false;

        let mesh = build_terrain_mesh(&holed, None, None, None);
        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.indices.len(), 2 * 3 * 3 * 3 - 6);
    }

    #[test]
    fn test_south_stitch_uses_neighbor_height_placement() {
        let plain = build_terrain_mesh(&tile(20, 20, 4, 100), None, None, None);

        let mut south = tile(20, 21, 4, 300);
        south.position.z = 10.0;
        south.scale.z = 2.0;

        let stitched = build_terrain_mesh(&tile(20, 20, 4, 100), Some(&south), None, None);

        // Exactly one extra row of vertices and its connecting triangles.
        assert_eq!(stitched.vertices.len(), plain.vertices.len() + 4);
        assert_eq!(stitched.indices.len(), plain.indices.len() + 6 * 3);

        for (x, vertex) in stitched.vertices[16..].iter().enumerate() {
            assert_eq!(vertex.position.x, x as f32);
            assert_eq!(vertex.position.y, 4.0);
            // Neighbor row-0 sample under the neighbor's own z placement.
            assert_eq!(vertex.position.z, 300.0 * 2.0 + 10.0);
            // Stitched row received a normal.
            assert!(vertex.normal.z > 0.0);
        }
    }

    #[test]
    fn test_full_stitch_adds_row_column_and_corner() {
        let base = tile(20, 20, 4, 100);
        let south = tile(20, 21, 4, 200);
        let east = tile(21, 20, 4, 400);
        let southeast = tile(21, 21, 4, 800);

        let mesh =
            build_terrain_mesh(&base, Some(&south), Some(&east), Some(&southeast));

        assert_eq!(mesh.vertices.len(), 16 + 4 + 4 + 1);

        let corner = mesh.vertices.last().unwrap();
        assert_eq!(corner.position.x, 4.0);
        assert_eq!(corner.position.y, 4.0);
        assert_eq!(corner.position.z, 800.0);

        // Column x = 4 comes from the east neighbor's column 0.
        for (y, vertex) in mesh.vertices[20..24].iter().enumerate() {
            assert_eq!(vertex.position.x, 4.0);
            assert_eq!(vertex.position.y, y as f32);
            assert_eq!(vertex.position.z, 400.0);
        }

        // The corner closes both halves of the last quad.
        let tail = &mesh.indices[mesh.indices.len() - 6..];
        assert_eq!(tail, &[15, 23, 24, 15, 24, 19]);
    }
}
