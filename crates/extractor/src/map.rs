// Assembled per-map geometry.
//
// A Map folds placed entities into one flat vertex/index buffer for the
// geodata builder. All math runs in the source convention; the Y/Z swap is
// part of the model matrix, so the stored buffers are already in the
// export convention. The bounding box stays in the source convention and
// is swapped only at the accessor.

use crate::math::{triangle_normal, Affine, Box3, Vec3};
use crate::mesh::{Entity, EntityMesh};

fn swap_y_with_z(vector: Vec3) -> Vec3 {
    Vec3::new(vector.x, vector.z, vector.y)
}

pub struct Map {
    name: String,
    bounding_box: Box3,
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl Map {
    pub fn new(name: impl Into<String>, bounding_box: Box3) -> Self {
        Self {
            name: name.into(),
            bounding_box,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Fold one placed entity into the buffers, once per instance
    /// transform (or once with the placement alone).
    pub fn add(&mut self, entity: &Entity, mesh: &EntityMesh) {
        const NO_INSTANCES: [Affine; 1] = [Affine::IDENTITY];

        let instances: &[Affine] = if mesh.instance_transforms.is_empty() {
            &NO_INSTANCES
        } else {
            &mesh.instance_transforms
        };

        for instance in instances {
            let base = self.vertices.len();

            let model_matrix = Affine::SWAP_YZ.mul(entity.model_matrix()).mul(*instance);
            let normal_matrix = model_matrix.linear.inverse_transpose();

            let mut normals = Vec::with_capacity(mesh.vertices.len());

            for vertex in &mesh.vertices {
                self.vertices.push(model_matrix.transform_point(vertex.position));
                normals.push(normal_matrix.mul_vec3(vertex.normal).normalize());
            }

            let transformed = &self.vertices[base..];

            for triangle in mesh.indices.chunks_exact(3) {
                let (i0, i1, i2) =
                    (triangle[0] as usize, triangle[1] as usize, triangle[2] as usize);

                // Mirroring transforms flip the geometric face without
                // flipping the shading normals; compare the two and keep
                // the order that agrees.
                let average_normal =
                    normals[i0].add(normals[i1]).add(normals[i2]).scale(1.0 / 3.0).normalize();

                let face_normal =
                    triangle_normal(transformed[i2], transformed[i1], transformed[i0]);

                if average_normal.dot(face_normal) >= 0.0 {
                    self.indices.push((base + i2) as u32);
                    self.indices.push((base + i1) as u32);
                    self.indices.push((base + i0) as u32);
                } else {
                    self.indices.push((base + i0) as u32);
                    self.indices.push((base + i1) as u32);
                    self.indices.push((base + i2) as u32);
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bounding box in the export convention (Y and Z swapped).
    pub fn bounding_box(&self) -> Box3 {
        Box3::new(swap_y_with_z(self.bounding_box.min), swap_y_with_z(self.bounding_box.max))
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}
