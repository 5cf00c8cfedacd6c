// Vector and matrix support for the extraction pipeline.
//
// Package space is the source convention (Y "south", Z up-scaled height);
// the export convention swaps Y and Z. Everything here works in whichever
// space the caller is in - conversion happens only at the Map boundary.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Component-wise product.
    pub fn mul(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Self {
        self.scale(1.0 / self.length())
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Box3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Box3 {
    /// Merge-neutral box: merging the first point replaces both corners.
    pub const EMPTY: Self = Self {
        min: Vec3 { x: f32::MAX, y: f32::MAX, z: f32::MAX },
        max: Vec3 { x: f32::MIN, y: f32::MIN, z: f32::MIN },
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn merge(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Both corners scaled component-wise, then offset.
    pub fn scaled(self, scale: Vec3, offset: Vec3) -> Self {
        Self {
            min: self.min.mul(scale).add(offset),
            max: self.max.mul(scale).add(offset),
        }
    }
}

/// Row-major 3x3 matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3(pub [[f32; 3]; 3]);

impl Mat3 {
    pub const IDENTITY: Self = Self([
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ]);

    pub fn from_diagonal(v: Vec3) -> Self {
        Self([
            [v.x, 0.0, 0.0],
            [0.0, v.y, 0.0],
            [0.0, 0.0, v.z],
        ])
    }

    /// Rotation matrix for intrinsic Z*Y*X Euler angles (radians).
    pub fn from_euler_zyx(z: f32, y: f32, x: f32) -> Self {
        let (sz, cz) = z.sin_cos();
        let (sy, cy) = y.sin_cos();
        let (sx, cx) = x.sin_cos();

        Self([
            [cy * cz, cz * sx * sy - cx * sz, cx * cz * sy + sx * sz],
            [cy * sz, cx * cz + sx * sy * sz, -cz * sx + cx * sy * sz],
            [-sy, cy * sx, cx * cy],
        ])
    }

    pub fn mul(self, other: Self) -> Self {
        let a = self.0;
        let b = other.0;
        let mut out = [[0.0f32; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        Self(out)
    }

    pub fn mul_vec3(self, v: Vec3) -> Vec3 {
        let m = self.0;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    pub fn transpose(self) -> Self {
        let m = self.0;
        Self([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    pub fn determinant(self) -> f32 {
        let m = self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn inverse(self) -> Self {
        let m = self.0;
        let inv_det = 1.0 / self.determinant();
        Self([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ])
    }

    /// Normal matrix for a model matrix with this linear part.
    pub fn inverse_transpose(self) -> Self {
        self.inverse().transpose()
    }
}

/// Affine transform: 3x3 linear part plus translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub linear: Mat3,
    pub translation: Vec3,
}

impl Affine {
    pub const IDENTITY: Self = Self {
        linear: Mat3::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Swap Y-up with Z-up: (x, y, z) -> (x, z, y).
    pub const SWAP_YZ: Self = Self {
        linear: Mat3([
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
        ]),
        translation: Vec3::ZERO,
    };

    /// translate * rotate(Euler ZYX) * scale
    pub fn from_parts(translation: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let rotate = Mat3::from_euler_zyx(rotation.z, rotation.y, rotation.x);
        Self {
            linear: rotate.mul(Mat3::from_diagonal(scale)),
            translation,
        }
    }

    pub fn mul(self, other: Self) -> Self {
        Self {
            linear: self.linear.mul(other.linear),
            translation: self.linear.mul_vec3(other.translation).add(self.translation),
        }
    }

    pub fn transform_point(self, p: Vec3) -> Vec3 {
        self.linear.mul_vec3(p).add(self.translation)
    }
}

/// Face normal of the triangle (p1, p2, p3): normalize(cross(p1-p2, p1-p3)).
pub fn triangle_normal(p1: Vec3, p2: Vec3, p3: Vec3) -> Vec3 {
    p1.sub(p2).cross(p1.sub(p3)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_eq(a: Vec3, b: Vec3) {
        assert!((a.x - b.x).abs() < 1e-5, "{a:?} != {b:?}");
        assert!((a.y - b.y).abs() < 1e-5, "{a:?} != {b:?}");
        assert!((a.z - b.z).abs() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn test_euler_identity() {
        let m = Mat3::from_euler_zyx(0.0, 0.0, 0.0);
        assert_vec3_eq(m.mul_vec3(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_euler_z_quarter_turn() {
        let m = Mat3::from_euler_zyx(std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        assert_vec3_eq(m.mul_vec3(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_inverse() {
        let m = Mat3::from_euler_zyx(0.4, -0.2, 1.1).mul(Mat3::from_diagonal(Vec3::new(2.0, 3.0, 0.5)));
        let product = m.mul(m.inverse());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product.0[i][j] - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_normal_matrix_counters_nonuniform_scale() {
        // A ground-plane normal must stay vertical under horizontal-only scaling.
        let model = Mat3::from_diagonal(Vec3::new(4.0, 1.0, 1.0));
        let n = model.inverse_transpose().mul_vec3(Vec3::new(0.0, 0.0, 1.0)).normalize();
        assert_vec3_eq(n, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_affine_compose() {
        let a = Affine::from_parts(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO, Vec3::ONE);
        let b = Affine::from_parts(Vec3::ZERO, Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let p = a.mul(b).transform_point(Vec3::new(1.0, 1.0, 1.0));
        assert_vec3_eq(p, Vec3::new(12.0, 2.0, 2.0));
    }

    #[test]
    fn test_swap_yz() {
        let p = Affine::SWAP_YZ.transform_point(Vec3::new(1.0, 2.0, 3.0));
        assert_vec3_eq(p, Vec3::new(1.0, 3.0, 2.0));
    }

    #[test]
    fn test_triangle_normal_orientation() {
        let n = triangle_normal(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert_vec3_eq(n, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_box_merge_contains() {
        let mut b = Box3::EMPTY;
        b.merge(Vec3::new(-1.0, 0.0, 2.0));
        b.merge(Vec3::new(3.0, -2.0, 0.0));
        assert!(b.contains(Vec3::new(0.0, -1.0, 1.0)));
        assert!(!b.contains(Vec3::new(0.0, -3.0, 1.0)));
    }
}
