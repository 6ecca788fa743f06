use serde::{Deserialize, Serialize};

use crate::linalg::{self, dot3};

/// A rigid body transform: rotation plus translation, no scale or shear.
///
/// Invariant: `rotation` is orthonormal with determinant +1. When viewed as a
/// 4x4 homogeneous matrix the bottom row is `[0, 0, 0, 1]`; the
/// [`to_col_major`](Self::to_col_major) / [`from_col_major`](Self::from_col_major)
/// pair serializes that matrix as a 16-element column-major array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Rotation matrix, row major.
    pub rotation: [[f64; 3]; 3],
    /// Translation vector.
    pub translation: [f64; 3],
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 0.0],
        }
    }

    /// Create a transform from a rotation matrix and a translation vector.
    pub fn new(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Compose two transforms, `self ∘ rhs`: the result applies `rhs` first.
    pub fn compose(&self, rhs: &RigidTransform) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        linalg::matmul33(&self.rotation, &rhs.rotation, &mut rotation);

        let mut translation = [0.0; 3];
        for (i, row) in self.rotation.iter().enumerate() {
            translation[i] = dot3(row, &rhs.translation) + self.translation[i];
        }

        Self {
            rotation,
            translation,
        }
    }

    /// Transform a set of points into a pre-allocated buffer.
    ///
    /// PRECONDITION: `dst_points` has the same length as `src_points`.
    pub fn transform_points(&self, src_points: &[[f64; 3]], dst_points: &mut [[f64; 3]]) {
        linalg::transform_points(src_points, &self.rotation, &self.translation, dst_points);
    }

    /// Serialize as a 16-element column-major 4x4 homogeneous matrix.
    pub fn to_col_major(&self) -> [f64; 16] {
        let mut flat = [0.0; 16];
        for col in 0..3 {
            for row in 0..3 {
                flat[col * 4 + row] = self.rotation[row][col];
            }
        }
        flat[12] = self.translation[0];
        flat[13] = self.translation[1];
        flat[14] = self.translation[2];
        flat[15] = 1.0;
        flat
    }

    /// Read a transform from a 16-element column-major 4x4 homogeneous matrix.
    ///
    /// Only the top-left 3x3 block and the last column are read; the caller is
    /// responsible for supplying a proper rigid transform.
    pub fn from_col_major(flat: &[f64; 16]) -> Self {
        let mut rotation = [[0.0; 3]; 3];
        for col in 0..3 {
            for row in 0..3 {
                rotation[row][col] = flat[col * 4 + row];
            }
        }
        Self {
            rotation,
            translation: [flat[12], flat[13], flat[14]],
        }
    }

    /// Check the rotation block for orthonormality and determinant +1 within `eps`.
    pub fn is_rigid(&self, eps: f64) -> bool {
        let r = &self.rotation;
        for i in 0..3 {
            let col_i = [r[0][i], r[1][i], r[2][i]];
            for j in i..3 {
                let col_j = [r[0][j], r[1][j], r[2][j]];
                let expected = if i == j { 1.0 } else { 0.0 };
                if (dot3(&col_i, &col_j) - expected).abs() > eps {
                    return false;
                }
            }
        }
        (linalg::det_mat33(r) - 1.0).abs() <= eps
    }
}
