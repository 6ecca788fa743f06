/// Singular values with a magnitude below this threshold are treated as zero
/// when inverting, which absorbs rank deficiency instead of amplifying it.
pub const SINGULAR_EPS: f64 = 1e-15;

/// Transform a set of points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `dst_r_src` - A rotation matrix.
/// * `dst_t_src` - A translation vector.
/// * `dst_points` - A pre-allocated buffer to store the transformed points.
///
/// PRECONDITION: dst_points is a pre-allocated buffer of the same size as source.
///
/// Example:
///
/// ```
/// use cloudalign_3d::linalg::transform_points;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let translation = [0.0, 0.0, 0.0];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points(&src_points, &rotation, &translation, &mut dst_points);
/// assert_eq!(dst_points, src_points);
/// ```
pub fn transform_points(
    src_points: &[[f64; 3]],
    dst_r_src: &[[f64; 3]; 3],
    dst_t_src: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());

    for (src, dst) in src_points.iter().zip(dst_points.iter_mut()) {
        for (i, row) in dst_r_src.iter().enumerate() {
            dst[i] = dot3(row, src) + dst_t_src[i];
        }
    }
}

/// Multiply two 3x3 matrices, `out = a * b`.
pub fn matmul33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3], out: &mut [[f64; 3]; 3]) {
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
}

/// Compute the determinant of a 3x3 matrix.
pub fn det_mat33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Compute the dot product of two 3d vectors.
#[inline]
pub fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Compute the cross product of two 3d vectors.
#[inline]
pub fn cross3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Compute the Moore-Penrose pseudo-inverse of a matrix via truncated SVD.
///
/// With `A = U Σ Vᵀ`, the pseudo-inverse is `V Σ⁺ Uᵀ` where `Σ⁺` holds the
/// reciprocal of each singular value. Reciprocals of singular values with
/// magnitude below [`SINGULAR_EPS`] are taken as zero, so rank-deficient
/// systems (e.g. insufficient normal diversity over a planar patch) yield the
/// minimum-norm solution instead of a blow-up.
pub fn pseudo_inverse(a: faer::MatRef<f64>) -> faer::Mat<f64> {
    let svd = a.thin_svd();
    let s = svd.s_diagonal();

    let rank = s.nrows();
    let mut s_pinv = faer::Mat::<f64>::zeros(rank, rank);
    for i in 0..rank {
        let sv = s.read(i);
        if sv.abs() < SINGULAR_EPS {
            log::debug!("pseudo_inverse: truncating near-zero singular value {sv:e}");
        } else {
            s_pinv.write(i, i, 1.0 / sv);
        }
    }

    svd.v() * s_pinv.as_ref() * svd.u().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_points_identity() {
        let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
        let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let translation = [0.0, 0.0, 0.0];
        let mut dst_points = vec![[0.0; 3]; src_points.len()];
        transform_points(&src_points, &rotation, &translation, &mut dst_points);

        assert_eq!(dst_points, src_points);
    }

    #[test]
    fn test_transform_points_roundtrip() {
        let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
        // 90 degrees about the x axis
        let rotation = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        let translation = [1.0, 2.0, 3.0];

        let mut dst_points = vec![[0.0; 3]; src_points.len()];
        transform_points(&src_points, &rotation, &translation, &mut dst_points);

        // invert: R' = Rᵀ, t' = -Rᵀ t
        let mut rotation_inv = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                rotation_inv[i][j] = rotation[j][i];
            }
        }
        let mut translation_inv = [0.0; 3];
        for (i, row) in rotation_inv.iter().enumerate() {
            translation_inv[i] = -dot3(row, &translation);
        }

        let mut src_points_back = vec![[0.0; 3]; dst_points.len()];
        transform_points(
            &dst_points,
            &rotation_inv,
            &translation_inv,
            &mut src_points_back,
        );

        for (res, exp) in src_points_back.iter().zip(src_points.iter()) {
            for (r, e) in res.iter().zip(exp.iter()) {
                assert_relative_eq!(r, e, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_matmul33_identity() {
        let a = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let eye = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let mut out = [[0.0; 3]; 3];
        matmul33(&a, &eye, &mut out);
        assert_eq!(out, a);
    }

    #[test]
    fn test_det_mat33() {
        let eye = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_relative_eq!(det_mat33(&eye), 1.0);

        let reflection = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];
        assert_relative_eq!(det_mat33(&reflection), -1.0);
    }

    #[test]
    fn test_cross3_basis() {
        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        assert_eq!(cross3(&x, &y), [0.0, 0.0, 1.0]);
        assert_eq!(cross3(&y, &x), [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_pseudo_inverse_invertible() {
        // For an invertible matrix the pseudo-inverse is the inverse.
        let a = faer::mat![[2.0, 0.0], [0.0, 4.0]];
        let a_pinv = pseudo_inverse(a.as_ref());
        assert_relative_eq!(a_pinv.read(0, 0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(a_pinv.read(1, 1), 0.25, epsilon = 1e-12);
        assert_relative_eq!(a_pinv.read(0, 1), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pseudo_inverse_rank_deficient() {
        // Second row is a multiple of the first; rank 1.
        let a = faer::mat![[1.0, 2.0], [2.0, 4.0]];
        let a_pinv = pseudo_inverse(a.as_ref());

        // A A⁺ A == A still holds for the truncated pseudo-inverse.
        let back = a.as_ref() * a_pinv.as_ref() * a.as_ref();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(back.read(i, j), a.read(i, j), epsilon = 1e-9);
            }
        }
    }
}
