use cloudalign_3d::linalg::{det_mat33, dot3};
use cloudalign_3d::pointcloud::PointCloud;
use cloudalign_3d::transform::RigidTransform;

use crate::icp::TransformStrategy;
use crate::kdtree::{KdTree, KdTreeError};

/// Point-to-point transform strategy (Kabsch).
///
/// Matches every transformed source point to its nearest reference point and
/// fits the optimal rotation with an SVD of the centered cross-covariance.
/// The reported error is the mean squared nearest-neighbor distance of this
/// iteration's correspondence search, not the post-fit residual.
pub struct PointToPoint {
    tree: KdTree,
}

impl PointToPoint {
    /// Build the strategy over the reference cloud, constructing the spatial
    /// index once.
    pub fn new(reference: &PointCloud) -> Result<Self, KdTreeError> {
        Ok(Self {
            tree: KdTree::build(reference.points())?,
        })
    }

    /// Match each source point to its nearest reference point. Returns the
    /// matched points, column-aligned with the source, and the mean squared
    /// distance as an error proxy.
    fn find_correspondences(&self, source: &[[f64; 3]]) -> (Vec<[f64; 3]>, f64) {
        let mut correspondences = Vec::with_capacity(source.len());
        let mut error_sum = 0.0;
        for point in source {
            let nearest = self.tree.nearest(point);
            error_sum += nearest.distance_sq;
            correspondences.push(nearest.point);
        }
        (correspondences, error_sum / source.len() as f64)
    }
}

impl TransformStrategy for PointToPoint {
    fn compute_optimal_transform(&self, transformed_source: &[[f64; 3]]) -> (RigidTransform, f64) {
        let (correspondences, error) = self.find_correspondences(transformed_source);
        let transform = fit_point_to_point(transformed_source, &correspondences);
        (transform, error)
    }
}

/// Closed-form optimal rigid transform between two column-aligned point sets.
///
/// Kabsch: center both sets by their centroids, decompose the 3x3
/// cross-covariance `H = S_c · C_cᵀ` with an SVD, take `R = V·Uᵀ`. A negative
/// determinant means the best orthogonal map is a reflection; negating the
/// third column of V forces a proper rotation. `t = c_C − R·c_S`.
pub(crate) fn fit_point_to_point(src: &[[f64; 3]], dst: &[[f64; 3]]) -> RigidTransform {
    debug_assert_eq!(src.len(), dst.len());
    let n = src.len() as f64;

    let mut centroid_src = [0.0; 3];
    let mut centroid_dst = [0.0; 3];
    for (s, d) in src.iter().zip(dst.iter()) {
        for i in 0..3 {
            centroid_src[i] += s[i];
            centroid_dst[i] += d[i];
        }
    }
    for i in 0..3 {
        centroid_src[i] /= n;
        centroid_dst[i] /= n;
    }

    // cross covariance H = Σ (s - c_S)(d - c_C)ᵀ
    let mut h = [[0.0; 3]; 3];
    for (s, d) in src.iter().zip(dst.iter()) {
        for r in 0..3 {
            for c in 0..3 {
                h[r][c] += (s[r] - centroid_src[r]) * (d[c] - centroid_dst[c]);
            }
        }
    }

    let h_mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| h[i][j]);
    let svd = h_mat.svd();
    let (u, v) = (svd.u(), svd.v());

    let mut rotation = mat33_to_array(&(v * u.transpose()));
    if det_mat33(&rotation) < 0.0 {
        // reflection case: flip the singular direction and recompute
        let v_fixed =
            faer::Mat::<f64>::from_fn(3, 3, |i, j| if j == 2 { -v.read(i, j) } else { v.read(i, j) });
        rotation = mat33_to_array(&(v_fixed * u.transpose()));
    }

    let mut translation = [0.0; 3];
    for (i, row) in rotation.iter().enumerate() {
        translation[i] = centroid_dst[i] - dot3(row, &centroid_src);
    }

    RigidTransform::new(rotation, translation)
}

fn mat33_to_array(m: &faer::Mat<f64>) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = m.read(i, j);
        }
    }
    out
}
