use cloudalign_3d::linalg::{cross3, dot3, pseudo_inverse};
use cloudalign_3d::pointcloud::PointCloud;
use cloudalign_3d::transform::RigidTransform;
use cloudalign_3d::transforms::euler_zyx_to_rotation_matrix;

use crate::icp::TransformStrategy;
use crate::kdtree::{KdTree, KdTreeError};
use crate::normals::estimate_normals;

/// Default neighborhood size for the reference normal field.
pub const DEFAULT_NORMAL_NEIGHBORS: usize = 20;

/// Point-to-plane transform strategy.
///
/// Minimizes the distance from each transformed source point to the tangent
/// plane at its matched reference point, through the small-angle
/// linearization of the rigid motion. Normals are estimated once over the
/// reference cloud when the strategy is built and are immutable afterwards;
/// their per-point sign is arbitrary, which the residual tolerates.
///
/// The reported error is the squared residual norm `‖Ax − b‖²` of the
/// linearized system, a different quantity than point-to-point's
/// distance-based error.
pub struct PointToPlane {
    tree: KdTree,
    normals: Vec<[f64; 3]>,
}

impl PointToPlane {
    /// Build the strategy over the reference cloud with the default normal
    /// neighborhood of [`DEFAULT_NORMAL_NEIGHBORS`] points.
    pub fn new(reference: &PointCloud) -> Result<Self, KdTreeError> {
        Self::with_neighborhood(reference, DEFAULT_NORMAL_NEIGHBORS)
    }

    /// Build the strategy with a caller-chosen normal neighborhood size.
    pub fn with_neighborhood(reference: &PointCloud, k: usize) -> Result<Self, KdTreeError> {
        let tree = KdTree::build(reference.points())?;
        let normals = estimate_normals(reference.points(), &tree, k);
        Ok(Self { tree, normals })
    }

    /// Normals estimated over the reference cloud, one per reference point.
    pub fn normals(&self) -> &[[f64; 3]] {
        &self.normals
    }
}

impl TransformStrategy for PointToPlane {
    fn compute_optimal_transform(&self, transformed_source: &[[f64; 3]]) -> (RigidTransform, f64) {
        let n_pts = transformed_source.len();

        // stack one linearized constraint per source point: for source s,
        // matched reference d and its normal n, the row is [(s × n); n] and
        // the target is n · (d − s)
        let mut a = faer::Mat::<f64>::zeros(n_pts, 6);
        let mut b = faer::Col::<f64>::zeros(n_pts);
        for (i, s) in transformed_source.iter().enumerate() {
            let nearest = self.tree.nearest(s);
            let normal = self.normals[nearest.index];
            let d = nearest.point;

            let c = cross3(s, &normal);
            a.write(i, 0, c[0]);
            a.write(i, 1, c[1]);
            a.write(i, 2, c[2]);
            a.write(i, 3, normal[0]);
            a.write(i, 4, normal[1]);
            a.write(i, 5, normal[2]);
            b.write(i, dot3(&normal, &[d[0] - s[0], d[1] - s[1], d[2] - s[2]]));
        }

        // x = A⁺ b; the truncated pseudo-inverse absorbs rank deficiency
        // (e.g. all normals parallel over a planar reference)
        let a_pinv = pseudo_inverse(a.as_ref());
        let x = a_pinv.as_ref() * b.as_ref();

        // squared residual norm of the least-squares estimate
        let mut error = 0.0;
        for i in 0..n_pts {
            let mut r_i = -b.read(i);
            for j in 0..6 {
                r_i += a.read(i, j) * x.read(j);
            }
            error += r_i * r_i;
        }

        // x = [α, β, γ, tx, ty, tz]: Euler angles in Z-Y-X composition order
        // plus translation
        let rotation = euler_zyx_to_rotation_matrix(x.read(2), x.read(1), x.read(0));
        let translation = [x.read(3), x.read(4), x.read(5)];

        (RigidTransform::new(rotation, translation), error)
    }
}
