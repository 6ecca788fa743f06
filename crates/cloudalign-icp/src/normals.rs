use crate::kdtree::KdTree;

/// Estimate a surface normal per point from its local neighborhood.
///
/// For each point the `k` nearest neighbors (the point itself included) are
/// gathered through the spatial index, centered by their mean and decomposed
/// with an SVD; the right singular vector paired with the smallest singular
/// value is the normal estimate. Orthonormality of the SVD output already
/// yields unit length.
///
/// The sign of each normal is arbitrary: no global orientation consistency is
/// enforced, and none is needed by the point-to-plane residual.
pub fn estimate_normals(points: &[[f64; 3]], tree: &KdTree, k: usize) -> Vec<[f64; 3]> {
    points.iter().map(|p| estimate_normal(tree, p, k)).collect()
}

fn estimate_normal(tree: &KdTree, point: &[f64; 3], k: usize) -> [f64; 3] {
    let neighbors = tree.nearest_n(point, k);
    let n = neighbors.len();

    let mut mean = [0.0; 3];
    for nb in &neighbors {
        mean[0] += nb.point[0];
        mean[1] += nb.point[1];
        mean[2] += nb.point[2];
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    // neighbors as rows, centered; the principal directions are the columns
    // of V, and the direction of least variance is the last one since the
    // singular values come out in descending order
    let mut x = faer::Mat::<f64>::zeros(n, 3);
    for (i, nb) in neighbors.iter().enumerate() {
        for j in 0..3 {
            x.write(i, j, nb.point[j] - mean[j]);
        }
    }

    let svd = x.svd();
    let v = svd.v();
    [v.read(0, 2), v.read(1, 2), v.read(2, 2)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloudalign_3d::linalg::dot3;

    fn grid_on_plane() -> Vec<[f64; 3]> {
        // z = 0.5x - 0.25y plane
        let mut points = Vec::new();
        for i in -5..=5 {
            for j in -5..=5 {
                let (x, y) = (i as f64 * 0.1, j as f64 * 0.1);
                points.push([x, y, 0.5 * x - 0.25 * y]);
            }
        }
        points
    }

    #[test]
    fn test_plane_normals() -> Result<(), Box<dyn std::error::Error>> {
        let points = grid_on_plane();
        let tree = KdTree::build(&points)?;
        let normals = estimate_normals(&points, &tree, 20);

        // expected plane normal, up to sign
        let mag = (0.5f64.powi(2) + 0.25f64.powi(2) + 1.0).sqrt();
        let expected = [-0.5 / mag, 0.25 / mag, 1.0 / mag];

        assert_eq!(normals.len(), points.len());
        for normal in &normals {
            assert_relative_eq!(dot3(normal, normal), 1.0, epsilon = 1e-9);
            assert_relative_eq!(dot3(normal, &expected).abs(), 1.0, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_fewer_points_than_neighborhood() -> Result<(), Box<dyn std::error::Error>> {
        // the neighborhood is capped at the cloud size; output stays unit length
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let tree = KdTree::build(&points)?;
        let normals = estimate_normals(&points, &tree, 20);
        for normal in &normals {
            assert_relative_eq!(dot3(normal, normal), 1.0, epsilon = 1e-9);
            // all three points lie in the z = 0 plane
            assert_relative_eq!(normal[2].abs(), 1.0, epsilon = 1e-9);
        }
        Ok(())
    }
}
