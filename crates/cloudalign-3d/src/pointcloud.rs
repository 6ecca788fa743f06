use serde::{Deserialize, Serialize};

/// Error types for point cloud construction.
#[derive(Debug, thiserror::Error)]
pub enum PointCloudError {
    /// The coordinate buffer is empty.
    #[error("Point cloud data is empty")]
    EmptyData,

    /// The coordinate buffer length is not a multiple of 3.
    #[error("Coordinate buffer of length {0} is not a sequence of 3d points")]
    NotCoordinateTriples(usize),
}

/// An ordered set of 3d points.
///
/// The cloud is immutable for the duration of a registration run; the moving
/// source is never mutated in place, each iteration re-transforms the
/// original points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloud {
    points: Vec<[f64; 3]>,
}

impl PointCloud {
    /// Create a new point cloud from a list of points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self { points }
    }

    /// Create a point cloud from a flat coordinate buffer `[x0, y0, z0, x1, ...]`.
    ///
    /// Fails if the buffer is empty or its length is not a multiple of 3.
    pub fn from_flat(coords: &[f64]) -> Result<Self, PointCloudError> {
        if coords.is_empty() {
            return Err(PointCloudError::EmptyData);
        }
        if coords.len() % 3 != 0 {
            return Err(PointCloudError::NotCoordinateTriples(coords.len()));
        }
        let points = coords
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self { points })
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Flatten the points back into a 3N coordinate buffer.
    pub fn as_flat(&self) -> Vec<f64> {
        self.points.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud_from_flat() -> Result<(), PointCloudError> {
        let pc = PointCloud::from_flat(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        assert_eq!(pc.len(), 2);
        assert_eq!(pc.points()[1], [4.0, 5.0, 6.0]);
        assert_eq!(pc.as_flat(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_pointcloud_empty() {
        let pc = PointCloud::from_flat(&[]);
        assert!(matches!(pc, Err(PointCloudError::EmptyData)));
    }

    #[test]
    fn test_pointcloud_not_triples() {
        let pc = PointCloud::from_flat(&[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(pc, Err(PointCloudError::NotCoordinateTriples(4))));
    }
}
