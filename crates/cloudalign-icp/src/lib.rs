#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod icp;
pub use icp::*;

mod kdtree;
pub use kdtree::{KdTree, KdTreeError, Neighbor};

mod normals;
pub use normals::estimate_normals;

mod point_to_plane;
pub use point_to_plane::{PointToPlane, DEFAULT_NORMAL_NEIGHBORS};

mod point_to_point;
pub use point_to_point::PointToPoint;
