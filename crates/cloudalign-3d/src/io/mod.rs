/// ASCII PCD point cloud reader.
pub mod pcd;
