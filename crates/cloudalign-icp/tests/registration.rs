use approx::assert_relative_eq;
use std::f64::consts::PI;

use cloudalign_3d::pointcloud::PointCloud;
use cloudalign_3d::transform::RigidTransform;
use cloudalign_3d::transforms::euler_zyx_to_rotation_matrix;
use cloudalign_icp::{register_point_to_plane, register_point_to_point, IcpError, IcpOptions};

/// 200 points along (x, sin x, 0) for x in [0, 2π), step π/100.
fn sinusoid_cloud() -> PointCloud {
    let mut points = Vec::new();
    let mut x = 0.0;
    while x < 2.0 * PI {
        points.push([x, x.sin(), 0.0]);
        x += PI / 100.0;
    }
    PointCloud::new(points)
}

/// Grid sampled on a paraboloid, a surface whose normal field has full rank.
fn paraboloid_cloud() -> PointCloud {
    let mut points = Vec::new();
    for i in -6..=6 {
        for j in -6..=6 {
            let (x, y) = (i as f64 * 0.2, j as f64 * 0.2);
            points.push([x, y, 0.3 * (x * x + y * y)]);
        }
    }
    PointCloud::new(points)
}

fn transformed(cloud: &PointCloud, transform: &RigidTransform) -> PointCloud {
    let mut points = vec![[0.0; 3]; cloud.len()];
    transform.transform_points(cloud.points(), &mut points);
    PointCloud::new(points)
}

fn assert_transforms_close(actual: &RigidTransform, expected: &RigidTransform, bound: f64) {
    for i in 0..3 {
        assert_relative_eq!(
            actual.translation[i],
            expected.translation[i],
            epsilon = bound
        );
        for j in 0..3 {
            assert_relative_eq!(actual.rotation[i][j], expected.rotation[i][j], epsilon = bound);
        }
    }
}

#[test]
fn identity_registration_point_to_point() -> Result<(), IcpError> {
    let cloud = sinusoid_cloud();
    let options = IcpOptions {
        max_iterations: 20,
        tolerance: 0.0,
        ..Default::default()
    };
    let result = register_point_to_point(&cloud, &cloud, &options)?;

    assert!(result.transform.is_rigid(1e-6));
    assert_transforms_close(&result.transform, &RigidTransform::identity(), 1e-9);
    assert_relative_eq!(result.error, 0.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn identity_registration_point_to_plane() -> Result<(), IcpError> {
    let cloud = paraboloid_cloud();
    let options = IcpOptions {
        max_iterations: 20,
        tolerance: 0.0,
        ..Default::default()
    };
    let result = register_point_to_plane(&cloud, &cloud, &options)?;

    assert!(result.transform.is_rigid(1e-6));
    assert_transforms_close(&result.transform, &RigidTransform::identity(), 1e-6);
    assert!(result.error < 1e-9);
    Ok(())
}

#[test]
fn point_to_point_recovers_known_transform() -> Result<(), IcpError> {
    let source = sinusoid_cloud();
    let ground_truth = RigidTransform::new(
        euler_zyx_to_rotation_matrix(PI / 12.0, PI / 12.0, PI / 12.0),
        [0.45, 0.2, 0.0],
    );
    let reference = transformed(&source, &ground_truth);

    let options = IcpOptions {
        max_iterations: 50,
        tolerance: 1e-10,
        ..Default::default()
    };
    let result = register_point_to_point(&source, &reference, &options)?;

    assert!(result.transform.is_rigid(1e-6));
    // the run must actually move off the identity and land on the ground truth
    assert_transforms_close(&result.transform, &ground_truth, 1e-2);
    assert!(result.num_iterations > 1);
    Ok(())
}

#[test]
fn point_to_plane_recovers_known_transform() -> Result<(), IcpError> {
    let source = paraboloid_cloud();
    let ground_truth = RigidTransform::new(
        euler_zyx_to_rotation_matrix(PI / 36.0, PI / 36.0, PI / 36.0),
        [0.05, -0.02, 0.1],
    );
    let reference = transformed(&source, &ground_truth);

    let options = IcpOptions {
        max_iterations: 50,
        tolerance: 1e-12,
        ..Default::default()
    };
    let result = register_point_to_plane(&source, &reference, &options)?;

    assert!(result.transform.is_rigid(1e-6));
    assert_transforms_close(&result.transform, &ground_truth, 1e-2);
    Ok(())
}

#[test]
fn registration_is_deterministic() -> Result<(), IcpError> {
    let source = sinusoid_cloud();
    let ground_truth = RigidTransform::new(
        euler_zyx_to_rotation_matrix(0.1, -0.2, 0.3),
        [0.1, 0.0, -0.3],
    );
    let reference = transformed(&source, &ground_truth);
    let options = IcpOptions {
        max_iterations: 25,
        tolerance: 1e-10,
        ..Default::default()
    };

    let first = register_point_to_point(&source, &reference, &options)?;
    let second = register_point_to_point(&source, &reference, &options)?;

    // bit-identical, not merely close
    assert_eq!(first.transform.to_col_major(), second.transform.to_col_major());
    assert_eq!(first.error.to_bits(), second.error.to_bits());
    assert_eq!(first.num_iterations, second.num_iterations);

    let first = register_point_to_plane(&source, &reference, &options)?;
    let second = register_point_to_plane(&source, &reference, &options)?;
    assert_eq!(first.transform.to_col_major(), second.transform.to_col_major());
    assert_eq!(first.error.to_bits(), second.error.to_bits());
    Ok(())
}

#[test]
fn single_point_reference_still_returns_a_result() -> Result<(), IcpError> {
    let source = PointCloud::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let reference = PointCloud::new(vec![[5.0, 5.0, 5.0]]);
    let options = IcpOptions {
        max_iterations: 10,
        tolerance: 1e-8,
        ..Default::default()
    };

    for result in [
        register_point_to_point(&source, &reference, &options)?,
        register_point_to_plane(&source, &reference, &options)?,
    ] {
        // poorly constrained, but well formed
        assert!(result.transform.is_rigid(1e-6));
        assert!(result.error.is_finite());
        for v in result.transform.to_col_major() {
            assert!(v.is_finite());
        }
    }
    Ok(())
}

#[test]
fn strategy_errors_have_different_semantics() -> Result<(), IcpError> {
    // a plane slid within itself: every point-to-plane residual is zero
    // although no source point coincides with a reference point
    let mut plane = Vec::new();
    for i in -6..=6 {
        for j in -6..=6 {
            plane.push([i as f64 * 0.1, j as f64 * 0.1, 0.0]);
        }
    }
    let source = PointCloud::new(plane.clone());
    let shifted: Vec<_> = plane.iter().map(|p| [p[0] + 0.03, p[1] - 0.04, p[2]]).collect();
    let reference = PointCloud::new(shifted);

    let options = IcpOptions {
        max_iterations: 1,
        tolerance: 0.0,
        ..Default::default()
    };

    let p2p = register_point_to_point(&source, &reference, &options)?;
    let p2l = register_point_to_plane(&source, &reference, &options)?;

    // point-to-point reports the mean squared nearest-neighbor distance
    assert!(p2p.error > 1e-4);
    // point-to-plane reports the squared residual norm, which vanishes here
    assert!(p2l.error < 1e-9);
    Ok(())
}
