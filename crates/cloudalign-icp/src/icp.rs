use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use cloudalign_3d::pointcloud::PointCloud;
use cloudalign_3d::transform::RigidTransform;

use crate::kdtree::KdTreeError;
use crate::{PointToPlane, PointToPoint};

/// Number of consecutive iterations the error change must stay within the
/// tolerance before the run is declared converged.
const STABLE_ITERATIONS: usize = 10;

/// Error types for registration runs.
#[derive(Debug, thiserror::Error)]
pub enum IcpError {
    /// One of the input clouds has no points.
    #[error("The {0} point cloud is empty")]
    EmptyPointCloud(&'static str),

    /// The convergence tolerance is negative or not a number.
    #[error("Tolerance must be a non-negative finite number, got {0}")]
    InvalidTolerance(f64),

    /// The spatial index over the reference cloud could not be built.
    #[error(transparent)]
    IndexBuild(#[from] KdTreeError),
}

/// Options controlling a registration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpOptions {
    /// Initial guess for the transform from source to reference.
    pub initial_pose: RigidTransform,
    /// Maximum number of iterations to perform. Zero returns the initial
    /// pose unchanged with an infinite sentinel error.
    pub max_iterations: usize,
    /// Convergence tolerance on the change in error between consecutive
    /// iterations. Zero disables early stopping except for bit-identical
    /// consecutive errors.
    pub tolerance: f64,
}

impl Default for IcpOptions {
    fn default() -> Self {
        Self {
            initial_pose: RigidTransform::identity(),
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Result of a registration run.
///
/// The transform maps the source cloud onto the reference cloud. The meaning
/// of `error` depends on the strategy: mean squared nearest-neighbor distance
/// for point-to-point, squared least-squares residual norm for
/// point-to-plane. The two are not numerically comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcpResult {
    /// Estimated rigid transform from the source to the reference frame.
    pub transform: RigidTransform,
    /// Error reported by the last completed iteration, `f64::INFINITY` if no
    /// iteration ran.
    pub error: f64,
    /// Number of iterations performed.
    pub num_iterations: usize,
}

/// A transform-estimation strategy over a fixed reference cloud.
///
/// Implementations own whatever state they precompute from the reference
/// (spatial index, normal field) and keep it immutable across iterations, so
/// one strategy value can serve a whole run.
pub trait TransformStrategy {
    /// Estimate the incremental rigid transform that moves
    /// `transformed_source` closer onto the reference, together with this
    /// iteration's error.
    fn compute_optimal_transform(&self, transformed_source: &[[f64; 3]]) -> (RigidTransform, f64);
}

/// Register `source` onto `reference` with the point-to-point (Kabsch) metric.
///
/// # Arguments
///
/// * `source` - The moving cloud.
/// * `reference` - The fixed cloud; the spatial index is built over it once.
/// * `options` - Initial pose, iteration budget and convergence tolerance.
///
/// # Returns
///
/// The accumulated rigid transform and the final mean squared
/// nearest-neighbor distance.
pub fn register_point_to_point(
    source: &PointCloud,
    reference: &PointCloud,
    options: &IcpOptions,
) -> Result<IcpResult, IcpError> {
    validate(source, reference, options)?;
    let strategy = PointToPoint::new(reference)?;
    Ok(run(source, &strategy, options, None))
}

/// Like [`register_point_to_point`], checking `cancel` between iterations.
///
/// When the flag is raised the loop stops after the current iteration and the
/// partial result accumulated so far is returned.
pub fn register_point_to_point_cancellable(
    source: &PointCloud,
    reference: &PointCloud,
    options: &IcpOptions,
    cancel: &AtomicBool,
) -> Result<IcpResult, IcpError> {
    validate(source, reference, options)?;
    let strategy = PointToPoint::new(reference)?;
    Ok(run(source, &strategy, options, Some(cancel)))
}

/// Register `source` onto `reference` with the point-to-plane metric.
///
/// Surface normals are estimated once over the reference cloud before the
/// loop starts. The reported error is the squared residual norm of the
/// linearized system, not a distance.
pub fn register_point_to_plane(
    source: &PointCloud,
    reference: &PointCloud,
    options: &IcpOptions,
) -> Result<IcpResult, IcpError> {
    validate(source, reference, options)?;
    let strategy = PointToPlane::new(reference)?;
    Ok(run(source, &strategy, options, None))
}

/// Like [`register_point_to_plane`], checking `cancel` between iterations.
pub fn register_point_to_plane_cancellable(
    source: &PointCloud,
    reference: &PointCloud,
    options: &IcpOptions,
    cancel: &AtomicBool,
) -> Result<IcpResult, IcpError> {
    validate(source, reference, options)?;
    let strategy = PointToPlane::new(reference)?;
    Ok(run(source, &strategy, options, Some(cancel)))
}

/// Run the registration loop with an already constructed strategy.
///
/// Useful to amortize index and normal construction across several source
/// clouds registered against the same reference.
pub fn register_with_strategy<S: TransformStrategy>(
    source: &PointCloud,
    strategy: &S,
    options: &IcpOptions,
) -> Result<IcpResult, IcpError> {
    if source.is_empty() {
        return Err(IcpError::EmptyPointCloud("source"));
    }
    validate_tolerance(options)?;
    Ok(run(source, strategy, options, None))
}

fn validate(
    source: &PointCloud,
    reference: &PointCloud,
    options: &IcpOptions,
) -> Result<(), IcpError> {
    if source.is_empty() {
        return Err(IcpError::EmptyPointCloud("source"));
    }
    if reference.is_empty() {
        return Err(IcpError::EmptyPointCloud("reference"));
    }
    validate_tolerance(options)
}

fn validate_tolerance(options: &IcpOptions) -> Result<(), IcpError> {
    // rejects NaN as well: the comparison below is false for it
    if !(options.tolerance >= 0.0 && options.tolerance.is_finite()) {
        return Err(IcpError::InvalidTolerance(options.tolerance));
    }
    Ok(())
}

fn run<S: TransformStrategy>(
    source: &PointCloud,
    strategy: &S,
    options: &IcpOptions,
    cancel: Option<&AtomicBool>,
) -> IcpResult {
    let mut transform = options.initial_pose;
    let mut prev_error = f64::INFINITY;
    // sentinel until the first iteration reports a real error
    let mut error = f64::INFINITY;
    let mut stable_count = 0usize;
    let mut num_iterations = 0usize;

    let mut transformed = vec![[0.0; 3]; source.len()];

    for iteration in 0..options.max_iterations {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                log::debug!("registration cancelled at iteration {iteration}");
                break;
            }
        }

        // the source buffer is never mutated in place; the moving cloud is
        // re-derived from the original points and the accumulated transform
        transform.transform_points(source.points(), &mut transformed);

        let (incremental, iteration_error) = strategy.compute_optimal_transform(&transformed);

        error = iteration_error;
        transform = incremental.compose(&transform);
        num_iterations = iteration + 1;

        log::debug!("iteration {iteration}: error {error}");

        // `<=` so that a zero tolerance still stops once consecutive errors
        // are bit-identical
        if (prev_error - error).abs() <= options.tolerance {
            stable_count += 1;
            if stable_count > STABLE_ITERATIONS {
                log::debug!("converged after {num_iterations} iterations with error {error}");
                break;
            }
        } else {
            stable_count = 0;
            prev_error = error;
        }
    }

    IcpResult {
        transform,
        error,
        num_iterations,
    }
}
