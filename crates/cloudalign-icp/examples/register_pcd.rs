use argh::FromArgs;
use std::path::PathBuf;

use cloudalign_3d::io::pcd::read_pcd_ascii;
use cloudalign_icp::{register_point_to_plane, register_point_to_point, IcpOptions, IcpResult};

#[derive(FromArgs)]
/// Align a source PCD scan onto a reference PCD scan
struct Args {
    /// path to the moving (source) cloud
    #[argh(option, short = 's')]
    source: PathBuf,

    /// path to the fixed (reference) cloud
    #[argh(option, short = 'r')]
    reference: PathBuf,

    /// uniform scale applied to coordinates while parsing (default: 1.0)
    #[argh(option, default = "1.0")]
    scale: f64,

    /// use the point-to-plane metric instead of point-to-point
    #[argh(switch)]
    point_to_plane: bool,

    /// maximum number of iterations (default: 50)
    #[argh(option, default = "50")]
    max_iterations: usize,

    /// convergence tolerance on the error change (default: 1e-10)
    #[argh(option, default = "1e-10")]
    tolerance: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let source = read_pcd_ascii(&args.source, args.scale)?;
    let reference = read_pcd_ascii(&args.reference, args.scale)?;
    println!(
        "loaded {} source points, {} reference points",
        source.len(),
        reference.len()
    );

    let options = IcpOptions {
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        ..Default::default()
    };

    let result: IcpResult = if args.point_to_plane {
        register_point_to_plane(&source, &reference, &options)?
    } else {
        register_point_to_point(&source, &reference, &options)?
    };

    println!(
        "converged after {} iterations with error {:.6e}",
        result.num_iterations, result.error
    );
    println!("{}", serde_json::to_string_pretty(&result.transform)?);

    Ok(())
}
