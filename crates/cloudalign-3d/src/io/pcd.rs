use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::pointcloud::PointCloud;

/// Error types for the PCD module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PcdError {
    /// Failed to read PCD file
    #[error("Failed to read PCD file")]
    Io(#[from] std::io::Error),

    /// The header never terminated with a DATA line
    #[error("Malformed PCD header: no DATA line found")]
    MissingDataHeader,

    /// No parseable points after the header
    #[error("PCD file contains no valid 3d points")]
    EmptyCloud,
}

/// Read an ASCII PCD file into a [`PointCloud`].
///
/// The header is skipped up to and including the first line that starts with
/// the token `DATA`. Every following line is expected to hold one
/// whitespace-separated 3d point; lines that do not parse into exactly three
/// numeric fields are discarded. Each coordinate is multiplied by `scale`.
pub fn read_pcd_ascii<P: AsRef<Path>>(path: P, scale: f64) -> Result<PointCloud, PcdError> {
    let file = File::open(path)?;
    parse_pcd_ascii(BufReader::new(file), scale)
}

/// Parse an ASCII PCD stream. See [`read_pcd_ascii`].
pub fn parse_pcd_ascii<R: BufRead>(reader: R, scale: f64) -> Result<PointCloud, PcdError> {
    let mut lines = reader.lines();

    // skip the header up to the DATA line
    let mut found_data = false;
    for line in lines.by_ref() {
        if line?.trim_start().starts_with("DATA") {
            found_data = true;
            break;
        }
    }
    if !found_data {
        return Err(PcdError::MissingDataHeader);
    }

    let mut points = Vec::new();
    for line in lines {
        let line = line?;
        let fields = line
            .split_whitespace()
            .map(|tok| tok.parse::<f64>())
            .collect::<Result<Vec<_>, _>>();
        match fields.as_deref() {
            Ok([x, y, z]) => points.push([x * scale, y * scale, z * scale]),
            // not a 3d point record, discard
            _ => continue,
        }
    }

    if points.is_empty() {
        return Err(PcdError::EmptyCloud);
    }
    Ok(PointCloud::new(points))
}
