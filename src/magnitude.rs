//! Multi-channel to scalar magnitude reduction

use crate::error::{Result, RoundTripError};
use crate::types::{ScalarType, VolumeClass};
use crate::volume::VolumeImage;
use ndarray::{Array2, Axis};
use tracing::debug;

/// Storage type of reduced volumes; wide enough for any channel norm
pub const MAGNITUDE_SCALAR_TYPE: ScalarType = ScalarType::F64;

/// Collapse a vector volume to the per-voxel Euclidean norm of its channels.
///
/// The output keeps the input's grid and orientation and is classified as a
/// scalar volume named `output_name`.
pub fn reduce_magnitude(
    input: &VolumeImage,
    output_name: impl Into<String>,
) -> Result<VolumeImage> {
    let channels = input.channels();
    if channels < 2 {
        return Err(RoundTripError::UnsupportedInputKind {
            class: input.class(),
            channels,
        });
    }

    let voxels = input.dims().voxel_count();
    let samples = Array2::from_shape_vec((voxels, channels), input.samples_f64())
        .map_err(|e| RoundTripError::InvalidDimensions(e.to_string()))?;

    let norms = samples.map_axis(Axis(1), |vector| vector.dot(&vector).sqrt());
    debug!(
        voxels,
        channels,
        max = norms.iter().cloned().fold(0.0_f64, f64::max),
        "computed channel magnitudes"
    );

    let output = VolumeImage::from_samples(
        output_name,
        input.dims(),
        1,
        MAGNITUDE_SCALAR_TYPE,
        VolumeClass::Scalar,
        &norms.to_vec(),
    )?;

    Ok(output.with_orientation(input.orientation()))
}
