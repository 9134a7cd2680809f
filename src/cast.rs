//! Scalar type normalization for label volumes
//!
//! The actual conversion is an external collaborator behind [`ScalarCaster`]:
//! it may run out of process, so callers await its completion and then check
//! the result themselves instead of trusting it.

use crate::error::{Result, RoundTripError};
use crate::types::ScalarType;
use crate::volume::VolumeImage;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Storage type label volumes must have before they are written
pub const LABEL_STORAGE_TYPE: ScalarType = ScalarType::U8;

/// External operation converting a volume's samples to another scalar type
#[async_trait]
pub trait ScalarCaster: Send + Sync {
    /// Return `volume` converted to `target`. Completes when the conversion
    /// has finished.
    async fn cast(&self, volume: &VolumeImage, target: ScalarType) -> Result<VolumeImage>;
}

/// Caster that rounds to nearest and clamps into the target range.
///
/// The conversion runs on tokio's blocking pool; the join handle is the
/// completion signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClampingCaster;

impl ClampingCaster {
    fn convert(volume: VolumeImage, target: ScalarType) -> Result<VolumeImage> {
        let (lo, hi) = target.value_bounds();
        let width = target.size_in_bytes();
        let mut data = vec![0u8; volume.sample_count() * width];
        let mut clipped = 0usize;

        for (value, out) in volume
            .samples_f64()
            .into_iter()
            .zip(data.chunks_exact_mut(width))
        {
            let clamped = num_traits::clamp(value, lo, hi);
            if clamped != value {
                clipped += 1;
            }
            target.encode(clamped, out);
        }

        if clipped > 0 {
            warn!(
                volume = volume.name(),
                clipped,
                target = %target,
                "samples clamped during cast"
            );
        }

        let mut converted = volume;
        converted.replace_samples(target, data)?;
        Ok(converted)
    }
}

#[async_trait]
impl ScalarCaster for ClampingCaster {
    async fn cast(&self, volume: &VolumeImage, target: ScalarType) -> Result<VolumeImage> {
        let input = volume.clone();
        let observed = volume.scalar_type();
        tokio::task::spawn_blocking(move || Self::convert(input, target))
            .await
            .map_err(|e| RoundTripError::CastFailed {
                observed,
                detail: format!("cast worker did not complete: {}", e),
            })?
    }
}

/// Make sure `label` is stored as unsigned 8-bit integers.
///
/// Already-normalized volumes are left untouched and the caster is not
/// called. Otherwise the caster runs and the result is re-checked; a result
/// of any other type fails with [`RoundTripError::CastFailed`].
pub async fn normalize_label(label: &mut VolumeImage, caster: &dyn ScalarCaster) -> Result<()> {
    let before = label.scalar_type();
    if before == LABEL_STORAGE_TYPE {
        debug!(volume = label.name(), "label already stored as {}", before.c_name());
        return Ok(());
    }

    info!(
        volume = label.name(),
        "converting label from {} to {}",
        before.c_name(),
        LABEL_STORAGE_TYPE.c_name()
    );

    let converted = caster
        .cast(label, LABEL_STORAGE_TYPE)
        .await
        .map_err(|e| match e {
            RoundTripError::CastFailed { .. } => e,
            other => RoundTripError::CastFailed {
                observed: before,
                detail: other.to_string(),
            },
        })?;

    if converted.scalar_type() != LABEL_STORAGE_TYPE {
        return Err(RoundTripError::CastFailed {
            observed: converted.scalar_type(),
            detail: "caster returned without converting".to_string(),
        });
    }

    label.replace_samples(converted.scalar_type(), converted.data().to_vec())?;
    info!(volume = label.name(), "label converted to unsigned char");
    Ok(())
}
