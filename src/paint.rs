//! Circular brush painting of label values onto a slice of a label volume

use crate::error::{Result, RoundTripError};
use crate::volume::VolumeImage;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One circular paint operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushStroke {
    /// Value written to every covered sample
    pub label: u32,
    /// Canvas x
    pub x: u32,
    /// Canvas y
    pub y: u32,
}

impl BrushStroke {
    pub fn new(label: u32, x: u32, y: u32) -> Self {
        Self { label, x, y }
    }
}

/// Diagnostic timing for one applied stroke
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeTiming {
    pub stroke: BrushStroke,
    /// Samples whose value was set
    pub covered: usize,
    pub elapsed: Duration,
    /// Seconds relative to the previous stroke's duration (zero for the first)
    pub delta_secs: f64,
}

/// Stroke positions along the canvas diagonal for labels `1..=label_count`.
///
/// `size = min(width, height)`, `step = size / (3 * label_count)`,
/// `center = size / 2`; label `i` lands at `center - 2 * step + step * i`.
pub fn diagonal_strokes(width: u32, height: u32, label_count: u32) -> Vec<BrushStroke> {
    if label_count == 0 {
        return Vec::new();
    }
    let size = i64::from(width.min(height));
    let step = size / (3 * i64::from(label_count));
    let center = size / 2;

    (1..=label_count)
        .map(|label| {
            let pos = center - 2 * step + step * i64::from(label);
            let pos = pos.clamp(0, i64::from(u32::MAX)) as u32;
            BrushStroke::new(label, pos, pos)
        })
        .collect()
}

/// Applies strokes in order onto one slice of a single-channel volume
#[derive(Debug, Clone, Copy)]
pub struct RasterPainter {
    radius: u32,
    slice: usize,
}

impl RasterPainter {
    pub fn new(radius: u32) -> Self {
        Self { radius, slice: 0 }
    }

    /// Paint on slice `k` instead of the first one
    pub fn with_slice(mut self, slice: usize) -> Self {
        self.slice = slice;
        self
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Apply `strokes` in sequence; later strokes overwrite earlier ones
    /// where their disks overlap. Samples outside the volume are skipped.
    pub fn paint(
        &self,
        target: &mut VolumeImage,
        strokes: &[BrushStroke],
    ) -> Result<Vec<StrokeTiming>> {
        if target.channels() != 1 {
            return Err(RoundTripError::InvalidInput(format!(
                "cannot paint on '{}' with {} channels",
                target.name(),
                target.channels()
            )));
        }
        if self.slice >= target.dims().nz {
            return Err(RoundTripError::InvalidDimensions(format!(
                "paint slice {} outside volume with {} slices",
                self.slice,
                target.dims().nz
            )));
        }

        info!(
            volume = target.name(),
            radius = self.radius,
            strokes = strokes.len(),
            "painting"
        );

        let mut timings = Vec::with_capacity(strokes.len());
        let mut previous: Option<Duration> = None;
        for stroke in strokes {
            let started = Instant::now();
            let covered = self.apply(target, stroke);
            let elapsed = started.elapsed();

            let delta_secs = previous
                .map(|p| elapsed.as_secs_f64() - p.as_secs_f64())
                .unwrap_or(0.0);
            debug!(
                label = stroke.label,
                x = stroke.x,
                y = stroke.y,
                covered,
                elapsed_us = elapsed.as_micros() as u64,
                delta_secs,
                "painted stroke"
            );
            previous = Some(elapsed);
            timings.push(StrokeTiming {
                stroke: *stroke,
                covered,
                elapsed,
                delta_secs,
            });
        }

        Ok(timings)
    }

    fn apply(&self, target: &mut VolumeImage, stroke: &BrushStroke) -> usize {
        let dims = target.dims();
        let r = i64::from(self.radius);
        let (cx, cy) = (i64::from(stroke.x), i64::from(stroke.y));
        let value = f64::from(stroke.label);

        let x_range = (cx - r).max(0)..=(cx + r).min(dims.nx as i64 - 1);
        let y_range = (cy - r).max(0)..=(cy + r).min(dims.ny as i64 - 1);

        let mut covered = 0;
        for y in y_range {
            for x in x_range.clone() {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= r * r {
                    target.set_voxel(x as usize, y as usize, self.slice, 0, value);
                    covered += 1;
                }
            }
        }
        covered
    }
}
