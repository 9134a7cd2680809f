//! Volume images and label volumes

use crate::error::{Result, RoundTripError};
use crate::geometry::OrientationMatrix;
use crate::types::{Dimensions, ScalarType, VolumeClass};
use crate::utils::format_bytes;

/// Storage type the host gives freshly created label volumes
pub const DEFAULT_LABEL_SCALAR_TYPE: ScalarType = ScalarType::I16;

/// A 3-D grid of samples with orientation and classification.
///
/// Label volumes are the same structure with `class == VolumeClass::Label`.
/// The buffer always holds `nx * ny * nz * channels * sizeof(scalar_type)`
/// bytes, interleaved by channel, x fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeImage {
    name: String,
    dims: Dimensions,
    channels: usize,
    scalar_type: ScalarType,
    orientation: OrientationMatrix,
    class: VolumeClass,
    data: Vec<u8>,
}

impl VolumeImage {
    /// Create a volume from a raw sample buffer
    pub fn new(
        name: impl Into<String>,
        dims: Dimensions,
        channels: usize,
        scalar_type: ScalarType,
        class: VolumeClass,
        data: Vec<u8>,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(RoundTripError::InvalidDimensions(
                "Channel count must be at least 1".to_string(),
            ));
        }

        let expected = dims.voxel_count() * channels * scalar_type.size_in_bytes();
        if data.len() != expected {
            return Err(RoundTripError::InvalidDimensions(format!(
                "Buffer size mismatch: expected {} bytes for {} x {} {}, got {}",
                expected,
                dims,
                channels,
                scalar_type,
                data.len()
            )));
        }

        if class == VolumeClass::Label && channels != 1 {
            return Err(RoundTripError::InvalidDimensions(format!(
                "Label volumes are single-channel, got {} channels",
                channels
            )));
        }

        Ok(Self {
            name: name.into(),
            dims,
            channels,
            scalar_type,
            orientation: OrientationMatrix::identity(),
            class,
            data,
        })
    }

    /// Create a zero-filled volume
    pub fn zeros(
        name: impl Into<String>,
        dims: Dimensions,
        channels: usize,
        scalar_type: ScalarType,
        class: VolumeClass,
    ) -> Result<Self> {
        let len = dims.voxel_count() * channels * scalar_type.size_in_bytes();
        Self::new(name, dims, channels, scalar_type, class, vec![0u8; len])
    }

    /// Create a volume from `f64` samples, encoding them as `scalar_type`
    pub fn from_samples(
        name: impl Into<String>,
        dims: Dimensions,
        channels: usize,
        scalar_type: ScalarType,
        class: VolumeClass,
        samples: &[f64],
    ) -> Result<Self> {
        let width = scalar_type.size_in_bytes();
        let mut data = vec![0u8; samples.len() * width];
        for (value, out) in samples.iter().zip(data.chunks_exact_mut(width)) {
            scalar_type.encode(*value, out);
        }
        Self::new(name, dims, channels, scalar_type, class, data)
    }

    /// Create an empty label volume matching `source`'s grid.
    ///
    /// The orientation is copied by value.
    pub fn label_like(source: &VolumeImage, name: impl Into<String>) -> Result<Self> {
        let mut label = Self::zeros(
            name,
            source.dims,
            1,
            DEFAULT_LABEL_SCALAR_TYPE,
            VolumeClass::Label,
        )?;
        label.orientation = source.orientation;
        Ok(label)
    }

    pub fn with_orientation(mut self, orientation: OrientationMatrix) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.scalar_type
    }

    pub fn class(&self) -> VolumeClass {
        self.class
    }

    pub fn orientation(&self) -> OrientationMatrix {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: OrientationMatrix) {
        self.orientation = orientation;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the sample storage, keeping name, class and orientation
    pub fn replace_samples(&mut self, scalar_type: ScalarType, data: Vec<u8>) -> Result<()> {
        let expected = self.dims.voxel_count() * self.channels * scalar_type.size_in_bytes();
        if data.len() != expected {
            return Err(RoundTripError::InvalidDimensions(format!(
                "Replacement buffer has {} bytes, expected {}",
                data.len(),
                expected
            )));
        }
        self.scalar_type = scalar_type;
        self.data = data;
        Ok(())
    }

    /// Check whether the volume carries any sample data
    pub fn has_image_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Number of scalar samples in the buffer (voxels times channels)
    pub fn sample_count(&self) -> usize {
        self.dims.voxel_count() * self.channels
    }

    /// Sample at a flat sample index
    pub fn sample(&self, index: usize) -> f64 {
        let width = self.scalar_type.size_in_bytes();
        self.scalar_type
            .decode(&self.data[index * width..(index + 1) * width])
    }

    pub fn set_sample(&mut self, index: usize, value: f64) {
        let width = self.scalar_type.size_in_bytes();
        self.scalar_type
            .encode(value, &mut self.data[index * width..(index + 1) * width]);
    }

    /// Value of `channel` at grid point `(i, j, k)`
    pub fn voxel(&self, i: usize, j: usize, k: usize, channel: usize) -> f64 {
        self.sample(self.dims.linear_index(i, j, k) * self.channels + channel)
    }

    pub fn set_voxel(&mut self, i: usize, j: usize, k: usize, channel: usize, value: f64) {
        let index = self.dims.linear_index(i, j, k) * self.channels + channel;
        self.set_sample(index, value);
    }

    /// Every sample decoded into `f64`, in buffer order
    pub fn samples_f64(&self) -> Vec<f64> {
        let width = self.scalar_type.size_in_bytes();
        self.data
            .chunks_exact(width)
            .map(|chunk| self.scalar_type.decode(chunk))
            .collect()
    }

    /// Size of the sample buffer in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} '{}': {} x {} channel(s) ({}), {}",
            self.class,
            self.name,
            self.dims,
            self.channels,
            self.scalar_type,
            format_bytes(self.data.len())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_invariant() {
        let dims = Dimensions::new(4, 4, 1);
        assert!(VolumeImage::zeros("v", dims, 3, ScalarType::U16, VolumeClass::Vector).is_ok());

        let err = VolumeImage::new(
            "v",
            dims,
            3,
            ScalarType::U16,
            VolumeClass::Vector,
            vec![0u8; 10],
        )
        .unwrap_err();
        assert!(matches!(err, RoundTripError::InvalidDimensions(_)));
    }

    #[test]
    fn test_label_must_be_single_channel() {
        let dims = Dimensions::planar(2, 2);
        let err = VolumeImage::zeros("l", dims, 2, ScalarType::U8, VolumeClass::Label).unwrap_err();
        assert!(matches!(err, RoundTripError::InvalidDimensions(_)));
    }

    #[test]
    fn test_label_like_copies_geometry() {
        let mut rows = [[0.0; 4]; 4];
        rows[0][0] = -1.0;
        rows[1][1] = -1.0;
        rows[2][2] = 1.0;
        rows[3][3] = 1.0;
        let orientation = OrientationMatrix::from_rows(rows);

        let grey = VolumeImage::zeros(
            "image01_grey",
            Dimensions::new(8, 6, 2),
            1,
            ScalarType::F64,
            VolumeClass::Scalar,
        )
        .unwrap()
        .with_orientation(orientation);

        let label = VolumeImage::label_like(&grey, "image01_grey-label").unwrap();
        assert_eq!(label.dims(), grey.dims());
        assert_eq!(label.channels(), 1);
        assert_eq!(label.class(), VolumeClass::Label);
        assert_eq!(label.scalar_type(), DEFAULT_LABEL_SCALAR_TYPE);
        assert_eq!(label.orientation(), orientation);
        assert!(label.samples_f64().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_voxel_access() {
        let mut v = VolumeImage::zeros(
            "rgb",
            Dimensions::new(3, 2, 1),
            3,
            ScalarType::U16,
            VolumeClass::Vector,
        )
        .unwrap();
        v.set_voxel(2, 1, 0, 1, 500.0);
        assert_eq!(v.voxel(2, 1, 0, 1), 500.0);
        assert_eq!(v.voxel(2, 1, 0, 0), 0.0);
        assert_eq!(v.sample((5 * 3) + 1), 500.0);
    }

    #[test]
    fn test_replace_samples_checks_length() {
        let mut v = VolumeImage::zeros(
            "l",
            Dimensions::planar(2, 2),
            1,
            ScalarType::I16,
            VolumeClass::Label,
        )
        .unwrap();
        assert!(v.replace_samples(ScalarType::U8, vec![0u8; 3]).is_err());
        v.replace_samples(ScalarType::U8, vec![7u8; 4]).unwrap();
        assert_eq!(v.scalar_type(), ScalarType::U8);
        assert_eq!(v.sample(3), 7.0);
    }
}
