//! Core data types for label volumes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-sample storage types a volume can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScalarType {
    /// Unsigned 8-bit integer
    U8 = 1,
    /// Unsigned 16-bit integer
    U16 = 2,
    /// Unsigned 32-bit integer
    U32 = 3,
    /// Unsigned 64-bit integer
    U64 = 4,
    /// Signed 8-bit integer
    I8 = 5,
    /// Signed 16-bit integer
    I16 = 6,
    /// Signed 32-bit integer
    I32 = 7,
    /// Signed 64-bit integer
    I64 = 8,
    /// 32-bit floating point
    F32 = 9,
    /// 64-bit floating point
    F64 = 10,
}

impl ScalarType {
    /// Size in bytes of one sample of this type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ScalarType::U8 | ScalarType::I8 => 1,
            ScalarType::U16 | ScalarType::I16 => 2,
            ScalarType::U32 | ScalarType::I32 | ScalarType::F32 => 4,
            ScalarType::U64 | ScalarType::I64 | ScalarType::F64 => 8,
        }
    }

    /// Smallest and largest value representable by this type, as `f64`
    pub fn value_bounds(&self) -> (f64, f64) {
        match self {
            ScalarType::U8 => (u8::MIN as f64, u8::MAX as f64),
            ScalarType::U16 => (u16::MIN as f64, u16::MAX as f64),
            ScalarType::U32 => (u32::MIN as f64, u32::MAX as f64),
            ScalarType::U64 => (u64::MIN as f64, u64::MAX as f64),
            ScalarType::I8 => (i8::MIN as f64, i8::MAX as f64),
            ScalarType::I16 => (i16::MIN as f64, i16::MAX as f64),
            ScalarType::I32 => (i32::MIN as f64, i32::MAX as f64),
            ScalarType::I64 => (i64::MIN as f64, i64::MAX as f64),
            ScalarType::F32 => (f32::MIN as f64, f32::MAX as f64),
            ScalarType::F64 => (f64::MIN, f64::MAX),
        }
    }

    /// Decode one native-endian sample into `f64`.
    ///
    /// `bytes` must hold exactly `size_in_bytes()` bytes.
    pub fn decode(&self, bytes: &[u8]) -> f64 {
        macro_rules! read {
            ($t:ty) => {{
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_ne_bytes(raw) as f64
            }};
        }
        match self {
            ScalarType::U8 => read!(u8),
            ScalarType::U16 => read!(u16),
            ScalarType::U32 => read!(u32),
            ScalarType::U64 => read!(u64),
            ScalarType::I8 => read!(i8),
            ScalarType::I16 => read!(i16),
            ScalarType::I32 => read!(i32),
            ScalarType::I64 => read!(i64),
            ScalarType::F32 => read!(f32),
            ScalarType::F64 => read!(f64),
        }
    }

    /// Encode `value` as one native-endian sample into `out`.
    ///
    /// Integer targets round to nearest and saturate at the type bounds;
    /// NaN becomes zero.
    pub fn encode(&self, value: f64, out: &mut [u8]) {
        macro_rules! write_int {
            ($t:ty) => {{
                let v = if value.is_nan() { 0.0 } else { value.round() };
                // `as` saturates for float-to-int conversions
                out.copy_from_slice(&(v as $t).to_ne_bytes());
            }};
        }
        match self {
            ScalarType::U8 => write_int!(u8),
            ScalarType::U16 => write_int!(u16),
            ScalarType::U32 => write_int!(u32),
            ScalarType::U64 => write_int!(u64),
            ScalarType::I8 => write_int!(i8),
            ScalarType::I16 => write_int!(i16),
            ScalarType::I32 => write_int!(i32),
            ScalarType::I64 => write_int!(i64),
            ScalarType::F32 => out.copy_from_slice(&(value as f32).to_ne_bytes()),
            ScalarType::F64 => out.copy_from_slice(&value.to_ne_bytes()),
        }
    }

    /// Host-style name of the type, e.g. `"unsigned char"`
    pub fn c_name(&self) -> &'static str {
        match self {
            ScalarType::U8 => "unsigned char",
            ScalarType::U16 => "unsigned short",
            ScalarType::U32 => "unsigned int",
            ScalarType::U64 => "unsigned long long",
            ScalarType::I8 => "signed char",
            ScalarType::I16 => "short",
            ScalarType::I32 => "int",
            ScalarType::I64 => "long long",
            ScalarType::F32 => "float",
            ScalarType::F64 => "double",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Classification tag of a volume entity.
///
/// Stands in for runtime type inspection of host node classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeClass {
    /// Generic single-channel volume
    Scalar,
    /// Multi-channel volume (e.g. RGB) loaded as one entity
    Vector,
    /// Single-channel integer volume whose samples index discrete regions
    Label,
}

impl fmt::Display for VolumeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VolumeClass::Scalar => "scalar volume",
            VolumeClass::Vector => "vector volume",
            VolumeClass::Label => "label volume",
        };
        f.write_str(name)
    }
}

/// Spatial extent of a volume in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl Dimensions {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// A single 2-D slice stored as a 3-D grid
    pub fn planar(nx: usize, ny: usize) -> Self {
        Self::new(nx, ny, 1)
    }

    /// Number of grid points
    pub fn voxel_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Linear voxel index of `(i, j, k)`, x fastest
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.ny + j) * self.nx + i
    }

    /// Check if the grid point lies inside the extent
    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        i < self.nx && j < self.ny && k < self.nz
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} x {}", self.nx, self.ny, self.nz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_sizes() {
        assert_eq!(ScalarType::U8.size_in_bytes(), 1);
        assert_eq!(ScalarType::I16.size_in_bytes(), 2);
        assert_eq!(ScalarType::F32.size_in_bytes(), 4);
        assert_eq!(ScalarType::U64.size_in_bytes(), 8);
    }

    #[test]
    fn test_encode_saturates_and_rounds() {
        let mut out = [0u8; 1];
        ScalarType::U8.encode(300.0, &mut out);
        assert_eq!(out[0], 255);
        ScalarType::U8.encode(-4.0, &mut out);
        assert_eq!(out[0], 0);
        ScalarType::U8.encode(2.6, &mut out);
        assert_eq!(out[0], 3);
        ScalarType::U8.encode(f64::NAN, &mut out);
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_decode_matches_encode() {
        let mut out = [0u8; 2];
        ScalarType::I16.encode(-1234.0, &mut out);
        assert_eq!(ScalarType::I16.decode(&out), -1234.0);

        let mut out = [0u8; 8];
        ScalarType::F64.encode(0.125, &mut out);
        assert_eq!(ScalarType::F64.decode(&out), 0.125);
    }

    #[test]
    fn test_classification_display() {
        assert_eq!(VolumeClass::Label.to_string(), "label volume");
        assert_eq!(VolumeClass::Vector.to_string(), "vector volume");
    }

    #[test]
    fn test_dimensions_indexing() {
        let dims = Dimensions::new(4, 3, 2);
        assert_eq!(dims.voxel_count(), 24);
        assert_eq!(dims.linear_index(0, 0, 0), 0);
        assert_eq!(dims.linear_index(3, 0, 0), 3);
        assert_eq!(dims.linear_index(0, 1, 0), 4);
        assert_eq!(dims.linear_index(0, 0, 1), 12);
        assert!(dims.contains(3, 2, 1));
        assert!(!dims.contains(4, 0, 0));
    }
}
