//! Raster persistence of label volumes

use crate::error::{Result, RoundTripError};
use crate::geometry::OrientationMatrix;
use crate::types::{Dimensions, ScalarType, VolumeClass};
use crate::utils::sidecar_path;
use crate::volume::VolumeImage;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Raster formats a label volume can be written as
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Png,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Png => "png",
        }
    }

    /// Parse a format from a file extension (case-insensitive, no dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(FileFormat::Png),
            _ => None,
        }
    }
}

/// Binding of one volume to a file for a single save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDescriptor {
    volume_name: String,
    directory: PathBuf,
    format: FileFormat,
}

impl StorageDescriptor {
    pub fn new(
        volume_name: impl Into<String>,
        directory: impl AsRef<Path>,
        format: FileFormat,
    ) -> Self {
        Self {
            volume_name: volume_name.into(),
            directory: directory.as_ref().to_path_buf(),
            format,
        }
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// `<volume name>.<extension>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.volume_name, self.format.extension())
    }

    /// Fully qualified path of the file
    pub fn full_path(&self) -> PathBuf {
        self.directory.join(self.file_name())
    }
}

/// JSON header written next to the raster to keep what the raster can't hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeHeader {
    pub name: String,
    pub class: VolumeClass,
    pub dims: Dimensions,
    pub channels: usize,
    pub scalar_type: ScalarType,
    pub orientation: OrientationMatrix,
    pub written_at: DateTime<Utc>,
    pub writer_version: String,
}

impl VolumeHeader {
    pub fn describe(volume: &VolumeImage) -> Self {
        Self {
            name: volume.name().to_string(),
            class: volume.class(),
            dims: volume.dims(),
            channels: volume.channels(),
            scalar_type: volume.scalar_type(),
            orientation: volume.orientation(),
            written_at: Utc::now(),
            writer_version: crate::VERSION.to_string(),
        }
    }

    /// Whether this header was written for `volume`'s grid
    pub fn describes(&self, volume: &VolumeImage) -> bool {
        self.name == volume.name()
            && self.dims == volume.dims()
            && self.channels == volume.channels()
    }
}

/// Collaborator that writes volumes to files and loads them back
#[async_trait]
pub trait LabelStore: Send + Sync {
    /// Write `volume` to the descriptor's path, returning the bytes written
    async fn write_image(
        &self,
        volume: &VolumeImage,
        descriptor: &StorageDescriptor,
    ) -> Result<u64>;

    /// Load a raster as a label volume. `Ok(None)` when there is no file.
    async fn load_label_image(&self, path: &Path) -> Result<Option<VolumeImage>>;
}

/// Encode a planar volume as PNG bytes.
///
/// Single-channel U8/U16 volumes become grey images, 3- and 4-channel U8
/// volumes become RGB/RGBA.
pub fn encode_png(volume: &VolumeImage) -> Result<Bytes> {
    let dims = volume.dims();
    if dims.nz != 1 {
        return Err(RoundTripError::InvalidDimensions(format!(
            "raster images hold a single slice, '{}' has {}",
            volume.name(),
            dims.nz
        )));
    }

    let color = match (volume.channels(), volume.scalar_type()) {
        (1, ScalarType::U8) => ExtendedColorType::L8,
        (1, ScalarType::U16) => ExtendedColorType::L16,
        (2, ScalarType::U8) => ExtendedColorType::La8,
        (3, ScalarType::U8) => ExtendedColorType::Rgb8,
        (4, ScalarType::U8) => ExtendedColorType::Rgba8,
        (channels, scalar_type) => {
            return Err(RoundTripError::Image(format!(
                "no raster layout for {} channel(s) of {}",
                channels, scalar_type
            )))
        }
    };

    let width = u32::try_from(dims.nx)
        .map_err(|_| RoundTripError::InvalidDimensions(format!("width {} too large", dims.nx)))?;
    let height = u32::try_from(dims.ny)
        .map_err(|_| RoundTripError::InvalidDimensions(format!("height {} too large", dims.ny)))?;

    let mut encoded = Vec::new();
    image::codecs::png::PngEncoder::new(&mut encoded).write_image(
        volume.data(),
        width,
        height,
        color,
    )?;
    Ok(Bytes::from(encoded))
}

/// Decode PNG bytes into a volume named `name`.
///
/// Single-channel rasters are classified as label volumes; anything with
/// more channels comes back as a vector volume.
pub fn decode_png(name: &str, encoded: &[u8]) -> Result<VolumeImage> {
    let decoded = image::load_from_memory_with_format(encoded, ImageFormat::Png)?;
    let dims = Dimensions::planar(decoded.width() as usize, decoded.height() as usize);

    let (channels, scalar_type, data) = match decoded {
        DynamicImage::ImageLuma8(buf) => (1, ScalarType::U8, buf.into_raw()),
        DynamicImage::ImageLuma16(buf) => (
            1,
            ScalarType::U16,
            buf.into_raw().iter().flat_map(|v| v.to_ne_bytes()).collect(),
        ),
        DynamicImage::ImageLumaA8(buf) => (2, ScalarType::U8, buf.into_raw()),
        DynamicImage::ImageRgb8(buf) => (3, ScalarType::U8, buf.into_raw()),
        DynamicImage::ImageRgba8(buf) => (4, ScalarType::U8, buf.into_raw()),
        other => (3, ScalarType::U8, other.to_rgb8().into_raw()),
    };

    let class = if channels == 1 {
        VolumeClass::Label
    } else {
        VolumeClass::Vector
    };
    VolumeImage::new(name, dims, channels, scalar_type, class, data)
}

/// Store backed by the local file system
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    write_sidecar: bool,
}

impl FileSystemStore {
    pub fn new() -> Self {
        Self { write_sidecar: true }
    }

    /// Store honouring the configuration's sidecar setting
    pub fn from_config(config: &crate::config::PipelineConfig) -> Self {
        Self::new().with_sidecar(config.write_sidecar)
    }

    /// Enable or disable the JSON geometry header next to each raster
    pub fn with_sidecar(mut self, write_sidecar: bool) -> Self {
        self.write_sidecar = write_sidecar;
        self
    }

    async fn read_header(path: &Path) -> Result<Option<VolumeHeader>> {
        match fs::read(sidecar_path(path)).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(RoundTripError::Io(e)),
        }
    }

    async fn remove_header(path: &Path) -> Result<()> {
        match fs::remove_file(sidecar_path(path)).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale header");
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(RoundTripError::Io(e)),
        }
    }
}

impl Default for FileSystemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelStore for FileSystemStore {
    async fn write_image(
        &self,
        volume: &VolumeImage,
        descriptor: &StorageDescriptor,
    ) -> Result<u64> {
        let path = descriptor.full_path();
        let encoded = match descriptor.format() {
            FileFormat::Png => encode_png(volume)?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &encoded).await?;

        if self.write_sidecar {
            let header = serde_json::to_vec_pretty(&VolumeHeader::describe(volume))?;
            fs::write(sidecar_path(&path), header).await?;
        } else {
            Self::remove_header(&path).await?;
        }

        let written = fs::metadata(&path).await?.len();
        debug!(path = %path.display(), bytes = written, "wrote raster");
        Ok(written)
    }

    async fn load_label_image(&self, path: &Path) -> Result<Option<VolumeImage>> {
        let encoded = match fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RoundTripError::Io(e)),
        };

        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(FileFormat::from_extension)
            .ok_or_else(|| {
                RoundTripError::Image(format!("unknown raster extension: {}", path.display()))
            })?;

        // entity names come from the file stem, like a host reading from disk
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();

        let mut volume = match format {
            FileFormat::Png => decode_png(&name, &encoded)?,
        };

        match Self::read_header(path).await {
            Ok(Some(header)) if header.describes(&volume) => {
                volume.set_orientation(header.orientation)
            }
            Ok(Some(header)) => warn!(
                path = %path.display(),
                header_name = %header.name,
                header_dims = %header.dims,
                "ignoring header written for a different volume"
            ),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable header"),
        }

        Ok(Some(volume))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn painted_label() -> VolumeImage {
        let samples: Vec<f64> = (0..12).map(|i| (i % 5) as f64).collect();
        VolumeImage::from_samples(
            "image01_grey-label",
            Dimensions::planar(4, 3),
            1,
            ScalarType::U8,
            VolumeClass::Label,
            &samples,
        )
        .unwrap()
    }

    #[test]
    fn test_descriptor_paths() {
        let descriptor =
            StorageDescriptor::new("image01_grey-label", "/tmp/work", FileFormat::Png);
        assert_eq!(descriptor.file_name(), "image01_grey-label.png");
        assert_eq!(
            descriptor.full_path(),
            PathBuf::from("/tmp/work/image01_grey-label.png")
        );
        assert_eq!(FileFormat::from_extension("PNG"), Some(FileFormat::Png));
        assert_eq!(FileFormat::from_extension("nrrd"), None);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_samples_and_geometry() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new();
        let mut orientation = OrientationMatrix::identity();
        orientation.set(0, 0, -1.0);
        orientation.set(1, 1, -1.0);
        let label = painted_label().with_orientation(orientation);

        let descriptor = StorageDescriptor::new(label.name(), temp_dir.path(), FileFormat::Png);
        let written = store.write_image(&label, &descriptor).await.unwrap();
        assert!(written > 0);
        assert!(sidecar_path(&descriptor.full_path()).exists());

        let reloaded = store
            .load_label_image(&descriptor.full_path())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.name(), "image01_grey-label");
        assert_eq!(reloaded.class(), VolumeClass::Label);
        assert_eq!(reloaded.scalar_type(), ScalarType::U8);
        assert_eq!(reloaded.data(), label.data());
        assert_eq!(reloaded.orientation(), orientation);
    }

    #[tokio::test]
    async fn test_missing_sidecar_gives_identity() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new().with_sidecar(false);
        let mut orientation = OrientationMatrix::identity();
        orientation.set(2, 2, -1.0);
        let label = painted_label().with_orientation(orientation);

        let descriptor = StorageDescriptor::new(label.name(), temp_dir.path(), FileFormat::Png);
        store.write_image(&label, &descriptor).await.unwrap();
        let reloaded = store
            .load_label_image(&descriptor.full_path())
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.orientation().is_identity());
    }

    #[tokio::test]
    async fn test_rewrite_without_sidecar_drops_old_header() {
        let temp_dir = TempDir::new().unwrap();
        let mut flipped = OrientationMatrix::identity();
        flipped.set(0, 0, -1.0);
        let label = painted_label();
        let descriptor = StorageDescriptor::new(label.name(), temp_dir.path(), FileFormat::Png);
        let header = sidecar_path(&descriptor.full_path());

        FileSystemStore::new()
            .write_image(&label.clone().with_orientation(flipped), &descriptor)
            .await
            .unwrap();
        assert!(header.exists());

        let store = FileSystemStore::new().with_sidecar(false);
        store.write_image(&label, &descriptor).await.unwrap();
        assert!(!header.exists());

        let reloaded = store
            .load_label_image(&descriptor.full_path())
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.orientation().is_identity());
    }

    #[tokio::test]
    async fn test_header_for_other_volume_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new().with_sidecar(false);
        let label = painted_label();
        let descriptor = StorageDescriptor::new(label.name(), temp_dir.path(), FileFormat::Png);
        store.write_image(&label, &descriptor).await.unwrap();

        let mut flipped = OrientationMatrix::identity();
        flipped.set(1, 1, -1.0);
        let other = VolumeImage::zeros(
            label.name(),
            Dimensions::planar(9, 9),
            1,
            ScalarType::U8,
            VolumeClass::Label,
        )
        .unwrap()
        .with_orientation(flipped);
        let header = serde_json::to_vec(&VolumeHeader::describe(&other)).unwrap();
        std::fs::write(sidecar_path(&descriptor.full_path()), header).unwrap();

        let reloaded = store
            .load_label_image(&descriptor.full_path())
            .await
            .unwrap()
            .unwrap();
        assert!(reloaded.orientation().is_identity());
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new();
        let loaded = store
            .load_label_image(&temp_dir.path().join("absent-label.png"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_rgb_decodes_as_vector() {
        let rgb = VolumeImage::zeros(
            "rgb",
            Dimensions::planar(3, 2),
            3,
            ScalarType::U8,
            VolumeClass::Vector,
        )
        .unwrap();
        let encoded = encode_png(&rgb).unwrap();
        let decoded = decode_png("rgb", &encoded).unwrap();
        assert_eq!(decoded.class(), VolumeClass::Vector);
        assert_eq!(decoded.channels(), 3);
    }

    #[test]
    fn test_rejects_unencodable_volumes() {
        let multi_slice = VolumeImage::zeros(
            "stack",
            Dimensions::new(2, 2, 2),
            1,
            ScalarType::U8,
            VolumeClass::Label,
        )
        .unwrap();
        assert!(matches!(
            encode_png(&multi_slice),
            Err(RoundTripError::InvalidDimensions(_))
        ));

        let floats = VolumeImage::zeros(
            "float",
            Dimensions::planar(2, 2),
            1,
            ScalarType::F32,
            VolumeClass::Scalar,
        )
        .unwrap();
        assert!(matches!(encode_png(&floats), Err(RoundTripError::Image(_))));
    }
}
